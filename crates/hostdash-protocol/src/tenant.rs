//! Tenant types: customer organizations that scope game-server resources.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A backend-assigned tenant identifier. Same newtype pattern as
/// [`UserId`](crate::UserId).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A customer organization bound to an external (Discord) server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,

    /// The external organization this tenant was created from.
    pub discord_server_id: String,

    pub name: String,

    #[serde(default)]
    pub icon: Option<String>,

    pub owner_id: String,

    #[serde(default)]
    pub config: TenantConfig,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-tenant settings. Replaced wholesale by `PUT /api/tenants/:id/config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_game_template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_limits: Option<ResourceLimits>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notification_channels: Vec<String>,

    /// Free-form key/value settings. `BTreeMap` keeps the serialized
    /// order stable so persisted snapshots compare byte-for-byte.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, String>,
}

/// Resource quotas for a tenant's game servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub max_game_servers: u32,
    pub max_cpu: String,
    pub max_memory: String,
    pub max_storage: String,
}

/// An external organization the user could bind as a new tenant.
/// Fetched on demand; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalOrganization {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub owner: bool,

    /// Permission bitfield as the provider reports it (a decimal string).
    #[serde(default)]
    pub permissions: String,

    #[serde(default)]
    pub features: Vec<String>,
}

/// `GET /api/tenants` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantList {
    #[serde(default)]
    pub tenants: Vec<Tenant>,
}

/// `POST /api/tenants` and `GET /api/tenants/:id` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantEnvelope {
    pub tenant: Tenant,
}

/// `GET /api/tenants/available-guilds` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationList {
    #[serde(default)]
    pub guilds: Vec<ExternalOrganization>,
}

/// `POST /api/tenants` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTenantRequest {
    pub guild_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_parses_without_config() {
        let tenant: Tenant = serde_json::from_value(serde_json::json!({
            "id": "t1",
            "discord_server_id": "g1",
            "name": "Guild One",
            "owner_id": "u-1",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(tenant.id, TenantId::from("t1"));
        assert_eq!(tenant.config, TenantConfig::default());
        assert_eq!(tenant.icon, None);
    }

    #[test]
    fn test_empty_config_serializes_to_empty_object() {
        let json = serde_json::to_string(&TenantConfig::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_config_with_limits_and_settings() {
        let mut config = TenantConfig {
            default_game_template: Some("valheim".into()),
            resource_limits: Some(ResourceLimits {
                max_game_servers: 5,
                max_cpu: "4".into(),
                max_memory: "8Gi".into(),
                max_storage: "100Gi".into(),
            }),
            notification_channels: vec!["alerts".into()],
            ..TenantConfig::default()
        };
        config.settings.insert("region".into(), "eu".into());

        let value = serde_json::to_value(&config).unwrap();

        assert_eq!(value["resource_limits"]["max_game_servers"], 5);
        assert_eq!(value["settings"]["region"], "eu");
        assert_eq!(value["notification_channels"][0], "alerts");
    }

    #[test]
    fn test_organization_list_tolerates_missing_guilds() {
        let list: OrganizationList = serde_json::from_str("{}").unwrap();
        assert!(list.guilds.is_empty());
    }

    #[test]
    fn test_tenant_id_display() {
        assert_eq!(TenantId::from("t9").to_string(), "t9");
    }
}
