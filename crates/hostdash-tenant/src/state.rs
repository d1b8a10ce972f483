//! Tenant state and the options that shape tenant navigation.

use std::time::Duration;

use hostdash_protocol::{ExternalOrganization, Tenant, TenantId};

/// Routes and timings the tenant manager navigates with.
#[derive(Debug, Clone)]
pub struct TenantOptions {
    /// Where the user picks a tenant.
    pub selection_route: String,

    /// Hard-navigation target when the backend has lost the user's
    /// identity-provider credential.
    pub reauth_route: String,

    /// Pause before that navigation so the message can be read.
    pub reauth_delay: Duration,
}

impl Default for TenantOptions {
    fn default() -> Self {
        Self {
            selection_route: "/tenants".to_string(),
            reauth_route: "/login?reason=discord_token_expired".to_string(),
            reauth_delay: Duration::from_secs(2),
        }
    }
}

impl TenantOptions {
    /// The dashboard route of a tenant: `/tenant/{id}/dashboard`.
    pub fn dashboard_route(&self, id: &TenantId) -> String {
        format!("/tenant/{id}/dashboard")
    }
}

/// Everything the tenant manager knows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TenantState {
    /// Tenants the user belongs to, as last fetched.
    pub tenants: Vec<Tenant>,

    /// The selected tenant. Persisted; at most one.
    pub current: Option<Tenant>,

    /// Candidates for binding as a new tenant. Never persisted.
    pub available_organizations: Vec<ExternalOrganization>,

    pub is_loading: bool,
    pub error: Option<String>,
}

impl TenantState {
    pub fn current_id(&self) -> Option<&TenantId> {
        self.current.as_ref().map(|t| &t.id)
    }

    pub fn is_current(&self, id: &TenantId) -> bool {
        self.current_id() == Some(id)
    }

    pub(crate) fn begin(&mut self) {
        self.is_loading = true;
        self.error = None;
    }
}
