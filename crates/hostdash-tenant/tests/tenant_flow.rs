//! Integration tests for the tenant manager against a scripted backend.

use std::sync::Arc;
use std::time::Duration;

use hostdash_protocol::{TenantConfig, TenantId};
use hostdash_session::{
    HistoryNavigator, MemoryStore, Navigation, SessionConfig, SessionManager,
    SessionStore, keys,
};
use hostdash_tenant::{TenantError, TenantManager, TenantOptions, TenantState};
use hostdash_transport::{ApiRequest, Method, ScriptedTransport, TENANT_HEADER};
use serde_json::{Value, json};

// =========================================================================
// Harness
// =========================================================================

struct Harness {
    tenants: TenantManager<ScriptedTransport>,
    store: Arc<MemoryStore>,
    nav: Arc<HistoryNavigator>,
}

impl Harness {
    fn transport(&self) -> &ScriptedTransport {
        self.tenants.session().transport()
    }
}

fn harness() -> Harness {
    harness_with(TenantOptions::default())
}

/// A signed-in session with an empty tenant state.
fn harness_with(options: TenantOptions) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let nav = Arc::new(HistoryNavigator::new());

    store.set(keys::ACCESS_TOKEN, "access-1").unwrap();
    store.set(keys::REFRESH_TOKEN, "refresh-1").unwrap();
    store
        .set(
            keys::USER,
            &json!({
                "id": "u-1",
                "discord_user_id": "d-1",
                "username": "alice",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            })
            .to_string(),
        )
        .unwrap();

    let session = Arc::new(SessionManager::new(
        ScriptedTransport::new(),
        store.clone(),
        nav.clone(),
        SessionConfig {
            backend_url: "http://api.test".into(),
            ..SessionConfig::default()
        },
    ));
    session.initialize_session();

    Harness {
        tenants: TenantManager::new(session, options),
        store,
        nav,
    }
}

fn tenant_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "discord_server_id": format!("guild-{id}"),
        "name": name,
        "icon": null,
        "owner_id": "u-1",
        "config": {},
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

// =========================================================================
// Membership
// =========================================================================

#[tokio::test]
async fn test_fetch_user_tenants_replaces_list() {
    let h = harness();
    h.transport().respond(
        Method::Get,
        "/api/tenants",
        200,
        json!({ "tenants": [tenant_json("t1", "Alpha"), tenant_json("t2", "Beta")] }),
    );

    let tenants = h.tenants.fetch_user_tenants().await.unwrap();

    assert_eq!(tenants.len(), 2);
    assert_eq!(h.tenants.tenants()[1].name, "Beta");
    assert!(!h.tenants.snapshot().is_loading);
}

#[tokio::test]
async fn test_fetch_user_tenants_failure_keeps_list() {
    let h = harness();
    h.transport()
        .respond(
            Method::Get,
            "/api/tenants",
            200,
            json!({ "tenants": [tenant_json("t1", "Alpha")] }),
        )
        .respond(Method::Get, "/api/tenants", 500, json!({ "message": "db down" }));
    h.tenants.fetch_user_tenants().await.unwrap();

    let err = h.tenants.fetch_user_tenants().await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(h.tenants.error().as_deref(), Some("db down"));
    assert_eq!(h.tenants.tenants().len(), 1);
}

#[tokio::test]
async fn test_fetch_user_tenants_silent_failure_uses_fallback() {
    let h = harness();
    h.transport().fail(Method::Get, "/api/tenants", "connection refused");

    h.tenants.fetch_user_tenants().await.unwrap_err();

    assert_eq!(h.tenants.error().as_deref(), Some("Failed to fetch tenants"));
}

#[tokio::test]
async fn test_fetch_available_organizations() {
    let h = harness();
    h.transport().respond(
        Method::Get,
        "/api/tenants/available-guilds",
        200,
        json!({ "guilds": [{
            "id": "g1",
            "name": "Guild One",
            "icon": null,
            "owner": true,
            "permissions": "8",
            "features": []
        }] }),
    );

    let orgs = h.tenants.fetch_available_organizations().await.unwrap();

    assert_eq!(orgs.len(), 1);
    assert!(orgs[0].owner);
    assert_eq!(h.tenants.available_organizations(), orgs);
}

#[tokio::test]
async fn test_missing_provider_credential_schedules_reauthentication() {
    let h = harness_with(TenantOptions {
        reauth_delay: Duration::from_millis(20),
        ..TenantOptions::default()
    });
    h.transport().respond(
        Method::Get,
        "/api/tenants/available-guilds",
        401,
        json!({ "code": "DISCORD_TOKEN_MISSING", "message": "Discord token missing" }),
    );

    let err = h.tenants.fetch_available_organizations().await.unwrap_err();

    assert!(matches!(err, TenantError::ExternalCredentialMissing(_)));
    assert_eq!(
        h.tenants.error().as_deref(),
        Some("Please log in again to refresh your Discord connection")
    );
    assert_eq!(
        h.transport().call_count(Method::Get, "/api/tenants/available-guilds"),
        1
    );
    assert!(!h.nav.visited("/login?reason=discord_token_expired"));

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(
        h.nav.last(),
        Some(Navigation::Assign("/login?reason=discord_token_expired".into()))
    );
}

#[tokio::test]
async fn test_create_tenant_appends_and_selects() {
    let h = harness();
    h.transport().respond(
        Method::Post,
        "/api/tenants",
        201,
        json!({ "tenant": tenant_json("t9", "New") }),
    );

    let tenant = h.tenants.create_tenant("guild-t9").await.unwrap();

    assert_eq!(tenant.id, TenantId::from("t9"));
    assert_eq!(h.tenants.tenants().len(), 1);
    assert_eq!(h.tenants.current_tenant_id(), Some(TenantId::from("t9")));
    assert!(h.store.get(keys::CURRENT_TENANT).unwrap().contains("\"t9\""));
    assert_eq!(
        h.transport().calls()[0].body,
        Some(json!({ "guild_id": "guild-t9" }))
    );
}

#[tokio::test]
async fn test_update_tenant_config_patches_list_and_current() {
    let h = harness();
    h.transport()
        .respond(
            Method::Get,
            "/api/tenants",
            200,
            json!({ "tenants": [tenant_json("t1", "Alpha")] }),
        )
        .respond_empty(Method::Put, "/api/tenants/t1/config", 200);
    h.tenants.fetch_user_tenants().await.unwrap();
    let first = h.tenants.tenants().remove(0);
    h.tenants.switch_tenant(&first).await;

    let config = TenantConfig {
        default_game_template: Some("minecraft".into()),
        ..TenantConfig::default()
    };
    h.tenants
        .update_tenant_config(&TenantId::from("t1"), config.clone())
        .await
        .unwrap();

    assert_eq!(h.tenants.tenants()[0].config, config);
    assert_eq!(h.tenants.current_tenant().unwrap().config, config);
    assert!(h.store.get(keys::CURRENT_TENANT).unwrap().contains("minecraft"));
}

#[tokio::test]
async fn test_update_tenant_config_failure_leaves_state() {
    let h = harness();
    h.transport()
        .respond(Method::Put, "/api/tenants/t1/config", 403, json!({}));

    let result = h
        .tenants
        .update_tenant_config(&TenantId::from("t1"), TenantConfig::default())
        .await;

    assert!(result.is_err());
    assert_eq!(h.tenants.error().as_deref(), Some("Failed to update tenant config"));
}

#[tokio::test]
async fn test_sync_tenant_posts() {
    let h = harness();
    h.transport().respond_empty(Method::Post, "/api/tenants/t1/sync", 202);

    h.tenants.sync_tenant(&TenantId::from("t1")).await.unwrap();

    assert_eq!(h.transport().call_count(Method::Post, "/api/tenants/t1/sync"), 1);
}

#[tokio::test]
async fn test_delete_current_tenant_clears_pointer() {
    let h = harness();
    h.transport()
        .respond(
            Method::Post,
            "/api/tenants",
            201,
            json!({ "tenant": tenant_json("t1", "Alpha") }),
        )
        .respond_empty(Method::Delete, "/api/tenants/t1", 204);
    h.tenants.create_tenant("guild-t1").await.unwrap();

    h.tenants.delete_tenant(&TenantId::from("t1")).await.unwrap();

    assert!(h.tenants.tenants().is_empty());
    assert_eq!(h.tenants.current_tenant(), None);
    assert!(!h.store.contains(keys::CURRENT_TENANT));
}

#[tokio::test]
async fn test_delete_other_tenant_keeps_pointer() {
    let h = harness();
    h.transport()
        .respond(
            Method::Post,
            "/api/tenants",
            201,
            json!({ "tenant": tenant_json("t1", "Alpha") }),
        )
        .respond_empty(Method::Delete, "/api/tenants/t2", 204);
    h.tenants.create_tenant("guild-t1").await.unwrap();

    h.tenants.delete_tenant(&TenantId::from("t2")).await.unwrap();

    assert_eq!(h.tenants.current_tenant_id(), Some(TenantId::from("t1")));
    assert!(h.store.contains(keys::CURRENT_TENANT));
}

// =========================================================================
// Selection
// =========================================================================

#[tokio::test]
async fn test_switch_tenant_stores_then_navigates() {
    let h = harness();
    let tenant = serde_json::from_value(tenant_json("t2", "Beta")).unwrap();

    h.tenants.switch_tenant(&tenant).await;

    assert_eq!(h.tenants.current_tenant_id(), Some(TenantId::from("t2")));
    assert!(h.store.contains(keys::CURRENT_TENANT));
    assert_eq!(
        h.nav.last(),
        Some(Navigation::Push("/tenant/t2/dashboard".into()))
    );
}

#[tokio::test]
async fn test_adopt_tenant_failure_keeps_current() {
    let h = harness();
    let tenant = serde_json::from_value(tenant_json("t1", "Alpha")).unwrap();
    h.tenants.switch_tenant(&tenant).await;
    h.transport()
        .respond(Method::Get, "/api/tenants/t2", 404, json!({ "message": "not found" }));

    let result = h.tenants.adopt_tenant(&TenantId::from("t2")).await;

    assert!(result.is_err());
    assert_eq!(h.tenants.current_tenant_id(), Some(TenantId::from("t1")));
}

#[tokio::test]
async fn test_initialize_tenant_restores_snapshot() {
    let h = harness();
    h.store
        .set(keys::CURRENT_TENANT, &tenant_json("t3", "Gamma").to_string())
        .unwrap();

    h.tenants.initialize_tenant();
    h.tenants.initialize_tenant();

    assert_eq!(h.tenants.current_tenant().unwrap().name, "Gamma");
}

#[tokio::test]
async fn test_initialize_tenant_discards_corrupt_snapshot() {
    let h = harness();
    h.store.set(keys::CURRENT_TENANT, "{ broken").unwrap();

    h.tenants.initialize_tenant();

    assert_eq!(h.tenants.current_tenant(), None);
    assert!(!h.store.contains(keys::CURRENT_TENANT));
}

#[tokio::test]
async fn test_clear_and_reset() {
    let h = harness();
    let tenant = serde_json::from_value(tenant_json("t1", "Alpha")).unwrap();
    h.tenants.switch_tenant(&tenant).await;

    h.tenants.clear_current_tenant();
    assert_eq!(h.tenants.current_tenant(), None);
    assert!(!h.store.contains(keys::CURRENT_TENANT));

    h.tenants.reset();
    assert_eq!(h.tenants.snapshot(), TenantState::default());
}

// =========================================================================
// Scoped requests
// =========================================================================

#[tokio::test]
async fn test_tenant_headers_empty_without_tenant() {
    let h = harness();
    assert!(h.tenants.tenant_headers().is_empty());
}

#[tokio::test]
async fn test_tenant_api_request_adds_tenant_header() {
    let h = harness();
    let tenant = serde_json::from_value(tenant_json("t1", "Alpha")).unwrap();
    h.tenants.switch_tenant(&tenant).await;
    h.transport()
        .respond(Method::Get, "/api/servers", 200, json!({ "servers": [] }));

    let body: Value = h
        .tenants
        .tenant_api_request(ApiRequest::get("/api/servers").header(TENANT_HEADER, "stale"))
        .await
        .unwrap();

    assert_eq!(body, json!({ "servers": [] }));
    let call = &h.transport().calls()[0];
    assert_eq!(call.url, "http://api.test/api/servers");
    assert_eq!(call.header_value(TENANT_HEADER), Some("t1"));
    assert_eq!(call.header_value("authorization"), Some("Bearer access-1"));
}

#[tokio::test]
async fn test_tenant_api_request_without_tenant_sends_no_header() {
    let h = harness();
    h.transport()
        .respond(Method::Get, "/api/servers", 200, json!({}));

    let _: Value = h
        .tenants
        .tenant_api_request(ApiRequest::get("/api/servers"))
        .await
        .unwrap();

    assert_eq!(h.transport().calls()[0].header_value(TENANT_HEADER), None);
}
