//! Paths of the backend REST contract, relative to the backend base URL.

use crate::TenantId;

pub const AUTH_LOGIN: &str = "/auth/login";
pub const AUTH_CALLBACK: &str = "/auth/callback";
pub const AUTH_REFRESH: &str = "/auth/refresh";
pub const AUTH_LOGOUT: &str = "/auth/logout";
pub const AUTH_ME: &str = "/auth/me";

pub const TENANTS: &str = "/api/tenants";
pub const AVAILABLE_ORGANIZATIONS: &str = "/api/tenants/available-guilds";

pub const ADMIN_CHECK_ACCESS: &str = "/api/admin/check-access";

/// Error code the backend sends when the session lacks the external
/// provider's credential. Token refresh can't fix it; only a fresh login can.
pub const EXTERNAL_CREDENTIAL_MISSING: &str = "DISCORD_TOKEN_MISSING";

/// `/api/tenants/{id}`
pub fn tenant(id: &TenantId) -> String {
    format!("{TENANTS}/{id}")
}

/// `/api/tenants/{id}/config`
pub fn tenant_config(id: &TenantId) -> String {
    format!("{TENANTS}/{id}/config")
}

/// `/api/tenants/{id}/sync`
pub fn tenant_sync(id: &TenantId) -> String {
    format!("{TENANTS}/{id}/sync")
}
