//! Route descriptions the guards decide on.

use std::collections::BTreeMap;

use hostdash_protocol::TenantId;

/// Prefix of tenant-scoped routes: `/tenant/{id}/...`.
pub const TENANT_ROUTE_PREFIX: &str = "/tenant/";

/// Route parameter naming the tenant in a tenant-scoped route.
pub const TENANT_ID_PARAM: &str = "tenantId";

/// Where the guards send the user. Shared with the managers by
/// [`DashboardContextBuilder`](crate::DashboardContextBuilder), so a
/// route is configured in exactly one place.
#[derive(Debug, Clone)]
pub struct GuardRoutes {
    /// Sign-in page. Unauthenticated users land here.
    pub sign_in: String,

    /// Default authenticated landing page.
    pub dashboard: String,

    /// Tenant picker.
    pub tenant_selection: String,

    /// Routes under this prefix are admin-only and skip the tenant guard.
    pub admin_prefix: String,
}

impl Default for GuardRoutes {
    fn default() -> Self {
        Self {
            sign_in: "/login".to_string(),
            dashboard: "/dashboard".to_string(),
            tenant_selection: "/tenants".to_string(),
            admin_prefix: "/admin".to_string(),
        }
    }
}

/// A route the user is about to enter.
///
/// ```rust
/// use hostdash::Route;
///
/// let route = Route::new("/tenant/t1/servers");
/// assert!(route.needs_tenant());
/// assert_eq!(route.tenant_id().unwrap().as_str(), "t1");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    pub path: String,

    /// Reachable without signing in.
    pub public: bool,

    /// Only for signed-out users (the sign-in page itself).
    pub guest_only: bool,

    /// Needs a selected tenant even outside `/tenant/...`.
    pub requires_tenant: bool,

    /// Parameters extracted by the application's router.
    pub params: BTreeMap<String, String>,
}

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn guest_only(mut self) -> Self {
        self.guest_only = true;
        self
    }

    pub fn requiring_tenant(mut self) -> Self {
        self.requires_tenant = true;
        self
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    /// `true` for `/tenant/...` paths.
    pub fn is_tenant_route(&self) -> bool {
        self.path.starts_with(TENANT_ROUTE_PREFIX)
    }

    pub fn needs_tenant(&self) -> bool {
        self.requires_tenant || self.is_tenant_route()
    }

    /// The tenant a tenant-scoped route names: the router's parameter if
    /// given, otherwise the first path segment after `/tenant/`.
    pub fn tenant_id(&self) -> Option<TenantId> {
        if let Some(id) = self.params.get(TENANT_ID_PARAM) {
            return Some(TenantId(id.clone()));
        }
        self.path
            .strip_prefix(TENANT_ROUTE_PREFIX)?
            .split(['/', '?', '#'])
            .next()
            .filter(|id| !id.is_empty())
            .map(TenantId::from)
    }

    /// `true` if the path is `prefix` or lies beneath it.
    pub fn is_under(&self, prefix: &str) -> bool {
        match self.path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_id_from_path() {
        let route = Route::new("/tenant/abc/dashboard");
        assert_eq!(route.tenant_id(), Some(TenantId::from("abc")));
    }

    #[test]
    fn test_tenant_id_param_wins() {
        let route = Route::new("/tenant/abc/dashboard").param(TENANT_ID_PARAM, "xyz");
        assert_eq!(route.tenant_id(), Some(TenantId::from("xyz")));
    }

    #[test]
    fn test_tenant_id_absent_outside_tenant_routes() {
        assert_eq!(Route::new("/dashboard").tenant_id(), None);
        assert_eq!(Route::new("/tenant/").tenant_id(), None);
    }

    #[test]
    fn test_needs_tenant() {
        assert!(Route::new("/tenant/t1").needs_tenant());
        assert!(Route::new("/servers").requiring_tenant().needs_tenant());
        assert!(!Route::new("/tenants").needs_tenant());
    }

    #[test]
    fn test_is_under_respects_segment_boundaries() {
        assert!(Route::new("/admin").is_under("/admin"));
        assert!(Route::new("/admin/users").is_under("/admin"));
        assert!(!Route::new("/administrator").is_under("/admin"));
    }
}
