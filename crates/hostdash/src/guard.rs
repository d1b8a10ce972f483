//! Navigation guards: decisions made before entering a route.
//!
//! Each guard looks at the session and tenant state (restoring it from
//! the store first where that matters) and answers with a
//! [`GuardOutcome`]. Guards never navigate themselves; the caller acts on
//! the outcome, see [`DashboardContext::navigate`].
//!
//! The token-derived super-admin flag is only a shortcut around a round
//! trip. The backend authorizes every privileged call regardless.

use hostdash_protocol::{AdminAccess, endpoints};
use hostdash_transport::{ApiRequest, HttpTransport};

use crate::{DashboardContext, Route};

/// Message shown when a signed-in user may not enter an admin route.
pub const ACCESS_DENIED_MESSAGE: &str = "You do not have permission to access this page";

/// What a guard decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Enter the route.
    Allow,

    /// Go somewhere else instead.
    Redirect(String),

    /// Stay put and show an access-denied page. Distinct from a sign-in
    /// redirect: the user is known, just not permitted.
    AccessDenied(String),
}

impl GuardOutcome {
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Requires a signed-in user. Public routes pass untouched.
pub fn auth_guard<T: HttpTransport>(ctx: &DashboardContext<T>, route: &Route) -> GuardOutcome {
    if route.public {
        return GuardOutcome::Allow;
    }

    let session = ctx.session();
    session.initialize_session();

    if session.is_authenticated() {
        GuardOutcome::Allow
    } else {
        tracing::info!(path = %route.path, "not signed in, redirecting to sign-in");
        GuardOutcome::Redirect(ctx.routes().sign_in.clone())
    }
}

/// Keeps signed-in users off guest-only pages such as sign-in.
pub fn guest_guard<T: HttpTransport>(ctx: &DashboardContext<T>, route: &Route) -> GuardOutcome {
    let session = ctx.session();
    session.initialize_session();

    if session.is_authenticated() {
        tracing::debug!(path = %route.path, "already signed in, redirecting to dashboard");
        GuardOutcome::Redirect(ctx.routes().dashboard.clone())
    } else {
        GuardOutcome::Allow
    }
}

/// Requires platform admin access.
///
/// ```text
/// not signed in ─────────────────────→ Redirect(sign-in)
/// token says superadmin ─────────────→ Allow (no round trip)
/// check-access: hasAdminAccess=true ─→ Allow
///               hasAdminAccess=false → AccessDenied
///               403 ─────────────────→ AccessDenied
///               anything else ───────→ Redirect(sign-in)
/// ```
pub async fn admin_guard<T: HttpTransport>(
    ctx: &DashboardContext<T>,
    route: &Route,
) -> GuardOutcome {
    let session = ctx.session();
    session.initialize_session();

    if !session.is_authenticated() {
        tracing::info!(path = %route.path, "admin route without session, redirecting to sign-in");
        return GuardOutcome::Redirect(ctx.routes().sign_in.clone());
    }

    if session.is_super_admin() {
        tracing::debug!(path = %route.path, "super admin, skipping access check");
        return GuardOutcome::Allow;
    }

    let request = ApiRequest::get(endpoints::ADMIN_CHECK_ACCESS);
    match session.api_request::<AdminAccess>(request).await {
        Ok(AdminAccess {
            has_admin_access: true,
        }) => GuardOutcome::Allow,
        Ok(AdminAccess {
            has_admin_access: false,
        }) => {
            tracing::info!(path = %route.path, "admin access refused");
            GuardOutcome::AccessDenied(ACCESS_DENIED_MESSAGE.to_string())
        }
        Err(err) if err.is_forbidden() => {
            tracing::info!(path = %route.path, "admin access forbidden");
            GuardOutcome::AccessDenied(ACCESS_DENIED_MESSAGE.to_string())
        }
        Err(err) => {
            tracing::warn!(path = %route.path, error = %err, "admin check failed, redirecting to sign-in");
            GuardOutcome::Redirect(ctx.routes().sign_in.clone())
        }
    }
}

/// Reconciles the selected tenant with the route.
///
/// Admin routes are skipped. A route that needs a tenant when none is
/// selected goes to the tenant picker. A route naming a different tenant
/// than the selected one adopts that tenant, or goes to the picker if it
/// can't be fetched.
pub async fn tenant_guard<T: HttpTransport>(
    ctx: &DashboardContext<T>,
    route: &Route,
) -> GuardOutcome {
    let routes = ctx.routes();
    if route.is_under(&routes.admin_prefix) {
        return GuardOutcome::Allow;
    }

    ctx.session().initialize_session();
    let tenants = ctx.tenants();
    tenants.initialize_tenant();

    let current = tenants.current_tenant_id();
    if route.needs_tenant() && current.is_none() {
        tracing::info!(path = %route.path, "no tenant selected, redirecting to selection");
        return GuardOutcome::Redirect(routes.tenant_selection.clone());
    }

    if !route.is_tenant_route() {
        return GuardOutcome::Allow;
    }
    let Some(wanted) = route.tenant_id() else {
        return GuardOutcome::Allow;
    };
    if current.as_ref() == Some(&wanted) {
        return GuardOutcome::Allow;
    }

    tracing::warn!(
        path = %route.path,
        current = ?current.as_ref().map(|id| id.as_str()),
        route_tenant = %wanted,
        "tenant mismatch, adopting route tenant"
    );
    match tenants.adopt_tenant(&wanted).await {
        Ok(_) => GuardOutcome::Allow,
        Err(err) => {
            tracing::warn!(tenant_id = %wanted, error = %err, "route tenant unavailable");
            GuardOutcome::Redirect(routes.tenant_selection.clone())
        }
    }
}
