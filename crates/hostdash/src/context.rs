//! `DashboardContext` builder and the handle the application holds.
//!
//! The context ties the layers together: transport → session → tenant,
//! plus the routes the guards send the user to. It is constructed once
//! at startup and passed to whatever needs it.

use std::sync::Arc;

use hostdash_session::{
    HistoryNavigator, MemoryStore, Navigator, SessionConfig, SessionManager,
    SessionStore,
};
use hostdash_tenant::{TenantManager, TenantOptions};
use hostdash_transport::HttpTransport;

use crate::{GuardOutcome, GuardRoutes, Route, guard};

/// Builder for a [`DashboardContext`].
///
/// # Example
///
/// ```rust,ignore
/// use hostdash::prelude::*;
///
/// let ctx = DashboardContext::builder()
///     .backend_url("https://api.example.com")
///     .store(Arc::new(FileStore::open("session.json")?))
///     .build(ReqwestTransport::new()?);
/// ctx.initialize();
/// ```
pub struct DashboardContextBuilder {
    session_config: SessionConfig,
    tenant_options: TenantOptions,
    routes: GuardRoutes,
    store: Option<Arc<dyn SessionStore>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl DashboardContextBuilder {
    /// Creates a builder with default settings, an in-memory store, and
    /// a recording navigator.
    pub fn new() -> Self {
        Self {
            session_config: SessionConfig::default(),
            tenant_options: TenantOptions::default(),
            routes: GuardRoutes::default(),
            store: None,
            navigator: None,
        }
    }

    /// Sets the base URL relative request paths are joined onto.
    pub fn backend_url(mut self, url: &str) -> Self {
        self.session_config.backend_url = url.to_string();
        self
    }

    /// Sets the routes. They also become the session's sign-in and
    /// landing routes and the tenant manager's selection route.
    pub fn routes(mut self, routes: GuardRoutes) -> Self {
        self.routes = routes;
        self
    }

    /// Sets the tenant options (re-authentication route and delay).
    pub fn tenant_options(mut self, options: TenantOptions) -> Self {
        self.tenant_options = options;
        self
    }

    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Builds the context over `transport`. Nothing is restored yet; call
    /// [`DashboardContext::initialize`] for that.
    pub fn build<T: HttpTransport>(self, transport: T) -> DashboardContext<T> {
        let Self {
            mut session_config,
            mut tenant_options,
            routes,
            store,
            navigator,
        } = self;

        session_config.sign_in_route = routes.sign_in.clone();
        session_config.landing_route = routes.dashboard.clone();
        tenant_options.selection_route = routes.tenant_selection.clone();

        let store: Arc<dyn SessionStore> = match store {
            Some(store) => store,
            None => Arc::new(MemoryStore::new()),
        };
        let navigator: Arc<dyn Navigator> = match navigator {
            Some(navigator) => navigator,
            None => Arc::new(HistoryNavigator::new()),
        };

        tracing::debug!(backend_url = %session_config.backend_url, "dashboard context built");

        let session = Arc::new(SessionManager::new(
            transport,
            store,
            navigator,
            session_config,
        ));
        let tenants = Arc::new(TenantManager::new(Arc::clone(&session), tenant_options));

        DashboardContext {
            session,
            tenants,
            routes,
        }
    }
}

impl Default for DashboardContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The session and tenant managers for one application instance.
///
/// Cheap to share: the managers are reference counted, so the context
/// can be cloned into every task that needs it.
pub struct DashboardContext<T: HttpTransport> {
    session: Arc<SessionManager<T>>,
    tenants: Arc<TenantManager<T>>,
    routes: GuardRoutes,
}

impl<T: HttpTransport> Clone for DashboardContext<T> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            tenants: Arc::clone(&self.tenants),
            routes: self.routes.clone(),
        }
    }
}

impl<T: HttpTransport> DashboardContext<T> {
    pub fn builder() -> DashboardContextBuilder {
        DashboardContextBuilder::new()
    }

    pub fn session(&self) -> &SessionManager<T> {
        &self.session
    }

    pub fn tenants(&self) -> &TenantManager<T> {
        &self.tenants
    }

    pub fn routes(&self) -> &GuardRoutes {
        &self.routes
    }

    /// Restores the session and the current tenant from the store.
    pub fn initialize(&self) {
        self.session.initialize_session();
        self.tenants.initialize_tenant();
    }

    /// Signs out: the tenant context is dropped first so nothing scoped
    /// to the old user survives, then the session is ended.
    pub async fn sign_out(&self) {
        self.tenants.clear_current_tenant();
        self.tenants.reset();
        self.session.sign_out().await;
    }

    /// Runs every guard that applies to `route` and returns the first
    /// outcome that isn't [`GuardOutcome::Allow`].
    ///
    /// ```text
    /// guest_only ──→ guest guard
    /// otherwise  ──→ auth guard ──→ admin guard (admin routes)
    ///                           └─→ tenant guard (all others)
    /// ```
    pub async fn check_route(&self, route: &Route) -> GuardOutcome {
        if route.guest_only {
            return guard::guest_guard(self, route);
        }

        let outcome = guard::auth_guard(self, route);
        if !outcome.is_allow() || route.public {
            return outcome;
        }

        if route.is_under(&self.routes.admin_prefix) {
            guard::admin_guard(self, route).await
        } else {
            guard::tenant_guard(self, route).await
        }
    }

    /// Checks `route` and performs the resulting navigation. Returns the
    /// outcome so the caller can render an access-denied page.
    pub async fn navigate(&self, route: &Route) -> GuardOutcome {
        let outcome = self.check_route(route).await;
        let navigator = self.session.navigator();
        match &outcome {
            GuardOutcome::Allow => navigator.push(&route.path),
            GuardOutcome::Redirect(target) => navigator.push(target),
            GuardOutcome::AccessDenied(message) => {
                tracing::info!(path = %route.path, message = %message, "access denied");
            }
        }
        outcome
    }
}
