//! # hostdash
//!
//! Client-side session and multi-tenant context for the game-hosting
//! dashboard.
//!
//! hostdash keeps track of who is signed in (through a delegated Discord
//! login), keeps their credentials fresh, remembers which tenant they are
//! working in, and decides whether a route may be entered. The managers
//! live in the sub-crates; this crate ties them together in a
//! [`DashboardContext`] and adds the navigation guards.
//!
//! ```text
//! guards ──→ DashboardContext ──→ TenantManager ──→ SessionManager ──→ HttpTransport
//!                                        └──────────────┴──→ SessionStore
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hostdash::prelude::*;
//!
//! # async fn run() -> Result<(), HostdashError> {
//! let ctx = DashboardContext::<ReqwestTransport>::builder()
//!     .backend_url("https://api.example.com")
//!     .build(ReqwestTransport::new()?);
//! ctx.initialize();
//!
//! match ctx.navigate(&Route::new("/tenants")).await {
//!     GuardOutcome::Allow => { /* render */ }
//!     GuardOutcome::Redirect(to) => println!("redirected to {to}"),
//!     GuardOutcome::AccessDenied(msg) => println!("{msg}"),
//! }
//! # Ok(())
//! # }
//! ```

mod context;
mod error;
pub mod guard;
mod route;

pub use context::{DashboardContext, DashboardContextBuilder};
pub use error::HostdashError;
pub use guard::{ACCESS_DENIED_MESSAGE, GuardOutcome};
pub use route::{GuardRoutes, Route, TENANT_ID_PARAM, TENANT_ROUTE_PREFIX};

pub use hostdash_protocol as protocol;
pub use hostdash_session as session;
pub use hostdash_tenant as tenant;
pub use hostdash_transport as transport;

/// Commonly used types, for glob import.
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::{
        DashboardContext, GuardOutcome, GuardRoutes, HostdashError, Route,
    };
    pub use hostdash_protocol::{Tenant, TenantConfig, TenantId, User};
    pub use hostdash_session::{
        FileStore, HistoryNavigator, MemoryStore, Navigator, SessionPhase,
        SessionStore, SignInOptions,
    };
    pub use hostdash_tenant::TenantOptions;
    pub use hostdash_transport::{ApiRequest, HttpTransport, ReqwestTransport};
}
