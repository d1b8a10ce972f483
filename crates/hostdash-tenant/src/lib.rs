//! Tenant context for hostdash.
//!
//! A tenant is a customer organization bound to an external server. The
//! user may belong to several; at most one is selected at a time, and
//! that selection scopes tenant-specific backend calls through the
//! `X-Tenant-ID` header.
//!
//! ```text
//! fetch_user_tenants ──→ tenants ──switch_tenant──→ current ──→ /tenant/{id}/dashboard
//!                                                      │
//!                                  tenant_api_request ─┘ (adds X-Tenant-ID)
//! ```
//!
//! All calls are made through the session layer's authenticated request
//! wrapper; this crate adds no transport of its own.

mod error;
mod manager;
mod state;

pub use error::TenantError;
pub use manager::TenantManager;
pub use state::{TenantOptions, TenantState};
