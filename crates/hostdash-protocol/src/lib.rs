//! Wire protocol for hostdash.
//!
//! This crate defines the "language" the dashboard core speaks with the
//! backend and with its own persisted storage:
//!
//! - **Types** ([`User`], [`TokenBundle`], [`Tenant`], ...): the JSON
//!   shapes the backend sends and accepts.
//! - **Endpoints** ([`endpoints`]): the paths of the REST contract.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how snapshots are
//!   turned into strings for the persisted store and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (typed bodies) → Session / Tenant state
//! ```

mod codec;
pub mod endpoints;
mod error;
mod tenant;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use tenant::{
    CreateTenantRequest, ExternalOrganization, OrganizationList,
    ResourceLimits, Tenant, TenantConfig, TenantEnvelope, TenantId,
    TenantList,
};
pub use types::{
    AdminAccess, ApiErrorBody, LoginResponse, RefreshRequest, TokenBundle,
    User, UserEnvelope, UserId,
};
