//! Unified error type for hostdash.

use hostdash_protocol::ProtocolError;
use hostdash_session::{SessionError, StoreError, TokenError};
use hostdash_tenant::TenantError;
use hostdash_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Applications using the `hostdash` meta-crate deal with this single
/// type; `?` converts sub-crate errors through the `#[from]` impls.
#[derive(Debug, thiserror::Error)]
pub enum HostdashError {
    /// No response from the backend.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A body or snapshot didn't match the expected shape.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Sign-in, refresh, or an authenticated request failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The persisted store couldn't be opened or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An access token's claims couldn't be read.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// A tenant operation failed.
    #[error(transparent)]
    Tenant(#[from] TenantError),
}

impl HostdashError {
    /// The message to show the user, with `fallback` for failures that
    /// carry no message of their own.
    pub fn display_message(&self, fallback: &str) -> String {
        match self {
            Self::Session(e) => e.display_message(fallback),
            Self::Tenant(e) => e.display_message(fallback),
            _ => fallback.to_string(),
        }
    }
}
