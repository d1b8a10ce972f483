//! Error types for the session layer.

use hostdash_protocol::{ApiErrorBody, ProtocolError};
use hostdash_transport::TransportError;

/// Errors that can occur during session operations.
///
/// These cover the whole lifecycle: sign-in, callback completion,
/// refresh, and every authenticated request made on the user's behalf.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Sign-in was requested with an identity provider other than the
    /// supported one. Rejected before any network call.
    #[error("Only Discord authentication is supported")]
    UnsupportedProvider(String),

    /// A refresh was requested but no refresh token is held.
    #[error("No refresh token available")]
    MissingRefreshToken,

    /// An authenticated call was attempted with no access token.
    #[error("No access token available")]
    MissingAccessToken,

    /// The backend answered with a non-2xx status.
    #[error(
        "backend responded {status}: {}",
        .body.message().unwrap_or("no message")
    )]
    Api { status: u16, body: ApiErrorBody },

    /// No response was obtained at all.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response arrived but didn't match the expected shape.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl SessionError {
    /// The HTTP status, if the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The backend's machine-readable error code, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. } => body.code.as_deref(),
            _ => None,
        }
    }

    /// `true` for a 401, the "credentials expired" signal.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// `true` for a 403, an authorization denial.
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }

    /// The message to show the user.
    ///
    /// Backend errors surface the backend's own message when it sent
    /// one. Local validation errors surface their fixed text. Everything
    /// else (network failures, garbled responses, silent backends) gets
    /// the operation-specific `fallback`.
    pub fn display_message(&self, fallback: &str) -> String {
        match self {
            Self::Api { body, .. } => {
                body.message().unwrap_or(fallback).to_string()
            }
            Self::UnsupportedProvider(_)
            | Self::MissingRefreshToken
            | Self::MissingAccessToken => self.to_string(),
            Self::Transport(_) | Self::Protocol(_) => fallback.to_string(),
        }
    }
}

/// Errors from a persisted store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store contents could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Errors from reading an access token's claims.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Not three dot-separated segments.
    #[error("token is not a three-part bearer token")]
    Malformed,

    /// The payload segment isn't valid base64url.
    #[error("token payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The payload decoded but isn't a JSON claim set.
    #[error("token payload is not a claim set: {0}")]
    Claims(#[source] serde_json::Error),
}
