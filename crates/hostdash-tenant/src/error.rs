//! Error types for the tenant layer.

use hostdash_session::SessionError;

/// Errors that can occur during tenant operations.
#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    /// The underlying authenticated request failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The backend no longer holds the user's identity-provider
    /// credential. A token refresh can't repair this; only a new login
    /// can, and one has already been scheduled.
    #[error("Please log in again to refresh your Discord connection")]
    ExternalCredentialMissing(#[source] SessionError),
}

impl TenantError {
    /// The message to show the user. See
    /// [`SessionError::display_message`] for how `fallback` is used.
    pub fn display_message(&self, fallback: &str) -> String {
        match self {
            Self::Session(e) => e.display_message(fallback),
            Self::ExternalCredentialMissing(_) => self.to_string(),
        }
    }

    /// The HTTP status, if the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Session(e) | Self::ExternalCredentialMissing(e) => e.status(),
        }
    }
}
