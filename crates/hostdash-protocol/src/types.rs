//! Identity and authentication types exchanged with the backend.
//!
//! Field names follow the backend's JSON exactly (snake_case, except the
//! admin check which answers in camelCase).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A backend-assigned user identifier.
///
/// Newtype over `String` so a user id can't be passed where a tenant id
/// is expected. Serialized as the bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The signed-in human, as the backend describes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Identifier at the external identity provider.
    pub discord_user_id: String,

    pub username: String,

    /// Avatar reference at the identity provider, if the user set one.
    #[serde(default)]
    pub avatar: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Auth flow bodies
// ---------------------------------------------------------------------------

/// `GET /auth/login` response: where to send the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub auth_url: String,
    pub state: String,
}

/// The credential bundle returned by callback completion and refresh.
///
/// `user` is absent when tokens arrive by redirect and the profile has
/// to be fetched separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,

    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: u64,

    #[serde(default)]
    pub user: Option<User>,
}

/// `POST /auth/refresh` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// `GET /auth/me` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: User,
}

/// `GET /api/admin/check-access` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminAccess {
    #[serde(rename = "hasAdminAccess")]
    pub has_admin_access: bool,
}

// ---------------------------------------------------------------------------
// ApiErrorBody
// ---------------------------------------------------------------------------

/// The body the backend sends alongside an error status.
///
/// Most handlers answer `{ code, message, details }`; a few older ones
/// answer `{ error }`. Every field is optional so either shape parses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiErrorBody {
    /// The human-readable message, preferring `message` over `error`.
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .filter(|m| !m.is_empty())
    }

    /// Parses an error body leniently: anything unparseable yields an
    /// empty body rather than an error, since the status alone still
    /// carries meaning.
    pub fn from_bytes(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }
}
