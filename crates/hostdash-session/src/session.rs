//! Session types: the client-held identity and its credentials.
//!
//! A "session" is everything the dashboard knows about who is signed in:
//! - WHO the user is ([`User`])
//! - WHAT credentials authorize their calls (access + refresh tokens)
//! - WHERE the session is in its lifecycle ([`SessionPhase`])
//! - HOW the last operation went (loading and error flags for the UI)

use std::fmt;

use hostdash_protocol::User;

use crate::claims::super_admin_from_token;

/// The only identity provider sign-in accepts.
pub const SUPPORTED_PROVIDER: &str = "discord";

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Where the backend lives and where the session sends the user.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL that relative request paths are joined onto.
    pub backend_url: String,

    /// Sign-in entry point. Sign-out and terminal credential failures
    /// navigate here.
    pub sign_in_route: String,

    /// Where callback completion lands when no redirect target was saved.
    pub landing_route: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8080".to_string(),
            sign_in_route: "/login".to_string(),
            landing_route: "/dashboard".to_string(),
        }
    }
}

/// Options for [`SessionManager::sign_in`](crate::SessionManager::sign_in).
#[derive(Debug, Clone, Default)]
pub struct SignInOptions {
    /// Route to land on after the login round trip completes.
    pub callback_url: Option<String>,
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Where a session is in its lifecycle.
///
/// ```text
///  Anonymous ──sign_in──→ Authenticating ──callback ok──→ Authenticated
///      ↑                        │                          │      ↑
///      └────────failure─────────┘                    401  │      │ refresh ok
///      ↑                                                   ▼      │
///      └──────────────refresh rejected─────────────── Refreshing ─┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated,
    Refreshing,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Anonymous"),
            Self::Authenticating => write!(f, "Authenticating"),
            Self::Authenticated => write!(f, "Authenticated"),
            Self::Refreshing => write!(f, "Refreshing"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The in-memory session.
///
/// Owned exclusively by the [`SessionManager`](crate::SessionManager);
/// everyone else sees clones from
/// [`snapshot`](crate::SessionManager::snapshot).
#[derive(Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub phase: SessionPhase,

    /// An operation is in flight.
    pub is_loading: bool,

    /// Message from the last failed operation, cleared when the next
    /// operation starts.
    pub error: Option<String>,

    /// Derived from the access token every time it is set. Private so it
    /// can't drift from the token it came from.
    is_super_admin: bool,
}

impl Session {
    /// `true` iff both tokens and the user are present.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
            && self.access_token.is_some()
            && self.refresh_token.is_some()
    }

    /// Token-derived super-admin flag. A UI fast path only; the backend
    /// re-checks every privileged call.
    pub fn is_super_admin(&self) -> bool {
        self.is_super_admin
    }

    /// Installs a new token pair and re-derives the super-admin flag.
    pub(crate) fn set_tokens(&mut self, access: String, refresh: String) {
        self.is_super_admin = super_admin_from_token(&access);
        self.access_token = Some(access);
        self.refresh_token = Some(refresh);
    }

    /// Drops identity and credentials. The error message survives so the
    /// UI can still explain why the user was signed out.
    pub(crate) fn reset_credentials(&mut self) {
        self.user = None;
        self.access_token = None;
        self.refresh_token = None;
        self.is_super_admin = false;
        self.phase = SessionPhase::Anonymous;
        self.is_loading = false;
    }

    /// Marks the start of an operation.
    pub(crate) fn begin(&mut self) {
        self.is_loading = true;
        self.error = None;
    }
}

/// Tokens are redacted so a session can be logged safely.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |t: &Option<String>| t.as_ref().map(|_| "<redacted>");
        f.debug_struct("Session")
            .field("user", &self.user.as_ref().map(|u| &u.username))
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("phase", &self.phase)
            .field("is_loading", &self.is_loading)
            .field("error", &self.error)
            .field("is_super_admin", &self.is_super_admin)
            .finish()
    }
}
