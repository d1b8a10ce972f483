//! Authentication session management for hostdash.
//!
//! This crate owns everything about "who is signed in":
//!
//! 1. **Token codec**: reading role claims out of an access token
//!    ([`decode_claims`]) for the super-admin fast path
//! 2. **Persisted store**: durable key/value storage that survives
//!    restarts ([`SessionStore`], [`MemoryStore`], [`FileStore`])
//! 3. **Session tracking**: the in-memory session and its state
//!    machine ([`SessionManager`], [`Session`], [`SessionPhase`])
//! 4. **Request wrapping**: bearer attachment with a single
//!    refresh-and-retry on expiry ([`SessionManager::api_request`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Guards (above)      ← read the session to decide on route changes
//!     ↕
//! Tenant layer        ← scopes requests through api_request
//!     ↕
//! Session layer (this crate)
//!     ↕
//! Protocol / Transport (below)
//! ```

mod claims;
mod error;
mod manager;
mod navigate;
mod session;
mod store;

pub use claims::{SUPER_ADMIN_ROLE, TokenClaims, decode_claims};
pub use error::{SessionError, StoreError, TokenError};
pub use manager::SessionManager;
pub use navigate::{HistoryNavigator, Navigation, Navigator};
pub use session::{
    SUPPORTED_PROVIDER, Session, SessionConfig, SessionPhase, SignInOptions,
};
pub use store::{FileStore, MemoryStore, SessionStore, keys};
