//! The session manager: owns the signed-in session and every call made
//! with its credentials.
//!
//! Responsibilities:
//! - Driving the login flow (sign-in redirect, callback completion,
//!   redirect-carried tokens)
//! - Keeping the in-memory session and the persisted snapshot in step
//! - Renewing credentials, with at most one refresh and one retry per call
//! - Tearing everything down on sign-out, terminal refresh failure, or
//!   corrupted storage
//!
//! # Concurrency note
//!
//! The session lives behind a plain `std::sync::Mutex` that is only ever
//! held for synchronous field updates, never across an `.await`. Readers
//! therefore never see a half-applied change. Refreshes are serialized by
//! a separate async gate so concurrent requests that expire together
//! share a single token exchange.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hostdash_protocol::{
    ApiErrorBody, Codec, JsonCodec, LoginResponse, ProtocolError,
    RefreshRequest, TokenBundle, User, UserEnvelope, endpoints,
};
use hostdash_transport::{
    AUTHORIZATION, ApiRequest, ApiResponse, HttpTransport,
};
use serde::de::{DeserializeOwned, IgnoredAny};

use crate::{
    Navigator, SUPPORTED_PROVIDER, Session, SessionConfig, SessionError,
    SessionPhase, SessionStore, SignInOptions, keys,
};

/// Manages the authenticated session.
///
/// ## Lifecycle
///
/// ```text
/// initialize_session() ──→ [Authenticated] (restored) or unchanged
///
/// sign_in() ──→ [Authenticating] ──handle_callback()──→ [Authenticated]
///                                                           │
///                         api_request() hits 401 ──→ [Refreshing]
///                                                     │        │
///                                              refreshed   rejected
///                                                     │        │
///                                        [Authenticated]   [Anonymous]
///
/// sign_out() ──→ [Anonymous]
/// ```
pub struct SessionManager<T: HttpTransport> {
    transport: T,
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    config: SessionConfig,
    codec: JsonCodec,

    /// The session itself. Only locked for synchronous updates.
    state: Mutex<Session>,

    /// Serializes token exchanges so concurrent expiries refresh once.
    refresh_gate: tokio::sync::Mutex<()>,
}

impl<T: HttpTransport> SessionManager<T> {
    /// Creates a manager with an empty (anonymous) session. Call
    /// [`initialize_session`](Self::initialize_session) to restore a
    /// persisted one.
    pub fn new(
        transport: T,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
        config: SessionConfig,
    ) -> Self {
        Self {
            transport,
            store,
            navigator,
            config,
            codec: JsonCodec,
            state: Mutex::new(Session::default()),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    // -- Accessors --------------------------------------------------------

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The persisted store shared with the tenant layer.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// A copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.lock().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_authenticated()
    }

    pub fn is_super_admin(&self) -> bool {
        self.lock().is_super_admin()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().phase
    }

    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock().access_token.clone()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.lock().refresh_token.is_some()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Joins a relative path onto the backend URL. Absolute URLs pass
    /// through untouched.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{}", self.config.backend_url.trim_end_matches('/'), url)
        }
    }

    // -- Sign-in flow -----------------------------------------------------

    /// Starts the delegated login flow.
    ///
    /// Asks the backend for the provider's authorization URL, remembers
    /// where to land afterwards, and sends the browser away. Nothing else
    /// happens in-process until [`handle_callback`](Self::handle_callback).
    ///
    /// # Errors
    /// - [`SessionError::UnsupportedProvider`], before any network call
    /// - any request error while fetching the authorization URL
    pub async fn sign_in(
        &self,
        provider: &str,
        options: SignInOptions,
    ) -> Result<(), SessionError> {
        if provider != SUPPORTED_PROVIDER {
            let err = SessionError::UnsupportedProvider(provider.to_string());
            tracing::warn!(provider, "sign-in with unsupported provider");
            self.record_error(&err, "");
            return Err(err);
        }

        self.update(|s| {
            s.begin();
            s.phase = SessionPhase::Authenticating;
        });

        let login: LoginResponse =
            match self.call(ApiRequest::get(endpoints::AUTH_LOGIN)).await {
                Ok(login) => login,
                Err(err) => {
                    tracing::error!(error = %err, "failed to initiate login");
                    self.fail_to_anonymous(&err, "Failed to initiate Discord login");
                    return Err(err);
                }
            };

        if let Some(target) = options.callback_url.as_deref() {
            self.persist(keys::CALLBACK_URL, target);
        }

        tracing::info!("redirecting to identity provider");
        self.navigator.assign(&login.auth_url);
        Ok(())
    }

    /// Completes the login flow with the provider's `code` and `state`.
    ///
    /// On success the session is stored and the user lands on the saved
    /// redirect target (taken and cleared), or the landing route.
    ///
    /// # Errors
    /// Any request error from the exchange. The session stays anonymous
    /// and the error message is surfaced.
    pub async fn handle_callback(
        &self,
        code: &str,
        state: &str,
    ) -> Result<(), SessionError> {
        self.update(|s| {
            s.begin();
            s.phase = SessionPhase::Authenticating;
        });

        let request = ApiRequest::get(endpoints::AUTH_CALLBACK)
            .query("code", code)
            .query("state", state);

        let bundle: TokenBundle = match self.call(request).await {
            Ok(bundle) => bundle,
            Err(err) => {
                tracing::error!(error = %err, "OAuth callback exchange failed");
                self.fail_to_anonymous(&err, "Failed to handle OAuth callback");
                return Err(err);
            }
        };

        self.store_bundle(bundle);

        // Let the state write settle before the destination's guards run.
        tokio::task::yield_now().await;

        let target = self.take_callback_url();
        let target = target.unwrap_or_else(|| self.config.landing_route.clone());
        tracing::info!(target = %target, "signed in");
        self.navigator.push(&target);
        Ok(())
    }

    /// Adopts tokens delivered directly (e.g. carried on a backend
    /// redirect), then fetches the user they belong to.
    ///
    /// # Errors
    /// Any error from the profile fetch. The injected tokens are
    /// discarded and the session returns to anonymous.
    pub async fn handle_tokens_from_url(
        &self,
        access_token: &str,
        refresh_token: &str,
        expires_in: u64,
    ) -> Result<User, SessionError> {
        self.update(|s| {
            s.begin();
            s.user = None;
            s.phase = SessionPhase::Authenticating;
        });
        if let Err(e) = self.store.remove(keys::USER) {
            tracing::warn!(key = keys::USER, error = %e, "removing session key failed");
        }

        self.store_bundle(TokenBundle {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_in,
            user: None,
        });

        match self.get_current_user().await {
            Ok(user) => Ok(user),
            Err(err) => {
                tracing::warn!(error = %err, "injected tokens rejected");
                self.reset_credentials();
                self.record_error(&err, "Failed to get current user");
                Err(err)
            }
        }
    }

    /// Fetches the signed-in user's profile and updates the snapshot.
    ///
    /// # Errors
    /// [`SessionError::MissingAccessToken`] without a token, otherwise
    /// any request error.
    pub async fn get_current_user(&self) -> Result<User, SessionError> {
        if self.access_token().is_none() {
            let err = SessionError::MissingAccessToken;
            self.record_error(&err, "");
            return Err(err);
        }

        self.update(Session::begin);

        match self.api_request::<UserEnvelope>(ApiRequest::get(endpoints::AUTH_ME)).await {
            Ok(UserEnvelope { user }) => {
                self.persist_user(&user);
                self.update(|s| {
                    s.user = Some(user.clone());
                    s.is_loading = false;
                    if s.is_authenticated() {
                        s.phase = SessionPhase::Authenticated;
                    }
                });
                Ok(user)
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to get current user");
                self.record_error(&err, "Failed to get current user");
                Err(err)
            }
        }
    }

    // -- Refresh ----------------------------------------------------------

    /// Exchanges the refresh token for a new bundle and stores it.
    /// Returns the new access token.
    ///
    /// Refresh tokens are single-shot: a rejected exchange is terminal
    /// for the session, which is cleared.
    ///
    /// # Errors
    /// [`SessionError::MissingRefreshToken`] without a refresh token,
    /// otherwise the exchange error.
    pub async fn refresh_access_token(&self) -> Result<String, SessionError> {
        let Some(refresh_token) = self.lock().refresh_token.clone() else {
            let err = SessionError::MissingRefreshToken;
            self.record_error(&err, "");
            return Err(err);
        };

        let body = serde_json::to_value(RefreshRequest { refresh_token })
            .map_err(ProtocolError::Encode)?;
        let request = ApiRequest::post(endpoints::AUTH_REFRESH).json(body);

        match self.call::<TokenBundle>(request).await {
            Ok(bundle) => {
                tracing::info!(expires_in = bundle.expires_in, "access token refreshed");
                let access = bundle.access_token.clone();
                self.store_bundle(bundle);
                Ok(access)
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh rejected, clearing session");
                self.reset_credentials();
                self.record_error(&err, "Failed to refresh token");
                Err(err)
            }
        }
    }

    /// Refreshes on behalf of a request whose `rejected` token got a 401.
    ///
    /// If another request already replaced that token while this one
    /// waited at the gate, the exchange is skipped and the caller retries
    /// with the newer token.
    async fn refresh_after_rejection(&self, rejected: &str) -> Result<(), SessionError> {
        let _gate = self.refresh_gate.lock().await;

        let current = self.access_token();
        if current.as_deref().is_some_and(|t| t != rejected) {
            tracing::debug!("token already refreshed by a concurrent request");
            self.update(|s| {
                if s.is_authenticated() {
                    s.phase = SessionPhase::Authenticated;
                }
            });
            return Ok(());
        }

        self.refresh_access_token().await.map(|_| ())
    }

    // -- Sign-out ---------------------------------------------------------

    /// Signs out. The backend is notified on a best-effort basis; local
    /// cleanup and the redirect to sign-in always happen.
    pub async fn sign_out(&self) {
        self.update(Session::begin);

        if let Some(token) = self.access_token() {
            let request = ApiRequest::post(endpoints::AUTH_LOGOUT)
                .header(AUTHORIZATION, &bearer(&token));
            if let Err(err) = self.call::<IgnoredAny>(request).await {
                tracing::warn!(error = %err, "backend logout failed, continuing local sign-out");
            }
        }

        self.clear_session();
        tracing::info!("signed out");
        self.navigator.push(&self.config.sign_in_route);
    }

    // -- Authenticated requests -------------------------------------------

    /// Performs an authenticated call and decodes the JSON response.
    ///
    /// The current access token is attached as a bearer credential. If
    /// the backend answers 401 and a refresh token is held, the manager
    /// performs exactly one refresh and retries exactly once. If the
    /// refresh or the retry fails, the session is cleared, the user is
    /// sent to sign-in, and that error is returned. Any other failure is
    /// returned as-is, with no retry. So is a 401 carrying the
    /// missing-provider-credential code, which only a new login repairs.
    ///
    /// Empty response bodies decode as JSON `null`, so `()` and
    /// [`IgnoredAny`] work for acknowledgement-only endpoints.
    ///
    /// # Errors
    /// [`SessionError::MissingAccessToken`] when signed out, otherwise
    /// the request, refresh, or decode error.
    pub async fn api_request<R: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<R, SessionError> {
        let response = self.authorized_send(request).await?;
        Ok(self.codec.decode_body(&response.body)?)
    }

    async fn authorized_send(
        &self,
        request: ApiRequest,
    ) -> Result<ApiResponse, SessionError> {
        let Some(token) = self.access_token() else {
            return Err(SessionError::MissingAccessToken);
        };

        let err = match self.send_with_token(&request, &token).await {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };

        // A missing provider credential is a 401 that a refresh can't fix.
        let refreshable = err.is_unauthorized()
            && err.code() != Some(endpoints::EXTERNAL_CREDENTIAL_MISSING);
        if !refreshable || !self.has_refresh_token() {
            return Err(err);
        }

        tracing::info!(url = %request.url, "access token rejected, refreshing");
        self.update(|s| s.phase = SessionPhase::Refreshing);

        if let Err(refresh_err) = self.refresh_after_rejection(&token).await {
            self.expire();
            return Err(refresh_err);
        }

        let Some(token) = self.access_token() else {
            self.expire();
            return Err(SessionError::MissingAccessToken);
        };

        match self.send_with_token(&request, &token).await {
            Ok(response) => Ok(response),
            Err(retry_err) => {
                tracing::warn!(
                    url = %request.url,
                    error = %retry_err,
                    "request failed after refresh, signing out"
                );
                self.expire();
                Err(retry_err)
            }
        }
    }

    async fn send_with_token(
        &self,
        request: &ApiRequest,
        token: &str,
    ) -> Result<ApiResponse, SessionError> {
        let request = request.clone().header(AUTHORIZATION, &bearer(token));
        self.send(request).await
    }

    /// Sends without credentials and decodes the response.
    async fn call<R: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<R, SessionError> {
        let response = self.send(request).await?;
        Ok(self.codec.decode_body(&response.body)?)
    }

    async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, SessionError> {
        if !request.is_absolute() {
            request.url = self.resolve_url(&request.url);
        }
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(SessionError::Api {
                status: response.status,
                body: ApiErrorBody::from_bytes(&response.body),
            });
        }
        Ok(response)
    }

    // -- Restore / clear --------------------------------------------------

    /// Restores the session from the persisted store.
    ///
    /// Idempotent. If access token, refresh token, and user snapshot are
    /// all present and the snapshot parses, the session becomes
    /// authenticated with the super-admin flag re-derived from the token.
    /// An unparseable snapshot is treated as corruption: all session keys
    /// are wiped. With nothing stored, the in-memory session is left as is.
    pub fn initialize_session(&self) {
        let stored = |key: &str| self.store.get(key).filter(|v| !v.is_empty());
        let (Some(access), Some(refresh), Some(user_data)) = (
            stored(keys::ACCESS_TOKEN),
            stored(keys::REFRESH_TOKEN),
            stored(keys::USER),
        ) else {
            tracing::debug!("no stored session");
            return;
        };

        match self.codec.decode::<User>(&user_data) {
            Ok(user) => {
                let restored = self.update(|s| {
                    s.user = Some(user);
                    s.set_tokens(access, refresh);
                    s.phase = SessionPhase::Authenticated;
                    s.is_loading = false;
                    s.error = None;
                    s.is_super_admin()
                });
                tracing::debug!(is_super_admin = restored, "session restored from storage");
            }
            Err(err) => {
                tracing::warn!(error = %err, "stored user snapshot is corrupt, clearing session");
                self.clear_session();
            }
        }
    }

    /// Clears the session completely: memory, persisted keys, and error.
    pub fn clear_session(&self) {
        self.reset_credentials();
        self.update(|s| s.error = None);
    }

    pub fn clear_error(&self) {
        self.update(|s| s.error = None);
    }

    // -- Internals --------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.lock())
    }

    /// Installs a bundle in memory and in the store.
    fn store_bundle(&self, bundle: TokenBundle) {
        let TokenBundle {
            access_token,
            refresh_token,
            user,
            ..
        } = bundle;

        self.persist(keys::ACCESS_TOKEN, &access_token);
        self.persist(keys::REFRESH_TOKEN, &refresh_token);
        if let Some(user) = &user {
            self.persist_user(user);
        }

        self.update(|s| {
            s.set_tokens(access_token, refresh_token);
            if user.is_some() {
                s.user = user;
            }
            s.is_loading = false;
            s.error = None;
            s.phase = if s.is_authenticated() {
                SessionPhase::Authenticated
            } else {
                SessionPhase::Authenticating
            };
        });
    }

    fn persist_user(&self, user: &User) {
        match self.codec.encode(user) {
            Ok(text) => self.persist(keys::USER, &text),
            Err(e) => tracing::warn!(error = %e, "user snapshot could not be encoded"),
        }
    }

    /// Best-effort store write.
    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            tracing::warn!(key, error = %e, "persisting session value failed");
        }
    }

    fn take_callback_url(&self) -> Option<String> {
        let target = self.store.get(keys::CALLBACK_URL);
        if target.is_some() {
            if let Err(e) = self.store.remove(keys::CALLBACK_URL) {
                tracing::warn!(error = %e, "clearing redirect target failed");
            }
        }
        target.filter(|t| !t.is_empty())
    }

    /// Drops credentials in memory and in storage, keeping the error.
    fn reset_credentials(&self) {
        self.update(Session::reset_credentials);
        for key in keys::SESSION {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key, error = %e, "removing session key failed");
            }
        }
    }

    /// Terminal credential failure: clear and send the user to sign-in.
    fn expire(&self) {
        self.reset_credentials();
        self.navigator.push(&self.config.sign_in_route);
    }

    fn record_error(&self, err: &SessionError, fallback: &str) {
        let message = err.display_message(fallback);
        self.update(|s| {
            s.error = Some(message);
            s.is_loading = false;
        });
    }

    fn fail_to_anonymous(&self, err: &SessionError, fallback: &str) {
        self.record_error(err, fallback);
        self.update(|s| s.phase = SessionPhase::Anonymous);
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for the pieces that don't need a scripted backend.
    //! Full flows live in `tests/session_flow.rs`.

    use super::*;
    use crate::{HistoryNavigator, MemoryStore};
    use hostdash_transport::ScriptedTransport;

    fn manager() -> SessionManager<ScriptedTransport> {
        SessionManager::new(
            ScriptedTransport::new(),
            Arc::new(MemoryStore::new()),
            Arc::new(HistoryNavigator::new()),
            SessionConfig {
                backend_url: "http://api.test/".into(),
                ..SessionConfig::default()
            },
        )
    }

    #[test]
    fn test_resolve_url_joins_relative_paths() {
        let mgr = manager();
        assert_eq!(mgr.resolve_url("/auth/me"), "http://api.test/auth/me");
    }

    #[test]
    fn test_resolve_url_passes_absolute_urls_through() {
        let mgr = manager();
        assert_eq!(
            mgr.resolve_url("https://elsewhere.test/x"),
            "https://elsewhere.test/x"
        );
    }

    #[test]
    fn test_bearer_format() {
        assert_eq!(bearer("abc"), "Bearer abc");
    }

    #[test]
    fn test_new_manager_is_anonymous() {
        let mgr = manager();
        assert_eq!(mgr.phase(), SessionPhase::Anonymous);
        assert!(!mgr.is_authenticated());
        assert_eq!(mgr.access_token(), None);
    }

    #[test]
    fn test_clear_error() {
        let mgr = manager();
        mgr.record_error(&SessionError::MissingAccessToken, "");
        assert!(mgr.error().is_some());

        mgr.clear_error();

        assert_eq!(mgr.error(), None);
    }

    #[tokio::test]
    async fn test_api_request_without_token_makes_no_call() {
        let mgr = manager();

        let result: Result<IgnoredAny, _> =
            mgr.api_request(ApiRequest::get("/api/tenants")).await;

        assert!(matches!(result, Err(SessionError::MissingAccessToken)));
        assert_eq!(mgr.transport().total_calls(), 0);
    }
}
