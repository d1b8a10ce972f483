//! Transport abstraction layer for hostdash.
//!
//! Provides the [`HttpTransport`] trait that every backend call goes
//! through, plus the request/response types that travel across it.
//! The session and tenant layers never talk to an HTTP client directly;
//! they build an [`ApiRequest`] and hand it to whatever transport the
//! application was constructed with.
//!
//! # Feature Flags
//!
//! - `reqwest` (default): real HTTP via [`ReqwestTransport`]
//! - `testing`: [`ScriptedTransport`], which replays canned responses
//!   and records every request it receives

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "reqwest")]
mod http;
#[cfg(any(test, feature = "testing"))]
mod scripted;

pub use error::TransportError;
#[cfg(feature = "reqwest")]
pub use http::ReqwestTransport;
#[cfg(any(test, feature = "testing"))]
pub use scripted::ScriptedTransport;

use std::fmt;

/// Header carrying the bearer credential.
pub const AUTHORIZATION: &str = "Authorization";

/// Header carrying the selected tenant for tenant-scoped calls.
pub const TENANT_HEADER: &str = "X-Tenant-ID";

/// The HTTP verbs the backend contract uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Returns the canonical upper-case verb.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ApiRequest
// ---------------------------------------------------------------------------

/// An outbound call to the backend.
///
/// Built with the verb constructors and then refined with the chaining
/// methods:
///
/// ```rust
/// use hostdash_transport::{ApiRequest, Method};
///
/// let req = ApiRequest::post("/api/tenants")
///     .header("X-Tenant-ID", "t1")
///     .json(serde_json::json!({ "guild_id": "g1" }));
///
/// assert_eq!(req.method, Method::Post);
/// assert_eq!(req.header_value("x-tenant-id"), Some("t1"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,

    /// Absolute URL or a path relative to the backend base URL. The
    /// session layer resolves relative paths before sending.
    pub url: String,

    /// Query-string pairs, appended in order.
    pub query: Vec<(String, String)>,

    /// Header pairs. Names are unique ignoring ASCII case.
    pub headers: Vec<(String, String)>,

    /// Optional JSON body.
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Creates a request with the given verb and no headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    /// Appends a query-string pair.
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    /// Sets a header, replacing any existing header with the same name.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// In-place form of [`header`](Self::header).
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    /// Sets the JSON body.
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Looks up a header value, ignoring ASCII case in the name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if the URL already carries a scheme.
    pub fn is_absolute(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }
}

// ---------------------------------------------------------------------------
// ApiResponse
// ---------------------------------------------------------------------------

/// A response from the backend: status code plus raw body bytes.
///
/// Non-2xx statuses are NOT transport errors. The transport only fails
/// when no response came back at all; interpreting the status is the
/// caller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Builds a response whose body is the serialized JSON value.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// Sends requests to the backend.
///
/// `Send + Sync + 'static` because one transport is shared by every
/// manager in a context and lives as long as the application.
pub trait HttpTransport: Send + Sync + 'static {
    /// Performs the request and returns whatever the backend answered.
    ///
    /// # Errors
    /// Returns a [`TransportError`] only when no response was obtained
    /// (connection refused, timeout, unreadable body).
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl std::future::Future<Output = Result<ApiResponse, TransportError>>
    + Send;
}

/// Extracts the path component of a URL, without query string.
///
/// `https://api.example.com/auth/me?x=1` becomes `/auth/me`. Relative
/// inputs are returned with only the query stripped.
pub fn request_path(url: &str) -> &str {
    let without_scheme = match url.find("://") {
        Some(idx) => {
            let rest = &url[idx + 3..];
            match rest.find('/') {
                Some(slash) => &rest[slash..],
                None => "/",
            }
        }
        None => url,
    };
    match without_scheme.find('?') {
        Some(q) => &without_scheme[..q],
        None => without_scheme,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_header_replaces_case_insensitively() {
        let req = ApiRequest::get("/x")
            .header("Authorization", "Bearer a")
            .header("authorization", "Bearer b");

        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.header_value("AUTHORIZATION"), Some("Bearer b"));
    }

    #[test]
    fn test_header_value_missing_returns_none() {
        let req = ApiRequest::get("/x");
        assert_eq!(req.header_value(TENANT_HEADER), None);
    }

    #[test]
    fn test_is_absolute() {
        assert!(ApiRequest::get("https://api.test/auth/me").is_absolute());
        assert!(ApiRequest::get("http://api.test").is_absolute());
        assert!(!ApiRequest::get("/api/tenants").is_absolute());
    }

    #[test]
    fn test_response_is_success_bounds() {
        assert!(ApiResponse::new(200, "").is_success());
        assert!(ApiResponse::new(204, "").is_success());
        assert!(!ApiResponse::new(199, "").is_success());
        assert!(!ApiResponse::new(300, "").is_success());
        assert!(!ApiResponse::new(401, "").is_success());
    }

    #[test]
    fn test_request_path_strips_origin_and_query() {
        assert_eq!(
            request_path("https://api.test/auth/callback?code=1&state=2"),
            "/auth/callback"
        );
        assert_eq!(request_path("http://api.test"), "/");
        assert_eq!(request_path("/api/tenants?x=1"), "/api/tenants");
        assert_eq!(request_path("/api/tenants"), "/api/tenants");
    }
}
