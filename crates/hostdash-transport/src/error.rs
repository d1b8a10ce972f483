/// Errors that can occur in the transport layer.
///
/// These mean "no usable response came back". An HTTP error status is
/// still a response and is reported through [`ApiResponse`](crate::ApiResponse).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request could not be delivered (DNS, refused connection, TLS).
    #[error("request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    /// The backend did not answer in time.
    #[error("request to {0} timed out")]
    Timeout(String),

    /// A response arrived but its body could not be read.
    #[error("reading response body failed: {0}")]
    ReadFailed(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client could not be built: {0}")]
    Client(String),
}
