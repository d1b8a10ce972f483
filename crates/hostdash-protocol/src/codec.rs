//! Codec trait and implementations for snapshot serialization.
//!
//! The persisted store only holds strings. A codec converts the typed
//! snapshots the managers keep (the signed-in [`User`](crate::User), the
//! current [`Tenant`](crate::Tenant)) into those strings and back. The
//! managers don't care HOW; they just need something implementing
//! [`Codec`].

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to strings and decodes them back.
///
/// `Send + Sync + 'static` because a codec is held by long-lived
/// managers that are shared across tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the input is malformed or
    /// doesn't match the expected shape. Callers treat this as corruption.
    fn decode<T: DeserializeOwned>(&self, data: &str) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON, the same encoding the backend speaks.
///
/// ```rust
/// use hostdash_protocol::{Codec, JsonCodec, TenantConfig};
///
/// let config = TenantConfig {
///     default_game_template: Some("minecraft".into()),
///     ..TenantConfig::default()
/// };
///
/// let text = JsonCodec.encode(&config).unwrap();
/// let back: TenantConfig = JsonCodec.decode(&text).unwrap();
/// assert_eq!(config, back);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(data).map_err(ProtocolError::Decode)
    }
}

impl JsonCodec {
    /// Decodes a response body. An empty body decodes as JSON `null`, so
    /// endpoints that answer with no content can be read as `()`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] on malformed bytes.
    pub fn decode_body<T: DeserializeOwned>(
        &self,
        body: &[u8],
    ) -> Result<T, ProtocolError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_slice(b"null").map_err(ProtocolError::Decode);
        }
        serde_json::from_slice(body).map_err(ProtocolError::Decode)
    }
}
