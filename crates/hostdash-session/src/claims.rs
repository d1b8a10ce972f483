//! Token codec: reads the claim set embedded in an access token.
//!
//! The signature is NOT verified. The issuer and the backend do that on
//! every request; the client only peeks at the roles to skip a round
//! trip when deciding what to show. Nothing here is an authorization
//! boundary.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::TokenError;

/// The system role that marks a platform-wide administrator.
pub const SUPER_ADMIN_ROLE: &str = "superadmin";

/// The subset of access-token claims the client cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,

    /// Expiry as seconds since the Unix epoch.
    #[serde(default)]
    pub exp: Option<i64>,

    /// Issuer-asserted system roles. The issuer sends `null` for users
    /// without any, hence the `Option`.
    #[serde(default)]
    pub system_roles: Option<Vec<String>>,
}

impl TokenClaims {
    pub fn roles(&self) -> &[String] {
        self.system_roles.as_deref().unwrap_or_default()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles().iter().any(|r| r == role)
    }

    pub fn is_super_admin(&self) -> bool {
        self.has_role(SUPER_ADMIN_ROLE)
    }
}

/// Decodes the payload segment of a `header.payload.signature` token.
///
/// # Errors
/// Returns a [`TokenError`] if the token isn't three segments, the
/// payload isn't base64url, or it isn't a JSON object of claims.
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::Malformed);
    };

    // Some issuers pad base64url payloads; the no-pad engine rejects that.
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    serde_json::from_slice(&bytes).map_err(TokenError::Claims)
}

/// Derives the super-admin flag from an access token. An unreadable token
/// simply grants no fast path.
pub(crate) fn super_admin_from_token(token: &str) -> bool {
    match decode_claims(token) {
        Ok(claims) => claims.is_super_admin(),
        Err(e) => {
            tracing::warn!(error = %e, "access token claims unreadable");
            false
        }
    }
}
