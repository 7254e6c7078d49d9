use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConsoleError, ConsoleResult};
use crate::users::model::{User, UserPermissions};

/// Access/refresh token pair as issued by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// The client-held bundle of tokens, user profile and permissions.
///
/// `expires_at` is always derived from the access token's embedded `exp`
/// claim, never set independently. The persisted copy of this structure is
/// a cache; the issuing backend remains the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<UserPermissions>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Check if the access token has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Decode the expiry instant embedded in an access token.
///
/// The payload segment is base64 decoded and its numeric `exp` claim read at
/// millisecond resolution. Tokens without a decodable payload or without an
/// `exp` claim are rejected.
pub fn decode_expiry(access_token: &str) -> ConsoleResult<DateTime<Utc>> {
    let payload = access_token
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| ConsoleError::invalid_token("missing payload segment"))?;

    let bytes = decode_segment(payload)
        .ok_or_else(|| ConsoleError::invalid_token("payload is not valid base64"))?;

    let claims: Value = serde_json::from_slice(&bytes)
        .map_err(|e| ConsoleError::invalid_token(format!("payload is not JSON: {e}")))?;

    let exp = claims
        .get("exp")
        .and_then(Value::as_i64)
        .ok_or_else(|| ConsoleError::invalid_token("missing numeric exp claim"))?;

    DateTime::<Utc>::from_timestamp_millis(exp * 1000)
        .ok_or_else(|| ConsoleError::invalid_token("exp claim out of range"))
}

/// Tokens in the wild use base64url without padding, but padded standard
/// encodings also show up; accept both.
fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| STANDARD.decode(segment))
        .ok()
}
