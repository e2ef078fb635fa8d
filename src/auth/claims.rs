//! JWT claim inspection
//!
//! The upstream issues signed tokens we treat as opaque except for the
//! `exp` claim, which schedules the refresh. The signature is not checked;
//! `exp` is a scheduling hint, not a security boundary.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Extract the expiry instant from a JWT, if one can be decoded.
///
/// Returns `None` for anything that is not a three-segment token with a
/// base64url JSON payload carrying an integer `exp`.
pub fn decode_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    DateTime::from_timestamp(exp, 0)
}
