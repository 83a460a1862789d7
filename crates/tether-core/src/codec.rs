//! Access token decoding.
//!
//! Access tokens are compact JWS strings (`header.payload.signature`). The
//! payload is decoded into [`Claims`] without verifying the signature: the
//! server rejects tampered tokens at request time, and the claims are only
//! used to pick between privileged and standard views.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::Result;
use crate::error::AuthError;

/// The decoded payload of an access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier. Issuers send either a number or a string.
    #[serde(
        rename = "user_id",
        alias = "sub",
        default,
        deserialize_with = "string_or_number"
    )]
    pub subject_id: Option<String>,

    /// Human readable account name.
    #[serde(rename = "username", default)]
    pub display_name: Option<String>,

    /// Privilege flag. A client-side convenience only; the server re-checks.
    #[serde(rename = "is_staff", default, deserialize_with = "null_as_false")]
    pub is_privileged: bool,

    /// Issue time, unix seconds.
    #[serde(rename = "iat", default)]
    pub issued_at: Option<i64>,

    /// Expiry time, unix seconds.
    #[serde(rename = "exp", default)]
    pub expires_at: Option<i64>,
}

impl Claims {
    /// Returns the expiry as a timestamp, if the token carries one.
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Returns the issue time as a timestamp, if the token carries one.
    pub fn issued_at_utc(&self) -> Option<DateTime<Utc>> {
        self.issued_at.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Decode an access token into its claims.
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] if the token does not have three
/// segments, the payload is not base64url, or the payload is not a JSON object.
///
/// # Example
///
/// ```
/// use tether_core::codec;
///
/// // {"user_id":7,"username":"ana","is_staff":true,"exp":1700000000}
/// let token = "e30.eyJ1c2VyX2lkIjo3LCJ1c2VybmFtZSI6ImFuYSIsImlzX3N0YWZmIjp0cnVlLCJleHAiOjE3MDAwMDAwMDB9.c2ln";
/// let claims = codec::decode(token).unwrap();
/// assert_eq!(claims.subject_id.as_deref(), Some("7"));
/// assert!(claims.is_privileged);
/// ```
pub fn decode(token: &str) -> Result<Claims> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|e| malformed(format!("payload is not base64url: {}", e)))?;

    let value: serde_json::Value = serde_json::from_slice(&payload)
        .map_err(|e| malformed(format!("payload is not JSON: {}", e)))?;

    if !value.is_object() {
        return Err(malformed("payload is not a JSON object".to_string()));
    }

    serde_json::from_value(value).map_err(|e| malformed(format!("unexpected claim type: {}", e)))
}

/// Returns true if the claims expired strictly before `now`.
///
/// A token expiring exactly at `now` is still valid. A token without an
/// expiry is never expired client-side.
pub fn is_expired(claims: &Claims, now: DateTime<Utc>) -> bool {
    claims
        .expires_at
        .is_some_and(|exp| exp < now.timestamp())
}

fn malformed(reason: String) -> crate::Error {
    AuthError::MalformedToken { reason }.into()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| match v {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }),
    )
}

fn null_as_false<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}
