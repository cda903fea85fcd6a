//! Decoding of the session token's payload segment.
//!
//! The backend issues JWT-shaped tokens (`header.payload.signature`). The
//! client never verifies the signature; it only reads the payload to learn
//! the user id and, when present, the `exp` claim.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenDecodeError {
    #[error("Token has no payload segment")]
    Malformed,

    #[error("Token payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Token payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Token payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Token payload has no user id")]
    MissingId,
}

/// User identifier as carried in the token. The backend has used both
/// numbers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{}", n),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

impl UserId {
    /// Numeric when `raw` is an integer, text otherwise
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(n) => UserId::Number(n),
            Err(_) => UserId::Text(raw.to_string()),
        }
    }
}

impl FromStr for UserId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(UserId::from_raw(s))
    }
}

impl From<i64> for UserId {
    fn from(n: i64) -> Self {
        UserId::Number(n)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId::Text(s.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawClaims {
    id: Option<UserId>,
    exp: Option<i64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Claims read from a token payload
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    pub id: UserId,
    /// Expiry as seconds since the epoch
    pub exp: Option<i64>,
    /// Any other claims, untouched
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Decode the payload of `header.payload.signature` into typed claims.
pub fn decode_token(token: &str) -> Result<TokenClaims, TokenDecodeError> {
    let payload = token
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or(TokenDecodeError::Malformed)?;

    let trimmed = payload.trim_end_matches('=');
    let bytes = match URL_SAFE_NO_PAD.decode(trimmed) {
        Ok(bytes) => bytes,
        Err(_) => STANDARD_NO_PAD.decode(trimmed)?,
    };
    let json = String::from_utf8(bytes)?;
    let raw: RawClaims = serde_json::from_str(&json)?;

    let id = raw.id.ok_or(TokenDecodeError::MissingId)?;
    Ok(TokenClaims {
        id,
        exp: raw.exp,
        extra: raw.extra,
    })
}
