use std::sync::{Arc, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use crate::storage::{KeyValueStore, TOKEN_EXPIRES_KEY, TOKEN_KEY};

/// Number of token characters shown in logs
const TOKEN_LOG_PREFIX: usize = 10;

/// Shorten a token for logging
pub(crate) fn token_preview(token: &str) -> String {
    if token.is_empty() {
        return "<none>".to_string();
    }
    let prefix: String = token.chars().take(TOKEN_LOG_PREFIX).collect();
    format!("{}...", prefix)
}

/// Session token state, written through to persistent storage.
///
/// Every mutating call updates memory and the store inside one critical
/// section, so the two never disagree once the call returns. Store failures
/// are logged and swallowed; the operations themselves cannot fail.
/// Clone is cheap and clones share state.
#[derive(Clone)]
pub struct SessionState {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn KeyValueStore>,
    token: RwLock<String>,
}

impl SessionState {
    /// Create session state, seeding the token from the store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let token = store.get(TOKEN_KEY).unwrap_or_default();
        debug!(token = %token_preview(&token), "Session state initialised");
        Self {
            inner: Arc::new(Inner {
                store,
                token: RwLock::new(token),
            }),
        }
    }

    /// Current token, empty if there is no session
    pub fn get_token(&self) -> String {
        self.inner
            .token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        !self
            .inner
            .token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }

    /// Store a token. No validation of its shape happens here.
    pub fn set_token(&self, value: &str) {
        let mut token = self.inner.token.write().unwrap_or_else(|e| e.into_inner());
        debug!(token = %token_preview(value), "Setting token");
        *token = value.to_string();
        self.persist(TOKEN_KEY, Some(value));
    }

    /// Store a token along with its client-known expiry.
    /// A `None` expiry removes any stale marker.
    pub fn set_token_with_expiry(&self, value: &str, expires_at: Option<DateTime<Utc>>) {
        let mut token = self.inner.token.write().unwrap_or_else(|e| e.into_inner());
        debug!(token = %token_preview(value), expires_at = ?expires_at, "Setting token");
        *token = value.to_string();
        self.persist(TOKEN_KEY, Some(value));
        let marker = expires_at.map(|at| at.to_rfc3339());
        self.persist(TOKEN_EXPIRES_KEY, marker.as_deref());
    }

    /// Reset to no session and drop both persisted keys.
    pub fn clear_token(&self) {
        let mut token = self.inner.token.write().unwrap_or_else(|e| e.into_inner());
        debug!("Removing token");
        token.clear();
        self.persist(TOKEN_KEY, None);
        self.persist(TOKEN_EXPIRES_KEY, None);
    }

    /// Clear the session only if it still holds `token`.
    ///
    /// Returns true when this call performed the clear. Concurrent callers
    /// holding the same stale token see exactly one `true`.
    pub fn invalidate(&self, token: &str) -> bool {
        let mut current = self.inner.token.write().unwrap_or_else(|e| e.into_inner());
        if current.is_empty() || current.as_str() != token {
            return false;
        }
        debug!(token = %token_preview(token), "Invalidating session");
        current.clear();
        self.persist(TOKEN_KEY, None);
        self.persist(TOKEN_EXPIRES_KEY, None);
        true
    }

    /// If a token is held and the expiry marker has passed, clear the
    /// session and return true.
    ///
    /// Check and clear happen under one lock, so only one of several
    /// concurrent callers observes the expiry. A marker left behind without
    /// a token is removed quietly and never counts as an expiry.
    pub fn take_expired(&self, now: DateTime<Utc>) -> bool {
        let mut token = self.inner.token.write().unwrap_or_else(|e| e.into_inner());
        if token.is_empty() {
            if self.inner.store.get(TOKEN_EXPIRES_KEY).is_some() {
                debug!("Removing expiry marker with no token");
                self.persist(TOKEN_EXPIRES_KEY, None);
            }
            return false;
        }
        if !self.is_expired_at(now) {
            return false;
        }
        debug!(token = %token_preview(&token), "Token expired locally");
        token.clear();
        self.persist(TOKEN_KEY, None);
        self.persist(TOKEN_EXPIRES_KEY, None);
        true
    }

    /// Parsed expiry marker, if one is stored and readable
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.inner.store.get(TOKEN_EXPIRES_KEY)?;
        let parsed = parse_expiry(&raw);
        if parsed.is_none() {
            warn!(value = %raw, "Ignoring unparsable token expiry");
        }
        parsed
    }

    /// True when an expiry marker exists and `now` is at or past it
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map(|at| now >= at).unwrap_or(false)
    }

    fn persist(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(v) => self.inner.store.set(key, v),
            None => self.inner.store.remove(key),
        };
        if let Err(e) = result {
            warn!(key = key, error = %e, "Failed to persist session state");
        }
    }
}

/// Accepts RFC 3339, RFC 2822, or a bare `YYYY-MM-DD` (midnight UTC).
fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ms) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(ms);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
