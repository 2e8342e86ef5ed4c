use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::clock::Clock;
use super::store::KeyValueStore;

/// Storage key holding the bearer token
pub const TOKEN_KEY: &str = "admin_token";

/// Storage key holding the last activity time, as epoch milliseconds
pub const LAST_ACTIVITY_KEY: &str = "lastActivity";

/// Snapshot of the persisted session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    /// `None` means the token was just stored and activity is not yet recorded.
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// Last values written or successfully read, served while the backend fails.
#[derive(Debug, Default)]
struct Mirror {
    token: Option<String>,
    last_activity_at: Option<DateTime<Utc>>,
}

/// Token and last-activity persistence over an injected backend.
///
/// Storage failures never reach the caller: they are logged and reads fall
/// back to an in-memory mirror of the session, so an unavailable backend
/// still yields a session that can expire. A readable backend is
/// authoritative; a token removed there reads as absent. Clones share the
/// same backend, mirror and clock.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    mirror: Arc<Mutex<Mirror>>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            mirror: Arc::default(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn mirror(&self) -> MutexGuard<'_, Mirror> {
        self.mirror.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_token(&self, token: &str) {
        self.mirror().token = Some(token.to_string());
        if let Err(e) = self.backend.set(TOKEN_KEY, token) {
            warn!(error = %e, "Failed to persist session token");
        }
    }

    pub fn get_token(&self) -> Option<String> {
        match self.backend.get(TOKEN_KEY) {
            Ok(token) => {
                let token = token.filter(|t| !t.is_empty());
                self.mirror().token = token.clone();
                token
            }
            Err(e) => {
                warn!(error = %e, "Failed to read session token, using in-memory copy");
                self.mirror().token.clone()
            }
        }
    }

    pub fn has_token(&self) -> bool {
        self.get_token().is_some()
    }

    /// Remove the token and its activity timestamp.
    pub fn clear_token(&self) {
        *self.mirror() = Mirror::default();
        for key in [TOKEN_KEY, LAST_ACTIVITY_KEY] {
            if let Err(e) = self.backend.remove(key) {
                warn!(key, error = %e, "Failed to clear session value");
            }
        }
    }

    /// Record activity at the current time. Last write wins.
    pub fn touch_activity(&self) {
        let now = self.clock.now();
        self.mirror().last_activity_at = Some(now);
        if let Err(e) = self
            .backend
            .set(LAST_ACTIVITY_KEY, &now.timestamp_millis().to_string())
        {
            warn!(error = %e, "Failed to record activity");
        }
    }

    /// Last recorded activity. A missing or unparseable value reads as `None`.
    pub fn get_last_activity(&self) -> Option<DateTime<Utc>> {
        let raw = match self.backend.get(LAST_ACTIVITY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.mirror().last_activity_at = None;
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read last activity, using in-memory copy");
                return self.mirror().last_activity_at;
            }
        };

        let parsed = raw
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
        if parsed.is_none() {
            debug!(value = %raw, "Ignoring corrupt last activity value");
        }
        self.mirror().last_activity_at = parsed;
        parsed
    }

    pub fn session(&self) -> Option<Session> {
        self.get_token().map(|token| Session {
            token,
            last_activity_at: self.get_last_activity(),
        })
    }
}
