use chrono::Duration;
use thiserror::Error;

/// Inactivity after which the session is invalid (30 minutes)
pub const DEFAULT_SESSION_TIMEOUT_MINUTES: i64 = 30;

/// How long before expiry the user is warned (5 minutes)
pub const DEFAULT_WARNING_LEAD_MINUTES: i64 = 5;

/// Expiry check cadence. Multi-minute thresholds make a one-minute
/// detection latency acceptable.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Session timeout must be positive")]
    NonPositiveTimeout,

    #[error("Warning lead time ({lead_secs}s) must be shorter than the session timeout ({timeout_secs}s)")]
    LeadNotShorterThanTimeout { lead_secs: i64, timeout_secs: i64 },

    #[error("Poll interval must be non-zero")]
    ZeroPollInterval,

    #[error("{field} is out of range")]
    OutOfRange { field: &'static str },
}

/// Timeout constants for the session monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    session_timeout: Duration,
    warning_lead_time: Duration,
    poll_interval: std::time::Duration,
}

impl TimeoutPolicy {
    pub fn new(
        session_timeout: Duration,
        warning_lead_time: Duration,
        poll_interval: std::time::Duration,
    ) -> Result<Self, PolicyError> {
        if session_timeout <= Duration::zero() {
            return Err(PolicyError::NonPositiveTimeout);
        }
        if warning_lead_time < Duration::zero() || warning_lead_time >= session_timeout {
            return Err(PolicyError::LeadNotShorterThanTimeout {
                lead_secs: warning_lead_time.num_seconds(),
                timeout_secs: session_timeout.num_seconds(),
            });
        }
        if poll_interval.is_zero() {
            return Err(PolicyError::ZeroPollInterval);
        }
        Ok(Self {
            session_timeout,
            warning_lead_time,
            poll_interval,
        })
    }

    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    pub fn warning_lead_time(&self) -> Duration {
        self.warning_lead_time
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        self.poll_interval
    }

    /// Elapsed inactivity at which the warning starts.
    pub fn warning_threshold(&self) -> Duration {
        self.session_timeout - self.warning_lead_time
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            session_timeout: Duration::minutes(DEFAULT_SESSION_TIMEOUT_MINUTES),
            warning_lead_time: Duration::minutes(DEFAULT_WARNING_LEAD_MINUTES),
            poll_interval: std::time::Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}
