//! Inactivity state machine.
//!
//! [`ExpiryClock`] is evaluated on each poll. It re-reads the token store
//! every time and emits [`Signal`]s for the controller to act on.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::policy::TimeoutPolicy;
use super::token_store::TokenStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    Warning,
    Expired,
}

/// Output of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Inside the warning window; `remaining` until expiry (never negative).
    Warn { remaining: Duration },
    /// Timeout reached. Terminal for this clock.
    Expire,
}

/// Classify an inactivity duration against the policy.
pub fn classify(policy: &TimeoutPolicy, elapsed: Duration) -> SessionPhase {
    if elapsed >= policy.session_timeout() {
        SessionPhase::Expired
    } else if elapsed >= policy.warning_threshold() {
        SessionPhase::Warning
    } else {
        SessionPhase::Active
    }
}

/// Whole minutes for display, rounded up. `4m01s` shows as 5.
pub fn remaining_minutes(remaining: Duration) -> i64 {
    let ms = remaining.num_milliseconds().max(0);
    (ms + 59_999) / 60_000
}

/// Elapsed inactivity, clamped at zero for clock skew.
fn elapsed_since(last: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - last).max(Duration::zero())
}

#[derive(Debug, Clone)]
pub struct ExpiryClock {
    policy: TimeoutPolicy,
    phase: SessionPhase,
}

impl ExpiryClock {
    pub fn new(policy: TimeoutPolicy) -> Self {
        Self {
            policy,
            phase: SessionPhase::Active,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn policy(&self) -> &TimeoutPolicy {
        &self.policy
    }

    /// Evaluate against the store's current state.
    ///
    /// Returns no signals while active, without a token, or once expired.
    /// A jump straight past the timeout from `Active` yields `Warn` then
    /// `Expire`, so a warning always precedes expiry.
    pub fn evaluate(&mut self, store: &TokenStore) -> Vec<Signal> {
        if self.phase == SessionPhase::Expired || !store.has_token() {
            return Vec::new();
        }

        let Some(last) = store.get_last_activity() else {
            debug!("No last activity recorded, initializing");
            store.touch_activity();
            self.phase = SessionPhase::Active;
            return Vec::new();
        };

        let elapsed = elapsed_since(last, store.now());
        let target = classify(&self.policy, elapsed);
        let remaining = (self.policy.session_timeout() - elapsed).max(Duration::zero());

        let signals = match (self.phase, target) {
            (_, SessionPhase::Active) => Vec::new(),
            (_, SessionPhase::Warning) => vec![Signal::Warn { remaining }],
            (SessionPhase::Active, SessionPhase::Expired) => vec![
                Signal::Warn {
                    remaining: Duration::zero(),
                },
                Signal::Expire,
            ],
            (_, SessionPhase::Expired) => vec![Signal::Expire],
        };

        if self.phase != target {
            debug!(from = ?self.phase, to = ?target, elapsed_secs = elapsed.num_seconds(), "Session phase changed");
        }
        self.phase = target;
        signals
    }

    /// Explicit "continue session": record activity and return to `Active`.
    /// Has no effect once expired.
    pub fn acknowledge(&mut self, store: &TokenStore) -> bool {
        if self.phase == SessionPhase::Expired {
            return false;
        }
        store.touch_activity();
        self.phase = SessionPhase::Active;
        true
    }

    /// Force expiry regardless of elapsed time.
    pub fn force_expire(&mut self) -> Option<Signal> {
        if self.phase == SessionPhase::Expired {
            return None;
        }
        self.phase = SessionPhase::Expired;
        Some(Signal::Expire)
    }

    /// Pure check: has the stored session passed the timeout?
    /// Without a token or activity record this is `false`.
    pub fn is_timed_out(&self, store: &TokenStore) -> bool {
        if !store.has_token() {
            return false;
        }
        store
            .get_last_activity()
            .map(|last| elapsed_since(last, store.now()) >= self.policy.session_timeout())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::session::clock::{Clock, ManualClock};
    use crate::session::store::MemoryStore;

    fn signed_in() -> (ExpiryClock, TokenStore, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let store = TokenStore::new(Arc::new(MemoryStore::new()), Arc::new(clock.clone()));
        store.set_token("token");
        store.touch_activity();
        (ExpiryClock::new(TimeoutPolicy::default()), store, clock)
    }

    #[test]
    fn test_classify_boundaries() {
        let policy = TimeoutPolicy::default();
        assert_eq!(classify(&policy, Duration::zero()), SessionPhase::Active);
        assert_eq!(
            classify(&policy, Duration::minutes(25) - Duration::milliseconds(1)),
            SessionPhase::Active
        );
        assert_eq!(classify(&policy, Duration::minutes(25)), SessionPhase::Warning);
        assert_eq!(
            classify(&policy, Duration::minutes(30) - Duration::milliseconds(1)),
            SessionPhase::Warning
        );
        assert_eq!(classify(&policy, Duration::minutes(30)), SessionPhase::Expired);
    }

    #[test]
    fn test_remaining_minutes_rounds_up() {
        assert_eq!(remaining_minutes(Duration::minutes(4)), 4);
        assert_eq!(remaining_minutes(Duration::minutes(4) + Duration::seconds(1)), 5);
        assert_eq!(remaining_minutes(Duration::seconds(1)), 1);
        assert_eq!(remaining_minutes(Duration::zero()), 0);
        assert_eq!(remaining_minutes(Duration::seconds(-10)), 0);
    }

    #[test]
    fn test_warning_then_expiry() {
        let (mut expiry, store, clock) = signed_in();

        clock.advance(Duration::minutes(10));
        assert!(expiry.evaluate(&store).is_empty());
        assert_eq!(expiry.phase(), SessionPhase::Active);

        clock.advance(Duration::minutes(16));
        assert_eq!(
            expiry.evaluate(&store),
            vec![Signal::Warn {
                remaining: Duration::minutes(4)
            }]
        );
        assert_eq!(expiry.phase(), SessionPhase::Warning);

        // Warning repeats with an updated countdown
        clock.advance(Duration::minutes(2));
        assert_eq!(
            expiry.evaluate(&store),
            vec![Signal::Warn {
                remaining: Duration::minutes(2)
            }]
        );

        clock.advance(Duration::minutes(3));
        assert_eq!(expiry.evaluate(&store), vec![Signal::Expire]);
        assert_eq!(expiry.phase(), SessionPhase::Expired);

        // Terminal
        clock.advance(Duration::minutes(1));
        assert!(expiry.evaluate(&store).is_empty());
        assert_eq!(expiry.force_expire(), None);
    }

    #[test]
    fn test_skipped_warning_window_still_warns_first() {
        let (mut expiry, store, clock) = signed_in();

        clock.advance(Duration::hours(2));
        assert_eq!(
            expiry.evaluate(&store),
            vec![
                Signal::Warn {
                    remaining: Duration::zero()
                },
                Signal::Expire
            ]
        );
    }

    #[test]
    fn test_missing_activity_is_initialized_not_expired() {
        let clock = ManualClock::new(Utc::now());
        let store = TokenStore::new(Arc::new(MemoryStore::new()), Arc::new(clock.clone()));
        store.set_token("token");
        let mut expiry = ExpiryClock::new(TimeoutPolicy::default());

        assert!(expiry.evaluate(&store).is_empty());
        assert_eq!(store.get_last_activity(), Some(clock.now()));
    }

    #[test]
    fn test_no_token_is_a_no_op() {
        let clock = ManualClock::new(Utc::now());
        let store = TokenStore::new(Arc::new(MemoryStore::new()), Arc::new(clock.clone()));
        let mut expiry = ExpiryClock::new(TimeoutPolicy::default());

        clock.advance(Duration::hours(5));
        assert!(expiry.evaluate(&store).is_empty());
        assert_eq!(store.get_last_activity(), None);
        assert!(!expiry.is_timed_out(&store));
    }

    #[test]
    fn test_acknowledge_returns_to_active() {
        let (mut expiry, store, clock) = signed_in();

        clock.advance(Duration::minutes(27));
        assert_eq!(expiry.evaluate(&store).len(), 1);
        assert!(expiry.acknowledge(&store));
        assert_eq!(expiry.phase(), SessionPhase::Active);
        assert!(expiry.evaluate(&store).is_empty());
    }

    #[test]
    fn test_passive_activity_leaves_warning() {
        let (mut expiry, store, clock) = signed_in();

        clock.advance(Duration::minutes(26));
        expiry.evaluate(&store);
        assert_eq!(expiry.phase(), SessionPhase::Warning);

        store.touch_activity();
        assert!(expiry.evaluate(&store).is_empty());
        assert_eq!(expiry.phase(), SessionPhase::Active);
    }

    #[test]
    fn test_future_activity_counts_as_zero_elapsed() {
        let (mut expiry, store, clock) = signed_in();

        clock.advance(Duration::minutes(-10));
        assert!(expiry.evaluate(&store).is_empty());
        assert!(!expiry.is_timed_out(&store));
    }

    #[test]
    fn test_is_timed_out_does_not_mutate() {
        let (expiry, store, clock) = signed_in();

        clock.advance(Duration::minutes(31));
        assert!(expiry.is_timed_out(&store));
        assert!(store.has_token());
        assert_eq!(expiry.phase(), SessionPhase::Active);
    }
}
