//! End-to-end inactivity scenarios against simulated time.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use llmhub_core::session::{
    ActivityBus, ActivityKind, FileStore, ManualClock, MemoryStore, Route, RouteQueue,
    SessionController, SessionPhase, SignInReason, Signal, Tick, TimeoutPolicy, TokenStore,
};
use tokio::sync::mpsc;

struct Harness {
    controller: SessionController<RouteQueue>,
    clock: ManualClock,
    bus: ActivityBus,
    phases: Vec<SessionPhase>,
}

impl Harness {
    fn new() -> Self {
        let clock = ManualClock::new(Utc::now());
        let store = TokenStore::new(Arc::new(MemoryStore::new()), Arc::new(clock.clone()));
        let bus = ActivityBus::new();
        let controller =
            SessionController::new(store, TimeoutPolicy::default(), bus.clone(), RouteQueue::new());
        Self {
            controller,
            clock,
            bus,
            phases: Vec::new(),
        }
    }

    fn sign_in(&mut self) {
        self.controller.sign_in("token");
        assert_eq!(self.controller.navigator_mut().pop(), Some(Route::Dashboard));
    }

    /// Advance one minute and poll, recording every phase passed through.
    fn minute(&mut self) -> Vec<Signal> {
        self.clock.advance(Duration::minutes(1));
        let signals = self.controller.poll();
        for signal in &signals {
            self.phases.push(match signal {
                Signal::Warn { .. } => SessionPhase::Warning,
                Signal::Expire => SessionPhase::Expired,
            });
        }
        signals
    }
}

#[test]
fn inactivity_warns_at_26_and_expires_at_30_minutes() {
    let mut h = Harness::new();
    h.sign_in();

    for _ in 0..24 {
        assert!(h.minute().is_empty());
    }

    // No poll landed at t = 25; the next one is at t = 26
    h.clock.advance(Duration::minutes(1));
    let signals = h.minute();
    assert_eq!(
        signals,
        vec![Signal::Warn {
            remaining: Duration::minutes(4)
        }]
    );
    assert_eq!(h.controller.prompt().unwrap().remaining_minutes(), 4);

    // t = 27..30, expiry lands on exactly 30 minutes idle
    for _ in 0..3 {
        assert_eq!(h.minute().len(), 1);
    }
    assert_eq!(h.minute(), vec![Signal::Expire]);
    assert_eq!(h.controller.phase(), SessionPhase::Expired);
    assert!(!h.controller.store().has_token());
    assert_eq!(h.controller.store().get_last_activity(), None);
    assert_eq!(
        h.controller.navigator_mut().pop(),
        Some(Route::SignIn {
            reason: SignInReason::Timeout
        })
    );

    // t = 31: still expired, nothing new
    assert!(h.minute().is_empty());
    assert!(h.controller.navigator().is_empty());
}

#[test]
fn click_at_20_minutes_keeps_session_active_at_26() {
    let mut h = Harness::new();
    h.sign_in();

    for _ in 0..20 {
        h.minute();
    }
    h.bus.dispatch(ActivityKind::Click);

    for _ in 0..6 {
        assert!(h.minute().is_empty());
    }
    assert_eq!(h.controller.phase(), SessionPhase::Active);
    assert!(h.controller.prompt().is_none());
}

#[test]
fn steady_activity_never_expires() {
    let mut h = Harness::new();
    h.sign_in();

    // Activity every 29 minutes over ten hours
    for minute in 1..=600 {
        h.minute();
        if minute % 29 == 0 {
            h.bus.dispatch(ActivityKind::KeyPress);
        }
        assert_ne!(h.controller.phase(), SessionPhase::Expired);
    }
    assert!(h.controller.store().has_token());
    assert!(h.controller.navigator().is_empty());
}

#[test]
fn warning_always_precedes_expiry() {
    for step_minutes in [1, 3, 7, 26, 45, 120] {
        let mut h = Harness::new();
        h.sign_in();

        for _ in 0..200 {
            h.clock.advance(Duration::minutes(step_minutes - 1));
            h.minute();
            if h.controller.phase() == SessionPhase::Expired {
                break;
            }
        }

        let expired_at = h
            .phases
            .iter()
            .position(|p| *p == SessionPhase::Expired)
            .expect("session should expire");
        assert!(
            h.phases[..expired_at].contains(&SessionPhase::Warning),
            "step {}m: {:?}",
            step_minutes,
            h.phases
        );
    }
}

#[test]
fn continue_from_warning_resets_elapsed_time() {
    let mut h = Harness::new();
    h.sign_in();

    for _ in 0..27 {
        h.minute();
    }
    assert_eq!(h.controller.phase(), SessionPhase::Warning);

    h.controller.continue_session();
    assert!(h.controller.poll().is_empty());
    assert_eq!(h.controller.phase(), SessionPhase::Active);

    // A full new window is available
    for _ in 0..24 {
        assert!(h.minute().is_empty());
    }
}

#[test]
fn repeated_touches_equal_one() {
    let h = Harness::new();
    h.controller.store().set_token("token");

    h.controller.store().touch_activity();
    let once = h.controller.store().get_last_activity();
    for _ in 0..10 {
        h.controller.store().touch_activity();
    }
    assert_eq!(h.controller.store().get_last_activity(), once);
}

#[test]
fn file_backed_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(Utc::now());
    let policy = TimeoutPolicy::default();

    {
        let store = TokenStore::new(Arc::new(FileStore::in_dir(dir.path())), Arc::new(clock.clone()));
        let mut controller =
            SessionController::new(store, policy, ActivityBus::new(), RouteQueue::new());
        controller.sign_in("persisted");
        clock.advance(Duration::minutes(10));
        controller.reset_activity();
    }

    clock.advance(Duration::minutes(10));
    let store = TokenStore::new(Arc::new(FileStore::in_dir(dir.path())), Arc::new(clock.clone()));
    let mut controller = SessionController::new(store, policy, ActivityBus::new(), RouteQueue::new());
    assert!(controller.resume());
    assert_eq!(controller.bearer_token(), Some("persisted"));

    // 25 minutes since the last recorded activity
    clock.advance(Duration::minutes(15));
    assert_eq!(controller.poll().len(), 1);
    assert_eq!(controller.phase(), SessionPhase::Warning);
}

#[tokio::test(start_paused = true)]
async fn timer_driven_expiry_with_short_policy() {
    let clock = ManualClock::new(Utc::now());
    let store = TokenStore::new(Arc::new(MemoryStore::new()), Arc::new(clock.clone()));
    let policy = TimeoutPolicy::new(
        Duration::seconds(10),
        Duration::seconds(4),
        StdDuration::from_secs(1),
    )
    .unwrap();
    let mut controller = SessionController::new(store, policy, ActivityBus::new(), RouteQueue::new());
    controller.sign_in("token");

    let (tx, mut rx) = mpsc::channel(4);
    controller.start_monitoring(tx);

    let mut warned = false;
    while let Some(Tick) = rx.recv().await {
        clock.advance(Duration::seconds(1));
        for signal in controller.poll() {
            match signal {
                Signal::Warn { .. } => warned = true,
                Signal::Expire => assert!(warned),
            }
        }
    }

    // The channel closed because expiry stopped the timer
    assert!(warned);
    assert_eq!(controller.phase(), SessionPhase::Expired);
    assert!(!controller.is_monitoring());
    assert!(!controller.store().has_token());
}
