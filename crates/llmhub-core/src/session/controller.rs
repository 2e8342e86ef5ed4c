//! Session lifecycle: sign-in, warning prompt, expiry and sign-out.
//!
//! The controller owns the one [`ExpiryClock`] for the session, the
//! activity watcher registration and the poll timer. Every path that ends a
//! session clears the token store before navigating away.

use std::collections::VecDeque;

use chrono::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::expiry::{remaining_minutes, ExpiryClock, SessionPhase, Signal};
use super::policy::TimeoutPolicy;
use super::timer::{PollTimer, Tick};
use super::token_store::TokenStore;
use super::watcher::{ActivityBus, ActivityWatcher};

/// Why the user is being sent to the sign-in view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInReason {
    /// No valid session (first launch, rejected token).
    Required,
    /// The session expired through inactivity.
    Timeout,
    /// The user chose to sign out.
    SignedOut,
}

impl SignInReason {
    /// Message for the sign-in view.
    pub fn message(&self) -> &'static str {
        match self {
            SignInReason::Required => "Please sign in to continue.",
            SignInReason::Timeout => "Your session expired due to inactivity. Please sign in again.",
            SignInReason::SignedOut => "You have been signed out.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    SignIn { reason: SignInReason },
    Dashboard,
}

/// One-way navigation side effect.
pub trait Navigator {
    fn navigate(&mut self, route: Route);
}

/// Navigator that queues routes for the host to apply.
#[derive(Debug, Default)]
pub struct RouteQueue {
    routes: VecDeque<Route>,
}

impl RouteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&mut self) -> Option<Route> {
        self.routes.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Navigator for RouteQueue {
    fn navigate(&mut self, route: Route) {
        self.routes.push_back(route);
    }
}

/// Countdown prompt shown while in the warning window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarningPrompt {
    pub remaining: Duration,
}

impl WarningPrompt {
    pub fn remaining_minutes(&self) -> i64 {
        remaining_minutes(self.remaining)
    }

    pub fn message(&self) -> String {
        let minutes = self.remaining_minutes();
        let unit = if minutes == 1 { "minute" } else { "minutes" };
        format!(
            "Your session will expire in {} {} due to inactivity. Would you like to continue your session?",
            minutes, unit
        )
    }
}

pub struct SessionController<N: Navigator> {
    store: TokenStore,
    policy: TimeoutPolicy,
    bus: ActivityBus,
    navigator: N,
    expiry: ExpiryClock,
    prompt: Option<WarningPrompt>,
    /// In-memory copy of the bearer for outgoing requests.
    bearer: Option<String>,
    watcher: Option<ActivityWatcher>,
    timer: Option<PollTimer>,
}

impl<N: Navigator> SessionController<N> {
    pub fn new(store: TokenStore, policy: TimeoutPolicy, bus: ActivityBus, navigator: N) -> Self {
        Self {
            store,
            policy,
            bus,
            navigator,
            expiry: ExpiryClock::new(policy),
            prompt: None,
            bearer: None,
            watcher: None,
            timer: None,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn policy(&self) -> &TimeoutPolicy {
        &self.policy
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut N {
        &mut self.navigator
    }

    pub fn phase(&self) -> SessionPhase {
        self.expiry.phase()
    }

    pub fn prompt(&self) -> Option<&WarningPrompt> {
        self.prompt.as_ref()
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer.is_some()
    }

    pub fn is_monitoring(&self) -> bool {
        self.timer.is_some()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start a fresh session with a newly issued token.
    pub fn sign_in(&mut self, token: &str) {
        self.teardown();
        self.store.set_token(token);
        self.store.touch_activity();
        self.begin(token.to_string());
        info!("Session started");
    }

    /// Adopt a token already in the store (e.g. after a restart).
    /// Returns false when there is nothing to resume or it already timed out.
    pub fn resume(&mut self) -> bool {
        let Some(token) = self.store.get_token() else {
            debug!("No stored session to resume");
            return false;
        };

        let clock = ExpiryClock::new(self.policy);
        if clock.is_timed_out(&self.store) {
            debug!("Stored session already past timeout");
            self.end(SignInReason::Timeout);
            return false;
        }

        if self.store.get_last_activity().is_none() {
            self.store.touch_activity();
        }
        self.begin(token);
        info!("Session resumed from store");
        true
    }

    fn begin(&mut self, token: String) {
        self.expiry = ExpiryClock::new(self.policy);
        self.prompt = None;
        self.bearer = Some(token);
        self.watcher = ActivityWatcher::attach(&self.bus, &self.store);
        self.navigator.navigate(Route::Dashboard);
    }

    /// Start the poll timer feeding `tx`. Requires a tokio runtime.
    /// Replaces any running timer.
    pub fn start_monitoring(&mut self, tx: mpsc::Sender<Tick>) {
        if !self.is_authenticated() {
            debug!("Not authenticated, poll timer not started");
            return;
        }
        self.timer = Some(PollTimer::start(self.policy.poll_interval(), tx));
        debug!(interval_secs = self.policy.poll_interval().as_secs(), "Poll timer started");
    }

    /// Stop the timer and detach the watcher. Stored state is untouched.
    pub fn teardown(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop();
            debug!("Poll timer stopped");
        }
        if let Some(watcher) = self.watcher.take() {
            watcher.detach();
        }
    }

    /// Handle one poll of the expiry clock. Returns the signals acted upon.
    pub fn poll(&mut self) -> Vec<Signal> {
        if !self.is_authenticated() {
            return Vec::new();
        }

        // Cleared elsewhere (another process, a manual edit of the store)
        if !self.store.has_token() {
            info!("Session token no longer in store");
            self.expiry.force_expire();
            self.end(SignInReason::Required);
            return Vec::new();
        }

        let signals = self.expiry.evaluate(&self.store);
        for signal in &signals {
            match *signal {
                Signal::Warn { remaining } => {
                    debug!(remaining_secs = remaining.num_seconds(), "Session expiry warning");
                    self.prompt = Some(WarningPrompt { remaining });
                }
                Signal::Expire => {
                    info!("Session expired due to inactivity");
                    self.end(SignInReason::Timeout);
                }
            }
        }

        // Activity since the last poll closes the prompt
        if self.expiry.phase() == SessionPhase::Active {
            self.prompt = None;
        }
        signals
    }

    /// "Continue session" from the warning prompt.
    pub fn continue_session(&mut self) {
        if !self.is_authenticated() {
            return;
        }
        if self.expiry.acknowledge(&self.store) {
            self.prompt = None;
            debug!("Session continued");
        }
    }

    /// "Logout now" from the warning prompt.
    pub fn logout_now(&mut self) {
        if !self.is_authenticated() {
            return;
        }
        if self.expiry.force_expire().is_some() {
            info!("Session ended from warning prompt");
            self.end(SignInReason::SignedOut);
        }
    }

    /// Explicit sign-out.
    pub fn sign_out(&mut self) {
        if !self.is_authenticated() && !self.store.has_token() {
            return;
        }
        self.expiry.force_expire();
        info!("Signed out");
        self.end(SignInReason::SignedOut);
    }

    /// Drop a session the backend rejected.
    pub fn invalidate(&mut self) {
        self.expiry.force_expire();
        info!("Session rejected by server");
        self.end(SignInReason::Required);
    }

    /// Record activity if a session exists.
    pub fn reset_activity(&self) {
        if self.store.has_token() {
            self.store.touch_activity();
        }
    }

    /// Side-effect free timeout check against the store.
    pub fn has_timed_out(&self) -> bool {
        self.expiry.is_timed_out(&self.store)
    }

    fn end(&mut self, reason: SignInReason) {
        self.teardown();
        self.store.clear_token();
        self.bearer = None;
        self.prompt = None;
        self.navigator.navigate(Route::SignIn { reason });
    }
}

impl<N: Navigator> Drop for SessionController<N> {
    fn drop(&mut self) {
        self.teardown();
    }
}
