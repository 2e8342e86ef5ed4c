//! Application state management for the LLM Hub admin console.
//!
//! This module contains the `App` struct that owns the session controller,
//! the API client and the UI state, and applies session routes to the UI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use llmhub_core::api::{ApiClient, LoginScope, UserProfile};
use llmhub_core::session::{
    ActivityBus, ActivityKind, Route, RouteQueue, SessionController, SessionPhase, SignInReason,
    SystemClock, Tick, TokenStore,
};
use llmhub_core::session::timer::TICK_CHANNEL_SIZE;
use llmhub_core::Config;

// ============================================================================
// Constants
// ============================================================================

/// Maximum length for username input.
const MAX_USERNAME_LENGTH: usize = 100;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Environment variables prefilling the login form
const USERNAME_ENV: &str = "LLMHUB_USERNAME";
const PASSWORD_ENV: &str = "LLMHUB_PASSWORD";

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    SigningIn,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Username,
    Password,
    Scope,
    Button,
}

impl LoginFocus {
    pub fn next(&self) -> Self {
        match self {
            LoginFocus::Username => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Scope,
            LoginFocus::Scope => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::Username,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            LoginFocus::Username => LoginFocus::Button,
            LoginFocus::Password => LoginFocus::Username,
            LoginFocus::Scope => LoginFocus::Password,
            LoginFocus::Button => LoginFocus::Scope,
        }
    }
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    pub api: ApiClient,
    pub session: SessionController<RouteQueue>,
    pub bus: ActivityBus,

    // UI State
    pub state: AppState,

    // Login form state
    pub login_username: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    /// Admin (`/admin/login`) or regular user (`/token`) sign-in
    pub login_scope: LoginScope,
    pub login_error: Option<String>,
    /// Why the sign-in view is showing (timeout vs. plain prompt)
    pub login_reason: SignInReason,

    // Signed-in data
    pub profile: Option<UserProfile>,

    // Expiry clock ticks
    tick_tx: mpsc::Sender<Tick>,
    tick_rx: mpsc::Receiver<Tick>,

    // Status message
    pub status_message: Option<String>,
}

impl App {
    /// Create a new application instance
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let data_dir = config.data_dir().unwrap_or_else(|_| PathBuf::from("./data"));
        debug!(?data_dir, backend = ?config.store_backend, "Session store configured");

        let store = TokenStore::new(config.open_store(&data_dir), Arc::new(SystemClock));
        let api = ApiClient::new(&config.api_url())?;
        Self::from_parts(config, store, api)
    }

    /// Assemble the app around an existing token store and API client.
    pub fn from_parts(config: Config, store: TokenStore, api: ApiClient) -> Result<Self> {
        let policy = config.policy()?;
        let bus = ActivityBus::new();
        let session = SessionController::new(store, policy, bus.clone(), RouteQueue::new());
        let (tick_tx, tick_rx) = mpsc::channel(TICK_CHANNEL_SIZE);

        let login_username = std::env::var(USERNAME_ENV)
            .ok()
            .or_else(|| config.last_username.clone())
            .unwrap_or_default();
        let login_password = std::env::var(PASSWORD_ENV).unwrap_or_default();

        Ok(Self {
            config,
            api,
            session,
            bus,

            state: AppState::SigningIn,

            login_username,
            login_password,
            login_focus: LoginFocus::Username,
            login_scope: LoginScope::Admin,
            login_error: None,
            login_reason: SignInReason::Required,

            profile: None,

            tick_tx,
            tick_rx,

            status_message: None,
        })
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Client carrying the current bearer, if signed in.
    fn authed_api(&self) -> Option<ApiClient> {
        self.session
            .bearer_token()
            .map(|token| self.api.with_token(token.to_string()))
    }

    /// Resume a stored session and confirm the backend still accepts it.
    pub async fn restore_session(&mut self) {
        if !self.session.resume() {
            self.apply_routes();
            self.start_login(self.login_reason);
            return;
        }

        if self.refresh_profile().await {
            self.session.start_monitoring(self.tick_tx.clone());
            self.apply_routes();
            info!("Stored session restored");
        } else if self.is_authenticated() {
            // A session that could not be verified is not kept
            let reason = self.status_message.take();
            warn!("Stored session could not be verified, signing out");
            self.session.invalidate();
            self.apply_routes();
            self.login_error = reason;
        }
    }

    /// Fetch `/users/me`. A rejected token ends the session.
    pub async fn refresh_profile(&mut self) -> bool {
        let Some(api) = self.authed_api() else {
            return false;
        };

        match api.current_user().await {
            Ok(profile) => {
                debug!(user_id = profile.id, "Profile loaded");
                self.profile = Some(profile);
                self.status_message = None;
                true
            }
            Err(e) => {
                let rejected = e
                    .downcast_ref::<llmhub_core::ApiError>()
                    .map(|api_err| api_err.is_unauthorized())
                    .unwrap_or(false);
                if rejected {
                    warn!("Stored token rejected by server");
                    self.session.invalidate();
                    self.apply_routes();
                } else {
                    error!(error = %e, "Failed to load profile");
                    self.status_message = Some(format!("Error: {}", e));
                }
                false
            }
        }
    }

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) -> Result<()> {
        let username = self.login_username.trim().to_string();
        let password = self.login_password.clone();

        if username.is_empty() || password.is_empty() {
            self.login_error = Some("Please fill in all fields".to_string());
            return Err(anyhow::anyhow!("Username and password required"));
        }

        self.login_error = None;

        match self.api.authenticate(self.login_scope, &username, &password).await {
            Ok(token) => {
                self.config.last_username = Some(username);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }

                self.session.sign_in(&token);
                self.session.start_monitoring(self.tick_tx.clone());

                self.login_password.clear();
                self.login_reason = SignInReason::Required;
                self.apply_routes();
                info!(scope = ?self.login_scope, "Login successful");

                self.refresh_profile().await;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                self.login_error = Some(e.user_message());
                Err(e.into())
            }
        }
    }

    /// Show the login overlay
    pub fn start_login(&mut self, reason: SignInReason) {
        self.state = AppState::SigningIn;
        self.login_reason = reason;
        self.login_focus = if self.login_username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    pub fn sign_out(&mut self) {
        self.session.sign_out();
        self.apply_routes();
    }

    // =========================================================================
    // Session Monitoring
    // =========================================================================

    /// Feed a user interaction into the activity bus.
    pub fn record_activity(&self, kind: ActivityKind) {
        self.bus.dispatch(kind);
    }

    /// Process pending expiry clock ticks.
    pub fn check_session(&mut self) {
        let mut ticks = 0;
        while self.tick_rx.try_recv().is_ok() {
            ticks += 1;
        }
        // Ticks are idempotent; one evaluation covers any backlog
        if ticks > 0 {
            self.session.poll();
            self.apply_routes();
        }
    }

    pub fn continue_session(&mut self) {
        self.session.continue_session();
        self.status_message = Some("Session extended".to_string());
    }

    pub fn logout_now(&mut self) {
        self.session.logout_now();
        self.apply_routes();
    }

    /// Apply navigation requested by the session controller.
    pub fn apply_routes(&mut self) {
        while let Some(route) = self.session.navigator_mut().pop() {
            match route {
                Route::SignIn { reason } => {
                    debug!(?reason, "Navigating to sign-in");
                    self.profile = None;
                    self.status_message = None;
                    self.start_login(reason);
                }
                Route::Dashboard => {
                    self.state = AppState::Normal;
                }
            }
        }
    }

    // =========================================================================
    // Display helpers
    // =========================================================================

    pub fn phase_label(&self) -> &'static str {
        if !self.is_authenticated() {
            return "signed out";
        }
        match self.session.phase() {
            SessionPhase::Active => "active",
            SessionPhase::Warning => "expiring soon",
            SessionPhase::Expired => "expired",
        }
    }

    /// Time since the last recorded activity.
    pub fn idle_for(&self) -> Option<Duration> {
        let store = self.session.store();
        store
            .get_last_activity()
            .map(|last| (store.now() - last).max(Duration::zero()))
    }

    /// Time left before the session times out at the current idle time.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.idle_for()
            .map(|idle| (self.session.policy().session_timeout() - idle).max(Duration::zero()))
    }
}

// ============================================================================
// Input Validation
// ============================================================================

fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

pub fn can_add_username_char(current_len: usize, c: char) -> bool {
    current_len < MAX_USERNAME_LENGTH && is_valid_input_char(c)
}

pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

/// Compact duration for the status bar, e.g. "4m 05s".
pub fn format_duration(d: Duration) -> String {
    let secs = d.num_seconds().max(0);
    if secs >= 3600 {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

// ============================================================================
// Tests
// ============================================================================
