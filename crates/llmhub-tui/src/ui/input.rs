//! Keyboard input handling for the TUI.
//!
//! This module handles keyboard events and translates them into
//! application state changes, and maps mouse events to activity kinds.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseEventKind};
use tracing::debug;

use llmhub_core::session::ActivityKind;

use crate::app::{can_add_password_char, can_add_username_char, App, AppState, LoginFocus};

/// Mouse event to interaction signal.
pub fn activity_for_mouse(kind: MouseEventKind) -> Option<ActivityKind> {
    match kind {
        MouseEventKind::Down(_) => Some(ActivityKind::PointerDown),
        MouseEventKind::Up(_) => Some(ActivityKind::Click),
        MouseEventKind::Moved | MouseEventKind::Drag(_) => Some(ActivityKind::PointerMove),
        MouseEventKind::ScrollUp
        | MouseEventKind::ScrollDown
        | MouseEventKind::ScrollLeft
        | MouseEventKind::ScrollRight => Some(ActivityKind::Scroll),
    }
}

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // The session warning takes precedence over everything else
    if app.session.prompt().is_some() {
        handle_warning_input(app, key);
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = if app.is_authenticated() {
                    AppState::Normal
                } else {
                    AppState::SigningIn
                };
            }
            _ => {}
        }
        return Ok(false);
    }

    // Handle login overlay
    if matches!(app.state, AppState::SigningIn) {
        return handle_login_input(app, key).await;
    }

    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.state = AppState::ConfirmingQuit;
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
        }
        KeyCode::Char('r') => {
            app.status_message = Some("Refreshing profile...".to_string());
            app.refresh_profile().await;
        }
        KeyCode::Char('o') => {
            app.sign_out();
        }
        _ => {}
    }

    Ok(false)
}

fn handle_warning_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('C') | KeyCode::Enter => {
            debug!("Continue chosen from session warning");
            app.continue_session();
        }
        KeyCode::Char('l') | KeyCode::Char('L') => {
            debug!("Logout chosen from session warning");
            app.logout_now();
        }
        _ => {}
    }
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::ConfirmingQuit;
        }
        KeyCode::Tab | KeyCode::Down => {
            app.login_focus = app.login_focus.next();
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.login_focus = app.login_focus.prev();
        }
        KeyCode::Left | KeyCode::Right if app.login_focus == LoginFocus::Scope => {
            app.login_scope = app.login_scope.toggle();
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Username => app.login_focus = LoginFocus::Password,
            LoginFocus::Scope => app.login_scope = app.login_scope.toggle(),
            LoginFocus::Password | LoginFocus::Button => {
                // Errors are shown on the form
                let _ = app.attempt_login().await;
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Username => {
                app.login_username.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Scope | LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Username => {
                if can_add_username_char(app.login_username.chars().count(), c) {
                    app.login_username.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Scope if c == ' ' => {
                app.login_scope = app.login_scope.toggle();
            }
            LoginFocus::Scope | LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crossterm::event::MouseButton;
    use llmhub_core::api::{ApiClient, LoginScope};
    use llmhub_core::session::{MemoryStore, SystemClock, TokenStore};
    use llmhub_core::Config;

    fn signed_out_app() -> App {
        let store = TokenStore::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock));
        let api = ApiClient::new("http://127.0.0.1:1").unwrap();
        App::from_parts(Config::default(), store, api).unwrap()
    }

    #[tokio::test]
    async fn test_login_scope_toggles_from_form() {
        let mut app = signed_out_app();
        assert_eq!(app.state, AppState::SigningIn);
        assert_eq!(app.login_scope, LoginScope::Admin);

        app.login_focus = LoginFocus::Scope;
        handle_input(&mut app, KeyEvent::from(KeyCode::Char(' '))).await.unwrap();
        assert_eq!(app.login_scope, LoginScope::User);

        handle_input(&mut app, KeyEvent::from(KeyCode::Right)).await.unwrap();
        assert_eq!(app.login_scope, LoginScope::Admin);

        handle_input(&mut app, KeyEvent::from(KeyCode::BackTab)).await.unwrap();
        assert_eq!(app.login_focus, LoginFocus::Password);
    }

    #[tokio::test]
    async fn test_empty_form_is_rejected_locally() {
        let mut app = signed_out_app();
        app.login_username.clear();
        app.login_password.clear();
        app.login_focus = LoginFocus::Button;

        handle_input(&mut app, KeyEvent::from(KeyCode::Enter)).await.unwrap();
        assert!(app.login_error.is_some());
        assert!(!app.is_authenticated());
    }

    #[test]
    fn test_mouse_activity_mapping() {
        assert_eq!(
            activity_for_mouse(MouseEventKind::Down(MouseButton::Left)),
            Some(ActivityKind::PointerDown)
        );
        assert_eq!(
            activity_for_mouse(MouseEventKind::Up(MouseButton::Left)),
            Some(ActivityKind::Click)
        );
        assert_eq!(activity_for_mouse(MouseEventKind::Moved), Some(ActivityKind::PointerMove));
        assert_eq!(activity_for_mouse(MouseEventKind::ScrollDown), Some(ActivityKind::Scroll));
    }
}
