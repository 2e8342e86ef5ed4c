use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use llmhub_core::api::LoginScope;
use llmhub_core::session::SignInReason;

use crate::app::{format_duration, App, AppState, LoginFocus};

use super::styles;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(8),    // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, chunks[0]);
    render_main_content(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    // Render overlays
    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame);
    }

    if matches!(app.state, AppState::SigningIn) {
        render_login_overlay(frame, app);
    }

    if matches!(app.state, AppState::ConfirmingQuit) {
        render_quit_overlay(frame);
    }

    // The warning sits above everything while it is open
    if app.session.prompt().is_some() {
        render_warning_overlay(frame, app);
    }
}

fn render_title_bar(frame: &mut Frame, area: Rect) {
    let title = "  LLM Hub Admin";
    let help_hint = "[?] Help";

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            area.width
                .saturating_sub(title.len() as u16 + help_hint.len() as u16 + 4)
                as usize,
        )),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::border_style(false));

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Dashboard ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(app.is_authenticated()));

    let mut lines = vec![Line::from("")];

    match (&app.profile, app.is_authenticated()) {
        (Some(profile), true) => {
            lines.push(Line::from(vec![
                Span::styled("  Signed in as  ", styles::muted_style()),
                Span::styled(profile.display_name().to_string(), styles::highlight_style()),
            ]));
            lines.push(Line::from(vec![
                Span::styled("  Email         ", styles::muted_style()),
                Span::styled(profile.email.clone(), styles::field_style()),
            ]));
            if let Some(credits) = profile.credits {
                lines.push(Line::from(vec![
                    Span::styled("  Credits       ", styles::muted_style()),
                    Span::styled(format!("{:.2}", credits), styles::field_style()),
                ]));
            }
            if let Some(created) = profile.created_at {
                lines.push(Line::from(vec![
                    Span::styled("  Member since  ", styles::muted_style()),
                    Span::styled(created.format("%Y-%m-%d").to_string(), styles::field_style()),
                ]));
            }
        }
        (None, true) => {
            lines.push(Line::from(Span::styled(
                "  Loading profile...",
                styles::muted_style(),
            )));
        }
        _ => {
            lines.push(Line::from(Span::styled(
                "  Not signed in",
                styles::muted_style(),
            )));
        }
    }

    if app.is_authenticated() {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("  Session       ", styles::muted_style()),
            Span::styled(app.phase_label(), session_style(app)),
        ]));
        let timeout = app.session.policy().session_timeout();
        lines.push(Line::from(vec![
            Span::styled("  Idle timeout  ", styles::muted_style()),
            Span::styled(format_duration(timeout), styles::field_style()),
        ]));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn session_style(app: &App) -> Style {
    if app.session.prompt().is_some() {
        styles::warning_style()
    } else {
        styles::success_style()
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = "[r]efresh | [o] sign out | [q]uit";

    let left_text = if let Some(ref msg) = app.status_message {
        format!(" {} ", msg)
    } else {
        match (app.idle_for(), app.time_remaining()) {
            (Some(idle), Some(left)) if app.is_authenticated() => format!(
                " Idle {} | expires in {} ",
                format_duration(idle),
                format_duration(left)
            ),
            _ => format!(" {} ", app.phase_label()),
        }
    };
    let right_text = format!(" {} ", shortcuts);

    let padding_len = (area.width as usize)
        .saturating_sub(left_text.len())
        .saturating_sub(right_text.len());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    frame.render_widget(
        Paragraph::new(status_line).style(styles::status_bar_style()),
        area,
    );
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 17, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");
    let key = |k: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::styled(k, styles::help_key_style()),
            Span::styled(desc, styles::help_desc_style()),
        ])
    };

    let help_text = vec![
        Line::from(Span::styled("  LLM Hub Admin", styles::title_style())),
        Line::from(Span::styled(
            format!("  version {}", version),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Actions", styles::highlight_style())),
        key("  r         ", "Refresh profile"),
        key("  o         ", "Sign out"),
        key("  q         ", "Quit"),
        Line::from(""),
        Line::from(Span::styled(" Session warning", styles::highlight_style())),
        key("  c / Enter ", "Continue session"),
        key("  l         ", "Log out now"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 14 } else { 12 };
    let area = centered_rect_fixed(50, height, frame.area());
    frame.render_widget(Clear, area);

    let reason_style = match app.login_reason {
        SignInReason::Timeout => styles::error_style(),
        _ => styles::muted_style(),
    };

    let mut lines = vec![
        Line::from(Span::styled("  LLM Hub Admin", styles::title_style())),
        Line::from(""),
        Line::from(Span::styled(
            format!("  {}", app.login_reason.message()),
            reason_style,
        )),
        Line::from(""),
    ];

    // Username field
    let username_focused = app.login_focus == LoginFocus::Username;
    let cursor = if username_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::styled("  Username: [", styles::muted_style()),
        Span::styled(
            format!("{:<24}{}", app.login_username, cursor),
            field_focus_style(username_focused),
        ),
        Span::styled("]", styles::muted_style()),
    ]));

    // Password field
    let password_focused = app.login_focus == LoginFocus::Password;
    let cursor = if password_focused { "▌" } else { "" };
    let masked = "*".repeat(app.login_password.chars().count().min(24));
    lines.push(Line::from(vec![
        Span::styled("  Password: [", styles::muted_style()),
        Span::styled(
            format!("{:<24}{}", masked, cursor),
            field_focus_style(password_focused),
        ),
        Span::styled("]", styles::muted_style()),
    ]));

    // Admin / user endpoint toggle
    let scope_focused = app.login_focus == LoginFocus::Scope;
    let scope_spans: Vec<Span> = [LoginScope::Admin, LoginScope::User]
        .into_iter()
        .map(|scope| {
            let mark = if scope == app.login_scope { "(•) " } else { "( ) " };
            Span::styled(
                format!("{}{}  ", mark, scope.label()),
                field_focus_style(scope_focused && scope == app.login_scope),
            )
        })
        .collect();
    let mut scope_line = vec![Span::styled("  Sign in as: ", styles::muted_style())];
    scope_line.extend(scope_spans);
    lines.push(Line::from(scope_line));

    // Sign-in button
    let button_focused = app.login_focus == LoginFocus::Button;
    let label = if button_focused { " ▶ Sign in ◀ " } else { "   Sign in   " };
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("              ["),
        Span::styled(label, field_focus_style(button_focused)),
        Span::raw("]"),
    ]));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("  {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn field_focus_style(focused: bool) -> Style {
    if focused {
        styles::selected_style()
    } else {
        styles::field_style()
    }
}

fn render_warning_overlay(frame: &mut Frame, app: &App) {
    let Some(prompt) = app.session.prompt() else {
        return;
    };

    let area = centered_rect_fixed(50, 9, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(prompt.message(), styles::field_style())),
        Line::from(""),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("[c]", styles::help_key_style()),
            Span::styled(" Continue Session   ", styles::help_desc_style()),
            Span::styled("[l]", styles::help_key_style()),
            Span::styled(" Logout Now", styles::help_desc_style()),
        ]),
    ];

    let block = Block::default()
        .title(Span::styled(" Session Timeout Warning ", styles::warning_style()))
        .borders(Borders::ALL)
        .border_style(styles::warning_style())
        .style(Style::default());

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
