use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::app::{App, AppState, LoginFocus, Tab};

use super::styles;
use super::tabs::{home, logs, new_workout, workout};

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame, app),
        AppState::ConfirmingComplete => render_complete_overlay(frame, app),
        AppState::PickingExercise => render_picker_overlay(frame, app),
        AppState::Normal | AppState::Quitting => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  liftlog";

    // Sync indicator for the open workout
    let saving = app.saving_count();
    let sync = if saving > 0 {
        Some((format!("saving {}...", saving), styles::highlight_style()))
    } else if app.has_unsaved_changes() {
        Some(("● unsaved changes".to_string(), styles::unsaved_style()))
    } else {
        None
    };

    let user = app.session.email().unwrap_or("not logged in");
    let right = format!("{}  [?] Help", user);

    let used = title.chars().count()
        + sync.as_ref().map_or(0, |(s, _)| s.chars().count() + 4)
        + right.chars().count()
        + 2;
    let padding = (area.width as usize).saturating_sub(used);

    let mut spans = vec![Span::styled(title, styles::title_style())];
    if let Some((text, style)) = sync {
        spans.push(Span::raw("    "));
        spans.push(Span::styled(text, style));
    }
    spans.push(Span::raw(" ".repeat(padding)));
    spans.push(Span::styled(right, styles::muted_style()));

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (i, tab) in Tab::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        let label = format!("[{}] {}", i + 1, tab.title());
        if *tab == app.current_tab {
            spans.push(Span::styled(label, styles::tab_style(true)));
        } else {
            spans.push(Span::styled(label, styles::muted_style()));
        }
    }

    // The workout in progress, so it is one keypress away from anywhere
    if let Some(ref active) = app.active_workout {
        let hint = format!("In progress: {} ", active.short_label());
        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let padding = (area.width as usize).saturating_sub(used + hint.chars().count() + 2);
        spans.push(Span::raw(" ".repeat(padding)));
        spans.push(Span::styled(hint, styles::highlight_style()));
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.current_tab {
        Tab::Home => home::render(frame, app, area),
        Tab::Logs => logs::render(frame, app, area),
        Tab::Workout => workout::render(frame, app, area),
        Tab::New => new_workout::render(frame, app, area),
    }
}

/// Key hints for the status bar
fn shortcuts(app: &App) -> &'static str {
    match app.current_tab {
        Tab::Home => "[Enter] open | [u]pdate | [q]uit",
        Tab::Logs => "[←→↑↓] day | [<>] month | [Enter] open | [q]uit",
        Tab::Workout if app.editing_set => "[Tab] weight/reps | [Enter] save | [Esc] cancel",
        Tab::Workout => "[e]dit [a]dd [x] remove [+] exercise [c]omplete | [q]uit",
        Tab::New => "[Tab] next field | [Enter] start | [Esc] back",
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    // Latest notification wins, then status message, then cache age
    let (left_text, left_style) = if let Some(notification) = app.notifications.latest() {
        let style = if notification.title == "Error" {
            styles::error_style()
        } else {
            styles::success_style()
        };
        (format!(" {} ", notification.text()), style)
    } else if let Some(ref msg) = app.status_message {
        (format!(" {} ", msg), styles::muted_style())
    } else if app.is_loading() {
        (" Loading... ".to_string(), styles::muted_style())
    } else if let Some(age) = app.cache_age() {
        (format!(" Updated {} ", age), styles::muted_style())
    } else {
        (String::new(), styles::muted_style())
    };

    let right_text = format!(" {} ", shortcuts(app));

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());
    let status_line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 30, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled("  liftlog", styles::title_style())),
        Line::from(Span::styled(
            format!("  version {}", version),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        help_line("1-4", "Switch tabs"),
        help_line("←/→", "Prev/next tab (day on Logs)"),
        help_line("↑/↓", "Navigate"),
        help_line("Enter", "Open / confirm"),
        help_line("u", "Update from server"),
        help_line("L", "Log out"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(Span::styled(" Workout Tab", styles::highlight_style())),
        help_line("e / Enter", "Edit selected set"),
        help_line("Tab", "Switch weight/reps while editing"),
        help_line("a", "Add set"),
        help_line("d", "Duplicate set"),
        help_line("x / Del", "Remove set"),
        help_line("[ / ]", "Previous/next exercise"),
        help_line("Space", "Collapse/expand exercise"),
        help_line("+", "Add exercise"),
        help_line("r", "Retry failed save"),
        help_line("c", "Complete workout"),
        Line::from(""),
        Line::from(Span::styled(" Logs Tab", styles::highlight_style())),
        help_line("< / >", "Previous/next month"),
        help_line("t", "Jump to today"),
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

    let paragraph = Paragraph::new(help_text).block(block);

    frame.render_widget(paragraph, area);
}

/// One labelled input line of a dialog
fn input_line<'a>(label: &'a str, value: String, focused: bool) -> Line<'a> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let cursor = if focused { "▌" } else { "" };
    Line::from(vec![
        Span::raw("   "),
        Span::styled(label, styles::muted_style()),
        Span::styled(" [", styles::muted_style()),
        Span::styled(format!("{:<24}{}", value, cursor), style),
        Span::styled("]", styles::muted_style()),
    ])
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 12 } else { 10 };
    let area = centered_rect_fixed(48, height, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled("  Log in to liftlog", styles::title_style())),
        Line::from(Span::styled(
            format!("  {}", app.api.base_url()),
            styles::muted_style(),
        )),
        Line::from(""),
    ];

    // Keep the tail of long input visible
    let email: String = {
        let chars: Vec<char> = app.login_email.chars().collect();
        chars[chars.len().saturating_sub(24)..].iter().collect()
    };
    lines.push(input_line("Email:   ", email, app.login_focus == LoginFocus::Email));

    let masked = "*".repeat(app.login_password.chars().count().min(24));
    lines.push(input_line("Password:", masked, app.login_focus == LoginFocus::Password));

    // Login button
    lines.push(Line::from(""));
    if app.login_focus == LoginFocus::Button {
        lines.push(Line::from(vec![
            Span::raw("              ["),
            Span::styled(" ▶ Login ◀ ", styles::selected_style()),
            Span::raw("]"),
        ]));
    } else {
        lines.push(Line::from(vec![
            Span::raw("              ["),
            Span::styled("   Login   ", styles::list_item_style()),
            Span::raw("]"),
        ]));
    }

    // Error message
    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(lines).block(block);

    frame.render_widget(paragraph, area);
}

/// Create a centered rectangle with fixed dimensions
pub fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

/// Small yes/no dialog
fn render_confirm_overlay(frame: &mut Frame, question: &str, warning: Option<&str>, action: &str) {
    let height = if warning.is_some() { 9 } else { 7 };
    let area = centered_rect_fixed(48, height, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("   {}", question), styles::highlight_style())),
    ];
    if let Some(warning) = warning {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("   {}", warning), styles::unsaved_style())));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("   Press ", styles::muted_style()),
        Span::styled("[Y]", styles::help_key_style()),
        Span::styled(format!(" to {}, ", action), styles::muted_style()),
        Span::styled("[N]", styles::help_key_style()),
        Span::styled(" to cancel", styles::muted_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_quit_overlay(frame: &mut Frame, app: &App) {
    let warning = app
        .has_unsaved_changes()
        .then_some("Some sets are not saved yet.");
    render_confirm_overlay(frame, "Are you sure you want to quit?", warning, "quit");
}

fn render_complete_overlay(frame: &mut Frame, app: &App) {
    let warning = app
        .has_unsaved_changes()
        .then_some("Unsaved sets will be lost.");
    render_confirm_overlay(frame, "Mark this workout completed?", warning, "complete");
}

fn render_picker_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(56, 20, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let search = Paragraph::new(Line::from(vec![
        Span::styled(" / ", styles::highlight_style()),
        Span::styled(format!("{}▌", app.picker_query), styles::list_item_style()),
    ]))
    .block(
        Block::default()
            .title(" Add exercise ")
            .title_style(styles::title_style())
            .borders(Borders::ALL)
            .border_style(styles::border_style(true)),
    );
    frame.render_widget(search, chunks[0]);

    let results = app.picker_results();
    let items: Vec<ListItem> = if results.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "  No matching exercises",
            styles::muted_style(),
        )))]
    } else {
        results
            .iter()
            .enumerate()
            .map(|(i, exercise)| {
                let style = if i == app.picker_selection {
                    styles::selected_style()
                } else {
                    styles::list_item_style()
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!(" {:<30}", exercise.display_name()), style),
                    Span::styled(exercise.group_label().to_string(), styles::muted_style()),
                ]))
            })
            .collect()
    };

    let list = List::new(items).block(
        Block::default()
            .title(format!(" {} exercises - [Enter] add [Esc] cancel ", results.len()))
            .title_style(styles::muted_style())
            .borders(Borders::ALL)
            .border_style(styles::border_style(true)),
    );

    let mut state = ListState::default();
    state.select(Some(app.picker_selection));
    frame.render_stateful_widget(list, chunks[1], &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fixed() {
        let outer = Rect::new(0, 0, 100, 40);
        let inner = centered_rect_fixed(40, 10, outer);
        assert_eq!(inner, Rect::new(30, 15, 40, 10));
    }

    #[test]
    fn test_centered_rect_fixed_clamps_to_area() {
        let outer = Rect::new(5, 5, 20, 8);
        let inner = centered_rect_fixed(40, 10, outer);
        assert_eq!(inner, Rect::new(5, 5, 20, 8));
    }
}
