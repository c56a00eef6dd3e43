use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, FormFocus};
use crate::ui::render::centered_rect_fixed;
use crate::ui::styles;

/// Render the New tab - the form that starts a workout
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let outer = Block::default()
        .title(" New workout ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let area = centered_rect_fixed(60, 14, inner);

    // Only one workout may be in progress at a time
    if let Some(ref active) = app.active_workout {
        let lines = vec![
            Line::from(Span::styled(
                "You already have a workout in progress:",
                styles::highlight_style(),
            )),
            Line::from(""),
            Line::from(Span::styled(active.heading(), styles::title_style())),
            Line::from(""),
            Line::from(vec![
                Span::styled("Press ", styles::muted_style()),
                Span::styled("[Enter]", styles::help_key_style()),
                Span::styled(" to continue it.", styles::muted_style()),
            ]),
        ];
        frame.render_widget(Paragraph::new(lines), area);
        return;
    }

    let form = &app.form;
    let field = |label: &'static str, value: &str, focus: FormFocus, hint: &'static str| {
        let focused = form.focus == focus;
        let style = if focused {
            styles::selected_style()
        } else {
            styles::list_item_style()
        };
        let cursor = if focused { "▌" } else { "" };
        Line::from(vec![
            Span::styled(format!("{:<7}", label), styles::muted_style()),
            Span::styled("[", styles::muted_style()),
            Span::styled(format!("{:<12}{}", value, cursor), style),
            Span::styled("] ", styles::muted_style()),
            Span::styled(hint, styles::muted_style()),
        ])
    };

    let mut lines = vec![
        field("Date", &form.date, FormFocus::Date, "YYYY-MM-DD"),
        field("Time", &form.time, FormFocus::Time, "HH:MM, 24h"),
        Line::from(""),
        Line::from(Span::styled("Notes", styles::muted_style())),
    ];

    let notes_style = if form.focus == FormFocus::Notes {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let cursor = if form.focus == FormFocus::Notes { "▌" } else { "" };
    let notes = if form.notes.is_empty() && form.focus != FormFocus::Notes {
        Span::styled("(optional)", styles::muted_style())
    } else {
        Span::styled(format!("{}{}", form.notes, cursor), notes_style)
    };
    lines.push(Line::from(notes));
    lines.push(Line::from(""));

    let label = if form.submitting { " Starting... " } else { " Start workout " };
    if form.focus == FormFocus::Submit {
        lines.push(Line::from(vec![
            Span::raw("["),
            Span::styled(format!("▶{}◀", label), styles::selected_style()),
            Span::raw("]"),
        ]));
    } else {
        lines.push(Line::from(vec![
            Span::raw("["),
            Span::styled(format!(" {} ", label), styles::list_item_style()),
            Span::raw("]"),
        ]));
    }

    if let Some(ref error) = form.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(error.clone(), styles::error_style())));
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}
