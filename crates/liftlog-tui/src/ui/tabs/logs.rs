use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use liftlog_core::calendar;
use liftlog_core::models::ExerciseSet;
use liftlog_core::utils::format_weight;

use crate::app::App;
use crate::ui::styles;

const WEEKDAYS: &str = " Mo  Tu  We  Th  Fr  Sa  Su";

/// Render the Logs tab - month calendar on the left, the selected day on the right
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(32), Constraint::Min(20)])
        .split(area);

    render_calendar(frame, app, chunks[0]);
    render_day(frame, app, chunks[1]);
}

fn render_calendar(frame: &mut Frame, app: &App, area: Rect) {
    let today = Local::now().date_naive();
    let workouts = &app.home.workouts;

    let mut lines = vec![
        Line::from(Span::styled(WEEKDAYS, styles::muted_style())),
        Line::from(""),
    ];

    for week in app.month.weeks() {
        let mut spans = Vec::with_capacity(7);
        for day in week.iter() {
            let label = format!(" {:>2} ", day.date.format("%-d"));
            let mut style = if !day.in_month {
                styles::muted_style()
            } else if calendar::has_workout(workouts, day.date) {
                styles::success_style().add_modifier(Modifier::BOLD)
            } else {
                styles::list_item_style()
            };
            if day.date == today {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            if day.date == app.selected_day {
                style = styles::selected_style();
            }
            spans.push(Span::styled(label, style));
        }
        lines.push(Line::from(spans));
    }

    let logged = app
        .month
        .days()
        .iter()
        .filter(|d| d.in_month && calendar::has_workout(workouts, d.date))
        .count();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(" {} training days", logged),
        styles::muted_style(),
    )));

    let block = Block::default()
        .title(format!(" {} ", app.month.title()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// "10 x 10, 12.5 x 8"
fn sets_summary(sets: &[ExerciseSet]) -> String {
    if sets.is_empty() {
        return "no sets".to_string();
    }
    sets.iter()
        .map(|s| format!("{} x {}", format_weight(s.weight), s.reps))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_day(frame: &mut Frame, app: &App, area: Rect) {
    let day_workouts = app.day_workouts();
    let title = format!(" {} ", app.selected_day.format("%A, %b %-d"));

    let mut lines = Vec::new();
    if day_workouts.is_empty() {
        lines.push(Line::from(Span::styled(
            " No workouts on this day",
            styles::muted_style(),
        )));
    }

    for (i, workout) in day_workouts.iter().enumerate() {
        let selected = i == app.day_selection;
        let style = if selected {
            styles::selected_style()
        } else {
            styles::list_item_style()
        };
        let status = if workout.is_pending() { "  in progress" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(format!(" {} ", workout.time_label()), style),
            Span::styled(status, styles::highlight_style()),
        ]));
        if !workout.notes.trim().is_empty() {
            lines.push(Line::from(Span::styled(
                format!("   {}", workout.notes.trim()),
                styles::muted_style(),
            )));
        }

        let rows = app
            .home
            .workout_exercises
            .iter()
            .filter(|r| r.workout_id == workout.id);
        for row in rows {
            lines.push(Line::from(vec![
                Span::styled(format!("   {:<22}", row.exercise_name()), styles::highlight_style()),
                Span::styled(sets_summary(&row.sets), styles::list_item_style()),
            ]));
        }
        lines.push(Line::from(""));
    }

    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sets_summary() {
        let sets = [ExerciseSet::new(10.0, 10), ExerciseSet::new(12.5, 8)];
        assert_eq!(sets_summary(&sets), "10 x 10, 12.5 x 8");
        assert_eq!(sets_summary(&[]), "no sets");
    }
}
