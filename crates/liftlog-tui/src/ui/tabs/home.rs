use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, List, ListItem, ListState, Paragraph, Sparkline},
    Frame,
};

use liftlog_core::stats;
use liftlog_core::utils::{format_weight, time_ago, truncate_string};

use crate::app::App;
use crate::ui::styles;

/// Render the Home tab - recent workouts on the left, charts on the right
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(7), Constraint::Length(6)])
        .split(chunks[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    render_recent_workouts(frame, app, left[0]);
    render_totals(frame, app, left[1]);
    render_muscle_chart(frame, app, right[0]);
    render_volume_sparkline(frame, app, right[1]);
}

fn render_recent_workouts(frame: &mut Frame, app: &App, area: Rect) {
    let now = Utc::now();
    let recent = app.recent_workouts();

    let items: Vec<ListItem> = if recent.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "  No workouts yet - start one on the New tab",
            styles::muted_style(),
        )))]
    } else {
        recent
            .iter()
            .enumerate()
            .map(|(i, workout)| {
                let style = if i == app.home_selection {
                    styles::selected_style()
                } else {
                    styles::list_item_style()
                };
                let ago = workout
                    .date_time()
                    .map(|dt| time_ago(dt, now))
                    .unwrap_or_default();
                let status = if workout.is_pending() { " (in progress)" } else { "" };

                ListItem::new(vec![
                    Line::from(vec![
                        Span::styled(workout.heading(), style),
                        Span::styled(status, styles::highlight_style()),
                    ]),
                    Line::from(Span::styled(format!("  {}", ago), styles::muted_style())),
                ])
            })
            .collect()
    };

    let block = Block::default()
        .title(" Recent workouts ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let list = List::new(items).block(block);

    let mut state = ListState::default();
    state.select(Some(app.home_selection));

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_totals(frame: &mut Frame, app: &App, area: Rect) {
    let rows = &app.home.workout_exercises;
    let reps: u64 = rows.iter().map(|r| r.total_reps()).sum();
    let volume: f64 = rows.iter().map(|r| r.total_volume()).sum();

    let line = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!(" {:<12}", label), styles::muted_style()),
            Span::styled(value, styles::list_item_style()),
        ])
    };

    let lines = vec![
        line("Workouts", app.home.workouts.len().to_string()),
        line("Exercises", rows.len().to_string()),
        line("Total reps", reps.to_string()),
        line("Volume", format_weight(volume)),
    ];

    let block = Block::default()
        .title(" Totals ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_muscle_chart(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Reps per muscle group ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let totals = stats::reps_per_muscle_group(&app.home.workout_exercises);
    if totals.is_empty() {
        let empty = Paragraph::new(Span::styled(" Nothing logged yet", styles::muted_style()))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let bars: Vec<Bar> = totals
        .iter()
        .map(|(group, reps)| {
            Bar::default()
                .value(*reps)
                .label(Line::from(truncate_string(group, 12)))
                .text_value(reps.to_string())
        })
        .collect();

    let chart = BarChart::default()
        .block(block)
        .direction(Direction::Horizontal)
        .data(BarGroup::default().bars(&bars))
        .bar_width(1)
        .bar_gap(0)
        .bar_style(styles::chart_style())
        .value_style(styles::highlight_style())
        .label_style(styles::list_item_style());

    frame.render_widget(chart, area);
}

fn render_volume_sparkline(frame: &mut Frame, app: &App, area: Rect) {
    let rows = &app.home.workout_exercises;
    let Some(exercise) = stats::most_recurring_exercise(rows) else {
        let block = Block::default()
            .title(" Volume progression ")
            .title_style(styles::title_style())
            .borders(Borders::ALL)
            .border_style(styles::border_style(false));
        let empty = Paragraph::new(Span::styled(" Nothing logged yet", styles::muted_style()))
            .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let points = stats::volume_progression(rows, &exercise);
    let values: Vec<u64> = points.iter().map(|p| p.volume.round().max(0.0) as u64).collect();
    let best = points.iter().map(|p| p.volume).fold(0.0_f64, f64::max);

    let title = format!(
        " Volume: {} ({} sessions, best {}) ",
        truncate_string(&exercise, 24),
        points.len(),
        format_weight(best)
    );
    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let sparkline = Sparkline::default()
        .block(block)
        .data(&values)
        .style(styles::chart_style());

    frame.render_widget(sparkline, area);
}
