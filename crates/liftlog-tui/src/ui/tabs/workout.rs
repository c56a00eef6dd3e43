use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use liftlog_core::editor::{SetEditor, SetField, SyncState};
use liftlog_core::utils::format_weight;
use liftlog_core::workout_view::{ExerciseRow, WorkoutView};

use crate::app::App;
use crate::ui::styles;

/// Render the Workout tab - the open workout and its set tables
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(view) = app.view.as_ref() else {
        render_placeholder(frame, app, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(5)])
        .split(area);

    render_header(frame, view, chunks[0]);
    render_rows(frame, app, view, chunks[1]);
}

fn render_placeholder(frame: &mut Frame, app: &App, area: Rect) {
    let text = if app.viewing_id().is_some() {
        " Loading workout..."
    } else {
        " No workout in progress. Start one on the New tab [4]."
    };
    let block = Block::default()
        .title(" Workout ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(
        Paragraph::new(Span::styled(text, styles::muted_style())).block(block),
        area,
    );
}

fn render_header(frame: &mut Frame, view: &WorkoutView, area: Rect) {
    let workout = &view.workout;
    let status_style = if workout.is_pending() {
        styles::highlight_style()
    } else {
        styles::success_style()
    };

    let volume: f64 = view
        .rows()
        .iter()
        .flat_map(|r| r.editor.sets())
        .map(|s| s.volume())
        .sum();

    let mut lines = vec![Line::from(vec![
        Span::styled(format!(" {}  ", workout.time_label()), styles::list_item_style()),
        Span::styled(workout.status.to_string(), status_style),
        Span::styled(
            format!("   {} exercises, volume {}", view.len(), format_weight(volume)),
            styles::muted_style(),
        ),
    ])];
    let notes = workout.notes.trim();
    lines.push(Line::from(Span::styled(
        format!(" {}", if notes.is_empty() { "No notes" } else { notes }),
        styles::muted_style(),
    )));

    let block = Block::default()
        .title(format!(" {} ", workout.heading()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Label and style describing where a row stands against the server
fn sync_label(editor: &SetEditor) -> Option<(String, Style)> {
    match editor.state() {
        SyncState::Saving => Some(("saving...".to_string(), styles::highlight_style())),
        SyncState::Error(message) => Some((format!("save failed: {}", message), styles::error_style())),
        SyncState::Dirty => Some(("not saved - [r] retry".to_string(), styles::unsaved_style())),
        SyncState::Synced if editor.is_out_of_sync() => {
            Some(("unsaved".to_string(), styles::unsaved_style()))
        }
        SyncState::Synced => None,
    }
}

/// One cell of the set table
fn field_span(text: &str, width: usize, editing: bool, dirty: bool) -> Span<'static> {
    if editing {
        Span::styled(format!("{:>w$}▌", text, w = width - 1), styles::editing_style())
    } else if dirty {
        Span::styled(format!("{:>w$}", text, w = width), styles::unsaved_style())
    } else {
        Span::styled(format!("{:>w$}", text, w = width), styles::list_item_style())
    }
}

/// Lines for one exercise. Returns the lines and, if the cursor is inside
/// this row, the offset of the cursor line.
fn row_lines(app: &App, index: usize, row: &ExerciseRow) -> (Vec<Line<'static>>, Option<usize>) {
    let selected = index == app.exercise_selection;
    let collapsed = app.is_collapsed(row.id());
    let editor = &row.editor;
    let mut lines = Vec::new();
    let mut cursor = None;

    let marker = if collapsed { "▸" } else { "▾" };
    let name_style = if selected {
        styles::title_style()
    } else {
        styles::list_item_style()
    };
    let mut header = vec![
        Span::styled(format!(" {} ", marker), styles::muted_style()),
        Span::styled(row.name().to_string(), name_style),
        Span::styled(
            format!("  {} sets", editor.len()),
            styles::muted_style(),
        ),
    ];
    if let Some((label, style)) = sync_label(editor) {
        header.push(Span::raw("   "));
        header.push(Span::styled(label, style));
    }
    if selected && (collapsed || editor.is_empty()) {
        cursor = Some(0);
    }
    lines.push(Line::from(header));

    if !collapsed {
        if editor.is_empty() {
            lines.push(Line::from(Span::styled(
                "      no sets - press [a] to add one",
                styles::muted_style(),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "       #    Weight    Reps",
                styles::muted_style(),
            )));
        }

        for (set_index, draft) in editor.drafts().iter().enumerate() {
            let is_cursor = selected && set_index == app.set_selection;
            let editing = is_cursor && app.editing_set;
            let dirty = editor.draft_out_of_sync(set_index);
            if is_cursor {
                cursor = Some(lines.len());
            }

            let pointer = if is_cursor { "   ▶ " } else { "     " };
            let mut spans = vec![
                Span::styled(pointer, styles::highlight_style()),
                Span::styled(format!("{:>2}", set_index + 1), styles::muted_style()),
                Span::raw("  "),
                field_span(&draft.weight, 8, editing && app.set_field == SetField::Weight, dirty),
                Span::raw("  "),
                field_span(&draft.reps, 6, editing && app.set_field == SetField::Reps, dirty),
            ];
            if dirty {
                spans.push(Span::styled("  *", styles::unsaved_style()));
            }
            let line = Line::from(spans);
            lines.push(if is_cursor && !editing {
                line.style(styles::selected_style())
            } else {
                line
            });
        }
    }
    lines.push(Line::from(""));
    (lines, cursor)
}

fn render_rows(frame: &mut Frame, app: &App, view: &WorkoutView, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();
    let mut cursor_line = 0;

    if view.is_empty() {
        lines.push(Line::from(Span::styled(
            " No exercises yet - press [+] to add one",
            styles::muted_style(),
        )));
    }

    for (index, row) in view.rows().iter().enumerate() {
        let (row_lines, cursor) = row_lines(app, index, row);
        if let Some(offset) = cursor {
            cursor_line = lines.len() + offset;
        }
        lines.extend(row_lines);
    }

    // Keep the cursor on screen
    let visible = area.height.saturating_sub(2) as usize;
    let scroll = (cursor_line + 2).saturating_sub(visible);

    let block = Block::default()
        .title(" Exercises ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .scroll((scroll.min(u16::MAX as usize) as u16, 0));
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use liftlog_core::models::ExerciseSet;

    #[test]
    fn test_sync_label_follows_editor_state() {
        let mut editor = SetEditor::new("r1", vec![ExerciseSet::new(10.0, 10)]);
        assert!(sync_label(&editor).is_none());

        let request = editor.add_set().unwrap();
        assert_eq!(sync_label(&editor).unwrap().0, "saving...");

        editor.apply_save_result(request.seq, Err("network error".into()));
        assert_eq!(sync_label(&editor).unwrap().0, "save failed: network error");

        editor.acknowledge_error();
        assert_eq!(sync_label(&editor).unwrap().0, "not saved - [r] retry");
    }

    #[test]
    fn test_field_span_pads_to_width() {
        assert_eq!(field_span("10", 6, false, false).content, "    10");
        assert_eq!(field_span("10", 6, true, false).content, "   10▌");
    }
}
