//! View model for a single workout: its exercises and their set editors.

use tracing::debug;

use crate::editor::{SaveOutcome, SaveRequest, SetEditor};
use crate::models::{Exercise, Workout, WorkoutExercise};
use crate::notify::Notifier;

/// Title used for save failure notifications
const SAVE_ERROR_TITLE: &str = "Error";

/// One exercise of the workout and the editor for its sets.
#[derive(Debug, Clone)]
pub struct ExerciseRow {
    pub record: WorkoutExercise,
    pub editor: SetEditor,
    /// Reload tickets issued when a save of this row was last confirmed
    confirmed_at: Option<u64>,
}

impl ExerciseRow {
    fn new(record: WorkoutExercise) -> Self {
        let editor = SetEditor::new(record.id.clone(), record.sets.clone());
        Self {
            record,
            editor,
            confirmed_at: None,
        }
    }

    /// Whether a reload holding `ticket` was started before this row's
    /// latest confirmed save, and so may carry an older set list
    fn predates_save(&self, ticket: u64) -> bool {
        self.confirmed_at.is_some_and(|at| ticket <= at)
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn name(&self) -> &str {
        self.record.exercise_name()
    }
}

/// A workout as shown on the detail screen.
///
/// Reloads may finish in any order. Each one takes a ticket from
/// [`begin_reload`](Self::begin_reload) when it starts, and
/// [`reconcile`](Self::reconcile) refuses data older than what the view
/// already holds.
#[derive(Debug, Clone)]
pub struct WorkoutView {
    pub workout: Workout,
    pub catalog: Vec<Exercise>,
    rows: Vec<ExerciseRow>,
    issued: u64,
    applied: u64,
}

impl WorkoutView {
    pub fn new(workout: Workout, rows: Vec<WorkoutExercise>, catalog: Vec<Exercise>) -> Self {
        Self {
            workout,
            catalog,
            rows: rows.into_iter().map(ExerciseRow::new).collect(),
            issued: 0,
            applied: 0,
        }
    }

    /// Ticket for a reload about to start
    pub fn begin_reload(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    pub fn rows(&self) -> &[ExerciseRow] {
        &self.rows
    }

    pub fn row(&self, row_id: &str) -> Option<&ExerciseRow> {
        self.rows.iter().find(|r| r.id() == row_id)
    }

    pub fn row_at(&self, index: usize) -> Option<&ExerciseRow> {
        self.rows.get(index)
    }

    /// Editor of the row at `index`, for applying user edits
    pub fn editor_at(&mut self, index: usize) -> Option<&mut SetEditor> {
        self.rows.get_mut(index).map(|r| &mut r.editor)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Merge data loaded under `ticket`. Surviving rows keep their editors
    /// (rebased onto the new server sets), new rows get fresh editors and
    /// rows that disappeared are dropped. Order follows `fresh`.
    ///
    /// A reload older than one already applied is dropped whole. A row
    /// whose save was confirmed after the reload started keeps its sets.
    /// Returns false when any stale data was left out.
    pub fn reconcile(
        &mut self,
        ticket: u64,
        workout: Workout,
        fresh: Vec<WorkoutExercise>,
        catalog: Vec<Exercise>,
    ) -> bool {
        if ticket < self.applied {
            debug!(workout = %workout.id, ticket, applied = self.applied, "Dropping out-of-order reload");
            return false;
        }
        self.applied = ticket;

        let mut previous = std::mem::take(&mut self.rows);
        let before = previous.len();
        let mut current = true;

        self.rows = fresh
            .into_iter()
            .map(|record| match previous.iter().position(|r| r.id() == record.id) {
                Some(pos) => {
                    let mut row = previous.swap_remove(pos);
                    if row.predates_save(ticket) {
                        debug!(row = %row.id(), ticket, "Keeping sets saved after the reload started");
                        current = false;
                    } else {
                        row.editor.rebase(record.sets.clone());
                        row.record = record;
                    }
                    row
                }
                None => ExerciseRow::new(record),
            })
            .collect();

        debug!(
            workout = %workout.id,
            before,
            after = self.rows.len(),
            dropped = previous.len(),
            "Reconciled workout rows"
        );
        self.workout = workout;
        self.catalog = catalog;
        current
    }

    /// Route a save result to its row. Results for rows that no longer
    /// exist are ignored.
    pub fn apply_save_result(&mut self, row_id: &str, seq: u64, result: Result<(), String>) -> SaveOutcome {
        match self.rows.iter_mut().find(|r| r.id() == row_id) {
            Some(row) => {
                let outcome = row.editor.apply_save_result(seq, result);
                if matches!(outcome, SaveOutcome::Synced | SaveOutcome::Resend(_)) {
                    row.confirmed_at = Some(self.issued);
                }
                outcome
            }
            None => {
                debug!(row = row_id, seq, "Save result for a row that is gone");
                SaveOutcome::Ignored
            }
        }
    }

    /// Apply a save result, surfacing a failure through `notifier`.
    ///
    /// Returns the follow-up save to send, if edits were made while the
    /// previous one was in flight.
    pub fn handle_save_result(
        &mut self,
        row_id: &str,
        seq: u64,
        result: Result<(), String>,
        notifier: &mut dyn Notifier,
    ) -> Option<SaveRequest> {
        match self.apply_save_result(row_id, seq, result) {
            SaveOutcome::Resend(request) => Some(request),
            SaveOutcome::Failed(message) => {
                notifier.notify(SAVE_ERROR_TITLE, &message);
                if let Some(row) = self.rows.iter_mut().find(|r| r.id() == row_id) {
                    row.editor.acknowledge_error();
                }
                None
            }
            SaveOutcome::Synced | SaveOutcome::Ignored => None,
        }
    }

    /// Any row with unconfirmed or diverging sets
    pub fn any_out_of_sync(&self) -> bool {
        self.rows.iter().any(|r| r.editor.is_out_of_sync())
    }

    /// Rows with a save in flight
    pub fn saving_count(&self) -> usize {
        self.rows.iter().filter(|r| r.editor.is_saving()).count()
    }

    /// Catalog entries matching `query` by name or muscle group,
    /// case-insensitive
    pub fn search_catalog(&self, query: &str) -> Vec<&Exercise> {
        let query = query.trim().to_lowercase();
        self.catalog
            .iter()
            .filter(|e| {
                query.is_empty()
                    || e.name.to_lowercase().contains(&query)
                    || e.group_label().to_lowercase().contains(&query)
            })
            .collect()
    }
}
