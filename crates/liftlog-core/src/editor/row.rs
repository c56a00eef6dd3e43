use tracing::debug;

use crate::models::{ExerciseSet, UpdateSets};

use super::input::{SetDraft, SetField};

/// Where a row stands relative to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    /// Last save confirmed, nothing pending
    Synced,
    /// Local changes the server has not confirmed and no save in flight
    Dirty,
    /// A save is in flight
    Saving,
    /// The last save failed; cleared by [`SetEditor::acknowledge_error`]
    Error(String),
}

/// A full replacement of a row's set list, to be sent by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub row_id: String,
    pub seq: u64,
    pub sets: Vec<ExerciseSet>,
}

impl SaveRequest {
    pub fn payload(&self) -> UpdateSets {
        UpdateSets::new(self.sets.clone())
    }
}

/// What applying a save result did to the row.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Synced,
    /// The save failed; the message should be shown to the user
    Failed(String),
    /// Edits arrived while the save was in flight; send this next
    Resend(SaveRequest),
    /// Stale or unknown result, nothing changed
    Ignored,
}

/// Working copy of one workout exercise's sets.
///
/// At most one save is in flight per row. Edits made meanwhile are
/// coalesced into a single follow-up save of the latest working copy, so
/// responses can never arrive out of order.
#[derive(Debug, Clone)]
pub struct SetEditor {
    row_id: String,
    server: Vec<ExerciseSet>,
    working: Vec<ExerciseSet>,
    drafts: Vec<SetDraft>,
    state: SyncState,
    next_seq: u64,
    in_flight: Option<(u64, Vec<ExerciseSet>)>,
    resend: bool,
}

impl SetEditor {
    pub fn new(row_id: impl Into<String>, server_sets: Vec<ExerciseSet>) -> Self {
        let drafts = server_sets.iter().map(SetDraft::from_set).collect();
        Self {
            row_id: row_id.into(),
            working: server_sets.clone(),
            server: server_sets,
            drafts,
            state: SyncState::Synced,
            next_seq: 1,
            in_flight: None,
            resend: false,
        }
    }

    pub fn row_id(&self) -> &str {
        &self.row_id
    }

    /// The working copy, as shown to the user
    pub fn sets(&self) -> &[ExerciseSet] {
        &self.working
    }

    /// Last list confirmed by the server
    pub fn server_sets(&self) -> &[ExerciseSet] {
        &self.server
    }

    pub fn drafts(&self) -> &[SetDraft] {
        &self.drafts
    }

    pub fn draft(&self, index: usize) -> Option<&SetDraft> {
        self.drafts.get(index)
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.working.len()
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_empty()
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    // ===== Mutations =====

    /// Append a set carrying the last set's weight and zero reps
    pub fn add_set(&mut self) -> Option<SaveRequest> {
        let weight = self.working.last().map_or(0.0, |s| s.weight);
        let set = ExerciseSet::new(weight, 0);
        self.working.push(set);
        self.drafts.push(SetDraft::from_set(&set));
        self.issue_save()
    }

    /// Remove the set at `index`. Out of range does nothing.
    pub fn remove_set(&mut self, index: usize) -> Option<SaveRequest> {
        if index >= self.working.len() {
            debug!(row = %self.row_id, index, len = self.working.len(), "remove_set out of range");
            return None;
        }
        self.working.remove(index);
        self.drafts.remove(index);
        self.issue_save()
    }

    /// Update the draft text of one field. The working copy is untouched
    /// until [`commit`](Self::commit).
    pub fn edit_set(&mut self, index: usize, field: SetField, text: &str) -> bool {
        match self.drafts.get_mut(index) {
            Some(draft) => {
                draft.set_field(field, text);
                true
            }
            None => {
                debug!(row = %self.row_id, index, "edit_set out of range");
                false
            }
        }
    }

    /// Throw away the draft text at `index`
    pub fn reset_draft(&mut self, index: usize) {
        if let (Some(draft), Some(set)) = (self.drafts.get_mut(index), self.working.get(index)) {
            *draft = SetDraft::from_set(set);
        }
    }

    /// Whether the draft at `index` differs from the committed set
    pub fn draft_out_of_sync(&self, index: usize) -> bool {
        match (self.drafts.get(index), self.working.get(index)) {
            (Some(draft), Some(set)) => draft.to_set() != *set,
            _ => false,
        }
    }

    /// Copy the draft at `index` into the working copy and save
    pub fn commit(&mut self, index: usize) -> Option<SaveRequest> {
        let set = self.drafts.get(index)?.to_set();
        let current = self.working.get_mut(index)?;
        // Normalize the text either way, e.g. "08" -> "8"
        self.drafts[index] = SetDraft::from_set(&set);
        if *current == set {
            return None;
        }
        *current = set;
        self.issue_save()
    }

    /// Replace the whole working copy and save it
    pub fn save_changes(&mut self, sets: Vec<ExerciseSet>) -> Option<SaveRequest> {
        self.drafts = sets.iter().map(SetDraft::from_set).collect();
        self.working = sets;
        self.issue_save()
    }

    /// Send the working copy again after a failed save
    pub fn retry(&mut self) -> Option<SaveRequest> {
        match self.state {
            SyncState::Dirty | SyncState::Error(_) => self.issue_save(),
            _ => None,
        }
    }

    fn issue_save(&mut self) -> Option<SaveRequest> {
        if self.in_flight.is_some() {
            self.resend = true;
            return None;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight = Some((seq, self.working.clone()));
        self.state = SyncState::Saving;
        Some(SaveRequest {
            row_id: self.row_id.clone(),
            seq,
            sets: self.working.clone(),
        })
    }

    // ===== Server feedback =====

    /// Apply the result of the save numbered `seq`
    pub fn apply_save_result(&mut self, seq: u64, result: Result<(), String>) -> SaveOutcome {
        let sent = match self.in_flight.take() {
            Some((in_flight, sent)) if in_flight == seq => sent,
            other => {
                self.in_flight = other;
                debug!(row = %self.row_id, seq, "Ignoring stale save result");
                return SaveOutcome::Ignored;
            }
        };

        match result {
            Ok(()) => {
                self.server = sent;
                if std::mem::take(&mut self.resend) {
                    match self.issue_save() {
                        Some(request) => SaveOutcome::Resend(request),
                        None => SaveOutcome::Ignored,
                    }
                } else {
                    self.state = SyncState::Synced;
                    SaveOutcome::Synced
                }
            }
            Err(message) => {
                // Coalesced edits stay in the working copy for a retry
                self.resend = false;
                self.state = SyncState::Error(message.clone());
                SaveOutcome::Failed(message)
            }
        }
    }

    /// The failure has been shown; park the row as unsaved local changes
    pub fn acknowledge_error(&mut self) {
        if matches!(self.state, SyncState::Error(_)) {
            self.state = SyncState::Dirty;
        }
    }

    /// Take in freshly fetched server data
    pub fn rebase(&mut self, server_sets: Vec<ExerciseSet>) {
        self.server = server_sets;
        match self.state {
            SyncState::Synced => {
                let previous = std::mem::replace(&mut self.working, self.server.clone());
                // Keep text the user is still typing
                let drafts = self
                    .working
                    .iter()
                    .enumerate()
                    .map(|(i, set)| match (self.drafts.get(i), previous.get(i)) {
                        (Some(draft), Some(old)) if draft.to_set() != *old => draft.clone(),
                        _ => SetDraft::from_set(set),
                    })
                    .collect();
                self.drafts = drafts;
            }
            SyncState::Dirty if self.working == self.server => {
                self.state = SyncState::Synced;
            }
            _ => {}
        }
    }

    // ===== Sync status =====

    /// Working copy differs from the server copy in length or any position
    pub fn diverges(&self) -> bool {
        self.working != self.server
    }

    /// Shown as the row's out-of-sync indicator
    pub fn is_out_of_sync(&self) -> bool {
        self.diverges() || self.state != SyncState::Synced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(weight: f64, reps: u32) -> ExerciseSet {
        ExerciseSet::new(weight, reps)
    }

    fn editor(sets: &[ExerciseSet]) -> SetEditor {
        SetEditor::new("row1", sets.to_vec())
    }

    // ===== Structural edits =====

    #[test]
    fn test_initial_state() {
        let editor = editor(&[set(10.0, 10)]);
        assert_eq!(editor.state(), &SyncState::Synced);
        assert!(!editor.is_out_of_sync());
        assert_eq!(editor.drafts().len(), 1);
    }

    #[test]
    fn test_add_set_copies_last_weight() {
        let mut editor = editor(&[set(10.0, 10)]);
        let request = editor.add_set().unwrap();
        assert_eq!(editor.sets(), &[set(10.0, 10), set(10.0, 0)]);
        assert_eq!(request.sets, editor.sets());
        assert_eq!(request.row_id, "row1");
    }

    #[test]
    fn test_add_set_on_empty_list() {
        let mut editor = editor(&[]);
        editor.add_set();
        assert_eq!(editor.sets(), &[set(0.0, 0)]);
    }

    #[test]
    fn test_remove_set() {
        let mut editor = editor(&[set(10.0, 10), set(20.0, 8)]);
        assert!(editor.remove_set(0).is_some());
        assert_eq!(editor.sets(), &[set(20.0, 8)]);
        assert_eq!(editor.drafts()[0].weight, "20");
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let mut editor = editor(&[set(10.0, 10)]);
        assert!(editor.remove_set(1).is_none());
        assert_eq!(editor.len(), 1);
        assert!(!editor.is_out_of_sync());

        let mut empty = SetEditor::new("row", Vec::new());
        assert!(empty.remove_set(0).is_none());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_length_tracks_adds_and_removes() {
        let mut editor = editor(&[]);
        for _ in 0..3 {
            editor.add_set();
        }
        editor.remove_set(1);
        editor.remove_set(5);
        assert_eq!(editor.len(), 2);
        assert_eq!(editor.drafts().len(), 2);
    }

    // ===== Drafts =====

    #[test]
    fn test_edit_only_touches_draft() {
        let mut editor = editor(&[set(10.0, 10)]);
        assert!(editor.edit_set(0, SetField::Reps, "12"));
        assert_eq!(editor.sets(), &[set(10.0, 10)]);
        assert!(editor.draft_out_of_sync(0));
        assert!(!editor.is_out_of_sync());
        assert!(!editor.edit_set(3, SetField::Reps, "1"));
    }

    #[test]
    fn test_commit_moves_draft_into_working_copy() {
        let mut editor = editor(&[set(10.0, 10)]);
        editor.edit_set(0, SetField::Weight, "12.5");
        let request = editor.commit(0).unwrap();
        assert_eq!(request.sets, vec![set(12.5, 10)]);
        assert!(!editor.draft_out_of_sync(0));
        assert!(editor.is_out_of_sync());
    }

    #[test]
    fn test_three_decimal_weight_commits_cleanly() {
        let mut editor = editor(&[set(10.0, 5)]);
        editor.edit_set(0, SetField::Weight, "2.125");
        let request = editor.commit(0).unwrap();
        assert_eq!(request.sets, vec![set(2.125, 5)]);
        assert_eq!(editor.draft(0).unwrap().weight, "2.125");
        assert!(!editor.draft_out_of_sync(0));

        // Committing again is a no-op, not a rounded resend
        assert!(editor.commit(0).is_none());
        assert_eq!(editor.sets(), &[set(2.125, 5)]);

        let loaded = SetEditor::new("row2", vec![set(12.345, 5)]);
        assert!(!loaded.draft_out_of_sync(0));
        assert_eq!(loaded.draft(0).unwrap().weight, "12.345");
    }

    #[test]
    fn test_reset_draft() {
        let mut editor = editor(&[set(10.0, 10)]);
        editor.edit_set(0, SetField::Weight, "99");
        editor.reset_draft(0);
        assert!(!editor.draft_out_of_sync(0));
        assert_eq!(editor.draft(0).unwrap().weight, "10");
    }

    #[test]
    fn test_commit_unchanged_draft_sends_nothing() {
        let mut editor = editor(&[set(10.0, 8)]);
        editor.edit_set(0, SetField::Reps, "08");
        assert!(editor.commit(0).is_none());
        assert_eq!(editor.draft(0).unwrap().reps, "8");
        assert!(editor.commit(4).is_none());
    }

    // ===== Save lifecycle =====

    #[test]
    fn test_out_of_sync_until_save_confirmed() {
        let mut editor = editor(&[set(10.0, 10)]);
        let request = editor.add_set().unwrap();
        assert!(editor.is_out_of_sync());
        assert_eq!(editor.state(), &SyncState::Saving);

        assert_eq!(editor.apply_save_result(request.seq, Ok(())), SaveOutcome::Synced);
        assert!(!editor.is_out_of_sync());
        assert_eq!(editor.server_sets(), editor.sets());
    }

    #[test]
    fn test_failed_save_keeps_local_edits() {
        let mut editor = editor(&[set(10.0, 10)]);
        let request = editor.add_set().unwrap();

        let outcome = editor.apply_save_result(request.seq, Err("network error".into()));
        assert_eq!(outcome, SaveOutcome::Failed("network error".into()));
        assert_eq!(editor.state(), &SyncState::Error("network error".into()));
        assert_eq!(editor.sets(), &[set(10.0, 10), set(10.0, 0)]);
        assert!(editor.is_out_of_sync());

        editor.acknowledge_error();
        assert_eq!(editor.state(), &SyncState::Dirty);
        assert!(editor.is_out_of_sync());

        let retry = editor.retry().unwrap();
        assert!(retry.seq > request.seq);
        assert_eq!(editor.apply_save_result(retry.seq, Ok(())), SaveOutcome::Synced);
        assert!(!editor.is_out_of_sync());
    }

    #[test]
    fn test_edits_during_save_are_coalesced() {
        let mut editor = editor(&[set(10.0, 10)]);
        let first = editor.add_set().unwrap();
        assert!(editor.add_set().is_none());
        assert!(editor.remove_set(0).is_none());

        let resend = match editor.apply_save_result(first.seq, Ok(())) {
            SaveOutcome::Resend(request) => request,
            other => panic!("expected resend, got {:?}", other),
        };
        assert_eq!(resend.sets, vec![set(10.0, 0), set(10.0, 0)]);
        assert_eq!(editor.server_sets(), first.sets.as_slice());
        assert!(editor.is_out_of_sync());

        assert_eq!(editor.apply_save_result(resend.seq, Ok(())), SaveOutcome::Synced);
        assert!(!editor.is_out_of_sync());
    }

    #[test]
    fn test_save_changes_replaces_list() {
        let mut editor = editor(&[set(10.0, 10)]);
        editor.edit_set(0, SetField::Reps, "3");

        let sets = vec![set(20.0, 8), set(22.5, 6)];
        let request = editor.save_changes(sets.clone()).unwrap();
        assert_eq!(request.sets, sets);
        assert_eq!(request.row_id, "row1");
        assert_eq!(editor.sets(), sets.as_slice());
        assert_eq!(editor.drafts().len(), 2);
        assert_eq!(editor.draft(1).unwrap().weight, "22.5");
        assert!(!editor.draft_out_of_sync(0));
        assert!(editor.is_out_of_sync());

        assert_eq!(editor.apply_save_result(request.seq, Ok(())), SaveOutcome::Synced);
        assert_eq!(editor.server_sets(), sets.as_slice());
        assert!(!editor.is_out_of_sync());
    }

    #[test]
    fn test_save_changes_while_saving_is_coalesced() {
        let mut editor = editor(&[set(10.0, 10)]);
        let first = editor.add_set().unwrap();
        assert!(editor.save_changes(vec![set(30.0, 3)]).is_none());
        assert_eq!(editor.sets(), &[set(30.0, 3)]);

        let resend = match editor.apply_save_result(first.seq, Ok(())) {
            SaveOutcome::Resend(request) => request,
            other => panic!("expected resend, got {:?}", other),
        };
        assert_eq!(resend.sets, vec![set(30.0, 3)]);
        assert_eq!(editor.apply_save_result(resend.seq, Ok(())), SaveOutcome::Synced);
        assert_eq!(editor.server_sets(), &[set(30.0, 3)]);
    }

    #[test]
    fn test_rejected_save_changes_keeps_list() {
        let mut editor = editor(&[set(10.0, 10)]);
        let request = editor.save_changes(Vec::new()).unwrap();

        let outcome = editor.apply_save_result(request.seq, Err("network error".into()));
        assert_eq!(outcome, SaveOutcome::Failed("network error".into()));
        editor.acknowledge_error();
        assert!(editor.is_empty());
        assert_eq!(editor.server_sets(), &[set(10.0, 10)]);
        assert!(editor.is_out_of_sync());
    }

    #[test]
    fn test_stale_results_are_ignored() {
        let mut editor = editor(&[set(10.0, 10)]);
        let request = editor.add_set().unwrap();

        assert_eq!(editor.apply_save_result(request.seq + 7, Ok(())), SaveOutcome::Ignored);
        assert!(editor.is_saving());

        editor.apply_save_result(request.seq, Ok(()));
        assert_eq!(editor.apply_save_result(request.seq, Err("late".into())), SaveOutcome::Ignored);
        assert_eq!(editor.state(), &SyncState::Synced);
    }

    #[test]
    fn test_retry_only_when_unsaved() {
        let mut editor = editor(&[set(10.0, 10)]);
        assert!(editor.retry().is_none());
        editor.add_set();
        assert!(editor.retry().is_none());
    }

    // ===== Rebase =====

    #[test]
    fn test_rebase_synced_row_takes_server_data() {
        let mut editor = editor(&[set(10.0, 10)]);
        editor.rebase(vec![set(15.0, 5), set(15.0, 5)]);
        assert_eq!(editor.sets(), &[set(15.0, 5), set(15.0, 5)]);
        assert_eq!(editor.drafts().len(), 2);
        assert!(!editor.is_out_of_sync());
    }

    #[test]
    fn test_rebase_keeps_unsaved_draft_text() {
        let mut editor = editor(&[set(10.0, 10)]);
        editor.edit_set(0, SetField::Reps, "11");
        editor.rebase(vec![set(10.0, 10)]);
        assert_eq!(editor.draft(0).unwrap().reps, "11");
    }

    #[test]
    fn test_rebase_dirty_row() {
        let mut editor = editor(&[set(10.0, 10)]);
        let request = editor.add_set().unwrap();
        editor.apply_save_result(request.seq, Err("offline".into()));
        editor.acknowledge_error();

        // Server still has the old list: local changes survive
        editor.rebase(vec![set(10.0, 10)]);
        assert_eq!(editor.len(), 2);
        assert_eq!(editor.state(), &SyncState::Dirty);

        // Server caught up (e.g. the write landed after all)
        editor.rebase(vec![set(10.0, 10), set(10.0, 0)]);
        assert_eq!(editor.state(), &SyncState::Synced);
        assert!(!editor.is_out_of_sync());
    }

    #[test]
    fn test_rebase_while_saving_keeps_working_copy() {
        let mut editor = editor(&[set(10.0, 10)]);
        editor.add_set();
        editor.rebase(vec![set(10.0, 10)]);
        assert_eq!(editor.len(), 2);
        assert_eq!(editor.state(), &SyncState::Saving);
    }

    #[test]
    fn test_payload_validates() {
        use crate::models::Mutation;
        let mut editor = editor(&[set(10.0, 10)]);
        let request = editor.add_set().unwrap();
        assert!(request.payload().validate().is_ok());
    }
}
