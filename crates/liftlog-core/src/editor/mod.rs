//! Optimistic editing of the set list of one workout exercise.
//!
//! Each row keeps the last list confirmed by the server next to a working
//! copy the user edits. Edits show up immediately and produce
//! [`SaveRequest`]s for the caller to send; results are fed back through
//! [`SetEditor::apply_save_result`].

pub mod input;
pub mod row;

pub use input::{parse_reps, parse_weight, sanitize, weight_text, SetDraft, SetField};
pub use row::{SaveOutcome, SaveRequest, SetEditor, SyncState};
