//! Validated payloads for every write the app sends to the backend.
//!
//! Each payload is checked with [`Mutation::validate`] before dispatch so
//! malformed input never leaves the client.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::{ExerciseSet, WorkoutStatus};

/// Longest notes text accepted for a workout.
pub const MAX_NOTES_LENGTH: usize = 2000;

/// First set attached to a newly added exercise.
pub const DEFAULT_FIRST_SET: ExerciseSet = ExerciseSet { weight: 10.0, reps: 10 };

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("Notes are too long ({0} characters, max {MAX_NOTES_LENGTH})")]
    NotesTooLong(usize),

    #[error("Set {index} has an invalid weight")]
    InvalidWeight { index: usize },
}

/// A write payload that can check itself before being sent.
pub trait Mutation: Serialize {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Start a new workout. Always created as pending.
#[derive(Debug, Clone, Serialize)]
pub struct NewWorkout {
    pub user_id: String,
    pub date: DateTime<Utc>,
    pub notes: String,
    status: WorkoutStatus,
}

impl NewWorkout {
    pub fn new(user_id: impl Into<String>, date: DateTime<Utc>, notes: &str) -> Self {
        Self {
            user_id: user_id.into(),
            date,
            notes: notes.trim().to_string(),
            status: WorkoutStatus::Pending,
        }
    }
}

impl Mutation for NewWorkout {
    fn validate(&self) -> Result<(), ValidationError> {
        require("User", &self.user_id)?;
        let len = self.notes.chars().count();
        if len > MAX_NOTES_LENGTH {
            return Err(ValidationError::NotesTooLong(len));
        }
        Ok(())
    }
}

/// Attach a catalog exercise to a workout.
#[derive(Debug, Clone, Serialize)]
pub struct NewWorkoutExercise {
    pub user_id: String,
    pub workout_id: String,
    pub exercise_id: String,
    sets: Vec<ExerciseSet>,
}

impl NewWorkoutExercise {
    pub fn new(
        user_id: impl Into<String>,
        workout_id: impl Into<String>,
        exercise_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            workout_id: workout_id.into(),
            exercise_id: exercise_id.into(),
            sets: vec![DEFAULT_FIRST_SET],
        }
    }

    pub fn sets(&self) -> &[ExerciseSet] {
        &self.sets
    }
}

impl Mutation for NewWorkoutExercise {
    fn validate(&self) -> Result<(), ValidationError> {
        require("User", &self.user_id)?;
        require("Workout", &self.workout_id)?;
        require("Exercise", &self.exercise_id)?;
        Ok(())
    }
}

/// Replace the full ordered set list of a workout exercise.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateSets {
    pub sets: Vec<ExerciseSet>,
}

impl UpdateSets {
    pub fn new(sets: Vec<ExerciseSet>) -> Self {
        Self { sets }
    }
}

impl Mutation for UpdateSets {
    fn validate(&self) -> Result<(), ValidationError> {
        for (index, set) in self.sets.iter().enumerate() {
            if !set.weight.is_finite() || set.weight < 0.0 {
                return Err(ValidationError::InvalidWeight { index: index + 1 });
            }
        }
        Ok(())
    }
}

/// Mark a workout as finished.
#[derive(Debug, Clone, Serialize)]
pub struct CompleteWorkout {
    status: WorkoutStatus,
}

impl Default for CompleteWorkout {
    fn default() -> Self {
        Self {
            status: WorkoutStatus::Completed,
        }
    }
}

impl Mutation for CompleteWorkout {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Missing(field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_workout_is_pending() {
        let payload = NewWorkout::new("u1", Utc::now(), "  legs day  ");
        assert!(payload.validate().is_ok());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["notes"], "legs day");
        assert_eq!(json["user_id"], "u1");
    }

    #[test]
    fn test_new_workout_requires_user() {
        let payload = NewWorkout::new("", Utc::now(), "");
        assert_eq!(payload.validate(), Err(ValidationError::Missing("User")));
    }

    #[test]
    fn test_new_workout_notes_limit() {
        let notes = "x".repeat(MAX_NOTES_LENGTH + 1);
        let payload = NewWorkout::new("u1", Utc::now(), &notes);
        assert_eq!(
            payload.validate(),
            Err(ValidationError::NotesTooLong(MAX_NOTES_LENGTH + 1))
        );
    }

    #[test]
    fn test_new_workout_exercise_seeds_first_set() {
        let payload = NewWorkoutExercise::new("u1", "w1", "e1");
        assert!(payload.validate().is_ok());
        assert_eq!(payload.sets(), &[ExerciseSet::new(10.0, 10)]);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["sets"][0]["reps"], 10);
    }

    #[test]
    fn test_new_workout_exercise_requires_ids() {
        assert_eq!(
            NewWorkoutExercise::new("u1", "", "e1").validate(),
            Err(ValidationError::Missing("Workout"))
        );
        assert_eq!(
            NewWorkoutExercise::new("u1", "w1", " ").validate(),
            Err(ValidationError::Missing("Exercise"))
        );
    }

    #[test]
    fn test_update_sets_rejects_bad_weight() {
        let ok = UpdateSets::new(vec![ExerciseSet::new(0.0, 0), ExerciseSet::new(100.0, 3)]);
        assert!(ok.validate().is_ok());

        let bad = UpdateSets::new(vec![ExerciseSet::new(10.0, 1), ExerciseSet::new(f64::NAN, 1)]);
        assert_eq!(bad.validate(), Err(ValidationError::InvalidWeight { index: 2 }));

        let negative = UpdateSets::new(vec![ExerciseSet::new(-1.0, 1)]);
        assert_eq!(negative.validate(), Err(ValidationError::InvalidWeight { index: 1 }));
    }

    #[test]
    fn test_complete_workout_body() {
        let json = serde_json::to_value(CompleteWorkout::default()).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "completed" }));
    }
}
