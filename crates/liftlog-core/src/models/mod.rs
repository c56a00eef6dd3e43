//! Data models for liftlog records.
//!
//! These mirror the collections held by the backend:
//!
//! - `Workout`: a dated training session owned by a user
//! - `Exercise`: catalog entry with a muscle group
//! - `WorkoutExercise`: join record holding the ordered list of `ExerciseSet`s
//! - `mutation`: validated payloads for every write the app performs

pub mod exercise;
pub mod mutation;
pub mod workout;
pub mod workout_exercise;

pub use exercise::{Exercise, MuscleGroup};
pub use mutation::{CompleteWorkout, Mutation, NewWorkout, NewWorkoutExercise, UpdateSets, ValidationError};
pub use workout::{Workout, WorkoutStatus};
pub use workout_exercise::{ExerciseSet, WorkoutExercise, WorkoutExerciseExpand};

/// Collection names on the backend.
pub mod collections {
    pub const USERS: &str = "users";
    pub const WORKOUTS: &str = "workouts";
    pub const EXERCISES: &str = "exercises";
    pub const WORKOUT_EXERCISES: &str = "workout_exercises";
}
