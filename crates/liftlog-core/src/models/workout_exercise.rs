use serde::{Deserialize, Deserializer, Serialize};

use super::{Exercise, Workout};

/// One set of an exercise. Sets have no identity of their own; they are
/// addressed by position in the parent's list.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExerciseSet {
    #[serde(default, deserialize_with = "de_weight")]
    pub weight: f64,
    #[serde(default, deserialize_with = "de_reps")]
    pub reps: u32,
}

impl ExerciseSet {
    pub fn new(weight: f64, reps: u32) -> Self {
        Self { weight, reps }
    }

    /// weight × reps
    pub fn volume(&self) -> f64 {
        self.weight * f64::from(self.reps)
    }
}

/// Older records stored numbers loosely (floats for reps, negatives from
/// bad input). Normalize on the way in.
fn de_weight<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    Ok(if value.is_finite() && value > 0.0 { value } else { 0.0 })
}

fn de_reps<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    if !value.is_finite() || value <= 0.0 {
        return Ok(0);
    }
    Ok(value.round().min(f64::from(u32::MAX)) as u32)
}

fn de_sets<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ExerciseSet>, D::Error> {
    Ok(Option::<Vec<ExerciseSet>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Related records returned when a list is requested with `expand`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkoutExerciseExpand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_id: Option<Exercise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_id: Option<Workout>,
}

impl WorkoutExerciseExpand {
    pub fn is_empty(&self) -> bool {
        self.exercise_id.is_none() && self.workout_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkoutExercise {
    pub id: String,
    #[serde(default)]
    pub workout_id: String,
    #[serde(default)]
    pub exercise_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, deserialize_with = "de_sets")]
    pub sets: Vec<ExerciseSet>,
    #[serde(default)]
    pub created: String,
    #[serde(default, skip_serializing_if = "WorkoutExerciseExpand::is_empty")]
    pub expand: WorkoutExerciseExpand,
}

impl WorkoutExercise {
    pub fn exercise(&self) -> Option<&Exercise> {
        self.expand.exercise_id.as_ref()
    }

    pub fn workout(&self) -> Option<&Workout> {
        self.expand.workout_id.as_ref()
    }

    pub fn exercise_name(&self) -> &str {
        self.exercise().map(|e| e.display_name()).unwrap_or("Unknown")
    }

    pub fn total_reps(&self) -> u64 {
        self.sets.iter().map(|s| u64::from(s.reps)).sum()
    }

    pub fn total_volume(&self) -> f64 {
        self.sets.iter().map(ExerciseSet::volume).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sets_read_as_empty() {
        let row: WorkoutExercise =
            serde_json::from_str(r#"{"id":"r1","sets":null}"#).unwrap();
        assert!(row.sets.is_empty());

        let row: WorkoutExercise = serde_json::from_str(r#"{"id":"r1"}"#).unwrap();
        assert!(row.sets.is_empty());
    }

    #[test]
    fn test_loose_numbers_are_normalized() {
        let row: WorkoutExercise = serde_json::from_str(
            r#"{"id":"r1","sets":[{"weight":22.5,"reps":8.0},{"weight":-5,"reps":-1},{"weight":null}]}"#,
        )
        .unwrap();
        assert_eq!(row.sets[0], ExerciseSet::new(22.5, 8));
        assert_eq!(row.sets[1], ExerciseSet::new(0.0, 0));
        assert_eq!(row.sets[2], ExerciseSet::new(0.0, 0));
    }

    #[test]
    fn test_expand_relations() {
        let row: WorkoutExercise = serde_json::from_str(
            r#"{"id":"r1","exercise_id":"e1","expand":{"exercise_id":{"id":"e1","name":"Bench Press","muscle_group":"Chest"}}}"#,
        )
        .unwrap();
        assert_eq!(row.exercise_name(), "Bench Press");
        assert!(row.workout().is_none());
    }

    #[test]
    fn test_totals() {
        let row = WorkoutExercise {
            id: "r1".into(),
            workout_id: String::new(),
            exercise_id: String::new(),
            user_id: String::new(),
            sets: vec![ExerciseSet::new(10.0, 10), ExerciseSet::new(20.0, 5)],
            created: String::new(),
            expand: Default::default(),
        };
        assert_eq!(row.total_reps(), 15);
        assert_eq!(row.total_volume(), 200.0);
    }

    #[test]
    fn test_empty_expand_not_serialized() {
        let row: WorkoutExercise = serde_json::from_str(r#"{"id":"r1"}"#).unwrap();
        let json = serde_json::to_string(&row).unwrap();
        assert!(!json.contains("expand"));
    }
}
