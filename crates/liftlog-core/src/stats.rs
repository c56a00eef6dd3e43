//! Aggregates behind the home screen charts.

use chrono::NaiveDate;

use crate::models::WorkoutExercise;

/// Label used when a row has no expanded exercise
const UNKNOWN: &str = "Unknown";

/// One point of an exercise's volume over time.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumePoint {
    pub date: NaiveDate,
    /// Sum of weight x reps across the sets of that row
    pub volume: f64,
}

/// Add `reps` to the total for `label`, keeping first-seen order
fn accumulate(totals: &mut Vec<(String, u64)>, label: &str, reps: u64) {
    match totals.iter_mut().find(|(l, _)| l == label) {
        Some((_, total)) => *total += reps,
        None => totals.push((label.to_string(), reps)),
    }
}

/// Total reps per muscle group, in the order groups first appear
pub fn reps_per_muscle_group(rows: &[WorkoutExercise]) -> Vec<(String, u64)> {
    let mut totals = Vec::new();
    for row in rows {
        let group = row.exercise().map_or(UNKNOWN, |e| e.group_label());
        accumulate(&mut totals, group, row.total_reps());
    }
    totals
}

/// Total reps per exercise name, in the order exercises first appear
pub fn reps_per_exercise(rows: &[WorkoutExercise]) -> Vec<(String, u64)> {
    let mut totals = Vec::new();
    for row in rows {
        let name = row.exercise().map_or(UNKNOWN, |e| e.display_name());
        accumulate(&mut totals, name, row.total_reps());
    }
    totals
}

/// Name of the exercise with the most total reps. Ties go to the one seen
/// first.
pub fn most_recurring_exercise(rows: &[WorkoutExercise]) -> Option<String> {
    let mut best: Option<(String, u64)> = None;
    for (name, reps) in reps_per_exercise(rows) {
        if best.as_ref().map_or(true, |(_, top)| reps > *top) {
            best = Some((name, reps));
        }
    }
    best.map(|(name, _)| name)
}

/// Volume of each logged row of `exercise`, oldest workout first.
///
/// Rows without an expanded, dated workout are skipped.
pub fn volume_progression(rows: &[WorkoutExercise], exercise: &str) -> Vec<VolumePoint> {
    let mut points: Vec<VolumePoint> = rows
        .iter()
        .filter(|row| row.exercise().map_or(UNKNOWN, |e| e.display_name()) == exercise)
        .filter_map(|row| {
            let date = row.workout()?.date_time()?;
            Some(VolumePoint {
                date: date.date_naive(),
                volume: row.total_volume(),
            })
        })
        .collect();
    points.sort_by_key(|p| p.date);
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Exercise, ExerciseSet, Workout, WorkoutExerciseExpand};

    fn row(name: &str, group: &str, date: &str, sets: &[(f64, u32)]) -> WorkoutExercise {
        WorkoutExercise {
            id: format!("{}-{}", name, date),
            sets: sets.iter().map(|&(w, r)| ExerciseSet::new(w, r)).collect(),
            expand: WorkoutExerciseExpand {
                exercise_id: Some(Exercise {
                    id: name.to_lowercase(),
                    name: name.to_string(),
                    muscle_group: group.to_string(),
                }),
                workout_id: Some(Workout {
                    id: format!("w-{}", date),
                    date: date.to_string(),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }
    }

    fn bare(sets: &[(f64, u32)]) -> WorkoutExercise {
        WorkoutExercise {
            id: "bare".into(),
            sets: sets.iter().map(|&(w, r)| ExerciseSet::new(w, r)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_reps_per_muscle_group() {
        let rows = vec![
            row("Bench Press", "Chest", "2024-01-10", &[(60.0, 10), (60.0, 8)]),
            row("Squat", "Quadriceps", "2024-01-11", &[(100.0, 5)]),
            row("Fly", "Chest", "2024-01-12", &[(10.0, 12)]),
            bare(&[(0.0, 20)]),
            row("Mystery", "", "2024-01-12", &[(0.0, 1)]),
        ];
        assert_eq!(
            reps_per_muscle_group(&rows),
            vec![
                ("Chest".to_string(), 30),
                ("Quadriceps".to_string(), 5),
                ("Unknown".to_string(), 21),
            ]
        );
    }

    #[test]
    fn test_most_recurring_exercise() {
        let rows = vec![
            row("Squat", "Quadriceps", "2024-01-10", &[(100.0, 5)]),
            row("Curl", "Biceps", "2024-01-10", &[(12.0, 12)]),
            row("Squat", "Quadriceps", "2024-01-11", &[(100.0, 5), (100.0, 5)]),
        ];
        assert_eq!(most_recurring_exercise(&rows).as_deref(), Some("Squat"));
        assert_eq!(most_recurring_exercise(&[]), None);
    }

    #[test]
    fn test_most_recurring_tie_goes_to_first() {
        let rows = vec![
            row("Curl", "Biceps", "2024-01-10", &[(12.0, 10)]),
            row("Squat", "Quadriceps", "2024-01-10", &[(100.0, 10)]),
        ];
        assert_eq!(most_recurring_exercise(&rows).as_deref(), Some("Curl"));
    }

    #[test]
    fn test_volume_progression_sorted_by_date() {
        let rows = vec![
            row("Squat", "Quadriceps", "2024-02-01 09:00:00.000Z", &[(110.0, 5)]),
            row("Curl", "Biceps", "2024-01-15 09:00:00.000Z", &[(12.0, 12)]),
            row("Squat", "Quadriceps", "2024-01-15 09:00:00.000Z", &[(100.0, 5), (100.0, 3)]),
            row("Squat", "Quadriceps", "", &[(90.0, 5)]),
        ];
        let points = volume_progression(&rows, "Squat");
        assert_eq!(
            points,
            vec![
                VolumePoint {
                    date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                    volume: 800.0,
                },
                VolumePoint {
                    date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                    volume: 550.0,
                },
            ]
        );
    }
}
