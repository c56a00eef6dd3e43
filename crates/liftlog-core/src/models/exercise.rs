use serde::{Deserialize, Serialize};

/// Muscle groups known to the exercise catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Biceps,
    Triceps,
    Forearms,
    Abs,
    Obliques,
    Glutes,
    Quadriceps,
    Hamstrings,
    Calves,
    Neck,
    Traps,
    LowerBack,
    Adductors,
    Abductors,
}

impl MuscleGroup {
    pub const ALL: [MuscleGroup; 17] = [
        MuscleGroup::Chest,
        MuscleGroup::Back,
        MuscleGroup::Shoulders,
        MuscleGroup::Biceps,
        MuscleGroup::Triceps,
        MuscleGroup::Forearms,
        MuscleGroup::Abs,
        MuscleGroup::Obliques,
        MuscleGroup::Glutes,
        MuscleGroup::Quadriceps,
        MuscleGroup::Hamstrings,
        MuscleGroup::Calves,
        MuscleGroup::Neck,
        MuscleGroup::Traps,
        MuscleGroup::LowerBack,
        MuscleGroup::Adductors,
        MuscleGroup::Abductors,
    ];

    /// Label as stored in the catalog.
    pub fn label(&self) -> &'static str {
        match self {
            MuscleGroup::Chest => "Chest",
            MuscleGroup::Back => "Back",
            MuscleGroup::Shoulders => "Shoulders",
            MuscleGroup::Biceps => "Biceps",
            MuscleGroup::Triceps => "Triceps",
            MuscleGroup::Forearms => "Forearms",
            MuscleGroup::Abs => "Abs",
            MuscleGroup::Obliques => "Obliques",
            MuscleGroup::Glutes => "Glutes",
            MuscleGroup::Quadriceps => "Quadriceps",
            MuscleGroup::Hamstrings => "Hamstrings",
            MuscleGroup::Calves => "Calves",
            MuscleGroup::Neck => "Neck",
            MuscleGroup::Traps => "Traps",
            MuscleGroup::LowerBack => "Lower Back",
            MuscleGroup::Adductors => "Adductors",
            MuscleGroup::Abductors => "Abductors",
        }
    }

    /// Parse a catalog label. Matching is case-insensitive.
    pub fn from_label(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|g| g.label().eq_ignore_ascii_case(trimmed))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Raw catalog value; unknown labels are kept as-is
    #[serde(default)]
    pub muscle_group: String,
}

impl Exercise {
    pub fn group(&self) -> Option<MuscleGroup> {
        MuscleGroup::from_label(&self.muscle_group)
    }

    /// Muscle group label for display and aggregation
    pub fn group_label(&self) -> &str {
        if self.muscle_group.trim().is_empty() {
            "Unknown"
        } else {
            &self.muscle_group
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "Unnamed exercise"
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_muscle_group_round_trip_labels() {
        for group in MuscleGroup::ALL {
            assert_eq!(MuscleGroup::from_label(group.label()), Some(group));
        }
    }

    #[test]
    fn test_muscle_group_case_insensitive() {
        assert_eq!(MuscleGroup::from_label("lower back"), Some(MuscleGroup::LowerBack));
        assert_eq!(MuscleGroup::from_label(" CHEST "), Some(MuscleGroup::Chest));
        assert_eq!(MuscleGroup::from_label("Wings"), None);
    }

    #[test]
    fn test_exercise_keeps_unknown_group() {
        let e: Exercise =
            serde_json::from_str(r#"{"id":"x","name":"Neck curl","muscle_group":"Jaw"}"#).unwrap();
        assert_eq!(e.group(), None);
        assert_eq!(e.group_label(), "Jaw");
    }

    #[test]
    fn test_exercise_empty_group_label() {
        let e: Exercise = serde_json::from_str(r#"{"id":"x","name":"Row"}"#).unwrap();
        assert_eq!(e.group_label(), "Unknown");
        assert_eq!(e.display_name(), "Row");
    }
}
