use std::fmt;

/// Prefixes shared by every key the app builds.
pub mod prefix {
    pub const WORKOUTS: &str = "workouts";
    pub const EXERCISES: &str = "exercises";
    pub const WORKOUT_EXERCISES: &str = "workout-exercises";
    pub const USER_WORKOUT_EXERCISES: &str = "user-workout-exercises";
    pub const ACTIVE_WORKOUT: &str = "active-workout";
}

/// Identity of a cached query, e.g. `["workout-exercises", "<workout id>"]`.
///
/// The string form is the JSON array of the parts, which is also what the
/// persistent store is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    parts: Vec<String>,
}

impl CacheKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// Workouts of one user, newest first
    pub fn workouts(user_id: &str) -> Self {
        Self::new([prefix::WORKOUTS, user_id])
    }

    /// The exercise catalog
    pub fn exercises() -> Self {
        Self::new([prefix::EXERCISES])
    }

    /// Detail payload of one workout
    pub fn workout_detail(workout_id: &str) -> Self {
        Self::new([prefix::WORKOUT_EXERCISES, workout_id])
    }

    /// Every logged exercise of one user, for charts and history
    pub fn user_workout_exercises(user_id: &str) -> Self {
        Self::new([prefix::USER_WORKOUT_EXERCISES, user_id])
    }

    pub fn active_workout(user_id: &str) -> Self {
        Self::new([prefix::ACTIVE_WORKOUT, user_id])
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// First part of the key, used for prefix invalidation
    pub fn prefix(&self) -> Option<&str> {
        self.parts.first().map(String::as_str)
    }

    /// Parse the string form back into a key
    pub fn parse(s: &str) -> Option<Self> {
        serde_json::from_str::<Vec<String>>(s)
            .ok()
            .map(|parts| Self { parts })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.parts) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_form_is_json_array() {
        let key = CacheKey::workout_detail("abc123");
        assert_eq!(key.to_string(), r#"["workout-exercises","abc123"]"#);
        assert_eq!(CacheKey::exercises().to_string(), r#"["exercises"]"#);
    }

    #[test]
    fn test_parse_roundtrip_with_quotes() {
        let key = CacheKey::new(["workouts", r#"we"ird"#]);
        assert_eq!(CacheKey::parse(&key.to_string()), Some(key));
        assert_eq!(CacheKey::parse("not json"), None);
    }

    #[test]
    fn test_prefix() {
        assert_eq!(CacheKey::workouts("u1").prefix(), Some("workouts"));
        assert_eq!(CacheKey::new(Vec::<String>::new()).prefix(), None);
        assert_ne!(CacheKey::workouts("u1"), CacheKey::active_workout("u1"));
    }
}
