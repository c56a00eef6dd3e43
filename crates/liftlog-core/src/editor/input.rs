use crate::models::ExerciseSet;

/// Longest text accepted in a set field
const MAX_FIELD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetField {
    Weight,
    Reps,
}

impl SetField {
    pub fn toggle(self) -> Self {
        match self {
            SetField::Weight => SetField::Reps,
            SetField::Reps => SetField::Weight,
        }
    }
}

/// Text being typed into one set's weight and reps fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetDraft {
    pub weight: String,
    pub reps: String,
}

impl SetDraft {
    pub fn from_set(set: &ExerciseSet) -> Self {
        Self {
            weight: weight_text(set.weight),
            reps: set.reps.to_string(),
        }
    }

    /// The set this draft would commit
    pub fn to_set(&self) -> ExerciseSet {
        ExerciseSet::new(parse_weight(&self.weight), parse_reps(&self.reps))
    }

    pub fn field(&self, field: SetField) -> &str {
        match field {
            SetField::Weight => &self.weight,
            SetField::Reps => &self.reps,
        }
    }

    pub fn set_field(&mut self, field: SetField, text: &str) {
        let clean = sanitize(field, text);
        match field {
            SetField::Weight => self.weight = clean,
            SetField::Reps => self.reps = clean,
        }
    }
}

/// Field text for a weight that parses back to exactly the same value.
/// Whole numbers drop the fraction: 10.0 -> "10".
pub fn weight_text(weight: f64) -> String {
    format!("{}", weight)
}

/// Strip everything but digits (and a single decimal point for weight)
pub fn sanitize(field: SetField, text: &str) -> String {
    let mut seen_dot = false;
    text.chars()
        .filter(|c| match *c {
            '0'..='9' => true,
            '.' if field == SetField::Weight && !seen_dot => {
                seen_dot = true;
                true
            }
            _ => false,
        })
        .take(MAX_FIELD_LEN)
        .collect()
}

/// Weight from field text; empty or unparseable text reads as 0
pub fn parse_weight(text: &str) -> f64 {
    text.parse::<f64>()
        .ok()
        .filter(|w| w.is_finite() && *w >= 0.0)
        .unwrap_or(0.0)
}

/// Reps from field text; empty or unparseable text reads as 0
pub fn parse_reps(text: &str) -> u32 {
    text.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_digits_only() {
        assert_eq!(sanitize(SetField::Reps, "1a2-3"), "123");
        assert_eq!(sanitize(SetField::Reps, "12.5"), "125");
        assert_eq!(sanitize(SetField::Weight, "12.5.0kg"), "12.50");
        assert_eq!(sanitize(SetField::Weight, "1234567890"), "123456");
        assert_eq!(sanitize(SetField::Weight, ""), "");
    }

    #[test]
    fn test_parse_empty_is_zero() {
        assert_eq!(parse_weight(""), 0.0);
        assert_eq!(parse_weight("."), 0.0);
        assert_eq!(parse_reps(""), 0);
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_weight("22.5"), 22.5);
        assert_eq!(parse_weight("40."), 40.0);
        assert_eq!(parse_reps("12"), 12);
    }

    #[test]
    fn test_weight_text_is_exact() {
        assert_eq!(weight_text(10.0), "10");
        assert_eq!(weight_text(2.125), "2.125");
        assert_eq!(weight_text(12.345), "12.345");
        for weight in [0.0, 0.5, 2.125, 12.345, 102.75, 1000.0] {
            assert_eq!(parse_weight(&weight_text(weight)), weight);
        }
    }

    #[test]
    fn test_draft_roundtrip() {
        let set = ExerciseSet::new(62.5, 8);
        let draft = SetDraft::from_set(&set);
        assert_eq!(draft.weight, "62.5");
        assert_eq!(draft.reps, "8");
        assert_eq!(draft.to_set(), set);

        let mut draft = SetDraft::default();
        draft.set_field(SetField::Reps, "x9");
        assert_eq!(draft.field(SetField::Reps), "9");
        assert_eq!(draft.to_set(), ExerciseSet::new(0.0, 9));
    }
}
