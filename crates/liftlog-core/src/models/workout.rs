use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::format::parse_record_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutStatus {
    Pending,
    Completed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for WorkoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkoutStatus::Pending => write!(f, "In progress"),
            WorkoutStatus::Completed => write!(f, "Completed"),
            WorkoutStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Workout {
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: WorkoutStatus,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
}

impl Workout {
    /// Workout date as UTC, if the record carries a parseable one
    pub fn date_time(&self) -> Option<DateTime<Utc>> {
        parse_record_date(&self.date)
    }

    pub fn local_date_time(&self) -> Option<DateTime<Local>> {
        self.date_time().map(|d| d.with_timezone(&Local))
    }

    pub fn is_pending(&self) -> bool {
        self.status == WorkoutStatus::Pending
    }

    /// Long heading form, e.g. "Monday - Jan 15, 2024"
    pub fn heading(&self) -> String {
        match self.local_date_time() {
            Some(dt) => dt.format("%A - %b %d, %Y").to_string(),
            None => "Undated workout".to_string(),
        }
    }

    /// Short list form, e.g. "Mon 15th"
    pub fn short_label(&self) -> String {
        match self.local_date_time() {
            Some(dt) => {
                use chrono::Datelike;
                let day = dt.day();
                format!("{} {}{}", dt.format("%a"), day, ordinal_suffix(day))
            }
            None => "-".to_string(),
        }
    }

    /// Time of day, e.g. "6:30 PM"
    pub fn time_label(&self) -> String {
        match self.local_date_time() {
            Some(dt) => dt.format("%-I:%M %p").to_string(),
            None => "-".to_string(),
        }
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}
