//! Month grid for the workout log.

use chrono::{Datelike, Duration, Local, Months, NaiveDate};

use crate::models::Workout;

/// One cell of the month grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// False for the leading/trailing days borrowed from adjacent months
    pub in_month: bool,
}

/// A calendar month, laid out in Monday-started weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthView {
    first: NaiveDate,
}

impl MonthView {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| Self { first })
    }

    /// The month containing `date`
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first: date - Duration::days(i64::from(date.day0())),
        }
    }

    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next().first - Duration::days(1)
    }

    /// Heading such as "January 2024"
    pub fn title(&self) -> String {
        self.first.format("%B %Y").to_string()
    }

    pub fn prev(&self) -> Self {
        Self {
            first: self.first.checked_sub_months(Months::new(1)).unwrap_or(self.first),
        }
    }

    pub fn next(&self) -> Self {
        Self {
            first: self.first.checked_add_months(Months::new(1)).unwrap_or(self.first),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }

    /// Full weeks covering the month, Monday first
    pub fn weeks(&self) -> Vec<[CalendarDay; 7]> {
        let lead = i64::from(self.first.weekday().num_days_from_monday());
        let mut day = self.first - Duration::days(lead);
        let last = self.last_day();

        let mut weeks = Vec::with_capacity(6);
        while day <= last {
            let week: [CalendarDay; 7] = std::array::from_fn(|i| {
                let date = day + Duration::days(i as i64);
                CalendarDay {
                    date,
                    in_month: self.contains(date),
                }
            });
            weeks.push(week);
            day += Duration::days(7);
        }
        weeks
    }

    /// Every cell of [`weeks`](Self::weeks), row by row
    pub fn days(&self) -> Vec<CalendarDay> {
        self.weeks().into_iter().flatten().collect()
    }
}

/// Local calendar date of a workout
fn workout_day(workout: &Workout) -> Option<NaiveDate> {
    workout.local_date_time().map(|dt| dt.date_naive())
}

/// Workouts that took place on `day` (local time), in input order
pub fn workouts_on(workouts: &[Workout], day: NaiveDate) -> Vec<&Workout> {
    workouts
        .iter()
        .filter(|w| workout_day(w) == Some(day))
        .collect()
}

pub fn has_workout(workouts: &[Workout], day: NaiveDate) -> bool {
    workouts.iter().any(|w| workout_day(w) == Some(day))
}
