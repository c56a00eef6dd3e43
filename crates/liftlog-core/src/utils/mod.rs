//! Utility functions for date parsing and display formatting.

pub mod format;

pub use format::{format_weight, parse_record_date, time_ago, truncate_string};
