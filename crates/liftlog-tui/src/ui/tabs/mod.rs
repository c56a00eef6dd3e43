//! Tab-specific content rendering

pub mod home;
pub mod logs;
pub mod new_workout;
pub mod workout;
