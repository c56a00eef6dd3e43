//! Core library for liftlog: backend client, data model, query cache and
//! the optimistic set editor shared by the front ends.

pub mod api;
pub mod auth;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod editor;
pub mod loader;
pub mod models;
pub mod notify;
pub mod stats;
pub mod utils;
pub mod workout_view;

pub use api::{describe_error, ApiClient, ApiError};
pub use auth::{CredentialStore, Session, SessionData};
pub use cache::{CacheKey, Invalidate, QueryCache};
pub use config::Config;
pub use editor::{SaveOutcome, SaveRequest, SetEditor, SyncState};
pub use notify::{Notifications, Notifier};
pub use workout_view::WorkoutView;
