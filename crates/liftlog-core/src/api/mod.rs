//! REST client for the hosted record store.
//!
//! This module provides the `ApiClient` for the collection-style API
//! (list, view, create, update) that holds workouts, the exercise catalog
//! and the sets logged against each workout exercise.
//!
//! Requests are authenticated with the bearer token obtained from the
//! `users` collection's password auth endpoint.

pub mod client;
pub mod error;
pub mod query;

pub use client::ApiClient;
pub use error::{describe_error, ApiError};
pub use query::{filter_eq, ListPage, ListQuery};
