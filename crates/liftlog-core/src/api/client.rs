//! API client for the hosted record store.
//!
//! This module provides the `ApiClient` struct for authenticating and for
//! reading and writing workout, exercise and set records.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::{header, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::SessionData;
use crate::models::{
    collections, CompleteWorkout, Exercise, Mutation, NewWorkout, NewWorkoutExercise, UpdateSets,
    Workout, WorkoutExercise,
};

use super::query::{filter_eq, ListPage, ListQuery};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Page size used when walking a full list.
const FULL_LIST_BATCH: u32 = 500;

/// Upper bound on pages walked for one full list.
const MAX_LIST_PAGES: u32 = 200;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    record: AuthRecord,
}

#[derive(Debug, Deserialize)]
struct AuthRecord {
    id: String,
    #[serde(default)]
    email: String,
}

#[derive(Debug, Serialize)]
struct PasswordAuth<'a> {
    identity: &'a str,
    password: &'a str,
}

/// API client for the record store.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    token: Option<Arc<str>>,
}

impl ApiClient {
    /// Create a new API client for the server at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: impl Into<Arc<str>>) {
        self.token = Some(token.into());
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: impl Into<Arc<str>>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: Arc::clone(&self.base_url),
            token: Some(token.into()),
        }
    }

    fn records_url(&self, collection: &str) -> String {
        format!("{}/api/collections/{}/records", self.base_url, collection)
    }

    fn record_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.records_url(collection), id)
    }

    // ===== Authentication =====

    /// Authenticate with email/username and password
    pub async fn authenticate(&self, identity: &str, password: &str) -> Result<SessionData> {
        let url = format!(
            "{}/api/collections/{}/auth-with-password",
            self.base_url,
            collections::USERS
        );

        let response = self
            .client
            .post(&url)
            .json(&PasswordAuth { identity, password })
            .send()
            .await
            .context("Failed to send authentication request")?;

        let response = Self::check_response(response).await?;
        let auth: AuthResponse = response.json().await.context("Failed to parse auth response")?;

        Ok(Self::session_from(auth, identity))
    }

    /// Exchange the current token for a fresh one
    pub async fn refresh_auth(&self) -> Result<SessionData> {
        let url = format!(
            "{}/api/collections/{}/auth-refresh",
            self.base_url,
            collections::USERS
        );
        let auth: AuthResponse = self
            .send_with_retry(&url, || self.client.post(&url))
            .await
            .context("Failed to refresh session")?;
        Ok(Self::session_from(auth, ""))
    }

    fn session_from(auth: AuthResponse, identity: &str) -> SessionData {
        let email = if auth.record.email.is_empty() {
            identity.to_string()
        } else {
            auth.record.email
        };
        SessionData {
            token: auth.token,
            user_id: auth.record.id,
            email,
            created_at: Utc::now(),
        }
    }

    // ===== Request plumbing =====

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should
    /// retry), or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Send a request built by `build`, retrying with exponential backoff
    /// while the server rate-limits us.
    async fn send_with_retry<T, F>(&self, url: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build()
                .headers(self.auth_headers()?)
                .send()
                .await
                .map_err(ApiError::from)
                .with_context(|| format!("Failed to send request to {}", url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    return response
                        .json()
                        .await
                        .with_context(|| format!("Failed to parse JSON response from {}", url));
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    // ===== Collection operations =====

    /// Fetch a single record by id
    pub async fn get_one<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        expand: Option<&str>,
    ) -> Result<T> {
        let url = self.record_url(collection, id);
        self.send_with_retry(&url, || {
            let request = self.client.get(&url);
            match expand {
                Some(expand) => request.query(&[("expand", expand)]),
                None => request,
            }
        })
        .await
    }

    /// Fetch one page of a list
    pub async fn get_list<T: DeserializeOwned>(
        &self,
        collection: &str,
        page: u32,
        per_page: u32,
        query: &ListQuery,
    ) -> Result<ListPage<T>> {
        let url = self.records_url(collection);
        let params = query.to_params(page, per_page);
        self.send_with_retry(&url, || self.client.get(&url).query(&params))
            .await
    }

    /// Fetch every record matching `query`, walking pages in batches
    pub async fn get_full_list<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let result: ListPage<T> = self.get_list(collection, page, FULL_LIST_BATCH, query).await?;
            let more = result.has_more(FULL_LIST_BATCH);
            let received = result.items.len();
            items.extend(result.items);

            if !more || received == 0 {
                break;
            }
            if page >= MAX_LIST_PAGES {
                warn!(collection, pages = page, "Stopped walking list at page limit");
                break;
            }
            page += 1;
        }

        debug!(collection, count = items.len(), "Fetched full list");
        Ok(items)
    }

    /// First record matching `filter`, or None when nothing matches
    pub async fn get_first_list_item<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &str,
    ) -> Result<Option<T>> {
        let query = ListQuery::new().filter(filter);
        let page: ListPage<T> = self.get_list(collection, 1, 1, &query).await?;
        Ok(page.items.into_iter().next())
    }

    /// Create a record from a validated payload
    pub async fn create<T: DeserializeOwned, M: Mutation>(
        &self,
        collection: &str,
        payload: &M,
    ) -> Result<T> {
        payload.validate().map_err(ApiError::from)?;
        let url = self.records_url(collection);
        self.send_with_retry(&url, || self.client.post(&url).json(payload))
            .await
    }

    /// Update a record from a validated payload
    pub async fn update<T: DeserializeOwned, M: Mutation>(
        &self,
        collection: &str,
        id: &str,
        payload: &M,
    ) -> Result<T> {
        payload.validate().map_err(ApiError::from)?;
        let url = self.record_url(collection, id);
        self.send_with_retry(&url, || self.client.patch(&url).json(payload))
            .await
    }

    // ===== Data Fetching Methods =====

    /// All workouts for a user, newest first
    pub async fn fetch_workouts(&self, user_id: &str) -> Result<Vec<Workout>> {
        let query = ListQuery::new()
            .filter(filter_eq("user_id", user_id))
            .sort("-date");
        self.get_full_list(collections::WORKOUTS, &query).await
    }

    /// The full exercise catalog
    pub async fn fetch_exercises(&self) -> Result<Vec<Exercise>> {
        self.get_full_list(collections::EXERCISES, &ListQuery::new().sort("name"))
            .await
    }

    pub async fn fetch_workout(&self, workout_id: &str) -> Result<Workout> {
        self.get_one(collections::WORKOUTS, workout_id, None).await
    }

    /// Exercises logged in one workout, oldest first, with the catalog
    /// entry expanded
    pub async fn fetch_workout_exercises(&self, workout_id: &str) -> Result<Vec<WorkoutExercise>> {
        let query = ListQuery::new()
            .filter(filter_eq("workout_id", workout_id))
            .sort("+created")
            .expand("exercise_id");
        self.get_full_list(collections::WORKOUT_EXERCISES, &query)
            .await
    }

    /// Every exercise a user has logged, with catalog entry and workout
    /// expanded
    pub async fn fetch_user_workout_exercises(&self, user_id: &str) -> Result<Vec<WorkoutExercise>> {
        let query = ListQuery::new()
            .filter(filter_eq("user_id", user_id))
            .sort("+created")
            .expand("exercise_id,workout_id");
        self.get_full_list(collections::WORKOUT_EXERCISES, &query)
            .await
    }

    /// The user's pending workout, if one is in progress
    pub async fn fetch_active_workout(&self, user_id: &str) -> Result<Option<Workout>> {
        let filter = format!("{} && status=\"pending\"", filter_eq("user_id", user_id));
        self.get_first_list_item(collections::WORKOUTS, &filter).await
    }

    // ===== Mutations =====

    pub async fn create_workout(&self, payload: &NewWorkout) -> Result<Workout> {
        self.create(collections::WORKOUTS, payload)
            .await
            .context("Failed to create workout")
    }

    pub async fn add_workout_exercise(&self, payload: &NewWorkoutExercise) -> Result<WorkoutExercise> {
        self.create(collections::WORKOUT_EXERCISES, payload)
            .await
            .context("Failed to add exercise")
    }

    /// Replace the set list of a workout exercise
    pub async fn update_sets(&self, row_id: &str, payload: &UpdateSets) -> Result<WorkoutExercise> {
        self.update(collections::WORKOUT_EXERCISES, row_id, payload)
            .await
            .context("Failed to save sets")
    }

    pub async fn complete_workout(&self, workout_id: &str) -> Result<Workout> {
        self.update(collections::WORKOUTS, workout_id, &CompleteWorkout::default())
            .await
            .context("Failed to complete workout")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::describe_error;
    use crate::models::ExerciseSet;

    #[test]
    fn test_urls() {
        let api = ApiClient::new("http://127.0.0.1:8090/").unwrap();
        assert_eq!(api.base_url(), "http://127.0.0.1:8090");
        assert_eq!(
            api.records_url("workouts"),
            "http://127.0.0.1:8090/api/collections/workouts/records"
        );
        assert_eq!(
            api.record_url("workout_exercises", "abc"),
            "http://127.0.0.1:8090/api/collections/workout_exercises/records/abc"
        );
    }

    #[test]
    fn test_with_token_shares_base() {
        let api = ApiClient::new("http://localhost:8090").unwrap();
        assert!(!api.has_token());
        let authed = api.with_token("t0k3n");
        assert!(authed.has_token());
        assert_eq!(authed.base_url(), api.base_url());

        let headers = authed.auth_headers().unwrap();
        assert_eq!(headers[header::AUTHORIZATION], "Bearer t0k3n");
        assert!(api.auth_headers().unwrap().is_empty());
    }

    #[test]
    fn test_parse_auth_response() {
        let json = r#"{"token":"abc","record":{"id":"u1","email":"lifter@example.com","verified":true}}"#;
        let auth: AuthResponse = serde_json::from_str(json).unwrap();
        let session = ApiClient::session_from(auth, "lifter");
        assert_eq!(session.user_id, "u1");
        assert_eq!(session.email, "lifter@example.com");
        assert_eq!(session.token, "abc");

        let hidden = r#"{"token":"abc","record":{"id":"u1","email":""}}"#;
        let auth: AuthResponse = serde_json::from_str(hidden).unwrap();
        assert_eq!(ApiClient::session_from(auth, "lifter").email, "lifter");
    }

    #[tokio::test]
    async fn test_invalid_payload_is_rejected_before_sending() {
        // Port 9 (discard) is never contacted: validation fails first
        let api = ApiClient::new("http://127.0.0.1:9").unwrap();
        let payload = UpdateSets::new(vec![ExerciseSet::new(f64::INFINITY, 1)]);
        let err = api.update_sets("row", &payload).await.unwrap_err();
        assert_eq!(describe_error(&err), "Set 1 has an invalid weight");
    }
}
