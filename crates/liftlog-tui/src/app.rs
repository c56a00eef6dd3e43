//! Application state management for liftlog.
//!
//! This module contains the core `App` struct that manages all application state,
//! including UI state, the query cache, session management, and background task
//! coordination. Every backend call runs in a spawned task and reports back
//! through a channel as a [`LoadResult`], drained once per UI tick.

use std::collections::HashSet;
use std::future::Future;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use liftlog_core::api::{describe_error, ApiClient, ApiError};
use liftlog_core::auth::{CredentialStore, Session, SessionData};
use liftlog_core::cache::{CacheKey, FileStore, Invalidate, QueryCache};
use liftlog_core::calendar::{self, MonthView};
use liftlog_core::config::Config;
use liftlog_core::editor::{SaveRequest, SetField};
use liftlog_core::loader::{self, HomeData, WorkoutData};
use liftlog_core::models::{Exercise, NewWorkout, NewWorkoutExercise, Workout, WorkoutExercise};
use liftlog_core::notify::{Notifications, Notifier};
use liftlog_core::workout_view::{ExerciseRow, WorkoutView};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for email input.
const MAX_EMAIL_LENGTH: usize = 100;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length for the picker search box.
const MAX_QUERY_LENGTH: usize = 40;

/// Number of workouts listed on the home tab.
pub const RECENT_WORKOUTS: usize = 5;

// ============================================================================
// UI State Types
// ============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Home,
    Logs,
    Workout,
    New,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Home, Tab::Logs, Tab::Workout, Tab::New];

    /// Get the display title for this tab.
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Home => "Home",
            Tab::Logs => "Logs",
            Tab::Workout => "Workout",
            Tab::New => "New",
        }
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Tab::Home => Tab::Logs,
            Tab::Logs => Tab::Workout,
            Tab::Workout => Tab::New,
            Tab::New => Tab::Home,
        }
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        match self {
            Tab::Home => Tab::New,
            Tab::Logs => Tab::Home,
            Tab::Workout => Tab::Logs,
            Tab::New => Tab::Workout,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Home => 0,
            Tab::Logs => 1,
            Tab::Workout => 2,
            Tab::New => 3,
        }
    }
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    LoggingIn,
    ConfirmingQuit,
    ConfirmingComplete,
    PickingExercise,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
}

/// New workout form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFocus {
    Date,
    Time,
    Notes,
    Submit,
}

impl FormFocus {
    pub fn next(&self) -> Self {
        match self {
            FormFocus::Date => FormFocus::Time,
            FormFocus::Time => FormFocus::Notes,
            FormFocus::Notes => FormFocus::Submit,
            FormFocus::Submit => FormFocus::Date,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            FormFocus::Date => FormFocus::Submit,
            FormFocus::Time => FormFocus::Date,
            FormFocus::Notes => FormFocus::Time,
            FormFocus::Submit => FormFocus::Notes,
        }
    }
}

/// Input for a new workout.
#[derive(Debug, Clone)]
pub struct NewWorkoutForm {
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`, 24 hour clock; empty means midnight
    pub time: String,
    pub notes: String,
    pub focus: FormFocus,
    pub error: Option<String>,
    pub submitting: bool,
}

impl Default for NewWorkoutForm {
    fn default() -> Self {
        let now = Local::now();
        Self {
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M").to_string(),
            notes: String::new(),
            focus: FormFocus::Date,
            error: None,
            submitting: false,
        }
    }
}

impl NewWorkoutForm {
    /// The text field under focus, if any
    pub fn focused_field(&mut self) -> Option<&mut String> {
        match self.focus {
            FormFocus::Date => Some(&mut self.date),
            FormFocus::Time => Some(&mut self.time),
            FormFocus::Notes => Some(&mut self.notes),
            FormFocus::Submit => None,
        }
    }

    pub fn date_time(&self) -> Result<DateTime<Utc>, String> {
        parse_form_date_time(&self.date, &self.time)
    }
}

/// Parse the form's local date and time into a UTC instant
pub fn parse_form_date_time(date: &str, time: &str) -> Result<DateTime<Utc>, String> {
    let date = date.trim();
    if date.is_empty() {
        return Err("A date is required".to_string());
    }
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| "Date must look like 2024-01-15".to_string())?;

    let time = time.trim();
    let time = if time.is_empty() {
        NaiveTime::MIN
    } else {
        NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| "Time must look like 18:30".to_string())?
    };

    Local
        .from_local_datetime(&day.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| "That time does not exist in your timezone".to_string())
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent back from spawned backend tasks.
enum LoadResult {
    /// Home and log screen data
    Home(HomeData),
    /// A workout with its exercises, loaded under a reload ticket
    Workout { data: WorkoutData, ticket: u64 },
    /// The pending workout, if any
    ActiveWorkout(Option<Workout>),
    /// A set list save finished
    SaveFinished {
        workout_id: String,
        row_id: String,
        seq: u64,
        result: Result<(), String>,
    },
    WorkoutCreated(Result<Workout, String>),
    ExerciseAdded {
        workout_id: String,
        result: Result<WorkoutExercise, String>,
    },
    WorkoutCompleted(Result<Workout, String>),
    SessionRefreshed(SessionData),
    /// The session was rejected by the server
    Unauthorized,
    Error(String),
}

impl LoadResult {
    fn from_error(err: &anyhow::Error) -> Self {
        let unauthorized = err
            .chain()
            .filter_map(|cause| cause.downcast_ref::<ApiError>())
            .any(ApiError::is_unauthorized);
        if unauthorized {
            LoadResult::Unauthorized
        } else {
            LoadResult::Error(describe_error(err))
        }
    }
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container
pub struct App {
    // Core services
    pub config: Config,
    pub session: Session,
    pub api: ApiClient,
    pub cache: QueryCache,

    // UI State
    pub state: AppState,
    pub current_tab: Tab,

    // Login form state
    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Home and logs
    pub home: HomeData,
    pub home_selection: usize,
    pub month: MonthView,
    pub selected_day: NaiveDate,
    pub day_selection: usize,

    // Workout tab
    pub active_workout: Option<Workout>,
    /// Workout the workout tab wants to show; results for others are dropped
    viewing_id: Option<String>,
    pub view: Option<WorkoutView>,
    pub exercise_selection: usize,
    pub set_selection: usize,
    pub set_field: SetField,
    pub editing_set: bool,
    /// Row ids whose set tables are folded away
    pub collapsed: HashSet<String>,

    // Exercise picker
    pub picker_query: String,
    pub picker_selection: usize,

    // New workout form
    pub form: NewWorkoutForm,

    // Background task channel
    load_rx: Option<mpsc::Receiver<LoadResult>>,
    load_tx: mpsc::Sender<LoadResult>,
    pending_loads: usize,

    // Feedback
    pub notifications: Notifications,
    pub status_message: Option<String>,
}

impl App {
    /// Create a new application instance
    pub fn new() -> Result<Self> {
        debug!("App::new() starting");
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let cache_dir = config.cache_dir()?;
        debug!(?cache_dir, "Cache directory configured");

        let mut session = Session::new(cache_dir.clone());
        match session.load() {
            Ok(found) => debug!(found, "Session loaded"),
            Err(e) => warn!(error = %e, "Failed to load session"),
        }

        let mut api = ApiClient::new(&config.server_url())?;
        if let Some(token) = session.token() {
            api.set_token(token);
            debug!("Token set on API client");
        }

        let cache = Self::open_cache(&cache_dir);
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let login_email = config.login_email().unwrap_or_default();
        let login_password = Config::env_password().unwrap_or_default();
        let today = Local::now().date_naive();

        Ok(Self {
            config,
            session,
            api,
            cache,

            state: AppState::Normal,
            current_tab: Tab::Home,

            login_email,
            login_password,
            login_focus: LoginFocus::Email,
            login_error: None,

            home: HomeData::default(),
            home_selection: 0,
            month: MonthView::containing(today),
            selected_day: today,
            day_selection: 0,

            active_workout: None,
            viewing_id: None,
            view: None,
            exercise_selection: 0,
            set_selection: 0,
            set_field: SetField::Weight,
            editing_set: false,
            collapsed: HashSet::new(),

            picker_query: String::new(),
            picker_selection: 0,

            form: NewWorkoutForm::default(),

            load_rx: Some(rx),
            load_tx: tx,
            pending_loads: 0,

            notifications: Notifications::new(),
            status_message: None,
        })
    }

    /// Persistent cache in `dir`, falling back to memory only
    fn open_cache(dir: &Path) -> QueryCache {
        match FileStore::new(dir) {
            Ok(store) => QueryCache::new(store),
            Err(e) => {
                warn!(error = %e, ?dir, "Cache directory unusable, caching in memory only");
                QueryCache::in_memory()
            }
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Check if the user is authenticated with a valid session
    pub fn is_authenticated(&self) -> bool {
        self.session.is_valid()
    }

    fn user_id(&self) -> Option<String> {
        self.session.user_id().map(str::to_string)
    }

    /// Interactive login (used for CLI mode)
    pub async fn login_interactive(&mut self) -> Result<()> {
        println!("\n=== liftlog login ===\n");
        println!("Server: {}\n", self.api.base_url());

        let email = match self.config.login_email() {
            Some(last) => {
                print!("Email [{}]: ", last);
                io::stdout().flush()?;

                let mut input = String::new();
                io::stdin().read_line(&mut input)?;
                let input = input.trim();

                if input.is_empty() {
                    last
                } else {
                    input.to_string()
                }
            }
            None => Self::prompt_email()?,
        };

        let password = if CredentialStore::has_credentials(&email) {
            print!("Use stored password? [Y/n]: ");
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if input.trim().to_lowercase() != "n" {
                CredentialStore::get_password(&email)?
            } else {
                Self::prompt_password()?
            }
        } else {
            Self::prompt_password()?
        };

        println!("\nAuthenticating...");
        let session_data = self.api.authenticate(&email, &password).await?;
        CredentialStore::store(&email, &password)?;
        self.finish_login(session_data, email)?;

        println!("Login successful!\n");
        Ok(())
    }

    fn prompt_email() -> Result<String> {
        print!("Email: ");
        io::stdout().flush()?;

        let mut email = String::new();
        io::stdin().read_line(&mut email)?;
        Ok(email.trim().to_string())
    }

    fn prompt_password() -> Result<String> {
        let password = rpassword::prompt_password("Password: ")?;
        Ok(password)
    }

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) -> Result<()> {
        let email = self.login_email.trim().to_string();
        let password = self.login_password.clone();

        if email.is_empty() || password.is_empty() {
            self.login_error = Some("Email and password required".to_string());
            return Err(anyhow::anyhow!("Email and password required"));
        }

        self.login_error = None;

        match self.api.authenticate(&email, &password).await {
            Ok(session_data) => {
                if let Err(e) = CredentialStore::store(&email, &password) {
                    warn!(error = %e, "Failed to store credentials");
                }
                self.finish_login(session_data, email)?;

                self.login_password.clear();
                self.state = AppState::Normal;
                info!("Login successful");
                self.startup();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                let api_error = e.chain().find_map(|c| c.downcast_ref::<ApiError>());
                let user_message = match api_error {
                    Some(ApiError::BadRequest(_)) | Some(ApiError::Unauthorized) => {
                        "Invalid email or password".to_string()
                    }
                    Some(ApiError::NetworkError(_)) => {
                        "Unable to connect to server. Check the server URL.".to_string()
                    }
                    _ => format!("Login failed: {}", describe_error(&e)),
                };
                self.login_error = Some(user_message);
                Err(e)
            }
        }
    }

    /// Remember the user, move session and cache into their directory
    fn finish_login(&mut self, data: SessionData, email: String) -> Result<()> {
        let switched_user = self.config.user_id.as_deref() != Some(data.user_id.as_str());

        self.config.last_email = Some(email);
        self.config.user_id = Some(data.user_id.clone());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        let cache_dir = self.config.cache_dir()?;
        self.session = Session::new(cache_dir.clone());
        self.api.set_token(data.token.clone());
        self.session.update(data);
        if let Err(e) = self.session.save() {
            warn!(error = %e, "Failed to save session");
        }

        if switched_user {
            self.cache = Self::open_cache(&cache_dir);
            self.reset_views();
        }
        Ok(())
    }

    /// Start the login process (show login overlay)
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Forget the session, the stored password and everything cached
    pub fn logout(&mut self) {
        if let Some(email) = self.session.email().map(str::to_string) {
            if let Err(e) = CredentialStore::delete(&email) {
                warn!(error = %e, "Failed to delete stored credentials");
            }
        }
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear session");
        }
        self.cache.invalidate(Invalidate::All);
        self.api.clear_token();
        self.reset_views();
        self.login_password.clear();
        info!("Logged out");
        self.start_login();
    }

    fn reset_views(&mut self) {
        self.home = HomeData::default();
        self.home_selection = 0;
        self.day_selection = 0;
        self.active_workout = None;
        self.close_workout();
    }

    // =========================================================================
    // Background loading
    // =========================================================================

    /// Helper to send load results, logging any channel errors
    async fn send_result(tx: &mpsc::Sender<LoadResult>, result: LoadResult) {
        if let Err(e) = tx.send(result).await {
            error!(error = %e, "Failed to send load result - channel closed");
        }
    }

    /// Run `task` in the background and deliver its result
    fn spawn_load<F>(&mut self, task: F)
    where
        F: Future<Output = LoadResult> + Send + 'static,
    {
        self.pending_loads += 1;
        let tx = self.load_tx.clone();
        tokio::spawn(async move {
            let result = task.await;
            Self::send_result(&tx, result).await;
        });
    }

    pub fn is_loading(&self) -> bool {
        self.pending_loads > 0
    }

    /// Initial loads after authentication
    pub fn startup(&mut self) {
        if self.session.needs_refresh() {
            let api = self.api.clone();
            self.spawn_load(async move {
                match api.refresh_auth().await {
                    Ok(data) => LoadResult::SessionRefreshed(data),
                    Err(e) => LoadResult::from_error(&e),
                }
            });
        }
        self.refresh_home();
        self.load_active_workout();
    }

    /// Load home and log data, from cache where warm
    pub fn refresh_home(&mut self) {
        let Some(user_id) = self.user_id() else {
            return;
        };
        let cache = self.cache.clone();
        let api = self.api.clone();
        self.spawn_load(async move {
            match loader::load_home(&cache, &api, &user_id).await {
                Ok(data) => LoadResult::Home(data),
                Err(e) => LoadResult::from_error(&e),
            }
        });
    }

    fn load_active_workout(&mut self) {
        let Some(user_id) = self.user_id() else {
            return;
        };
        let cache = self.cache.clone();
        let api = self.api.clone();
        self.spawn_load(async move {
            match loader::find_active_workout(&cache, &api, &user_id).await {
                Ok(active) => LoadResult::ActiveWorkout(active),
                Err(e) => LoadResult::from_error(&e),
            }
        });
    }

    /// Switch to the workout tab showing `workout_id`
    pub fn open_workout(&mut self, workout_id: &str) {
        self.show_workout(workout_id);
        self.current_tab = Tab::Workout;
    }

    /// Load `workout_id` into the workout tab without switching to it
    fn show_workout(&mut self, workout_id: &str) {
        if self.viewing_id.as_deref() != Some(workout_id) {
            self.close_workout();
            self.viewing_id = Some(workout_id.to_string());
        }

        let ticket = self.reload_ticket(workout_id);
        let workout_id = workout_id.to_string();
        let cache = self.cache.clone();
        let api = self.api.clone();
        self.spawn_load(async move {
            match loader::load_workout(&cache, &api, &workout_id).await {
                Ok(data) => LoadResult::Workout { data, ticket },
                Err(e) => LoadResult::from_error(&e),
            }
        });
    }

    /// Ticket for a load of `workout_id`; 0 when no view of it exists yet
    fn reload_ticket(&mut self, workout_id: &str) -> u64 {
        self.view
            .as_mut()
            .filter(|v| v.workout.id == workout_id)
            .map_or(0, WorkoutView::begin_reload)
    }

    fn close_workout(&mut self) {
        self.viewing_id = None;
        self.view = None;
        self.exercise_selection = 0;
        self.set_selection = 0;
        self.set_field = SetField::Weight;
        self.editing_set = false;
        self.collapsed.clear();
    }

    /// Drop the workout's cached data and load it again
    fn revalidate_workout(&mut self, workout_id: &str) {
        let Some(user_id) = self.user_id() else {
            return;
        };
        let ticket = self.reload_ticket(workout_id);
        let workout_id = workout_id.to_string();
        let cache = self.cache.clone();
        let api = self.api.clone();
        self.spawn_load(async move {
            match loader::revalidate_workout(&cache, &api, &workout_id, &user_id).await {
                Ok(data) => LoadResult::Workout { data, ticket },
                Err(e) => LoadResult::from_error(&e),
            }
        });
    }

    /// Refresh the data behind the current tab, bypassing the cache
    pub fn refresh_current_tab(&mut self) {
        let Some(user_id) = self.user_id() else {
            return;
        };
        match self.current_tab {
            Tab::Home | Tab::Logs => {
                self.cache.invalidate(Invalidate::Keys(vec![
                    CacheKey::workouts(&user_id),
                    CacheKey::exercises(),
                    CacheKey::user_workout_exercises(&user_id),
                ]));
                self.refresh_home();
            }
            Tab::Workout => match self.viewing_id.clone() {
                Some(id) => self.revalidate_workout(&id),
                None => {
                    self.cache.invalidate(Invalidate::Key(CacheKey::active_workout(&user_id)));
                    self.load_active_workout();
                }
            },
            Tab::New => {
                self.cache.invalidate(Invalidate::Key(CacheKey::active_workout(&user_id)));
                self.load_active_workout();
            }
        }
        self.status_message = Some("Refreshing...".to_string());
    }

    /// Switch tabs, loading what the new tab shows
    pub fn switch_tab(&mut self, tab: Tab) {
        self.current_tab = tab;
        match tab {
            Tab::Home | Tab::Logs => self.refresh_home(),
            Tab::Workout => {
                if self.viewing_id.is_none() {
                    match self.active_workout.as_ref().map(|w| w.id.clone()) {
                        Some(id) => self.open_workout(&id),
                        None => self.load_active_workout(),
                    }
                }
            }
            Tab::New => {
                // Someone with a workout in progress goes straight to it
                if let Some(id) = self.active_workout.as_ref().map(|w| w.id.clone()) {
                    self.open_workout(&id);
                }
            }
        }
    }

    /// Check for completed background tasks and process results
    pub fn check_background_tasks(&mut self) {
        // Collect all pending results first to avoid borrow conflicts
        let results: Vec<LoadResult> = match self.load_rx {
            Some(ref mut rx) => {
                let mut results = Vec::new();
                while let Ok(result) = rx.try_recv() {
                    results.push(result);
                }
                results
            }
            None => Vec::new(),
        };

        for result in results {
            self.pending_loads = self.pending_loads.saturating_sub(1);
            self.process_load_result(result);
        }
    }

    fn process_load_result(&mut self, result: LoadResult) {
        match result {
            LoadResult::Home(data) => {
                self.home = data;
                self.home_selection = self.home_selection.min(self.recent_workouts().len().saturating_sub(1));
                self.day_selection = self.day_selection.min(self.day_workouts().len().saturating_sub(1));
                self.status_message = None;
                debug!(stats = ?self.cache.stats(), "Home data loaded");
            }
            LoadResult::Workout { data, ticket } => self.apply_workout_data(data, ticket),
            LoadResult::ActiveWorkout(active) => {
                let open = active.as_ref().map(|w| w.id.clone());
                self.active_workout = active;
                if self.viewing_id.is_none() {
                    if let Some(id) = open {
                        debug!(workout = %id, "Loading the active workout");
                        self.show_workout(&id);
                    }
                }
            }
            LoadResult::SaveFinished {
                workout_id,
                row_id,
                seq,
                result,
            } => self.finish_save(&workout_id, &row_id, seq, result),
            LoadResult::WorkoutCreated(result) => {
                self.form.submitting = false;
                match result {
                    Ok(workout) => {
                        info!(workout = %workout.id, "Workout created");
                        if let Some(user_id) = self.user_id() {
                            self.cache.invalidate(loader::after_workout_created(&user_id));
                        }
                        self.form = NewWorkoutForm::default();
                        let id = workout.id.clone();
                        self.active_workout = Some(workout);
                        self.open_workout(&id);
                    }
                    Err(message) => {
                        self.notifications.notify("Error", &message);
                        self.form.error = Some(message);
                    }
                }
            }
            LoadResult::ExerciseAdded { workout_id, result } => match result {
                Ok(row) => {
                    debug!(row = %row.id, "Exercise added");
                    self.revalidate_workout(&workout_id);
                }
                Err(message) => self.notifications.notify("Error", &message),
            },
            LoadResult::WorkoutCompleted(result) => match result {
                Ok(workout) => {
                    info!(workout = %workout.id, "Workout completed");
                    if let Some(user_id) = self.user_id() {
                        self.cache
                            .invalidate(loader::after_workout_completed(&workout.id, &user_id));
                    }
                    self.notifications.notify("Workout completed", &workout.heading());
                    self.active_workout = None;
                    self.close_workout();
                    if let Some(day) = workout.local_date_time().map(|dt| dt.date_naive()) {
                        self.select_day(day);
                    }
                    self.switch_tab(Tab::Logs);
                }
                Err(message) => self.notifications.notify("Error", &message),
            },
            LoadResult::SessionRefreshed(data) => {
                debug!("Session refreshed");
                self.api.set_token(data.token.clone());
                self.session.update(data);
                if let Err(e) = self.session.save() {
                    warn!(error = %e, "Failed to save session");
                }
            }
            LoadResult::Unauthorized => {
                warn!("Session rejected by server");
                if let Err(e) = self.session.clear() {
                    warn!(error = %e, "Failed to clear session");
                }
                self.api.clear_token();
                self.start_login();
                self.login_error = Some("Session expired, please log in again".to_string());
            }
            LoadResult::Error(message) => {
                error!(error = %message, "Background load failed");
                self.status_message = Some(message);
            }
        }
    }

    fn apply_workout_data(&mut self, data: WorkoutData, ticket: u64) {
        if self.viewing_id.as_deref() != Some(data.workout.id.as_str()) {
            debug!(workout = %data.workout.id, "Dropping data for a workout no longer shown");
            return;
        }
        let workout_id = data.workout.id.clone();
        // Same workout: merge so unsaved edits survive the reload
        let current = match self.view.as_mut().filter(|v| v.workout.id == workout_id) {
            Some(view) => data.reconcile_into(view, ticket),
            None => {
                self.view = Some(data.into_view());
                true
            }
        };
        // The late load may have cached the older list too
        if !current {
            if let Some(user_id) = self.user_id() {
                self.cache.invalidate(loader::after_sets_changed(&workout_id, &user_id));
            }
        }
        self.clamp_workout_selection();
        self.status_message = None;
    }

    // =========================================================================
    // Set editing
    // =========================================================================

    /// Workout the workout tab is showing or loading
    pub fn viewing_id(&self) -> Option<&str> {
        self.viewing_id.as_deref()
    }

    pub fn selected_row(&self) -> Option<&ExerciseRow> {
        self.view.as_ref()?.row_at(self.exercise_selection)
    }

    fn clamp_workout_selection(&mut self) {
        let rows = self.view.as_ref().map_or(0, WorkoutView::len);
        self.exercise_selection = self.exercise_selection.min(rows.saturating_sub(1));
        let sets = self.selected_row().map_or(0, |r| r.editor.len());
        self.set_selection = self.set_selection.min(sets.saturating_sub(1));
        if sets == 0 {
            self.editing_set = false;
        }
    }

    /// Send a save and route its result back
    fn dispatch_save(&mut self, request: SaveRequest) {
        let Some(workout_id) = self.view.as_ref().map(|v| v.workout.id.clone()) else {
            return;
        };
        debug!(row = %request.row_id, seq = request.seq, sets = request.sets.len(), "Saving sets");
        let api = self.api.clone();
        self.spawn_load(async move {
            let result = api
                .update_sets(&request.row_id, &request.payload())
                .await
                .map(|_| ())
                .map_err(|e| describe_error(&e));
            LoadResult::SaveFinished {
                workout_id,
                row_id: request.row_id,
                seq: request.seq,
                result,
            }
        });
    }

    fn finish_save(&mut self, workout_id: &str, row_id: &str, seq: u64, result: Result<(), String>) {
        let next = match self.view.as_mut() {
            Some(view) if view.workout.id == workout_id => {
                view.handle_save_result(row_id, seq, result, &mut self.notifications)
            }
            _ => {
                if let Err(message) = result {
                    self.notifications.notify("Error", &message);
                }
                None
            }
        };
        if let Some(request) = next {
            self.dispatch_save(request);
        }
        // Success or failure, the server copy is authoritative
        self.revalidate_workout(workout_id);
    }

    /// Apply an edit to the selected row's editor and send what it asks for
    fn edit_selected_row<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut liftlog_core::SetEditor, usize) -> Option<SaveRequest>,
    {
        let (row, index) = (self.exercise_selection, self.set_selection);
        let request = self
            .view
            .as_mut()
            .and_then(|v| v.editor_at(row))
            .and_then(|editor| edit(editor, index));
        if let Some(request) = request {
            self.dispatch_save(request);
        }
        self.clamp_workout_selection();
    }

    pub fn add_set(&mut self) {
        self.edit_selected_row(|editor, _| editor.add_set());
        if let Some(row) = self.selected_row() {
            let id = row.id().to_string();
            self.set_selection = row.editor.len().saturating_sub(1);
            self.collapsed.remove(&id);
        }
    }

    /// Insert a copy of the selected set right after it
    pub fn duplicate_set(&mut self) {
        self.editing_set = false;
        let before = self.selected_row().map_or(0, |r| r.editor.len());
        self.edit_selected_row(|editor, index| {
            let mut sets = editor.sets().to_vec();
            let set = *sets.get(index)?;
            sets.insert(index + 1, set);
            editor.save_changes(sets)
        });
        // Follow the copy
        if self.selected_row().map_or(0, |r| r.editor.len()) > before {
            self.set_selection += 1;
        }
    }

    pub fn remove_set(&mut self) {
        self.editing_set = false;
        self.edit_selected_row(|editor, index| editor.remove_set(index));
    }

    pub fn begin_edit(&mut self) {
        if self.selected_row().is_some_and(|r| !r.editor.is_empty()) {
            self.editing_set = true;
            self.set_field = SetField::Weight;
        }
    }

    /// Type into the selected field; the editor filters what is allowed
    pub fn type_char(&mut self, c: char) {
        let field = self.set_field;
        self.edit_selected_row(|editor, index| {
            let mut text = editor.draft(index)?.field(field).to_string();
            text.push(c);
            editor.edit_set(index, field, &text);
            None
        });
    }

    pub fn backspace(&mut self) {
        let field = self.set_field;
        self.edit_selected_row(|editor, index| {
            let mut text = editor.draft(index)?.field(field).to_string();
            text.pop();
            editor.edit_set(index, field, &text);
            None
        });
    }

    pub fn toggle_field(&mut self) {
        self.set_field = self.set_field.toggle();
    }

    pub fn commit_edit(&mut self) {
        self.editing_set = false;
        self.edit_selected_row(|editor, index| editor.commit(index));
    }

    pub fn cancel_edit(&mut self) {
        self.editing_set = false;
        self.edit_selected_row(|editor, index| {
            editor.reset_draft(index);
            None
        });
    }

    /// Send the selected row again after a failed save
    pub fn retry_save(&mut self) {
        self.edit_selected_row(|editor, _| editor.retry());
    }

    pub fn toggle_collapsed(&mut self) {
        if let Some(id) = self.selected_row().map(|r| r.id().to_string()) {
            if !self.collapsed.remove(&id) {
                self.collapsed.insert(id);
            }
        }
    }

    pub fn is_collapsed(&self, row_id: &str) -> bool {
        self.collapsed.contains(row_id)
    }

    pub fn select_exercise(&mut self, index: usize) {
        self.editing_set = false;
        self.exercise_selection = index;
        self.set_selection = 0;
        self.clamp_workout_selection();
    }

    /// Move the set cursor, spilling over into neighbouring exercises
    pub fn move_set_selection(&mut self, down: bool) {
        let rows = self.view.as_ref().map_or(0, WorkoutView::len);
        let len = self.selected_row().map_or(0, |r| r.editor.len());
        let collapsed = self.selected_row().is_some_and(|r| self.is_collapsed(r.id()));

        if down {
            if !collapsed && self.set_selection + 1 < len {
                self.set_selection += 1;
            } else if self.exercise_selection + 1 < rows {
                self.select_exercise(self.exercise_selection + 1);
            }
        } else if !collapsed && self.set_selection > 0 {
            self.set_selection -= 1;
        } else if self.exercise_selection > 0 {
            self.select_exercise(self.exercise_selection - 1);
            self.set_selection = self.selected_row().map_or(0, |r| r.editor.len().saturating_sub(1));
        }
    }

    // =========================================================================
    // Exercise picker
    // =========================================================================

    pub fn open_picker(&mut self) {
        if self.view.is_some() {
            self.picker_query.clear();
            self.picker_selection = 0;
            self.state = AppState::PickingExercise;
        }
    }

    pub fn picker_results(&self) -> Vec<&Exercise> {
        self.view
            .as_ref()
            .map(|v| v.search_catalog(&self.picker_query))
            .unwrap_or_default()
    }

    pub fn picker_push(&mut self, c: char) {
        if self.picker_query.chars().count() < MAX_QUERY_LENGTH && !c.is_control() {
            self.picker_query.push(c);
            self.picker_selection = 0;
        }
    }

    pub fn picker_pop(&mut self) {
        self.picker_query.pop();
        self.picker_selection = 0;
    }

    /// Add the highlighted catalog entry to the open workout
    pub fn add_selected_exercise(&mut self) {
        let Some(exercise_id) = self
            .picker_results()
            .get(self.picker_selection)
            .map(|e| e.id.clone())
        else {
            return;
        };
        let (Some(user_id), Some(workout_id)) =
            (self.user_id(), self.view.as_ref().map(|v| v.workout.id.clone()))
        else {
            return;
        };
        self.state = AppState::Normal;

        let payload = NewWorkoutExercise::new(user_id, workout_id.clone(), exercise_id);
        let api = self.api.clone();
        self.spawn_load(async move {
            let result = api
                .add_workout_exercise(&payload)
                .await
                .map_err(|e| describe_error(&e));
            LoadResult::ExerciseAdded { workout_id, result }
        });
    }

    // =========================================================================
    // Workout lifecycle
    // =========================================================================

    /// Create the workout described by the form
    pub fn submit_new_workout(&mut self) {
        if self.form.submitting {
            return;
        }
        if let Some(id) = self.active_workout.as_ref().map(|w| w.id.clone()) {
            self.open_workout(&id);
            return;
        }
        let Some(user_id) = self.user_id() else {
            return;
        };
        let date = match self.form.date_time() {
            Ok(date) => date,
            Err(message) => {
                self.form.error = Some(message);
                return;
            }
        };

        let payload = NewWorkout::new(user_id, date, &self.form.notes);
        self.form.error = None;
        self.form.submitting = true;
        let api = self.api.clone();
        self.spawn_load(async move {
            LoadResult::WorkoutCreated(api.create_workout(&payload).await.map_err(|e| describe_error(&e)))
        });
    }

    /// Mark the open workout completed
    pub fn complete_workout(&mut self) {
        self.state = AppState::Normal;
        let Some(workout_id) = self.view.as_ref().map(|v| v.workout.id.clone()) else {
            return;
        };
        let api = self.api.clone();
        self.spawn_load(async move {
            LoadResult::WorkoutCompleted(
                api.complete_workout(&workout_id)
                    .await
                    .map_err(|e| describe_error(&e)),
            )
        });
    }

    pub fn can_complete(&self) -> bool {
        self.view.as_ref().is_some_and(|v| v.workout.is_pending())
    }

    // =========================================================================
    // Home and logs
    // =========================================================================

    pub fn recent_workouts(&self) -> &[Workout] {
        let len = self.home.workouts.len().min(RECENT_WORKOUTS);
        &self.home.workouts[..len]
    }

    pub fn day_workouts(&self) -> Vec<&Workout> {
        calendar::workouts_on(&self.home.workouts, self.selected_day)
    }

    pub fn select_day(&mut self, day: NaiveDate) {
        self.selected_day = day;
        if !self.month.contains(day) {
            self.month = MonthView::containing(day);
        }
        self.day_selection = 0;
    }

    pub fn shift_day(&mut self, days: i64) {
        if let Some(day) = self.selected_day.checked_add_signed(chrono::Duration::days(days)) {
            self.select_day(day);
        }
    }

    pub fn shift_month(&mut self, forward: bool) {
        self.month = if forward { self.month.next() } else { self.month.prev() };
        self.selected_day = self.month.first_day();
        self.day_selection = 0;
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Age of the data behind the current tab
    pub fn cache_age(&self) -> Option<String> {
        let key = match self.current_tab {
            Tab::Workout => CacheKey::workout_detail(self.viewing_id.as_deref()?),
            _ => CacheKey::workouts(self.session.user_id()?),
        };
        self.cache.age_display(&key)
    }

    /// Whether the open workout has edits the server has not confirmed
    pub fn has_unsaved_changes(&self) -> bool {
        self.view.as_ref().is_some_and(WorkoutView::any_out_of_sync)
    }

    pub fn saving_count(&self) -> usize {
        self.view.as_ref().map_or(0, WorkoutView::saving_count)
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if an email character should be accepted
pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

/// Check if a character may be typed into a form field with the given focus
pub fn can_add_form_char(focus: FormFocus, current_len: usize, c: char) -> bool {
    match focus {
        FormFocus::Date => current_len < 10 && (c.is_ascii_digit() || c == '-'),
        FormFocus::Time => current_len < 5 && (c.is_ascii_digit() || c == ':'),
        FormFocus::Notes => {
            current_len < liftlog_core::models::mutation::MAX_NOTES_LENGTH && is_valid_input_char(c)
        }
        FormFocus::Submit => false,
    }
}

// ============================================================================
// Tests
// ============================================================================
