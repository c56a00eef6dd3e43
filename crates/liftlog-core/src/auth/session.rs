use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Token lifetime in days. Matches the store's default auth token duration.
const TOKEN_EXPIRY_DAYS: i64 = 14;

/// Refresh once the token is this close to expiry
const TOKEN_REFRESH_BUFFER_DAYS: i64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub user_id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::days(TOKEN_EXPIRY_DAYS)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at()
    }

    /// Check if the session will expire soon and should be refreshed
    pub fn needs_refresh(&self) -> bool {
        let refresh_at = self.expires_at() - Duration::days(TOKEN_REFRESH_BUFFER_DAYS);
        Utc::now() > refresh_at
    }
}

pub struct Session {
    dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, data: None }
    }

    /// Load session from disk. Returns true when a usable session was found.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(false);
        }

        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let data: SessionData =
            serde_json::from_str(&contents).context("Failed to parse session file")?;

        if data.is_expired() {
            debug!(user_id = %data.user_id, "Stored session has expired");
            return Ok(false);
        }
        self.data = Some(data);
        Ok(true)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents).context("Failed to write session file")?;
        }
        Ok(())
    }

    /// Clear session data
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Replace the session, e.g. after login or a token refresh
    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    pub fn token(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.token.as_str())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.user_id.as_str())
    }

    pub fn email(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.email.as_str())
    }

    /// Check if session is valid (exists and not expired)
    pub fn is_valid(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_expired())
    }

    pub fn needs_refresh(&self) -> bool {
        self.data.as_ref().is_some_and(|d| d.needs_refresh())
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_data(age: Duration) -> SessionData {
        SessionData {
            token: "tok".to_string(),
            user_id: "u1".to_string(),
            email: "lifter@example.com".to_string(),
            created_at: Utc::now() - age,
        }
    }

    #[test]
    fn test_expiry_and_refresh_windows() {
        let fresh = session_data(Duration::hours(1));
        assert!(!fresh.is_expired());
        assert!(!fresh.needs_refresh());

        let aging = session_data(Duration::days(13) + Duration::hours(1));
        assert!(!aging.is_expired());
        assert!(aging.needs_refresh());

        let old = session_data(Duration::days(15));
        assert!(old.is_expired());
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(dir.path().to_path_buf());
        assert!(!session.load().unwrap());

        let data = session_data(Duration::minutes(5));
        session.update(data.clone());
        session.save().unwrap();

        let mut reloaded = Session::new(dir.path().to_path_buf());
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.data, Some(data));
        assert_eq!(reloaded.user_id(), Some("u1"));
        assert!(reloaded.is_valid());

        reloaded.clear().unwrap();
        assert!(reloaded.token().is_none());
        assert!(!dir.path().join(SESSION_FILE).exists());
    }

    #[test]
    fn test_expired_session_is_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(dir.path().to_path_buf());
        session.update(session_data(Duration::days(30)));
        session.save().unwrap();

        let mut reloaded = Session::new(dir.path().to_path_buf());
        assert!(!reloaded.load().unwrap());
        assert!(!reloaded.is_valid());
    }
}
