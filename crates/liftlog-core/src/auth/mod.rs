//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `Session`: Token-based session persisted in the cache directory
//! - `CredentialStore`: Secure OS-level credential storage via keyring
//!
//! Tokens are treated as expired after 14 days and refreshed when they get
//! within a day of expiry.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData};
