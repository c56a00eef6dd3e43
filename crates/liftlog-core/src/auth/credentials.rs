use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "liftlog";

/// Passwords kept in the OS keychain, keyed by login email.
pub struct CredentialStore;

impl CredentialStore {
    /// Store a password for `email` in the OS keychain
    pub fn store(email: &str, password: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, email).context("Failed to create keyring entry")?;
        entry
            .set_password(password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    /// Retrieve the password for `email` from the OS keychain
    pub fn get_password(email: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, email).context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    /// Delete stored credentials, e.g. on logout
    pub fn delete(email: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, email).context("Failed to create keyring entry")?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }

    /// Check if credentials exist for `email`
    pub fn has_credentials(email: &str) -> bool {
        Entry::new(SERVICE_NAME, email)
            .map(|entry| entry.get_password().is_ok())
            .unwrap_or(false)
    }
}
