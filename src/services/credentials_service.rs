//! Personal-access-token storage
//!
//! The token lives in the OS keychain; the store receives it as a plain
//! string and never touches the keychain itself.

use keyring::Entry;

use crate::error::{InklineError, Result};

const KEYRING_SERVICE: &str = "inkline-github";
const KEYRING_USER: &str = "github-token";

fn entry() -> Result<Entry> {
    Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .map_err(|e| InklineError::Credentials(format!("failed to create keyring entry: {}", e)))
}

/// Store the GitHub personal access token
pub fn store_github_token(token: &str) -> Result<()> {
    entry()?
        .set_password(token)
        .map_err(|e| InklineError::Credentials(format!("failed to store token: {}", e)))
}

/// Get the stored GitHub token (None if not set)
pub fn get_github_token() -> Result<Option<String>> {
    match entry()?.get_password() {
        Ok(token) => Ok(Some(token)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(InklineError::Credentials(format!(
            "failed to get token: {}",
            e
        ))),
    }
}

/// Delete the stored GitHub token
pub fn delete_github_token() -> Result<()> {
    match entry()?.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()), // Already deleted
        Err(e) => Err(InklineError::Credentials(format!(
            "failed to delete token: {}",
            e
        ))),
    }
}
