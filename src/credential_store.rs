//! OS keyring storage for the Discogs personal access token.

use keyring::Entry;

use crate::error::CredentialError;

const DISCOGS_SERVICE_NAME: &str = "song-credits.discogs";
pub const DEFAULT_ACCOUNT: &str = "default";

fn keyring_error(operation: &'static str, account: &str, err: keyring::Error) -> CredentialError {
    CredentialError::Keyring {
        operation,
        account: account.to_string(),
        detail: err.to_string(),
    }
}

fn discogs_entry(account: &str) -> Result<Entry, CredentialError> {
    Entry::new(DISCOGS_SERVICE_NAME, account)
        .map_err(|err| keyring_error("create entry", account, err))
}

/// Saves the Discogs token for `account`.
pub fn set_discogs_token(account: &str, token: &str) -> Result<(), CredentialError> {
    discogs_entry(account)?
        .set_password(token.trim())
        .map_err(|err| keyring_error("set token", account, err))
}

/// Loads the Discogs token for `account`, if one was saved.
pub fn get_discogs_token(account: &str) -> Result<Option<String>, CredentialError> {
    match discogs_entry(account)?.get_password() {
        Ok(token) => Ok(Some(token).filter(|token| !token.trim().is_empty())),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(keyring_error("get token", account, err)),
    }
}

pub fn delete_discogs_token(account: &str) -> Result<(), CredentialError> {
    match discogs_entry(account)?.delete_password() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(err) => Err(keyring_error("delete token", account, err)),
    }
}
