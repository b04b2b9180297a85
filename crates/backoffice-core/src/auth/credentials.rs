use std::fmt;

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

/// Bearer token identifying the current user session.
///
/// `Debug` and `Display` never print the token; use [`Credential::expose`]
/// where the raw value is actually needed (building the header).
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token. Blank tokens are treated as no credential at all.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == token.len() {
            Some(Self(token))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Read-only access to the current bearer credential.
///
/// Implementations must not fail: a backend that can't be read (no
/// keychain, no data directory, unreadable file) reports `None`, which the
/// gateway treats as an unauthenticated session.
pub trait CredentialSource: Send + Sync {
    fn credential(&self) -> Option<Credential>;
}

/// A fixed credential, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticCredential(Option<Credential>);

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Credential::new(token))
    }

    pub fn absent() -> Self {
        Self(None)
    }
}

impl CredentialSource for StaticCredential {
    fn credential(&self) -> Option<Credential> {
        self.0.clone()
    }
}

/// Credential stored as a single entry in the OS keychain.
pub struct KeyringCredentialStore {
    pub(super) service: String,
    pub(super) key: String,
}

impl KeyringCredentialStore {
    pub fn new(service: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            key: key.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, &self.key).context("Failed to create keyring entry")
    }

    /// Store the token in the OS keychain
    pub fn store(&self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .context("Failed to store token in keychain")
    }

    /// Delete the stored token. Deleting a missing entry is not an error.
    pub fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

impl CredentialSource for KeyringCredentialStore {
    fn credential(&self) -> Option<Credential> {
        let entry = match self.entry() {
            Ok(entry) => entry,
            Err(e) => {
                debug!(service = %self.service, error = %e, "Keychain unavailable");
                return None;
            }
        };
        match entry.get_password() {
            Ok(token) => Credential::new(token),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                debug!(service = %self.service, error = %e, "Failed to read token from keychain");
                None
            }
        }
    }
}
