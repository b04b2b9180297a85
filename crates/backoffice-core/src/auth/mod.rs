//! Credential store for the bearer token.
//!
//! This module provides:
//! - `CredentialSource`: the read-only capability the gateway consults
//! - `FileCredentialStore`: token kept in a plain-text file
//! - `KeyringCredentialStore`: token kept in the OS keychain
//! - `StaticCredential`: a fixed (or absent) token
//!
//! Only the concrete stores can write; the login flow that sets the token
//! lives outside the gateway.

pub mod credentials;
pub mod token_file;

use anyhow::Result;

use crate::config::{Config, CredentialBackend, APP_NAME};

pub use credentials::{Credential, CredentialSource, KeyringCredentialStore, StaticCredential};
pub use token_file::FileCredentialStore;

/// A configured credential store with its write path.
pub enum CredentialStore {
    File(FileCredentialStore),
    Keyring(KeyringCredentialStore),
}

impl CredentialStore {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(match config.credential_backend {
            CredentialBackend::File => {
                Self::File(FileCredentialStore::new(config.data_dir()?, &config.credential_key))
            }
            CredentialBackend::Keyring => {
                Self::Keyring(KeyringCredentialStore::new(APP_NAME, &config.credential_key))
            }
        })
    }

    pub fn store(&self, token: &str) -> Result<()> {
        match self {
            Self::File(store) => store.store(token),
            Self::Keyring(store) => store.store(token),
        }
    }

    pub fn clear(&self) -> Result<()> {
        match self {
            Self::File(store) => store.clear(),
            Self::Keyring(store) => store.clear(),
        }
    }
}

impl CredentialSource for CredentialStore {
    fn credential(&self) -> Option<Credential> {
        match self {
            Self::File(store) => store.credential(),
            Self::Keyring(store) => store.credential(),
        }
    }
}
