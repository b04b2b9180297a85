//! Backoffice core library.
//!
//! The infrastructure shared by every page of the admin front end:
//!
//! - `api`: the authenticated request gateway
//! - `auth`: the bearer credential store
//! - `notify`: the self-expiring notification queue
//! - `config`: base URL, timeouts and credential settings

pub mod api;
pub mod auth;
pub mod config;
pub mod notify;

pub use reqwest::header;
pub use reqwest::{Method, StatusCode};

pub use api::{Gateway, GatewayError, OutgoingRequest, Response};
pub use auth::{CredentialSource, CredentialStore};
pub use config::Config;
pub use notify::{NotificationId, NotificationKind, NotificationQueue, NotificationRecord};
