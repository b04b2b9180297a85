//! Authenticated request gateway for the admin backend.
//!
//! This module provides the `Gateway` that every network call goes through.
//! It resolves targets against the configured base URL, sets the JSON
//! content headers, attaches the bearer token from the credential store and
//! bounds each call with the configured timeout.
//!
//! Errors are returned as-is: the gateway never retries and never reports
//! failures to the user itself.

pub mod client;
pub mod error;
pub mod request;
pub mod transport;

pub use client::Gateway;
pub use error::GatewayError;
pub use request::{OutgoingRequest, PreparedRequest, Response};
pub use transport::{HttpTransport, Transport};
