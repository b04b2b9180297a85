//! Gateway for authenticated requests to the admin backend.
//!
//! This module provides the `Gateway` struct. Every request goes through
//! [`Gateway::dispatch`], which sets the JSON content headers and the bearer
//! token before handing the request to the transport.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::Serialize;
use tracing::debug;

use crate::auth::CredentialSource;
use crate::config::Config;

use super::{GatewayError, HttpTransport, OutgoingRequest, PreparedRequest, Response, Transport};

// ============================================================================
// Constants
// ============================================================================

const JSON_CONTENT_TYPE: &str = "application/json";

/// Gateway to the admin backend.
///
/// Build one per process and clone it into every call site; clones share
/// the transport (and its connection pool) and the credential source.
#[derive(Clone)]
pub struct Gateway<T = HttpTransport> {
    transport: T,
    credentials: Arc<dyn CredentialSource>,
    base_url: String,
    timeout: Duration,
}

impl Gateway<HttpTransport> {
    /// Create a gateway backed by a `reqwest` client
    pub fn new(
        config: &Config,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self, GatewayError> {
        let transport = HttpTransport::new(config.timeout())?;
        Ok(Self::with_transport(config, credentials, transport))
    }
}

impl<T: Transport> Gateway<T> {
    pub fn with_transport(
        config: &Config,
        credentials: Arc<dyn CredentialSource>,
        transport: T,
    ) -> Self {
        Self {
            transport,
            credentials,
            base_url: config.base_url.clone(),
            timeout: config.timeout(),
        }
    }

    /// Set the content headers and the bearer token on the request.
    ///
    /// `Accept` and `Content-Type` always end up as `application/json`,
    /// whatever the caller supplied. Without a credential the request carries
    /// no `Authorization` header at all.
    pub fn apply_headers(&self, request: &mut OutgoingRequest) -> Result<(), GatewayError> {
        let headers = request.headers.get_or_insert_with(HeaderMap::new);
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

        match self.credentials.credential() {
            Some(credential) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", credential.expose()))
                    .map_err(|_| GatewayError::InvalidCredential)?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            None => {
                headers.remove(AUTHORIZATION);
            }
        }
        Ok(())
    }

    /// Resolve a request target against the base URL
    pub fn resolve_url(&self, target: &str) -> Result<Url, GatewayError> {
        let url = if self.base_url.is_empty() || is_absolute_url(target) {
            target.to_string()
        } else {
            combine_url(&self.base_url, target)
        };
        Url::parse(&url).map_err(|e| GatewayError::InvalidUrl(format!("{}: {}", url, e)))
    }

    pub fn prepare(&self, mut request: OutgoingRequest) -> Result<PreparedRequest, GatewayError> {
        self.apply_headers(&mut request)?;
        let url = self.resolve_url(&request.target)?;
        let body = request
            .body
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(GatewayError::Encode)?;

        Ok(PreparedRequest {
            method: request.method,
            url,
            headers: request.headers.unwrap_or_default(),
            body,
        })
    }

    /// Send a request and wait for the backend's answer.
    ///
    /// Timeouts, network failures and non-2xx statuses come back as errors
    /// unchanged; a non-2xx error carries the full response. Nothing is
    /// retried.
    pub async fn dispatch(&self, request: OutgoingRequest) -> Result<Response, GatewayError> {
        let prepared = self.prepare(request)?;
        let method = prepared.method.clone();
        let url = prepared.url.clone();
        debug!(%method, %url, "Dispatching request");

        let response = tokio::time::timeout(self.timeout, self.transport.send(prepared))
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout))??;

        let status = response.status();
        debug!(%method, %url, status = status.as_u16(), "Request completed");
        if !status.is_success() {
            return Err(GatewayError::from_response(response));
        }
        Ok(response)
    }

    // ===== Convenience Methods =====

    pub async fn get(&self, target: &str) -> Result<Response, GatewayError> {
        self.dispatch(OutgoingRequest::new(Method::GET, target)).await
    }

    pub async fn delete(&self, target: &str) -> Result<Response, GatewayError> {
        self.dispatch(OutgoingRequest::new(Method::DELETE, target)).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        target: &str,
        body: &B,
    ) -> Result<Response, GatewayError> {
        self.send_json(Method::POST, target, body).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        target: &str,
        body: &B,
    ) -> Result<Response, GatewayError> {
        self.send_json(Method::PUT, target, body).await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        target: &str,
        body: &B,
    ) -> Result<Response, GatewayError> {
        self.send_json(Method::PATCH, target, body).await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        target: &str,
        body: &B,
    ) -> Result<Response, GatewayError> {
        let body = serde_json::to_value(body).map_err(GatewayError::Encode)?;
        self.dispatch(OutgoingRequest::new(method, target).json(body)).await
    }
}

/// `scheme://host...` or protocol-relative `//host...`
fn is_absolute_url(target: &str) -> bool {
    if target.starts_with("//") {
        return true;
    }
    let Some((scheme, rest)) = target.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_with_letter
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && rest.starts_with("//")
}

/// Join base and target with exactly one slash between them
fn combine_url(base: &str, target: &str) -> String {
    if target.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        target.trim_start_matches('/')
    )
}
