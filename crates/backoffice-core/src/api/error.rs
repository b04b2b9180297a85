use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use thiserror::Error;

use super::Response;

/// Failures from [`Gateway::dispatch`](super::Gateway::dispatch).
///
/// Non-2xx answers keep the whole [`Response`]; only the `Display` text is
/// shortened.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Unauthorized - token may be missing or expired")]
    Unauthorized { response: Response },

    #[error("Access denied: {}", truncate_body(.response))]
    AccessDenied { response: Response },

    #[error("Resource not found: {}", truncate_body(.response))]
    NotFound { response: Response },

    #[error("Rate limited - please wait before retrying")]
    RateLimited { response: Response },

    #[error("Server error ({}): {}", .response.status, truncate_body(.response))]
    ServerError { response: Response },

    #[error("Unexpected status {}: {}", .response.status, truncate_body(.response))]
    Status { response: Response },

    #[error("Invalid request target: {0}")]
    InvalidUrl(String),

    #[error("Stored credential cannot be sent as a header")]
    InvalidCredential,

    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Truncate a response body to avoid logging excessive data
fn truncate_body(response: &Response) -> String {
    let body = response.text();
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        body
    } else {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }
}

impl GatewayError {
    /// Classify a non-2xx response, keeping it intact
    pub fn from_response(response: Response) -> Self {
        match response.status.as_u16() {
            401 => GatewayError::Unauthorized { response },
            403 => GatewayError::AccessDenied { response },
            404 => GatewayError::NotFound { response },
            429 => GatewayError::RateLimited { response },
            500..=599 => GatewayError::ServerError { response },
            _ => GatewayError::Status { response },
        }
    }

    /// The backend's answer, when the failure is a non-2xx status
    pub fn response(&self) -> Option<&Response> {
        match self {
            GatewayError::Unauthorized { response }
            | GatewayError::AccessDenied { response }
            | GatewayError::NotFound { response }
            | GatewayError::RateLimited { response }
            | GatewayError::ServerError { response }
            | GatewayError::Status { response } => Some(response),
            _ => None,
        }
    }

    /// Raw body of the failed response
    pub fn body(&self) -> Option<&[u8]> {
        self.response().map(|response| response.body.as_slice())
    }

    pub fn headers(&self) -> Option<&HeaderMap> {
        self.response().map(|response| &response.headers)
    }

    /// HTTP status of the failed response, if the backend answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GatewayError::Network(e) => e.status(),
            other => other.response().map(Response::status),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Timeout(_))
    }
}
