use std::future::Future;
use std::time::Duration;

use reqwest::Client;

use super::{GatewayError, PreparedRequest, Response};

/// The HTTP layer underneath the gateway.
///
/// Implementations send the request exactly as prepared and return whatever
/// the backend answered, success or not; status handling is the gateway's job.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: PreparedRequest,
    ) -> impl Future<Output = Result<Response, GatewayError>> + Send;
}

/// Production transport on top of `reqwest`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::Network)?;
        Ok(Self { client, timeout })
    }

    fn map_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.timeout)
        } else {
            GatewayError::Network(e)
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: PreparedRequest) -> Result<Response, GatewayError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;

        Ok(Response {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
