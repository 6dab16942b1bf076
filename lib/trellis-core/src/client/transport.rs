use std::future::Future;
use std::time::Duration;

use http::{Method, StatusCode};
use indexmap::IndexMap;
use url::Url;

/// Errors raised by a transport while dispatching a request.
///
/// Transport failures are surfaced to the caller unmodified; the client never
/// retries them.
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum TransportError {
    /// HTTP client error from the underlying reqwest library.
    ///
    /// Occurs when network requests fail, timeouts fire, or connection issues
    /// arise.
    ReqwestError(reqwest::Error),

    /// Any other transport failure, for custom [`Transport`] implementations.
    #[display("Transport failure: {message}")]
    #[from(skip)]
    Failure {
        /// Description of the failure.
        message: String,
    },
}

/// One outgoing request, fully assembled by the client.
///
/// `GET`/`DELETE` requests carry their parameters in the URL query string and
/// have no body; `POST`/`PUT`/`PATCH` requests carry them JSON-encoded in
/// `body`.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// The HTTP method of the dispatched node.
    pub method: Method,
    /// The full request URL, query string included.
    pub url: Url,
    /// Request headers, authorization merged in.
    pub headers: IndexMap<String, String>,
    /// The JSON-encoded request body, when the method takes one.
    pub body: Option<String>,
    /// Optional request timeout from the client configuration.
    pub timeout: Option<Duration>,
}

/// One received response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The raw response body.
    pub body: String,
}

/// The HTTP dispatch capability the client is generic over.
///
/// The default implementation is [`HttpTransport`]; tests substitute their
/// own to exercise clients without a network.
pub trait Transport: Send + Sync {
    /// Dispatches one request and returns the raw response.
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

/// Default [`Transport`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a default reqwest client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport over a preconfigured reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let TransportRequest {
            method,
            url,
            headers,
            body,
            timeout,
        } = request;

        let mut builder = self.client.request(method, url);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display() {
        let error = TransportError::Failure {
            message: "connection refused".to_string(),
        };
        assert_eq!(error.to_string(), "Transport failure: connection refused");
    }
}
