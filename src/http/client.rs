//! HTTP client trait and production implementation

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use thiserror::Error;

/// Result type for HTTP operations
pub type HttpResult<T> = Result<T, HttpError>;

/// HTTP-level errors
///
/// Transport failures are recoverable by the caller (backoff + retry); only
/// `InvalidUrl` indicates a configuration problem.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request could not be sent or the connection dropped
    #[error("Request failed: {0}")]
    Request(String),

    /// Response body could not be read
    #[error("Body read failed: {0}")]
    Body(String),

    /// Malformed URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Chunked response body
pub type ByteStream = Pin<Box<dyn Stream<Item = HttpResult<Bytes>> + Send>>;

/// Response to a single-shot JSON GET
#[derive(Debug)]
pub struct JsonResponse {
    /// HTTP status code
    pub status: u16,

    /// Parsed body, `None` when empty, unparseable, or non-success
    pub body: Option<Value>,
}

impl JsonResponse {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Response to a streaming GET
pub struct StreamResponse {
    /// HTTP status code
    pub status: u16,

    /// Chunked body, `None` on non-success status
    pub body: Option<ByteStream>,
}

impl StreamResponse {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Supplies the bearer token attached to every request
///
/// Resolved per request, not captured at connection start, so a rotated
/// token takes effect on the next reconnect or poll.
pub trait TokenProvider: Send + Sync {
    /// Current token, or `None` for anonymous requests
    fn token(&self) -> Option<String>;
}

/// A fixed token (or none), for CLIs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// The two HTTP shapes the stream client consumes
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Single-shot GET, suitable for long polling
    ///
    /// The server holds the request open until events exist or its own
    /// timeout elapses; no additional client-side timeout is applied.
    async fn get_json(&self, url: &str, bearer: Option<&str>) -> HttpResult<JsonResponse>;

    /// Streaming GET returning the body in chunks
    async fn get_stream(&self, url: &str, bearer: Option<&str>) -> HttpResult<StreamResponse>;
}

/// Production [`HttpClient`] backed by reqwest
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a client with default settings
    pub fn new() -> Self {
        Self::default()
    }

    fn request(&self, url: &str, bearer: Option<&str>) -> reqwest::RequestBuilder {
        let mut req = self.client.get(url);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        req
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_json(&self, url: &str, bearer: Option<&str>) -> HttpResult<JsonResponse> {
        let response = self
            .request(url, bearer)
            .send()
            .await
            .map_err(|e| HttpError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Ok(JsonResponse { status, body: None });
        }

        // An empty or non-JSON body is not a transport failure
        let body = response.json::<Value>().await.ok();
        Ok(JsonResponse { status, body })
    }

    async fn get_stream(&self, url: &str, bearer: Option<&str>) -> HttpResult<StreamResponse> {
        let response = self
            .request(url, bearer)
            .send()
            .await
            .map_err(|e| HttpError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Ok(StreamResponse { status, body: None });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| HttpError::Body(e.to_string())));

        Ok(StreamResponse {
            status,
            body: Some(Box::pin(stream)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_response_success_range() {
        assert!(JsonResponse { status: 200, body: None }.is_success());
        assert!(JsonResponse { status: 204, body: None }.is_success());
        assert!(!JsonResponse { status: 304, body: None }.is_success());
        assert!(!JsonResponse { status: 500, body: None }.is_success());
    }

    #[test]
    fn test_static_token() {
        let anon = StaticToken(None);
        assert_eq!(anon.token(), None);

        let token = StaticToken(Some("secret".to_string()));
        assert_eq!(token.token(), Some("secret".to_string()));
    }
}
