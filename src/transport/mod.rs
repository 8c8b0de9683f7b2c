//! The HTTP boundary and the retrying layer on top of it.

use std::future::Future;

use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

pub mod retrying;

pub use retrying::RetryingTransport;

/// One attempt as it goes on the wire.
#[derive(Debug)]
pub struct HttpRequest<'a> {
    pub method: Method,
    pub url: &'a str,
    pub headers: &'a HeaderMap,
    pub query: &'a [(String, String)],
    pub json_body: Option<&'a Value>,
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// The request never produced a response.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SendError {
    /// false when sending again cannot help, e.g. the url does not parse
    pub retryable: bool,
    pub message: String,
}

impl SendError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self { retryable: true, message: message.into() }
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self { retryable: false, message: message.into() }
    }
}

impl From<reqwest::Error> for SendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            SendError::terminal(e.to_string())
        } else {
            SendError::retryable(e.to_string())
        }
    }
}

/// Capability: put one request on the wire.
pub trait HttpSend: Send + Sync {
    fn send(&self, request: HttpRequest<'_>) -> impl Future<Output = Result<RawResponse, SendError>> + Send;
}

impl HttpSend for reqwest::Client {
    async fn send(&self, request: HttpRequest<'_>) -> Result<RawResponse, SendError> {
        let mut builder = self
            .request(request.method, request.url)
            .headers(request.headers.clone())
            .query(request.query);
        if let Some(body) = request.json_body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse { status, headers, body })
    }
}
