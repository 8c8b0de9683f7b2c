use std::time::Duration;

use http::{HeaderMap, StatusCode};
use thiserror::Error;

use crate::credentials::CredentialError;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the client surfaces to its caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Identity or file configuration is missing or invalid. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The identity backend could not issue a token for the scope, or the API kept
    /// rejecting the token after one forced refresh.
    #[error("authentication failed for scope '{scope}': {reason}")]
    Authentication {
        scope: String,
        reason: String,
        #[source]
        source: Option<CredentialError>,
    },

    #[error("transient transport failure{}: {message}", status_suffix(.status))]
    TransientTransport {
        status: Option<StatusCode>,
        message: String,
    },

    #[error("request still failing after {attempts} attempts: {last}")]
    RetryExhausted { attempts: u32, last: Box<Error> },

    #[error("{0}")]
    RequestFailed(RequestFailure),

    #[error("request did not complete within {0:?}")]
    Timeout(Duration),

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to encode request payload: {0}")]
    Encode(serde_json::Error),
}

impl Error {
    pub(crate) fn authentication(scope: &str, source: CredentialError) -> Self {
        Error::Authentication {
            scope: scope.to_owned(),
            reason: source.to_string(),
            source: Some(source),
        }
    }

    /// HTTP status attached to the failure, looking through retry exhaustion.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::TransientTransport { status, .. } => *status,
            Error::RequestFailed(failure) => Some(failure.status),
            Error::RetryExhausted { last, .. } => last.status(),
            _ => None,
        }
    }
}

fn status_suffix(status: &Option<StatusCode>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

/// A terminal non-2xx response, kept whole for the caller to inspect.
#[derive(Debug, Clone)]
pub struct RequestFailure {
    pub status: StatusCode,
    pub reason: String,
    pub body: String,
    pub headers: HeaderMap,
}

impl RequestFailure {
    pub fn new(status: StatusCode, headers: HeaderMap, body: &[u8]) -> Self {
        Self {
            status,
            reason: status.canonical_reason().unwrap_or("Unknown").to_owned(),
            body: String::from_utf8_lossy(body).into_owned(),
            headers,
        }
    }
}

impl std::fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "request failed with status {} {}: {}",
            self.status.as_u16(),
            self.reason,
            self.body
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn request_failure_carries_reason_and_body() {
        let failure = RequestFailure::new(StatusCode::NOT_FOUND, HeaderMap::new(), br#"{"message":"no such timeseries"}"#);
        assert_eq!(failure.reason, "Not Found");
        assert_eq!(
            Error::RequestFailed(failure).to_string(),
            r#"request failed with status 404 Not Found: {"message":"no such timeseries"}"#
        );
    }

    #[test]
    fn status_is_visible_through_exhaustion() {
        let err = Error::RetryExhausted {
            attempts: 3,
            last: Box::new(Error::TransientTransport {
                status: Some(StatusCode::SERVICE_UNAVAILABLE),
                message: "busy".into(),
            }),
        };
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert!(err.to_string().contains("after 3 attempts"));
    }
}
