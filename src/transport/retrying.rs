use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue, StatusCode};
use tracing::{debug, warn};

use crate::cache::token::AccessToken;
use crate::cache::token_cache::TokenCache;
use crate::client::request::RequestSpec;
use crate::credentials::CredentialProvider;
use crate::error::{Error, RequestFailure, Result};
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::{RetrySettings, RetryState};
use crate::transport::{HttpRequest, HttpSend, RawResponse};

/// Sends a [`RequestSpec`] with bounded, jittered retries.
///
/// Outcomes:
/// - 2xx is returned as is
/// - 429, 5xx and transport failures are retried until the attempt budget is spent
/// - the first 401/403 drops the rejected token and is retried right away, outside the budget
/// - anything else is terminal
pub struct RetryingTransport<T = reqwest::Client> {
    http: T,
    retry: RetrySettings,
}

impl<T: HttpSend> RetryingTransport<T> {
    pub fn new(http: T, retry: RetrySettings) -> Self {
        Self { http, retry }
    }

    pub fn http(&self) -> &T {
        &self.http
    }

    pub fn retry(&self) -> &RetrySettings {
        &self.retry
    }

    pub async fn execute<P: CredentialProvider>(
        &self,
        spec: &RequestSpec,
        mut headers: HeaderMap,
        tokens: &TokenCache<P>,
        scope: &str,
    ) -> Result<RawResponse> {
        let metrics = get_metrics().await;
        let method = spec.method.as_str();
        let query = spec.query.to_pairs();
        let mut state = RetryState::default();

        let mut token = tokens.current(scope).await?;
        headers.insert(AUTHORIZATION, bearer(&token, scope)?);

        loop {
            let request = HttpRequest {
                method: spec.method.clone(),
                url: &spec.url,
                headers: &headers,
                query: &query,
                json_body: spec.payload.as_ref(),
            };

            let failure = match self.http.send(request).await {
                Ok(response) => {
                    let status = response.status;
                    metrics.http_requests.with_label_values(&[method, status.as_str()]).inc();

                    if status.is_success() {
                        debug!(method, url = %spec.url, %status, attempt = state.attempt, "request succeeded");
                        return Ok(response);
                    }

                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        if state.auth_refreshed {
                            warn!(method, url = %spec.url, %status, scope, "still rejected after token refresh");
                            return Err(Error::Authentication {
                                scope: scope.to_owned(),
                                reason: format!(
                                    "{} after token refresh: {}",
                                    status,
                                    String::from_utf8_lossy(&response.body)
                                ),
                                source: None,
                            });
                        }
                        warn!(method, url = %spec.url, %status, scope, "token rejected, refreshing once");
                        metrics.http_request_retries.with_label_values(&["auth"]).inc();
                        state.auth_refreshed = true;
                        tokens.invalidate_if(scope, &token).await;
                        token = tokens.current(scope).await?;
                        headers.insert(AUTHORIZATION, bearer(&token, scope)?);
                        continue;
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        Error::TransientTransport {
                            status: Some(status),
                            message: String::from_utf8_lossy(&response.body).into_owned(),
                        }
                    } else {
                        warn!(method, url = %spec.url, %status, "request failed");
                        return Err(Error::RequestFailed(RequestFailure::new(
                            status,
                            response.headers,
                            &response.body,
                        )));
                    }
                }
                Err(e) if e.retryable => {
                    metrics.http_requests.with_label_values(&[method, "error"]).inc();
                    Error::TransientTransport { status: None, message: e.message }
                }
                Err(e) => {
                    metrics.http_requests.with_label_values(&[method, "error"]).inc();
                    warn!(method, url = %spec.url, "request could not be built: {}", e);
                    return Err(Error::Configuration(format!("invalid request to {}: {}", spec.url, e)));
                }
            };

            let reason = match failure.status() {
                Some(StatusCode::TOO_MANY_REQUESTS) => "throttled",
                Some(_) => "server_error",
                None => "transport",
            };
            let attempt = state.attempt + 1;
            warn!(
                method,
                url = %spec.url,
                attempt,
                max_attempts = self.retry.attempts,
                "attempt failed: {}",
                failure
            );

            match state.record(failure, &self.retry) {
                Some(delay) => {
                    metrics.http_request_retries.with_label_values(&[reason]).inc();
                    debug!(delay_ms = delay.as_millis() as u64, "backing off");
                    tokio::time::sleep(delay).await;
                }
                None => return Err(state.exhausted()),
            }
        }
    }
}

fn bearer(token: &AccessToken, scope: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.secret())).map_err(|_| Error::Authentication {
        scope: scope.to_owned(),
        reason: "token is not a valid header value".into(),
        source: None,
    })?;
    value.set_sensitive(true);
    Ok(value)
}
