//! Request dispatch: headers, retrying transport, decoding, overall deadline.

pub mod request;

use std::time::Duration;

use http::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use http::{HeaderMap, HeaderValue, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::token_cache::TokenCache;
use crate::config::settings::ClientConfig;
use crate::credentials::signals::EnvironmentSignals;
use crate::credentials::{CredentialKind, CredentialProvider};
use crate::error::{Error, Result};
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::RetrySettings;
use crate::resolver::environment::Environment;
use crate::resolver::scope::{resolve_identity, ResolvedIdentity};
use crate::transport::{HttpSend, RetryingTransport};
use crate::utils::constants::{DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_REQUEST_DEADLINE_MS, DEFAULT_SAFETY_MARGIN_SECS};

pub use request::{ContentType, QueryParams, QueryValue, RequestSpec, ResponseBody};

/// Knobs that are not part of the environment or the credential.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub retry: RetrySettings,
    pub safety_margin_seconds: u64,
    pub request_deadline: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            retry: RetrySettings::default(),
            safety_margin_seconds: DEFAULT_SAFETY_MARGIN_SECS,
            request_deadline: Duration::from_millis(DEFAULT_REQUEST_DEADLINE_MS),
        }
    }
}

impl From<&ClientConfig> for ClientOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            retry: config.retry.as_ref().map(RetrySettings::from).unwrap_or_default(),
            safety_margin_seconds: config
                .token
                .as_ref()
                .map(|t| t.safety_margin_seconds())
                .unwrap_or(DEFAULT_SAFETY_MARGIN_SECS),
            request_deadline: Duration::from_millis(
                config
                    .http
                    .as_ref()
                    .map(|h| h.request_deadline_ms())
                    .unwrap_or(DEFAULT_REQUEST_DEADLINE_MS),
            ),
        }
    }
}

/// Authenticated client for one Omnia Timeseries environment.
///
/// Owns its token cache and credential; nothing is shared between clients.
pub struct Client<P = CredentialKind, T = reqwest::Client> {
    environment: Environment,
    identity: ResolvedIdentity,
    tokens: TokenCache<P>,
    transport: RetryingTransport<T>,
    request_deadline: Duration,
    user_agent: HeaderValue,
}

impl Client {
    /// Build from configuration, reading identity signals from the process environment.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::from_config_with_signals(config, &EnvironmentSignals::from_env())
    }

    pub fn from_config_with_signals(config: &ClientConfig, signals: &EnvironmentSignals) -> Result<Self> {
        let timeout_ms = config
            .http
            .as_ref()
            .map(|h| h.timeout_ms())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_MS);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build http client: {e}")))?;

        let provider = CredentialKind::from_config(&config.identity, signals, http.clone())?;
        Ok(Self::with_parts(
            config.environment.to_environment(),
            provider,
            http,
            ClientOptions::from(config),
        ))
    }
}

impl<P: CredentialProvider, T: HttpSend> Client<P, T> {
    pub fn with_parts(environment: Environment, provider: P, http: T, options: ClientOptions) -> Self {
        let identity = resolve_identity(&environment);
        info!(
            base_url = environment.base_url(),
            scope = %identity.scope,
            endpoint_override = ?identity.endpoint_override,
            credential = provider.kind(),
            "omnia timeseries client ready"
        );

        Self {
            environment,
            identity,
            tokens: TokenCache::new(provider, options.safety_margin_seconds),
            transport: RetryingTransport::new(http, options.retry),
            request_deadline: options.request_deadline,
            user_agent: HeaderValue::from_static(user_agent()),
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// API root; the management endpoint when the environment is an ML alias.
    pub fn base_url(&self) -> &str {
        self.identity
            .endpoint_override
            .as_deref()
            .unwrap_or_else(|| self.environment.base_url())
    }

    pub fn scope(&self) -> &str {
        &self.identity.scope
    }

    pub fn tokens(&self) -> &TokenCache<P> {
        &self.tokens
    }

    pub fn transport(&self) -> &RetryingTransport<T> {
        &self.transport
    }

    /// Authenticated call with retries, bounded by the overall request deadline.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        accept: ContentType,
        payload: Option<Value>,
        params: Option<&QueryParams>,
    ) -> Result<ResponseBody> {
        let spec = RequestSpec::new(method, url, accept)
            .with_query(params.cloned().unwrap_or_default())
            .with_payload(payload);

        let started = get_instant();
        let outcome = tokio::time::timeout(self.request_deadline, self.dispatch(&spec)).await;
        get_metrics()
            .await
            .http_request_duration
            .with_label_values(&[spec.method.as_str()])
            .observe(started.elapsed().as_secs_f64());

        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(method = %spec.method, url, deadline = ?self.request_deadline, "request deadline elapsed");
                Err(Error::Timeout(self.request_deadline))
            }
        }
    }

    /// JSON call deserialized into `R`.
    pub async fn request_json<R: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        payload: Option<Value>,
        params: Option<&QueryParams>,
    ) -> Result<R> {
        match self.request(method, url, ContentType::Json, payload, params).await? {
            ResponseBody::Json(value) => Ok(serde_json::from_value(value)?),
            ResponseBody::Bytes(bytes) => Ok(serde_json::from_slice(&bytes)?),
        }
    }

    async fn dispatch(&self, spec: &RequestSpec) -> Result<ResponseBody> {
        debug!(method = %spec.method, url = %spec.url, accept = %spec.accept, "dispatching request");
        let response = self
            .transport
            .execute(spec, self.headers(spec.accept), &self.tokens, &self.identity.scope)
            .await?;
        decode(spec.accept, response.body)
    }

    /// Every header except Authorization, which the transport owns.
    fn headers(&self, accept: ContentType) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(4);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(ContentType::Json.as_str()));
        headers.insert(ACCEPT, HeaderValue::from_static(accept.as_str()));
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers
    }
}

fn decode(accept: ContentType, body: Vec<u8>) -> Result<ResponseBody> {
    match accept {
        ContentType::Json if body.iter().all(u8::is_ascii_whitespace) => Ok(ResponseBody::Json(Value::Null)),
        ContentType::Json => Ok(ResponseBody::Json(serde_json::from_slice(&body)?)),
        ContentType::Protobuf | ContentType::XGoogleProtobuf => Ok(ResponseBody::Bytes(body)),
    }
}

/// `omnia-timeseries/<version> (<os>; <arch>; rust)`
pub fn user_agent() -> &'static str {
    static USER_AGENT_VALUE: std::sync::LazyLock<String> = std::sync::LazyLock::new(|| {
        format!(
            "omnia-timeseries/{} ({}; {}; rust)",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        )
    });
    USER_AGENT_VALUE.as_str()
}
