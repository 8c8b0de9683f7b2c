use serde::Deserialize;

use crate::credentials::signals::IdentityMode;
use crate::resolver::environment::{Environment, EnvironmentPreset, TimeseriesVersion};
use crate::utils::constants::{
    DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_REQUEST_DEADLINE_MS, DEFAULT_RETRY_ATTEMPTS,
    DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS, DEFAULT_SAFETY_MARGIN_SECS,
};

/// ================================
/// Full client configuration
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClientConfig {
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    pub retry: Option<RetryConfig>,
    pub token: Option<TokenConfig>,
    pub http: Option<HttpConfig>,
    pub logging: Option<LoggingConfig>,
}

/// ================================
/// Target environment
/// ================================
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum EnvironmentConfig {
    Preset {
        preset: EnvironmentPreset,
        #[serde(default)]
        version: TimeseriesVersion,
    },
    Custom {
        resource_id: String,
        base_url: String,
    },
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig::Preset {
            preset: EnvironmentPreset::Dev,
            version: TimeseriesVersion::default(),
        }
    }
}

impl EnvironmentConfig {
    pub fn to_environment(&self) -> Environment {
        match self {
            EnvironmentConfig::Preset { preset, version } => Environment::preset(*preset, *version),
            EnvironmentConfig::Custom { resource_id, base_url } => Environment::new(resource_id.to_owned(), base_url),
        }
    }
}

/// ================================
/// Identity
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct IdentityConfig {
    #[serde(default)]
    pub mode: IdentityMode,
    /// client id of a user-assigned managed identity; `AZURE_CLIENT_ID` when absent
    pub client_id: Option<String>,
    /// overrides the instance metadata token endpoint
    pub imds_endpoint: Option<String>,
    pub authority_host: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RetryConfig {
    pub attempts: Option<u32>,
    /// will be mutiply by 2 on every attempt until max_delay_ms
    pub base_delay_ms: Option<u64>,
    /// max delay for retrying
    /// invariant: >= base_delay_ms.
    pub max_delay_ms: Option<u64>,
}

impl RetryConfig {
    pub fn attempts(&self) -> u32 {
        self.attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS)
    }

    pub fn base_delay_ms(&self) -> u64 {
        self.base_delay_ms.unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS)
    }

    pub fn max_delay_ms(&self) -> u64 {
        self.max_delay_ms.unwrap_or(DEFAULT_RETRY_MAX_DELAY_MS)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TokenConfig {
    /// refresh this many seconds before the token's stated expiry
    pub safety_margin_seconds: Option<u64>,
}

impl TokenConfig {
    pub fn safety_margin_seconds(&self) -> u64 {
        self.safety_margin_seconds.unwrap_or(DEFAULT_SAFETY_MARGIN_SECS)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct HttpConfig {
    /// per attempt
    pub timeout_ms: Option<u64>,
    /// whole call including retries and backoff
    pub request_deadline_ms: Option<u64>,
}

impl HttpConfig {
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms.unwrap_or(DEFAULT_HTTP_TIMEOUT_MS)
    }

    pub fn request_deadline_ms(&self) -> u64 {
        self.request_deadline_ms.unwrap_or(DEFAULT_REQUEST_DEADLINE_MS)
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "json".to_string())
            .to_lowercase()
            .as_str()
        {
            "compact" | "text" => LogFormat::Compact,
            _ => LogFormat::Json,
        }
    }
}
