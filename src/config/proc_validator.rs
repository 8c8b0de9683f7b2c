//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks environment, identity, retry, http and logging invariants

use tracing::{error, info};

use crate::config::settings::{ClientConfig, EnvironmentConfig, HttpConfig, IdentityConfig, LoggingConfig, RetryConfig};
use crate::observability::metrics::get_metrics;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_client_config(cfg: &ClientConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_environment(&cfg.environment, &mut errors);
    validate_identity(&cfg.identity, &mut errors);
    if let Some(retry) = &cfg.retry {
        validate_retry(retry, &mut errors);
    }
    if let Some(http) = &cfg.http {
        validate_http(http, &mut errors);
    }
    if let Some(logging) = &cfg.logging {
        validate_logging(logging, &mut errors);
    }

    if errors.is_empty() {
        info!("config validation passed");
        Ok(())
    } else {
        for e in &errors {
            error!("config validation: {}", e);
        }
        get_metrics()
            .await
            .config_validation_errors
            .inc_by(errors.len() as u64);
        Err(errors)
    }
}

fn validate_environment(environment: &EnvironmentConfig, errors: &mut Vec<String>) {
    if let EnvironmentConfig::Custom { resource_id, base_url } = environment {
        if resource_id.trim().is_empty() {
            errors.push("environment.resource_id must not be empty".to_string());
        }
        if !is_http_url(base_url) {
            errors.push(format!(
                "environment.base_url '{}' must start with http:// or https://",
                base_url
            ));
        }
    }
}

fn validate_identity(identity: &IdentityConfig, errors: &mut Vec<String>) {
    if identity.client_id.as_ref().is_some_and(|id| id.trim().is_empty()) {
        errors.push("identity.client_id must not be empty when set".to_string());
    }
    for (field, value) in [
        ("identity.imds_endpoint", &identity.imds_endpoint),
        ("identity.authority_host", &identity.authority_host),
    ] {
        if let Some(url) = value {
            if !is_http_url(url) {
                errors.push(format!("{} '{}' must start with http:// or https://", field, url));
            }
        }
    }
}

fn validate_retry(retry: &RetryConfig, errors: &mut Vec<String>) {
    if retry.attempts() == 0 {
        errors.push("retry.attempts must be >= 1".to_string());
    }
    if retry.base_delay_ms() == 0 {
        errors.push("retry.base_delay_ms must be > 0".to_string());
    }
    if retry.max_delay_ms() < retry.base_delay_ms() {
        errors.push(format!(
            "retry.max_delay_ms ({}) must be >= retry.base_delay_ms ({})",
            retry.max_delay_ms(),
            retry.base_delay_ms()
        ));
    }
}

fn validate_http(http: &HttpConfig, errors: &mut Vec<String>) {
    if http.timeout_ms() == 0 {
        errors.push("http.timeout_ms must be > 0".to_string());
    }
    if http.request_deadline_ms() < http.timeout_ms() {
        errors.push(format!(
            "http.request_deadline_ms ({}) must be >= http.timeout_ms ({})",
            http.request_deadline_ms(),
            http.timeout_ms()
        ));
    }
}

fn validate_logging(logging: &LoggingConfig, errors: &mut Vec<String>) {
    if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        errors.push(format!(
            "logging.level '{}' must be one of {}",
            logging.level,
            LOG_LEVELS.join(", ")
        ));
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::settings::LogFormat;

    #[tokio::test]
    async fn default_config_is_valid() {
        assert!(validate_client_config(&ClientConfig::default()).await.is_ok());
    }

    #[tokio::test]
    async fn aggregates_every_issue() {
        let cfg = ClientConfig {
            environment: EnvironmentConfig::Custom {
                resource_id: " ".into(),
                base_url: "ftp://example".into(),
            },
            identity: IdentityConfig {
                client_id: Some(String::new()),
                imds_endpoint: Some("169.254.169.254".into()),
                ..Default::default()
            },
            http: Some(HttpConfig { timeout_ms: Some(10_000), request_deadline_ms: Some(1_000) }),
            logging: Some(LoggingConfig::new("verbose".into(), LogFormat::Compact)),
            ..Default::default()
        };

        let errors = validate_client_config(&cfg).await.unwrap_err();
        assert_eq!(errors.len(), 6, "{errors:#?}");
        assert!(errors.iter().any(|e| e.starts_with("environment.resource_id")));
        assert!(errors.iter().any(|e| e.starts_with("environment.base_url")));
        assert!(errors.iter().any(|e| e.starts_with("identity.client_id")));
        assert!(errors.iter().any(|e| e.starts_with("identity.imds_endpoint")));
        assert!(errors.iter().any(|e| e.starts_with("http.request_deadline_ms")));
        assert!(errors.iter().any(|e| e.starts_with("logging.level")));
    }
}
