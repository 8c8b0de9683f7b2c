use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, error};

use crate::config::proc_validator;
use crate::config::settings::ClientConfig;
use crate::error::{Error, Result};

static ENV_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}").expect("static regex"));

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ClientConfig> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::Configuration(format!("cannot read config file '{}': {}", path.display(), e))
    })?;

    parse_config(&expand_env_vars(&content)).await
}

pub async fn parse_config(content: &str) -> Result<ClientConfig> {
    let client_config: ClientConfig = serde_yaml::from_str(content)
        .inspect_err(|e| error!("parse config error: {}", e))
        .map_err(|e| Error::Configuration(format!("invalid config format: {}", e)))?;

    debug!("validation config ...");
    proc_validator::validate_client_config(&client_config)
        .await
        .map_err(|issues| Error::Configuration(issues.join("; ")))?;

    Ok(client_config)
}

/// Replace `${VAR}` and `${VAR:default}` with values from the process environment.
pub fn expand_env_vars(input: &str) -> String {
    ENV_REFERENCE
        .replace_all(input, |caps: &regex::Captures| {
            let var = &caps[1];
            let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var).unwrap_or_else(|_| default.to_string())
        })
        .to_string()
}
