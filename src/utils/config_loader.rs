use std::path::Path;

use tracing::info;

use crate::config::proc_loader::file_to_config;
use crate::config::settings::ClientConfig;
use crate::error::Result;

/// Config from `config_path`, or the built-in defaults (dev environment, auto identity) without one.
pub async fn run(config_path: Option<&str>) -> Result<ClientConfig> {
    match config_path {
        Some(path) => file_to_config(Path::new(path)).await,
        None => {
            info!("no config file given, using defaults");
            Ok(ClientConfig::default())
        }
    }
}
