//! Effective configuration: file (or defaults) plus CLI/env overrides.

use anyhow::{Context, Result};
use contracts::IngestConfig;
use tracing::info;

use crate::cli::ConfigArgs;
use crate::error::CliError;

/// Load the configuration named by `args`, apply its overrides, then
/// `adjust`, and validate the result.
pub fn load_config(
    args: &ConfigArgs,
    adjust: impl FnOnce(&mut IngestConfig),
) -> Result<IngestConfig> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()).into());
            }
            info!(config = %path.display(), "Loading configuration");
            config_loader::ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            info!("No configuration file given, using defaults");
            IngestConfig::default()
        }
    };

    apply_overrides(&mut config, args);
    adjust(&mut config);
    config_loader::validate(&config).context("Invalid configuration after overrides")?;
    Ok(config)
}

/// Apply CLI/env overrides on top of file values
pub fn apply_overrides(config: &mut IngestConfig, args: &ConfigArgs) {
    if let Some(ref host) = args.broker_host {
        info!(host = %host, "Overriding broker host");
        config.broker.host = host.clone();
    }
    if let Some(port) = args.broker_port {
        info!(port, "Overriding broker port");
        config.broker.port = port;
    }
    if let Some(ref username) = args.username {
        config.broker.username = Some(username.clone());
    }
    if let Some(ref password) = args.password {
        config.broker.password = Some(password.clone());
    }
    if let Some(ref url) = args.database_url {
        info!("Overriding database url");
        config.store.url = url.clone();
    }
}
