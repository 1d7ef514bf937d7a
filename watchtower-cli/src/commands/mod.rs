//! Command handlers -- one module per subcommand

pub mod alerts;
pub mod config;
pub mod rules;
pub mod run;
pub mod watch;

use std::path::Path;

use watchtower_core::config::WatchtowerConfig;
use watchtower_core::error::{ConfigError, WatchtowerError};
use watchtower_pipeline::{JsonlAlertSink, Monitor, MonitorConfig};

use crate::error::CliError;

/// Load the configuration file, falling back to defaults when it is absent.
///
/// A missing file is "nothing configured", not an error; environment
/// overrides still apply. A file that exists but fails to parse or
/// validate is an error.
pub(crate) async fn load_config(path: &Path) -> Result<WatchtowerConfig, CliError> {
    match WatchtowerConfig::load(path).await {
        Ok(config) => Ok(config),
        Err(WatchtowerError::Config(ConfigError::FileNotFound { .. })) => {
            let mut config = WatchtowerConfig::default();
            config.apply_env_overrides();
            config
                .validate()
                .map_err(|e| CliError::Config(e.to_string()))?;
            Ok(config)
        }
        Err(e) => Err(CliError::Config(e.to_string())),
    }
}

/// Build a monitor over a JSONL sink from the loaded configuration.
pub(crate) async fn build_monitor(
    config: &WatchtowerConfig,
) -> Result<Monitor<JsonlAlertSink>, CliError> {
    let monitor_config = MonitorConfig::from_core(config);
    let sink = JsonlAlertSink::open(&monitor_config.data_dir).await?;
    Monitor::new(monitor_config, sink).map_err(CliError::from)
}
