//! `watchtower config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use watchtower_core::config::WatchtowerConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `config` command.
pub async fn execute(
    config_path: &Path,
    args: ConfigArgs,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show => execute_show(config_path, writer).await,
    }
}

async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    match WatchtowerConfig::load(config_path).await {
        Ok(_) => {
            writer.render(&ValidationResult {
                path: config_path.display().to_string(),
                valid: true,
                error: None,
            })?;
            Ok(())
        }
        Err(e) => {
            writer.render(&ValidationResult {
                path: config_path.display().to_string(),
                valid: false,
                error: Some(e.to_string()),
            })?;
            Err(CliError::Config(e.to_string()))
        }
    }
}

async fn execute_show(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    let config = super::load_config(config_path).await?;
    let rendered =
        toml::to_string_pretty(&config).map_err(|e| CliError::Command(e.to_string()))?;
    writer.render(&EffectiveConfig {
        path: config_path.display().to_string(),
        toml: rendered,
        config,
    })?;
    Ok(())
}

#[derive(Serialize)]
pub struct ValidationResult {
    pub path: String,
    pub valid: bool,
    pub error: Option<String>,
}

impl Render for ValidationResult {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.valid {
            writeln!(w, "{} {} is valid", "OK".green().bold(), self.path)?;
        } else {
            writeln!(w, "{} {} is invalid", "ERROR".red().bold(), self.path)?;
            if let Some(error) = &self.error {
                writeln!(w, "  {error}")?;
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
pub struct EffectiveConfig {
    pub path: String,
    #[serde(skip)]
    pub toml: String,
    #[serde(flatten)]
    pub config: WatchtowerConfig,
}

impl Render for EffectiveConfig {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "# effective configuration ({})", self.path)?;
        write!(w, "{}", self.toml)?;
        Ok(())
    }
}
