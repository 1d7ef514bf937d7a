//! `watchtower rules` command handler

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use watchtower_core::config::WatchtowerConfig;
use watchtower_pipeline::RuleLoader;

use crate::cli::{RulesAction, RulesArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `rules` command.
pub async fn execute(
    config: &WatchtowerConfig,
    args: RulesArgs,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        RulesAction::List => execute_list(config, writer).await,
        RulesAction::Validate { path } => {
            let dir = path.unwrap_or_else(|| PathBuf::from(&config.monitor.rule_dir));
            execute_validate(dir, writer).await
        }
    }
}

async fn execute_list(config: &WatchtowerConfig, writer: &OutputWriter) -> Result<(), CliError> {
    info!(rule_dir = %config.monitor.rule_dir, "loading detection rules");
    let report = RuleLoader::load_directory(&config.monitor.rule_dir).await;

    let payload = RuleListReport {
        total: report.rules.len(),
        rules: report
            .rules
            .into_iter()
            .map(|r| RuleEntry {
                id: r.id,
                log_type: r.log_type,
                match_type: r.match_type.to_string(),
                severity: r.severity,
                pattern: r.pattern,
            })
            .collect(),
    };

    writer.render(&payload)?;
    Ok(())
}

async fn execute_validate(dir: PathBuf, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %dir.display(), "validating detection rules");
    let report = RuleLoader::load_directory(&dir).await;

    let payload = RuleValidationReport {
        path: dir.display().to_string(),
        valid: report.rules.len(),
        invalid: report.warnings.len(),
        warnings: report
            .warnings
            .iter()
            .map(|w| RuleError {
                origin: w.origin.clone(),
                error: w.reason.clone(),
            })
            .collect(),
    };
    let invalid = payload.invalid;

    writer.render(&payload)?;

    if invalid > 0 {
        return Err(CliError::Command(format!("{invalid} invalid rule record(s)")));
    }
    Ok(())
}

#[derive(Serialize)]
pub struct RuleListReport {
    pub total: usize,
    pub rules: Vec<RuleEntry>,
}

#[derive(Serialize)]
pub struct RuleEntry {
    pub id: String,
    pub log_type: String,
    pub match_type: String,
    pub severity: String,
    pub pattern: String,
}

impl Render for RuleListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Detection Rules ({} total)",
            self.total.to_string().bold()
        )?;
        writeln!(w)?;
        writeln!(
            w,
            "{:<25} {:<10} {:<10} {:<10} Pattern",
            "ID", "Source", "Match", "Severity"
        )?;
        writeln!(w, "{}", "-".repeat(80))?;

        for r in &self.rules {
            writeln!(
                w,
                "{:<25} {:<10} {:<10} {:<10} {}",
                r.id, r.log_type, r.match_type, r.severity, r.pattern
            )?;
        }

        Ok(())
    }
}

#[derive(Serialize)]
pub struct RuleValidationReport {
    pub path: String,
    pub valid: usize,
    pub invalid: usize,
    pub warnings: Vec<RuleError>,
}

#[derive(Serialize)]
pub struct RuleError {
    pub origin: String,
    pub error: String,
}

impl Render for RuleValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Rule Validation: {}", self.path.bold())?;
        writeln!(
            w,
            "  {} valid, {} invalid",
            self.valid.to_string().green(),
            if self.invalid > 0 {
                self.invalid.to_string().red()
            } else {
                self.invalid.to_string().normal()
            }
        )?;

        if !self.warnings.is_empty() {
            writeln!(w)?;
            writeln!(w, "Warnings:")?;
            for warning in &self.warnings {
                writeln!(w, "  {}: {}", warning.origin.red(), warning.error)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_report_renders_warnings() {
        let report = RuleValidationReport {
            path: "/etc/watchtower/rules".to_owned(),
            valid: 2,
            invalid: 1,
            warnings: vec![RuleError {
                origin: "bad.yaml".to_owned(),
                error: "YAML parse error".to_owned(),
            }],
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("2"));
        assert!(output.contains("bad.yaml"));
        assert!(output.contains("YAML parse error"));
    }

    #[test]
    fn list_report_renders_rule_rows() {
        let report = RuleListReport {
            total: 1,
            rules: vec![RuleEntry {
                id: "ssh_failed".to_owned(),
                log_type: "auth".to_owned(),
                match_type: "contains".to_owned(),
                severity: "high".to_owned(),
                pattern: "Failed password".to_owned(),
            }],
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("ssh_failed"));
        assert!(output.contains("contains"));
        assert!(output.contains("Failed password"));
    }
}
