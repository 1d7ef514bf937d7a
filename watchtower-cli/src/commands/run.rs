//! `watchtower run` command handler -- single pipeline pass

use std::io::Write;

use serde::Serialize;
use tracing::info;

use watchtower_core::config::WatchtowerConfig;
use watchtower_pipeline::PassSummary;

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `run` command: one full pass, then report.
pub async fn execute(config: &WatchtowerConfig, writer: &OutputWriter) -> Result<(), CliError> {
    let monitor = super::build_monitor(config).await?;

    info!("running single analysis pass");
    let summary = monitor.run_once().await?;

    writer.render(&PassReport::from_summary(&summary))?;
    Ok(())
}

/// Output payload for a completed pass.
#[derive(Serialize)]
pub struct PassReport {
    pub events: u64,
    pub alerts: u64,
    pub rules: usize,
    pub append_failures: u64,
    pub warnings: Vec<WarningEntry>,
}

#[derive(Serialize)]
pub struct WarningEntry {
    pub origin: String,
    pub reason: String,
}

impl PassReport {
    pub fn from_summary(summary: &PassSummary) -> Self {
        Self {
            events: summary.events,
            alerts: summary.alerts,
            rules: summary.rule_count,
            append_failures: summary.append_failures,
            warnings: summary
                .warnings
                .iter()
                .map(|w| WarningEntry {
                    origin: w.origin.clone(),
                    reason: w.reason.clone(),
                })
                .collect(),
        }
    }
}

impl Render for PassReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.alerts == 0 {
            writeln!(w, "Analysis complete, no alerts.")?;
        } else {
            writeln!(
                w,
                "Analysis complete, {} alerts found.",
                self.alerts.to_string().red().bold()
            )?;
        }
        writeln!(w, "  Events processed: {}", self.events)?;
        writeln!(w, "  Rules evaluated:  {}", self.rules)?;

        if self.append_failures > 0 {
            writeln!(
                w,
                "  {} record(s) failed to persist",
                self.append_failures.to_string().red()
            )?;
        }

        if !self.warnings.is_empty() {
            writeln!(w)?;
            writeln!(w, "Rule warnings:")?;
            for warning in &self.warnings {
                writeln!(w, "  {}: {}", warning.origin.yellow(), warning.reason)?;
            }
        }

        Ok(())
    }
}
