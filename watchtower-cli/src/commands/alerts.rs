//! `watchtower alerts` command handler -- query stored alerts

use std::io::Write;

use serde::Serialize;

use watchtower_core::config::WatchtowerConfig;
use watchtower_core::pipeline::AlertSink;
use watchtower_core::types::StoredAlert;
use watchtower_pipeline::JsonlAlertSink;

use crate::cli::AlertsArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `alerts` command.
pub async fn execute(
    config: &WatchtowerConfig,
    args: AlertsArgs,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let sink = JsonlAlertSink::open(&config.general.data_dir).await?;
    let limit = args.limit.unwrap_or(config.monitor.query_limit);

    let alerts = sink.query_alerts(args.severity.as_deref(), limit).await?;

    writer.render(&AlertListReport {
        total: alerts.len(),
        severity: args.severity,
        alerts,
    })?;
    Ok(())
}

/// Output payload for the alert query.
#[derive(Serialize)]
pub struct AlertListReport {
    pub total: usize,
    pub severity: Option<String>,
    pub alerts: Vec<StoredAlert>,
}

impl Render for AlertListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        match &self.severity {
            Some(filter) => writeln!(
                w,
                "Alerts ({} total, severity = {})",
                self.total.to_string().bold(),
                filter
            )?,
            None => writeln!(w, "Alerts ({} total)", self.total.to_string().bold())?,
        }

        if self.alerts.is_empty() {
            writeln!(w, "No alerts stored.")?;
            return Ok(());
        }

        writeln!(w)?;
        writeln!(
            w,
            "{:<6} {:<20} {:<20} {:<10} {:<16} {:<12} Message",
            "Seq", "Time", "Rule", "Severity", "Source IP", "User"
        )?;
        writeln!(w, "{}", "-".repeat(110))?;

        for alert in &self.alerts {
            let severity_colored = match alert.severity.to_ascii_lowercase().as_str() {
                "high" => alert.severity.red(),
                "medium" => alert.severity.yellow(),
                "low" => alert.severity.normal(),
                _ => alert.severity.cyan(),
            };

            writeln!(
                w,
                "{:<6} {:<20} {:<20} {:<10} {:<16} {:<12} {}",
                alert.seq,
                alert.timestamp.format("%Y-%m-%d %H:%M:%S"),
                alert.rule_id,
                severity_colored,
                alert.src_ip,
                alert.user,
                alert.message,
            )?;
        }

        Ok(())
    }
}
