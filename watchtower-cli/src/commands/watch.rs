//! `watchtower watch` command handler -- continuous monitoring

use tracing::info;

use watchtower_core::config::WatchtowerConfig;

use crate::cli::WatchArgs;
use crate::error::CliError;

/// Execute the `watch` command.
///
/// Starts the monitoring loop and blocks until Ctrl-C, then stops it
/// cooperatively (an in-flight pass is allowed to finish).
pub async fn execute(config: &WatchtowerConfig, args: WatchArgs) -> Result<(), CliError> {
    let mut monitor = super::build_monitor(config).await?;

    if let Some(secs) = args.interval {
        monitor.set_interval_secs(secs);
    }

    if !monitor.start() {
        return Err(CliError::Command("monitoring already running".to_owned()));
    }
    println!(
        "Monitoring started (interval: {}s). Press Ctrl-C to stop.",
        monitor.interval_secs()
    );

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| CliError::Command(format!("failed to wait for Ctrl-C: {e}")))?;

    info!("interrupt received, stopping monitoring");
    monitor.stop().await;
    println!("Monitoring stopped.");

    Ok(())
}
