//! watchtower CLI entry point
//!
//! Parses arguments, loads configuration, initializes tracing, and
//! dispatches to the subcommand handlers. Errors are printed to stderr
//! and mapped to process exit codes via [`CliError::exit_code`].

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;

use cli::{Cli, Commands};
use error::CliError;
use output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    match cli.command {
        // `config` inspects the file itself and reports its own result,
        // so it must not require the file to load successfully up front.
        Commands::Config(args) => commands::config::execute(&cli.config, args, &writer).await,
        command => {
            let mut config = commands::load_config(&cli.config).await?;
            if let Some(level) = &cli.log_level {
                config.general.log_level = level.clone();
                config
                    .validate()
                    .map_err(|e| CliError::Config(e.to_string()))?;
            }
            logging::init_tracing(&config.general)?;

            match command {
                Commands::Run => commands::run::execute(&config, &writer).await,
                Commands::Watch(args) => commands::watch::execute(&config, args).await,
                Commands::Alerts(args) => commands::alerts::execute(&config, args, &writer).await,
                Commands::Rules(args) => commands::rules::execute(&config, args, &writer).await,
                Commands::Config(_) => unreachable!(),
            }
        }
    }
}
