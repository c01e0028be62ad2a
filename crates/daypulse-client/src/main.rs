//! daypulse CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;

use daypulse_client::cli::{Cli, Command};
use daypulse_client::config::ClientConfig;
use daypulse_client::error::{ClientError, ClientResult};
use daypulse_core::tracing::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default().with_level(Level::WARN)
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = if let Some(ref path) = cli.config {
        ClientConfig::load_from(path).map_err(ClientError::Config)?
    } else {
        ClientConfig::load().unwrap_or_default()
    };

    match cli.command {
        Command::Auth {
            client_id,
            client_secret,
            credentials_file,
            redirect_uri,
        } => {
            daypulse_client::commands::auth::run(
                client_id,
                client_secret,
                credentials_file,
                redirect_uri,
                &config,
            )
            .await
        }
        Command::Sample { date, output_dir } => {
            daypulse_client::commands::sample::one_day(date, output_dir, &config).await
        }
        Command::SamplePeriod { start, output_dir } => {
            daypulse_client::commands::sample::period(start, output_dir, &config).await
        }
    }
}
