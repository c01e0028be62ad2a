//! Command-line interface definition.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// daypulse - Pull your daily Fitbit metrics into CSV tables
#[derive(Debug, Parser)]
#[command(name = "daypulse")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "DAYPULSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authorize against the Fitbit API and persist the issued credentials
    Auth {
        /// OAuth client ID from the Fitbit developer console
        #[arg(long, env = "FITBIT_CLIENT_ID")]
        client_id: Option<String>,

        /// OAuth client secret from the Fitbit developer console
        #[arg(long, env = "FITBIT_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Path to a JSON file holding client_id/client_secret
        #[arg(long)]
        credentials_file: Option<PathBuf>,

        /// Redirect URI registered for the application
        #[arg(long)]
        redirect_uri: Option<String>,
    },

    /// Sample one day of metrics into CSV tables
    Sample {
        /// Date to sample (YYYY-MM-DD); defaults to yesterday
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Directory for the CSV output
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Sample every day from START up to (excluding) today
    SamplePeriod {
        /// First date to sample (YYYY-MM-DD)
        start: NaiveDate,

        /// Directory for the CSV output
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}
