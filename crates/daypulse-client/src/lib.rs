//! CLI: authorization and collection commands
//!
//! This crate provides the `daypulse` command-line interface.

pub mod cli;
pub mod collect;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use collect::Collector;
pub use error::{ClientError, ClientResult};
