//! FitnessProvider trait and the Fitbit implementation.
//!
//! This crate provides the abstraction layer between the collection flow
//! and the metrics backend:
//!
//! - [`FitnessProvider`] - The trait the collection flow drives
//! - [`metrics`] - Provider-agnostic metric models
//! - [`shape`] - Flattening metrics into table rows
//! - [`ProviderError`] - Error types for provider operations
//! - [`fitbit`] - The Fitbit Web API implementation, including the OAuth
//!   authorization flow and credential persistence
//!
//! # Example
//!
//! ```ignore
//! use daypulse_providers::{FitnessProvider, IntradayActivity, shape};
//!
//! async fn pull_steps(provider: &dyn FitnessProvider, date: chrono::NaiveDate) {
//!     let day = provider
//!         .intraday_series(IntradayActivity::Steps, date)
//!         .await?;
//!     let rows = shape::intraday_rows(&day);
//!     // write rows ...
//! }
//! ```

pub mod error;
pub mod fitbit;
pub mod metrics;
pub mod provider;
pub mod shape;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use metrics::{
    DaySummary, HeartRateZone, IntradayActivity, IntradayDay, IntradayPoint, SleepDay,
    SleepStage, SleepStageMinutes, SleepSummary, WeightSample,
};
pub use provider::{BoxFuture, FitnessProvider};
