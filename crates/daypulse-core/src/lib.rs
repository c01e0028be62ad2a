//! Core types: dates, tabular records, CSV tables, tracing setup

pub mod table;
pub mod time;
pub mod tracing;

pub use table::{DataDir, SleepStageRow, SummaryRow, TableError, TimeValueRow};
pub use time::{days_until_today, yesterday};
pub use self::tracing::{TracingConfig, TracingError, init_tracing};
