//! FitnessProvider trait definition.
//!
//! This module defines the [`FitnessProvider`] trait, the abstraction the
//! collection flow drives. The production implementation talks to the Fitbit
//! Web API; tests substitute a stub returning fixtures.

use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;

use crate::error::ProviderResult;
use crate::metrics::{IntradayActivity, IntradayDay, SleepDay, WeightSample};

/// A boxed future, as returned by provider trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A source of per-day fitness metrics.
///
/// All calls are blocking from the collection flow's point of view; there is
/// no batching and no concurrency across requests.
pub trait FitnessProvider: Send + Sync {
    /// A short name for logs, e.g. `"fitbit"`.
    fn name(&self) -> &str;

    /// Fetches the minute-resolution series and day summary for one
    /// activity on one date.
    fn intraday_series(
        &self,
        activity: IntradayActivity,
        date: NaiveDate,
    ) -> BoxFuture<'_, ProviderResult<IntradayDay>>;

    /// Fetches the sleep log for one date.
    ///
    /// A date without any recorded sleep is a data-shape error.
    fn sleep_log(&self, date: NaiveDate) -> BoxFuture<'_, ProviderResult<SleepDay>>;

    /// Fetches the body-weight sample logged on one date, if any.
    ///
    /// `Ok(None)` means no weight was logged that day; that is not an error.
    fn body_weight(&self, date: NaiveDate)
    -> BoxFuture<'_, ProviderResult<Option<WeightSample>>>;
}
