//! Single-day and period collection.
//!
//! The collector drives a [`FitnessProvider`] for one date at a time and
//! materializes the results as CSV tables: one intraday file per activity,
//! one sleep file, and appended rows in the cumulative summary. Everything
//! is sequential; a failure aborts the current date (and, in a period run,
//! the remaining days).

use chrono::NaiveDate;
use tracing::info;

use daypulse_core::table::DataDir;
use daypulse_core::time::days_until_today;
use daypulse_providers::{FitnessProvider, IntradayActivity, shape};

use crate::error::ClientResult;

/// Collects per-day metrics into an output directory.
pub struct Collector<'a> {
    provider: &'a dyn FitnessProvider,
    data: DataDir,
}

impl<'a> Collector<'a> {
    /// Creates a collector writing into `data`.
    pub fn new(provider: &'a dyn FitnessProvider, data: DataDir) -> Self {
        Self { provider, data }
    }

    /// Samples one calendar date.
    ///
    /// Re-sampling a date rewrites its per-day files and appends duplicate
    /// summary rows; that is documented behavior, not a bug.
    pub async fn sample_day(&self, date: NaiveDate) -> ClientResult<()> {
        info!("sampling {} from {}", date, self.provider.name());

        let mut summary = Vec::new();
        for activity in IntradayActivity::ALL {
            let day = self.provider.intraday_series(activity, date).await?;
            self.data
                .write_intraday(date, activity.as_str(), &shape::intraday_rows(&day))?;
            summary.extend(shape::activity_summary_rows(&day));
        }
        self.data.append_summary(&summary)?;

        let sleep = self.provider.sleep_log(date).await?;
        self.data.write_sleep(date, &shape::sleep_rows(&sleep))?;
        self.data
            .append_summary(&shape::sleep_summary_rows(&sleep, date))?;

        match self.provider.body_weight(date).await? {
            Some(sample) => {
                self.data
                    .append_summary(&[shape::weight_row(&sample, date)])?;
            }
            None => info!("no weight sample for {}", date),
        }

        Ok(())
    }

    /// Samples every day from `start` up to (excluding) today, in order.
    ///
    /// Runs sequentially with no resumption checkpoint: a failure aborts
    /// the remaining days.
    pub async fn sample_period(&self, start: NaiveDate) -> ClientResult<()> {
        let days = days_until_today(start);
        if days.is_empty() {
            info!("nothing to sample before today from {}", start);
            return Ok(());
        }

        info!("sampling {} days starting {}", days.len(), start);
        for date in days {
            self.sample_day(date).await?;
        }
        Ok(())
    }
}
