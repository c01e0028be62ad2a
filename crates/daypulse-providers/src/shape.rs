//! Shaping metrics into table rows.
//!
//! The counterpart of the metric models: flattens provider shapes into the
//! row types the table writer persists. Heart days fan out into two summary
//! rows per zone; every other activity contributes a single scalar row.

use chrono::NaiveDate;

use daypulse_core::table::{SleepStageRow, SummaryRow, TimeValueRow};

use crate::metrics::{DaySummary, IntradayDay, SleepDay, WeightSample};

/// Category value for activity summary rows.
const CATEGORY_ACTIVITY: &str = "Activity";
/// Category value for sleep summary rows.
const CATEGORY_SLEEP: &str = "Sleep";
/// Category value for the body-weight summary row.
const CATEGORY_BODY: &str = "Body";

/// Flattens an intraday series into `{Time, Value}` rows.
pub fn intraday_rows(day: &IntradayDay) -> Vec<TimeValueRow> {
    day.dataset
        .iter()
        .map(|point| TimeValueRow {
            time: point.time.clone(),
            value: point.value.to_string(),
        })
        .collect()
}

/// Builds the summary rows for one activity day.
///
/// Heart days produce a `{zone} - minutes` and a `{zone} - calories` row per
/// heart-rate zone; other activities produce one row labeled with the
/// capitalized activity name.
pub fn activity_summary_rows(day: &IntradayDay) -> Vec<SummaryRow> {
    match &day.summary {
        DaySummary::HeartZones(zones) => zones
            .iter()
            .flat_map(|zone| {
                [
                    SummaryRow::new(
                        &day.date,
                        CATEGORY_ACTIVITY,
                        format!("{} - minutes", zone.name),
                        zone.minutes.to_string(),
                    ),
                    SummaryRow::new(
                        &day.date,
                        CATEGORY_ACTIVITY,
                        format!("{} - calories", zone.name),
                        zone.calories_out.to_string(),
                    ),
                ]
            })
            .collect(),
        DaySummary::Scalar(value) => vec![SummaryRow::new(
            &day.date,
            CATEGORY_ACTIVITY,
            day.activity.label(),
            value,
        )],
    }
}

/// Flattens a night's stage intervals into `{Time, Level, Seconds}` rows.
pub fn sleep_rows(sleep: &SleepDay) -> Vec<SleepStageRow> {
    sleep
        .stages
        .iter()
        .map(|stage| SleepStageRow {
            time: stage.date_time.clone(),
            level: stage.level.clone(),
            seconds: stage.seconds,
        })
        .collect()
}

/// Builds the six sleep summary rows for one sampled date.
pub fn sleep_summary_rows(sleep: &SleepDay, date: NaiveDate) -> Vec<SummaryRow> {
    let date = date.to_string();
    let summary = &sleep.summary;
    [
        ("Stage - Deep", summary.stages.deep),
        ("Stage - Light", summary.stages.light),
        ("Stage - REM", summary.stages.rem),
        ("Stage - Wake", summary.stages.wake),
        ("totalMinAsleep", summary.total_minutes_asleep),
        ("totalMinBed", summary.total_time_in_bed),
    ]
    .into_iter()
    .map(|(activity, value)| SummaryRow::new(&date, CATEGORY_SLEEP, activity, value.to_string()))
    .collect()
}

/// Builds the single body-weight summary row for one sampled date.
pub fn weight_row(sample: &WeightSample, date: NaiveDate) -> SummaryRow {
    SummaryRow::new(
        date.to_string(),
        CATEGORY_BODY,
        "Weight",
        sample.weight.to_string(),
    )
}
