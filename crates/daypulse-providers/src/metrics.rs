//! Provider-agnostic metric models.
//!
//! These are the typed shapes the collection flow works with, decoupled from
//! any provider's wire format. The Fitbit client parses API responses into
//! these; the shaping helpers in [`crate::shape`] turn them into table rows.

use std::fmt;

use serde::Deserialize;

/// The intraday activity categories collected for every sampled day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntradayActivity {
    Heart,
    Steps,
    Distance,
    Floors,
    Elevation,
}

impl IntradayActivity {
    /// All categories, in collection order.
    pub const ALL: [IntradayActivity; 5] = [
        IntradayActivity::Heart,
        IntradayActivity::Steps,
        IntradayActivity::Distance,
        IntradayActivity::Floors,
        IntradayActivity::Elevation,
    ];

    /// The lowercase resource name used in API paths and file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heart => "heart",
            Self::Steps => "steps",
            Self::Distance => "distance",
            Self::Floors => "floors",
            Self::Elevation => "elevation",
        }
    }

    /// The capitalized label used in the summary table's Activity column.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Heart => "Heart",
            Self::Steps => "Steps",
            Self::Distance => "Distance",
            Self::Floors => "Floors",
            Self::Elevation => "Elevation",
        }
    }
}

impl fmt::Display for IntradayActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One minute-resolution sample of an intraday series.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IntradayPoint {
    /// Time of day, `HH:MM:SS`.
    pub time: String,
    /// The sampled value; numeric representation is preserved as sent.
    pub value: serde_json::Number,
}

/// One heart-rate zone of a day summary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateZone {
    /// Zone name, e.g. "Fat Burn".
    pub name: String,
    /// Minutes spent in the zone.
    pub minutes: serde_json::Number,
    /// Calories burned in the zone.
    pub calories_out: serde_json::Number,
}

/// The day summary attached to an intraday response.
#[derive(Debug, Clone, PartialEq)]
pub enum DaySummary {
    /// Heart days summarize as a zone breakdown.
    HeartZones(Vec<HeartRateZone>),
    /// Every other activity summarizes as one scalar.
    Scalar(String),
}

/// One day of one intraday activity: the minute series plus its summary.
#[derive(Debug, Clone, PartialEq)]
pub struct IntradayDay {
    /// Which activity this is.
    pub activity: IntradayActivity,
    /// The summary's date, `YYYY-MM-DD` as reported by the provider.
    pub date: String,
    /// The day summary.
    pub summary: DaySummary,
    /// The minute-resolution series.
    pub dataset: Vec<IntradayPoint>,
}

/// One sleep-stage interval of a night.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepStage {
    /// Interval start timestamp.
    pub date_time: String,
    /// Stage name: deep, light, rem or wake.
    pub level: String,
    /// Interval length in seconds.
    pub seconds: u32,
}

/// Minutes per sleep stage across the night.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepStageMinutes {
    pub deep: u32,
    pub light: u32,
    pub rem: u32,
    pub wake: u32,
}

/// The night's sleep totals.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepSummary {
    /// Minutes per stage.
    pub stages: SleepStageMinutes,
    /// Total minutes asleep.
    pub total_minutes_asleep: u32,
    /// Total minutes in bed.
    pub total_time_in_bed: u32,
}

/// One night of sleep: the stage series plus the totals.
#[derive(Debug, Clone, PartialEq)]
pub struct SleepDay {
    /// The stage intervals, in order.
    pub stages: Vec<SleepStage>,
    /// The night's totals.
    pub summary: SleepSummary,
}

/// One logged body-weight measurement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeightSample {
    /// Weight in the account's unit system.
    pub weight: f64,
}
