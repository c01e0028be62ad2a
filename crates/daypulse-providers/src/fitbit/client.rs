//! Fitbit Web API client.
//!
//! Low-level HTTP client for the resource endpoints: builds authenticated
//! requests, maps response statuses, and parses bodies into metric models.
//! Token freshness is the caller's concern; this client just sends whatever
//! access token it currently holds.

use std::time::Duration;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::metrics::{
    DaySummary, IntradayActivity, IntradayDay, IntradayPoint, SleepDay, SleepStage, SleepSummary,
    WeightSample,
};

/// The authorized user's profile, as far as we care about it.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    /// The account's display name.
    pub full_name: String,
}

/// Authenticated HTTP client for the Fitbit Web API.
#[derive(Debug)]
pub struct FitbitApiClient {
    http_client: reqwest::Client,
    access_token: String,
    api_base: String,
}

impl FitbitApiClient {
    /// Creates a new API client with the given access token.
    pub fn new(
        access_token: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
            api_base: api_base.into(),
        })
    }

    /// Updates the access token (after a refresh).
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    /// Fetches the minute series and day summary for one activity.
    pub async fn intraday_series(
        &self,
        activity: IntradayActivity,
        date: NaiveDate,
    ) -> ProviderResult<IntradayDay> {
        let path = format!("/1/user/-/activities/{activity}/date/{date}/1d/1min.json");
        let body = self.get_json(&path).await?;
        parse_intraday(activity, &body)
    }

    /// Fetches the sleep log for one date.
    pub async fn sleep_log(&self, date: NaiveDate) -> ProviderResult<SleepDay> {
        let path = format!("/1.2/user/-/sleep/date/{date}.json");
        let body = self.get_json(&path).await?;
        parse_sleep(&body)
    }

    /// Fetches the weight sample logged on one date, if any.
    pub async fn body_weight(&self, date: NaiveDate) -> ProviderResult<Option<WeightSample>> {
        let path = format!("/1/user/-/body/log/weight/date/{date}.json");
        let body = self.get_json(&path).await?;
        parse_weight(&body)
    }

    /// Fetches the authorized user's profile.
    pub async fn user_profile(&self) -> ProviderResult<UserProfile> {
        let body = self.get_json("/1/user/-/profile.json").await?;
        parse_profile(&body)
    }

    /// Issues one authenticated GET and decodes the JSON body.
    async fn get_json(&self, path: &str) -> ProviderResult<Value> {
        let url = format!("{}{}", self.api_base, path);
        debug!("GET {}", path);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network("request timeout")
                } else if e.is_connect() {
                    ProviderError::network(format!("connection failed: {}", e))
                } else {
                    ProviderError::network(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::authentication(
                "access token expired or invalid",
            ));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(ProviderError::rate_limited(format!(
                "rate limit exceeded{}",
                retry_after
                    .map(|s| format!(", retry after {} seconds", s))
                    .unwrap_or_default()
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::server(format!(
                "API error ({}): {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("failed to parse response: {}", e)))
    }
}

/// Parses an intraday time-series response.
///
/// The payload keys embed the activity name (`activities-heart-intraday`),
/// so the body is navigated dynamically before the typed models take over.
fn parse_intraday(activity: IntradayActivity, body: &Value) -> ProviderResult<IntradayDay> {
    let intraday_key = format!("activities-{}-intraday", activity);
    let dataset_value = body
        .get(&intraday_key)
        .and_then(|v| v.get("dataset"))
        .ok_or_else(|| {
            ProviderError::data_shape(format!("response is missing {}.dataset", intraday_key))
        })?;
    let dataset: Vec<IntradayPoint> = serde_json::from_value(dataset_value.clone())
        .map_err(|e| ProviderError::invalid_response(format!("malformed intraday dataset: {}", e)))?;

    let summary_key = format!("activities-{}", activity);
    let summary_value = body
        .get(&summary_key)
        .and_then(|v| v.get(0))
        .ok_or_else(|| {
            ProviderError::data_shape(format!("response is missing the {} day summary", summary_key))
        })?;
    let date = summary_value
        .get("dateTime")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::data_shape("day summary is missing dateTime"))?
        .to_string();

    let summary = match activity {
        IntradayActivity::Heart => {
            let zones = summary_value
                .pointer("/value/heartRateZones")
                .ok_or_else(|| {
                    ProviderError::data_shape("heart summary is missing heartRateZones")
                })?;
            let zones = serde_json::from_value(zones.clone()).map_err(|e| {
                ProviderError::invalid_response(format!("malformed heart rate zones: {}", e))
            })?;
            DaySummary::HeartZones(zones)
        }
        _ => {
            let value = summary_value
                .get("value")
                .ok_or_else(|| ProviderError::data_shape("day summary is missing value"))?;
            DaySummary::Scalar(scalar_to_string(value))
        }
    };

    Ok(IntradayDay {
        activity,
        date,
        summary,
        dataset,
    })
}

/// Parses a sleep-log response.
///
/// Only the first sleep log of the date is considered, matching the
/// upstream data model where the main sleep comes first.
fn parse_sleep(body: &Value) -> ProviderResult<SleepDay> {
    let first = body
        .get("sleep")
        .and_then(|v| v.get(0))
        .ok_or_else(|| ProviderError::data_shape("no sleep log recorded for this date"))?;
    let data = first
        .pointer("/levels/data")
        .ok_or_else(|| ProviderError::data_shape("sleep log is missing levels.data"))?;
    let stages: Vec<SleepStage> = serde_json::from_value(data.clone())
        .map_err(|e| ProviderError::invalid_response(format!("malformed sleep stages: {}", e)))?;

    let summary_value = body
        .get("summary")
        .ok_or_else(|| ProviderError::data_shape("sleep response is missing summary"))?;
    let summary: SleepSummary = serde_json::from_value(summary_value.clone())
        .map_err(|e| ProviderError::data_shape(format!("incomplete sleep summary: {}", e)))?;

    Ok(SleepDay { stages, summary })
}

/// Parses a body-weight response. An empty weight list is not an error.
fn parse_weight(body: &Value) -> ProviderResult<Option<WeightSample>> {
    let list = body
        .get("weight")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::data_shape("response is missing the weight list"))?;
    match list.first() {
        Some(entry) => serde_json::from_value(entry.clone()).map(Some).map_err(|e| {
            ProviderError::invalid_response(format!("malformed weight entry: {}", e))
        }),
        None => Ok(None),
    }
}

/// Parses a profile response down to the display name.
fn parse_profile(body: &Value) -> ProviderResult<UserProfile> {
    let full_name = body
        .pointer("/user/fullName")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::data_shape("profile response is missing user.fullName"))?;
    Ok(UserProfile {
        full_name: full_name.to_string(),
    })
}

/// Renders a scalar summary value the way it arrived.
///
/// Fitbit sends non-heart summary values as strings; a bare number from a
/// lenient stub is accepted too.
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
