//! Integration tests for the Fitbit provider against a stubbed API.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use daypulse_providers::fitbit::{
    ClientCredentials, FitbitConfig, FitbitProvider, RefreshHook, TokenRecord,
};
use daypulse_providers::{
    DaySummary, FitnessProvider, IntradayActivity, ProviderErrorCode,
};

fn sample_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 6, 1).unwrap()
}

fn config(api_base: &str) -> FitbitConfig {
    FitbitConfig::new(ClientCredentials::new("23ABCD", "secret")).with_api_base(api_base)
}

fn token(access_token: &str, expires_at: f64) -> TokenRecord {
    TokenRecord {
        access_token: access_token.to_string(),
        refresh_token: "the-refresh-token".to_string(),
        expires_at,
        scope: None,
        token_type: Some("Bearer".to_string()),
        user_id: None,
        extra: serde_json::Map::new(),
    }
}

fn fresh_token(access_token: &str) -> TokenRecord {
    token(access_token, 4102444800.0)
}

fn expired_token(access_token: &str) -> TokenRecord {
    token(access_token, 1000.0)
}

fn steps_body() -> serde_json::Value {
    serde_json::json!({
        "activities-steps": [{"dateTime": "2023-06-01", "value": "12000"}],
        "activities-steps-intraday": {
            "dataset": [
                {"time": "00:00:00", "value": 0},
                {"time": "00:01:00", "value": 12}
            ]
        }
    })
}

fn refreshed_token_body() -> serde_json::Value {
    serde_json::json!({
        "access_token": "fresh-at",
        "refresh_token": "fresh-rt",
        "expires_in": 28800,
        "token_type": "Bearer",
        "user_id": "ABC123"
    })
}

fn capture_hook() -> (RefreshHook, Arc<Mutex<Vec<String>>>) {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let hook: RefreshHook = Box::new(move |record: &TokenRecord| {
        sink.lock().unwrap().push(record.access_token.clone());
    });
    (hook, seen)
}

#[tokio::test]
async fn intraday_series_sends_bearer_token_and_parses() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1/user/-/activities/steps/date/2023-06-01/1d/1min.json"))
        .and(header("authorization", "Bearer valid-at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(steps_body()))
        .mount(&server)
        .await;

    let provider = FitbitProvider::new(config(&server.uri()), fresh_token("valid-at"), None).unwrap();
    let day = provider
        .intraday_series(IntradayActivity::Steps, sample_date())
        .await
        .unwrap();

    assert_eq!(day.date, "2023-06-01");
    assert_eq!(day.dataset.len(), 2);
    assert_eq!(day.summary, DaySummary::Scalar("12000".to_string()));
}

#[tokio::test]
async fn expired_token_is_refreshed_and_hook_invoked() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refreshed_token_body()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/1/user/-/activities/steps/date/2023-06-01/1d/1min.json"))
        .and(header("authorization", "Bearer fresh-at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(steps_body()))
        .mount(&server)
        .await;

    let (hook, seen) = capture_hook();
    let provider =
        FitbitProvider::new(config(&server.uri()), expired_token("stale-at"), Some(hook)).unwrap();

    provider
        .intraday_series(IntradayActivity::Steps, sample_date())
        .await
        .unwrap();

    // The hook received the complete new record before the resource call.
    assert_eq!(*seen.lock().unwrap(), vec!["fresh-at".to_string()]);
    assert_eq!(provider.token().access_token, "fresh-at");
    assert_eq!(provider.token().refresh_token, "fresh-rt");
}

#[tokio::test]
async fn rejected_token_is_refreshed_and_retried_once() {
    let server = MockServer::start().await;

    // First resource call is rejected, the retry succeeds.
    Mock::given(method("GET"))
        .and(path("/1/user/-/activities/heart/date/2023-06-01/1d/1min.json"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refreshed_token_body()))
        .expect(1)
        .mount(&server)
        .await;

    let heart_body = serde_json::json!({
        "activities-heart": [{
            "dateTime": "2023-06-01",
            "value": {"heartRateZones": [
                {"caloriesOut": 1755.57, "minutes": 1344, "name": "Out of Range"}
            ]}
        }],
        "activities-heart-intraday": {"dataset": [{"time": "00:00:00", "value": 62}]}
    });
    Mock::given(method("GET"))
        .and(path("/1/user/-/activities/heart/date/2023-06-01/1d/1min.json"))
        .and(header("authorization", "Bearer fresh-at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(heart_body))
        .mount(&server)
        .await;

    let (hook, seen) = capture_hook();
    let provider =
        FitbitProvider::new(config(&server.uri()), fresh_token("revoked-at"), Some(hook)).unwrap();

    let day = provider
        .intraday_series(IntradayActivity::Heart, sample_date())
        .await
        .unwrap();

    assert!(matches!(day.summary, DaySummary::HeartZones(ref zones) if zones.len() == 1));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn sleep_log_without_records_is_data_shape_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1.2/user/-/sleep/date/2023-06-01.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sleep": [],
            "summary": {"totalMinutesAsleep": 0, "totalSleepRecords": 0, "totalTimeInBed": 0}
        })))
        .mount(&server)
        .await;

    let provider = FitbitProvider::new(config(&server.uri()), fresh_token("valid-at"), None).unwrap();
    let err = provider.sleep_log(sample_date()).await.unwrap_err();
    assert_eq!(err.code(), ProviderErrorCode::DataShape);
}

#[tokio::test]
async fn missing_weight_sample_is_none_not_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1/user/-/body/log/weight/date/2023-06-01.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"weight": []})))
        .mount(&server)
        .await;

    let provider = FitbitProvider::new(config(&server.uri()), fresh_token("valid-at"), None).unwrap();
    let sample = provider.body_weight(sample_date()).await.unwrap();
    assert!(sample.is_none());
}

#[tokio::test]
async fn server_error_propagates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1/user/-/body/log/weight/date/2023-06-01.json"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let provider = FitbitProvider::new(config(&server.uri()), fresh_token("valid-at"), None).unwrap();
    let err = provider.body_weight(sample_date()).await.unwrap_err();
    assert_eq!(err.code(), ProviderErrorCode::ServerError);
}

#[tokio::test]
async fn user_profile_returns_full_name() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1/user/-/profile.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "user": {"fullName": "Ada Lovelace"}
        })))
        .mount(&server)
        .await;

    let provider = FitbitProvider::new(config(&server.uri()), fresh_token("valid-at"), None).unwrap();
    let profile = provider.user_profile().await.unwrap();
    assert_eq!(profile.full_name, "Ada Lovelace");
}
