//! Collection commands.

use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{info, warn};

use daypulse_core::table::DataDir;
use daypulse_core::time::yesterday;
use daypulse_providers::fitbit::{
    ClientCredentials, FitbitConfig, FitbitProvider, RefreshHook, TokenStore,
};

use crate::collect::Collector;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Samples one day of metrics.
///
/// The date defaults to yesterday in local time.
pub async fn one_day(
    date: Option<NaiveDate>,
    output_dir: Option<PathBuf>,
    config: &ClientConfig,
) -> ClientResult<()> {
    let provider = build_provider(config)?;
    let data = DataDir::create(output_dir.unwrap_or_else(|| config.storage.data_dir()))?;
    let date = date.unwrap_or_else(yesterday);

    Collector::new(&provider, data).sample_day(date).await
}

/// Samples every day from `start` up to (excluding) today.
pub async fn period(
    start: NaiveDate,
    output_dir: Option<PathBuf>,
    config: &ClientConfig,
) -> ClientResult<()> {
    let provider = build_provider(config)?;
    let data = DataDir::create(output_dir.unwrap_or_else(|| config.storage.data_dir()))?;

    Collector::new(&provider, data).sample_period(start).await
}

/// Builds the provider from the persisted credential records.
///
/// The refresh hook keeps the token file current: whenever the provider
/// silently renews the access token, the complete new record replaces the
/// old file so the next run starts from it.
fn build_provider(config: &ClientConfig) -> ClientResult<FitbitProvider> {
    let client_path = config.storage.client_file();
    let credentials = ClientCredentials::load_from(&client_path).map_err(|e| {
        ClientError::AuthRequired(format!("{} (run 'daypulse auth' first)", e))
    })?;

    let store = TokenStore::new(config.storage.token_file());
    let token = store
        .load()
        .map_err(|e| ClientError::AuthRequired(format!("{} (run 'daypulse auth' first)", e)))?;

    let mut fitbit_config =
        FitbitConfig::new(credentials).with_token_path(config.storage.token_file());
    if let Some(uri) = config.fitbit.as_ref().and_then(|f| f.redirect_uri.clone()) {
        fitbit_config = fitbit_config.with_redirect_uri(&uri)?;
    }

    let on_refresh: RefreshHook = Box::new(move |record| {
        info!("token refreshed since last run; persisting the new record");
        if let Err(e) = store.save(record) {
            warn!("failed to persist refreshed token: {}", e);
        }
    });

    Ok(FitbitProvider::new(fitbit_config, token, Some(on_refresh))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageSettings;

    #[test]
    fn build_provider_without_credentials_requires_auth() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            storage: StorageSettings {
                client_file: Some(tmp.path().join("client_details.json")),
                token_file: Some(tmp.path().join("user_details.json")),
                data_dir: Some(tmp.path().join("data")),
            },
            ..Default::default()
        };

        match build_provider(&config) {
            Err(ClientError::AuthRequired(msg)) => {
                assert!(msg.contains("daypulse auth"));
            }
            other => panic!("unexpected outcome: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn build_provider_with_persisted_records() {
        let tmp = tempfile::tempdir().unwrap();
        let client_file = tmp.path().join("client_details.json");
        let token_file = tmp.path().join("user_details.json");

        ClientCredentials::new("23ABCD", "secret")
            .save_to(&client_file)
            .unwrap();
        std::fs::write(
            &token_file,
            r#"{"access_token": "at", "refresh_token": "rt", "expires_at": 4102444800.0}"#,
        )
        .unwrap();

        let config = ClientConfig {
            storage: StorageSettings {
                client_file: Some(client_file),
                token_file: Some(token_file),
                data_dir: Some(tmp.path().join("data")),
            },
            ..Default::default()
        };

        assert!(build_provider(&config).is_ok());
    }
}
