//! Fitbit provider implementation.
//!
//! This module implements the [`FitnessProvider`] trait for the Fitbit Web
//! API. It wires the raw API client to the token life cycle: before each
//! call the persisted token is checked for expiry, and a rejected token is
//! refreshed and retried once. Every silent refresh hands the complete new
//! record to the injected hook so the on-disk copy stays current.

use std::sync::Mutex;

use chrono::NaiveDate;
use tokio::sync::RwLock as TokioRwLock;
use tracing::debug;

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};
use crate::metrics::{IntradayActivity, IntradayDay, SleepDay, WeightSample};
use crate::provider::{BoxFuture, FitnessProvider};

use super::client::{FitbitApiClient, UserProfile};
use super::config::FitbitConfig;
use super::oauth::OAuthFlow;
use super::tokens::{RefreshHook, TokenRecord};

/// Fitbit metrics provider.
pub struct FitbitProvider {
    oauth: OAuthFlow,
    /// API client wrapped in a tokio RwLock so refreshes can swap the token.
    api_client: TokioRwLock<FitbitApiClient>,
    token: Mutex<TokenRecord>,
    on_refresh: Option<RefreshHook>,
}

impl FitbitProvider {
    /// Creates a provider from persisted credentials.
    ///
    /// `on_refresh` is invoked with the complete new record whenever the
    /// access token is silently renewed.
    pub fn new(
        config: FitbitConfig,
        token: TokenRecord,
        on_refresh: Option<RefreshHook>,
    ) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let api_client = FitbitApiClient::new(
            &token.access_token,
            &config.api_base,
            config.timeout,
            &config.user_agent,
        )?;
        let oauth = OAuthFlow::new(config)?;

        Ok(Self {
            oauth,
            api_client: TokioRwLock::new(api_client),
            token: Mutex::new(token),
            on_refresh,
        })
    }

    /// Returns a copy of the current token record.
    pub fn token(&self) -> TokenRecord {
        self.token.lock().unwrap().clone()
    }

    /// Fetches the authorized user's profile.
    pub async fn user_profile(&self) -> ProviderResult<UserProfile> {
        self.ensure_fresh().await?;
        let first = { self.api_client.read().await.user_profile().await };
        match first {
            Err(err) if err.code() == ProviderErrorCode::AuthenticationFailed => {
                self.refresh_and_persist().await?;
                self.api_client.read().await.user_profile().await
            }
            other => other,
        }
    }

    /// Refreshes when the persisted token has gone stale.
    async fn ensure_fresh(&self) -> ProviderResult<()> {
        let expired = self.token.lock().unwrap().is_expired();
        if !expired {
            return Ok(());
        }
        debug!("access token expired, refreshing");
        self.refresh_and_persist().await
    }

    /// Refreshes unconditionally and swaps in the new record.
    async fn refresh_and_persist(&self) -> ProviderResult<()> {
        let refresh_token = self.token.lock().unwrap().refresh_token.clone();
        let record = self.oauth.refresh(&refresh_token).await?;

        self.api_client
            .write()
            .await
            .set_access_token(&record.access_token);
        if let Some(hook) = &self.on_refresh {
            hook(&record);
        }
        *self.token.lock().unwrap() = record;
        Ok(())
    }

    async fn intraday(
        &self,
        activity: IntradayActivity,
        date: NaiveDate,
    ) -> ProviderResult<IntradayDay> {
        self.ensure_fresh().await?;
        let first = {
            self.api_client
                .read()
                .await
                .intraday_series(activity, date)
                .await
        };
        match first {
            Err(err) if err.code() == ProviderErrorCode::AuthenticationFailed => {
                debug!("access token rejected, refreshing and retrying once");
                self.refresh_and_persist().await?;
                self.api_client
                    .read()
                    .await
                    .intraday_series(activity, date)
                    .await
            }
            other => other,
        }
    }

    async fn sleep(&self, date: NaiveDate) -> ProviderResult<SleepDay> {
        self.ensure_fresh().await?;
        let first = { self.api_client.read().await.sleep_log(date).await };
        match first {
            Err(err) if err.code() == ProviderErrorCode::AuthenticationFailed => {
                debug!("access token rejected, refreshing and retrying once");
                self.refresh_and_persist().await?;
                self.api_client.read().await.sleep_log(date).await
            }
            other => other,
        }
    }

    async fn weight(&self, date: NaiveDate) -> ProviderResult<Option<WeightSample>> {
        self.ensure_fresh().await?;
        let first = { self.api_client.read().await.body_weight(date).await };
        match first {
            Err(err) if err.code() == ProviderErrorCode::AuthenticationFailed => {
                debug!("access token rejected, refreshing and retrying once");
                self.refresh_and_persist().await?;
                self.api_client.read().await.body_weight(date).await
            }
            other => other,
        }
    }
}

impl FitnessProvider for FitbitProvider {
    fn name(&self) -> &str {
        "fitbit"
    }

    fn intraday_series(
        &self,
        activity: IntradayActivity,
        date: NaiveDate,
    ) -> BoxFuture<'_, ProviderResult<IntradayDay>> {
        Box::pin(async move { self.intraday(activity, date).await })
    }

    fn sleep_log(&self, date: NaiveDate) -> BoxFuture<'_, ProviderResult<SleepDay>> {
        Box::pin(async move { self.sleep(date).await })
    }

    fn body_weight(
        &self,
        date: NaiveDate,
    ) -> BoxFuture<'_, ProviderResult<Option<WeightSample>>> {
        Box::pin(async move { self.weight(date).await })
    }
}
