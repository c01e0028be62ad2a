//! OAuth 2.0 authorization-code flow for the Fitbit API.
//!
//! # Flow Overview
//!
//! 1. Generate a random anti-CSRF state token
//! 2. Start the loopback callback listener on the redirect URI's host/port
//! 3. Open the user's browser to the consent page on a short delayed timer
//! 4. User grants permission; Fitbit redirects to the listener
//! 5. Verify the echoed state, exchange the code for tokens
//! 6. Render the outcome into the browser and tear the listener down
//!
//! The exchange is attempted exactly once; failures render an error page and
//! end the attempt. A keyboard interrupt while waiting shuts the listener
//! down and surfaces as an error instead of being swallowed.

use std::thread;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::FitbitConfig;
use super::listener::{CallbackQuery, CallbackServer, RenderedPage};
use super::tokens::{TokenRecord, TokenResponse};

/// The state token length in bytes, before base64 encoding.
const STATE_TOKEN_LENGTH: usize = 16;

/// Delay before the consent URL is opened in the browser.
const BROWSER_OPEN_DELAY: Duration = Duration::from_secs(1);

/// Grace period for the listener's delayed teardown after the callback.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Drives the OAuth 2.0 authorization-code exchange end to end.
#[derive(Debug)]
pub struct OAuthFlow {
    config: FitbitConfig,
    http_client: reqwest::Client,
}

impl OAuthFlow {
    /// Creates a new flow for the given configuration.
    pub fn new(config: FitbitConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Runs the authorization flow and returns the issued token record.
    ///
    /// This will:
    /// 1. Start the local callback listener
    /// 2. Open the user's browser to the consent page (and print the URL)
    /// 3. Wait for the redirect, exchange the code, render the outcome
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind, the user denies or
    /// interrupts the authorization, the echoed state does not match, or
    /// the token exchange fails. None of these are retried.
    pub async fn authorize(&self) -> ProviderResult<TokenRecord> {
        let state_token = generate_state();
        let auth_url = self.build_authorize_url(&state_token);

        let redirect = &self.config.redirect_uri;
        let host = redirect
            .host_str()
            .ok_or_else(|| ProviderError::configuration("redirect URI has no host"))?;
        let port = redirect
            .port_or_known_default()
            .ok_or_else(|| ProviderError::configuration("redirect URI has no port"))?;
        let path = if redirect.path().is_empty() {
            "/"
        } else {
            redirect.path()
        };

        let (callback_tx, mut callback_rx) = mpsc::unbounded_channel();
        let server = CallbackServer::start(host, port, path, callback_tx)?;

        // Open the consent page on a delayed timer thread so the listener
        // is accepting before the redirect can arrive. Fire and forget.
        let browser_url = auth_url.clone();
        thread::spawn(move || {
            thread::sleep(BROWSER_OPEN_DELAY);
            if let Err(e) = open::that(&browser_url) {
                warn!("failed to open browser: {}", e);
            }
        });

        println!();
        println!("URL for authenticating is:");
        println!("{auth_url}");
        println!();

        let result = tokio::select! {
            callback = callback_rx.recv() => match callback {
                Some(callback) => {
                    debug!("received authorization callback");
                    let (page, result) =
                        self.handle_callback(&state_token, &callback.query).await;
                    callback.respond(page);
                    result
                }
                None => Err(ProviderError::internal(
                    "callback listener closed unexpectedly",
                )),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down listener");
                server.exit();
                Err(ProviderError::interrupted(
                    "authorization interrupted before completion",
                ))
            }
        };

        if !server.wait_exited(SHUTDOWN_GRACE) {
            warn!("listener did not exit in time, forcing teardown");
            server.exit();
        }
        result
    }

    /// Refreshes an expired access token, returning the full new record.
    pub async fn refresh(&self, refresh_token: &str) -> ProviderResult<TokenRecord> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let response = self
            .http_client
            .post(self.config.token_url())
            .basic_auth(
                &self.config.credentials.client_id,
                Some(&self.config.credentials.client_secret),
            )
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("token refresh request failed: {}", e))
            })?;

        let success = response.status().is_success();
        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read token response: {}", e))
        })?;

        match parse_token_body(success, &body) {
            Ok(record) => {
                info!("successfully refreshed access token");
                Ok(record)
            }
            Err(ExchangeFailure::MissingToken(detail)) => Err(ProviderError::auth_exchange(
                format!("token refresh failed: {}", detail),
            )),
            Err(ExchangeFailure::Other(err)) => Err(err),
        }
    }

    /// Decides the browser page and flow outcome for one callback.
    async fn handle_callback(
        &self,
        expected_state: &str,
        query: &CallbackQuery,
    ) -> (RenderedPage, ProviderResult<TokenRecord>) {
        if let Some(code) = &query.code {
            if query.state.as_deref() != Some(expected_state) {
                warn!("callback state does not match the issued one");
                return (
                    failure_page("CSRF Warning! Mismatching state"),
                    Err(ProviderError::state_mismatch(
                        "callback state does not match the issued one",
                    )),
                );
            }
            match self.exchange_code(code).await {
                Ok(record) => {
                    info!("authorization code exchanged for tokens");
                    (RenderedPage::ok(SUCCESS_HTML), Ok(record))
                }
                Err(ExchangeFailure::MissingToken(detail)) => (
                    failure_page(
                        "Missing access token parameter.</br>Please check that \
                         you are using the correct client_secret",
                    ),
                    Err(ProviderError::auth_exchange(format!(
                        "missing access token in exchange response: {}",
                        detail
                    ))),
                ),
                Err(ExchangeFailure::Other(err)) => (
                    failure_page(&format!("Token exchange failed: {}", err)),
                    Err(err),
                ),
            }
        } else if let Some(error) = &query.error {
            (
                failure_page(&format!("Authorization was refused: {}", error)),
                Err(ProviderError::auth_exchange(format!(
                    "provider returned error: {}",
                    error
                ))),
            )
        } else {
            (
                failure_page("Unknown error while authenticating"),
                Err(ProviderError::auth_exchange(
                    "callback carried neither code nor error",
                )),
            )
        }
    }

    /// Exchanges an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<TokenRecord, ExchangeFailure> {
        let params = [
            ("client_id", self.config.credentials.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", code),
        ];

        let response = self
            .http_client
            .post(self.config.token_url())
            .basic_auth(
                &self.config.credentials.client_id,
                Some(&self.config.credentials.client_secret),
            )
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                ExchangeFailure::Other(ProviderError::network(format!(
                    "token exchange request failed: {}",
                    e
                )))
            })?;

        let success = response.status().is_success();
        let body = response.text().await.map_err(|e| {
            ExchangeFailure::Other(ProviderError::network(format!(
                "failed to read token response: {}",
                e
            )))
        })?;

        parse_token_body(success, &body)
    }

    /// Builds the interactive authorization URL.
    fn build_authorize_url(&self, state: &str) -> String {
        let scope = self.config.scopes.join(" ");
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.config.authorize_url,
            urlencoding::encode(&self.config.credentials.client_id),
            urlencoding::encode(self.config.redirect_uri.as_str()),
            urlencoding::encode(&scope),
            urlencoding::encode(state),
        )
    }
}

/// Why a token exchange did not yield a record.
#[derive(Debug)]
enum ExchangeFailure {
    /// The endpoint answered, but without an access token. Usually a
    /// client-credential mismatch.
    MissingToken(String),
    /// Transport or decode failure.
    Other(ProviderError),
}

/// Interprets a token-endpoint response body.
fn parse_token_body(success: bool, body: &str) -> Result<TokenRecord, ExchangeFailure> {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) if success => {
            return Err(ExchangeFailure::Other(ProviderError::invalid_response(
                format!("invalid token response: {}", e),
            )));
        }
        Err(_) => {
            return Err(ExchangeFailure::MissingToken(
                "token endpoint returned an unreadable error body".to_string(),
            ));
        }
    };

    if !success || value.get("access_token").is_none() {
        return Err(ExchangeFailure::MissingToken(describe_token_errors(&value)));
    }

    let response: TokenResponse = serde_json::from_value(value).map_err(|e| {
        ExchangeFailure::Other(ProviderError::invalid_response(format!(
            "invalid token response: {}",
            e
        )))
    })?;
    Ok(TokenRecord::issued(response))
}

/// Summarizes the `errors` array Fitbit attaches to failed token responses.
fn describe_token_errors(value: &serde_json::Value) -> String {
    let messages: Vec<String> = value
        .get("errors")
        .and_then(|errors| errors.as_array())
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    if messages.is_empty() {
        "response carried no access token".to_string()
    } else {
        messages.join("; ")
    }
}

/// Generates a random state string for CSRF protection.
fn generate_state() -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..STATE_TOKEN_LENGTH).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

const SUCCESS_HTML: &str = "<h1>You are now authorized to access the Fitbit API!</h1>\
     <br/><h3>You can close this window</h3>";

fn failure_page(message: &str) -> RenderedPage {
    RenderedPage::bad_request(format!(
        "<h1>ERROR: {}</h1><br/><h3>You can close this window</h3>",
        message
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::fitbit::config::ClientCredentials;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_base: &str) -> FitbitConfig {
        FitbitConfig::new(ClientCredentials::new("23ABCD", "secret")).with_api_base(api_base)
    }

    fn token_json() -> serde_json::Value {
        serde_json::json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 28800,
            "scope": "activity heartrate",
            "token_type": "Bearer",
            "user_id": "ABC123"
        })
    }

    #[test]
    fn state_token_is_random() {
        let a = generate_state();
        let b = generate_state();
        assert_ne!(a, b);
        // 16 bytes, base64url without padding
        assert_eq!(a.len(), 22);
    }

    #[test]
    fn authorize_url_format() {
        let flow = OAuthFlow::new(test_config("https://api.fitbit.com")).unwrap();
        let url = flow.build_authorize_url("the-state");

        assert!(url.starts_with("https://www.fitbit.com/oauth2/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=23ABCD"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2F"));
        assert!(url.contains("state=the-state"));
        assert!(url.contains("scope="));
    }

    #[test]
    fn parse_token_body_success() {
        let record = parse_token_body(true, &token_json().to_string()).unwrap();
        assert_eq!(record.access_token, "at");
        assert_eq!(record.refresh_token, "rt");
        assert_eq!(record.user_id.as_deref(), Some("ABC123"));
    }

    #[test]
    fn parse_token_body_error_status_is_missing_token() {
        let body = serde_json::json!({
            "errors": [{"errorType": "invalid_client", "message": "Invalid authorization header"}],
            "success": false
        });
        match parse_token_body(false, &body.to_string()) {
            Err(ExchangeFailure::MissingToken(detail)) => {
                assert!(detail.contains("Invalid authorization header"));
            }
            other => panic!("unexpected outcome: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn parse_token_body_without_access_token_is_missing_token() {
        let body = serde_json::json!({"token_type": "Bearer"});
        assert!(matches!(
            parse_token_body(true, &body.to_string()),
            Err(ExchangeFailure::MissingToken(_))
        ));
    }

    #[test]
    fn parse_token_body_garbage_on_success_is_invalid_response() {
        match parse_token_body(true, "not json") {
            Err(ExchangeFailure::Other(err)) => {
                assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
            }
            other => panic!("unexpected outcome: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn callback_with_matching_state_exchanges_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_json()))
            .mount(&server)
            .await;

        let flow = OAuthFlow::new(test_config(&server.uri())).unwrap();
        let query = CallbackQuery {
            state: Some("issued-state".to_string()),
            code: Some("the-code".to_string()),
            error: None,
        };

        let (page, result) = flow.handle_callback("issued-state", &query).await;
        assert_eq!(page.status, 200);
        assert!(page.html.contains("now authorized"));
        assert_eq!(result.unwrap().access_token, "at");

        // The exchange must authenticate with the client credentials.
        let requests = server.received_requests().await.unwrap();
        let auth = requests[0].headers.get("authorization").unwrap();
        assert!(auth.to_str().unwrap().starts_with("Basic "));
    }

    #[tokio::test]
    async fn callback_with_mismatched_state_renders_csrf_page() {
        let server = MockServer::start().await;
        let flow = OAuthFlow::new(test_config(&server.uri())).unwrap();
        let query = CallbackQuery {
            state: Some("someone-elses-state".to_string()),
            code: Some("the-code".to_string()),
            error: None,
        };

        let (page, result) = flow.handle_callback("issued-state", &query).await;
        assert_eq!(page.status, 400);
        assert!(page.html.contains("CSRF Warning"));
        assert_eq!(
            result.unwrap_err().code(),
            ProviderErrorCode::StateMismatch
        );

        // No exchange must have been attempted.
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn callback_with_bad_credentials_hints_at_client_secret() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "errors": [{"errorType": "invalid_client", "message": "Invalid authorization header"}],
                "success": false
            })))
            .mount(&server)
            .await;

        let flow = OAuthFlow::new(test_config(&server.uri())).unwrap();
        let query = CallbackQuery {
            state: Some("issued-state".to_string()),
            code: Some("the-code".to_string()),
            error: None,
        };

        let (page, result) = flow.handle_callback("issued-state", &query).await;
        assert_eq!(page.status, 400);
        assert!(page.html.contains("Missing access token parameter"));
        assert!(page.html.contains("client_secret"));
        assert_eq!(
            result.unwrap_err().code(),
            ProviderErrorCode::AuthExchangeFailed
        );
    }

    #[tokio::test]
    async fn callback_without_code_or_error_renders_generic_page() {
        let server = MockServer::start().await;
        let flow = OAuthFlow::new(test_config(&server.uri())).unwrap();

        let (page, result) = flow
            .handle_callback("issued-state", &CallbackQuery::default())
            .await;
        assert!(page.html.contains("Unknown error while authenticating"));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn callback_with_provider_error_names_it() {
        let server = MockServer::start().await;
        let flow = OAuthFlow::new(test_config(&server.uri())).unwrap();
        let query = CallbackQuery {
            state: Some("issued-state".to_string()),
            code: None,
            error: Some("access_denied".to_string()),
        };

        let (page, result) = flow.handle_callback("issued-state", &query).await;
        assert!(page.html.contains("access_denied"));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn refresh_returns_full_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old-rt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_json()))
            .mount(&server)
            .await;

        let flow = OAuthFlow::new(test_config(&server.uri())).unwrap();
        let record = flow.refresh("old-rt").await.unwrap();
        assert_eq!(record.access_token, "at");
        assert!(!record.is_expired());
    }

    #[tokio::test]
    async fn refresh_failure_is_auth_exchange_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "errors": [{"errorType": "invalid_grant", "message": "Refresh token invalid"}],
                "success": false
            })))
            .mount(&server)
            .await;

        let flow = OAuthFlow::new(test_config(&server.uri())).unwrap();
        let err = flow.refresh("stale").await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthExchangeFailed);
        assert!(err.message().contains("Refresh token invalid"));
    }
}
