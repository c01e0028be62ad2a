//! Fitbit provider configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ProviderError, ProviderResult};

/// OAuth 2.0 client credentials for Fitbit API access.
///
/// Users must register their own application in the Fitbit developer console
/// to obtain these. The record is persisted once during authorization and
/// read back on every collection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientCredentials {
    /// The OAuth 2.0 client ID from the Fitbit developer console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from the Fitbit developer console.
    pub client_secret: String,
}

impl ClientCredentials {
    /// Creates new client credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads client credentials from a JSON file.
    pub fn load_from(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::credential_file(format!(
                "failed to read client credentials {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content).map_err(|e| {
            ProviderError::credential_file(format!(
                "failed to parse client credentials {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Parses client credentials from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Writes the credentials as JSON, replacing any prior file contents.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ProviderResult<()> {
        let path = path.as_ref();
        let content = serde_json::to_string(self).map_err(|e| {
            ProviderError::internal(format!("failed to serialize client credentials: {}", e))
        })?;
        super::tokens::write_json_atomic(path, &content).map_err(|e| {
            ProviderError::credential_file(format!(
                "failed to write client credentials {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Validates that the credentials are present.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration for the Fitbit provider.
#[derive(Debug, Clone)]
pub struct FitbitConfig {
    /// OAuth client credentials.
    pub credentials: ClientCredentials,

    /// Redirect URI registered for the application.
    ///
    /// The callback listener binds to the host and port of this URI, so it
    /// must point at a loopback address. Defaults to `http://127.0.0.1:8080/`.
    pub redirect_uri: Url,

    /// Path where the user token record is persisted.
    ///
    /// Defaults to `~/.local/share/daypulse/user_details.json`.
    pub token_path: PathBuf,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string for API requests.
    pub user_agent: String,

    /// OAuth scopes to request during authorization.
    pub scopes: Vec<String>,

    /// Base URL of the Fitbit Web API (token and resource endpoints).
    pub api_base: String,

    /// The interactive authorization endpoint opened in the browser.
    pub authorize_url: String,
}

impl FitbitConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    /// Default redirect URI; must match the application registration.
    pub const DEFAULT_REDIRECT_URI: &'static str = "http://127.0.0.1:8080/";

    /// Default API base URL.
    pub const DEFAULT_API_BASE: &'static str = "https://api.fitbit.com";

    /// Default authorization endpoint.
    pub const DEFAULT_AUTHORIZE_URL: &'static str = "https://www.fitbit.com/oauth2/authorize";

    /// Scopes needed for the collected metrics.
    pub const DEFAULT_SCOPES: [&'static str; 5] =
        ["activity", "heartrate", "sleep", "weight", "profile"];

    /// Creates a new Fitbit configuration with the given credentials.
    pub fn new(credentials: ClientCredentials) -> Self {
        Self {
            credentials,
            redirect_uri: Url::parse(Self::DEFAULT_REDIRECT_URI)
                .expect("default redirect URI is valid"),
            token_path: Self::default_token_path(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("daypulse/{}", env!("CARGO_PKG_VERSION")),
            scopes: Self::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            api_base: Self::DEFAULT_API_BASE.to_string(),
            authorize_url: Self::DEFAULT_AUTHORIZE_URL.to_string(),
        }
    }

    /// Returns the default directory for persisted records.
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("daypulse")
    }

    /// Returns the default user token path.
    pub fn default_token_path() -> PathBuf {
        Self::default_data_dir().join("user_details.json")
    }

    /// Returns the default client credentials path.
    pub fn default_client_path() -> PathBuf {
        Self::default_data_dir().join("client_details.json")
    }

    /// Sets the redirect URI.
    pub fn with_redirect_uri(mut self, uri: &str) -> ProviderResult<Self> {
        self.redirect_uri = Url::parse(uri).map_err(|e| {
            ProviderError::configuration(format!("invalid redirect URI {}: {}", uri, e))
        })?;
        Ok(self)
    }

    /// Sets the token storage path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the API base URL (used by tests to point at a local stub).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Returns the token-exchange endpoint.
    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.api_base)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        if self.redirect_uri.host_str().is_none() {
            return Err("redirect URI must carry a host".to_string());
        }
        if self.redirect_uri.port_or_known_default().is_none() {
            return Err("redirect URI must carry a port".to_string());
        }
        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }

        Ok(())
    }
}
