//! OAuth token records and their on-disk storage.
//!
//! The persisted token is always the complete, most recently issued record:
//! the authorization flow writes the initial one and the silent-refresh hook
//! replaces it whenever the API client renews the access token. Writes go
//! through a temp file and rename so a crash leaves the prior file usable.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// Margin subtracted from the provider expiry so tokens refresh early.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Assumed lifetime when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Called with the complete new record after every silent token refresh.
pub type RefreshHook = Box<dyn Fn(&TokenRecord) + Send + Sync>;

/// The user token record as issued by the provider.
///
/// Fields the provider defines beyond the modeled ones are preserved in
/// `extra` so the persisted record round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: String,

    /// Unix timestamp (seconds) past which the access token is stale.
    pub expires_at: f64,

    /// The granted scopes, space separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// The token type, normally `Bearer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// The provider's identifier for the authorized user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Provider-defined fields we do not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenRecord {
    /// Builds a record from a token-endpoint response, stamping the expiry.
    pub(crate) fn issued(response: TokenResponse) -> Self {
        let expires_in = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: (now_unix() + expires_in - EXPIRY_MARGIN_SECS) as f64,
            scope: response.scope,
            token_type: response.token_type,
            user_id: response.user_id,
            extra: response.extra,
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        now_unix() as f64 >= self.expires_at
    }
}

/// Wire shape of the provider's token endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// File-backed storage for the user token record.
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Creates a token store at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the storage path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the token record from disk.
    ///
    /// Fails with a credential-file error if the file is absent or malformed.
    pub fn load(&self) -> ProviderResult<TokenRecord> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::credential_file(format!(
                "failed to read token file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ProviderError::credential_file(format!(
                "failed to parse token file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Saves the token record, atomically replacing the prior file.
    pub fn save(&self, record: &TokenRecord) -> ProviderResult<()> {
        let content = serde_json::to_string_pretty(record)
            .map_err(|e| ProviderError::internal(format!("failed to serialize token: {}", e)))?;
        write_json_atomic(&self.path, &content).map_err(|e| {
            ProviderError::credential_file(format!(
                "failed to write token file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        debug!("saved token record to {}", self.path.display());
        Ok(())
    }
}

/// Writes a file via temp-file-and-rename so the replace is atomic.
///
/// Creates parent directories as needed and restricts permissions on unix.
pub(crate) fn write_json_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        let _ = fs::set_permissions(path, perms);
    }

    Ok(())
}
