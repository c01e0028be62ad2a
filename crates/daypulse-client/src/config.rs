//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/daypulse/config.toml` by default. Every path the tool touches
//! (credential records, token file, data directory) is explicit
//! configuration with a sensible default; nothing is an ambient global.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use daypulse_providers::fitbit::FitbitConfig;

/// Configuration for the daypulse client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Fitbit application settings.
    pub fitbit: Option<FitbitSettings>,

    /// Storage locations.
    #[serde(default)]
    pub storage: StorageSettings,

    /// Debug mode.
    pub debug: bool,
}

/// Fitbit application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FitbitSettings {
    /// OAuth client ID.
    pub client_id: Option<String>,

    /// OAuth client secret.
    pub client_secret: Option<String>,

    /// Redirect URI registered for the application.
    pub redirect_uri: Option<String>,
}

/// Storage locations for credential records and sampled tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Where the client credential record is written.
    pub client_file: Option<PathBuf>,

    /// Where the user token record is written.
    pub token_file: Option<PathBuf>,

    /// Default output directory for sampled tables.
    pub data_dir: Option<PathBuf>,
}

impl StorageSettings {
    /// Returns the client credential record path.
    pub fn client_file(&self) -> PathBuf {
        self.client_file
            .clone()
            .unwrap_or_else(FitbitConfig::default_client_path)
    }

    /// Returns the user token record path.
    pub fn token_file(&self) -> PathBuf {
        self.token_file
            .clone()
            .unwrap_or_else(FitbitConfig::default_token_path)
    }

    /// Returns the output directory for sampled tables.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| FitbitConfig::default_data_dir().join("data"))
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".config"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("daypulse")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_empty() {
        let config = ClientConfig::default();
        assert!(config.fitbit.is_none());
        assert!(!config.debug);
    }

    #[test]
    fn storage_defaults_are_derived() {
        let storage = StorageSettings::default();
        assert!(
            storage
                .client_file()
                .ends_with("daypulse/client_details.json")
        );
        assert!(storage.token_file().ends_with("daypulse/user_details.json"));
        assert!(storage.data_dir().ends_with("daypulse/data"));
    }

    #[test]
    fn storage_overrides_win() {
        let storage = StorageSettings {
            client_file: Some(PathBuf::from("/etc/daypulse/client.json")),
            token_file: None,
            data_dir: Some(PathBuf::from("/var/lib/daypulse")),
        };
        assert_eq!(
            storage.client_file(),
            PathBuf::from("/etc/daypulse/client.json")
        );
        assert_eq!(storage.data_dir(), PathBuf::from("/var/lib/daypulse"));
    }

    #[test]
    fn load_from_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            debug = true

            [fitbit]
            client_id = "23ABCD"
            client_secret = "sekrit"
            redirect_uri = "http://127.0.0.1:9191/"

            [storage]
            data_dir = "/tmp/daypulse-data"
            "#,
        )
        .unwrap();

        let config = ClientConfig::load_from(&path).unwrap();
        assert!(config.debug);
        let fitbit = config.fitbit.unwrap();
        assert_eq!(fitbit.client_id.as_deref(), Some("23ABCD"));
        assert_eq!(
            fitbit.redirect_uri.as_deref(),
            Some("http://127.0.0.1:9191/")
        );
        assert_eq!(
            config.storage.data_dir(),
            PathBuf::from("/tmp/daypulse-data")
        );
    }

    #[test]
    fn load_from_malformed_toml_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "debug = [").unwrap();
        assert!(ClientConfig::load_from(&path).is_err());
    }
}
