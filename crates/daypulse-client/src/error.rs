//! Client error types.

use std::fmt;

use daypulse_core::table::TableError;
use daypulse_providers::{ProviderError, ProviderErrorCode};

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Provider error.
    Provider(String),
    /// IO error.
    Io(std::io::Error),
    /// Table output error.
    Table(TableError),
    /// Authorization is required before collecting.
    AuthRequired(String),
    /// The authorization wait was interrupted.
    Interrupted,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Provider(msg) => write!(f, "provider error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Table(err) => write!(f, "table output error: {}", err),
            Self::AuthRequired(msg) => write!(f, "authorization required: {}", msg),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Table(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<TableError> for ClientError {
    fn from(err: TableError) -> Self {
        Self::Table(err)
    }
}

impl From<ProviderError> for ClientError {
    fn from(err: ProviderError) -> Self {
        match err.code() {
            ProviderErrorCode::Interrupted => Self::Interrupted,
            _ => Self::Provider(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupted_provider_error_maps_to_interrupted() {
        let err: ClientError = ProviderError::interrupted("ctrl-c").into();
        assert!(matches!(err, ClientError::Interrupted));
    }

    #[test]
    fn provider_error_keeps_its_message() {
        let err: ClientError = ProviderError::credential_file("no token file").into();
        match err {
            ClientError::Provider(msg) => assert!(msg.contains("no token file")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn display_formats() {
        let err = ClientError::Config("bad value".to_string());
        assert_eq!(format!("{}", err), "configuration error: bad value");
    }
}
