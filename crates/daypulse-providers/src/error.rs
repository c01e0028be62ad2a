//! Error types for fitness provider operations.
//!
//! This module defines the error types that can occur when authorizing
//! against a provider or pulling metrics from it.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
///
/// This enum provides a high-level classification of errors so callers can
/// distinguish authorization failures from transport and data problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// The authorization-code or refresh exchange failed.
    AuthExchangeFailed,
    /// The callback carried a state value that was never issued.
    StateMismatch,
    /// The authorization wait was interrupted by the user.
    Interrupted,
    /// A resource endpoint rejected the access token.
    AuthenticationFailed,
    /// A credential file is missing or unreadable.
    CredentialFile,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// Rate limit exceeded - too many requests.
    RateLimited,
    /// Server returned an error status.
    ServerError,
    /// Invalid response from the server - parse error, unexpected format.
    InvalidResponse,
    /// An expected field was absent from an otherwise valid response.
    DataShape,
    /// Configuration error - missing or invalid config.
    ConfigurationError,
    /// Internal provider error - unexpected state, bug.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns a human-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthExchangeFailed => "auth_exchange_failed",
            Self::StateMismatch => "state_mismatch",
            Self::Interrupted => "interrupted",
            Self::AuthenticationFailed => "authentication_failed",
            Self::CredentialFile => "credential_file",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::DataShape => "data_shape",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while interacting with a fitness provider.
#[derive(Debug, Error)]
pub struct ProviderError {
    /// The error code categorizing this error.
    code: ProviderErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an authorization-exchange error.
    pub fn auth_exchange(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthExchangeFailed, message)
    }

    /// Creates a state-mismatch (CSRF) error.
    pub fn state_mismatch(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::StateMismatch, message)
    }

    /// Creates an interrupted error.
    pub fn interrupted(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Interrupted, message)
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    /// Creates a credential-file error.
    pub fn credential_file(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::CredentialFile, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates a data-shape error.
    pub fn data_shape(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::DataShape, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
