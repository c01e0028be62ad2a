//! Fitbit provider implementation.
//!
//! This module provides a [`FitbitProvider`] that pulls daily metrics from
//! the Fitbit Web API, plus the OAuth 2.0 pieces needed to authorize it.
//!
//! # Authorization Flow
//!
//! 1. User registers an application and provides its client ID/secret
//! 2. The flow starts a loopback HTTP listener on the redirect URI
//! 3. The browser is opened to Fitbit's consent page (on a short timer,
//!    so the listener is already accepting)
//! 4. Fitbit redirects back with an authorization code and the echoed state
//! 5. The code is exchanged for access and refresh tokens
//! 6. Both credential records are persisted for collection runs
//!
//! # Example
//!
//! ```ignore
//! use daypulse_providers::fitbit::{ClientCredentials, FitbitConfig, OAuthFlow, TokenStore};
//!
//! let credentials = ClientCredentials::new("23ABCD", "client-secret");
//! let config = FitbitConfig::new(credentials);
//!
//! let flow = OAuthFlow::new(config)?;
//! let token = flow.authorize().await?;
//!
//! TokenStore::new(FitbitConfig::default_token_path()).save(&token)?;
//! ```

mod client;
mod config;
mod listener;
mod oauth;
mod provider;
mod tokens;

pub use client::{FitbitApiClient, UserProfile};
pub use config::{ClientCredentials, FitbitConfig};
pub use listener::{Callback, CallbackQuery, CallbackServer, ListenerState, RenderedPage};
pub use oauth::OAuthFlow;
pub use provider::FitbitProvider;
pub use tokens::{RefreshHook, TokenRecord, TokenStore};
