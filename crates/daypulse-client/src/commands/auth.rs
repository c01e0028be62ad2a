//! Authorization command.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::{ClientConfig, FitbitSettings};
use crate::error::{ClientError, ClientResult};

use daypulse_providers::fitbit::{
    ClientCredentials, FitbitConfig, FitbitProvider, OAuthFlow, TokenRecord, TokenStore,
};

/// Runs the Fitbit authorization flow.
///
/// Resolves credentials from CLI flags, a `--credentials-file`, or
/// `config.toml`, drives the OAuth 2.0 authorization-code flow, prints the
/// issued token, and persists both credential records for collection runs.
pub async fn run(
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
    redirect_uri: Option<String>,
    config: &ClientConfig,
) -> ClientResult<()> {
    let credentials = resolve_credentials(
        client_id,
        client_secret,
        credentials_file,
        config.fitbit.as_ref(),
    )?;
    credentials
        .validate()
        .map_err(|e| ClientError::Config(format!("invalid Fitbit credentials: {}", e)))?;

    let mut fitbit_config =
        FitbitConfig::new(credentials.clone()).with_token_path(config.storage.token_file());

    let redirect = redirect_uri.or_else(|| {
        config
            .fitbit
            .as_ref()
            .and_then(|f| f.redirect_uri.clone())
    });
    if let Some(uri) = redirect {
        fitbit_config = fitbit_config.with_redirect_uri(&uri)?;
    }

    println!("Starting Fitbit authorization...");
    println!();
    println!("A browser window will open for you to authorize access.");
    println!("If the browser doesn't open, copy the URL printed below.");

    let flow = OAuthFlow::new(fitbit_config.clone())?;
    let token = flow.authorize().await?;

    // Greet the user the way the account sees itself.
    let provider = FitbitProvider::new(fitbit_config, token.clone(), None)?;
    match provider.user_profile().await {
        Ok(profile) => println!(
            "You are authorized to access data for the user: {}",
            profile.full_name
        ),
        Err(e) => warn!("could not fetch the user profile: {}", e),
    }

    print_token(&token);

    let client_path = config.storage.client_file();
    credentials.save_to(&client_path)?;
    println!("Client details written to {}", client_path.display());

    let store = TokenStore::new(config.storage.token_file());
    store.save(&token)?;
    println!("User token written to {}", store.path().display());

    info!("Fitbit authorization successful");
    Ok(())
}

/// Prints the token record to stdout, one `key = value` line per field.
fn print_token(token: &TokenRecord) {
    println!();
    println!("TOKEN");
    println!("=====");
    match serde_json::to_value(token) {
        Ok(serde_json::Value::Object(map)) => {
            for (key, value) in map {
                match value {
                    serde_json::Value::String(s) => println!("{} = {}", key, s),
                    other => println!("{} = {}", key, other),
                }
            }
        }
        _ => println!("{:?}", token),
    }
    println!();
}

/// Where the credentials were resolved from.
#[derive(Debug, PartialEq)]
enum CredentialSource {
    /// From CLI flags or a `--credentials-file`.
    Cli,
    /// From `config.toml`.
    Config,
}

/// Resolves Fitbit credentials from multiple sources.
///
/// Priority (highest to lowest):
/// 1. CLI `--client-id` + `--client-secret`
/// 2. CLI `--credentials-file` (JSON with client_id/client_secret)
/// 3. `config.toml` `[fitbit]` section
fn resolve_credentials(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    config_fitbit: Option<&FitbitSettings>,
) -> ClientResult<ClientCredentials> {
    let (credentials, source) = resolve_credentials_with_source(
        cli_client_id,
        cli_client_secret,
        cli_credentials_file,
        config_fitbit,
    )?;
    if source == CredentialSource::Config {
        info!("using Fitbit credentials from config.toml");
    }
    Ok(credentials)
}

fn resolve_credentials_with_source(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    config_fitbit: Option<&FitbitSettings>,
) -> ClientResult<(ClientCredentials, CredentialSource)> {
    // Priority 1: CLI client_id + client_secret
    if let (Some(id), Some(secret)) = (&cli_client_id, &cli_client_secret) {
        return Ok((ClientCredentials::new(id, secret), CredentialSource::Cli));
    }

    // Priority 2: CLI credentials file
    if let Some(ref path) = cli_credentials_file {
        let credentials = ClientCredentials::load_from(path).map_err(|e| {
            ClientError::Config(format!(
                "failed to load credentials from {}: {}",
                path.display(),
                e
            ))
        })?;
        return Ok((credentials, CredentialSource::Cli));
    }

    // Priority 3: config.toml [fitbit] section
    if let Some(fitbit) = config_fitbit
        && let (Some(id), Some(secret)) = (&fitbit.client_id, &fitbit.client_secret)
    {
        return Ok((
            ClientCredentials::new(id, secret),
            CredentialSource::Config,
        ));
    }

    // Partial CLI args (only id or only secret provided)
    if cli_client_id.is_some() || cli_client_secret.is_some() {
        return Err(ClientError::Config(
            "both --client-id and --client-secret are required when providing credentials directly"
                .to_string(),
        ));
    }

    Err(ClientError::Config(format!(
        "Fitbit credentials are required. Provide via:\n  \
         - client_id + client_secret in {}\n  \
         - --client-id and --client-secret flags\n  \
         - --credentials-file flag (path to a JSON credentials file)\n  \
         - FITBIT_CLIENT_ID and FITBIT_CLIENT_SECRET env vars",
        ClientConfig::default_path().display()
    )))
}
