//! Serve command - run the HTTP API

use std::net::SocketAddr;
use std::time::Duration;

use envpack_kube::{
    ApiKeys, CredentialSource, Credentials, EnvCredentialSource, SecretCredentialSource,
};
use tokio::net::TcpListener;

use crate::config::SettingsArgs;
use crate::error::{CliError, Result};
use crate::server::{self, AppState};

/// Where the API keys come from
#[derive(Debug, Clone)]
pub struct CredentialArgs {
    /// Kubernetes Secret holding the API keys
    pub secret: Option<String>,
    /// Namespace of the secret, defaults to the release namespace
    pub namespace: Option<String>,
    /// Secret data keys read under a different credential name
    pub mappings: Vec<(String, String)>,
}

/// Parse a `SECRET_KEY=CREDENTIAL` mapping
pub fn parse_mapping(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, credential)) if !key.is_empty() && !credential.is_empty() => {
            Ok((key.to_string(), credential.to_string()))
        }
        _ => Err(format!("expected SECRET_KEY=CREDENTIAL, got '{raw}'")),
    }
}

/// Load the API keys; environment variables win over the secret
pub async fn load_api_keys(settings: &SettingsArgs, args: &CredentialArgs) -> Result<ApiKeys> {
    let mut credentials = Credentials::new();

    if let Some(secret) = &args.secret {
        let namespace = args.namespace.as_deref().unwrap_or(&settings.namespace);
        tracing::info!(secret = %secret, namespace = %namespace, "loading credentials from secret");
        let source = args.mappings.iter().fold(
            SecretCredentialSource::connect(namespace, secret).await?,
            |source, (key, credential)| source.with_mapping(key, credential),
        );
        credentials = credentials.merge(source.load().await?);
    }

    let from_env = EnvCredentialSource::default().load().await?;
    credentials = credentials.merge(from_env);
    tracing::debug!(keys = ?credentials, "credentials loaded");

    Ok(ApiKeys::from_credentials(&credentials)?)
}

/// Run the serve command
pub async fn run(
    settings: &SettingsArgs,
    bind: SocketAddr,
    shutdown_timeout: u64,
    credentials: &CredentialArgs,
) -> Result<()> {
    let keys = load_api_keys(settings, credentials).await?;
    let manager = settings.manager()?;

    let listener = TcpListener::bind(bind).await.map_err(|e| {
        CliError::config_with_help(
            format!("cannot listen on {}: {}", bind, e),
            "Pick another address with --bind or ENVPACK_BIND",
        )
    })?;

    let resolved = manager.settings();
    tracing::info!(
        addr = %bind,
        namespace = %resolved.namespace,
        source_dir = %resolved.source_dir.display(),
        output_dir = %resolved.output_dir.display(),
        driver = %resolved.helm_driver,
        "envpack API listening"
    );

    let app = server::router(AppState::new(manager), keys);
    server::serve(
        listener,
        app,
        server::shutdown_signal(),
        Duration::from_secs(shutdown_timeout),
    )
    .await
}
