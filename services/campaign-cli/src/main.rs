//! Campaign CLI
//!
//! Command-line client for the campaign REST API:
//! 1. Restores the session left by the previous run
//! 2. Attaches the bearer token to every protected call
//! 3. Refreshes the token once on 401 and retries the call
//! 4. Asks the user to sign in again when the session cannot be recovered

mod app;
mod command;
mod config;
mod error;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use api_client::ApiClient;
use session_auth::{HttpCredentialService, SessionStore};
use session_refresh::RefreshCoordinator;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::App;
use crate::config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    // JSON logs on stderr, stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match command::parse(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    let app = match load_config(cli.config_path.as_deref()).map(build_app) {
        Ok(app) => app.await,
        Err(e) => Err(e),
    };
    let app = match app {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "startup failed");
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    // counters from the session crates, dumped at debug once the command ends
    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "metrics recorder not installed");
            None
        }
    };

    let result = app.run(cli.command).await;
    if let Some(handle) = &metrics {
        debug!(metrics = %handle.render(), "session metrics");
    }

    match result {
        Ok(Some(output)) => {
            match serde_json::to_string_pretty(&output) {
                Ok(text) => println!("{text}"),
                Err(_) => println!("{output}"),
            }
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Resolve and load the config file.
fn load_config(cli_config_path: Option<&str>) -> Result<Config> {
    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.api.base_url,
        timeout_secs = config.api.timeout_secs,
        session_file = ?config.session.file,
        "configuration loaded"
    );
    Ok(config)
}

/// Wire the session, coordinator and client together.
async fn build_app(config: Config) -> Result<App> {
    let http = reqwest::Client::builder()
        .timeout(config.api.timeout())
        .build()
        .context("failed to build HTTP client")?;

    let service = Arc::new(HttpCredentialService::new(
        http.clone(),
        config.api.base_url.clone(),
    ));
    let mut coordinator = RefreshCoordinator::new(service, config.session.refresh_timeout());
    if let Some(file) = config.session.file.clone() {
        coordinator = coordinator.with_store(SessionStore::new(file));
    }
    coordinator
        .restore()
        .await
        .context("failed to restore saved session")?;

    let client = ApiClient::new(http, config.api.base_url.clone(), Arc::new(coordinator));
    let app = App::new(client, config.login.email, config.login.password);
    if config.session.file.is_none() {
        warn!("no session file configured, login is disabled");
        return Ok(app.without_session_file());
    }
    Ok(app)
}
