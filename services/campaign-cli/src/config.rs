//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The login password is loaded from CAMPAIGN_PASSWORD or password_file,
//! never stored in the TOML directly.

use common::Secret;
use serde::Deserialize;
use session_auth::DEFAULT_BASE_URL;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub login: LoginConfig,
}

/// REST API settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Session handling
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// Where the token pair is kept between runs. Defaults to the per-user
    /// state directory; `None` only when no home directory can be found.
    #[serde(default = "default_session_file")]
    pub file: Option<PathBuf>,
    #[serde(default = "default_timeout")]
    pub refresh_timeout_secs: u64,
}

/// Default credentials for `login`
#[derive(Debug, Default, Deserialize)]
pub struct LoginConfig {
    #[serde(default)]
    pub email: Option<String>,
    /// Path to a file containing the password (alternative to CAMPAIGN_PASSWORD)
    #[serde(default)]
    pub password_file: Option<PathBuf>,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

/// `$XDG_STATE_HOME/campaign-cli/session.json`, or the platform's local data
/// directory where there is no state directory.
pub fn default_session_file() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join("campaign-cli").join("session.json"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            file: default_session_file(),
            refresh_timeout_secs: default_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SessionConfig {
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// A missing file is not an error: every setting has a default.
    ///
    /// Password resolution order:
    /// 1. CAMPAIGN_PASSWORD env var
    /// 2. password_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let mut config: Config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(e.into()),
        };

        if !config.api.base_url.starts_with("http://")
            && !config.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.api.base_url
            )));
        }

        if config.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.session.refresh_timeout_secs == 0 {
            return Err(common::Error::Config(
                "refresh_timeout_secs must be greater than 0".into(),
            ));
        }

        if let Ok(password) = std::env::var("CAMPAIGN_PASSWORD") {
            config.login.password = Some(Secret::new(password));
        } else if let Some(ref password_file) = config.login.password_file {
            config.login.password = Secret::read_file(password_file)?;
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("campaign-cli.toml")
    }
}
