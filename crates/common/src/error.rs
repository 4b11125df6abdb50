//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading configuration and the secrets it points to
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A password or token file named in the config could not be read
    #[error("cannot read secret file {}: {source}", path.display())]
    SecretFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;
