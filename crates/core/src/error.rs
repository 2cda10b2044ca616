//! Error types shared by the application-facing crates.

use thiserror::Error;

/// Top-level error for window, configuration and startup failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Window creation or event-loop errors
    #[error("Window error: {0}")]
    Window(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Semantically invalid configuration values
    #[error("Config error: {0}")]
    Config(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
