//! Error types for aifmt-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from configuration store operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`, so we cannot locate `~/.aifmt/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// `set` was called with a key the store does not know.
    #[error("unknown config key '{key}'; expected one of: {known}")]
    UnknownKey { key: String, known: String },

    /// `set` was called with a value that does not fit the key's type.
    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}

/// Failure reported by a [`crate::Transformer`].
///
/// Every variant is treated as transient by the batch engine and retried
/// according to the run's retry budget.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The prompt could not be built from the file and settings.
    #[error("prompt rendering failed: {0}")]
    Prompt(String),

    /// The request never produced an HTTP response (DNS, TLS, connection reset, ...).
    #[error("completion request failed: {0}")]
    Transport(String),

    /// The completion endpoint answered with a non-success status.
    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The reply arrived but could not be decoded into code + changes.
    #[error("malformed completion reply: {0}")]
    Decode(String),
}
