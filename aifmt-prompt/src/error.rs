//! Error types for aifmt-prompt.

use std::path::PathBuf;

use thiserror::Error;

use aifmt_core::TransformError;

/// All errors that can arise while building a prompt or talking to the
/// completion endpoint.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// JSON serialization error (building tera context or request body).
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while loading user templates.
    #[error("template io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The HTTP exchange failed before a status line was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered with anything other than 200.
    #[error("error in response: {status} {body}")]
    Status { status: u16, body: String },

    /// The reply body or the model's message could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<PromptError> for TransformError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::Tera(_) | PromptError::Io { .. } => {
                TransformError::Prompt(err.to_string())
            }
            PromptError::Serialization(e) => TransformError::Decode(e.to_string()),
            PromptError::Transport(msg) => TransformError::Transport(msg),
            PromptError::Status { status, body } => TransformError::Status { status, body },
            PromptError::Decode(msg) => TransformError::Decode(msg),
        }
    }
}
