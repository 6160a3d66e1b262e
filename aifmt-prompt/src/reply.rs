//! Decoding of the model's message into a tagged [`Reply`].
//!
//! The caller states up front which shape it expects via [`ReplyKind`]; the
//! decoder never guesses from the payload.

use serde::Deserialize;

use aifmt_core::{ChangeRecord, Transformed};

use crate::error::PromptError;

/// Shape the caller expects the model's message to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Use the message verbatim.
    Text,
    /// Parse the message as a [`FormatReply`] JSON object.
    Structured,
}

/// A decoded model message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Structured(FormatReply),
}

/// JSON object the format prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct FormatReply {
    /// Complete rewritten file. Missing or empty means the model gave up.
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub updates: Vec<ProposedChange>,
}

/// One entry of `updates`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ProposedChange {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
}

impl FormatReply {
    /// Convert into the engine's [`Transformed`]; records are not yet
    /// stamped with a path.
    pub fn into_transformed(self) -> Transformed {
        Transformed {
            content: self.code,
            changes: self
                .updates
                .into_iter()
                .map(|u| ChangeRecord::new(u.code, u.description))
                .collect(),
        }
    }
}

/// Decode `raw` as the caller-declared `kind`.
pub fn decode(raw: &str, kind: ReplyKind) -> Result<Reply, PromptError> {
    match kind {
        ReplyKind::Text => Ok(Reply::Text(raw.to_string())),
        ReplyKind::Structured => decode_structured(raw).map(Reply::Structured),
    }
}

fn decode_structured(raw: &str) -> Result<FormatReply, PromptError> {
    let body = strip_code_fence(raw);
    match serde_json::from_str::<FormatReply>(body) {
        Ok(reply) => Ok(reply),
        Err(first) => {
            // Models sometimes wrap the object in prose; retry on the outermost braces.
            let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) else {
                return Err(PromptError::Decode(first.to_string()));
            };
            if end <= start {
                return Err(PromptError::Decode(first.to_string()));
            }
            serde_json::from_str::<FormatReply>(&body[start..=end])
                .map_err(|_| PromptError::Decode(first.to_string()))
        }
    }
}

/// Remove a surrounding Markdown code fence (```` ```json ```` or bare
/// ```` ``` ````), if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
