//! Blocking chat-completions client (OpenRouter-compatible).
//!
//! Calls are synchronous; async callers run them on the blocking pool.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PromptError;

/// Default completion endpoint.
pub const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

const TEMPERATURE: f32 = 0.1;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of the dialog sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for a chat-completions endpoint.
///
/// Cheap to share: wrap in an `Arc` and hand it to every file task.
pub struct CompletionClient {
    agent: ureq::Agent,
    endpoint: String,
}

impl CompletionClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            agent,
            endpoint: endpoint.into(),
        }
    }

    /// Client for [`OPENROUTER_ENDPOINT`].
    pub fn openrouter() -> Self {
        Self::new(OPENROUTER_ENDPOINT)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send `messages` to `model` and return the content of the last choice.
    pub fn complete(
        &self,
        token: &str,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, PromptError> {
        let body = serde_json::to_value(ChatRequest {
            model,
            messages,
            temperature: TEMPERATURE,
        })?;

        let response = match self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json;charset=utf-8")
            .set("Authorization", &format!("Bearer {token}"))
            .send_json(body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(PromptError::Status { status, body });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(PromptError::Transport(transport.to_string()));
            }
        };

        let status = response.status();
        let text = response
            .into_string()
            .map_err(|e| PromptError::Transport(format!("error read response: {e}")))?;
        if status != 200 {
            return Err(PromptError::Status { status, body: text });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| PromptError::Decode(format!("failed to unmarshal response: {e}")))?;
        let Some(choice) = parsed.choices.into_iter().last() else {
            return Err(PromptError::Decode("response contains no choices".to_string()));
        };
        Ok(choice.message.content.unwrap_or_default())
    }
}
