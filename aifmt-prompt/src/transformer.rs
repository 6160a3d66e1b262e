//! [`RemoteTransformer`]: render the prompt, call the endpoint, decode the rewrite.

use std::sync::Arc;

use async_trait::async_trait;

use aifmt_core::{ContextFile, RunSettings, TransformError, Transformed, Transformer};

use crate::client::{ChatMessage, CompletionClient};
use crate::context::PromptContext;
use crate::engine::TemplateEngine;
use crate::error::PromptError;
use crate::reply::{self, Reply, ReplyKind};

/// Production [`Transformer`]: renders the format prompt, sends it to the
/// completion endpoint, and decodes the structured reply.
#[derive(Clone)]
pub struct RemoteTransformer {
    client: Arc<CompletionClient>,
    engine: Arc<TemplateEngine>,
}

impl RemoteTransformer {
    pub fn new(client: Arc<CompletionClient>, engine: Arc<TemplateEngine>) -> Self {
        Self { client, engine }
    }

    /// Render the prompt that [`Transformer::transform`] would send.
    pub fn build_prompt(
        &self,
        content: &str,
        settings: &RunSettings,
        context: &[ContextFile],
    ) -> Result<String, PromptError> {
        let ctx = PromptContext::for_file(content, settings, context);
        self.engine.render_format(&ctx)
    }
}

#[async_trait]
impl Transformer for RemoteTransformer {
    async fn transform(
        &self,
        content: &str,
        settings: &RunSettings,
        context: &[ContextFile],
    ) -> Result<Transformed, TransformError> {
        let prompt = self.build_prompt(content, settings, context)?;

        let client = Arc::clone(&self.client);
        let token = settings.token.clone();
        let model = settings.model.clone();
        let raw = tokio::task::spawn_blocking(move || {
            client.complete(&token, &model, &[ChatMessage::user(prompt)])
        })
        .await
        .map_err(|e| TransformError::Transport(format!("completion task join error: {e}")))??;

        tracing::debug!(model = %settings.model, bytes = raw.len(), "completion received");

        match reply::decode(&raw, ReplyKind::Structured)? {
            Reply::Structured(reply) => Ok(reply.into_transformed()),
            Reply::Text(_) => Err(TransformError::Decode(
                "expected a structured reply".to_string(),
            )),
        }
    }
}
