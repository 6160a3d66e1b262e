//! # aifmt-prompt
//!
//! The transform collaborator behind [`aifmt_core::Transformer`]: tera prompt
//! templates, the chat-completions client, and the reply decoder.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use aifmt_prompt::{CompletionClient, RemoteTransformer, TemplateEngine};
//!
//! fn build() -> Result<RemoteTransformer, aifmt_prompt::PromptError> {
//!     let engine = TemplateEngine::new(None)?;
//!     let client = CompletionClient::openrouter();
//!     Ok(RemoteTransformer::new(Arc::new(client), Arc::new(engine)))
//! }
//! ```

pub mod client;
pub mod context;
pub mod engine;
pub mod error;
pub mod reply;
pub mod transformer;

pub use client::{ChatMessage, CompletionClient, Role, OPENROUTER_ENDPOINT};
pub use context::PromptContext;
pub use engine::TemplateEngine;
pub use error::PromptError;
pub use reply::{FormatReply, Reply, ReplyKind};
pub use transformer::RemoteTransformer;
