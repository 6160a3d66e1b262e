//! Template context: the serializable prompt payload built from one file and the
//! run settings.

use serde::{Deserialize, Serialize};

use aifmt_core::{ContextFile, RunSettings};

use crate::error::PromptError;

/// Everything the format prompt can reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptContext {
    /// Programming language of the file, as given on the command line.
    pub language: String,
    /// Current content of the file being rewritten.
    pub code: String,
    /// Ask the model to comment the code.
    pub comments: bool,
    /// Natural language for those comments.
    pub comments_language: String,
    /// Read-only neighbours, present only in context mode.
    pub context_files: Vec<ContextFileCtx>,
}

/// One context file as the template sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextFileCtx {
    pub path: String,
    pub content: String,
}

impl PromptContext {
    /// Build a [`PromptContext`] for `content`.
    ///
    /// Context files are included only when the run has context mode on.
    pub fn for_file(content: &str, settings: &RunSettings, context: &[ContextFile]) -> Self {
        let context_files = if settings.with_context {
            context
                .iter()
                .map(|file| ContextFileCtx {
                    path: file.path.display().to_string(),
                    content: file.content.clone(),
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            language: settings.language.clone(),
            code: content.to_string(),
            comments: settings.comments,
            comments_language: settings.comments_language.clone(),
            context_files,
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, PromptError> {
        tera::Context::from_serialize(self).map_err(PromptError::from)
    }
}
