//! Tera prompt engine: embedded templates plus optional user overrides.
//!
//! # Templates
//!
//! | Name                        | Role                                        |
//! |-----------------------------|---------------------------------------------|
//! | `format.tera`               | the request sent for every file             |
//! | `shared/_context.tera`      | context-mode listing of neighbouring files  |
//! | `shared/_reply_format.tera` | the JSON shape the reply must follow        |

use std::path::{Path, PathBuf};

use tera::Tera;

use crate::context::PromptContext;
use crate::error::PromptError;

/// Name of the template rendered for each file.
pub const FORMAT_TEMPLATE: &str = "format.tera";

// ---------------------------------------------------------------------------
// Embedded templates, baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("shared/_context.tera", include_str!("templates/_partials/context.tera")),
    (
        "shared/_reply_format.tera",
        include_str!("templates/_partials/reply_format.tera"),
    ),
    (FORMAT_TEMPLATE, include_str!("templates/format.tera")),
];

/// Override file for an embedded template: its file name, flat in `dir`.
fn override_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name.rsplit('/').next().unwrap_or(name))
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, PromptError> {
    let mut templates = Vec::with_capacity(TPLS.len());
    for (name, embedded) in TPLS {
        let path = user_template_dir.map(|dir| override_path(dir, name));
        let content = match path {
            Some(path) if path.is_file() => {
                tracing::debug!(template = %name, path = %path.display(), "using prompt template override");
                std::fs::read_to_string(&path).map_err(|source| PromptError::Io { path, source })?
            }
            _ => (*embedded).to_string(),
        };
        templates.push((*name, content));
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera-based engine for rendering prompts with optional user overrides.
///
/// `user_template_dir` may hold `format.tera`, `_context.tera` or
/// `_reply_format.tera`; each one present replaces the embedded default.
/// Anything else in the directory is ignored.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Construct a new [`TemplateEngine`], loading embedded templates plus any
    /// overrides found in `user_template_dir`.
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, PromptError> {
        let tera = build_tera(user_template_dir)?;
        Ok(TemplateEngine { tera })
    }

    /// Render the per-file format prompt.
    pub fn render_format(&self, ctx: &PromptContext) -> Result<String, PromptError> {
        let tera_ctx = ctx.to_tera_context()?;
        let rendered = self.tera.render(FORMAT_TEMPLATE, &tera_ctx)?;
        Ok(rendered.replace("\r\n", "\n"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
