//! The seam between the batch engine and the component that rewrites file
//! content.
//!
//! The engine never knows how a rewrite is produced; it only calls
//! [`Transformer::transform`] and applies its retry policy to the result.

use async_trait::async_trait;

use crate::error::TransformError;
use crate::types::{ContextFile, RunSettings, Transformed};

/// Converts one file's content into a proposed rewrite plus change records.
///
/// Implementations must be shareable across concurrently running file tasks.
/// Returned [`crate::ChangeRecord`]s carry an empty `path`; the caller stamps
/// it.
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn transform(
        &self,
        content: &str,
        settings: &RunSettings,
        context: &[ContextFile],
    ) -> Result<Transformed, TransformError>;
}
