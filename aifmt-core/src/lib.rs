//! aifmt core library: domain types, configuration store, errors.
//!
//! Public API surface:
//! - [`types`]: run settings, context files, change records
//! - [`config`]: load / init / set for `~/.aifmt/config.yaml`
//! - [`transform`]: the [`Transformer`] seam consumed by the batch engine
//! - [`error`]: [`ConfigError`], [`TransformError`]

pub mod config;
pub mod error;
pub mod transform;
pub mod types;

pub use config::{Config, ConfigOrigin};
pub use error::{ConfigError, TransformError};
pub use transform::Transformer;
pub use types::{ChangeRecord, ContextFile, ReportFlush, RunSettings, Transformed};
