//! Tracing subscriber setup for the `aifmt` binary.
//!
//! Diagnostics go to stderr so that stdout stays reserved for the proposed
//! changes and the summary table.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is `info`, or `debug` when
/// `verbose`. Calling this twice is harmless.
pub fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
