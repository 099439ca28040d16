//! Tracing subscriber installation.
//!
//! Library code only emits `tracing` events; embedders decide where they go.
//! `init_logging` is a convenience for binaries and tests.

use tracing_subscriber::fmt;

use crate::backend::config::LoggingConfig;

/// Install a global fmt subscriber at the configured level
///
/// Returns `false` when a global subscriber was already installed, which is
/// the normal case when several tests call this.
pub fn init_logging(config: &LoggingConfig) -> bool {
    fmt()
        .with_max_level(config.level.as_tracing())
        .with_target(true)
        .try_init()
        .is_ok()
}
