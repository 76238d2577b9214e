//! Process-wide tracing setup shared by the stockreloc binaries.

pub mod tracing;

pub use tracing::{LOG_FORMAT_ENV, LogFormat};

/// Installs the global subscriber in the format chosen by the environment.
/// Later calls leave the first subscriber in place.
pub fn init() {
    tracing::init();
}
