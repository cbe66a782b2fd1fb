mod config;
mod error;
mod format;
mod log;

pub use config::{LOG_FORMAT_ENV, LOG_LEVEL_ENV, LoggerConfig};
pub use error::LoggerError;
pub use format::LoggerFormat;

/// Install the global `tracing` subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] on a second call.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    log::install(cfg)
}
