use std::io::IsTerminal;

use crate::logger::{error::LoggerError, format::LoggerFormat};

/// Overrides [`LoggerConfig::level`] (an `EnvFilter` directive, e.g. `debug` or `wfrun_core=trace`).
pub const LOG_LEVEL_ENV: &str = "WFRUN_LOG_LEVEL";
/// Overrides [`LoggerConfig::format`] (`text`, `json` or `journald`).
pub const LOG_FORMAT_ENV: &str = "WFRUN_LOG_FORMAT";

/// Driver logging configuration.
///
/// Log records always go to stderr so that stdout stays free for the workflow engine.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let use_color = cfg!(test) || std::io::stderr().is_terminal();
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            use_color,
        }
    }
}

impl LoggerConfig {
    /// Defaults overridden by `WFRUN_LOG_LEVEL` / `WFRUN_LOG_FORMAT` when set.
    pub fn from_env() -> Result<Self, LoggerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`LoggerConfig::from_env`] with an explicit variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoggerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(level) = lookup(LOG_LEVEL_ENV).filter(|v| !v.trim().is_empty()) {
            cfg.level = level.trim().to_string();
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV).filter(|v| !v.trim().is_empty()) {
            cfg.format = format.parse()?;
        }
        if cfg.format == LoggerFormat::Json {
            cfg.use_color = false;
        }
        Ok(cfg)
    }

    /// Restrict output to errors (used for `--quiet` runs).
    pub fn quiet(mut self) -> Self {
        self.level = "error".to_string();
        self
    }
}
