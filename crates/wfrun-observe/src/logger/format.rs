use std::{fmt, str::FromStr};

use crate::logger::error::LoggerError;

/// Where and how log records are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerFormat {
    /// Human-readable lines on stderr.
    Text,
    /// One JSON object per record on stderr.
    Json,
    /// Native journald fields (Linux, feature `journald`).
    Journald,
}

impl LoggerFormat {
    pub const ALL: [LoggerFormat; 3] = [LoggerFormat::Text, LoggerFormat::Json, LoggerFormat::Journald];

    pub fn as_str(self) -> &'static str {
        match self {
            LoggerFormat::Text => "text",
            LoggerFormat::Json => "json",
            LoggerFormat::Journald => "journald",
        }
    }

    /// Whether this build can install the format.
    pub fn is_available(self) -> bool {
        match self {
            LoggerFormat::Journald => cfg!(all(target_os = "linux", feature = "journald")),
            LoggerFormat::Text | LoggerFormat::Json => true,
        }
    }
}

impl fmt::Display for LoggerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;

    /// Case-insensitive; `journal` is accepted for `journald`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let wanted = if wanted == "journal" { "journald" } else { wanted.as_str() };
        let format = LoggerFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| LoggerError::InvalidFormat(s.to_string()))?;
        if format.is_available() {
            Ok(format)
        } else {
            Err(LoggerError::JournaldNotSupported)
        }
    }
}
