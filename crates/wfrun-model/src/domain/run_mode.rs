use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Where workflow tasks are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// All tasks run on the current host.
    Local,
    /// Tasks are submitted to an SGE cluster scheduler.
    Sge,
}

impl RunMode {
    /// Every accepted mode, in help-text order.
    pub const ALL: [RunMode; 2] = [RunMode::Local, RunMode::Sge];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Local => "local",
            RunMode::Sge => "sge",
        }
    }

    /// Returns `true` for modes that hand tasks to a cluster scheduler.
    pub fn is_scheduler(&self) -> bool {
        matches!(self, RunMode::Sge)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(RunMode::Local),
            "sge" => Ok(RunMode::Sge),
            _ => Err(ModelError::InvalidMode(s.to_string())),
        }
    }
}
