use serde::{Deserialize, Serialize};

use crate::{Limit, RunMode, TaskName};

/// Continuation policy handed to the workflow engine.
///
/// Every driver run resumes when a previous attempt left state behind and starts fresh otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContinueMode {
    #[default]
    Auto,
}

/// Fully resolved options of one driver invocation.
///
/// Produced by the run-option resolver; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOptions {
    /// Execution backend for workflow tasks.
    pub mode: RunMode,
    /// Maximum number of concurrently running jobs.
    pub jobs: Limit,
    /// Memory budget in megabytes.
    pub mem_mb: Limit,
    /// Walk the task graph without running command tasks.
    pub dry_run: bool,
    /// Suppress engine log output on stderr.
    pub quiet: bool,
    /// Completion notification addresses; `None` when mail is unavailable or none were given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_to: Option<Vec<String>>,
    /// Scheduler-native arguments, as flag/value pairs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scheduler_args: Vec<String>,
    /// Tasks to reset before resuming.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reset_tasks: Vec<TaskName>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_roundtrip() {
        let opts = RunOptions {
            mode: RunMode::Sge,
            jobs: Limit::Count(4),
            mem_mb: Limit::Unlimited,
            dry_run: false,
            quiet: true,
            mail_to: None,
            scheduler_args: vec!["-q".into(), "all.q".into()],
            reset_tasks: vec!["makeHyGenDir".into()],
        };
        let json = serde_json::to_value(&opts).unwrap();
        assert_eq!(json["mode"], "sge");
        assert_eq!(json["jobs"], 4);
        assert_eq!(json["memMb"], "unlimited");
        assert!(json.get("mailTo").is_none());

        let back: RunOptions = serde_json::from_value(json).unwrap();
        assert_eq!(back, opts);
    }

    #[test]
    fn continue_mode_is_auto() {
        assert_eq!(ContinueMode::default(), ContinueMode::Auto);
        assert_eq!(
            serde_json::to_string(&ContinueMode::Auto).unwrap(),
            r#""auto""#
        );
        assert!(serde_json::from_str::<ContinueMode>(r#""never""#).is_err());
    }
}
