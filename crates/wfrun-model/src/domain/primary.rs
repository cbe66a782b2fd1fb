use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{ConfigSection, ModelError};

/// Key holding the workflow run directory.
pub const RUN_DIR_KEY: &str = "runDir";
/// Key holding the engine's data/work directory.
pub const WORK_DIR_KEY: &str = "workDir";
/// Optional key overriding the workflow's success message.
pub const SUCCESS_MESSAGE_KEY: &str = "successMessage";
/// `workDir` default, relative to `runDir`.
pub const DEFAULT_WORK_SUBDIR: &str = "workspace";

/// Typed view of the primary configuration section, used to construct the workflow object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryOptions {
    /// Directory holding run status artifacts (exit code marker, logs).
    pub run_dir: PathBuf,
    /// Root of the engine's task data.
    pub work_dir: PathBuf,
    /// The complete primary section, passed through to the workflow.
    pub values: ConfigSection,
}

impl PrimaryOptions {
    /// Build typed options from the designated primary section.
    ///
    /// `runDir` is required; `workDir` defaults to `<runDir>/workspace`.
    pub fn from_section(section: &ConfigSection) -> Result<Self, ModelError> {
        let run_dir = section
            .get(RUN_DIR_KEY)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ModelError::MissingKey {
                section: section.name().to_string(),
                key: RUN_DIR_KEY.to_string(),
            })?;
        let work_dir = section
            .get(WORK_DIR_KEY)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| run_dir.join(DEFAULT_WORK_SUBDIR));

        Ok(Self {
            run_dir,
            work_dir,
            values: section.clone(),
        })
    }

    pub fn section_name(&self) -> &str {
        self.values.name()
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Look up any key of the primary section.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key)
    }

    pub fn success_message(&self) -> Option<&str> {
        self.get(SUCCESS_MESSAGE_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_dir_defaults_under_run_dir() {
        let s = ConfigSection::new("StrelkaSomatic").with("runDir", "/runs/a");
        let p = PrimaryOptions::from_section(&s).unwrap();
        assert_eq!(p.run_dir, PathBuf::from("/runs/a"));
        assert_eq!(p.work_dir, PathBuf::from("/runs/a/workspace"));
        assert_eq!(p.section_name(), "StrelkaSomatic");
    }

    #[test]
    fn explicit_work_dir_wins() {
        let s = ConfigSection::new("p")
            .with("runDir", "/runs/a")
            .with("workDir", "/scratch/a");
        let p = PrimaryOptions::from_section(&s).unwrap();
        assert_eq!(p.work_dir, PathBuf::from("/scratch/a"));
    }

    #[test]
    fn missing_run_dir_is_an_error() {
        let s = ConfigSection::new("p").with("runDir", "  ");
        assert_eq!(
            PrimaryOptions::from_section(&s),
            Err(ModelError::MissingKey {
                section: "p".into(),
                key: "runDir".into()
            })
        );
    }

    #[test]
    fn serializes_with_camel_case_and_values() {
        let s = ConfigSection::new("p")
            .with("runDir", "/r")
            .with("successMessage", "done");
        let p = PrimaryOptions::from_section(&s).unwrap();
        assert_eq!(p.success_message(), Some("done"));

        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["runDir"], "/r");
        assert_eq!(v["workDir"], "/r/workspace");
        assert_eq!(v["values"]["successMessage"], "done");
    }
}
