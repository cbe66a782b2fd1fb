//! Config store: persists the configuration bundle next to a generated driver script.
//!
//! The artifact is a self-contained JSON envelope:
//!
//! ```json
//! { "format": "wfrun.config", "version": 1, "sections": { "<name>": { "<key>": "<value>" } } }
//! ```
//!
//! It is read by a separately launched driver process, possibly much later and from another working directory,
//! so it never refers to anything outside itself.

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use wfrun_model::{ConfigSectionBundle, PrimaryOptions};

use crate::error::StoreError;

/// Suffix appended to the script path to name its config artifact.
pub const CONFIG_ARTIFACT_SUFFIX: &str = ".config.json";
/// Format tag of the artifact envelope.
pub const ARTIFACT_FORMAT: &str = "wfrun.config";
/// Newest envelope version this build reads and the one it writes.
pub const ARTIFACT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ArtifactOut<'a> {
    format: &'a str,
    version: u32,
    sections: &'a ConfigSectionBundle,
}

#[derive(Deserialize)]
struct ArtifactIn {
    format: String,
    version: u32,
    sections: ConfigSectionBundle,
}

/// Config artifact path belonging to `script`: `<script>.config.json`.
pub fn config_artifact_path(script: &Path) -> PathBuf {
    let mut name = OsString::from(script.as_os_str());
    name.push(CONFIG_ARTIFACT_SUFFIX);
    PathBuf::from(name)
}

/// Write `bundle` to `destination`.
///
/// The parent directory must already exist; it is never created here.
/// The file is written to a sibling temporary path first and renamed into place.
#[instrument(level = "debug", skip(bundle), fields(sections = bundle.len()))]
pub fn persist(bundle: &ConfigSectionBundle, destination: &Path) -> Result<(), StoreError> {
    let write_err = |reason: String| StoreError::Write {
        path: destination.to_path_buf(),
        reason,
    };

    let parent = parent_dir(destination);
    if !parent.is_dir() {
        return Err(write_err(format!(
            "directory '{}' does not exist",
            parent.display()
        )));
    }

    let json = serde_json::to_vec_pretty(&ArtifactOut {
        format: ARTIFACT_FORMAT,
        version: ARTIFACT_VERSION,
        sections: bundle,
    })
    .map_err(|e| write_err(e.to_string()))?;

    let mut tmp = OsString::from(destination.as_os_str());
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, json).map_err(|e| write_err(e.to_string()))?;
    if let Err(e) = fs::rename(&tmp, destination) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(e.to_string()));
    }

    debug!(target: "wfrun.core.store", path = %destination.display(), "config artifact written");
    Ok(())
}

/// Read the artifact at `destination` and build the typed options of `primary_section`.
#[instrument(level = "debug")]
pub fn load(
    destination: &Path,
    primary_section: &str,
) -> Result<(PrimaryOptions, ConfigSectionBundle), StoreError> {
    let read_err = |reason: String| StoreError::Read {
        path: destination.to_path_buf(),
        reason,
    };

    let bytes = fs::read(destination).map_err(|e| read_err(e.to_string()))?;
    let artifact: ArtifactIn =
        serde_json::from_slice(&bytes).map_err(|e| read_err(format!("invalid artifact: {e}")))?;

    if artifact.format != ARTIFACT_FORMAT {
        return Err(read_err(format!(
            "unknown artifact format '{}'",
            artifact.format
        )));
    }
    if artifact.version > ARTIFACT_VERSION {
        return Err(read_err(format!(
            "artifact version {} is newer than supported version {ARTIFACT_VERSION}",
            artifact.version
        )));
    }

    let bundle = artifact.sections;
    let section = bundle
        .get(primary_section)
        .ok_or_else(|| StoreError::MissingSection {
            path: destination.to_path_buf(),
            section: primary_section.to_string(),
        })?;
    let options = PrimaryOptions::from_section(section).map_err(|e| read_err(e.to_string()))?;

    debug!(target: "wfrun.core.store", sections = bundle.len(), run_dir = %options.run_dir.display(), "config artifact loaded");
    Ok((options, bundle))
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfrun_model::ConfigSection;

    fn bundle(run_dir: &str) -> ConfigSectionBundle {
        ConfigSectionBundle::new()
            .with(
                ConfigSection::new("StrelkaGermline")
                    .with("runDir", run_dir)
                    .with("bamList", "/data/a.bam,/data/b.bam"),
            )
            .unwrap()
            .with(ConfigSection::new("userConfig").with("minMapq", "20"))
            .unwrap()
    }

    #[test]
    fn artifact_path_appends_suffix() {
        assert_eq!(
            config_artifact_path(Path::new("/runs/a/runWorkflow.sh")),
            PathBuf::from("/runs/a/runWorkflow.sh.config.json")
        );
    }

    #[test]
    fn persist_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runWorkflow.sh.config.json");
        let b = bundle("/runs/a");

        persist(&b, &path).unwrap();
        let (primary, loaded) = load(&path, "StrelkaGermline").unwrap();

        assert_eq!(loaded, b);
        assert_eq!(
            primary,
            PrimaryOptions::from_section(b.get("StrelkaGermline").unwrap()).unwrap()
        );
        assert!(!dir.path().join("runWorkflow.sh.config.json.tmp").exists());
    }

    #[test]
    fn persist_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("x.config.json");
        let err = persist(&bundle("/r"), &path).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert!(!dir.path().join("nope").exists());
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("absent.json"), "p").unwrap_err();
        assert!(matches!(err, StoreError::Read { .. }));
    }

    #[test]
    fn load_garbage_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, b"\x80not json").unwrap();
        assert!(matches!(load(&path, "p"), Err(StoreError::Read { .. })));

        fs::write(&path, r#"{"format":"other","version":1,"sections":{}}"#).unwrap();
        assert!(matches!(load(&path, "p"), Err(StoreError::Read { .. })));

        fs::write(&path, r#"{"format":"wfrun.config","version":99,"sections":{}}"#).unwrap();
        assert!(matches!(load(&path, "p"), Err(StoreError::Read { .. })));
    }

    #[test]
    fn load_missing_primary_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        persist(&bundle("/r"), &path).unwrap();
        let err = load(&path, "StrelkaSomatic").unwrap_err();
        assert!(
            matches!(err, StoreError::MissingSection { ref section, .. } if section == "StrelkaSomatic")
        );
    }

    #[test]
    fn primary_without_run_dir_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        let b = ConfigSectionBundle::new()
            .with(ConfigSection::new("p").with("x", "1"))
            .unwrap();
        persist(&b, &path).unwrap();
        assert!(matches!(load(&path, "p"), Err(StoreError::Read { .. })));
    }
}
