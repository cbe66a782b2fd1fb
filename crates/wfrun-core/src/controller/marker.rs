use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, error};

use crate::error::CoreError;

/// Code recorded when an attempt ends before the engine reports one.
pub const DEFAULT_EXIT_CODE: i32 = 1;

/// Remove the exit-code marker left by a previous attempt.
///
/// A plain file is deleted; any other filesystem entry at that path is fatal.
pub fn clear_stale_marker(path: &Path) -> Result<(), CoreError> {
    match fs::symlink_metadata(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CoreError::io(path, e)),
        Ok(meta) if meta.file_type().is_file() => {
            fs::remove_file(path).map_err(|e| CoreError::io(path, e))?;
            debug!(target: "wfrun.core.controller", path = %path.display(), "stale exit marker removed");
            Ok(())
        }
        Ok(_) => Err(CoreError::UnexpectedFsEntry(path.to_path_buf())),
    }
}

/// Writes the exit-code marker exactly once for an armed attempt.
///
/// The marker is written by [`ExitMarkerGuard::finish`], or on drop when the attempt is abandoned
/// (early return or unwinding), in which case the current code is recorded.
#[derive(Debug)]
pub struct ExitMarkerGuard {
    path: PathBuf,
    code: i32,
    written: bool,
}

impl ExitMarkerGuard {
    pub fn arm(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            code: DEFAULT_EXIT_CODE,
            written: false,
        }
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn set(&mut self, code: i32) {
        self.code = code;
    }

    /// Write the marker and return the recorded code.
    pub fn finish(mut self) -> Result<i32, CoreError> {
        self.written = true;
        write_marker(&self.path, self.code).map_err(|e| CoreError::io(&self.path, e))?;
        Ok(self.code)
    }
}

impl Drop for ExitMarkerGuard {
    fn drop(&mut self) {
        if self.written {
            return;
        }
        self.written = true;
        if let Err(e) = write_marker(&self.path, self.code) {
            error!(target: "wfrun.core.controller", path = %self.path.display(), error = %e, "failed to write exit marker");
        }
    }
}

fn write_marker(path: &Path, code: i32) -> io::Result<()> {
    fs::write(path, format!("{code}\n"))?;
    debug!(target: "wfrun.core.controller", path = %path.display(), code, "exit marker written");
    Ok(())
}
