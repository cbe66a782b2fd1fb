use std::{
    env,
    ffi::{OsStr, OsString},
    path::Path,
    process::ExitStatus,
};

use tokio::process::Command;

use crate::error::{ExecError, ExecResult};

pub fn cmd_program<S: AsRef<OsStr>>(program: impl AsRef<OsStr>, args: &[S]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd
}

/// `PATH` with `dir` in front of the inherited search path.
pub fn prepend_path(dir: &Path) -> OsString {
    let mut paths = vec![dir.to_path_buf()];
    if let Some(current) = env::var_os("PATH") {
        paths.extend(env::split_paths(&current));
    }
    env::join_paths(paths).unwrap_or_else(|_| dir.as_os_str().to_os_string())
}

/// Exit code of a finished child; termination by signal is an error.
pub fn exit_code(status: ExitStatus) -> ExecResult<i32> {
    if let Some(code) = status.code() {
        return Ok(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return Err(ExecError::KilledBySignal(sig));
        }
    }
    Err(ExecError::NoStatus)
}
