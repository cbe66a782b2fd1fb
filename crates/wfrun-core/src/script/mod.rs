//! Driver script generator.
//!
//! Produces an executable shell script plus its config artifact. The script pins the driver binary,
//! the required driver version and the workflow module, and forwards its own arguments to `wfrun exec`.

mod template;
pub use template::{render, shell_quote};

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{info, instrument, warn};
use wfrun_model::ConfigSectionBundle;

use crate::{
    error::CoreError,
    store::{self, config_artifact_path},
    version::required_version_tag,
};

/// File name suffixes stripped from the workflow module file to form the module name.
pub const MODULE_SUFFIXES: &[&str] = &[".py"];

/// Permission bits of a generated script.
pub const SCRIPT_MODE: u32 = 0o744;

/// Inputs of one generation.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub script_path: PathBuf,
    pub workflow_module: PathBuf,
    pub workflow_class: String,
    pub primary_section: String,
    pub bundle: ConfigSectionBundle,
    /// Driver binary the script execs; defaults to the running executable.
    pub interpreter: Option<PathBuf>,
    /// Command line recorded in the script header.
    pub command_line: String,
}

/// Files written by a successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedScript {
    pub script_path: PathBuf,
    pub config_path: PathBuf,
}

/// Module name of a workflow module file: its file name without a known suffix.
pub fn module_name(file_name: &str) -> &str {
    MODULE_SUFFIXES
        .iter()
        .find_map(|sfx| file_name.strip_suffix(sfx))
        .filter(|stem| !stem.is_empty())
        .unwrap_or(file_name)
}

/// Absolute path of the running executable.
pub fn default_interpreter() -> Result<PathBuf, CoreError> {
    std::env::current_exe().map_err(|e| CoreError::io("<current executable>", e))
}

/// Write the config artifact and the driver script for `req`.
///
/// Only the script directory and the module file are checked; the bundle is stored as given and
/// read back by the run controller. Nothing is written when a precondition fails. The artifact is
/// removed again if the script cannot be written.
#[instrument(level = "info", skip(req), fields(script = %req.script_path.display(), class = %req.workflow_class))]
pub fn generate(req: &GenerateRequest) -> Result<GeneratedScript, CoreError> {
    let script_path =
        std::path::absolute(&req.script_path).map_err(|e| CoreError::io(&req.script_path, e))?;

    let parent = script_path
        .parent()
        .filter(|p| p.is_dir())
        .ok_or_else(|| {
            CoreError::Precondition(format!(
                "directory of script '{}' does not exist",
                script_path.display()
            ))
        })?;
    if !req.workflow_module.is_file() {
        return Err(CoreError::Precondition(format!(
            "workflow module '{}' is not a file",
            req.workflow_module.display()
        )));
    }

    let module_path = fs::canonicalize(&req.workflow_module)
        .map_err(|e| CoreError::io(&req.workflow_module, e))?;
    let (module_dir, module_file) = match (module_path.parent(), module_path.file_name()) {
        (Some(dir), Some(file)) => (dir.to_path_buf(), file.to_string_lossy().into_owned()),
        _ => {
            return Err(CoreError::Precondition(format!(
                "cannot split workflow module path '{}'",
                module_path.display()
            )));
        }
    };
    let interpreter = match &req.interpreter {
        Some(p) => p.clone(),
        None => default_interpreter()?,
    };

    let config_path = config_artifact_path(&script_path);
    store::persist(&req.bundle, &config_path)?;

    let text = render_script(&ScriptValues {
        command_line: &req.command_line,
        config_path: &config_path,
        interpreter: &interpreter,
        module_dir: &module_dir,
        module_file: &module_file,
        workflow_class: &req.workflow_class,
        primary_section: &req.primary_section,
    });

    if let Err(e) = write_script(&script_path, &text) {
        warn!(target: "wfrun.core.script", error = %e, "script write failed; removing config artifact");
        let _ = fs::remove_file(&config_path);
        return Err(e);
    }

    info!(target: "wfrun.core.script", dir = %parent.display(), module = module_name(&module_file), "driver script generated");
    Ok(GeneratedScript {
        script_path,
        config_path,
    })
}

struct ScriptValues<'a> {
    command_line: &'a str,
    config_path: &'a Path,
    interpreter: &'a Path,
    module_dir: &'a Path,
    module_file: &'a str,
    workflow_class: &'a str,
    primary_section: &'a str,
}

fn render_script(v: &ScriptValues<'_>) -> String {
    let lossy = |p: &Path| p.to_string_lossy().into_owned();
    let config = lossy(v.config_path);
    let config_file = v
        .config_path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.clone());

    let command_line = single_line(v.command_line);
    let config_file = single_line(&config_file);
    let driver = shell_quote(&lossy(v.interpreter));
    let requires = shell_quote(&required_version_tag());
    let module_dir = shell_quote(&lossy(v.module_dir));
    let module = shell_quote(module_name(v.module_file));
    let module_file = shell_quote(v.module_file);
    let class = shell_quote(v.workflow_class);
    let config = shell_quote(&config);
    let primary = shell_quote(v.primary_section);

    let vars: [(&str, &str); 10] = [
        ("COMMAND_LINE", &command_line),
        ("CONFIG_FILE", &config_file),
        ("DRIVER", &driver),
        ("REQUIRES", &requires),
        ("MODULE_DIR", &module_dir),
        ("MODULE", &module),
        ("MODULE_FILE", &module_file),
        ("WORKFLOW_CLASS", &class),
        ("CONFIG", &config),
        ("PRIMARY_SECTION", &primary),
    ];

    [template::HEADER, template::RUN_OPTIONS, template::CONTROLLER]
        .iter()
        .map(|segment| render(segment, &vars))
        .collect()
}

fn single_line(s: &str) -> String {
    s.replace(['\n', '\r'], " ")
}

fn write_script(path: &Path, text: &str) -> Result<(), CoreError> {
    fs::write(path, text).map_err(|e| CoreError::io(path, e))?;
    set_mode(path).map_err(|e| CoreError::io(path, e))
}

#[cfg(unix)]
fn set_mode(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(SCRIPT_MODE))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
