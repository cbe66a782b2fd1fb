//! Fixed segments of a generated driver script.
//!
//! Placeholders have the form `@NAME@` and are replaced in a single pass by [`render`].
//! Values substituted into shell code must already be quoted; `COMMAND_LINE` and `CONFIG_FILE`
//! only appear in comments and must be single-line.

/// Shebang, provenance and the values fixed at generation time.
pub const HEADER: &str = r#"#!/bin/sh
#
# Workflow run script generated by:
#
#   @COMMAND_LINE@
#
# Run this script with '-h' for the list of run options.
# Configuration is read from the adjacent file '@CONFIG_FILE@'.

WFRUN_DRIVER=@DRIVER@
WFRUN_REQUIRES=@REQUIRES@
WFRUN_MODULE_DIR=@MODULE_DIR@
WFRUN_MODULE=@MODULE@
WFRUN_MODULE_FILE=@MODULE_FILE@
WFRUN_WORKFLOW_CLASS=@WORKFLOW_CLASS@
"#;

/// Run options accepted by the driver, and the driver availability check.
pub const RUN_OPTIONS: &str = r#"
# Run options:
#   -m, --mode MODE         local or sge (required)
#   -q, --queue NAME        scheduler queue (sge mode)
#   -j, --jobs N            concurrent jobs, or 'unlimited'
#   -g, --memGb N           memory budget in gigabytes, or 'unlimited'
#   -d, --dryRun            walk the task graph without running commands
#       --quiet             log errors only
#   -e, --mailTo ADDRESS    completion notification (repeatable)
#
# Re-running this script resumes an interrupted run.

check_driver() {
    if [ ! -x "$WFRUN_DRIVER" ] && ! command -v "$WFRUN_DRIVER" >/dev/null 2>&1; then
        echo "$(basename "$0"): workflow driver '$WFRUN_DRIVER' is not executable" >&2
        exit 2
    fi
}
"#;

/// Hands the run over to the driver.
pub const CONTROLLER: &str = r#"
main() {
    config=$1
    primary_section=$2
    workflow_class=$3
    shift 3

    check_driver
    exec "$WFRUN_DRIVER" exec \
        --requires "$WFRUN_REQUIRES" \
        --config "$config" \
        --primary-section "$primary_section" \
        --workflow-module "$WFRUN_MODULE_DIR/$WFRUN_MODULE_FILE" \
        --workflow-class "$workflow_class" \
        --prog "$(basename "$0")" \
        -- "$@"
}

main @CONFIG@ @PRIMARY_SECTION@ "$WFRUN_WORKFLOW_CLASS" "$@"
"#;

/// Replace `@NAME@` placeholders found in `vars`; unknown `@...@` text is kept verbatim.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('@') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let hit = after.find('@').and_then(|end| {
            let name = &after[..end];
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (end, *v))
        });
        match hit {
            Some((end, value)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('@');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Quote `value` as a single POSIX shell word.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_known_placeholders_once() {
        let out = render("a=@A@ b=@B@ mail@host", &[("A", "@B@"), ("B", "2")]);
        assert_eq!(out, "a=@B@ b=2 mail@host");
    }

    #[test]
    fn quote_escapes_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("$HOME `x`"), "'$HOME `x`'");
    }

    #[test]
    fn segments_carry_expected_placeholders() {
        for p in ["@DRIVER@", "@REQUIRES@", "@MODULE_DIR@", "@WORKFLOW_CLASS@"] {
            assert!(HEADER.contains(p), "{p}");
        }
        assert!(HEADER.starts_with("#!/bin/sh\n"));
        assert!(CONTROLLER.contains("@CONFIG@"));
        assert!(CONTROLLER.trim_end().ends_with(r#""$@""#));
    }
}
