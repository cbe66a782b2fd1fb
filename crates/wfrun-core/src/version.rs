//! Driver version gate between a generated script and the `wfrun` binary executing it.

use crate::error::CoreError;

/// Version of this driver build.
pub const DRIVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `major.minor` requirement written into generated scripts.
pub fn required_version_tag() -> String {
    match parse_major_minor(DRIVER_VERSION) {
        Some((major, minor)) => format!("{major}.{minor}"),
        None => DRIVER_VERSION.to_string(),
    }
}

/// Reject a running driver that cannot execute a script requiring `required`.
///
/// The major versions must match and the running minor must be at least the required one.
pub fn check_driver_version(required: &str, running: &str) -> Result<(), CoreError> {
    let want = parse_major_minor(required).ok_or_else(|| {
        CoreError::IncompatibleDriver(format!("invalid required driver version '{required}'"))
    })?;
    let have = parse_major_minor(running).ok_or_else(|| {
        CoreError::IncompatibleDriver(format!("cannot parse driver version '{running}'"))
    })?;

    if have.0 != want.0 || have < want {
        return Err(CoreError::IncompatibleDriver(format!(
            "This script requires wfrun driver version {}.{} (compatible major version {}), but detected version {running}",
            want.0, want.1, want.0
        )));
    }
    Ok(())
}

fn parse_major_minor(v: &str) -> Option<(u64, u64)> {
    let mut parts = v.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        // Pre-release suffixes such as `1-rc1` only qualify the patch level.
        Some(m) => m.split(['-', '+']).next()?.parse().ok()?,
        None => 0,
    };
    Some((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_or_newer_minor_is_accepted() {
        assert!(check_driver_version("0.1", "0.1.0").is_ok());
        assert!(check_driver_version("1.2", "1.2.7").is_ok());
        assert!(check_driver_version("1.2", "1.5.0").is_ok());
    }

    #[test]
    fn older_minor_or_other_major_is_rejected() {
        let err = check_driver_version("1.4", "1.3.9").unwrap_err();
        assert!(err.to_string().contains("detected version 1.3.9"));
        assert!(check_driver_version("1.4", "2.0.0").is_err());
        assert!(check_driver_version("2.0", "1.9.0").is_err());
    }

    #[test]
    fn garbage_versions_are_rejected() {
        assert!(check_driver_version("one", "1.0.0").is_err());
        assert!(check_driver_version("1.0", "dev").is_err());
    }

    #[test]
    fn own_tag_satisfies_own_version() {
        let tag = required_version_tag();
        assert_eq!(tag.split('.').count(), 2);
        assert!(check_driver_version(&tag, DRIVER_VERSION).is_ok());
    }
}
