//! Host inspection: hardware estimates used as run-option fallbacks, plus identity for logs.

use wfrun_model::MemMb;

use crate::error::EstimationError;

/// Source of the hardware values used when the operator leaves `-j` / `-g` unset.
pub trait ResourceEstimator: Send + Sync {
    /// Hyperthreaded (logical) core count of this node.
    fn core_count(&self) -> Result<u32, EstimationError>;
    /// Total memory of this node in megabytes.
    fn memory_mb(&self) -> Result<MemMb, EstimationError>;
}

/// Probes the current host.
///
/// Logical cores come from `sysconf(_SC_NPROCESSORS_ONLN)`.
/// Memory comes from `MemTotal` in `/proc/meminfo` on Linux and from `_SC_PHYS_PAGES * _SC_PAGESIZE` elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostEstimator;

impl ResourceEstimator for HostEstimator {
    fn core_count(&self) -> Result<u32, EstimationError> {
        let n = sysconf(SysconfKey::OnlineCpus)
            .ok_or_else(|| EstimationError::Cores("sysconf(_SC_NPROCESSORS_ONLN) failed".into()))?;
        u32::try_from(n)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| EstimationError::Cores(format!("implausible core count: {n}")))
    }

    fn memory_mb(&self) -> Result<MemMb, EstimationError> {
        #[cfg(target_os = "linux")]
        {
            if let Ok(content) = std::fs::read_to_string("/proc/meminfo")
                && let Some(mb) = parse_meminfo_total_mb(&content)
            {
                return Ok(mb);
            }
        }

        let pages = sysconf(SysconfKey::PhysPages)
            .ok_or_else(|| EstimationError::Memory("sysconf(_SC_PHYS_PAGES) failed".into()))?;
        let page_size = sysconf(SysconfKey::PageSize)
            .ok_or_else(|| EstimationError::Memory("sysconf(_SC_PAGESIZE) failed".into()))?;
        let mb = pages.saturating_mul(page_size) / (1024 * 1024);
        if mb == 0 {
            return Err(EstimationError::Memory("reported total memory is zero".into()));
        }
        Ok(mb)
    }
}

/// Fixed estimates; `None` makes the matching probe fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticEstimator {
    pub cores: Option<u32>,
    pub mem_mb: Option<MemMb>,
}

impl StaticEstimator {
    pub fn new(cores: u32, mem_mb: MemMb) -> Self {
        Self {
            cores: Some(cores),
            mem_mb: Some(mem_mb),
        }
    }

    /// An estimator whose probes always fail.
    pub fn failing() -> Self {
        Self::default()
    }
}

impl ResourceEstimator for StaticEstimator {
    fn core_count(&self) -> Result<u32, EstimationError> {
        self.cores
            .ok_or_else(|| EstimationError::Cores("no core count available".into()))
    }

    fn memory_mb(&self) -> Result<MemMb, EstimationError> {
        self.mem_mb
            .ok_or_else(|| EstimationError::Memory("no memory size available".into()))
    }
}

/// Host name for log records, best effort.
pub fn hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Get platform (OS family).
#[inline]
pub fn platform() -> &'static str {
    std::env::consts::OS
}

/// Get architecture.
#[inline]
pub fn arch() -> &'static str {
    std::env::consts::ARCH
}

/// Extract `MemTotal` (reported in kB) from `/proc/meminfo` content, in MB.
pub(crate) fn parse_meminfo_total_mb(content: &str) -> Option<MemMb> {
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            let mut parts = rest.split_whitespace();
            let value: u64 = parts.next()?.parse().ok()?;
            let mb = match parts.next() {
                Some("kB") | None => value / 1024,
                Some("MB") => value,
                Some(_) => return None,
            };
            return (mb > 0).then_some(mb);
        }
    }
    None
}

enum SysconfKey {
    OnlineCpus,
    PhysPages,
    PageSize,
}

#[cfg(unix)]
fn sysconf(key: SysconfKey) -> Option<u64> {
    let name = match key {
        SysconfKey::OnlineCpus => libc::_SC_NPROCESSORS_ONLN,
        SysconfKey::PhysPages => libc::_SC_PHYS_PAGES,
        SysconfKey::PageSize => libc::_SC_PAGESIZE,
    };
    let rc = unsafe { libc::sysconf(name) };
    u64::try_from(rc).ok().filter(|v| *v > 0)
}

#[cfg(not(unix))]
fn sysconf(_key: SysconfKey) -> Option<u64> {
    None
}
