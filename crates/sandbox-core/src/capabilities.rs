//! Runtime detection of available system capabilities
//!
//! Probes the running kernel and process state to decide whether seccomp
//! filters can be installed at all, and whether this process may do so.

use std::path::Path;
use std::sync::OnceLock;

use log::debug;

/// Detected system capabilities for filter installation
#[derive(Debug, Clone)]
pub struct SystemCapabilities {
    /// Running as root (euid == 0)
    pub has_root: bool,
    /// CAP_SYS_ADMIN is in the effective set
    pub has_sys_admin: bool,
    /// Seccomp filter mode is available
    pub has_seccomp: bool,
    /// PR_SET_NO_NEW_PRIVS is already set on this thread
    pub has_no_new_privs: bool,
    /// Running inside a container
    pub in_container: bool,
}

impl SystemCapabilities {
    /// Detect all available capabilities on the current system
    pub fn detect() -> Self {
        Self {
            has_root: detect_root(),
            has_sys_admin: detect_sys_admin(),
            has_seccomp: is_seccomp_available(),
            has_no_new_privs: detect_no_new_privs(),
            in_container: detect_container(),
        }
    }

    /// The kernel accepts filters from processes holding CAP_SYS_ADMIN or
    /// running with no_new_privs.
    pub fn can_install_filters(&self) -> bool {
        self.has_seccomp && (self.has_sys_admin || self.has_no_new_privs)
    }

    /// Get a human-readable summary of capabilities
    pub fn summary(&self) -> String {
        let check = |available: bool| if available { "[ok]" } else { "[--]" };

        [
            format!("{} Root privileges", check(self.has_root)),
            format!("{} CAP_SYS_ADMIN", check(self.has_sys_admin)),
            format!("{} Seccomp BPF", check(self.has_seccomp)),
            format!("{} no_new_privs set", check(self.has_no_new_privs)),
            format!("{} Container", check(self.in_container)),
        ]
        .join("\n")
    }
}

/// Whether the kernel supports seccomp filter mode.
///
/// The answer is computed once per process.
pub fn is_seccomp_available() -> bool {
    static CACHED: OnceLock<bool> = OnceLock::new();
    *CACHED.get_or_init(detect_seccomp)
}

fn detect_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

fn detect_seccomp() -> bool {
    // PR_GET_SECCOMP fails with EINVAL if seccomp is not built into the kernel
    if unsafe { libc::prctl(libc::PR_GET_SECCOMP, 0, 0, 0, 0) } < 0 {
        return false;
    }

    // Filter mode with a NULL program fails with EFAULT when supported,
    // EINVAL when only strict mode exists
    let ret = unsafe {
        libc::prctl(
            libc::PR_SET_SECCOMP,
            libc::SECCOMP_MODE_FILTER,
            std::ptr::null::<libc::c_void>(),
            0,
            0,
        )
    };
    let available = ret < 0 && std::io::Error::last_os_error().raw_os_error() == Some(libc::EFAULT);
    debug!("Seccomp filter mode available: {}", available);
    available
}

fn detect_no_new_privs() -> bool {
    unsafe { libc::prctl(libc::PR_GET_NO_NEW_PRIVS, 0, 0, 0, 0) == 1 }
}

fn detect_sys_admin() -> bool {
    const CAP_SYS_ADMIN: u32 = 21;

    let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
        return detect_root();
    };

    status
        .lines()
        .find_map(|line| line.strip_prefix("CapEff:"))
        .and_then(|mask| u64::from_str_radix(mask.trim(), 16).ok())
        .map(|mask| mask & (1 << CAP_SYS_ADMIN) != 0)
        .unwrap_or(false)
}

/// Best-effort container detection, used to skip checks that containers
/// usually cannot perform (realtime scheduling, `_sysctl`).
pub fn detect_container() -> bool {
    if Path::new("/run/.containerenv").exists() || Path::new("/.dockerenv").exists() {
        return true;
    }

    if let Ok(environ) = std::fs::read("/proc/1/environ") {
        if environ
            .split(|&b| b == 0)
            .any(|var| var.starts_with(b"container="))
        {
            return true;
        }
    }

    std::fs::read_to_string("/proc/1/cgroup")
        .map(|cgroup| {
            cgroup.contains("/docker/") || cgroup.contains("/lxc/") || cgroup.contains("kubepods")
        })
        .unwrap_or(false)
}
