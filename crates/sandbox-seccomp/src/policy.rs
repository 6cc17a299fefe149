//! Policy configuration
//!
//! A [`SeccompPolicy`] is the serializable description of everything this
//! crate can restrict. It is compiled first, so that every name is checked
//! before the first filter reaches the kernel, then installed restrictor by
//! restrictor.

use std::collections::BTreeSet;
use std::path::Path;

use log::{info, warn};
use sandbox_core::{is_seccomp_available, Result, SandboxError, SystemCapabilities};
use sandbox_namespace::{flags_from_string_many, CloneFlags};
use serde::{Deserialize, Serialize};

use crate::action::FilterAction;
use crate::arch::Arch;
use crate::filter_set::{self, FilterSetId};
use crate::loader::{self, expand_set, filter_state, FilterState};
use crate::personality::{lock_personality, opinionated_personality};
use crate::restrict::{
    memory_deny_write_execute, protect_sysctl, restrict_address_families, restrict_archs,
    restrict_namespaces, restrict_realtime, syscall_on,
};

// Indexed by value, from linux/socket.h
static ADDRESS_FAMILIES: &[&str] = &[
    "AF_UNSPEC", "AF_UNIX", "AF_INET", "AF_AX25", "AF_IPX", "AF_APPLETALK", "AF_NETROM",
    "AF_BRIDGE", "AF_ATMPVC", "AF_X25", "AF_INET6", "AF_ROSE", "AF_DECnet", "AF_NETBEUI",
    "AF_SECURITY", "AF_KEY", "AF_NETLINK", "AF_PACKET", "AF_ASH", "AF_ECONET", "AF_ATMSVC",
    "AF_RDS", "AF_SNA", "AF_IRDA", "AF_PPPOX", "AF_WANPIPE", "AF_LLC", "AF_IB", "AF_MPLS",
    "AF_CAN", "AF_TIPC", "AF_BLUETOOTH", "AF_IUCV", "AF_RXRPC", "AF_ISDN", "AF_PHONET",
    "AF_IEEE802154", "AF_CAIF", "AF_ALG", "AF_NFC", "AF_VSOCK", "AF_KCM", "AF_QIPCRTR",
    "AF_SMC", "AF_XDP", "AF_MCTP",
];

/// Address family constant for an `AF_*` name. `AF_LOCAL` is accepted as an
/// alias of `AF_UNIX`.
pub fn address_family_from_name(name: &str) -> Option<i32> {
    if name == "AF_LOCAL" {
        return Some(libc::AF_UNIX);
    }

    ADDRESS_FAMILIES
        .iter()
        .position(|&known| known == name)
        .map(|af| af as i32)
}

pub fn address_family_to_name(af: i32) -> Option<&'static str> {
    usize::try_from(af)
        .ok()
        .and_then(|index| ADDRESS_FAMILIES.get(index).copied())
}

/// Restrictions to apply to the current process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeccompPolicy {
    /// Filter set (`@name`) and syscall names. Allowed unless the first entry
    /// starts with `~`, in which case the listed syscalls are denied.
    pub system_call_filter: Vec<String>,
    /// Fail filtered syscalls with this errno instead of killing the thread
    pub system_call_error_number: Option<i32>,
    /// Namespace types that may still be created or joined
    pub restrict_namespaces: Option<String>,
    /// `AF_*` names passed to `socket()`; a leading `~` on the first entry
    /// denies the listed families instead
    pub restrict_address_families: Option<Vec<String>>,
    /// Architectures allowed in addition to native
    pub system_call_architectures: Vec<String>,
    pub restrict_realtime: bool,
    pub memory_deny_write_execute: bool,
    pub lock_personality: bool,
    pub protect_kernel_tunables: bool,
}

/// What [`SeccompPolicy::apply`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    /// Filters were installed; `programs` counts the kernel filter programs
    Applied { programs: usize },
    /// Filtering is impossible here, nothing was installed
    Skipped(String),
}

/// A list whose first entry may carry a `~` to invert it
fn split_inverted(entries: &[String]) -> (bool, Vec<&str>) {
    let mut inverted = false;
    let items = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| match entry.strip_prefix('~') {
            Some(rest) if i == 0 => {
                inverted = true;
                rest
            }
            _ => entry.as_str(),
        })
        .filter(|item| !item.is_empty())
        .collect();
    (inverted, items)
}

#[derive(Debug)]
struct SyscallFilter {
    allow_list: bool,
    names: BTreeSet<&'static str>,
    extra: BTreeSet<String>,
    deny: FilterAction,
}

/// A policy with every name resolved
#[derive(Debug, Default)]
struct CompiledPolicy {
    archs: Option<Vec<Arch>>,
    namespaces: Option<CloneFlags>,
    address_families: Option<(BTreeSet<i32>, bool)>,
    restrict_realtime: bool,
    memory_deny_write_execute: bool,
    lock_personality: bool,
    protect_sysctl: bool,
    syscall_filter: Option<SyscallFilter>,
}

impl SeccompPolicy {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SandboxError::InvalidConfig(format!("Failed to parse policy: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json).map_err(|e| match e {
            SandboxError::InvalidConfig(msg) => {
                SandboxError::InvalidConfig(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SandboxError::InvalidConfig(format!("Failed to serialize policy: {}", e)))
    }

    /// Whether applying this policy would install nothing.
    pub fn is_empty(&self) -> bool {
        *self == SeccompPolicy::default()
    }

    /// Resolve every name without touching the process.
    pub fn validate(&self) -> Result<()> {
        self.compile().map(|_| ())
    }

    fn compile(&self) -> Result<CompiledPolicy> {
        let mut compiled = CompiledPolicy {
            restrict_realtime: self.restrict_realtime,
            memory_deny_write_execute: self.memory_deny_write_execute,
            lock_personality: self.lock_personality,
            protect_sysctl: self.protect_kernel_tunables,
            ..Default::default()
        };

        if let Some(errno) = self.system_call_error_number {
            if errno <= 0 || errno > 4095 {
                return Err(SandboxError::InvalidConfig(format!(
                    "system_call_error_number {} is not an errno value",
                    errno
                )));
            }
        }

        if !self.system_call_architectures.is_empty() {
            let archs = self
                .system_call_architectures
                .iter()
                .map(|name| name.parse::<Arch>())
                .collect::<Result<Vec<_>>>()?;
            compiled.archs = Some(archs);
        }

        if let Some(names) = &self.restrict_namespaces {
            compiled.namespaces = Some(flags_from_string_many(names)?);
        }

        if let Some(entries) = &self.restrict_address_families {
            let (inverted, names) = split_inverted(entries);
            let families = names
                .into_iter()
                .map(|name| {
                    address_family_from_name(name)
                        .ok_or_else(|| SandboxError::unknown("address family", name))
                })
                .collect::<Result<BTreeSet<_>>>()?;
            compiled.address_families = Some((families, !inverted));
        }

        if !self.system_call_filter.is_empty() {
            compiled.syscall_filter = Some(self.compile_syscall_filter()?);
        }

        Ok(compiled)
    }

    fn compile_syscall_filter(&self) -> Result<SyscallFilter> {
        let (inverted, entries) = split_inverted(&self.system_call_filter);

        let mut filter = SyscallFilter {
            allow_list: !inverted,
            names: BTreeSet::new(),
            extra: BTreeSet::new(),
            deny: FilterAction::deny(self.system_call_error_number),
        };

        // An allow-list without the basics kills the process on its way out.
        if filter.allow_list {
            filter.names.extend(expand_set(FilterSetId::Default.set())?);
        }

        for entry in entries {
            if entry.starts_with('@') {
                let set = filter_set::find(entry)
                    .ok_or_else(|| SandboxError::unknown("filter set", entry))?;
                filter.names.extend(expand_set(set)?);
            } else if Arch::local().iter().any(|&arch| syscall_on(arch.resolve(), entry).is_some()) {
                filter.extra.insert(entry.to_string());
            } else {
                return Err(SandboxError::unknown("system call", entry));
            }
        }

        Ok(filter)
    }

    /// Install every restriction this policy asks for on the calling thread.
    ///
    /// Names are resolved first; a bad name fails before anything is
    /// installed. When the kernel lacks seccomp or the process may not
    /// install filters, nothing happens and [`PolicyOutcome::Skipped`] is
    /// returned. Any error after the first filter went in leaves the process
    /// partially restricted.
    pub fn apply(&self) -> Result<PolicyOutcome> {
        let compiled = self.compile()?;

        if !is_seccomp_available() {
            warn!("Seccomp is not available, not applying policy");
            return Ok(PolicyOutcome::Skipped(
                "seccomp filter mode is not available".to_string(),
            ));
        }

        let caps = SystemCapabilities::detect();
        if !caps.can_install_filters() {
            warn!("Missing CAP_SYS_ADMIN and no_new_privs is not set, not applying policy");
            return Ok(PolicyOutcome::Skipped(
                "neither CAP_SYS_ADMIN nor no_new_privs".to_string(),
            ));
        }

        let before = installed_programs();
        compiled.install()?;
        let programs = installed_programs() - before;

        info!("Applied seccomp policy ({} filter programs)", programs);
        Ok(PolicyOutcome::Applied { programs })
    }
}

fn installed_programs() -> usize {
    match filter_state() {
        FilterState::Unrestricted => 0,
        FilterState::Restricted(n) => n,
    }
}

impl CompiledPolicy {
    fn install(self) -> Result<()> {
        if let Some(archs) = &self.archs {
            restrict_archs(archs)?;
        }

        if let Some(retain) = self.namespaces {
            restrict_namespaces(retain)?;
        }

        if let Some((families, allow_list)) = &self.address_families {
            restrict_address_families(families, *allow_list)?;
        }

        if self.restrict_realtime {
            restrict_realtime()?;
        }

        if self.memory_deny_write_execute {
            memory_deny_write_execute()?;
        }

        if self.lock_personality {
            lock_personality(opinionated_personality()?)?;
        }

        if self.protect_sysctl {
            protect_sysctl()?;
        }

        // Last: an allow-list may deny the syscalls needed to load more filters.
        if let Some(filter) = &self.syscall_filter {
            let mut names: BTreeSet<&str> = filter.names.iter().copied().collect();
            names.extend(filter.extra.iter().map(String::as_str));

            if filter.allow_list {
                loader::load_names("system call filter", filter.deny, &names, FilterAction::Allow)?;
            } else {
                loader::load_names("system call filter", FilterAction::Allow, &names, filter.deny)?;
            }
        }

        Ok(())
    }
}
