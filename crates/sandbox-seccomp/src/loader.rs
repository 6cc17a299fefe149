//! Filter compilation and loading
//!
//! Every filter is compiled once per local architecture (see [`Arch::local`])
//! into its own libseccomp context. A context only matches syscalls issued
//! under its architecture and lets everything else through, so stacking one
//! program per architecture covers compat entry points without the programs
//! interfering with each other.
//!
//! Installed filters cannot be removed. If loading fails half way, earlier
//! architectures may already be restricted; callers should treat
//! [`SandboxError::Seccomp`] as fatal and not retry.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

use libseccomp::{ScmpAction, ScmpArch, ScmpFilterContext, ScmpSyscall};
use log::{debug, info};
use sandbox_core::{is_seccomp_available, Result, SandboxError, SystemCapabilities};

use crate::action::{FilterAction, OverrideAction};
use crate::arch::Arch;
use crate::filter_set::{self, SyscallFilterSet};

/// Override table for [`load_raw`], keyed by native syscall number
pub type SyscallOverrides = BTreeMap<i32, OverrideAction>;

/// How far this thread has been restricted by filters loaded through this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    Unrestricted,
    /// Number of filter programs installed; only ever grows
    Restricted(usize),
}

impl FilterState {
    pub fn is_restricted(self) -> bool {
        matches!(self, FilterState::Restricted(_))
    }
}

thread_local! {
    static INSTALLED: Cell<usize> = const { Cell::new(0) };
}

/// Current filter state of the calling thread. Forked children inherit it.
pub fn filter_state() -> FilterState {
    match INSTALLED.with(Cell::get) {
        0 => FilterState::Unrestricted,
        n => FilterState::Restricted(n),
    }
}

fn record_install() {
    INSTALLED.with(|count| count.set(count.get() + 1));
}

/// Set `PR_SET_NO_NEW_PRIVS`, which lets unprivileged processes install filters.
pub fn set_no_new_privs() -> Result<()> {
    unsafe {
        if libc::prctl(libc::PR_SET_NO_NEW_PRIVS, 1, 0, 0, 0) != 0 {
            return Err(SandboxError::Seccomp(format!(
                "Failed to set PR_SET_NO_NEW_PRIVS: {}",
                std::io::Error::last_os_error()
            )));
        }
    }
    Ok(())
}

/// Fail early unless the kernel has filter mode and the caller may use it.
pub(crate) fn ensure_can_install() -> Result<()> {
    if !is_seccomp_available() {
        return Err(SandboxError::FacilityUnavailable(
            "kernel does not support seccomp filter mode".to_string(),
        ));
    }

    let caps = SystemCapabilities::detect();
    if !caps.has_sys_admin && !caps.has_no_new_privs {
        return Err(SandboxError::PermissionDenied(
            "installing a filter needs CAP_SYS_ADMIN or no_new_privs".to_string(),
        ));
    }

    Ok(())
}

pub(crate) fn build_error(what: &str, err: impl std::fmt::Display) -> SandboxError {
    SandboxError::BuildFailure(format!("{}: {}", what, err))
}

/// A libseccomp context that matches syscalls of `arch` only.
///
/// Syscalls of other architectures pass through, and the context never sets
/// no_new_privs on its own.
pub(crate) fn context_for_arch(arch: Arch, default_action: FilterAction) -> Result<ScmpFilterContext> {
    let mut ctx = ScmpFilterContext::new_filter(default_action.to_scmp())
        .map_err(|e| build_error("Failed to allocate filter", e))?;

    let arch = arch.resolve();
    if arch != Arch::native() {
        let scmp = arch
            .scmp()
            .ok_or_else(|| SandboxError::unknown("architecture", arch.to_string()))?;

        ctx.add_arch(scmp)
            .map_err(|e| build_error(&format!("Failed to add architecture {}", arch), e))?;
        ctx.remove_arch(ScmpArch::Native)
            .map_err(|e| build_error("Failed to remove native architecture", e))?;
    }

    ctx.set_act_badarch(ScmpAction::Allow)
        .map_err(|e| build_error("Failed to set bad architecture action", e))?;
    ctx.set_ctl_nnp(false)
        .map_err(|e| build_error("Failed to disable implicit no_new_privs", e))?;

    Ok(ctx)
}

/// Compiled per-architecture contexts, loaded in order
pub(crate) struct FilterProgram {
    label: &'static str,
    contexts: Vec<(Arch, ScmpFilterContext)>,
}

impl FilterProgram {
    pub(crate) fn new(label: &'static str) -> Self {
        Self {
            label,
            contexts: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, arch: Arch, ctx: ScmpFilterContext) {
        self.contexts.push((arch, ctx));
    }

    /// Compile one context per local architecture. `add_rules` returning
    /// `false` leaves that architecture unfiltered.
    pub(crate) fn per_local_arch<F>(
        label: &'static str,
        default_action: FilterAction,
        mut add_rules: F,
    ) -> Result<Self>
    where
        F: FnMut(Arch, &mut ScmpFilterContext) -> Result<bool>,
    {
        let mut program = Self::new(label);

        for &arch in Arch::local() {
            let mut ctx = context_for_arch(arch, default_action)?;
            if add_rules(arch.resolve(), &mut ctx)? {
                program.push(arch.resolve(), ctx);
            } else {
                debug!("{}: nothing to filter on {}, skipping", label, arch);
            }
        }

        Ok(program)
    }

    /// Load every context. The last one pushed is loaded last, which for
    /// per-arch programs is the native architecture.
    pub(crate) fn install(self) -> Result<()> {
        for (arch, ctx) in &self.contexts {
            ctx.load().map_err(|e| {
                SandboxError::Seccomp(format!(
                    "Failed to install {} filter for {}: {}",
                    self.label, arch, e
                ))
            })?;
            record_install();
            debug!("Installed {} filter for {}", self.label, arch);
        }

        if !self.contexts.is_empty() {
            info!(
                "Installed {} filter on {} architecture(s)",
                self.label,
                self.contexts.len()
            );
        }
        Ok(())
    }
}

/// Expand a filter set into the syscall names it covers, following nested
/// `@group` references.
pub fn expand_set(set: &'static SyscallFilterSet) -> Result<BTreeSet<&'static str>> {
    expand_set_with(set, &filter_set::find)
}

pub(crate) fn expand_set_with<F>(
    set: &'static SyscallFilterSet,
    lookup: &F,
) -> Result<BTreeSet<&'static str>>
where
    F: Fn(&str) -> Option<&'static SyscallFilterSet>,
{
    let mut names = BTreeSet::new();
    let mut path = Vec::new();
    expand_into(set, lookup, &mut path, &mut names)?;
    Ok(names)
}

fn expand_into<F>(
    set: &'static SyscallFilterSet,
    lookup: &F,
    path: &mut Vec<&'static str>,
    names: &mut BTreeSet<&'static str>,
) -> Result<()>
where
    F: Fn(&str) -> Option<&'static SyscallFilterSet>,
{
    if path.contains(&set.name) {
        path.push(set.name);
        return Err(SandboxError::BuildFailure(format!(
            "Filter set {} includes itself: {}",
            set.name,
            path.join(" -> ")
        )));
    }

    path.push(set.name);
    for group in set.groups() {
        let nested = lookup(group).ok_or_else(|| {
            SandboxError::BuildFailure(format!(
                "Filter set {} references unknown set {}",
                set.name, group
            ))
        })?;
        expand_into(nested, lookup, path, names)?;
    }
    names.extend(set.syscalls());
    path.pop();

    Ok(())
}

/// Install a filter that applies `override_action` to every syscall of `set`
/// and `default_action` to everything else.
///
/// Syscall names are resolved separately for each architecture; names an
/// architecture does not have are skipped.
pub fn load_named(
    default_action: FilterAction,
    set: &'static SyscallFilterSet,
    override_action: FilterAction,
) -> Result<()> {
    let names = expand_set(set)?;
    load_names(set.name, default_action, &names, override_action)
}

/// Like [`load_named`], for an arbitrary list of syscall names.
pub fn load_names(
    label: &str,
    default_action: FilterAction,
    names: &BTreeSet<&str>,
    override_action: FilterAction,
) -> Result<()> {
    ensure_can_install()?;

    let program = FilterProgram::per_local_arch("syscall", default_action, |arch, ctx| {
        if override_action == default_action {
            return Ok(false);
        }

        let scmp_arch = arch
            .scmp()
            .ok_or_else(|| SandboxError::unknown("architecture", arch.to_string()))?;

        for name in names {
            let syscall = match ScmpSyscall::from_name_by_arch(name, scmp_arch) {
                Ok(syscall) => syscall,
                Err(_) => {
                    debug!("{}: system call {} does not exist on {}, skipping", label, name, arch);
                    continue;
                }
            };

            if let Err(e) = ctx.add_rule_exact(override_action.to_scmp(), syscall) {
                debug!("{}: failed to add rule for {} on {}, skipping: {}", label, name, arch, e);
            }
        }

        Ok(true)
    })?;

    program.install()
}

/// Install a filter from a table of native syscall numbers.
///
/// [`OverrideAction::Default`] entries get `override_action`, explicit errno
/// entries fail with that errno. libseccomp translates the numbers for the
/// compat architectures; syscalls missing there are skipped.
pub fn load_raw(
    default_action: FilterAction,
    overrides: &SyscallOverrides,
    override_action: FilterAction,
) -> Result<()> {
    ensure_can_install()?;

    let program = FilterProgram::per_local_arch("syscall", default_action, |arch, ctx| {
        for (&nr, &entry) in overrides {
            let action = entry.resolve(override_action);
            if action == default_action {
                continue;
            }

            if let Err(e) = ctx.add_rule(action.to_scmp(), ScmpSyscall::from(nr)) {
                debug!("Failed to add rule for system call {} on {}, skipping: {}", nr, arch, e);
            }
        }

        Ok(true)
    })?;

    program.install()
}

#[cfg(test)]
mod tests {
    use super::*;

    static LOOP_A: SyscallFilterSet = SyscallFilterSet {
        name: "@loop-a",
        help: "Refers to @loop-b",
        value: &["@loop-b", "read"],
    };

    static LOOP_B: SyscallFilterSet = SyscallFilterSet {
        name: "@loop-b",
        help: "Refers back to @loop-a",
        value: &["@loop-a", "write"],
    };

    static DANGLING: SyscallFilterSet = SyscallFilterSet {
        name: "@dangling",
        help: "Refers to a set that does not exist",
        value: &["@missing", "read"],
    };

    static DIAMOND: SyscallFilterSet = SyscallFilterSet {
        name: "@diamond",
        help: "Reaches @clock both directly and through @privileged",
        value: &["@clock", "@privileged", "read"],
    };

    fn cyclic_lookup(name: &str) -> Option<&'static SyscallFilterSet> {
        match name {
            "@loop-a" => Some(&LOOP_A),
            "@loop-b" => Some(&LOOP_B),
            _ => None,
        }
    }

    #[test]
    fn test_expand_flat_set() {
        let names = expand_set(filter_set::find("@clock").unwrap()).unwrap();
        assert!(names.contains("settimeofday"));
        assert!(names.contains("clock_adjtime"));
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn test_expand_nested_set() {
        let names = expand_set(filter_set::find("@privileged").unwrap()).unwrap();
        // from @clock
        assert!(names.contains("adjtimex"));
        // from @raw-io
        assert!(names.contains("iopl"));
        assert!(names.contains("bpf"));
        assert!(names.iter().all(|name| !name.starts_with('@')));
    }

    #[test]
    fn test_expand_shared_reference_is_not_a_cycle() {
        let names = expand_set_with(&DIAMOND, &filter_set::find).unwrap();
        assert!(names.contains("adjtimex"));
        assert!(names.contains("read"));
    }

    #[test]
    fn test_expand_detects_cycles() {
        let err = expand_set_with(&LOOP_A, &cyclic_lookup).unwrap_err();
        assert!(matches!(err, SandboxError::BuildFailure(_)));
        assert!(err.to_string().contains("@loop-a -> @loop-b -> @loop-a"));
    }

    #[test]
    fn test_expand_unknown_reference() {
        let err = expand_set_with(&DANGLING, &cyclic_lookup).unwrap_err();
        assert!(err.to_string().contains("@missing"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_every_registered_set_expands() {
        for set in &filter_set::SYSCALL_FILTER_SETS {
            let names = expand_set(set).unwrap();
            assert!(!names.is_empty(), "{}", set.name);
        }
    }

    #[test]
    fn test_fresh_thread_is_unrestricted() {
        let state = std::thread::spawn(filter_state).join().unwrap();
        assert_eq!(state, FilterState::Unrestricted);
        assert!(!state.is_restricted());
        assert!(FilterState::Restricted(2).is_restricted());
    }

    #[test]
    fn test_context_for_every_local_arch() {
        for &arch in Arch::local() {
            assert!(context_for_arch(arch, FilterAction::Allow).is_ok(), "{}", arch);
        }
    }
}
