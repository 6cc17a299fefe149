//! Targeted restrictors
//!
//! Each restrictor installs one small filter with a default action of ALLOW
//! that denies a single capability, matching on syscall arguments. Rules are
//! resolved per architecture, since argument layouts and even the syscalls
//! themselves differ between ABIs. When a rule cannot be expressed on some
//! architecture, that architecture is left unfiltered and the rest still get
//! the restriction.

use std::collections::BTreeSet;

use libseccomp::{ScmpAction, ScmpArgCompare, ScmpCompareOp, ScmpFilterContext, ScmpSyscall};
use log::{debug, warn};
use nix::sched::CloneFlags;
use sandbox_core::{Result, SandboxError};
use sandbox_namespace::{flags_to_string_many, NAMESPACE_FLAGS_ALL, NAMESPACE_FLAG_MAP};

use crate::action::FilterAction;
use crate::arch::Arch;
use crate::loader::{build_error, ensure_can_install, FilterProgram};

// from linux/shm.h
const SHM_EXEC: u64 = 0o100000;

const EPERM: FilterAction = FilterAction::Errno(libc::EPERM);

/// Add one rule for `name`, resolved for `arch`.
pub(crate) fn add_arch_rule(
    ctx: &mut ScmpFilterContext,
    arch: Arch,
    name: &str,
    action: FilterAction,
    comparators: &[ScmpArgCompare],
) -> Result<()> {
    let syscall = syscall_on(arch, name)
        .ok_or_else(|| SandboxError::BuildFailure(format!("{}() does not exist on {}", name, arch)))?;

    let added = if comparators.is_empty() {
        ctx.add_rule_exact(action.to_scmp(), syscall)
    } else {
        ctx.add_rule_conditional_exact(action.to_scmp(), syscall, comparators)
    };

    added.map_err(|e| build_error(&format!("Failed to add {}() rule for {}", name, arch), e))
}

/// Syscall number of `name` on `arch`, if the architecture has it.
pub(crate) fn syscall_on(arch: Arch, name: &str) -> Option<ScmpSyscall> {
    let scmp_arch = arch.scmp()?;
    ScmpSyscall::from_name_by_arch(name, scmp_arch).ok()
}

/// Run `add_rules` for one architecture; a failure leaves that architecture
/// out of the program instead of failing the whole restriction.
pub(crate) fn rules_or_skip<F>(label: &str, arch: Arch, add_rules: F) -> Result<bool>
where
    F: FnOnce() -> Result<()>,
{
    match add_rules() {
        Ok(()) => Ok(true),
        Err(e) => {
            debug!("{}: skipping {}: {}", label, arch, e);
            Ok(false)
        }
    }
}

fn masked(arg: u32, mask: u64) -> ScmpArgCompare {
    ScmpArgCompare::new(arg, ScmpCompareOp::MaskedEqual(mask), mask)
}

fn clone_flag_bits(flags: CloneFlags) -> u64 {
    flags.bits() as u32 as u64
}

/// Deny creating or joining any namespace type not in `retain`.
///
/// `unshare()`, `clone()` and `setns()` fail with EPERM as soon as one
/// non-retained flag is present, even when allowed flags are requested
/// alongside it. `setns()` with a zero type (join whatever the fd refers to)
/// is denied unless every type is retained.
pub fn restrict_namespaces(retain: CloneFlags) -> Result<()> {
    ensure_can_install()?;

    if retain.contains(NAMESPACE_FLAGS_ALL) {
        debug!("All namespace types retained, not installing a namespace filter");
        return Ok(());
    }

    debug!(
        "Restricting namespace creation to: {}",
        flags_to_string_many(retain)
    );

    let program = FilterProgram::per_local_arch("namespace", FilterAction::Allow, |arch, ctx| {
        rules_or_skip("namespace", arch, || {
            if retain.is_empty() {
                add_arch_rule(ctx, arch, "setns", EPERM, &[])?;
            } else {
                add_arch_rule(
                    ctx,
                    arch,
                    "setns",
                    EPERM,
                    &[ScmpArgCompare::new(1, ScmpCompareOp::Equal, 0)],
                )?;
            }

            // s390 swaps the first two clone() arguments
            let clone_flags_arg = if matches!(arch, Arch::S390 | Arch::S390X) { 1 } else { 0 };

            for entry in NAMESPACE_FLAG_MAP {
                if retain.contains(entry.flag) {
                    continue;
                }

                let bit = clone_flag_bits(entry.flag);
                debug!("Blocking {} namespace on {}", entry.name, arch);

                add_arch_rule(ctx, arch, "unshare", EPERM, &[masked(0, bit)])?;
                add_arch_rule(ctx, arch, "clone", EPERM, &[masked(clone_flags_arg, bit)])?;

                if !retain.is_empty() {
                    add_arch_rule(ctx, arch, "setns", EPERM, &[masked(1, bit)])?;
                }
            }

            Ok(())
        })
    })?;

    program.install()
}

/// Restrict the address family argument of `socket()`.
///
/// With `allow_list` only the given families may be used, otherwise the given
/// families are the ones denied. Denied requests fail with EAFNOSUPPORT.
///
/// Architectures that route `socket()` through `socketcall()` (x86, s390)
/// cannot be filtered on the family and are left alone; on those, the
/// restriction is not enforced.
pub fn restrict_address_families(families: &BTreeSet<i32>, allow_list: bool) -> Result<()> {
    if let Some(&negative) = families.iter().find(|&&af| af < 0) {
        return Err(SandboxError::BuildFailure(format!(
            "Invalid address family {}",
            negative
        )));
    }

    ensure_can_install()?;

    if Arch::native().multiplexes_socket_calls() {
        warn!(
            "socket() is multiplexed on {}, address families cannot be restricted",
            Arch::native()
        );
    }

    let deny = FilterAction::Errno(libc::EAFNOSUPPORT);

    let program = FilterProgram::per_local_arch("address family", FilterAction::Allow, |arch, ctx| {
        if arch.multiplexes_socket_calls() {
            debug!("socket() is multiplexed on {}, skipping", arch);
            return Ok(false);
        }

        rules_or_skip("address family", arch, || {
            let family_is = |op: ScmpCompareOp, af: i32| [ScmpArgCompare::new(0, op, af as u64)];

            if !allow_list {
                for &af in families {
                    add_arch_rule(ctx, arch, "socket", deny, &family_is(ScmpCompareOp::Equal, af))?;
                }
                return Ok(());
            }

            let (Some(&first), Some(&last)) = (families.first(), families.last()) else {
                return add_arch_rule(ctx, arch, "socket", deny, &[]);
            };

            // Everything below the first, above the last, and each hole in
            // between.
            if first > 0 {
                add_arch_rule(ctx, arch, "socket", deny, &family_is(ScmpCompareOp::Less, first))?;
            }
            for af in (first + 1)..last {
                if !families.contains(&af) {
                    add_arch_rule(ctx, arch, "socket", deny, &family_is(ScmpCompareOp::Equal, af))?;
                }
            }
            add_arch_rule(ctx, arch, "socket", deny, &family_is(ScmpCompareOp::Greater, last))
        })
    })?;

    program.install()
}

/// Deny the realtime scheduling policies.
///
/// `sched_setscheduler()` keeps working for SCHED_OTHER, SCHED_BATCH and
/// SCHED_IDLE; every other policy value fails with EPERM.
pub fn restrict_realtime() -> Result<()> {
    const PERMITTED: [i32; 3] = [libc::SCHED_OTHER, libc::SCHED_BATCH, libc::SCHED_IDLE];

    ensure_can_install()?;

    let max_policy = PERMITTED.iter().copied().max().unwrap_or(libc::SCHED_OTHER);

    let program = FilterProgram::per_local_arch("realtime", FilterAction::Allow, |arch, ctx| {
        rules_or_skip("realtime", arch, || {
            for policy in 0..max_policy {
                if PERMITTED.contains(&policy) {
                    continue;
                }
                add_arch_rule(
                    ctx,
                    arch,
                    "sched_setscheduler",
                    EPERM,
                    &[ScmpArgCompare::new(1, ScmpCompareOp::Equal, policy as u64)],
                )?;
            }

            add_arch_rule(
                ctx,
                arch,
                "sched_setscheduler",
                EPERM,
                &[ScmpArgCompare::new(1, ScmpCompareOp::Greater, max_policy as u64)],
            )
        })
    })?;

    program.install()
}

/// Syscalls to filter for W^X on one architecture
struct WxSyscalls {
    /// mmap variant whose protection argument is checked
    filter: &'static str,
    /// mmap variant denied outright
    block: Option<&'static str>,
    shmat: bool,
}

fn wx_syscalls(arch: Arch) -> Option<WxSyscalls> {
    let (filter, block, shmat) = match arch {
        Arch::X86 => ("mmap2", Some("mmap"), false),
        // shmat() is multiplexed through ipc() here
        Arch::PPC64 | Arch::PPC64_LE => ("mmap", None, false),
        Arch::ARM => ("mmap2", None, true),
        Arch::X86_64 | Arch::X32 | Arch::AARCH64 => ("mmap", None, true),
        _ => return None,
    };

    Some(WxSyscalls {
        filter,
        block,
        shmat,
    })
}

/// Deny memory that is writable and executable at the same time.
///
/// Mappings requesting PROT_WRITE|PROT_EXEC, `mprotect()` adding PROT_EXEC and
/// `shmat()` with SHM_EXEC fail with EPERM. Only x86, x86-64, x32, arm,
/// arm64 and the ppc64 variants are covered; on ppc64 and x86 the `shmat()`
/// path stays open.
pub fn memory_deny_write_execute() -> Result<()> {
    ensure_can_install()?;

    let write_exec = (libc::PROT_WRITE | libc::PROT_EXEC) as u64;
    let exec = libc::PROT_EXEC as u64;

    let program = FilterProgram::per_local_arch("W^X", FilterAction::Allow, |arch, ctx| {
        let Some(syscalls) = wx_syscalls(arch) else {
            debug!("W^X: {} is not supported, skipping", arch);
            return Ok(false);
        };

        rules_or_skip("W^X", arch, || {
            add_arch_rule(ctx, arch, syscalls.filter, EPERM, &[masked(2, write_exec)])?;

            if let Some(block) = syscalls.block {
                add_arch_rule(ctx, arch, block, EPERM, &[])?;
            }

            add_arch_rule(ctx, arch, "mprotect", EPERM, &[masked(2, exec)])?;

            if syscall_on(arch, "pkey_mprotect").is_some() {
                add_arch_rule(ctx, arch, "pkey_mprotect", EPERM, &[masked(2, exec)])?;
            }

            if syscalls.shmat {
                add_arch_rule(ctx, arch, "shmat", EPERM, &[masked(2, SHM_EXEC)])?;
            }

            Ok(())
        })
    })?;

    if wx_syscalls(Arch::native()).is_none() {
        warn!(
            "Write+execute memory cannot be denied on {}",
            Arch::native()
        );
    }

    program.install()
}

/// Kill syscalls issued under any architecture other than native and `archs`.
///
/// An empty slice allows the native architecture only. x86-64 is always
/// allowed alongside x32, since x32 processes enter the kernel through the
/// x86-64 table.
pub fn restrict_archs(archs: &[Arch]) -> Result<()> {
    ensure_can_install()?;

    let mut ctx = ScmpFilterContext::new_filter(ScmpAction::Allow)
        .map_err(|e| build_error("Failed to allocate filter", e))?;

    let native = Arch::native();
    let mut permitted: BTreeSet<Arch> = archs
        .iter()
        .map(|arch| arch.resolve())
        .filter(|&arch| arch != native)
        .collect();

    if native == Arch::X32 || permitted.contains(&Arch::X32) {
        permitted.insert(Arch::X86_64);
    }
    permitted.remove(&native);

    for arch in &permitted {
        let scmp = arch
            .scmp()
            .ok_or_else(|| SandboxError::unknown("architecture", arch.to_string()))?;
        ctx.add_arch(scmp)
            .map_err(|e| build_error(&format!("Failed to add architecture {}", arch), e))?;
    }

    ctx.set_ctl_nnp(false)
        .map_err(|e| build_error("Failed to disable implicit no_new_privs", e))?;

    debug!(
        "Permitting architectures: {}{}",
        native,
        permitted
            .iter()
            .map(|arch| format!(" {}", arch))
            .collect::<String>()
    );

    let mut program = FilterProgram::new("architecture");
    program.push(native, ctx);
    program.install()
}

/// Make the legacy `_sysctl()` syscall fail with EPERM.
///
/// Architectures that never had it are skipped.
pub fn protect_sysctl() -> Result<()> {
    ensure_can_install()?;

    let program = FilterProgram::per_local_arch("sysctl", FilterAction::Allow, |arch, ctx| {
        if syscall_on(arch, "_sysctl").is_none() {
            debug!("_sysctl() does not exist on {}, skipping", arch);
            return Ok(false);
        }

        rules_or_skip("sysctl", arch, || add_arch_rule(ctx, arch, "_sysctl", EPERM, &[]))
    })?;

    program.install()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wx_coverage() {
        let x86 = wx_syscalls(Arch::X86).unwrap();
        assert_eq!(x86.filter, "mmap2");
        assert_eq!(x86.block, Some("mmap"));
        assert!(!x86.shmat);

        let x86_64 = wx_syscalls(Arch::X86_64).unwrap();
        assert_eq!(x86_64.filter, "mmap");
        assert!(x86_64.shmat);

        assert!(wx_syscalls(Arch::PPC64_LE).is_some());
        assert!(wx_syscalls(Arch::MIPS).is_none());
        assert!(wx_syscalls(Arch::S390X).is_none());
    }

    #[test]
    fn test_native_has_namespace_syscalls() {
        for name in ["unshare", "clone", "setns", "sched_setscheduler", "personality"] {
            assert!(syscall_on(Arch::native(), name).is_some(), "{}", name);
        }
    }

    #[test]
    fn test_missing_syscall_is_a_build_failure() {
        let mut ctx = ScmpFilterContext::new_filter(ScmpAction::Allow).unwrap();
        let err = add_arch_rule(&mut ctx, Arch::native(), "no_such_syscall", EPERM, &[])
            .unwrap_err();
        assert!(matches!(err, SandboxError::BuildFailure(_)));
    }

    #[test]
    fn test_rules_or_skip() {
        assert!(rules_or_skip("test", Arch::X86, || Ok(())).unwrap());
        let skipped = rules_or_skip("test", Arch::X86, || {
            Err(SandboxError::BuildFailure("nope".to_string()))
        });
        assert!(!skipped.unwrap());
    }

    #[test]
    fn test_negative_family_is_rejected_before_install() {
        let families = BTreeSet::from([libc::AF_INET, -1]);
        let err = restrict_address_families(&families, true).unwrap_err();
        assert!(matches!(err, SandboxError::BuildFailure(_)));
    }
}
