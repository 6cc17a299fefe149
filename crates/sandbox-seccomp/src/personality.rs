//! Execution domain (personality) helpers and locking

use libseccomp::{ScmpArgCompare, ScmpCompareOp};
use log::debug;
use nix::errno::Errno;
use sandbox_core::{Result, SandboxError};

use crate::action::FilterAction;
use crate::loader::{ensure_can_install, FilterProgram};
use crate::restrict::{add_arch_rule, rules_or_skip};

// from linux/personality.h
pub const PER_LINUX: u64 = 0x0000;
pub const PER_LINUX_32BIT: u64 = ADDR_LIMIT_32BIT;
pub const PER_SVR4: u64 = 0x0001 | STICKY_TIMEOUTS | MMAP_PAGE_ZERO;
pub const PER_BSD: u64 = 0x0006;
pub const PER_LINUX32: u64 = 0x0008;
pub const PER_LINUX32_3GB: u64 = 0x0008 | ADDR_LIMIT_3GB;
pub const PER_UW7: u64 = 0x000e | STICKY_TIMEOUTS | MMAP_PAGE_ZERO;
pub const PER_MASK: u64 = 0x00ff;

pub const ADDR_NO_RANDOMIZE: u64 = 0x0040000;
pub const MMAP_PAGE_ZERO: u64 = 0x0100000;
pub const ADDR_COMPAT_LAYOUT: u64 = 0x0200000;
pub const READ_IMPLIES_EXEC: u64 = 0x0400000;
pub const ADDR_LIMIT_32BIT: u64 = 0x0800000;
pub const STICKY_TIMEOUTS: u64 = 0x4000000;
pub const ADDR_LIMIT_3GB: u64 = 0x8000000;

/// Passing this to `personality()` only queries the current value.
pub const PERSONALITY_INVALID: u64 = 0xffff_ffff;

/// Call `personality(2)`, returning the previous value.
///
/// The raw call signals failure with a negative return and `errno`; the
/// return value alone is ambiguous, so errno is cleared first and checked.
pub fn safe_personality(persona: u64) -> std::result::Result<u64, Errno> {
    Errno::clear();
    let ret = unsafe { libc::personality(persona as libc::c_ulong) };

    if ret < 0 {
        let errno = Errno::last();
        if errno != Errno::UnknownErrno {
            return Err(errno);
        }
    }

    Ok(ret as u32 as u64)
}

/// The current execution domain, reduced to [`PER_LINUX`] or [`PER_LINUX32`].
///
/// This is the value to hand to [`lock_personality`]: it drops flags such as
/// [`ADDR_NO_RANDOMIZE`] that a parent may have set for this process.
pub fn opinionated_personality() -> Result<u64> {
    let current = safe_personality(PERSONALITY_INVALID)
        .map_err(|errno| SandboxError::Io(std::io::Error::from_raw_os_error(errno as i32)))?;

    if current & 0xffff == PER_LINUX32 {
        Ok(PER_LINUX32)
    } else {
        Ok(PER_LINUX)
    }
}

/// Allow `personality()` only with exactly `personality` as its argument.
///
/// Every other value fails with EPERM, including [`PERSONALITY_INVALID`], so
/// even querying the execution domain is refused once it is locked.
pub fn lock_personality(personality: u64) -> Result<()> {
    ensure_can_install()?;

    debug!("Locking personality to 0x{:x}", personality);

    let program = FilterProgram::per_local_arch("personality", FilterAction::Allow, |arch, ctx| {
        rules_or_skip("personality", arch, || {
            add_arch_rule(
                ctx,
                arch,
                "personality",
                FilterAction::Errno(libc::EPERM),
                &[ScmpArgCompare::new(0, ScmpCompareOp::NotEqual, personality)],
            )
        })
    })?;

    program.install()
}
