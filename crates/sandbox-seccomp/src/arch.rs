//! Architecture registry
//!
//! Architectures are identified by their audit token (`AUDIT_ARCH_*`), the
//! value the kernel reports in `seccomp_data.arch`. Token 0 stands for the
//! architecture this binary was built for.

use std::fmt;
use std::str::FromStr;

use libseccomp::ScmpArch;
use sandbox_core::{Result, SandboxError};

// Audit architecture tokens -- from linux/audit.h
const AUDIT_ARCH_I386: u32 = 0x4000_0003;
const AUDIT_ARCH_X86_64: u32 = 0xc000_003e;
const AUDIT_ARCH_X32: u32 = 0x4000_003e;
const AUDIT_ARCH_ARM: u32 = 0x4000_0028;
const AUDIT_ARCH_AARCH64: u32 = 0xc000_00b7;
const AUDIT_ARCH_MIPS: u32 = 0x0000_0008;
const AUDIT_ARCH_MIPS64: u32 = 0x8000_0008;
const AUDIT_ARCH_MIPS64N32: u32 = 0xa000_0008;
const AUDIT_ARCH_MIPSEL: u32 = 0x4000_0008;
const AUDIT_ARCH_MIPSEL64: u32 = 0xc000_0008;
const AUDIT_ARCH_MIPSEL64N32: u32 = 0xe000_0008;
const AUDIT_ARCH_PPC: u32 = 0x0000_0014;
const AUDIT_ARCH_PPC64: u32 = 0x8000_0015;
const AUDIT_ARCH_PPC64LE: u32 = 0xc000_0015;
const AUDIT_ARCH_S390: u32 = 0x0000_0016;
const AUDIT_ARCH_S390X: u32 = 0x8000_0016;

/// An architecture token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Arch(u32);

impl Arch {
    pub const NATIVE: Arch = Arch(0);
    pub const X86: Arch = Arch(AUDIT_ARCH_I386);
    pub const X86_64: Arch = Arch(AUDIT_ARCH_X86_64);
    pub const X32: Arch = Arch(AUDIT_ARCH_X32);
    pub const ARM: Arch = Arch(AUDIT_ARCH_ARM);
    pub const AARCH64: Arch = Arch(AUDIT_ARCH_AARCH64);
    pub const MIPS: Arch = Arch(AUDIT_ARCH_MIPS);
    pub const MIPS64: Arch = Arch(AUDIT_ARCH_MIPS64);
    pub const MIPS64_N32: Arch = Arch(AUDIT_ARCH_MIPS64N32);
    pub const MIPSEL: Arch = Arch(AUDIT_ARCH_MIPSEL);
    pub const MIPSEL64: Arch = Arch(AUDIT_ARCH_MIPSEL64);
    pub const MIPSEL64_N32: Arch = Arch(AUDIT_ARCH_MIPSEL64N32);
    pub const PPC: Arch = Arch(AUDIT_ARCH_PPC);
    pub const PPC64: Arch = Arch(AUDIT_ARCH_PPC64);
    pub const PPC64_LE: Arch = Arch(AUDIT_ARCH_PPC64LE);
    pub const S390: Arch = Arch(AUDIT_ARCH_S390);
    pub const S390X: Arch = Arch(AUDIT_ARCH_S390X);

    pub const fn from_raw(token: u32) -> Self {
        Arch(token)
    }

    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// Canonical name, or `None` for tokens that are not registered.
    pub fn to_name(self) -> Option<&'static str> {
        ARCH_TABLE
            .iter()
            .find(|entry| entry.arch == self)
            .map(|entry| entry.name)
    }

    /// Look up a canonical name. `"native"` yields [`Arch::NATIVE`].
    pub fn from_name(name: &str) -> Option<Self> {
        ARCH_TABLE
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.arch)
    }

    /// The concrete architecture this binary runs as.
    pub const fn native() -> Self {
        NATIVE_ARCH
    }

    /// Resolve [`Arch::NATIVE`] to the concrete architecture, leave others alone.
    pub const fn resolve(self) -> Self {
        if self.0 == Arch::NATIVE.0 {
            Arch::native()
        } else {
            self
        }
    }

    pub(crate) fn scmp(self) -> Option<ScmpArch> {
        if self == Arch::NATIVE {
            return Some(ScmpArch::Native);
        }
        ARCH_TABLE
            .iter()
            .find(|entry| entry.arch == self)
            .map(|entry| entry.scmp)
    }

    /// Architectures a filter has to cover on this build, native last.
    ///
    /// A 64-bit kernel also accepts syscalls through its 32-bit compat entry
    /// points; a filter that only covered the native ABI could be sidestepped
    /// through them.
    pub fn local() -> &'static [Arch] {
        LOCAL_ARCHS
    }

    /// Whether `socket()` reaches the kernel through the `socketcall()`
    /// multiplexer on this architecture, hiding its arguments from filters.
    pub fn multiplexes_socket_calls(self) -> bool {
        matches!(self.resolve(), Arch::X86 | Arch::S390 | Arch::S390X)
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:08x}", self.0),
        }
    }
}

impl FromStr for Arch {
    type Err = SandboxError;

    fn from_str(s: &str) -> Result<Self> {
        Arch::from_name(s).ok_or_else(|| SandboxError::unknown("architecture", s))
    }
}

#[cfg(all(target_arch = "x86_64", target_pointer_width = "64"))]
const NATIVE_ARCH: Arch = Arch::X86_64;
#[cfg(all(target_arch = "x86_64", target_pointer_width = "64"))]
static LOCAL_ARCHS: &[Arch] = &[Arch::X86, Arch::X32, Arch::X86_64];

#[cfg(all(target_arch = "x86_64", target_pointer_width = "32"))]
const NATIVE_ARCH: Arch = Arch::X32;
#[cfg(all(target_arch = "x86_64", target_pointer_width = "32"))]
static LOCAL_ARCHS: &[Arch] = &[Arch::X86, Arch::X86_64, Arch::X32];

#[cfg(target_arch = "x86")]
const NATIVE_ARCH: Arch = Arch::X86;
#[cfg(target_arch = "x86")]
static LOCAL_ARCHS: &[Arch] = &[Arch::X86];

#[cfg(target_arch = "aarch64")]
const NATIVE_ARCH: Arch = Arch::AARCH64;
#[cfg(target_arch = "aarch64")]
static LOCAL_ARCHS: &[Arch] = &[Arch::ARM, Arch::AARCH64];

#[cfg(target_arch = "arm")]
const NATIVE_ARCH: Arch = Arch::ARM;
#[cfg(target_arch = "arm")]
static LOCAL_ARCHS: &[Arch] = &[Arch::ARM];

#[cfg(all(target_arch = "mips", target_endian = "big"))]
const NATIVE_ARCH: Arch = Arch::MIPS;
#[cfg(all(target_arch = "mips", target_endian = "big"))]
static LOCAL_ARCHS: &[Arch] = &[Arch::MIPS];

#[cfg(all(target_arch = "mips", target_endian = "little"))]
const NATIVE_ARCH: Arch = Arch::MIPSEL;
#[cfg(all(target_arch = "mips", target_endian = "little"))]
static LOCAL_ARCHS: &[Arch] = &[Arch::MIPSEL];

#[cfg(all(target_arch = "mips64", target_endian = "big"))]
const NATIVE_ARCH: Arch = Arch::MIPS64;
#[cfg(all(target_arch = "mips64", target_endian = "big"))]
static LOCAL_ARCHS: &[Arch] = &[Arch::MIPS, Arch::MIPS64_N32, Arch::MIPS64];

#[cfg(all(target_arch = "mips64", target_endian = "little"))]
const NATIVE_ARCH: Arch = Arch::MIPSEL64;
#[cfg(all(target_arch = "mips64", target_endian = "little"))]
static LOCAL_ARCHS: &[Arch] = &[Arch::MIPSEL, Arch::MIPSEL64_N32, Arch::MIPSEL64];

#[cfg(target_arch = "powerpc")]
const NATIVE_ARCH: Arch = Arch::PPC;
#[cfg(target_arch = "powerpc")]
static LOCAL_ARCHS: &[Arch] = &[Arch::PPC];

#[cfg(all(target_arch = "powerpc64", target_endian = "big"))]
const NATIVE_ARCH: Arch = Arch::PPC64;
#[cfg(all(target_arch = "powerpc64", target_endian = "big"))]
static LOCAL_ARCHS: &[Arch] = &[Arch::PPC, Arch::PPC64];

#[cfg(all(target_arch = "powerpc64", target_endian = "little"))]
const NATIVE_ARCH: Arch = Arch::PPC64_LE;
#[cfg(all(target_arch = "powerpc64", target_endian = "little"))]
static LOCAL_ARCHS: &[Arch] = &[Arch::PPC64_LE];

#[cfg(target_arch = "s390x")]
const NATIVE_ARCH: Arch = Arch::S390X;
#[cfg(target_arch = "s390x")]
static LOCAL_ARCHS: &[Arch] = &[Arch::S390, Arch::S390X];

#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "x86",
    target_arch = "aarch64",
    target_arch = "arm",
    target_arch = "mips",
    target_arch = "mips64",
    target_arch = "powerpc",
    target_arch = "powerpc64",
    target_arch = "s390x",
)))]
const NATIVE_ARCH: Arch = Arch::NATIVE;
#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "x86",
    target_arch = "aarch64",
    target_arch = "arm",
    target_arch = "mips",
    target_arch = "mips64",
    target_arch = "powerpc",
    target_arch = "powerpc64",
    target_arch = "s390x",
)))]
static LOCAL_ARCHS: &[Arch] = &[Arch::NATIVE];

struct ArchEntry {
    arch: Arch,
    name: &'static str,
    scmp: ScmpArch,
}

static ARCH_TABLE: &[ArchEntry] = &[
    ArchEntry { arch: Arch::NATIVE, name: "native", scmp: ScmpArch::Native },
    ArchEntry { arch: Arch::X86, name: "x86", scmp: ScmpArch::X86 },
    ArchEntry { arch: Arch::X86_64, name: "x86-64", scmp: ScmpArch::X8664 },
    ArchEntry { arch: Arch::X32, name: "x32", scmp: ScmpArch::X32 },
    ArchEntry { arch: Arch::ARM, name: "arm", scmp: ScmpArch::Arm },
    ArchEntry { arch: Arch::AARCH64, name: "arm64", scmp: ScmpArch::Aarch64 },
    ArchEntry { arch: Arch::MIPS, name: "mips", scmp: ScmpArch::Mips },
    ArchEntry { arch: Arch::MIPS64, name: "mips64", scmp: ScmpArch::Mips64 },
    ArchEntry { arch: Arch::MIPS64_N32, name: "mips64-n32", scmp: ScmpArch::Mips64N32 },
    ArchEntry { arch: Arch::MIPSEL, name: "mips-le", scmp: ScmpArch::Mipsel },
    ArchEntry { arch: Arch::MIPSEL64, name: "mips64-le", scmp: ScmpArch::Mipsel64 },
    ArchEntry { arch: Arch::MIPSEL64_N32, name: "mips64-le-n32", scmp: ScmpArch::Mipsel64N32 },
    ArchEntry { arch: Arch::PPC, name: "ppc", scmp: ScmpArch::Ppc },
    ArchEntry { arch: Arch::PPC64, name: "ppc64", scmp: ScmpArch::Ppc64 },
    ArchEntry { arch: Arch::PPC64_LE, name: "ppc64-le", scmp: ScmpArch::Ppc64Le },
    ArchEntry { arch: Arch::S390, name: "s390", scmp: ScmpArch::S390 },
    ArchEntry { arch: Arch::S390X, name: "s390x", scmp: ScmpArch::S390X },
];

/// All registered architectures, `native` first.
pub fn all() -> impl Iterator<Item = (Arch, &'static str)> {
    ARCH_TABLE.iter().map(|entry| (entry.arch, entry.name))
}
