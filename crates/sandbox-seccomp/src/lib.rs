//! sandbox-seccomp: syscall policy compiler and seccomp filter loader
//!
//! Turns named syscall groups, override tables and targeted restrictions
//! (namespaces, address families, realtime scheduling, W^X memory,
//! architectures, personality, `_sysctl`) into libseccomp filters, compiled
//! for every architecture the kernel accepts syscalls from.
//!
//! Installing a filter needs CAP_SYS_ADMIN or `PR_SET_NO_NEW_PRIVS`, and is
//! permanent for the calling thread and everything it spawns. Filters only
//! stack; see [`filter_state`].

pub mod action;
pub mod arch;
pub mod filter_set;
pub mod loader;
pub mod personality;
pub mod policy;
pub mod restrict;

pub use action::{FilterAction, OverrideAction};
pub use arch::Arch;
pub use filter_set::{find, FilterSetId, SyscallFilterSet, SYSCALL_FILTER_SETS};
pub use loader::{
    expand_set, filter_state, load_named, load_names, load_raw, set_no_new_privs, FilterState,
    SyscallOverrides,
};
pub use personality::{lock_personality, opinionated_personality, safe_personality};
pub use policy::{address_family_from_name, address_family_to_name, PolicyOutcome, SeccompPolicy};
pub use restrict::{
    memory_deny_write_execute, protect_sysctl, restrict_address_families, restrict_archs,
    restrict_namespaces, restrict_realtime,
};
