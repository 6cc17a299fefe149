//! sandbox-namespace: namespace flag names
//!
//! Converts between `CLONE_NEW*` bits and the names used in policy
//! configuration. The namespace restrictor in sandbox-seccomp consumes the
//! resulting masks.

pub mod flags;

pub use flags::{
    flag_from_string, flag_to_string, flags_from_string_many, flags_to_string_many,
    NAMESPACE_FLAGS_ALL, NAMESPACE_FLAG_MAP,
};
pub use nix::sched::CloneFlags;
