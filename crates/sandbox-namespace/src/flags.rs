//! Namespace flag names
//!
//! Maps single `CLONE_NEW*` bits to the short names used in configuration
//! (`"mnt"`, `"net"`, ...) and parses/formats space-separated flag lists.

use nix::sched::CloneFlags;
use sandbox_core::{Result, SandboxError};

/// Every namespace type the kernel lets a process create or join.
pub const NAMESPACE_FLAGS_ALL: CloneFlags = CloneFlags::CLONE_NEWCGROUP
    .union(CloneFlags::CLONE_NEWIPC)
    .union(CloneFlags::CLONE_NEWNET)
    .union(CloneFlags::CLONE_NEWNS)
    .union(CloneFlags::CLONE_NEWPID)
    .union(CloneFlags::CLONE_NEWUSER)
    .union(CloneFlags::CLONE_NEWUTS);

/// A single namespace flag and its configuration name
#[derive(Debug, Clone, Copy)]
pub struct NamespaceFlag {
    pub flag: CloneFlags,
    pub name: &'static str,
}

/// Canonical output order for [`flags_to_string_many`].
pub static NAMESPACE_FLAG_MAP: &[NamespaceFlag] = &[
    NamespaceFlag { flag: CloneFlags::CLONE_NEWCGROUP, name: "cgroup" },
    NamespaceFlag { flag: CloneFlags::CLONE_NEWIPC, name: "ipc" },
    NamespaceFlag { flag: CloneFlags::CLONE_NEWNET, name: "net" },
    // "mnt" instead of "ns", to match /proc/self/ns/ entries
    NamespaceFlag { flag: CloneFlags::CLONE_NEWNS, name: "mnt" },
    NamespaceFlag { flag: CloneFlags::CLONE_NEWPID, name: "pid" },
    NamespaceFlag { flag: CloneFlags::CLONE_NEWUSER, name: "user" },
    NamespaceFlag { flag: CloneFlags::CLONE_NEWUTS, name: "uts" },
];

/// Name of a single namespace flag.
///
/// Returns `None` for an empty mask, for masks with more than one bit set and
/// for bits that are not namespace flags.
pub fn flag_to_string(flag: CloneFlags) -> Option<&'static str> {
    NAMESPACE_FLAG_MAP
        .iter()
        .find(|entry| entry.flag == flag)
        .map(|entry| entry.name)
}

/// Parse one namespace name. The empty string parses to the empty mask.
pub fn flag_from_string(name: &str) -> Result<CloneFlags> {
    if name.is_empty() {
        return Ok(CloneFlags::empty());
    }

    NAMESPACE_FLAG_MAP
        .iter()
        .find(|entry| entry.name == name)
        .map(|entry| entry.flag)
        .ok_or_else(|| SandboxError::unknown("namespace flag", name))
}

/// Parse a whitespace-separated list of namespace names.
///
/// Order and duplicates do not matter; one unknown name fails the whole list.
pub fn flags_from_string_many(text: &str) -> Result<CloneFlags> {
    text.split_whitespace()
        .try_fold(CloneFlags::empty(), |acc, word| {
            Ok(acc | flag_from_string(word)?)
        })
}

/// Render all namespace bits of `flags` in canonical order.
pub fn flags_to_string_many(flags: CloneFlags) -> String {
    NAMESPACE_FLAG_MAP
        .iter()
        .filter(|entry| flags.contains(entry.flag))
        .map(|entry| entry.name)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_to_string_single_bits() {
        assert_eq!(flag_to_string(CloneFlags::empty()), None);
        assert_eq!(flag_to_string(CloneFlags::CLONE_NEWNS), Some("mnt"));
        assert_eq!(flag_to_string(CloneFlags::CLONE_NEWCGROUP), Some("cgroup"));
        assert_eq!(
            flag_to_string(CloneFlags::CLONE_NEWNS | CloneFlags::CLONE_NEWIPC),
            None
        );
        assert_eq!(flag_to_string(CloneFlags::CLONE_VM), None);
    }

    #[test]
    fn test_flag_from_string() {
        assert_eq!(flag_from_string("mnt").unwrap(), CloneFlags::CLONE_NEWNS);
        assert_eq!(flag_from_string("").unwrap(), CloneFlags::empty());
        assert_eq!(flag_from_string("uts").unwrap(), CloneFlags::CLONE_NEWUTS);
        assert!(flag_from_string("ns").is_err());
        assert!(flag_from_string("MNT").is_err());
    }

    #[test]
    fn test_single_flag_round_trip() {
        let uts = flag_to_string(CloneFlags::CLONE_NEWUTS).unwrap();
        assert_eq!(flag_from_string(uts).unwrap(), CloneFlags::CLONE_NEWUTS);

        let ipc = flag_from_string("ipc").unwrap();
        assert_eq!(flag_to_string(ipc), Some("ipc"));
    }

    #[test]
    fn test_flags_from_string_many() {
        assert_eq!(flags_from_string_many("").unwrap(), CloneFlags::empty());
        assert_eq!(
            flags_from_string_many("mnt uts ipc").unwrap(),
            CloneFlags::CLONE_NEWNS | CloneFlags::CLONE_NEWUTS | CloneFlags::CLONE_NEWIPC
        );
        assert_eq!(
            flags_from_string_many("  net\tnet  ").unwrap(),
            CloneFlags::CLONE_NEWNET
        );
    }

    #[test]
    fn test_unknown_name_fails_whole_list() {
        let err = flags_from_string_many("mnt bogus uts").unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_all_flags_render_in_canonical_order() {
        let s = flags_to_string_many(NAMESPACE_FLAGS_ALL);
        assert_eq!(s, "cgroup ipc net mnt pid user uts");
        assert_eq!(flags_from_string_many(&s).unwrap(), NAMESPACE_FLAGS_ALL);
    }

    #[test]
    fn test_many_round_trip_every_subset() {
        let n = NAMESPACE_FLAG_MAP.len();
        for bits in 0u32..(1 << n) {
            let mask = NAMESPACE_FLAG_MAP
                .iter()
                .enumerate()
                .filter(|(i, _)| bits & (1 << i) != 0)
                .fold(CloneFlags::empty(), |acc, (_, entry)| acc | entry.flag);

            let rendered = flags_to_string_many(mask);
            assert_eq!(flags_from_string_many(&rendered).unwrap(), mask, "{rendered}");
        }
    }

    #[test]
    fn test_input_order_does_not_matter() {
        assert_eq!(
            flags_to_string_many(flags_from_string_many("uts pid cgroup").unwrap()),
            "cgroup pid uts"
        );
    }
}
