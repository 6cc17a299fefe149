//! Filter verdicts

use libseccomp::ScmpAction;

/// Verdict attached to a syscall by a filter program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAction {
    /// Let the syscall through
    Allow,
    /// Fail the syscall with the given errno
    Errno(i32),
    /// Kill the calling thread with SIGSYS
    Kill,
    /// Deliver SIGSYS to the calling thread
    Trap,
    /// Notify an attached tracer, passing the given value
    Trace(u16),
}

impl FilterAction {
    pub(crate) fn to_scmp(self) -> ScmpAction {
        match self {
            FilterAction::Allow => ScmpAction::Allow,
            FilterAction::Errno(errno) => ScmpAction::Errno(errno),
            FilterAction::Kill => ScmpAction::KillThread,
            FilterAction::Trap => ScmpAction::Trap,
            FilterAction::Trace(value) => ScmpAction::Trace(value),
        }
    }

    /// The action used for syscalls outside an allow-list: KILL, or ERRNO when
    /// an error number was configured.
    pub fn deny(errno: Option<i32>) -> Self {
        match errno {
            Some(errno) => FilterAction::Errno(errno),
            None => FilterAction::Kill,
        }
    }
}

/// Per-syscall entry of an override table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverrideAction {
    /// Use the override action passed to the loader
    #[default]
    Default,
    /// Fail with this errno regardless of the loader's override action
    Errno(i32),
}

impl OverrideAction {
    pub(crate) fn resolve(self, default: FilterAction) -> FilterAction {
        match self {
            OverrideAction::Default => default,
            OverrideAction::Errno(errno) => FilterAction::Errno(errno),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_resolution() {
        assert_eq!(
            OverrideAction::Default.resolve(FilterAction::Allow),
            FilterAction::Allow
        );
        assert_eq!(
            OverrideAction::Errno(libc::EILSEQ).resolve(FilterAction::Allow),
            FilterAction::Errno(libc::EILSEQ)
        );
        assert_eq!(OverrideAction::default(), OverrideAction::Default);
    }

    #[test]
    fn test_deny_action() {
        assert_eq!(FilterAction::deny(None), FilterAction::Kill);
        assert_eq!(
            FilterAction::deny(Some(libc::EPERM)),
            FilterAction::Errno(libc::EPERM)
        );
    }

    #[test]
    fn test_scmp_mapping() {
        assert_eq!(FilterAction::Allow.to_scmp(), ScmpAction::Allow);
        assert_eq!(FilterAction::Kill.to_scmp(), ScmpAction::KillThread);
        assert_eq!(FilterAction::Errno(5).to_scmp(), ScmpAction::Errno(5));
        assert_eq!(FilterAction::Trace(7).to_scmp(), ScmpAction::Trace(7));
    }
}
