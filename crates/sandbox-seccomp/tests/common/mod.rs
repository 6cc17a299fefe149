//! Shared helpers for the enforcement tests
//!
//! Filters cannot be removed, so every test installs them in a forked child
//! and the parent only looks at the exit status.

#![allow(dead_code)]

use std::sync::{Mutex, MutexGuard, OnceLock};

use sandbox_core::{is_seccomp_available, SystemCapabilities};

/// Fail the child with a message naming the check that did not hold.
macro_rules! check {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("{}:{}: {}", file!(), line!(), stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err(format!("{}:{}: {}", file!(), line!(), format!($($arg)+)));
        }
    };
}

/// Forking while another test thread holds a lock can deadlock the child.
pub fn serial_guard() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

/// Whether filter tests can run here, printing the reason when not.
pub fn require_privileged() -> bool {
    if !is_seccomp_available() {
        eprintln!("SKIP: seccomp filter mode not available");
        return false;
    }
    if unsafe { libc::geteuid() } != 0 {
        eprintln!("SKIP: not running as root");
        return false;
    }
    true
}

/// Like [`require_privileged`], also skipping inside containers.
pub fn require_privileged_host() -> bool {
    if !require_privileged() {
        return false;
    }
    if SystemCapabilities::detect().in_container {
        eprintln!("SKIP: running in a container");
        return false;
    }
    true
}

/// errno of the last failed libc call
pub fn errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Run `body` in a forked child and assert that it succeeded.
pub fn run_in_child<F>(name: &str, body: F)
where
    F: FnOnce() -> Result<(), String>,
{
    let _guard = serial_guard();

    unsafe {
        let pid = libc::fork();
        assert!(pid >= 0, "fork failed: {}", std::io::Error::last_os_error());

        if pid == 0 {
            let code = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(body)) {
                Ok(Ok(())) => 0,
                Ok(Err(msg)) => {
                    eprintln!("{}: {}", name, msg);
                    1
                }
                Err(_) => 2,
            };
            libc::_exit(code);
        }

        let mut status: i32 = 0;
        let ret = libc::waitpid(pid, &mut status, 0);
        assert_eq!(ret, pid);

        assert!(
            libc::WIFEXITED(status),
            "{}: child did not exit normally, status=0x{:x}",
            name,
            status
        );
        assert_eq!(
            libc::WEXITSTATUS(status),
            0,
            "{}: child reported a failed check",
            name
        );
    }
}

/// Run `body` in a forked child and return its raw wait status, for tests
/// that expect the child to be killed.
pub fn child_status<F>(name: &str, body: F) -> libc::c_int
where
    F: FnOnce() -> Result<(), String>,
{
    let _guard = serial_guard();

    unsafe {
        let pid = libc::fork();
        assert!(pid >= 0, "fork failed: {}", std::io::Error::last_os_error());

        if pid == 0 {
            if let Err(msg) = body() {
                eprintln!("{}: {}", name, msg);
                libc::_exit(1);
            }
            libc::_exit(0);
        }

        let mut status: i32 = 0;
        assert_eq!(libc::waitpid(pid, &mut status, 0), pid);
        status
    }
}

/// Raw clone(2) without a new stack; the new process continues like fork().
pub fn raw_clone(flags: libc::c_int) -> libc::pid_t {
    let flags = (flags | libc::SIGCHLD) as libc::c_long;
    let null: libc::c_long = 0;

    #[cfg(target_arch = "s390x")]
    let ret = unsafe { libc::syscall(libc::SYS_clone, null, flags) };
    #[cfg(not(target_arch = "s390x"))]
    let ret = unsafe { libc::syscall(libc::SYS_clone, flags, null, null, null, null) };

    ret as libc::pid_t
}

/// Wait for a child created by [`raw_clone`].
pub fn reap(pid: libc::pid_t) -> bool {
    let mut status = 0;
    unsafe { libc::waitpid(pid, &mut status, 0) == pid && libc::WIFEXITED(status) }
}
