//! Syscall filter set registry
//!
//! A filter set is a named group of syscalls that policies refer to with an
//! `@name`. Members are bare syscall names or references to other sets;
//! nested references are expanded by the loader, not here.

/// A named group of syscalls
#[derive(Debug)]
pub struct SyscallFilterSet {
    /// Set name, including the leading `@`
    pub name: &'static str,
    /// One-line description
    pub help: &'static str,
    /// Group references first, then syscall names, each part sorted
    pub value: &'static [&'static str],
}

impl SyscallFilterSet {
    /// Members that refer to other sets.
    pub fn groups(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.value.iter().copied().filter(|member| member.starts_with('@'))
    }

    /// Members that name syscalls directly.
    pub fn syscalls(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.value.iter().copied().filter(|member| !member.starts_with('@'))
    }
}

/// Index of each set in [`SYSCALL_FILTER_SETS`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(usize)]
pub enum FilterSetId {
    #[default]
    Default,
    Aio,
    BasicIo,
    Chown,
    Clock,
    CpuEmulation,
    Debug,
    FileSystem,
    IoEvent,
    Ipc,
    Keyring,
    Memlock,
    Module,
    Mount,
    NetworkIo,
    Obsolete,
    Privileged,
    Process,
    RawIo,
    Reboot,
    Resources,
    Setuid,
    Signal,
    Swap,
    Sync,
    Timer,
}

/// All filter sets, `@default` first, the rest sorted by name.
pub static SYSCALL_FILTER_SETS: [SyscallFilterSet; FilterSetId::COUNT] = [
    SyscallFilterSet {
        name: "@default",
        help: "System calls that are always permitted",
        value: &[
            "clock_getres", "clock_gettime", "clock_nanosleep", "execve", "exit", "exit_group",
            "getrlimit", "gettimeofday", "nanosleep", "pause", "rt_sigreturn", "sigreturn", "time",
        ],
    },
    SyscallFilterSet {
        name: "@aio",
        help: "Asynchronous IO",
        value: &["io_cancel", "io_destroy", "io_getevents", "io_setup", "io_submit"],
    },
    SyscallFilterSet {
        name: "@basic-io",
        help: "Basic IO",
        value: &[
            "_llseek", "close", "dup", "dup2", "dup3", "lseek", "pread64", "preadv", "preadv2",
            "pwrite64", "pwritev", "pwritev2", "read", "readv", "write", "writev",
        ],
    },
    SyscallFilterSet {
        name: "@chown",
        help: "Change ownership of files and directories",
        value: &["chown", "chown32", "fchown", "fchown32", "fchownat", "lchown", "lchown32"],
    },
    SyscallFilterSet {
        name: "@clock",
        help: "Change the system time",
        value: &["adjtimex", "clock_adjtime", "clock_settime", "settimeofday", "stime"],
    },
    SyscallFilterSet {
        name: "@cpu-emulation",
        help: "System calls for CPU emulation functionality",
        value: &["modify_ldt", "subpage_prot", "switch_endian", "vm86", "vm86old"],
    },
    SyscallFilterSet {
        name: "@debug",
        help: "Debugging, performance monitoring and tracing functionality",
        value: &[
            "lookup_dcookie", "perf_event_open", "process_vm_readv", "process_vm_writev", "ptrace",
            "rtas", "s390_runtime_instr", "sys_debug_setcontext",
        ],
    },
    SyscallFilterSet {
        name: "@file-system",
        help: "File system operations",
        value: &[
            "access", "chdir", "chmod", "close", "creat", "faccessat", "fallocate", "fchdir",
            "fchmod", "fchmodat", "fcntl", "fcntl64", "fgetxattr", "flistxattr", "fremovexattr",
            "fsetxattr", "fstat", "fstat64", "fstatat64", "fstatfs", "fstatfs64", "ftruncate",
            "ftruncate64", "futimesat", "getcwd", "getdents", "getdents64", "getxattr",
            "inotify_add_watch", "inotify_init", "inotify_init1", "inotify_rm_watch", "lgetxattr",
            "link", "linkat", "listxattr", "llistxattr", "lremovexattr", "lsetxattr", "lstat",
            "lstat64", "mkdir", "mkdirat", "mknod", "mknodat", "mmap", "mmap2", "munmap",
            "newfstatat", "open", "openat", "readlink", "readlinkat", "removexattr", "rename",
            "renameat", "renameat2", "rmdir", "setxattr", "stat", "stat64", "statfs", "statfs64",
            "statx", "symlink", "symlinkat", "truncate", "truncate64", "unlink", "unlinkat",
            "utime", "utimensat", "utimes",
        ],
    },
    SyscallFilterSet {
        name: "@io-event",
        help: "Event loop system calls",
        value: &[
            "_newselect", "epoll_create", "epoll_create1", "epoll_ctl", "epoll_ctl_old",
            "epoll_pwait", "epoll_wait", "epoll_wait_old", "eventfd", "eventfd2", "poll", "ppoll",
            "pselect6", "select",
        ],
    },
    SyscallFilterSet {
        name: "@ipc",
        help: "SysV IPC, POSIX message queues and other IPC",
        value: &[
            "ipc", "memfd_create", "mq_getsetattr", "mq_notify", "mq_open", "mq_timedreceive",
            "mq_timedsend", "mq_unlink", "msgctl", "msgget", "msgrcv", "msgsnd", "pipe", "pipe2",
            "process_vm_readv", "process_vm_writev", "semctl", "semget", "semop", "semtimedop",
            "shmat", "shmctl", "shmdt", "shmget",
        ],
    },
    SyscallFilterSet {
        name: "@keyring",
        help: "Kernel keyring access",
        value: &["add_key", "keyctl", "request_key"],
    },
    SyscallFilterSet {
        name: "@memlock",
        help: "Memory locking control",
        value: &["mlock", "mlock2", "mlockall", "munlock", "munlockall"],
    },
    SyscallFilterSet {
        name: "@module",
        help: "Loading and unloading of kernel modules",
        value: &["delete_module", "finit_module", "init_module"],
    },
    SyscallFilterSet {
        name: "@mount",
        help: "Mounting and unmounting of file systems",
        value: &["chroot", "mount", "pivot_root", "umount", "umount2"],
    },
    SyscallFilterSet {
        name: "@network-io",
        help: "Network or Unix socket IO, should not be needed if not network facing",
        value: &[
            "accept", "accept4", "bind", "connect", "getpeername", "getsockname", "getsockopt",
            "listen", "recv", "recvfrom", "recvmmsg", "recvmsg", "send", "sendmmsg", "sendmsg",
            "sendto", "setsockopt", "shutdown", "socket", "socketcall", "socketpair",
        ],
    },
    SyscallFilterSet {
        name: "@obsolete",
        help: "Unusual, obsolete or unimplemented system calls",
        value: &[
            "_sysctl", "afs_syscall", "bdflush", "break", "create_module", "ftime",
            "get_kernel_syms", "getpmsg", "gtty", "lock", "madvise1", "mpx", "prof", "profil",
            "putpmsg", "query_module", "security", "sgetmask", "ssetmask", "stty", "sysfs",
            "tuxcall", "ulimit", "uselib", "ustat", "vserver",
        ],
    },
    SyscallFilterSet {
        name: "@privileged",
        help: "All system calls which need super-user capabilities",
        value: &[
            "@chown", "@clock", "@module", "@raw-io", "@reboot", "@swap", "_sysctl", "acct", "bpf",
            "capset", "chroot", "fanotify_init", "mount", "nfsservctl", "open_by_handle_at",
            "pivot_root", "quotactl", "setdomainname", "setfsuid", "setfsuid32", "setgroups",
            "setgroups32", "sethostname", "setresuid", "setresuid32", "setreuid", "setreuid32",
            "setuid", "setuid32", "umount2", "vhangup",
        ],
    },
    SyscallFilterSet {
        name: "@process",
        help: "Process control, execution and namespacing operations",
        value: &[
            "arch_prctl", "capget", "clone", "execveat", "fork", "getrusage", "kill", "prctl",
            "rt_sigqueueinfo", "rt_tgsigqueueinfo", "setns", "tgkill", "times", "tkill", "unshare",
            "vfork", "wait4", "waitid", "waitpid",
        ],
    },
    SyscallFilterSet {
        name: "@raw-io",
        help: "Raw I/O port access",
        value: &[
            "ioperm", "iopl", "pciconfig_iobase", "pciconfig_read", "pciconfig_write",
            "s390_pci_mmio_read", "s390_pci_mmio_write",
        ],
    },
    SyscallFilterSet {
        name: "@reboot",
        help: "Reboot and reboot preparation/kexec",
        value: &["kexec_file_load", "kexec_load", "reboot"],
    },
    SyscallFilterSet {
        name: "@resources",
        help: "Alter resource settings",
        value: &[
            "ioprio_set", "mbind", "migrate_pages", "move_pages", "sched_setaffinity",
            "sched_setattr", "sched_setparam", "sched_setscheduler", "set_mempolicy", "setpriority",
            "setrlimit",
        ],
    },
    SyscallFilterSet {
        name: "@setuid",
        help: "Operations for changing user/group credentials",
        value: &[
            "setgid", "setgid32", "setgroups", "setgroups32", "setregid", "setregid32", "setresgid",
            "setresgid32", "setresuid", "setresuid32", "setreuid", "setreuid32", "setuid",
            "setuid32",
        ],
    },
    SyscallFilterSet {
        name: "@signal",
        help: "Process signal handling",
        value: &[
            "rt_sigaction", "rt_sigpending", "rt_sigprocmask", "rt_sigsuspend", "rt_sigtimedwait",
            "sigaction", "sigaltstack", "signal", "signalfd", "signalfd4", "sigpending",
            "sigprocmask", "sigsuspend",
        ],
    },
    SyscallFilterSet {
        name: "@swap",
        help: "Enable/disable swap devices",
        value: &["swapoff", "swapon"],
    },
    SyscallFilterSet {
        name: "@sync",
        help: "Synchronize files and memory to storage",
        value: &["fdatasync", "fsync", "msync", "sync", "sync_file_range", "syncfs"],
    },
    SyscallFilterSet {
        name: "@timer",
        help: "Schedule operations by time",
        value: &[
            "alarm", "getitimer", "setitimer", "timer_create", "timer_delete", "timer_getoverrun",
            "timer_gettime", "timer_settime", "timerfd_create", "timerfd_gettime",
            "timerfd_settime", "times",
        ],
    },
];

impl FilterSetId {
    pub const COUNT: usize = FilterSetId::Timer as usize + 1;

    pub fn set(self) -> &'static SyscallFilterSet {
        &SYSCALL_FILTER_SETS[self as usize]
    }
}

/// Look up a set by its full name, `@` included.
///
/// Names without the `@` sigil never match.
pub fn find(name: &str) -> Option<&'static SyscallFilterSet> {
    if !name.starts_with('@') {
        return None;
    }

    SYSCALL_FILTER_SETS.iter().find(|set| set.name == name)
}
