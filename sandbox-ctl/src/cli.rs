use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sandbox-ctl")]
#[command(version, about = "Inspect syscall filter sets and run programs under a seccomp policy", long_about = None)]
#[command(after_help = "EXAMPLES:
    # What can this machine do?
    sandbox-ctl check

    # Show filter sets, with nested sets expanded
    sandbox-ctl filters @privileged --expand

    # Deny mounting and namespaces other than the network one
    sandbox-ctl run --syscall-filter '~@mount' --restrict-namespaces net -- /bin/sh

    # Apply a policy file, printing it instead of running
    sandbox-ctl run --policy policy.json --dry-run -- /bin/true
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check whether filters can be installed here
    Check,

    /// List syscall filter sets
    Filters {
        /// Sets to show (all when omitted)
        #[arg(value_name = "SET")]
        sets: Vec<String>,

        /// Resolve nested @sets into syscall names
        #[arg(short, long)]
        expand: bool,
    },

    /// List known architectures
    Archs,

    /// Normalize a namespace type list
    Namespaces {
        /// Namespace names (cgroup ipc net mnt pid user uts)
        #[arg(value_name = "FLAGS", required = true)]
        flags: Vec<String>,
    },

    /// Apply a policy and execute a program under it
    Run(RunArgs),
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// JSON policy file; flags below are applied on top
    #[arg(short, long, value_name = "FILE")]
    pub policy: Option<PathBuf>,

    /// Filter sets or syscalls to allow; start the first with ~ to deny instead
    #[arg(short = 'f', long, value_name = "LIST", value_delimiter = ',', allow_hyphen_values = true)]
    pub syscall_filter: Vec<String>,

    /// Fail filtered syscalls with this errno instead of killing the process
    #[arg(short = 'e', long, value_name = "ERRNO")]
    pub syscall_errno: Option<i32>,

    /// Namespace types that may still be created, space separated
    #[arg(short = 'n', long, value_name = "FLAGS")]
    pub restrict_namespaces: Option<String>,

    /// AF_* families socket() may use; start the first with ~ to deny instead
    #[arg(short = 'a', long, value_name = "LIST", value_delimiter = ',', allow_hyphen_values = true)]
    pub restrict_address_families: Option<Vec<String>>,

    /// Architectures allowed besides native
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub architectures: Vec<String>,

    /// Deny realtime scheduling policies
    #[arg(long)]
    pub restrict_realtime: bool,

    /// Deny writable and executable memory
    #[arg(long)]
    pub memory_deny_write_execute: bool,

    /// Lock the execution domain
    #[arg(long)]
    pub lock_personality: bool,

    /// Deny the legacy _sysctl() syscall
    #[arg(long)]
    pub protect_kernel_tunables: bool,

    /// Set no_new_privs first, so no CAP_SYS_ADMIN is needed
    #[arg(long)]
    pub no_new_privs: bool,

    /// Print the resulting policy as JSON and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Program to execute
    #[arg(value_name = "PROGRAM", required = true)]
    pub program: String,

    /// Program arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
