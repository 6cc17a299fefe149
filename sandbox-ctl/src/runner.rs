use std::ffi::CString;

use console::style;
use log::{debug, info, warn};
use nix::unistd::execvp;
use sandbox_seccomp::{set_no_new_privs, PolicyOutcome, SeccompPolicy};

use crate::cli::RunArgs;

/// Build the policy for `run`: the policy file if given, then the flags.
pub fn build_policy(args: &RunArgs) -> Result<SeccompPolicy, Box<dyn std::error::Error>> {
    let mut policy = match &args.policy {
        Some(path) => {
            debug!("Loading policy from {}", path.display());
            SeccompPolicy::from_file(path)?
        }
        None => SeccompPolicy::default(),
    };

    if !args.syscall_filter.is_empty() {
        debug!("Overriding syscall filter: {:?}", args.syscall_filter);
        policy.system_call_filter = args.syscall_filter.clone();
    }

    if let Some(errno) = args.syscall_errno {
        policy.system_call_error_number = Some(errno);
    }

    if let Some(flags) = &args.restrict_namespaces {
        policy.restrict_namespaces = Some(flags.clone());
    }

    if let Some(families) = &args.restrict_address_families {
        policy.restrict_address_families = Some(families.clone());
    }

    if !args.architectures.is_empty() {
        policy.system_call_architectures = args.architectures.clone();
    }

    policy.restrict_realtime |= args.restrict_realtime;
    policy.memory_deny_write_execute |= args.memory_deny_write_execute;
    policy.lock_personality |= args.lock_personality;
    policy.protect_kernel_tunables |= args.protect_kernel_tunables;

    policy.validate()?;
    Ok(policy)
}

/// Apply the policy and replace this process with the program. Only returns
/// on failure.
///
/// Nothing but `execve()` runs between installing the filters and the exec:
/// an allow-list may deny whatever else the process would still call.
pub fn run_program(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let policy = build_policy(&args)?;

    if args.dry_run {
        println!("{}", policy.to_json_pretty()?);
        return Ok(());
    }

    let argv = std::iter::once(&args.program)
        .chain(&args.args)
        .map(|arg| CString::new(arg.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("Invalid argument for {}: {}", args.program, e))?;

    if args.no_new_privs {
        debug!("Setting no_new_privs");
        set_no_new_privs()?;
    }

    info!("Executing: {} {:?}", args.program, args.args);

    if let PolicyOutcome::Skipped(reason) = policy.apply()? {
        warn!("Policy not applied: {}", reason);
        eprintln!(
            "{} running {} without seccomp restrictions: {}",
            style("warning:").yellow().bold(),
            args.program,
            reason
        );
    }

    let errno = match execvp(&argv[0], &argv) {
        Ok(never) => match never {},
        Err(errno) => errno,
    };
    Err(format!("Failed to execute {}: {}", args.program, errno).into())
}
