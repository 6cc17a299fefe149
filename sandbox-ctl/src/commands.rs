use console::style;
use log::info;
use sandbox_core::{Result, SandboxError, SystemCapabilities};
use sandbox_namespace::{flags_from_string_many, flags_to_string_many};
use sandbox_seccomp::{arch, expand_set, find, Arch, SyscallFilterSet, SYSCALL_FILTER_SETS};

pub fn check_requirements() -> String {
    info!("Checking seccomp requirements");

    let caps = SystemCapabilities::detect();
    let verdict = if caps.can_install_filters() {
        style("filters can be installed").green().to_string()
    } else if caps.has_seccomp {
        style("filters need CAP_SYS_ADMIN or --no-new-privs").yellow().to_string()
    } else {
        style("seccomp is not available").red().to_string()
    };

    format!(
        "{}\n\nNative architecture: {}\n{}\n",
        caps.summary(),
        Arch::native(),
        verdict
    )
}

/// Describe the given filter sets, or all of them.
pub fn list_filter_sets(names: &[String], expand: bool) -> Result<String> {
    let sets: Vec<&'static SyscallFilterSet> = if names.is_empty() {
        SYSCALL_FILTER_SETS.iter().collect()
    } else {
        names
            .iter()
            .map(|name| find(name).ok_or_else(|| SandboxError::unknown("filter set", name.as_str())))
            .collect::<Result<_>>()?
    };

    let mut out = String::new();
    for set in sets {
        out.push_str(&format!("{}\n", style(set.name).bold()));
        out.push_str(&format!("    # {}\n", style(set.help).dim()));

        if expand {
            for name in expand_set(set)? {
                out.push_str(&format!("    {}\n", name));
            }
        } else {
            for member in set.value {
                out.push_str(&format!("    {}\n", member));
            }
        }
        out.push('\n');
    }

    Ok(out)
}

pub fn list_archs() -> String {
    let native = Arch::native();

    arch::all()
        .map(|(arch, name)| {
            let marker = if arch == native { " (native)" } else { "" };
            format!("{:14} 0x{:08x}{}\n", name, arch.as_raw(), marker)
        })
        .collect()
}

/// Parse a namespace list and print it back in canonical order.
pub fn normalize_namespaces(flags: &[String]) -> Result<String> {
    let mask = flags_from_string_many(&flags.join(" "))?;
    Ok(flags_to_string_many(mask))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_requirements_runs() {
        let report = check_requirements();
        assert!(report.contains("Seccomp BPF"));
        assert!(report.contains("Native architecture"));
    }

    #[test]
    fn list_all_filter_sets() {
        let out = list_filter_sets(&[], false).unwrap();
        for set in SYSCALL_FILTER_SETS.iter() {
            assert!(out.contains(set.name), "{}", set.name);
        }
    }

    #[test]
    fn list_selected_filter_set_expanded() {
        let out = list_filter_sets(&["@privileged".to_string()], true).unwrap();
        assert!(out.contains("adjtimex"));
        assert!(!out.contains("    @clock"));
        assert!(!out.contains("@aio"));
    }

    #[test]
    fn list_unknown_filter_set_fails() {
        assert!(list_filter_sets(&["@quux".to_string()], false).is_err());
        assert!(list_filter_sets(&["clock".to_string()], false).is_err());
    }

    #[test]
    fn list_archs_marks_native() {
        let out = list_archs();
        assert!(out.contains("x86-64"));
        assert!(out.contains("s390x"));
        assert_eq!(out.matches("(native)").count(), 1);
    }

    #[test]
    fn namespaces_are_normalized() {
        let flags = vec!["uts pid".to_string(), "cgroup".to_string()];
        assert_eq!(normalize_namespaces(&flags).unwrap(), "cgroup pid uts");
        assert!(normalize_namespaces(&["bogus".to_string()]).is_err());
    }
}
