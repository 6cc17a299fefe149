//! sandbox-ctl: inspect seccomp filter sets and run programs under a policy

mod cli;
mod commands;
mod logging;
mod runner;

use clap::Parser;
use cli::{Cli, Commands};
use commands::{check_requirements, list_archs, list_filter_sets, normalize_namespaces};
use console::style;
use runner::run_program;

fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", style("error:").red().bold(), err);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    logging::init_logger(cli.verbose);

    match cli.command {
        Commands::Check => print!("{}", check_requirements()),
        Commands::Filters { sets, expand } => match list_filter_sets(&sets, expand) {
            Ok(out) => print!("{}", out),
            Err(e) => fail(e),
        },
        Commands::Archs => print!("{}", list_archs()),
        Commands::Namespaces { flags } => match normalize_namespaces(&flags) {
            Ok(out) => println!("{}", out),
            Err(e) => fail(e),
        },
        Commands::Run(args) => {
            if let Err(e) = run_program(args) {
                fail(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run_with_trailing_args() {
        let cli = Cli::try_parse_from([
            "sandbox-ctl",
            "run",
            "--syscall-filter",
            "~@mount,@swap",
            "--restrict-namespaces",
            "mnt net",
            "--lock-personality",
            "--",
            "/bin/ls",
            "-l",
            "/",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.syscall_filter, ["~@mount", "@swap"]);
        assert_eq!(args.restrict_namespaces.as_deref(), Some("mnt net"));
        assert!(args.lock_personality);
        assert_eq!(args.program, "/bin/ls");
        assert_eq!(args.args, ["-l", "/"]);
    }

    #[test]
    fn parse_filters() {
        let cli = Cli::try_parse_from(["sandbox-ctl", "filters", "@clock", "--expand", "-v"]).unwrap();
        assert!(cli.verbose);
        let Commands::Filters { sets, expand } = cli.command else {
            panic!("expected filters");
        };
        assert_eq!(sets, ["@clock"]);
        assert!(expand);
    }

    #[test]
    fn namespaces_requires_flags() {
        assert!(Cli::try_parse_from(["sandbox-ctl", "namespaces"]).is_err());
    }
}
