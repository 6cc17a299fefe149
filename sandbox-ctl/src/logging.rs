use console::style;
use env_logger::{Builder, Env};
use log::Level;
use std::io::Write;

/// Initialize logging. `RUST_LOG` wins over `--verbose`.
pub fn init_logger(verbose: bool) {
    let env = Env::default().default_filter_or(if verbose { "debug" } else { "warn" });

    Builder::from_env(env)
        .format(|buf, record| {
            let level = match record.level() {
                Level::Error => style("ERROR").red().bold(),
                Level::Warn => style("WARN ").yellow().bold(),
                Level::Info => style("INFO ").green(),
                Level::Debug => style("DEBUG").cyan(),
                Level::Trace => style("TRACE").dim(),
            };

            if record.level() >= Level::Debug {
                writeln!(buf, "{} {} {}", level, style(record.target()).dim(), record.args())
            } else {
                writeln!(buf, "{} {}", level, record.args())
            }
        })
        .init();
}
