//! Logging setup on top of the `log` facade and `env_logger`.
//!
//! `RUST_LOG` takes precedence over the `--quiet`/`--verbose` flags. Without
//! either, the run logs at info level.
//!
//! Every line starts with a timestamp and the level. With `-v` or more the
//! emitting module is added, so scope progress from the pipeline can be told
//! apart from store and cache messages.

use std::env;
use std::io::Write;

use env_logger::Builder;
use log::{Level, LevelFilter};

/// Initialize logging from the CLI verbosity flags.
///
/// Call once, before any log statement. Later calls leave the first logger
/// in place.
pub fn init_logging(verbose: u8, quiet: bool) {
    let filter = env::var("RUST_LOG").ok();
    let level = determine_level(verbose, quiet);

    let mut builder = Builder::new();
    match &filter {
        Some(spec) => builder.parse_filters(spec),
        None => builder.filter_level(level),
    };

    let with_module = verbose >= 1;
    builder.format(move |buf, record| {
        let style = buf.default_level_style(record.level());
        let module = if with_module { record.module_path() } else { None };
        writeln!(
            buf,
            "{} {style}{:<5}{style:#} {}{}",
            buf.timestamp_seconds(),
            record.level(),
            module_tag(module),
            record.args()
        )
    });

    if builder.try_init().is_err() {
        return;
    }
    match filter {
        Some(spec) => log::debug!("Logging initialized from RUST_LOG={spec}"),
        None => log::debug!("Logging initialized at level {level}"),
    }
}

/// Map CLI flags to a level filter. `quiet` wins over `verbose`.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => Level::Info.to_level_filter(),
        1 => Level::Debug.to_level_filter(),
        _ => LevelFilter::Trace,
    }
}

fn module_tag(module: Option<&str>) -> String {
    module.map(|m| format!("[{m}] ")).unwrap_or_default()
}
