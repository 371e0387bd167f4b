//! updatecache - Statement cache rebuild tool
//!
//! Entry point for the updatecache CLI application.

use clap::error::ErrorKind;
use clap::Parser;
use updatecache::{
    cli::Cli,
    error::{self, ExitCode},
    logging::init_logging,
};

fn main() {
    // Usage errors exit with 1, not clap's default of 2.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::Success,
                _ => ExitCode::GeneralError,
            };
            std::process::exit(code.as_i32());
        }
    };
    let json_errors = cli.json_errors;

    init_logging(cli.verbose, cli.quiet);

    match updatecache::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            let exit_code = ExitCode::GeneralError;
            error::report(&err, exit_code, json_errors);
            std::process::exit(exit_code.as_i32());
        }
    }
}
