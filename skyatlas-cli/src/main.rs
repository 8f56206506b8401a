//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use skyatlas_cli::CliError;

fn main() {
    match skyatlas_cli::run() {
        Ok(()) => {}
        // Clap renders help, version and usage errors itself.
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("skyatlas: {err}");
            std::process::exit(1);
        }
    }
}
