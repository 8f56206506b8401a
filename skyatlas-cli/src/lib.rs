//! Command-line interface for loading and querying SkyAtlas data.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use skyatlas_core::SqliteStore;
use std::io::Write;

mod error;
mod load;
mod query;

pub use error::CliError;

use load::{LoadAirportsArgs, LoadRoutesArgs};
use query::QueryArgs;

const ARG_DATABASE: &str = "database";
const ARG_LOG_LEVEL: &str = "log-level";
const ENV_DATABASE: &str = "SKYATLAS_DATABASE";
const ENV_LOG_LEVEL: &str = "SKYATLAS_LOG_LEVEL";
const DEFAULT_DATABASE: &str = "skyatlas.db";

/// Run the SkyAtlas CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    init_logging(cli.global.log_level)?;
    let mut stdout = std::io::stdout().lock();
    run_with(cli, &mut stdout)
}

fn init_logging(level: LevelFilter) -> Result<(), CliError> {
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;
    Ok(())
}

fn run_with(cli: Cli, out: &mut dyn Write) -> Result<(), CliError> {
    let database = cli.global.database;
    match cli.command {
        Command::LoadAirports(args) => load::run_load_airports(args, &database, out),
        Command::LoadRoutes(args) => load::run_load_routes(args, &database, out),
        Command::LoadSample => load::run_load_sample(&database, out),
        Command::Query(args) => query::run_query(args, &database, out),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "skyatlas",
    about = "Load OpenFlights airport and route data and query it",
    version
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Args)]
struct GlobalArgs {
    /// SQLite database file; its directory is created when missing.
    #[arg(
        long = ARG_DATABASE,
        env = ENV_DATABASE,
        value_name = "path",
        default_value = DEFAULT_DATABASE,
        global = true
    )]
    database: Utf8PathBuf,
    /// Log verbosity: off, error, warn, info, debug or trace.
    #[arg(
        long = ARG_LOG_LEVEL,
        env = ENV_LOG_LEVEL,
        value_name = "level",
        default_value = "info",
        global = true
    )]
    log_level: LevelFilter,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load airports from an OpenFlights airports.dat export.
    LoadAirports(LoadAirportsArgs),
    /// Load routes from an OpenFlights routes.dat export.
    LoadRoutes(LoadRoutesArgs),
    /// Seed four sample airports and the routes between them.
    LoadSample,
    /// Serve one query and print its JSON body.
    Query(QueryArgs),
}

/// Open the read-write store, creating the database directory first.
fn open_store(path: &Utf8Path) -> Result<SqliteStore, CliError> {
    skyatlas_fs::ensure_parent_dir(path).map_err(|source| CliError::PrepareDatabase {
        path: path.to_path_buf(),
        source,
    })?;
    SqliteStore::open(path).map_err(|source| CliError::OpenStore {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests;
