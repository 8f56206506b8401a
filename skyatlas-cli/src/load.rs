//! Load commands for the SkyAtlas CLI.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use skyatlas_core::SqliteStore;
use skyatlas_data::{
    AirportSnapshot, IngestError, IngestReport, ingest_routes, load_airports, open_source,
    seed_sample_data,
};
use std::io::Write;

use crate::{CliError, open_store};

pub(crate) const ARG_PATH: &str = "path";
pub(crate) const ENV_AIRPORTS_PATH: &str = "SKYATLAS_CMDS_LOAD_AIRPORTS_PATH";
pub(crate) const ENV_ROUTES_PATH: &str = "SKYATLAS_CMDS_LOAD_ROUTES_PATH";

/// CLI arguments for the `load-airports` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "load-airports",
    long_about = "Load airports from an OpenFlights airports.dat export. \
                 Rows without a three letter IATA code or a valid position \
                 are skipped, as are heliports, seaplane bases and airports \
                 in Antarctica. Existing codes are updated in place.",
    about = "Load airports from airports.dat"
)]
#[ortho_config(prefix = "SKYATLAS")]
pub(crate) struct LoadAirportsArgs {
    /// Path to the airports.dat file.
    #[arg(value_name = ARG_PATH)]
    #[serde(default)]
    pub(crate) path: Option<Utf8PathBuf>,
}

/// CLI arguments for the `load-routes` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "load-routes",
    long_about = "Load routes from an OpenFlights routes.dat export. \
                 Endpoints are resolved against the airports stored when \
                 the load starts; rows naming other airports are skipped \
                 and duplicate routes are left untouched.",
    about = "Load routes from routes.dat"
)]
#[ortho_config(prefix = "SKYATLAS")]
pub(crate) struct LoadRoutesArgs {
    /// Path to the routes.dat file.
    #[arg(value_name = ARG_PATH)]
    #[serde(default)]
    pub(crate) path: Option<Utf8PathBuf>,
}

/// Resolved source file for a load command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadConfig {
    pub(crate) path: Utf8PathBuf,
}

impl LoadAirportsArgs {
    pub(crate) fn into_config(self) -> Result<LoadConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        LoadConfig::try_from(merged)
    }
}

impl LoadRoutesArgs {
    pub(crate) fn into_config(self) -> Result<LoadConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        LoadConfig::try_from(merged)
    }
}

impl TryFrom<LoadAirportsArgs> for LoadConfig {
    type Error = CliError;

    fn try_from(args: LoadAirportsArgs) -> Result<Self, Self::Error> {
        let path = args.path.ok_or(CliError::MissingArgument {
            field: ARG_PATH,
            env: ENV_AIRPORTS_PATH,
        })?;
        Ok(Self { path })
    }
}

impl TryFrom<LoadRoutesArgs> for LoadConfig {
    type Error = CliError;

    fn try_from(args: LoadRoutesArgs) -> Result<Self, Self::Error> {
        let path = args.path.ok_or(CliError::MissingArgument {
            field: ARG_PATH,
            env: ENV_ROUTES_PATH,
        })?;
        Ok(Self { path })
    }
}

pub(crate) fn run_load_airports(
    args: LoadAirportsArgs,
    database: &Utf8Path,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let store = open_store(database)?;
    load_airports_into(&config, &store, out)
}

pub(crate) fn load_airports_into(
    config: &LoadConfig,
    store: &SqliteStore,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let outcome = load_airports(&config.path, store);
    let report = settle(outcome, &config.path, out, write_airport_report)?;
    write_airport_report(out, &report)
}

pub(crate) fn run_load_routes(
    args: LoadRoutesArgs,
    database: &Utf8Path,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let store = open_store(database)?;
    load_routes_into(&config, &store, out)
}

pub(crate) fn load_routes_into(
    config: &LoadConfig,
    store: &SqliteStore,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let source = open_source(&config.path).map_err(|source| CliError::Ingest {
        path: config.path.clone(),
        source,
    })?;
    let snapshot = AirportSnapshot::capture(store).map_err(CliError::CacheAirports)?;
    writeln!(out, "Cached {} airports in memory", snapshot.len()).map_err(CliError::WriteOutput)?;
    let outcome = ingest_routes(source, &snapshot, store);
    let report = settle(outcome, &config.path, out, write_route_report)?;
    write_route_report(out, &report)
}

pub(crate) fn run_load_sample(database: &Utf8Path, out: &mut dyn Write) -> Result<(), CliError> {
    let store = open_store(database)?;
    let report = seed_sample_data(&store)?;
    writeln!(
        out,
        "Airports: {} created, {} already present.",
        report.airports_created, report.airports_existing
    )
    .map_err(CliError::WriteOutput)?;
    writeln!(
        out,
        "Routes: {} created, {} already present.",
        report.routes_created, report.routes_existing
    )
    .map_err(CliError::WriteOutput)?;
    Ok(())
}

type ReportWriter = fn(&mut dyn Write, &IngestReport) -> Result<(), CliError>;

/// Unwrap an ingestion outcome, printing the committed counts before
/// surfacing a failure that happened mid-run.
fn settle(
    outcome: Result<IngestReport, IngestError>,
    path: &Utf8Path,
    out: &mut dyn Write,
    write_report: ReportWriter,
) -> Result<IngestReport, CliError> {
    match outcome {
        Ok(report) => Ok(report),
        Err(source) => {
            if let Some(report) = source.partial_report() {
                write_report(out, report)?;
            }
            Err(CliError::Ingest {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

fn write_airport_report(out: &mut dyn Write, report: &IngestReport) -> Result<(), CliError> {
    writeln!(out, "Imported or updated {} airports.", report.imported)
        .and_then(|()| writeln!(out, "Skipped {} rows.", report.skipped))
        .and_then(|()| write_breakdown(out, report))
        .and_then(|()| writeln!(out, "Total in DB: {}", report.total))
        .map_err(CliError::WriteOutput)
}

fn write_route_report(out: &mut dyn Write, report: &IngestReport) -> Result<(), CliError> {
    writeln!(out, "Imported {} routes", report.imported)
        .and_then(|()| writeln!(out, "Skipped {} rows", report.skipped))
        .and_then(|()| write_breakdown(out, report))
        .and_then(|()| {
            if report.conflicts > 0 {
                writeln!(out, "Already stored: {} routes", report.conflicts)
            } else {
                Ok(())
            }
        })
        .and_then(|()| writeln!(out, "Total routes in DB: {}", report.total))
        .map_err(CliError::WriteOutput)
}

fn write_breakdown(out: &mut dyn Write, report: &IngestReport) -> std::io::Result<()> {
    for (kind, count) in &report.skipped_by_reason {
        writeln!(out, "  {kind}: {count}")?;
    }
    Ok(())
}
