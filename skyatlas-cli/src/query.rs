//! The `query` command: forward one request to the transport-neutral API.

use camino::Utf8Path;
use clap::Parser;
use log::debug;
use skyatlas_core::SqliteStore;
use skyatlas_core::api::{ApiResponse, Endpoint, dispatch};
use skyatlas_core::query::QueryParams;
use std::io::Write;

use crate::{CliError, open_store};

/// CLI arguments for the `query` subcommand.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "query",
    long_about = "Serve one query against the database and print the JSON \
                 body. Endpoints: airports, airport, create-airport, \
                 update-airport, delete-airport, routes, route, nearby, \
                 nearest, hubs. The exit status is non-zero when the \
                 request does not succeed.",
    about = "Query airports and routes"
)]
pub(crate) struct QueryArgs {
    /// Endpoint to call.
    #[arg(value_name = "endpoint")]
    pub(crate) endpoint: Endpoint,
    /// Query parameter as key=value; may be repeated.
    #[arg(long = "param", short = 'p', value_name = "key=value", value_parser = parse_param)]
    pub(crate) params: Vec<(String, String)>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    QueryParams::parse_pair(raw).map_err(|error| error.to_string())
}

pub(crate) fn run_query(
    args: QueryArgs,
    database: &Utf8Path,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let store = if args.endpoint.mutates() {
        open_store(database)?
    } else {
        SqliteStore::open_read_only(database).map_err(|source| CliError::OpenStore {
            path: database.to_path_buf(),
            source,
        })?
    };
    let params: QueryParams = args.params.into_iter().collect();
    debug!("Dispatching {} with {params:?}", args.endpoint);
    let response = dispatch(&store, args.endpoint, &params);
    write_response(out, args.endpoint, &response)
}

pub(crate) fn write_response(
    out: &mut dyn Write,
    endpoint: Endpoint,
    response: &ApiResponse,
) -> Result<(), CliError> {
    let body = serde_json::to_string_pretty(&response.body).map_err(CliError::SerialiseResponse)?;
    writeln!(out, "{body}").map_err(CliError::WriteOutput)?;
    if response.status.is_success() {
        Ok(())
    } else {
        Err(CliError::QueryFailed {
            endpoint,
            status: response.status,
        })
    }
}
