//! Error types emitted by the SkyAtlas CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use skyatlas_core::api::{Endpoint, ResponseStatus};
use skyatlas_core::{SqliteStoreError, StoreError};
use skyatlas_data::{IngestError, SampleError};
use thiserror::Error;

/// Errors emitted by the SkyAtlas CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set <{field}> or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The terminal logger could not be installed.
    #[error("failed to initialise logging: {0}")]
    Logging(#[from] log::SetLoggerError),
    /// The database directory could not be created.
    #[error("failed to prepare database directory for {path:?}: {source}")]
    PrepareDatabase {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open database {path:?}: {source}")]
    OpenStore {
        path: Utf8PathBuf,
        #[source]
        source: SqliteStoreError,
    },
    /// Loading a source file failed.
    #[error("failed to load {path:?}: {source}")]
    Ingest {
        path: Utf8PathBuf,
        #[source]
        source: IngestError,
    },
    /// Caching airports before a route load failed.
    #[error("failed to cache airports: {0}")]
    CacheAirports(#[source] StoreError),
    /// Seeding the sample data failed.
    #[error("failed to load sample data: {0}")]
    Sample(#[from] SampleError),
    /// The dispatched query did not succeed; the body has been written.
    #[error("{endpoint} request failed with status {}", .status.http_status())]
    QueryFailed {
        endpoint: Endpoint,
        status: ResponseStatus,
    },
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
    /// The response body could not be rendered.
    #[error("failed to serialise response: {0}")]
    SerialiseResponse(#[source] serde_json::Error),
}
