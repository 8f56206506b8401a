use std::{collections::BTreeMap, fmt, io};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8::File;
use log::info;
use skyatlas_core::{CoordinateError, IataCode, IataCodeError, StoreError};
use thiserror::Error;

mod airports;
mod pipeline;
mod routes;

pub use airports::{ingest_airports, load_airports, parse_airport};
pub use routes::{AirportSnapshot, ingest_routes, load_routes, parse_route};

/// Rows accepted before a batch is written to the store.
pub const BATCH_SIZE: usize = 1000;

/// Category of a skipped row, used to break the skip count down by cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectionKind {
    TooFewFields,
    InvalidCode,
    MalformedNumber,
    InvalidCoordinate,
    ExcludedFacility,
    ExcludedCountry,
    SameEndpoints,
    UnknownAirport,
    Unreadable,
}

impl RejectionKind {
    /// Short human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TooFewFields => "too few fields",
            Self::InvalidCode => "invalid IATA code",
            Self::MalformedNumber => "malformed number",
            Self::InvalidCoordinate => "coordinate out of range",
            Self::ExcludedFacility => "heliport or seaplane base",
            Self::ExcludedCountry => "excluded country",
            Self::SameEndpoints => "origin equals destination",
            Self::UnknownAirport => "unknown airport",
            Self::Unreadable => "unreadable row",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reason a single row was skipped. Rejections never end a run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RowRejection {
    #[error("row has {found} fields; expected at least {expected}")]
    TooFewFields { found: usize, expected: usize },
    #[error("invalid {field} code")]
    InvalidCode {
        field: &'static str,
        #[source]
        source: IataCodeError,
    },
    #[error("{field} {value:?} is not a number")]
    MalformedNumber { field: &'static str, value: String },
    #[error(transparent)]
    InvalidCoordinate(#[from] CoordinateError),
    #[error("{name:?} is a heliport or seaplane base")]
    ExcludedFacility { name: String },
    #[error("airports in {country:?} are not loaded")]
    ExcludedCountry { country: String },
    #[error("route starts and ends at {code}")]
    SameEndpoints { code: IataCode },
    #[error("{field} airport {code} is not loaded")]
    UnknownAirport { field: &'static str, code: IataCode },
    #[error("row could not be decoded: {reason}")]
    Unreadable { reason: String },
}

impl RowRejection {
    /// Category used in [`IngestReport::skipped_by_reason`].
    #[must_use]
    pub const fn kind(&self) -> RejectionKind {
        match self {
            Self::TooFewFields { .. } => RejectionKind::TooFewFields,
            Self::InvalidCode { .. } => RejectionKind::InvalidCode,
            Self::MalformedNumber { .. } => RejectionKind::MalformedNumber,
            Self::InvalidCoordinate(_) => RejectionKind::InvalidCoordinate,
            Self::ExcludedFacility { .. } => RejectionKind::ExcludedFacility,
            Self::ExcludedCountry { .. } => RejectionKind::ExcludedCountry,
            Self::SameEndpoints { .. } => RejectionKind::SameEndpoints,
            Self::UnknownAirport { .. } => RejectionKind::UnknownAirport,
            Self::Unreadable { .. } => RejectionKind::Unreadable,
        }
    }
}

/// Counts reported by an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Rows written to the store. For routes this includes rows the store
    /// skipped as duplicates of an existing route.
    pub imported: u64,
    /// Rows rejected during parsing or validation.
    pub skipped: u64,
    /// Records held by the store once the run finished.
    pub total: u64,
    /// Imported routes the store already held under the same key.
    pub conflicts: u64,
    /// Skipped rows broken down by cause.
    pub skipped_by_reason: BTreeMap<RejectionKind, u64>,
}

impl IngestReport {
    /// Rows skipped for the given cause.
    #[must_use]
    pub fn skipped_for(&self, kind: RejectionKind) -> u64 {
        self.skipped_by_reason.get(&kind).copied().unwrap_or_default()
    }

    fn record_skips(&mut self, kind: RejectionKind, count: u64) {
        if count == 0 {
            return;
        }
        self.skipped += count;
        *self.skipped_by_reason.entry(kind).or_default() += count;
    }
}

/// Errors that end an ingestion run.
///
/// Runs commit one batch at a time, so the variants raised after reading
/// began carry the counts for the batches already committed.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("source file not found at {path}")]
    MissingFile { path: Utf8PathBuf },
    #[error("failed to open source file at {path}")]
    Open {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read records after {} imported rows", .report.imported)]
    Read {
        report: IngestReport,
        #[source]
        source: csv::Error,
    },
    #[error("failed to persist records after {} imported rows", .report.imported)]
    Store {
        report: IngestReport,
        #[source]
        source: StoreError,
    },
}

impl IngestError {
    /// Counts committed before the failure, when reading had started.
    #[must_use]
    pub const fn partial_report(&self) -> Option<&IngestReport> {
        match self {
            Self::Read { report, .. } | Self::Store { report, .. } => Some(report),
            Self::MissingFile { .. } | Self::Open { .. } => None,
        }
    }
}

/// Open a source file, failing early when it does not exist.
///
/// # Examples
/// ```
/// use camino::Utf8Path;
/// use skyatlas_data::{IngestError, open_source};
///
/// let missing = open_source(Utf8Path::new("does/not/exist/airports.dat"));
/// assert!(matches!(missing, Err(IngestError::MissingFile { .. })));
/// ```
pub fn open_source(path: &Utf8Path) -> Result<File, IngestError> {
    let open_error = |source| IngestError::Open {
        path: path.to_path_buf(),
        source,
    };
    if !skyatlas_fs::is_regular_file(path).map_err(open_error)? {
        return Err(IngestError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    info!("Loading records from {path}");
    skyatlas_fs::open_data_file(path).map_err(open_error)
}
