//! Record ingestion for the SkyAtlas stores.
//!
//! Responsibilities:
//! - Read OpenFlights `airports.dat` and `routes.dat` exports.
//! - Validate rows and count the ones that are skipped, by cause.
//! - Write accepted rows to a store in batches and report the totals.
//! - Seed a small sample data set.
//!
//! Boundaries:
//! - Domain rules for codes, positions and routes live in `skyatlas-core`.
//! - Storage is reached only through the `AirportStore` and `RouteStore`
//!   traits.
//!
//! Invariants:
//! - A malformed row never ends a run; only a missing source, an I/O failure
//!   or a store failure does.
//! - Batches commit independently. A failed run leaves earlier batches in
//!   place and reports their counts.
//! - Counters are returned in the report, never held in shared state.

mod ingest;
pub mod records;
mod sample;

pub use ingest::{
    AirportSnapshot, BATCH_SIZE, IngestError, IngestReport, RejectionKind, RowRejection,
    ingest_airports, ingest_routes, load_airports, load_routes, open_source, parse_airport,
    parse_route,
};
pub use records::{Record, records};
pub use sample::{SampleError, SampleReport, seed_sample_data};
