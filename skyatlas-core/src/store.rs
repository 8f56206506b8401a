//! Persistence traits for airports and routes.
//!
//! [`AirportStore`] is a keyed upsert store over [`IataCode`] with a spatial
//! index for proximity queries. [`RouteStore`] bulk-inserts routes, skipping
//! rows that conflict with an existing `(origin, destination, airline)` key.
//!
//! Both traits take `&self`: implementations synchronise internally so that
//! many readers can query while an ingestion run writes. A reader may observe
//! the batches a load has committed so far, but never a partially written
//! record.

use std::sync::Arc;

use thiserror::Error;

use crate::airport::{Airport, AirportPatch, IataCode};
use crate::query::CountryCount;
use crate::route::FlightRoute;

mod memory;
mod spatial_index;
#[cfg(feature = "store-sqlite")]
mod sqlite;

pub use memory::MemoryStore;
pub use spatial_index::{AirportIndex, AirportMatch};
#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteStore, SqliteStoreError};

/// A persisted record paired with the surrogate id the store assigned to it.
///
/// Ids are for presentation only; airports are deduplicated by code and
/// routes by [`crate::RouteKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub id: u64,
    pub record: T,
}

impl<T> Stored<T> {
    /// Pair a record with its id.
    pub const fn new(id: u64, record: T) -> Self {
        Self { id, record }
    }
}

/// Outcome of [`AirportStore::upsert_airports`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    /// Airports that did not exist before the call.
    pub inserted: u64,
    /// Existing airports overwritten in place.
    pub updated: u64,
}

impl UpsertSummary {
    /// Total rows written.
    #[must_use]
    pub const fn written(&self) -> u64 {
        self.inserted + self.updated
    }
}

/// Outcome of [`RouteStore::insert_routes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertSummary {
    /// Routes written to the store.
    pub inserted: u64,
    /// Routes skipped because their key already existed.
    pub conflicts: u64,
    /// Routes skipped because an endpoint no longer exists.
    pub orphaned: u64,
}

/// Outcome of [`AirportStore::delete_airport`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    /// Routes removed because they referenced the deleted airport.
    pub routes_removed: u64,
}

/// Errors raised by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A lock guarding shared state was poisoned by a panicking writer.
    #[error("store lock poisoned while attempting to {operation}")]
    Poisoned {
        /// Operation that found the lock poisoned.
        operation: &'static str,
    },
    /// The SQLite backend failed.
    #[cfg(feature = "store-sqlite")]
    #[error(transparent)]
    Sqlite(#[from] SqliteStoreError),
}

/// Keyed storage for airports.
///
/// # Examples
/// ```
/// use skyatlas_core::{Airport, AirportStore, GeoPoint, IataCode, MemoryStore};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::default();
/// let code = IataCode::parse("DUB")?;
/// let dublin = Airport::new(code.clone(), "Dublin", "Dublin", "Ireland", GeoPoint::new(53.42, -6.27)?);
///
/// store.upsert_airports(&[dublin.clone()])?;
/// let summary = store.upsert_airports(&[dublin])?;
/// assert_eq!(summary.updated, 1);
/// assert_eq!(store.airport_count()?, 1);
/// assert!(store.airport(&code)?.is_some());
/// # Ok(())
/// # }
/// ```
pub trait AirportStore {
    /// Insert each airport, or overwrite the existing record with its code.
    ///
    /// Overwrites replace name, city, country and position. Altitude, the hub
    /// flag and the surrogate id are preserved; change those with
    /// [`AirportStore::update_airport`].
    fn upsert_airports(&self, airports: &[Airport]) -> Result<UpsertSummary, StoreError>;

    /// Fetch one airport by code.
    fn airport(&self, code: &IataCode) -> Result<Option<Stored<Airport>>, StoreError>;

    /// Every stored airport ordered by code.
    fn airports(&self) -> Result<Vec<Stored<Airport>>, StoreError>;

    /// Number of stored airports.
    fn airport_count(&self) -> Result<u64, StoreError>;

    /// Apply a partial update, returning the updated record or `None` when
    /// no airport has `code`.
    fn update_airport(
        &self,
        code: &IataCode,
        patch: &AirportPatch,
    ) -> Result<Option<Stored<Airport>>, StoreError>;

    /// Delete an airport and every route that references it.
    ///
    /// Returns `None` when no airport has `code`.
    fn delete_airport(&self, code: &IataCode) -> Result<Option<DeleteSummary>, StoreError>;

    /// Airport counts per country, in no particular order.
    fn country_counts(&self) -> Result<Vec<CountryCount>, StoreError>;

    /// A spatial index reflecting the airports stored at the time of the call.
    fn spatial_index(&self) -> Result<Arc<AirportIndex>, StoreError>;
}

/// Bulk storage for routes.
pub trait RouteStore {
    /// Insert a batch of routes atomically.
    ///
    /// Rows whose key already exists, or whose endpoints are no longer stored,
    /// are skipped and counted rather than failing the batch.
    fn insert_routes(&self, routes: &[FlightRoute]) -> Result<InsertSummary, StoreError>;

    /// Fetch one route by id.
    fn route(&self, id: u64) -> Result<Option<Stored<FlightRoute>>, StoreError>;

    /// Up to `limit` routes departing `origin`, in insertion order.
    fn routes_from(
        &self,
        origin: &IataCode,
        limit: usize,
    ) -> Result<Vec<Stored<FlightRoute>>, StoreError>;

    /// Number of stored routes.
    fn route_count(&self) -> Result<u64, StoreError>;
}
