//! Facade crate for the SkyAtlas airport and route atlas.
//!
//! This crate re-exports the core domain types and exposes the SQLite store,
//! the JSON query surface and the OpenFlights loaders behind feature flags.

#![forbid(unsafe_code)]

pub use skyatlas_core::{
    Airport, AirportError, AirportMatch, AirportStore, CoordinateError, CountryCount, FlightRoute,
    GeoPoint, IataCode, MemoryStore, NewAirport, QueryEngine, QueryError, QueryParams, RouteError,
    RouteStore, StoreError, Stored, haversine_km,
};

#[cfg(feature = "store-sqlite")]
pub use skyatlas_core::{SqliteStore, SqliteStoreError};

#[cfg(feature = "serde")]
pub use skyatlas_core::api::{ApiResponse, Endpoint, ResponseStatus, dispatch};

#[cfg(feature = "ingest")]
pub use skyatlas_data::{
    IngestError, IngestReport, SampleReport, load_airports, load_routes, seed_sample_data,
};
