//! Core domain types for the SkyAtlas airport and route atlas.
//!
//! The crate owns the pieces every other SkyAtlas component builds on:
//! validated coordinates and great-circle distances, the airport and route
//! models, the store traits with their in-memory and SQLite backends, and the
//! query engine that answers proximity and aggregation questions.
//!
//! Constructors return `Result` to surface invalid input early, so a value of
//! [`GeoPoint`] or [`IataCode`] is always within its documented range.

#![forbid(unsafe_code)]

pub mod airport;
#[cfg(feature = "serde")]
pub mod api;
pub mod distance;
#[cfg(feature = "serde")]
pub mod geojson;
pub mod query;
pub mod route;
pub mod store;

pub use airport::{
    Airport, AirportError, AirportPatch, IataCode, IataCodeError, NewAirport, UNNAMED_AIRPORT,
};
pub use distance::{
    CoordinateError, EARTH_MEAN_RADIUS_KM, GeoPoint, haversine_km, round_km, validate_coordinate,
};
pub use query::{
    CountryCount, DEFAULT_RADIUS_KM, DEFAULT_ROUTE_LIMIT, DEFAULT_TOP_COUNTRIES,
    MAX_RADIUS_RESULTS, MAX_ROUTE_LIMIT, QueryEngine, QueryError, QueryParams,
};
pub use route::{FlightRoute, RouteError, RouteKey, Waypoint};
pub use store::{
    AirportIndex, AirportMatch, AirportStore, DeleteSummary, InsertSummary, MemoryStore,
    RouteStore, StoreError, Stored, UpsertSummary,
};

#[cfg(feature = "store-sqlite")]
pub use store::{SqliteStore, SqliteStoreError};
