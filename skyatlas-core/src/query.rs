//! Read-side queries over airport and route stores.
//!
//! [`QueryEngine`] borrows a store and answers nearest, radius, route-listing
//! and country aggregation questions. Distances in results are rounded to two
//! decimals. Parameter problems surface as [`QueryError::InvalidParameter`];
//! codes that match no airport surface as [`QueryError::AirportNotFound`],
//! never as an empty result.

use thiserror::Error;

use crate::airport::{Airport, IataCode};
use crate::distance::{CoordinateError, GeoPoint, round_km};
use crate::route::FlightRoute;
use crate::store::{AirportMatch, AirportStore, RouteStore, StoreError, Stored};

mod params;

pub use params::QueryParams;

/// Upper bound on airports returned by a radius search.
pub const MAX_RADIUS_RESULTS: usize = 300;
/// Upper bound on routes returned by a route listing.
pub const MAX_ROUTE_LIMIT: usize = 1000;
/// Route listing size when the caller gives no limit.
pub const DEFAULT_ROUTE_LIMIT: usize = 1000;
/// Radius used when the caller gives none.
pub const DEFAULT_RADIUS_KM: f64 = 100.0;
/// Number of countries returned by the hub ranking when unspecified.
pub const DEFAULT_TOP_COUNTRIES: usize = 10;

/// Number of airports stored for one country.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CountryCount {
    pub country: String,
    pub count: u64,
}

impl CountryCount {
    /// Pair a country with its airport count.
    pub fn new(country: impl Into<String>, count: u64) -> Self {
        Self {
            country: country.into(),
            count,
        }
    }
}

/// Errors returned by [`QueryEngine`].
#[derive(Debug, Error)]
pub enum QueryError {
    /// A parameter was missing or malformed.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name as the caller supplied it.
        name: String,
        /// Human readable explanation.
        reason: String,
    },
    /// No airport has the requested code.
    #[error("no airport with IATA code {code}")]
    AirportNotFound {
        /// Code as requested, upper-cased.
        code: String,
    },
    /// No route has the requested id.
    #[error("no route with id {id}")]
    RouteNotFound {
        /// Requested route id.
        id: u64,
    },
    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    /// Build an [`QueryError::InvalidParameter`].
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Return `true` for errors caused by the caller rather than the store.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidParameter { .. })
    }

    /// Return `true` when the requested record does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AirportNotFound { .. } | Self::RouteNotFound { .. }
        )
    }
}

fn query_point(lat: f64, lon: f64) -> Result<GeoPoint, QueryError> {
    GeoPoint::new(lat, lon).map_err(|error| match error {
        CoordinateError::Latitude(_) => QueryError::invalid("lat", error.to_string()),
        CoordinateError::Longitude(_) => QueryError::invalid("lon", error.to_string()),
    })
}

fn rounded(found: AirportMatch) -> AirportMatch {
    AirportMatch {
        distance_km: round_km(found.distance_km),
        ..found
    }
}

/// Queries over a borrowed store.
///
/// # Examples
/// ```
/// use skyatlas_core::{Airport, AirportStore, GeoPoint, IataCode, MemoryStore, QueryEngine};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::default();
/// store.upsert_airports(&[Airport::new(
///     IataCode::parse("DUB")?,
///     "Dublin Airport",
///     "Dublin",
///     "Ireland",
///     GeoPoint::new(53.4213, -6.27)?,
/// )])?;
///
/// let engine = QueryEngine::new(&store);
/// let nearest = engine.nearest_airport(53.3, -6.2)?.expect("store is not empty");
/// assert_eq!(nearest.airport.record.code.as_str(), "DUB");
/// assert!(engine.routes_from_origin("ZZZ", Some(50)).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct QueryEngine<'s, S: ?Sized> {
    store: &'s S,
}

impl<S: ?Sized> Clone for QueryEngine<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized> Copy for QueryEngine<'_, S> {}

impl<'s, S: ?Sized> QueryEngine<'s, S> {
    /// Wrap a store.
    pub const fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// The wrapped store.
    pub const fn store(&self) -> &'s S {
        self.store
    }
}

impl<S> QueryEngine<'_, S>
where
    S: AirportStore + ?Sized,
{
    /// The closest airport to `(lat, lon)`, or `None` when the store is empty.
    ///
    /// Equidistant airports resolve to the lowest code.
    pub fn nearest_airport(&self, lat: f64, lon: f64) -> Result<Option<AirportMatch>, QueryError> {
        let point = query_point(lat, lon)?;
        let index = self.store.spatial_index()?;
        Ok(index.nearest(&point).map(rounded))
    }

    /// Airports within `radius_km` of `(lat, lon)`, closest first.
    ///
    /// At most [`MAX_RADIUS_RESULTS`] airports are returned.
    pub fn airports_within_radius(
        &self,
        lat: f64,
        lon: f64,
        radius_km: f64,
    ) -> Result<Vec<AirportMatch>, QueryError> {
        let point = query_point(lat, lon)?;
        if !radius_km.is_finite() || radius_km < 0.0 {
            return Err(QueryError::invalid(
                "radius",
                format!("{radius_km} is not a non-negative number of kilometres"),
            ));
        }
        let index = self.store.spatial_index()?;
        Ok(index
            .within_radius(&point, radius_km, MAX_RADIUS_RESULTS)
            .into_iter()
            .map(rounded)
            .collect())
    }

    /// The `top` countries with the most airports, largest first.
    ///
    /// Countries with equal counts are ordered by name.
    pub fn top_countries_by_airport_count(
        &self,
        top: usize,
    ) -> Result<Vec<CountryCount>, QueryError> {
        let mut counts = self.store.country_counts()?;
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.country.cmp(&b.country)));
        counts.truncate(top);
        Ok(counts)
    }

    /// One airport by code, matched case-insensitively.
    pub fn airport(&self, code: &str) -> Result<Stored<Airport>, QueryError> {
        let code = lookup_code(code)?;
        self.store
            .airport(&code)?
            .ok_or_else(|| QueryError::AirportNotFound {
                code: code.to_string(),
            })
    }

    /// Every airport, ordered by code.
    pub fn airports(&self) -> Result<Vec<Stored<Airport>>, QueryError> {
        Ok(self.store.airports()?)
    }
}

impl<S> QueryEngine<'_, S>
where
    S: AirportStore + RouteStore + ?Sized,
{
    /// Routes departing the airport with `code`, in insertion order.
    ///
    /// `limit` defaults to [`DEFAULT_ROUTE_LIMIT`] and is capped at
    /// [`MAX_ROUTE_LIMIT`]. An unknown code is an error, distinct from an
    /// airport with no departures.
    pub fn routes_from_origin(
        &self,
        code: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Stored<FlightRoute>>, QueryError> {
        if code.trim().is_empty() {
            return Err(QueryError::invalid("origin", "an IATA code is required"));
        }
        let origin = self.airport(code)?;
        let limit = limit.unwrap_or(DEFAULT_ROUTE_LIMIT).min(MAX_ROUTE_LIMIT);
        Ok(self.store.routes_from(&origin.record.code, limit)?)
    }

    /// One route by id.
    pub fn route(&self, id: u64) -> Result<Stored<FlightRoute>, QueryError> {
        self.store
            .route(id)?
            .ok_or(QueryError::RouteNotFound { id })
    }
}

fn lookup_code(raw: &str) -> Result<IataCode, QueryError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(QueryError::invalid("code", "an IATA code is required"));
    }
    // A malformed code cannot match any stored airport.
    IataCode::parse(trimmed).map_err(|_| QueryError::AirportNotFound {
        code: trimmed.to_uppercase(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rstest::{fixture, rstest};

    fn airport(code: &str, country: &str, lat: f64, lon: f64) -> Airport {
        Airport::new(
            IataCode::parse(code).expect("valid code"),
            format!("{code} Airport"),
            code,
            country,
            GeoPoint::new(lat, lon).expect("valid point"),
        )
    }

    fn route(from: &Airport, to: &Airport, airline: &str) -> FlightRoute {
        FlightRoute::between(airline, &from.waypoint(), &to.waypoint()).expect("valid route")
    }

    #[fixture]
    fn store() -> MemoryStore {
        let dub = airport("DUB", "Ireland", 53.4213, -6.27);
        let ork = airport("ORK", "Ireland", 51.8413, -8.4911);
        let lhr = airport("LHR", "United Kingdom", 51.47, -0.4543);
        let store =
            MemoryStore::with_airports([dub.clone(), ork.clone(), lhr.clone()]).expect("seed");
        store
            .insert_routes(&[
                route(&dub, &lhr, "EI"),
                route(&dub, &ork, "EI"),
                route(&lhr, &dub, "BA"),
            ])
            .expect("seed routes");
        store
    }

    #[rstest]
    fn nearest_rounds_distance(store: MemoryStore) {
        let engine = QueryEngine::new(&store);
        let found = engine
            .nearest_airport(53.3, -6.2)
            .expect("query")
            .expect("non-empty store");
        assert_eq!(found.airport.record.code.as_str(), "DUB");
        assert!((found.distance_km - 14.27).abs() < 1.0e-9);
    }

    #[rstest]
    fn nearest_on_empty_store_is_none() {
        let store = MemoryStore::default();
        let engine = QueryEngine::new(&store);
        assert!(engine.nearest_airport(0.0, 0.0).expect("query").is_none());
    }

    #[rstest]
    #[case(95.0, 0.0, "lat")]
    #[case(0.0, -200.0, "lon")]
    fn nearest_rejects_invalid_points(
        store: MemoryStore,
        #[case] lat: f64,
        #[case] lon: f64,
        #[case] parameter: &str,
    ) {
        let engine = QueryEngine::new(&store);
        match engine.nearest_airport(lat, lon) {
            Err(QueryError::InvalidParameter { name, .. }) => assert_eq!(name, parameter),
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[rstest]
    fn zero_radius_away_from_airports_is_empty(store: MemoryStore) {
        let engine = QueryEngine::new(&store);
        let found = engine
            .airports_within_radius(53.3, -6.2, 0.0)
            .expect("query");
        assert!(found.is_empty());
    }

    #[rstest]
    fn radius_results_are_sorted(store: MemoryStore) {
        let engine = QueryEngine::new(&store);
        let codes: Vec<String> = engine
            .airports_within_radius(53.3, -6.2, 500.0)
            .expect("query")
            .into_iter()
            .map(|found| found.airport.record.code.to_string())
            .collect();
        assert_eq!(codes, vec!["DUB", "ORK", "LHR"]);
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn radius_rejects_invalid_values(store: MemoryStore, #[case] radius: f64) {
        let engine = QueryEngine::new(&store);
        let error = engine
            .airports_within_radius(53.3, -6.2, radius)
            .expect_err("invalid radius");
        assert!(error.is_client_error());
    }

    #[rstest]
    fn radius_results_are_capped() {
        let airports = (0_u32..400).map(|index| {
            let code = format!(
                "{}{}{}",
                char::from(b'A' + (index / 26 / 26 % 26) as u8),
                char::from(b'A' + (index / 26 % 26) as u8),
                char::from(b'A' + (index % 26) as u8)
            );
            airport(&code, "Grid", f64::from(index / 20) * 0.01, f64::from(index % 20) * 0.01)
        });
        let store = MemoryStore::with_airports(airports).expect("seed");
        let engine = QueryEngine::new(&store);
        let found = engine
            .airports_within_radius(0.0, 0.0, 1000.0)
            .expect("query");
        assert_eq!(found.len(), MAX_RADIUS_RESULTS);
    }

    #[rstest]
    #[case("dub", None, 2)]
    #[case("DUB", Some(1), 1)]
    #[case(" DUB ", Some(5000), 2)]
    #[case("ORK", Some(10), 0)]
    fn routes_from_origin_applies_limits(
        store: MemoryStore,
        #[case] code: &str,
        #[case] limit: Option<usize>,
        #[case] expected: usize,
    ) {
        let engine = QueryEngine::new(&store);
        let routes = engine.routes_from_origin(code, limit).expect("query");
        assert_eq!(routes.len(), expected);
    }

    #[rstest]
    #[case("ZZZ")]
    #[case("EGLL")]
    fn unknown_origin_is_not_found(store: MemoryStore, #[case] code: &str) {
        let engine = QueryEngine::new(&store);
        let error = engine
            .routes_from_origin(code, Some(50))
            .expect_err("unknown origin");
        assert!(error.is_not_found(), "unexpected error {error:?}");
    }

    #[rstest]
    fn blank_origin_is_a_client_error(store: MemoryStore) {
        let engine = QueryEngine::new(&store);
        let error = engine.routes_from_origin("  ", None).expect_err("blank origin");
        assert!(error.is_client_error());
    }

    #[rstest]
    fn top_countries_sorts_and_truncates(store: MemoryStore) {
        let engine = QueryEngine::new(&store);
        assert_eq!(
            engine.top_countries_by_airport_count(1).expect("query"),
            vec![CountryCount::new("Ireland", 2)]
        );
        assert_eq!(engine.top_countries_by_airport_count(10).expect("query").len(), 2);
        assert!(engine.top_countries_by_airport_count(0).expect("query").is_empty());
    }

    #[rstest]
    fn top_countries_break_ties_by_name() {
        let store = MemoryStore::with_airports([
            airport("CDG", "France", 49.0097, 2.5479),
            airport("AMS", "Netherlands", 52.3086, 4.7639),
            airport("BRU", "Belgium", 50.9014, 4.4844),
        ])
        .expect("seed");
        let engine = QueryEngine::new(&store);
        let countries: Vec<String> = engine
            .top_countries_by_airport_count(3)
            .expect("query")
            .into_iter()
            .map(|entry| entry.country)
            .collect();
        assert_eq!(countries, vec!["Belgium", "France", "Netherlands"]);
    }

    #[rstest]
    fn route_lookup_distinguishes_missing_ids(store: MemoryStore) {
        let engine = QueryEngine::new(&store);
        assert_eq!(engine.route(1).expect("route").record.airline, "EI");
        assert!(matches!(
            engine.route(42),
            Err(QueryError::RouteNotFound { id: 42 })
        ));
    }
}
