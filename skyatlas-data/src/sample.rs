//! A small fixed data set for demos and smoke tests.

use log::info;
use skyatlas_core::{
    Airport, AirportError, AirportStore, FlightRoute, IataCode, NewAirport, RouteError,
    RouteStore, StoreError,
};
use thiserror::Error;

/// `(code, name, city, country, lat, lon)`
const SAMPLE_AIRPORTS: [(&str, &str, &str, &str, f64, f64); 4] = [
    ("DUB", "Dublin Airport", "Dublin", "Ireland", 53.4213, -6.27),
    ("LHR", "Heathrow Airport", "London", "United Kingdom", 51.47, -0.4543),
    ("CDG", "Charles de Gaulle", "Paris", "France", 49.0097, 2.5479),
    ("AMS", "Amsterdam Schiphol", "Amsterdam", "Netherlands", 52.3086, 4.7639),
];

/// `(origin, destination, airline)`
const SAMPLE_ROUTES: [(&str, &str, &str); 4] = [
    ("DUB", "LHR", "AerLingus"),
    ("DUB", "CDG", "AirFrance"),
    ("LHR", "AMS", "BritishAirways"),
    ("CDG", "AMS", "KLM"),
];

/// Counts reported by [`seed_sample_data`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleReport {
    /// Sample airports written by this call.
    pub airports_created: u64,
    /// Sample airports that were already stored and left unchanged.
    pub airports_existing: u64,
    /// Sample routes written by this call.
    pub routes_created: u64,
    /// Sample routes that were already stored.
    pub routes_existing: u64,
}

/// Errors returned by [`seed_sample_data`].
#[derive(Debug, Error)]
pub enum SampleError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("sample airport is invalid")]
    Airport(#[from] AirportError),
    #[error("sample route is invalid")]
    Route(#[from] RouteError),
    #[error("sample route endpoint {code} is not stored")]
    MissingAirport { code: IataCode },
}

/// Store the sample airports and routes, keeping any that already exist.
///
/// Existing airports are not overwritten, and routes are built from the
/// positions of the airports as stored.
///
/// # Examples
/// ```
/// use skyatlas_core::{AirportStore, MemoryStore, RouteStore};
/// use skyatlas_data::seed_sample_data;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::default();
/// let first = seed_sample_data(&store)?;
/// assert_eq!((first.airports_created, first.routes_created), (4, 4));
/// let again = seed_sample_data(&store)?;
/// assert_eq!((again.airports_existing, again.routes_existing), (4, 4));
/// assert_eq!(store.route_count()?, 4);
/// # Ok(())
/// # }
/// ```
pub fn seed_sample_data<S>(store: &S) -> Result<SampleReport, SampleError>
where
    S: AirportStore + RouteStore + ?Sized,
{
    let mut report = SampleReport::default();
    let mut missing = Vec::new();
    for (code, name, city, country, lat, lon) in SAMPLE_AIRPORTS {
        let airport = NewAirport {
            code: code.to_owned(),
            name: name.to_owned(),
            city: city.to_owned(),
            country: country.to_owned(),
            lat,
            lon,
            ..NewAirport::default()
        }
        .validate()?;
        if store.airport(&airport.code)?.is_some() {
            info!("Already exists: {}", airport.code);
            report.airports_existing += 1;
        } else {
            info!("Created: {}", airport.code);
            missing.push(airport);
        }
    }
    report.airports_created = store.upsert_airports(&missing)?.inserted;

    let mut routes = Vec::with_capacity(SAMPLE_ROUTES.len());
    for (origin, destination, airline) in SAMPLE_ROUTES {
        let from = stored_airport(store, origin)?;
        let to = stored_airport(store, destination)?;
        routes.push(FlightRoute::between(
            airline,
            &from.waypoint(),
            &to.waypoint(),
        )?);
    }
    let inserted = store.insert_routes(&routes)?;
    report.routes_created = inserted.inserted;
    report.routes_existing = inserted.conflicts;
    info!(
        "Sample data loaded: {} airports and {} routes created",
        report.airports_created, report.routes_created
    );
    Ok(report)
}

fn stored_airport<S>(store: &S, raw: &str) -> Result<Airport, SampleError>
where
    S: AirportStore + ?Sized,
{
    let code = IataCode::parse(raw).map_err(AirportError::from)?;
    match store.airport(&code)? {
        Some(stored) => Ok(stored.record),
        None => Err(SampleError::MissingAirport { code }),
    }
}
