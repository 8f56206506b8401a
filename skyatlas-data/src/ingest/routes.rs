//! Route rows from an OpenFlights `routes.dat` export.

use std::{collections::HashMap, io};

use camino::Utf8Path;
use log::info;
use skyatlas_core::{
    AirportStore, FlightRoute, GeoPoint, IataCode, RouteError, RouteStore, StoreError, Waypoint,
};

use super::pipeline::{self, BatchLoader, Flushed};
use super::{BATCH_SIZE, IngestError, IngestReport, RowRejection, open_source};
use crate::records::Record;

const AIRLINE: usize = 0;
const ORIGIN: usize = 2;
const DESTINATION: usize = 4;
const MIN_FIELDS: usize = 6;

/// Airport positions captured once at the start of a route load.
///
/// The snapshot is a plain copy: airports written to the store after it was
/// captured are not visible through it, and airports removed afterwards are
/// still resolved. The store's own referential checks catch the latter when
/// the batch is written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AirportSnapshot {
    positions: HashMap<IataCode, GeoPoint>,
}

impl AirportSnapshot {
    /// Copy every airport position currently held by `store`.
    pub fn capture<S: AirportStore + ?Sized>(store: &S) -> Result<Self, StoreError> {
        let snapshot: Self = store
            .airports()?
            .into_iter()
            .map(|stored| (stored.record.code, stored.record.location))
            .collect();
        info!("Cached {} airports in memory", snapshot.len());
        Ok(snapshot)
    }

    /// Number of airports in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the snapshot holds no airports.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Resolve a code to a route endpoint.
    #[must_use]
    pub fn waypoint(&self, code: &IataCode) -> Option<Waypoint> {
        self.positions
            .get(code)
            .map(|location| Waypoint::new(code.clone(), *location))
    }
}

impl FromIterator<(IataCode, GeoPoint)> for AirportSnapshot {
    fn from_iter<I: IntoIterator<Item = (IataCode, GeoPoint)>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

impl From<RouteError> for RowRejection {
    fn from(error: RouteError) -> Self {
        match error {
            RouteError::SameEndpoints(code) => Self::SameEndpoints { code },
        }
    }
}

/// Validate one route row against the airports in `snapshot`.
///
/// The airline is taken from field 0, the origin from field 2 and the
/// destination from field 4.
///
/// # Examples
/// ```
/// use skyatlas_core::{GeoPoint, IataCode};
/// use skyatlas_data::{AirportSnapshot, Record, parse_route};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let snapshot: AirportSnapshot = [
///     (IataCode::parse("DUB")?, GeoPoint::new(53.4213, -6.27)?),
///     (IataCode::parse("LHR")?, GeoPoint::new(51.47, -0.4543)?),
/// ]
/// .into_iter()
/// .collect();
/// let row = Record::new(1, ["EI", "", "dub", "", "LHR", ""]);
/// let route = parse_route(&row, &snapshot)?;
/// assert_eq!(route.origin.as_str(), "DUB");
/// assert!((440.0..470.0).contains(&route.distance_km));
/// # Ok(())
/// # }
/// ```
pub fn parse_route(record: &Record, snapshot: &AirportSnapshot) -> Result<FlightRoute, RowRejection> {
    if record.len() < MIN_FIELDS {
        return Err(RowRejection::TooFewFields {
            found: record.len(),
            expected: MIN_FIELDS,
        });
    }
    let origin = endpoint_code(record, ORIGIN, "origin")?;
    let destination = endpoint_code(record, DESTINATION, "destination")?;
    if origin == destination {
        return Err(RowRejection::SameEndpoints { code: origin });
    }
    let Some(from) = snapshot.waypoint(&origin) else {
        return Err(RowRejection::UnknownAirport {
            field: "origin",
            code: origin,
        });
    };
    let Some(to) = snapshot.waypoint(&destination) else {
        return Err(RowRejection::UnknownAirport {
            field: "destination",
            code: destination,
        });
    };
    let airline = record.field(AIRLINE).trim().to_uppercase();
    FlightRoute::between(airline, &from, &to).map_err(RowRejection::from)
}

fn endpoint_code(
    record: &Record,
    index: usize,
    field: &'static str,
) -> Result<IataCode, RowRejection> {
    IataCode::parse(record.field(index))
        .map_err(|source| RowRejection::InvalidCode { field, source })
}

struct RouteLoader<'a, S: ?Sized> {
    snapshot: &'a AirportSnapshot,
    store: &'a S,
}

impl<S: RouteStore + ?Sized> BatchLoader for RouteLoader<'_, S> {
    type Item = FlightRoute;

    const SUBJECT: &'static str = "routes";

    fn parse(&self, record: &Record) -> Result<FlightRoute, RowRejection> {
        parse_route(record, self.snapshot)
    }

    fn flush(&self, batch: &[FlightRoute]) -> Result<Flushed, StoreError> {
        let summary = self.store.insert_routes(batch)?;
        Ok(Flushed {
            imported: summary.inserted + summary.conflicts,
            conflicts: summary.conflicts,
            orphaned: summary.orphaned,
        })
    }

    fn total(&self) -> Result<u64, StoreError> {
        self.store.route_count()
    }
}

/// Insert every valid route row read from `source`.
///
/// Rows naming an airport absent from `snapshot` are skipped. Routes already
/// stored under the same origin, destination and airline are left untouched
/// and counted in [`IngestReport::conflicts`].
pub fn ingest_routes<R, S>(
    source: R,
    snapshot: &AirportSnapshot,
    store: &S,
) -> Result<IngestReport, IngestError>
where
    R: io::Read,
    S: RouteStore + ?Sized,
{
    pipeline::run(source, &RouteLoader { snapshot, store }, BATCH_SIZE)
}

/// Load a `routes.dat` file into `store`, resolving endpoints against the
/// airports it holds when the load starts.
pub fn load_routes<S>(path: &Utf8Path, store: &S) -> Result<IngestReport, IngestError>
where
    S: AirportStore + RouteStore + ?Sized,
{
    let source = open_source(path)?;
    let snapshot = AirportSnapshot::capture(store).map_err(|source| IngestError::Store {
        report: IngestReport::default(),
        source,
    })?;
    ingest_routes(source, &snapshot, store)
}
