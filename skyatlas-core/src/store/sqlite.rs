//! SQLite-backed store for airports and routes.
//!
//! The database runs in WAL mode so read-only connections opened with
//! [`SqliteStore::open_read_only`] can query while another process loads data.
//! Route paths are stored as JSON arrays of `[lon, lat]` pairs.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use geo::LineString;
use log::{debug, warn};
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, Transaction, params};
use thiserror::Error;

use crate::airport::{Airport, AirportPatch, IataCode, IataCodeError};
use crate::distance::{CoordinateError, GeoPoint};
use crate::query::CountryCount;
use crate::route::FlightRoute;

use super::{
    AirportIndex, AirportStore, DeleteSummary, InsertSummary, RouteStore, StoreError, Stored,
    UpsertSummary,
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const AIRPORT_COLUMNS: &str =
    "id, iata_code, name, city, country, lat, lon, altitude_ft, is_major_hub";
const ROUTE_COLUMNS: &str = "id, origin, destination, airline, distance_km, path";

/// Errors raised by [`SqliteStore`].
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        /// Location of the database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A statement failed.
    #[error("failed to {operation}")]
    Sqlite {
        /// Operation being performed.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A route path could not be encoded as JSON.
    #[error("failed to encode path for route {origin}->{destination}")]
    EncodePath {
        /// Route origin.
        origin: IataCode,
        /// Route destination.
        destination: IataCode,
        /// JSON encoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// A stored route path was not valid JSON.
    #[error("failed to decode path for route {id}")]
    DecodePath {
        /// Identifier of the route whose path failed to parse.
        id: u64,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// A stored airport code failed validation.
    #[error("stored airport code {value:?} is invalid")]
    InvalidCode {
        /// Raw column value.
        value: String,
        /// Validation failure.
        #[source]
        source: IataCodeError,
    },
    /// A stored airport position failed validation.
    #[error("stored position for airport {code} is invalid")]
    InvalidCoordinate {
        /// Airport whose position failed validation.
        code: IataCode,
        /// Validation failure.
        #[source]
        source: CoordinateError,
    },
    /// An integer column held a negative value.
    #[error("column {column} holds {value}, which is not a valid unsigned value")]
    OutOfRange {
        /// Column name.
        column: &'static str,
        /// Offending value.
        value: i64,
    },
}

fn sqlite(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> SqliteStoreError {
    move |source| SqliteStoreError::Sqlite { operation, source }
}

fn unsigned(column: &'static str, value: i64) -> Result<u64, SqliteStoreError> {
    u64::try_from(value).map_err(|_| SqliteStoreError::OutOfRange { column, value })
}

struct SqliteState {
    connection: Connection,
    /// Spatial index keyed by the `data_version` it was built from.
    index: Option<(i64, Arc<AirportIndex>)>,
}

/// Airport and route store persisted in a SQLite database.
pub struct SqliteStore {
    path: Option<PathBuf>,
    state: Mutex<SqliteState>,
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open or create a database at `path`, creating the schema if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SqliteStoreError> {
        let path = path.as_ref();
        let connection = Connection::open(path).map_err(|source| SqliteStoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut connection = configure(connection)?;
        let mode: String = connection
            .pragma_update_and_check(None, "journal_mode", "wal", |row| row.get(0))
            .map_err(sqlite("enable write-ahead logging"))?;
        if !mode.eq_ignore_ascii_case("wal") {
            warn!("SQLite database at {} is using journal mode {mode}", path.display());
        }
        initialise_schema(&mut connection)?;
        debug!("opened SQLite store at {}", path.display());
        Ok(Self::from_connection(Some(path.to_path_buf()), connection))
    }

    /// Open a private in-memory database with the schema applied.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let connection =
            Connection::open_in_memory().map_err(|source| SqliteStoreError::Open {
                path: PathBuf::from(":memory:"),
                source,
            })?;
        let mut connection = configure(connection)?;
        initialise_schema(&mut connection)?;
        Ok(Self::from_connection(None, connection))
    }

    /// Open an existing database without write access.
    ///
    /// Every write through the returned store fails with
    /// [`SqliteStoreError::Sqlite`].
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, SqliteStoreError> {
        let path = path.as_ref();
        let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|source| SqliteStoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let connection = configure(connection)?;
        Ok(Self::from_connection(Some(path.to_path_buf()), connection))
    }

    /// Location of the database, or `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn from_connection(path: Option<PathBuf>, connection: Connection) -> Self {
        Self {
            path,
            state: Mutex::new(SqliteState {
                connection,
                index: None,
            }),
        }
    }

    fn lock(&self, operation: &'static str) -> Result<MutexGuard<'_, SqliteState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Poisoned { operation })
    }
}

fn configure(connection: Connection) -> Result<Connection, SqliteStoreError> {
    connection
        .pragma_update(None, "foreign_keys", true)
        .map_err(sqlite("enable foreign keys"))?;
    connection
        .busy_timeout(BUSY_TIMEOUT)
        .map_err(sqlite("set busy timeout"))?;
    Ok(connection)
}

fn initialise_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let transaction = connection
        .transaction()
        .map_err(sqlite("begin schema transaction"))?;
    run_schema_step(
        &transaction,
        "create airports table",
        "CREATE TABLE IF NOT EXISTS airports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            iata_code TEXT NOT NULL UNIQUE CHECK (length(iata_code) = 3),
            name TEXT NOT NULL,
            city TEXT NOT NULL,
            country TEXT NOT NULL,
            lat REAL NOT NULL CHECK (lat BETWEEN -90.0 AND 90.0),
            lon REAL NOT NULL CHECK (lon BETWEEN -180.0 AND 180.0),
            altitude_ft INTEGER,
            is_major_hub INTEGER NOT NULL DEFAULT 0
        )",
    )?;
    run_schema_step(
        &transaction,
        "create routes table",
        "CREATE TABLE IF NOT EXISTS routes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            origin TEXT NOT NULL REFERENCES airports(iata_code) ON DELETE CASCADE,
            destination TEXT NOT NULL REFERENCES airports(iata_code) ON DELETE CASCADE,
            airline TEXT NOT NULL,
            distance_km REAL NOT NULL,
            path TEXT NOT NULL,
            UNIQUE (origin, destination, airline),
            CHECK (origin <> destination)
        )",
    )?;
    run_schema_step(
        &transaction,
        "index routes by origin",
        "CREATE INDEX IF NOT EXISTS idx_routes_origin ON routes(origin, id)",
    )?;
    run_schema_step(
        &transaction,
        "index routes by destination",
        "CREATE INDEX IF NOT EXISTS idx_routes_destination ON routes(destination)",
    )?;
    transaction
        .commit()
        .map_err(sqlite("commit schema transaction"))
}

fn run_schema_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SqliteStoreError> {
    transaction.execute(sql, []).map(|_| ()).map_err(sqlite(step))
}

struct AirportRow {
    id: i64,
    code: String,
    name: String,
    city: String,
    country: String,
    lat: f64,
    lon: f64,
    altitude_ft: Option<i32>,
    is_major_hub: bool,
}

impl AirportRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            city: row.get(3)?,
            country: row.get(4)?,
            lat: row.get(5)?,
            lon: row.get(6)?,
            altitude_ft: row.get(7)?,
            is_major_hub: row.get(8)?,
        })
    }

    fn into_stored(self) -> Result<Stored<Airport>, SqliteStoreError> {
        let code = parse_code(self.code)?;
        let location = GeoPoint::new(self.lat, self.lon).map_err(|source| {
            SqliteStoreError::InvalidCoordinate {
                code: code.clone(),
                source,
            }
        })?;
        let airport = Airport::new(code, self.name, self.city, self.country, location)
            .with_altitude_ft(self.altitude_ft)
            .with_major_hub(self.is_major_hub);
        Ok(Stored::new(unsigned("airports.id", self.id)?, airport))
    }
}

struct RouteRow {
    id: i64,
    origin: String,
    destination: String,
    airline: String,
    distance_km: f64,
    path: String,
}

impl RouteRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            origin: row.get(1)?,
            destination: row.get(2)?,
            airline: row.get(3)?,
            distance_km: row.get(4)?,
            path: row.get(5)?,
        })
    }

    fn into_stored(self) -> Result<Stored<FlightRoute>, SqliteStoreError> {
        let id = unsigned("routes.id", self.id)?;
        let coords: Vec<[f64; 2]> = serde_json::from_str(&self.path)
            .map_err(|source| SqliteStoreError::DecodePath { id, source })?;
        let route = FlightRoute {
            origin: parse_code(self.origin)?,
            destination: parse_code(self.destination)?,
            airline: self.airline,
            distance_km: self.distance_km,
            path: LineString::from(coords),
        };
        Ok(Stored::new(id, route))
    }
}

fn parse_code(value: String) -> Result<IataCode, SqliteStoreError> {
    IataCode::parse(&value).map_err(|source| SqliteStoreError::InvalidCode { value, source })
}

fn encode_path(route: &FlightRoute) -> Result<String, SqliteStoreError> {
    let coords: Vec<[f64; 2]> = route.path.coords().map(|coord| [coord.x, coord.y]).collect();
    serde_json::to_string(&coords).map_err(|source| SqliteStoreError::EncodePath {
        origin: route.origin.clone(),
        destination: route.destination.clone(),
        source,
    })
}

fn load_airports(connection: &Connection) -> Result<Vec<Stored<Airport>>, SqliteStoreError> {
    let mut statement = connection
        .prepare_cached(&format!(
            "SELECT {AIRPORT_COLUMNS} FROM airports ORDER BY iata_code"
        ))
        .map_err(sqlite("prepare airport listing"))?;
    let rows = statement
        .query_map([], AirportRow::read)
        .map_err(sqlite("list airports"))?;
    rows.map(|row| row.map_err(sqlite("read airport row"))?.into_stored())
        .collect()
}

fn find_airport(
    connection: &Connection,
    code: &IataCode,
) -> Result<Option<Stored<Airport>>, SqliteStoreError> {
    connection
        .query_row(
            &format!("SELECT {AIRPORT_COLUMNS} FROM airports WHERE iata_code = ?1"),
            [code.as_str()],
            AirportRow::read,
        )
        .optional()
        .map_err(sqlite("read airport"))?
        .map(AirportRow::into_stored)
        .transpose()
}

fn count(connection: &Connection, table: &'static str) -> Result<u64, SqliteStoreError> {
    let value: i64 = connection
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .map_err(sqlite("count rows"))?;
    unsigned(table, value)
}

impl AirportStore for SqliteStore {
    fn upsert_airports(&self, airports: &[Airport]) -> Result<UpsertSummary, StoreError> {
        let mut guard = self.lock("upsert airports")?;
        let state = &mut *guard;
        let transaction = state
            .connection
            .transaction()
            .map_err(sqlite("begin airport transaction"))?;
        let mut summary = UpsertSummary::default();
        {
            let mut exists = transaction
                .prepare_cached("SELECT 1 FROM airports WHERE iata_code = ?1")
                .map_err(sqlite("prepare airport lookup"))?;
            let mut upsert = transaction
                .prepare_cached(
                    "INSERT INTO airports
                        (iata_code, name, city, country, lat, lon, altitude_ft, is_major_hub)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(iata_code) DO UPDATE SET
                        name = excluded.name,
                        city = excluded.city,
                        country = excluded.country,
                        lat = excluded.lat,
                        lon = excluded.lon",
                )
                .map_err(sqlite("prepare airport upsert"))?;
            for airport in airports {
                let existed = exists
                    .exists([airport.code.as_str()])
                    .map_err(sqlite("look up airport"))?;
                upsert
                    .execute(params![
                        airport.code.as_str(),
                        airport.name,
                        airport.city,
                        airport.country,
                        airport.location.lat(),
                        airport.location.lon(),
                        airport.altitude_ft,
                        airport.is_major_hub,
                    ])
                    .map_err(sqlite("upsert airport"))?;
                if existed {
                    summary.updated += 1;
                } else {
                    summary.inserted += 1;
                }
            }
        }
        transaction
            .commit()
            .map_err(sqlite("commit airport transaction"))?;
        state.index = None;
        Ok(summary)
    }

    fn airport(&self, code: &IataCode) -> Result<Option<Stored<Airport>>, StoreError> {
        let state = self.lock("read airport")?;
        Ok(find_airport(&state.connection, code)?)
    }

    fn airports(&self) -> Result<Vec<Stored<Airport>>, StoreError> {
        let state = self.lock("list airports")?;
        Ok(load_airports(&state.connection)?)
    }

    fn airport_count(&self) -> Result<u64, StoreError> {
        let state = self.lock("count airports")?;
        Ok(count(&state.connection, "airports")?)
    }

    fn update_airport(
        &self,
        code: &IataCode,
        patch: &AirportPatch,
    ) -> Result<Option<Stored<Airport>>, StoreError> {
        let mut guard = self.lock("update airport")?;
        let state = &mut *guard;
        let transaction = state
            .connection
            .transaction()
            .map_err(sqlite("begin airport update"))?;
        let Some(mut stored) = find_airport(&transaction, code)? else {
            return Ok(None);
        };
        patch.apply(&mut stored.record);
        let airport = &stored.record;
        transaction
            .execute(
                "UPDATE airports SET
                    name = ?2, city = ?3, country = ?4, lat = ?5, lon = ?6,
                    altitude_ft = ?7, is_major_hub = ?8
                 WHERE iata_code = ?1",
                params![
                    airport.code.as_str(),
                    airport.name,
                    airport.city,
                    airport.country,
                    airport.location.lat(),
                    airport.location.lon(),
                    airport.altitude_ft,
                    airport.is_major_hub,
                ],
            )
            .map_err(sqlite("update airport"))?;
        transaction
            .commit()
            .map_err(sqlite("commit airport update"))?;
        state.index = None;
        Ok(Some(stored))
    }

    fn delete_airport(&self, code: &IataCode) -> Result<Option<DeleteSummary>, StoreError> {
        let mut guard = self.lock("delete airport")?;
        let state = &mut *guard;
        let transaction = state
            .connection
            .transaction()
            .map_err(sqlite("begin airport delete"))?;
        let routes_removed = transaction
            .execute(
                "DELETE FROM routes WHERE origin = ?1 OR destination = ?1",
                [code.as_str()],
            )
            .map_err(sqlite("delete routes for airport"))?;
        let airports_removed = transaction
            .execute("DELETE FROM airports WHERE iata_code = ?1", [code.as_str()])
            .map_err(sqlite("delete airport"))?;
        if airports_removed == 0 {
            return Ok(None);
        }
        transaction
            .commit()
            .map_err(sqlite("commit airport delete"))?;
        state.index = None;
        Ok(Some(DeleteSummary {
            routes_removed: routes_removed as u64,
        }))
    }

    fn country_counts(&self) -> Result<Vec<CountryCount>, StoreError> {
        let state = self.lock("count countries")?;
        let mut statement = state
            .connection
            .prepare_cached("SELECT country, COUNT(*) FROM airports GROUP BY country")
            .map_err(sqlite("prepare country counts"))?;
        let rows = statement
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(sqlite("count airports per country"))?;
        let mut counts = Vec::new();
        for row in rows {
            let (country, value) = row.map_err(sqlite("read country count"))?;
            counts.push(CountryCount::new(country, unsigned("count", value)?));
        }
        Ok(counts)
    }

    fn spatial_index(&self) -> Result<Arc<AirportIndex>, StoreError> {
        let mut state = self.lock("build spatial index")?;
        let version: i64 = state
            .connection
            .pragma_query_value(None, "data_version", |row| row.get(0))
            .map_err(sqlite("read data version"))?;
        if let Some((built_from, index)) = &state.index {
            if *built_from == version {
                return Ok(Arc::clone(index));
            }
        }
        let index = Arc::new(AirportIndex::build(load_airports(&state.connection)?));
        debug!("built spatial index over {} airports", index.len());
        state.index = Some((version, Arc::clone(&index)));
        Ok(index)
    }
}

impl RouteStore for SqliteStore {
    fn insert_routes(&self, routes: &[FlightRoute]) -> Result<InsertSummary, StoreError> {
        let mut guard = self.lock("insert routes")?;
        let transaction = guard
            .connection
            .transaction()
            .map_err(sqlite("begin route transaction"))?;
        let mut summary = InsertSummary::default();
        {
            let mut exists = transaction
                .prepare_cached("SELECT 1 FROM airports WHERE iata_code = ?1")
                .map_err(sqlite("prepare airport lookup"))?;
            let mut insert = transaction
                .prepare_cached(
                    "INSERT INTO routes (origin, destination, airline, distance_km, path)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(origin, destination, airline) DO NOTHING",
                )
                .map_err(sqlite("prepare route insert"))?;
            for route in routes {
                let origin_exists = exists
                    .exists([route.origin.as_str()])
                    .map_err(sqlite("look up route origin"))?;
                let destination_exists = exists
                    .exists([route.destination.as_str()])
                    .map_err(sqlite("look up route destination"))?;
                if !origin_exists || !destination_exists {
                    summary.orphaned += 1;
                    continue;
                }
                let path = encode_path(route)?;
                let written = insert
                    .execute(params![
                        route.origin.as_str(),
                        route.destination.as_str(),
                        route.airline,
                        route.distance_km,
                        path,
                    ])
                    .map_err(sqlite("insert route"))?;
                if written == 0 {
                    summary.conflicts += 1;
                } else {
                    summary.inserted += 1;
                }
            }
        }
        transaction
            .commit()
            .map_err(sqlite("commit route transaction"))?;
        Ok(summary)
    }

    fn route(&self, id: u64) -> Result<Option<Stored<FlightRoute>>, StoreError> {
        let Ok(id) = i64::try_from(id) else {
            return Ok(None);
        };
        let state = self.lock("read route")?;
        let row = state
            .connection
            .query_row(
                &format!("SELECT {ROUTE_COLUMNS} FROM routes WHERE id = ?1"),
                [id],
                RouteRow::read,
            )
            .optional()
            .map_err(sqlite("read route"))?;
        Ok(row.map(RouteRow::into_stored).transpose()?)
    }

    fn routes_from(
        &self,
        origin: &IataCode,
        limit: usize,
    ) -> Result<Vec<Stored<FlightRoute>>, StoreError> {
        let state = self.lock("list routes")?;
        let mut statement = state
            .connection
            .prepare_cached(&format!(
                "SELECT {ROUTE_COLUMNS} FROM routes WHERE origin = ?1 ORDER BY id LIMIT ?2"
            ))
            .map_err(sqlite("prepare route listing"))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = statement
            .query_map(params![origin.as_str(), limit], RouteRow::read)
            .map_err(sqlite("list routes"))?;
        let mut routes = Vec::new();
        for row in rows {
            routes.push(row.map_err(sqlite("read route row"))?.into_stored()?);
        }
        Ok(routes)
    }

    fn route_count(&self) -> Result<u64, StoreError> {
        let state = self.lock("count routes")?;
        Ok(count(&state.connection, "routes")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use tempfile::TempDir;

    fn code(raw: &str) -> IataCode {
        IataCode::parse(raw).expect("valid code")
    }

    fn airport(raw: &str, country: &str, lat: f64, lon: f64) -> Airport {
        Airport::new(
            code(raw),
            format!("{raw} International"),
            raw,
            country,
            GeoPoint::new(lat, lon).expect("valid point"),
        )
    }

    fn sample_airports() -> Vec<Airport> {
        vec![
            airport("DUB", "Ireland", 53.4213, -6.27).with_altitude_ft(Some(242)),
            airport("LHR", "United Kingdom", 51.47, -0.4543),
            airport("CDG", "France", 49.0097, 2.5479),
        ]
    }

    fn route(from: &Airport, to: &Airport, airline: &str) -> FlightRoute {
        FlightRoute::between(airline, &from.waypoint(), &to.waypoint()).expect("valid route")
    }

    #[fixture]
    fn temp_database() -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("skyatlas.db");
        (dir, path)
    }

    #[fixture]
    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().expect("open in-memory store");
        store
            .upsert_airports(&sample_airports())
            .expect("seed airports");
        store
    }

    #[rstest]
    fn upsert_counts_inserts_and_updates(store: SqliteStore) {
        let moved = airport("DUB", "Ireland", 53.0, -6.0);
        let summary = store
            .upsert_airports(&[moved, airport("AMS", "Netherlands", 52.3086, 4.7639)])
            .expect("upsert");
        assert_eq!(summary, UpsertSummary { inserted: 1, updated: 1 });
        assert_eq!(store.airport_count().expect("count"), 4);

        let dublin = store.airport(&code("DUB")).expect("read").expect("stored");
        assert_eq!(dublin.id, 1);
        assert!((dublin.record.location.lat() - 53.0).abs() < f64::EPSILON);
        assert_eq!(dublin.record.altitude_ft, Some(242));
    }

    #[rstest]
    fn airports_are_listed_by_code(store: SqliteStore) {
        let codes: Vec<String> = store
            .airports()
            .expect("list")
            .into_iter()
            .map(|stored| stored.record.code.to_string())
            .collect();
        assert_eq!(codes, vec!["CDG", "DUB", "LHR"]);
    }

    #[rstest]
    fn routes_round_trip_with_paths(store: SqliteStore) {
        let airports = sample_airports();
        let dub_lhr = route(&airports[0], &airports[1], "EI");
        let summary = store
            .insert_routes(&[dub_lhr.clone(), dub_lhr.clone()])
            .expect("insert");
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.conflicts, 1);

        let stored = store.route(1).expect("read").expect("stored");
        assert_eq!(stored.record, dub_lhr);
        assert!(store.route(2).expect("read").is_none());
        assert!(store.route(u64::MAX).expect("read").is_none());
    }

    #[rstest]
    fn routes_with_missing_endpoints_are_orphaned(store: SqliteStore) {
        let airports = sample_airports();
        let ghost = airport("ZZZ", "Nowhere", 10.0, 10.0);
        let summary = store
            .insert_routes(&[
                route(&airports[0], &ghost, "EI"),
                route(&airports[0], &airports[2], "AF"),
            ])
            .expect("insert");
        assert_eq!(summary.orphaned, 1);
        assert_eq!(summary.inserted, 1);
    }

    #[rstest]
    fn routes_from_orders_by_insertion_and_limits(store: SqliteStore) {
        let airports = sample_airports();
        store
            .insert_routes(&[
                route(&airports[0], &airports[1], "EI"),
                route(&airports[1], &airports[2], "BA"),
                route(&airports[0], &airports[2], "AF"),
                route(&airports[0], &airports[1], "FR"),
            ])
            .expect("insert");
        let ids: Vec<u64> = store
            .routes_from(&code("DUB"), 10)
            .expect("list")
            .into_iter()
            .map(|stored| stored.id)
            .collect();
        assert_eq!(ids, vec![1, 3, 4]);
        assert_eq!(store.routes_from(&code("DUB"), 1).expect("list").len(), 1);
        assert!(store.routes_from(&code("CDG"), 10).expect("list").is_empty());
    }

    #[rstest]
    fn delete_cascades_to_routes(store: SqliteStore) {
        let airports = sample_airports();
        store
            .insert_routes(&[
                route(&airports[0], &airports[1], "EI"),
                route(&airports[2], &airports[0], "AF"),
                route(&airports[1], &airports[2], "BA"),
            ])
            .expect("insert");
        let summary = store
            .delete_airport(&code("DUB"))
            .expect("delete")
            .expect("airport existed");
        assert_eq!(summary.routes_removed, 2);
        assert_eq!(store.route_count().expect("count"), 1);
        assert!(store.delete_airport(&code("DUB")).expect("delete").is_none());
    }

    #[rstest]
    fn update_preserves_hub_across_upserts(store: SqliteStore) {
        let patch = AirportPatch {
            is_major_hub: Some(true),
            name: Some(String::from("Heathrow")),
            ..AirportPatch::default()
        };
        let updated = store
            .update_airport(&code("LHR"), &patch)
            .expect("update")
            .expect("airport exists");
        assert!(updated.record.is_major_hub);

        store
            .upsert_airports(&[airport("LHR", "United Kingdom", 51.47, -0.4543)])
            .expect("upsert");
        let reloaded = store.airport(&code("LHR")).expect("read").expect("stored");
        assert!(reloaded.record.is_major_hub);
        assert_eq!(reloaded.record.name, "LHR International");
        assert!(
            store
                .update_airport(&code("XXX"), &patch)
                .expect("update")
                .is_none()
        );
    }

    #[rstest]
    fn country_counts_group_airports(store: SqliteStore) {
        store
            .upsert_airports(&[airport("ORK", "Ireland", 51.8413, -8.4911)])
            .expect("upsert");
        let mut counts = store.country_counts().expect("counts");
        counts.sort_by(|a, b| a.country.cmp(&b.country));
        assert_eq!(
            counts,
            vec![
                CountryCount::new("France", 1),
                CountryCount::new("Ireland", 2),
                CountryCount::new("United Kingdom", 1),
            ]
        );
    }

    #[rstest]
    fn spatial_index_is_rebuilt_after_writes(store: SqliteStore) {
        let first = store.spatial_index().expect("index");
        assert_eq!(first.len(), 3);
        assert!(Arc::ptr_eq(&first, &store.spatial_index().expect("index")));

        store
            .upsert_airports(&[airport("AMS", "Netherlands", 52.3086, 4.7639)])
            .expect("upsert");
        assert_eq!(store.spatial_index().expect("index").len(), 4);
    }

    #[rstest]
    fn read_only_store_sees_committed_data(temp_database: (TempDir, PathBuf)) {
        let (_dir, path) = temp_database;
        let writer = SqliteStore::open(&path).expect("open writer");
        writer
            .upsert_airports(&sample_airports()[..1])
            .expect("seed airport");

        let reader = SqliteStore::open_read_only(&path).expect("open reader");
        assert_eq!(reader.spatial_index().expect("index").len(), 1);

        writer
            .upsert_airports(&sample_airports()[1..])
            .expect("load more airports");
        assert_eq!(reader.airport_count().expect("count"), 3);
        assert_eq!(reader.spatial_index().expect("index").len(), 3);

        let error = reader
            .upsert_airports(&sample_airports())
            .expect_err("read-only store rejects writes");
        assert!(matches!(
            error,
            StoreError::Sqlite(SqliteStoreError::Sqlite { .. })
        ));
    }

    #[rstest]
    fn readers_observe_whole_batches_during_a_load(temp_database: (TempDir, PathBuf)) {
        const BATCH: usize = 1000;
        const READERS: usize = 3;
        let (_dir, path) = temp_database;
        let writer = SqliteStore::open(&path).expect("open writer");
        let airports = sample_airports();
        writer.upsert_airports(&airports).expect("seed airports");
        let routes: Vec<FlightRoute> = (0..BATCH * 2 + 500)
            .map(|n| route(&airports[0], &airports[1 + n % 2], &format!("X{n:04}")))
            .collect();
        let total = routes.len();
        let dublin = &code("DUB");
        let done = &AtomicBool::new(false);
        let path = &path;

        thread::scope(|scope| {
            let readers: Vec<_> = (0..READERS)
                .map(|_| {
                    scope.spawn(move || {
                        let reader = SqliteStore::open_read_only(path).expect("open reader");
                        let mut observed = 0_usize;
                        loop {
                            let finished = done.load(Ordering::Acquire);
                            let count = usize::try_from(reader.route_count().expect("count"))
                                .expect("count fits");
                            assert!(
                                count % BATCH == 0 || count == total,
                                "saw {count} routes mid-batch"
                            );
                            let nearest = reader
                                .spatial_index()
                                .expect("index")
                                .nearest(&GeoPoint::new(53.3, -6.2).expect("valid point"))
                                .expect("airports stored");
                            assert_eq!(&nearest.airport.record.code, dublin);
                            let listed = reader.routes_from(dublin, total).expect("routes");
                            assert!(listed.len() % BATCH == 0 || listed.len() == total);
                            for stored in &listed {
                                assert_eq!(&stored.record.origin, dublin);
                                assert!(stored.record.airline.starts_with('X'));
                                assert_eq!(stored.record.path.0.len(), 2);
                                assert!(stored.record.distance_km > 0.0);
                            }
                            observed += 1;
                            if finished {
                                assert_eq!(count, total);
                                return observed;
                            }
                        }
                    })
                })
                .collect();

            for chunk in routes.chunks(BATCH) {
                let summary = writer.insert_routes(chunk).expect("insert batch");
                assert_eq!(summary.inserted, chunk.len() as u64);
            }
            done.store(true, Ordering::Release);

            for reader in readers {
                assert!(reader.join().expect("reader thread") > 0);
            }
        });
    }

    #[rstest]
    fn reopening_keeps_data(temp_database: (TempDir, PathBuf)) {
        let (_dir, path) = temp_database;
        {
            let store = SqliteStore::open(&path).expect("open store");
            store
                .upsert_airports(&sample_airports())
                .expect("seed airports");
        }
        let store = SqliteStore::open(&path).expect("reopen store");
        assert_eq!(store.airport_count().expect("count"), 3);
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[rstest]
    fn open_reports_missing_directories(temp_database: (TempDir, PathBuf)) {
        let (dir, _path) = temp_database;
        let missing = dir.path().join("absent").join("skyatlas.db");
        let error = SqliteStore::open_read_only(&missing).expect_err("missing file");
        assert!(matches!(error, SqliteStoreError::Open { .. }));
    }
}
