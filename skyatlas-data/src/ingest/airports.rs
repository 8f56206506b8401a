//! Airport rows from an OpenFlights `airports.dat` export.

use std::io;

use camino::Utf8Path;
use skyatlas_core::{Airport, AirportStore, GeoPoint, IataCode, StoreError};

use super::pipeline::{self, BatchLoader, Flushed};
use super::{BATCH_SIZE, IngestError, IngestReport, RowRejection, open_source};
use crate::records::Record;

const NAME: usize = 1;
const CITY: usize = 2;
const COUNTRY: usize = 3;
const IATA: usize = 4;
const LATITUDE: usize = 6;
const LONGITUDE: usize = 7;
const ALTITUDE: usize = 8;
const MIN_FIELDS: usize = 8;

const EXCLUDED_NAME_FRAGMENTS: [&str; 2] = ["heli", "seaplane"];
const EXCLUDED_COUNTRIES: [&str; 2] = ["antarctica", "unknown"];

/// Validate one airport row.
///
/// Rows need at least eight fields, a three-character IATA code and an
/// in-range position. Heliports, seaplane bases and airports in Antarctica or
/// an unknown country are rejected. A malformed altitude is dropped rather
/// than rejecting the row.
///
/// # Examples
/// ```
/// use skyatlas_data::{Record, parse_airport};
///
/// let row = Record::new(1, [
///     "1", "Goroka Airport", "Goroka", "Papua New Guinea", "GKA", "AYGA",
///     "-6.081689834590001", "145.391998291", "5282",
/// ]);
/// let airport = parse_airport(&row).expect("valid row");
/// assert_eq!(airport.code.as_str(), "GKA");
/// assert_eq!(airport.altitude_ft, Some(5282));
/// ```
pub fn parse_airport(record: &Record) -> Result<Airport, RowRejection> {
    if record.len() < MIN_FIELDS {
        return Err(RowRejection::TooFewFields {
            found: record.len(),
            expected: MIN_FIELDS,
        });
    }
    let code = IataCode::parse(record.field(IATA)).map_err(|source| RowRejection::InvalidCode {
        field: "IATA",
        source,
    })?;
    let location = GeoPoint::new(
        coordinate(record, LATITUDE, "latitude")?,
        coordinate(record, LONGITUDE, "longitude")?,
    )?;

    let name = clean(record.field(NAME));
    let lowered = name.to_lowercase();
    if EXCLUDED_NAME_FRAGMENTS
        .iter()
        .any(|fragment| lowered.contains(fragment))
    {
        return Err(RowRejection::ExcludedFacility {
            name: name.to_owned(),
        });
    }
    let country = clean(record.field(COUNTRY));
    if EXCLUDED_COUNTRIES.contains(&country.to_lowercase().as_str()) {
        return Err(RowRejection::ExcludedCountry {
            country: country.to_owned(),
        });
    }

    let altitude_ft = record.field(ALTITUDE).trim().parse().ok();
    Ok(
        Airport::new(code, name, clean(record.field(CITY)), country, location)
            .with_altitude_ft(altitude_ft),
    )
}

fn clean(field: &str) -> &str {
    field.trim_matches(|ch: char| ch == '"' || ch.is_whitespace())
}

fn coordinate(record: &Record, index: usize, field: &'static str) -> Result<f64, RowRejection> {
    let raw = record.field(index).trim();
    raw.parse().map_err(|_| RowRejection::MalformedNumber {
        field,
        value: raw.to_owned(),
    })
}

struct AirportLoader<'s, S: ?Sized> {
    store: &'s S,
}

impl<S: AirportStore + ?Sized> BatchLoader for AirportLoader<'_, S> {
    type Item = Airport;

    const SUBJECT: &'static str = "airports";

    fn parse(&self, record: &Record) -> Result<Airport, RowRejection> {
        parse_airport(record)
    }

    fn flush(&self, batch: &[Airport]) -> Result<Flushed, StoreError> {
        let summary = self.store.upsert_airports(batch)?;
        Ok(Flushed {
            imported: summary.written(),
            ..Flushed::default()
        })
    }

    fn total(&self) -> Result<u64, StoreError> {
        self.store.airport_count()
    }
}

/// Upsert every valid airport row read from `source`.
///
/// Rows are keyed by IATA code: a code already in the store is updated in
/// place and keeps its hub flag.
pub fn ingest_airports<R, S>(source: R, store: &S) -> Result<IngestReport, IngestError>
where
    R: io::Read,
    S: AirportStore + ?Sized,
{
    pipeline::run(source, &AirportLoader { store }, BATCH_SIZE)
}

/// Load an `airports.dat` file into `store`.
///
/// A missing file is reported before any row is read.
pub fn load_airports<S>(path: &Utf8Path, store: &S) -> Result<IngestReport, IngestError>
where
    S: AirportStore + ?Sized,
{
    ingest_airports(open_source(path)?, store)
}
