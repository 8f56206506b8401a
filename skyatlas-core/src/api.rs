//! Transport-neutral request dispatch.
//!
//! [`dispatch`] maps an [`Endpoint`] and its [`QueryParams`] onto the query
//! engine and store, returning a status and a JSON body. Any transport (the
//! CLI, an HTTP adapter) can forward requests through it unchanged.

use std::{fmt, str::FromStr};

use log::error;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::airport::{AirportError, AirportPatch, NewAirport};
use crate::distance::{CoordinateError, GeoPoint};
use crate::geojson::{FeatureCollection, airport_feature, airport_match_feature, route_feature};
use crate::query::{
    DEFAULT_RADIUS_KM, DEFAULT_ROUTE_LIMIT, DEFAULT_TOP_COUNTRIES, QueryEngine, QueryError,
    QueryParams,
};
use crate::store::{AirportStore, RouteStore};

/// Operations exposed through [`dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Every airport as a feature collection.
    ListAirports,
    /// One airport by `code`.
    Airport,
    /// Create or overwrite an airport.
    CreateAirport,
    /// Partially update an airport.
    UpdateAirport,
    /// Delete an airport and the routes referencing it.
    DeleteAirport,
    /// Routes departing `origin`.
    Routes,
    /// One route by `id`.
    Route,
    /// Airports within `radius` km of `lat`/`lon`.
    Nearby,
    /// The airport closest to `lat`/`lon`.
    Nearest,
    /// Countries ranked by airport count.
    Hubs,
}

impl Endpoint {
    /// Every endpoint, in display order.
    pub const ALL: [Self; 10] = [
        Self::ListAirports,
        Self::Airport,
        Self::CreateAirport,
        Self::UpdateAirport,
        Self::DeleteAirport,
        Self::Routes,
        Self::Route,
        Self::Nearby,
        Self::Nearest,
        Self::Hubs,
    ];

    /// The endpoint's name as accepted by [`Endpoint::from_str`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ListAirports => "airports",
            Self::Airport => "airport",
            Self::CreateAirport => "create-airport",
            Self::UpdateAirport => "update-airport",
            Self::DeleteAirport => "delete-airport",
            Self::Routes => "routes",
            Self::Route => "route",
            Self::Nearby => "nearby",
            Self::Nearest => "nearest",
            Self::Hubs => "hubs",
        }
    }

    /// Return `true` for endpoints that write to the store.
    #[must_use]
    pub const fn mutates(self) -> bool {
        matches!(
            self,
            Self::CreateAirport | Self::UpdateAirport | Self::DeleteAirport
        )
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown endpoint name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown endpoint {0:?}")]
pub struct UnknownEndpoint(pub String);

impl FromStr for Endpoint {
    type Err = UnknownEndpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|endpoint| endpoint.name() == wanted)
            .ok_or_else(|| UnknownEndpoint(s.to_owned()))
    }
}

/// Outcome class of a dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Ok,
    Created,
    BadRequest,
    NotFound,
    InternalError,
}

impl ResponseStatus {
    /// The equivalent HTTP status code.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Created => 201,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::InternalError => 500,
        }
    }

    /// Return `true` for `Ok` and `Created`.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::Created)
    }
}

/// A status paired with a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: ResponseStatus,
    pub body: Value,
}

impl ApiResponse {
    fn json<T: Serialize>(status: ResponseStatus, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status, body },
            Err(source) => {
                error!("failed to serialise response body: {source}");
                Self::error(ResponseStatus::InternalError, "failed to serialise response")
            }
        }
    }

    fn error(status: ResponseStatus, message: impl fmt::Display) -> Self {
        Self {
            status,
            body: json!({ "error": message.to_string() }),
        }
    }
}

impl From<QueryError> for ApiResponse {
    fn from(error: QueryError) -> Self {
        let status = match &error {
            QueryError::InvalidParameter { .. } => ResponseStatus::BadRequest,
            QueryError::AirportNotFound { .. } | QueryError::RouteNotFound { .. } => {
                ResponseStatus::NotFound
            }
            QueryError::Store(source) => {
                error!("store failure while serving request: {source}");
                ResponseStatus::InternalError
            }
        };
        Self::error(status, error)
    }
}

/// Serve one request against `store`.
///
/// # Examples
/// ```
/// use skyatlas_core::api::{Endpoint, ResponseStatus, dispatch};
/// use skyatlas_core::query::QueryParams;
/// use skyatlas_core::MemoryStore;
///
/// let store = MemoryStore::default();
/// let missing = dispatch(&store, Endpoint::Routes, &QueryParams::new());
/// assert_eq!(missing.status, ResponseStatus::BadRequest);
///
/// let unknown = dispatch(&store, Endpoint::Routes, &QueryParams::new().with("origin", "ZZZ"));
/// assert_eq!(unknown.status.http_status(), 404);
/// ```
pub fn dispatch<S>(store: &S, endpoint: Endpoint, params: &QueryParams) -> ApiResponse
where
    S: AirportStore + RouteStore + ?Sized,
{
    let engine = QueryEngine::new(store);
    let outcome = match endpoint {
        Endpoint::ListAirports => list_airports(engine),
        Endpoint::Airport => airport(engine, params),
        Endpoint::CreateAirport => create_airport(engine, params),
        Endpoint::UpdateAirport => update_airport(engine, params),
        Endpoint::DeleteAirport => delete_airport(engine, params),
        Endpoint::Routes => routes(engine, params),
        Endpoint::Route => route(engine, params),
        Endpoint::Nearby => nearby(engine, params),
        Endpoint::Nearest => nearest(engine, params),
        Endpoint::Hubs => hubs(engine, params),
    };
    outcome.unwrap_or_else(ApiResponse::from)
}

type Outcome = Result<ApiResponse, QueryError>;

fn ok<T: Serialize>(body: &T) -> Outcome {
    Ok(ApiResponse::json(ResponseStatus::Ok, body))
}

fn list_airports<S: AirportStore + ?Sized>(engine: QueryEngine<'_, S>) -> Outcome {
    let collection: FeatureCollection<_> = engine.airports()?.iter().map(airport_feature).collect();
    ok(&collection)
}

fn airport<S: AirportStore + ?Sized>(engine: QueryEngine<'_, S>, params: &QueryParams) -> Outcome {
    let stored = engine.airport(params.required("code")?)?;
    ok(&airport_feature(&stored))
}

fn create_airport<S: AirportStore + ?Sized>(
    engine: QueryEngine<'_, S>,
    params: &QueryParams,
) -> Outcome {
    let draft = NewAirport {
        code: params.required("code")?.to_owned(),
        name: params.get("name").unwrap_or_default().to_owned(),
        city: params.get("city").unwrap_or_default().to_owned(),
        country: params.get("country").unwrap_or_default().to_owned(),
        lat: params.required_f64("lat")?,
        lon: params.required_f64("lon")?,
        altitude_ft: params.optional_i32("altitude_ft")?,
        is_major_hub: params.optional_bool("is_major_hub")?.unwrap_or(false),
    };
    let airport = draft.validate().map_err(invalid_airport)?;
    let code = airport.code.clone();
    let summary = engine.store().upsert_airports(&[airport])?;
    if summary.inserted > 0 {
        let stored = engine.airport(code.as_str())?;
        return Ok(ApiResponse::json(
            ResponseStatus::Created,
            &airport_feature(&stored),
        ));
    }
    // The upsert keeps altitude and the hub flag, so apply the ones given.
    let patch = AirportPatch {
        altitude_ft: altitude_param(params)?,
        is_major_hub: params.optional_bool("is_major_hub")?,
        ..AirportPatch::default()
    };
    let stored = if patch.is_empty() {
        engine.airport(code.as_str())?
    } else {
        engine
            .store()
            .update_airport(&code, &patch)?
            .ok_or_else(|| QueryError::AirportNotFound {
                code: code.to_string(),
            })?
    };
    ok(&airport_feature(&stored))
}

/// `altitude_ft` as a patch value: absent leaves it alone, `null` clears it.
fn altitude_param(params: &QueryParams) -> Result<Option<Option<i32>>, QueryError> {
    match params.get("altitude_ft") {
        None => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("null") => Ok(Some(None)),
        Some(_) => Ok(Some(params.optional_i32("altitude_ft")?)),
    }
}

fn invalid_airport(error: AirportError) -> QueryError {
    let name = match &error {
        AirportError::Code(_) => "code",
        AirportError::Coordinate(CoordinateError::Latitude(_)) => "lat",
        AirportError::Coordinate(CoordinateError::Longitude(_)) => "lon",
    };
    QueryError::invalid(name, error.to_string())
}

fn update_airport<S: AirportStore + ?Sized>(
    engine: QueryEngine<'_, S>,
    params: &QueryParams,
) -> Outcome {
    let existing = engine.airport(params.required("code")?)?;
    let location = match (params.optional_f64("lat")?, params.optional_f64("lon")?) {
        (None, None) => None,
        (lat, lon) => {
            let lat = lat.unwrap_or_else(|| existing.record.location.lat());
            let lon = lon.unwrap_or_else(|| existing.record.location.lon());
            Some(GeoPoint::new(lat, lon).map_err(|error| invalid_airport(error.into()))?)
        }
    };
    let patch = AirportPatch {
        name: params.text("name").map(str::to_owned),
        city: params.text("city").map(str::to_owned),
        country: params.text("country").map(str::to_owned),
        location,
        altitude_ft: altitude_param(params)?,
        is_major_hub: params.optional_bool("is_major_hub")?,
    };
    if patch.is_empty() {
        return Err(QueryError::invalid("code", "no fields to update"));
    }
    let code = existing.record.code;
    let updated = engine
        .store()
        .update_airport(&code, &patch)?
        .ok_or_else(|| QueryError::AirportNotFound {
            code: code.to_string(),
        })?;
    ok(&airport_feature(&updated))
}

fn delete_airport<S: AirportStore + ?Sized>(
    engine: QueryEngine<'_, S>,
    params: &QueryParams,
) -> Outcome {
    let code = engine.airport(params.required("code")?)?.record.code;
    let summary = engine
        .store()
        .delete_airport(&code)?
        .ok_or_else(|| QueryError::AirportNotFound {
            code: code.to_string(),
        })?;
    ok(&json!({
        "deleted": code.as_str(),
        "routes_removed": summary.routes_removed,
    }))
}

fn routes<S: AirportStore + RouteStore + ?Sized>(
    engine: QueryEngine<'_, S>,
    params: &QueryParams,
) -> Outcome {
    let origin = params.required("origin")?;
    let limit = params.usize_or("limit", DEFAULT_ROUTE_LIMIT)?;
    let collection: FeatureCollection<_> = engine
        .routes_from_origin(origin, Some(limit))?
        .iter()
        .map(route_feature)
        .collect();
    ok(&collection)
}

fn route<S: AirportStore + RouteStore + ?Sized>(
    engine: QueryEngine<'_, S>,
    params: &QueryParams,
) -> Outcome {
    let stored = engine.route(params.required_u64("id")?)?;
    ok(&route_feature(&stored))
}

fn nearby<S: AirportStore + ?Sized>(engine: QueryEngine<'_, S>, params: &QueryParams) -> Outcome {
    let lat = params.required_f64("lat")?;
    let lon = params.required_f64("lon")?;
    let radius = params.f64_or("radius", DEFAULT_RADIUS_KM)?;
    let collection: FeatureCollection<_> = engine
        .airports_within_radius(lat, lon, radius)?
        .iter()
        .map(airport_match_feature)
        .collect();
    ok(&collection)
}

fn nearest<S: AirportStore + ?Sized>(engine: QueryEngine<'_, S>, params: &QueryParams) -> Outcome {
    let lat = params.required_f64("lat")?;
    let lon = params.required_f64("lon")?;
    let collection: FeatureCollection<_> = engine
        .nearest_airport(lat, lon)?
        .iter()
        .map(airport_match_feature)
        .collect();
    ok(&collection)
}

fn hubs<S: AirportStore + ?Sized>(engine: QueryEngine<'_, S>, params: &QueryParams) -> Outcome {
    let top = params.usize_or("top", DEFAULT_TOP_COUNTRIES)?;
    ok(&engine.top_countries_by_airport_count(top)?)
}
