//! Flight routes linking two airports by code.

use geo::LineString;
use thiserror::Error;

use crate::airport::IataCode;
use crate::distance::GeoPoint;

/// One end of a route: an airport code and the position it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub code: IataCode,
    pub location: GeoPoint,
}

impl Waypoint {
    /// Pair a code with its position.
    #[must_use]
    pub const fn new(code: IataCode, location: GeoPoint) -> Self {
        Self { code, location }
    }
}

/// Errors returned by [`FlightRoute::between`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteError {
    /// Origin and destination were the same airport.
    #[error("route origin and destination are both {0}")]
    SameEndpoints(IataCode),
}

/// Natural key used to deduplicate routes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    pub origin: IataCode,
    pub destination: IataCode,
    pub airline: String,
}

/// A directed route between two airports operated by an airline.
///
/// Endpoints are held by code only; the route does not own the airports it
/// references. Distance and path are derived from the endpoint positions when
/// the route is built.
///
/// # Examples
/// ```
/// use skyatlas_core::{FlightRoute, GeoPoint, IataCode, Waypoint};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dub = Waypoint::new(IataCode::parse("DUB")?, GeoPoint::new(53.4213, -6.27)?);
/// let lhr = Waypoint::new(IataCode::parse("LHR")?, GeoPoint::new(51.47, -0.4543)?);
/// let route = FlightRoute::between("EI", &dub, &lhr)?;
/// assert!(route.distance_km > 440.0);
/// assert_eq!(route.path.0.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FlightRoute {
    pub origin: IataCode,
    pub destination: IataCode,
    pub airline: String,
    /// Great-circle distance between the endpoints in kilometres.
    pub distance_km: f64,
    /// Straight line from origin to destination (`x = longitude`).
    pub path: LineString<f64>,
}

impl FlightRoute {
    /// Build a route, computing its distance and path from the endpoints.
    pub fn between(
        airline: impl Into<String>,
        origin: &Waypoint,
        destination: &Waypoint,
    ) -> Result<Self, RouteError> {
        if origin.code == destination.code {
            return Err(RouteError::SameEndpoints(origin.code.clone()));
        }
        Ok(Self {
            origin: origin.code.clone(),
            destination: destination.code.clone(),
            airline: airline.into(),
            distance_km: origin.location.distance_km(&destination.location),
            path: LineString::from(vec![
                origin.location.to_coord(),
                destination.location.to_coord(),
            ]),
        })
    }

    /// The key used to detect duplicate routes.
    #[must_use]
    pub fn key(&self) -> RouteKey {
        RouteKey {
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            airline: self.airline.clone(),
        }
    }

    /// Return `true` when either endpoint is `code`.
    #[must_use]
    pub fn touches(&self, code: &IataCode) -> bool {
        self.origin == *code || self.destination == *code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn waypoint(code: &str, lat: f64, lon: f64) -> Waypoint {
        Waypoint::new(
            IataCode::parse(code).expect("valid code"),
            GeoPoint::new(lat, lon).expect("valid point"),
        )
    }

    #[rstest]
    fn rejects_identical_endpoints() {
        let dub = waypoint("DUB", 53.4213, -6.27);
        let result = FlightRoute::between("EI", &dub, &dub);
        assert!(matches!(result, Err(RouteError::SameEndpoints(_))));
    }

    #[rstest]
    fn path_runs_from_origin_to_destination() {
        let dub = waypoint("DUB", 53.4213, -6.27);
        let cdg = waypoint("CDG", 49.0097, 2.5479);
        let route = FlightRoute::between("AF", &dub, &cdg).expect("valid route");

        let coords: Vec<_> = route.path.coords().copied().collect();
        assert_eq!(coords, vec![dub.location.to_coord(), cdg.location.to_coord()]);
        assert!((route.distance_km - dub.location.distance_km(&cdg.location)).abs() < 1.0e-9);
    }

    #[rstest]
    fn key_distinguishes_airlines() {
        let dub = waypoint("DUB", 53.4213, -6.27);
        let lhr = waypoint("LHR", 51.47, -0.4543);
        let aer_lingus = FlightRoute::between("EI", &dub, &lhr).expect("valid route");
        let ryanair = FlightRoute::between("FR", &dub, &lhr).expect("valid route");
        assert_ne!(aer_lingus.key(), ryanair.key());
        assert!(aer_lingus.touches(&lhr.code));
    }
}
