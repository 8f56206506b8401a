//! GeoJSON rendering of airports and routes.
//!
//! Positions are emitted in GeoJSON axis order, `[longitude, latitude]`.

use geo::LineString;
use serde::Serialize;

use crate::airport::Airport;
use crate::distance::{GeoPoint, round_km};
use crate::route::FlightRoute;
use crate::store::{AirportMatch, Stored};

/// A GeoJSON geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
    LineString { coordinates: Vec<[f64; 2]> },
}

impl Geometry {
    /// A point geometry.
    #[must_use]
    pub fn point(location: &GeoPoint) -> Self {
        Self::Point {
            coordinates: [location.lon(), location.lat()],
        }
    }

    /// A line geometry through every vertex of `path`.
    #[must_use]
    pub fn line(path: &LineString<f64>) -> Self {
        Self::LineString {
            coordinates: path.coords().map(|coord| [coord.x, coord.y]).collect(),
        }
    }
}

/// A single GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature<P> {
    pub geometry: Geometry,
    pub properties: P,
}

/// A GeoJSON feature collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection<P> {
    pub features: Vec<Feature<P>>,
}

impl<P> FromIterator<Feature<P>> for FeatureCollection<P> {
    fn from_iter<I: IntoIterator<Item = Feature<P>>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

/// Properties of an airport feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirportProperties {
    pub id: u64,
    pub name: String,
    pub iata_code: String,
    pub city: String,
    pub country: String,
    pub altitude_ft: Option<i32>,
    pub is_major_hub: bool,
    /// Distance from the query point, present on proximity results only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// Properties of a route feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteProperties {
    pub id: u64,
    pub origin: String,
    pub destination: String,
    pub airline: String,
    pub distance_km: f64,
}

/// Render a stored airport.
///
/// # Examples
/// ```
/// use skyatlas_core::geojson::airport_feature;
/// use skyatlas_core::{Airport, GeoPoint, IataCode, Stored};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let airport = Airport::new(IataCode::parse("DUB")?, "Dublin Airport", "Dublin", "Ireland", GeoPoint::new(53.4213, -6.27)?);
/// let json = serde_json::to_value(airport_feature(&Stored::new(7, airport)))?;
/// assert_eq!(json["type"], "Feature");
/// assert_eq!(json["geometry"]["coordinates"][0], -6.27);
/// assert_eq!(json["properties"]["iata_code"], "DUB");
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn airport_feature(stored: &Stored<Airport>) -> Feature<AirportProperties> {
    let airport = &stored.record;
    Feature {
        geometry: Geometry::point(&airport.location),
        properties: AirportProperties {
            id: stored.id,
            name: airport.name.clone(),
            iata_code: airport.code.to_string(),
            city: airport.city.clone(),
            country: airport.country.clone(),
            altitude_ft: airport.altitude_ft,
            is_major_hub: airport.is_major_hub,
            distance_km: None,
        },
    }
}

/// Render a proximity result, carrying its distance in the properties.
#[must_use]
pub fn airport_match_feature(found: &AirportMatch) -> Feature<AirportProperties> {
    let mut feature = airport_feature(&found.airport);
    feature.properties.distance_km = Some(round_km(found.distance_km));
    feature
}

/// Render a stored route.
#[must_use]
pub fn route_feature(stored: &Stored<FlightRoute>) -> Feature<RouteProperties> {
    let route = &stored.record;
    Feature {
        geometry: Geometry::line(&route.path),
        properties: RouteProperties {
            id: stored.id,
            origin: route.origin.to_string(),
            destination: route.destination.to_string(),
            airline: route.airline.clone(),
            distance_km: round_km(route.distance_km),
        },
    }
}
