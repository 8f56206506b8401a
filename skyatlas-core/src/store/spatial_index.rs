//! R\*-tree over airport positions with great-circle refinement.
//!
//! The tree is keyed in lon/lat degrees. Radius searches first collect the
//! airports inside a bounding box that is guaranteed to contain the search
//! circle, then filter them by exact haversine distance.

use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::airport::{Airport, IataCode};
use crate::distance::{EARTH_MEAN_RADIUS_KM, GeoPoint};

use super::Stored;

/// Slack added to every bounding box, in degrees.
const ENVELOPE_MARGIN_DEG: f64 = 1.0e-7;

/// An airport returned by a proximity query with its distance to the query
/// point.
#[derive(Debug, Clone, PartialEq)]
pub struct AirportMatch {
    pub airport: Stored<Airport>,
    pub distance_km: f64,
}

#[derive(Debug, Clone)]
struct IndexedAirport(Stored<Airport>);

impl IndexedAirport {
    fn position(&self) -> [f64; 2] {
        let location = self.0.record.location;
        [location.lon(), location.lat()]
    }
}

impl RTreeObject for IndexedAirport {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position())
    }
}

impl PointDistance for IndexedAirport {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let [x, y] = self.position();
        let dx = x - point[0];
        let dy = y - point[1];
        dx * dx + dy * dy
    }
}

/// Immutable spatial index over a snapshot of stored airports.
pub struct AirportIndex {
    tree: RTree<IndexedAirport>,
}

impl fmt::Debug for AirportIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AirportIndex")
            .field("entries", &self.tree.size())
            .finish_non_exhaustive()
    }
}

impl AirportIndex {
    /// Bulk-load an index from stored airports.
    ///
    /// # Examples
    /// ```
    /// use skyatlas_core::{Airport, AirportIndex, GeoPoint, IataCode, Stored};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let dublin = Airport::new(IataCode::parse("DUB")?, "Dublin", "Dublin", "Ireland", GeoPoint::new(53.42, -6.27)?);
    /// let index = AirportIndex::build(vec![Stored::new(1, dublin)]);
    /// let centre = GeoPoint::new(53.3, -6.2)?;
    ///
    /// assert_eq!(index.within_radius(&centre, 20.0, 10).len(), 1);
    /// assert!(index.within_radius(&centre, 5.0, 10).is_empty());
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn build(airports: Vec<Stored<Airport>>) -> Self {
        Self {
            tree: RTree::bulk_load(airports.into_iter().map(IndexedAirport).collect()),
        }
    }

    /// Number of indexed airports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Return `true` when the index holds no airports.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// The closest airport to `point` by great-circle distance.
    ///
    /// Airports at the same minimal distance are resolved in favour of the
    /// lowest code.
    #[must_use]
    pub fn nearest(&self, point: &GeoPoint) -> Option<AirportMatch> {
        let query = [point.lon(), point.lat()];
        let candidate = self.tree.nearest_neighbor(&query)?;
        // The planar neighbour bounds the answer; the true nearest lies within
        // its great-circle distance.
        let bound = point.distance_km(&candidate.0.record.location);
        self.within_radius(point, bound, 1).into_iter().next()
    }

    /// Airports within `radius_km` of `point`, closest first, at most `limit`.
    ///
    /// Equal distances are ordered by code. The radius is inclusive.
    #[must_use]
    pub fn within_radius(&self, point: &GeoPoint, radius_km: f64, limit: usize) -> Vec<AirportMatch> {
        let mut candidates: BTreeMap<&IataCode, &IndexedAirport> = BTreeMap::new();
        for envelope in search_envelopes(point, radius_km) {
            for entry in self.tree.locate_in_envelope(&envelope) {
                candidates.insert(&entry.0.record.code, entry);
            }
        }

        let mut matches: Vec<AirportMatch> = candidates
            .into_values()
            .filter_map(|entry| {
                let distance_km = point.distance_km(&entry.0.record.location);
                (distance_km <= radius_km).then(|| AirportMatch {
                    airport: entry.0.clone(),
                    distance_km,
                })
            })
            .collect();
        matches.sort_by(|left, right| {
            left.distance_km
                .total_cmp(&right.distance_km)
                .then_with(|| left.airport.record.code.cmp(&right.airport.record.code))
        });
        matches.truncate(limit);
        matches
    }

    /// Iterate over every indexed airport in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Stored<Airport>> {
        self.tree.iter().map(|entry| &entry.0)
    }
}

/// Lon/lat envelopes that together cover the circle of `radius_km` around
/// `point`. Circles crossing the antimeridian yield two envelopes.
fn search_envelopes(point: &GeoPoint, radius_km: f64) -> Vec<AABB<[f64; 2]>> {
    let angular = radius_km / EARTH_MEAN_RADIUS_KM;
    if !angular.is_finite() || angular >= PI {
        return vec![degrees_envelope(-PI, -FRAC_PI_2, PI, FRAC_PI_2)];
    }

    let lat = point.lat().to_radians();
    let lon = point.lon().to_radians();
    let min_lat = lat - angular;
    let max_lat = lat + angular;

    if min_lat <= -FRAC_PI_2 || max_lat >= FRAC_PI_2 {
        // The circle covers a pole, so every longitude is in range.
        return vec![degrees_envelope(
            -PI,
            min_lat.max(-FRAC_PI_2),
            PI,
            max_lat.min(FRAC_PI_2),
        )];
    }

    let delta_lon = (angular.sin() / lat.cos()).min(1.0).asin();
    let min_lon = lon - delta_lon;
    let max_lon = lon + delta_lon;

    if min_lon < -PI {
        vec![
            degrees_envelope(min_lon + 2.0 * PI, min_lat, PI, max_lat),
            degrees_envelope(-PI, min_lat, max_lon, max_lat),
        ]
    } else if max_lon > PI {
        vec![
            degrees_envelope(min_lon, min_lat, PI, max_lat),
            degrees_envelope(-PI, min_lat, max_lon - 2.0 * PI, max_lat),
        ]
    } else {
        vec![degrees_envelope(min_lon, min_lat, max_lon, max_lat)]
    }
}

fn degrees_envelope(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [
            min_lon.to_degrees() - ENVELOPE_MARGIN_DEG,
            min_lat.to_degrees() - ENVELOPE_MARGIN_DEG,
        ],
        [
            max_lon.to_degrees() + ENVELOPE_MARGIN_DEG,
            max_lat.to_degrees() + ENVELOPE_MARGIN_DEG,
        ],
    )
}
