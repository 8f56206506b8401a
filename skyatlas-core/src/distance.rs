//! Coordinate validation and great-circle distances.
//!
//! Coordinates are WGS84 degrees. Where a [`geo::Coord`] is produced the axis
//! order follows `geo`: `x = longitude`, `y = latitude`.

use geo::Coord;
use thiserror::Error;

/// Mean Earth radius in kilometres used for every haversine computation.
pub const EARTH_MEAN_RADIUS_KM: f64 = 6371.0088;

/// Errors returned by [`GeoPoint::new`].
#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum CoordinateError {
    /// Latitude was outside `[-90, 90]` or not a finite number.
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),
    /// Longitude was outside `[-180, 180]` or not a finite number.
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

/// Return `true` when `lat ∈ [-90, 90]` and `lon ∈ [-180, 180]`.
///
/// `NaN` fails both range checks and is therefore rejected.
///
/// # Examples
/// ```
/// use skyatlas_core::validate_coordinate;
///
/// assert!(validate_coordinate(53.42, -6.27));
/// assert!(!validate_coordinate(95.0, 0.0));
/// assert!(!validate_coordinate(0.0, f64::NAN));
/// ```
#[must_use]
pub fn validate_coordinate(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Great-circle distance in kilometres between two WGS84 positions.
///
/// Uses the haversine formula with [`EARTH_MEAN_RADIUS_KM`]. The result is
/// symmetric in its arguments and zero for identical points.
///
/// # Examples
/// ```
/// use skyatlas_core::haversine_km;
///
/// let dub_lhr = haversine_km(53.4213, -6.2700, 51.4700, -0.4543);
/// assert!((440.0..=470.0).contains(&dub_lhr));
/// assert_eq!(haversine_km(10.0, 20.0, 10.0, 20.0), 0.0);
/// ```
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` fractionally above one for antipodal points.
    2.0 * EARTH_MEAN_RADIUS_KM * a.clamp(0.0, 1.0).sqrt().asin()
}

/// Round a distance to two decimal places for presentation.
#[must_use]
pub fn round_km(distance_km: f64) -> f64 {
    (distance_km * 100.0).round() / 100.0
}

/// A validated WGS84 position.
///
/// # Examples
/// ```
/// use skyatlas_core::GeoPoint;
///
/// # fn main() -> Result<(), skyatlas_core::CoordinateError> {
/// let goroka = GeoPoint::new(-6.081689834590001, 145.391998291)?;
/// assert_eq!(goroka.to_coord().x, 145.391998291);
/// assert!(GeoPoint::new(-91.0, 0.0).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl GeoPoint {
    /// Validate and construct a point from latitude and longitude in degrees.
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::Latitude(lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::Longitude(lon));
        }
        Ok(Self { lat, lon })
    }

    /// Validate a `geo` coordinate where `x` is longitude and `y` latitude.
    pub fn from_coord(coord: Coord<f64>) -> Result<Self, CoordinateError> {
        Self::new(coord.y, coord.x)
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lon(&self) -> f64 {
        self.lon
    }

    /// The point as a `geo` coordinate (`x = longitude`, `y = latitude`).
    #[must_use]
    pub const fn to_coord(&self) -> Coord<f64> {
        Coord {
            x: self.lon,
            y: self.lat,
        }
    }

    /// Great-circle distance to `other` in kilometres.
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        haversine_km(self.lat, self.lon, other.lat, other.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    const DUBLIN: (f64, f64) = (53.4213, -6.2700);
    const HEATHROW: (f64, f64) = (51.4700, -0.4543);

    #[rstest]
    #[case(90.0, 180.0)]
    #[case(-90.0, -180.0)]
    #[case(0.0, 0.0)]
    fn accepts_boundary_coordinates(#[case] lat: f64, #[case] lon: f64) {
        assert!(validate_coordinate(lat, lon));
        assert!(GeoPoint::new(lat, lon).is_ok());
    }

    #[rstest]
    #[case(95.0, 0.0)]
    #[case(-90.000_001, 0.0)]
    #[case(0.0, 180.5)]
    #[case(0.0, -181.0)]
    #[case(f64::NAN, 0.0)]
    #[case(0.0, f64::INFINITY)]
    fn rejects_out_of_range_coordinates(#[case] lat: f64, #[case] lon: f64) {
        assert!(!validate_coordinate(lat, lon));
        assert!(GeoPoint::new(lat, lon).is_err());
    }

    #[rstest]
    fn reports_which_axis_failed() {
        assert!(matches!(
            GeoPoint::new(95.0, 0.0),
            Err(CoordinateError::Latitude(_))
        ));
        assert!(matches!(
            GeoPoint::new(0.0, 200.0),
            Err(CoordinateError::Longitude(_))
        ));
    }

    #[rstest]
    fn dublin_to_heathrow_is_about_450_km() {
        let distance = haversine_km(DUBLIN.0, DUBLIN.1, HEATHROW.0, HEATHROW.1);
        assert!(
            (440.0..=470.0).contains(&distance),
            "unexpected distance {distance}"
        );
    }

    #[rstest]
    fn quarter_meridian_matches_radius() {
        let distance = haversine_km(0.0, 0.0, 90.0, 0.0);
        let expected = EARTH_MEAN_RADIUS_KM * std::f64::consts::FRAC_PI_2;
        assert!((distance - expected).abs() < 1.0e-6);
    }

    #[rstest]
    fn antipodal_points_are_half_circumference_apart() {
        let distance = haversine_km(0.0, 0.0, 0.0, 180.0);
        let expected = EARTH_MEAN_RADIUS_KM * std::f64::consts::PI;
        assert!((distance - expected).abs() < 1.0e-6);
    }

    #[rstest]
    #[case(463.456, 463.46)]
    #[case(0.004, 0.0)]
    #[case(12.0, 12.0)]
    fn rounds_to_hundredths(#[case] raw: f64, #[case] expected: f64) {
        assert!((round_km(raw) - expected).abs() < 1.0e-9);
    }

    proptest! {
        #[test]
        fn haversine_is_symmetric(
            lat1 in -90.0_f64..=90.0,
            lon1 in -180.0_f64..=180.0,
            lat2 in -90.0_f64..=90.0,
            lon2 in -180.0_f64..=180.0,
        ) {
            let forward = haversine_km(lat1, lon1, lat2, lon2);
            let backward = haversine_km(lat2, lon2, lat1, lon1);
            prop_assert!((forward - backward).abs() < 1.0e-6);
        }

        #[test]
        fn haversine_is_zero_for_identical_points(
            lat in -90.0_f64..=90.0,
            lon in -180.0_f64..=180.0,
        ) {
            prop_assert_eq!(haversine_km(lat, lon, lat, lon), 0.0);
        }

        #[test]
        fn haversine_never_exceeds_half_circumference(
            lat1 in -90.0_f64..=90.0,
            lon1 in -180.0_f64..=180.0,
            lat2 in -90.0_f64..=90.0,
            lon2 in -180.0_f64..=180.0,
        ) {
            let distance = haversine_km(lat1, lon1, lat2, lon2);
            prop_assert!(distance >= 0.0);
            prop_assert!(distance <= EARTH_MEAN_RADIUS_KM * std::f64::consts::PI + 1.0e-6);
        }
    }
}
