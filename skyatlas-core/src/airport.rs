//! Airport model keyed by its IATA code.

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::distance::{CoordinateError, GeoPoint};
use crate::route::Waypoint;

/// Display name used when a source supplies an empty airport name.
pub const UNNAMED_AIRPORT: &str = "Unnamed Airport";

/// Errors returned by [`IataCode::parse`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IataCodeError {
    /// Nothing remained after trimming quotes and whitespace.
    #[error("IATA code is empty")]
    Empty,
    /// The normalised code did not have exactly three characters.
    #[error("IATA code {code:?} has {length} characters; expected 3")]
    InvalidLength {
        /// Normalised code that failed validation.
        code: String,
        /// Character count of the normalised code.
        length: usize,
    },
}

/// A three-character airport identifier, normalised to upper case.
///
/// Codes are the natural key for airports: two records with the same code are
/// the same airport.
///
/// # Examples
/// ```
/// use skyatlas_core::IataCode;
///
/// # fn main() -> Result<(), skyatlas_core::IataCodeError> {
/// let code = IataCode::parse(" \"dub\" ")?;
/// assert_eq!(code.as_str(), "DUB");
/// assert!(IataCode::parse("DU").is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IataCode(String);

impl IataCode {
    /// Trim surrounding quotes and whitespace, upper-case, and validate.
    pub fn parse(raw: &str) -> Result<Self, IataCodeError> {
        let code = raw
            .trim_matches(|ch: char| ch == '"' || ch.is_whitespace())
            .to_uppercase();
        match code.chars().count() {
            0 => Err(IataCodeError::Empty),
            3 => Ok(Self(code)),
            length => Err(IataCodeError::InvalidLength { code, length }),
        }
    }

    /// The code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IataCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for IataCode {
    type Err = IataCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for IataCode {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// An airport with its position and descriptive attributes.
///
/// # Examples
/// ```
/// use skyatlas_core::{Airport, GeoPoint, IataCode, UNNAMED_AIRPORT};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let airport = Airport::new(
///     IataCode::parse("GKA")?,
///     "",
///     "Goroka",
///     "Papua New Guinea",
///     GeoPoint::new(-6.081689834590001, 145.391998291)?,
/// )
/// .with_altitude_ft(Some(5282));
/// assert_eq!(airport.name, UNNAMED_AIRPORT);
/// assert_eq!(airport.altitude_ft, Some(5282));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Airport {
    pub code: IataCode,
    pub name: String,
    pub city: String,
    pub country: String,
    pub location: GeoPoint,
    pub altitude_ft: Option<i32>,
    pub is_major_hub: bool,
}

impl Airport {
    /// Construct an airport; an empty `name` falls back to [`UNNAMED_AIRPORT`].
    pub fn new(
        code: IataCode,
        name: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
        location: GeoPoint,
    ) -> Self {
        Self {
            code,
            name: display_name(name.into()),
            city: city.into(),
            country: country.into(),
            location,
            altitude_ft: None,
            is_major_hub: false,
        }
    }

    /// Set the field elevation in feet.
    #[must_use]
    pub const fn with_altitude_ft(mut self, altitude_ft: Option<i32>) -> Self {
        self.altitude_ft = altitude_ft;
        self
    }

    /// Flag the airport as a major hub.
    #[must_use]
    pub const fn with_major_hub(mut self, is_major_hub: bool) -> Self {
        self.is_major_hub = is_major_hub;
        self
    }

    /// The airport as a route endpoint.
    #[must_use]
    pub fn waypoint(&self) -> Waypoint {
        Waypoint::new(self.code.clone(), self.location)
    }
}

/// Errors returned by [`NewAirport::validate`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AirportError {
    /// The supplied code was not a valid IATA code.
    #[error(transparent)]
    Code(#[from] IataCodeError),
    /// The supplied position was out of range.
    #[error(transparent)]
    Coordinate(#[from] CoordinateError),
}

/// Unvalidated airport attributes as supplied by a caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewAirport {
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: Option<i32>,
    pub is_major_hub: bool,
}

impl NewAirport {
    /// Normalise the code and check the position.
    ///
    /// # Examples
    /// ```
    /// use skyatlas_core::{AirportError, NewAirport};
    ///
    /// let draft = NewAirport {
    ///     code: "ork".into(),
    ///     name: "Cork Airport".into(),
    ///     lat: 51.8413,
    ///     lon: -8.4911,
    ///     ..NewAirport::default()
    /// };
    /// assert_eq!(draft.clone().validate().map(|a| a.code.to_string()), Ok("ORK".into()));
    ///
    /// let north_of_pole = NewAirport { lat: 91.0, ..draft };
    /// assert!(matches!(north_of_pole.validate(), Err(AirportError::Coordinate(_))));
    /// ```
    pub fn validate(self) -> Result<Airport, AirportError> {
        let code = IataCode::parse(&self.code)?;
        let location = GeoPoint::new(self.lat, self.lon)?;
        Ok(
            Airport::new(code, self.name, self.city, self.country, location)
                .with_altitude_ft(self.altitude_ft)
                .with_major_hub(self.is_major_hub),
        )
    }
}

fn display_name(name: String) -> String {
    if name.trim().is_empty() {
        UNNAMED_AIRPORT.to_owned()
    } else {
        name
    }
}

/// A partial update for an existing airport.
///
/// Fields left as `None` keep their current value. `altitude_ft` is doubly
/// optional so callers can clear a stored altitude with `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AirportPatch {
    pub name: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub location: Option<GeoPoint>,
    pub altitude_ft: Option<Option<i32>>,
    pub is_major_hub: Option<bool>,
}

impl AirportPatch {
    /// Return `true` when the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch in place. The airport code is never modified.
    pub fn apply(&self, airport: &mut Airport) {
        if let Some(name) = &self.name {
            airport.name = display_name(name.clone());
        }
        if let Some(city) = &self.city {
            airport.city.clone_from(city);
        }
        if let Some(country) = &self.country {
            airport.country.clone_from(country);
        }
        if let Some(location) = self.location {
            airport.location = location;
        }
        if let Some(altitude_ft) = self.altitude_ft {
            airport.altitude_ft = altitude_ft;
        }
        if let Some(is_major_hub) = self.is_major_hub {
            airport.is_major_hub = is_major_hub;
        }
    }
}
