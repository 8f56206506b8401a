//! Transport-neutral query parameters.

use std::collections::BTreeMap;
use std::str::FromStr;

use super::QueryError;

/// String parameters keyed by name, as received from a caller.
///
/// Values are trimmed on read and blank values count as absent, except
/// through [`QueryParams::text`].
///
/// # Examples
/// ```
/// use skyatlas_core::query::QueryParams;
///
/// # fn main() -> Result<(), skyatlas_core::QueryError> {
/// let params: QueryParams = [("lat", "53.3"), ("limit", " 5 ")].into_iter().collect();
/// assert_eq!(params.required_f64("lat")?, 53.3);
/// assert_eq!(params.usize_or("limit", 1000)?, 5);
/// assert_eq!(params.usize_or("top", 10)?, 10);
/// assert!(params.required_f64("lon").is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<String, String>,
}

impl QueryParams {
    /// Create an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, returning the updated set.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a parameter, returning any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(name.into(), value.into())
    }

    /// Split `key=value` into its parts.
    pub fn parse_pair(raw: &str) -> Result<(String, String), QueryError> {
        let Some((name, value)) = raw.split_once('=') else {
            return Err(QueryError::invalid(raw, "expected key=value"));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(QueryError::invalid(raw, "parameter name is empty"));
        }
        Ok((name.to_owned(), value.to_owned()))
    }

    /// The trimmed value of `name`, or `None` when absent or blank.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// The trimmed value of `name` whenever it was supplied, blank included.
    ///
    /// Text fields use this so that `city=` can clear a value.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|value| value.trim())
    }

    /// Return `true` when `name` has a non-blank value.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The value of `name`, failing when absent.
    pub fn required(&self, name: &str) -> Result<&str, QueryError> {
        self.get(name)
            .ok_or_else(|| QueryError::invalid(name, "parameter is required"))
    }

    /// Parse `name` when present.
    pub fn parse<T: FromStr>(&self, name: &str, expected: &str) -> Result<Option<T>, QueryError> {
        self.get(name)
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| QueryError::invalid(name, format!("{value:?} is not {expected}")))
            })
            .transpose()
    }

    /// Parse a required floating-point parameter.
    pub fn required_f64(&self, name: &str) -> Result<f64, QueryError> {
        self.required(name)?;
        self.optional_f64(name)?
            .ok_or_else(|| QueryError::invalid(name, "parameter is required"))
    }

    /// Parse an optional floating-point parameter.
    pub fn optional_f64(&self, name: &str) -> Result<Option<f64>, QueryError> {
        self.parse(name, "a number")
    }

    /// Parse a floating-point parameter, falling back to `default`.
    pub fn f64_or(&self, name: &str, default: f64) -> Result<f64, QueryError> {
        Ok(self.optional_f64(name)?.unwrap_or(default))
    }

    /// Parse a non-negative integer parameter, falling back to `default`.
    pub fn usize_or(&self, name: &str, default: usize) -> Result<usize, QueryError> {
        Ok(self
            .parse(name, "a non-negative integer")?
            .unwrap_or(default))
    }

    /// Parse a required non-negative integer parameter.
    pub fn required_u64(&self, name: &str) -> Result<u64, QueryError> {
        self.required(name)?;
        self.parse(name, "a non-negative integer")?
            .ok_or_else(|| QueryError::invalid(name, "parameter is required"))
    }

    /// Parse an optional signed integer parameter.
    pub fn optional_i32(&self, name: &str) -> Result<Option<i32>, QueryError> {
        self.parse(name, "an integer")
    }

    /// Parse an optional boolean.
    ///
    /// Accepts `true`/`false`, `yes`/`no` and `1`/`0`, ignoring case.
    pub fn optional_bool(&self, name: &str) -> Result<Option<bool>, QueryError> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" => Ok(Some(false)),
            _ => Err(QueryError::invalid(
                name,
                format!("{value:?} is not a boolean"),
            )),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}
