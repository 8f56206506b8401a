//! Streaming reader for OpenFlights `.dat` exports.
//!
//! The exports are headerless CSV: fields are comma separated, optionally
//! quoted, and rows may carry more columns than a loader needs. The literal
//! `\N` marks a missing value and is surfaced as an empty field.

use std::io;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};

/// Marker OpenFlights uses for a missing value.
pub const NULL_MARKER: &str = r"\N";

/// One decoded row with its position in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    line: u64,
    fields: Vec<String>,
}

impl Record {
    /// Build a record from already split fields, mapping [`NULL_MARKER`] to
    /// an empty string.
    pub fn new<I, F>(line: u64, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        Self {
            line,
            fields: fields
                .into_iter()
                .map(|field| {
                    let field = field.into();
                    if field == NULL_MARKER {
                        String::new()
                    } else {
                        field
                    }
                })
                .collect(),
        }
    }

    fn from_csv(record: &StringRecord) -> Self {
        let line = record.position().map_or(0, csv::Position::line);
        Self::new(line, record.iter())
    }

    /// One-based line number of the row, or `0` when unknown.
    #[must_use]
    pub const fn line(&self) -> u64 {
        self.line
    }

    /// Number of fields in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field at `index`, or an empty string past the end of the row.
    #[must_use]
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map_or("", String::as_str)
    }
}

/// Iterator over the rows of a source.
///
/// Rows that fail to decode are yielded as errors so the caller can decide
/// whether to skip them; see [`csv::Error::is_io_error`] for the failures that
/// should end a run.
pub struct Records<R> {
    inner: StringRecordsIntoIter<R>,
}

impl<R: io::Read> Iterator for Records<R> {
    type Item = Result<Record, csv::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|result| result.map(|record| Record::from_csv(&record)))
    }
}

/// Read OpenFlights rows from `source`.
///
/// # Examples
/// ```
/// use skyatlas_data::records;
///
/// let rows: Vec<_> = records("EI,,DUB,,LHR,\\N\n".as_bytes())
///     .collect::<Result<_, _>>()
///     .expect("valid rows");
/// assert_eq!(rows[0].field(4), "LHR");
/// assert_eq!(rows[0].field(5), "");
/// assert_eq!(rows[0].line(), 1);
/// ```
pub fn records<R: io::Read>(source: R) -> Records<R> {
    let reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(source);
    Records {
        inner: reader.into_records(),
    }
}
