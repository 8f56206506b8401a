//! Batch loop shared by the airport and route loaders.

use std::io;

use log::{debug, info, warn};
use skyatlas_core::StoreError;

use super::{IngestError, IngestReport, RejectionKind, RowRejection};
use crate::records::{Record, records};

/// Outcome of writing one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct Flushed {
    pub(super) imported: u64,
    pub(super) conflicts: u64,
    /// Rows the store refused because an endpoint vanished after parsing.
    pub(super) orphaned: u64,
}

/// One record type flowing through the pipeline.
pub(super) trait BatchLoader {
    type Item;

    /// Noun used in log lines, e.g. `"airports"`.
    const SUBJECT: &'static str;

    /// Validate a row and turn it into a record ready for the store.
    fn parse(&self, record: &Record) -> Result<Self::Item, RowRejection>;

    /// Write one batch in a single store call.
    fn flush(&self, batch: &[Self::Item]) -> Result<Flushed, StoreError>;

    /// Records the store holds once the run ends.
    fn total(&self) -> Result<u64, StoreError>;
}

/// Stream `source` through `loader`, flushing every `batch_size` accepted rows.
pub(super) fn run<R, L>(source: R, loader: &L, batch_size: usize) -> Result<IngestReport, IngestError>
where
    R: io::Read,
    L: BatchLoader,
{
    let mut report = IngestReport::default();
    let mut batch = Vec::with_capacity(batch_size);
    for row in records(source) {
        let record = match row {
            Ok(record) => record,
            Err(source) if source.is_io_error() => {
                return Err(IngestError::Read { report, source });
            }
            Err(error) => {
                let line = error.position().map_or(0, csv::Position::line);
                warn!("Skipping unreadable row {line}: {error}");
                report.record_skips(RejectionKind::Unreadable, 1);
                continue;
            }
        };
        match loader.parse(&record) {
            Ok(item) => batch.push(item),
            Err(rejection) => {
                debug!("Skipping row {}: {rejection}", record.line());
                report.record_skips(rejection.kind(), 1);
            }
        }
        if batch.len() >= batch_size {
            if let Err(source) = flush(loader, &mut batch, &mut report) {
                return Err(IngestError::Store { report, source });
            }
        }
    }
    if let Err(source) = flush(loader, &mut batch, &mut report) {
        return Err(IngestError::Store { report, source });
    }
    match loader.total() {
        Ok(total) => report.total = total,
        Err(source) => return Err(IngestError::Store { report, source }),
    }
    info!(
        "Loaded {}: {} imported, {} skipped, {} in store",
        L::SUBJECT,
        report.imported,
        report.skipped,
        report.total
    );
    Ok(report)
}

fn flush<L: BatchLoader>(
    loader: &L,
    batch: &mut Vec<L::Item>,
    report: &mut IngestReport,
) -> Result<(), StoreError> {
    if batch.is_empty() {
        return Ok(());
    }
    let flushed = loader.flush(batch)?;
    batch.clear();
    if flushed.conflicts > 0 {
        warn!(
            "Skipped {} {} already in the store",
            flushed.conflicts,
            L::SUBJECT
        );
    }
    if flushed.orphaned > 0 {
        warn!(
            "Skipped {} {} whose airports were removed during the run",
            flushed.orphaned,
            L::SUBJECT
        );
    }
    report.imported += flushed.imported;
    report.conflicts += flushed.conflicts;
    report.record_skips(RejectionKind::UnknownAirport, flushed.orphaned);
    Ok(())
}
