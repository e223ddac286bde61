//! Where the extraction pipeline reports per-entry outcomes.
//!
//! The pipeline never logs on its own; it is handed a [`DiagnosticSink`].
//! The binary uses [`LogSink`], which forwards to the `log` facade, and tests
//! can plug in a recorder.

use log::{error, info};

use crate::archive::{EntryFailure, ExtractedEntry};

/// Receives structured outcomes from extraction tasks.
///
/// Called concurrently from the coordinator; implementations must be cheap
/// and thread-safe.
pub trait DiagnosticSink: Send + Sync {
    fn entry_extracted(&self, entry: &ExtractedEntry);

    fn entry_failed(&self, failure: &EntryFailure);
}

/// Forwards outcomes to the `log` facade, optionally echoing to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink {
    echo: bool,
}

impl LogSink {
    pub fn new(echo: bool) -> Self {
        Self { echo }
    }
}

impl DiagnosticSink for LogSink {
    fn entry_extracted(&self, entry: &ExtractedEntry) {
        info!(
            "extracted table[{}] cnt {} -> {} ({} bytes)",
            entry.index,
            entry
                .sequence
                .map_or_else(|| "-".to_string(), |s| s.to_string()),
            entry.path.display(),
            entry.bytes_written
        );
        if self.echo {
            println!("  extracting: {}", entry.path.display());
        }
    }

    fn entry_failed(&self, failure: &EntryFailure) {
        error!(
            "table[{}] cnt {:?}, off {:?}, size {:?} failed ({}): {}",
            failure.index,
            failure.sequence,
            failure.offset,
            failure.size,
            failure.error.kind(),
            failure.error
        );
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn entry_extracted(&self, _entry: &ExtractedEntry) {}

    fn entry_failed(&self, _failure: &EntryFailure) {}
}
