use crate::error::{Error, Result};

use super::structures::IndexTable;

/// Reject the table at the first entry with a non-positive offset or size.
///
/// Runs before any extraction task is started, so a bad table never leaves
/// partial output behind.
pub fn validate(table: &IndexTable) -> Result<()> {
    match table.entries.iter().find(|e| e.byte_range().is_none()) {
        Some(entry) => Err(Error::InvalidEntry {
            index: entry.index,
            sequence: entry.sequence,
            offset: entry.offset,
            size: entry.size,
        }),
        None => Ok(()),
    }
}
