use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor};
use std::path::PathBuf;

use crate::error::Error;

use super::variant::{ContainerVariant, RecordLayout};

/// Size of the leading entry count.
pub const COUNT_SIZE: usize = 4;

/// One row of the index table, in on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Position in the table.
    pub index: usize,
    /// Compressed length in bytes.
    pub size: i32,
    /// Absolute offset into the archive.
    pub offset: i32,
    /// On-disk tag embedded in the output file name.
    pub sequence: i32,
    /// Uncompressed size; informational, absent from 12-byte records.
    pub original_size: Option<i32>,
}

impl IndexEntry {
    /// Decode one record. `record` must be exactly `layout.width` bytes.
    pub fn from_record(index: usize, record: &[u8], layout: RecordLayout) -> io::Result<Self> {
        let mut cursor = Cursor::new(record);
        let size = cursor.read_i32::<LittleEndian>()?;
        let offset = cursor.read_i32::<LittleEndian>()?;
        let sequence = cursor.read_i32::<LittleEndian>()?;
        let original_size = if layout.has_original_size {
            Some(cursor.read_i32::<LittleEndian>()?)
        } else {
            None
        };

        Ok(Self {
            index,
            size,
            offset,
            sequence,
            original_size,
        })
    }

    /// `(offset, size)` as unsigned values, if both are positive.
    pub fn byte_range(&self) -> Option<(u64, u64)> {
        if self.offset > 0 && self.size > 0 {
            Some((self.offset as u64, self.size as u64))
        } else {
            None
        }
    }
}

/// Parsed index of an indexed container.
#[derive(Debug, Clone)]
pub struct IndexTable {
    pub variant: ContainerVariant,
    pub entries: Vec<IndexEntry>,
}

impl IndexTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An entry written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntry {
    pub index: usize,
    /// `None` for single-stream inputs.
    pub sequence: Option<i32>,
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// An entry that could not be extracted.
#[derive(Debug)]
pub struct EntryFailure {
    pub index: usize,
    pub sequence: Option<i32>,
    pub offset: Option<i32>,
    pub size: Option<i32>,
    pub error: Error,
}

impl EntryFailure {
    pub fn for_entry(entry: &IndexEntry, error: Error) -> Self {
        Self {
            index: entry.index,
            sequence: Some(entry.sequence),
            offset: Some(entry.offset),
            size: Some(entry.size),
            error,
        }
    }
}

/// Outcome of an extraction run, sorted by table index.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub extracted: Vec<ExtractedEntry>,
    pub failures: Vec<EntryFailure>,
}

impl ExtractionReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn bytes_written(&self) -> u64 {
        self.extracted.iter().map(|e| e.bytes_written).sum()
    }
}
