//! Error types shared by the archive pipeline and the binary.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::codec::DecodeError;

/// Every fatal condition an extraction run can hit.
#[derive(Debug, Error)]
pub enum Error {
    #[error("usage error: {0}")]
    Usage(String),

    #[error("unsupported input {}: only .nwa/.nwk/.ovk files are handled", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("cannot read input {}: {source}", path.display())]
    InputIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid {variant} file {}: {defect}", path.display())]
    CorruptIndex {
        variant: &'static str,
        path: PathBuf,
        defect: IndexDefect,
    },

    #[error("invalid table[{index}]: cnt {sequence}, off {offset}, size {size}")]
    InvalidEntry {
        index: usize,
        sequence: i32,
        offset: i32,
        size: i32,
    },

    #[error(
        "couldn't read the data for {}: off {offset}, size {size}: {cause}",
        filename.display()
    )]
    TruncatedRead {
        filename: PathBuf,
        offset: u64,
        size: u64,
        #[source]
        cause: ReadCause,
    },

    #[error("failed to decode {}: {source}", filename.display())]
    DecodeFailed {
        filename: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("cannot write {}: {source}", path.display())]
    OutputIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("extraction task for table[{index}] did not complete: {reason}")]
    TaskFailed { index: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Structural problem found while reading the index table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IndexDefect {
    /// Fewer than four bytes were available for the entry count.
    #[error("entry count truncated ({available} of 4 bytes)")]
    ShortHeader { available: usize },
    /// The declared entry count was zero or negative.
    #[error("index = {0}")]
    NonPositiveCount(i32),
    /// Record `index` could not be read in full.
    #[error("couldn't read index entry {index} ({available} of {width} bytes)")]
    ShortRecord { index: usize, available: usize, width: usize },
}

/// Why a bounded copy from the source came up short.
#[derive(Debug, Error)]
pub enum ReadCause {
    /// The source ended after `read` bytes.
    #[error("only {read} bytes available")]
    ShortRead { read: u64 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Short machine-friendly name of the error kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Usage(_) => "usage",
            Error::UnsupportedFormat { .. } => "unsupported_format",
            Error::InputIo { .. } => "input_io",
            Error::CorruptIndex { .. } => "corrupt_index",
            Error::InvalidEntry { .. } => "invalid_entry",
            Error::TruncatedRead { .. } => "truncated_read",
            Error::DecodeFailed { .. } => "decode_failed",
            Error::OutputIo { .. } => "output_io",
            Error::TaskFailed { .. } => "task_failed",
        }
    }
}
