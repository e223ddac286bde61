//! Decoder collaborators.
//!
//! The extraction pipeline only knows the [`Decoder`] contract: a finite,
//! immutable compressed buffer goes in and a lazily produced byte stream comes
//! out. [`NwaDecoder`] is the implementation used for `.nwa` files and for the
//! entries of `.nwk` archives.

mod nwa;
mod wav;

pub use nwa::{NwaDecoder, NwaHeader};
pub use wav::WavHeader;

use std::io::{self, Read};
use std::sync::Arc;

use thiserror::Error;

/// Decoded output handed back by a [`Decoder`].
pub type DecodedStream = Box<dyn Read + Send>;

/// Errors raised by a decoder, either up front or while its stream is read.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("input too short: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    #[error("unsupported stream: {0}")]
    Unsupported(String),

    #[error("corrupt block {block}: {reason}")]
    CorruptBlock { block: usize, reason: &'static str },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DecodeError {
    /// Wrap into an `io::Error` so it can travel through a `Read` impl.
    pub fn into_io(self) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, self)
    }

    /// Recover a decoder error from an `io::Error` returned by a decoded stream.
    pub fn from_io(err: io::Error) -> Self {
        match err.downcast::<DecodeError>() {
            Ok(decode) => decode,
            Err(err) => DecodeError::Io(err),
        }
    }
}

/// Converts one compressed byte stream into one decoded byte stream.
///
/// Implementations must hold no mutable state shared between calls so a
/// single instance can serve every extraction task at once.
pub trait Decoder: Send + Sync {
    fn decode(&self, input: Arc<[u8]>) -> Result<DecodedStream, DecodeError>;
}

/// Stream over a buffer that needs no decoding.
pub fn passthrough(input: Arc<[u8]>) -> DecodedStream {
    Box::new(io::Cursor::new(input))
}
