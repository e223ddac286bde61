//! # runwa
//!
//! Extract audio from the NWA/NWK/OVK containers used by RealLive-era visual
//! novel engines.
//!
//! - `.nwa` files hold a single NWA stream, decoded to one WAV file.
//! - `.nwk` files hold an index table of NWA streams, each decoded to WAV.
//! - `.ovk` files hold an index table of raw Ogg Vorbis streams, copied out as is.
//!
//! Entries of indexed archives are extracted concurrently, each task reading
//! its own byte range through an independent file handle.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use runwa::{ExtractOptions, LogSink, NwaDecoder, extract_archive};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let report = extract_archive(
//!         Path::new("z0001.nwk"),
//!         "out/",
//!         Arc::new(NwaDecoder),
//!         Arc::new(LogSink::default()),
//!         ExtractOptions::default(),
//!     )
//!     .await?;
//!
//!     for entry in &report.extracted {
//!         println!("{}", entry.path.display());
//!     }
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod codec;
pub mod diagnostics;
pub mod error;
pub mod io;
pub mod logging;

pub use archive::{
    ContainerVariant, ExtractOptions, ExtractionReport, Extractor, FailurePolicy, IndexEntry,
    IndexParser, IndexTable, OutputNaming, extract_archive,
};
pub use cli::Cli;
pub use codec::{DecodeError, Decoder, NwaDecoder};
pub use diagnostics::{DiagnosticSink, LogSink, NullSink};
pub use error::{Error, Result};
pub use io::{LocalFileReader, ReadAt};
