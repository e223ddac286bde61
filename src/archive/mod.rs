//! Container parsing and extraction.
//!
//! ## Architecture
//!
//! - [`variant`]: the three container families and their record layouts
//! - [`structures`]: index entries, tables and extraction reports
//! - [`parser`]: reads the entry count and the fixed-width index records
//! - [`validator`]: rejects entries with non-positive offsets or sizes
//! - [`naming`]: output file names
//! - [`extractor`]: concurrent per-entry extraction
//!
//! ## Flow
//!
//! A `.nwa` file is a single NWA stream and is decoded straight to one WAV
//! file on the calling thread. A `.nwk` or `.ovk` file starts with an index
//! table; every entry becomes its own task that opens the archive
//! independently, copies its byte range, optionally decodes it, and writes one
//! output file.

mod extractor;
mod naming;
mod parser;
mod structures;
mod validator;
mod variant;

pub use extractor::{ExtractOptions, Extractor, FailurePolicy, extract_single, write_output};
pub use naming::OutputNaming;
pub use parser::IndexParser;
pub use structures::*;
pub use validator::validate;
pub use variant::{ContainerVariant, RecordLayout};

use std::path::Path;
use std::sync::Arc;

use crate::codec::Decoder;
use crate::diagnostics::DiagnosticSink;
use crate::error::{Error, Result};
use crate::io::LocalFileReader;

/// Extract everything in `input` to files named after `output_prefix`.
///
/// The variant is chosen from the file name before the file is opened.
pub async fn extract_archive(
    input: &Path,
    output_prefix: &str,
    decoder: Arc<dyn Decoder>,
    sink: Arc<dyn DiagnosticSink>,
    options: ExtractOptions,
) -> Result<ExtractionReport> {
    let variant = ContainerVariant::classify(input)?;
    let naming = OutputNaming::new(output_prefix, input, variant);

    let reader = Arc::new(LocalFileReader::new(input).map_err(|source| Error::InputIo {
        path: input.to_path_buf(),
        source,
    })?);

    let Some(parser) = IndexParser::new(reader.clone(), variant, input) else {
        let mut report = ExtractionReport::default();
        match extract_single(input, decoder.as_ref(), &naming) {
            Ok(done) => {
                sink.entry_extracted(&done);
                report.extracted.push(done);
            }
            Err(error) => {
                let failure = EntryFailure {
                    index: 0,
                    sequence: None,
                    offset: None,
                    size: None,
                    error,
                };
                sink.entry_failed(&failure);
                return Err(failure.error);
            }
        }
        return Ok(report);
    };

    let table = parser.read_table().await?;
    Extractor::new(reader, decoder, sink)
        .with_options(options)
        .extract_all(&table, &naming)
        .await
}
