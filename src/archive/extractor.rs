use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::codec::{self, DecodeError, Decoder};
use crate::diagnostics::DiagnosticSink;
use crate::error::{Error, ReadCause, Result};
use crate::io::ReadAt;

use super::naming::OutputNaming;
use super::structures::{EntryFailure, ExtractedEntry, ExtractionReport, IndexEntry, IndexTable};
use super::validator;

/// Copy granularity between a decoded stream and its output file.
const COPY_CHUNK: usize = 64 * 1024;

/// What the coordinator does when an entry fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FailurePolicy {
    /// Cancel the remaining entries and return the first error.
    #[default]
    Abort,
    /// Run every entry and report all failures at the end.
    Collect,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    pub policy: FailurePolicy,
    /// Upper bound on entries in flight; unbounded when `None`.
    pub max_concurrency: Option<NonZeroUsize>,
}

/// Extracts every entry of an indexed container, one task per entry.
pub struct Extractor<R: ReadAt> {
    reader: Arc<R>,
    decoder: Arc<dyn Decoder>,
    sink: Arc<dyn DiagnosticSink>,
    options: ExtractOptions,
}

impl<R: ReadAt + 'static> Extractor<R> {
    pub fn new(reader: Arc<R>, decoder: Arc<dyn Decoder>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            reader,
            decoder,
            sink,
            options: ExtractOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate `table` and extract all of its entries concurrently.
    ///
    /// With [`FailurePolicy::Abort`] the first failure cancels the remaining
    /// tasks and is returned as the error; files already written stay on
    /// disk. With [`FailurePolicy::Collect`] the report lists every failure.
    pub async fn extract_all(
        &self,
        table: &IndexTable,
        naming: &OutputNaming,
    ) -> Result<ExtractionReport> {
        validator::validate(table)?;

        let decoder = table.variant.decodes_entries().then(|| self.decoder.clone());
        let limiter = self
            .options
            .max_concurrency
            .map(|n| Arc::new(Semaphore::new(n.get())));

        let mut tasks = JoinSet::new();
        let mut owners = HashMap::with_capacity(table.len());
        for entry in table.entries.iter().copied() {
            let reader = self.reader.clone();
            let decoder = decoder.clone();
            let limiter = limiter.clone();
            let path = naming.entry_path(entry.sequence);

            let handle = tasks.spawn(async move {
                let outcome = match limiter {
                    Some(limiter) => match limiter.acquire_owned().await {
                        Ok(_permit) => {
                            extract_entry(reader.as_ref(), decoder, &entry, &path).await
                        }
                        Err(e) => Err(Error::TaskFailed {
                            index: entry.index,
                            reason: e.to_string(),
                        }),
                    },
                    None => extract_entry(reader.as_ref(), decoder, &entry, &path).await,
                };
                (entry, path, outcome)
            });
            owners.insert(handle.id(), entry);
        }

        let mut report = ExtractionReport::default();

        while let Some(joined) = tasks.join_next_with_id().await {
            let (entry, path, outcome) = match joined {
                Ok((_, done)) => done,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => {
                    // A panicked task never reports its entry.
                    let Some(entry) = owners.get(&e.id()).copied() else {
                        continue;
                    };
                    let failed = Error::TaskFailed {
                        index: entry.index,
                        reason: e.to_string(),
                    };
                    (entry, naming.entry_path(entry.sequence), Err(failed))
                }
            };

            match outcome {
                Ok(bytes_written) => {
                    let done = ExtractedEntry {
                        index: entry.index,
                        sequence: Some(entry.sequence),
                        path,
                        bytes_written,
                    };
                    self.sink.entry_extracted(&done);
                    report.extracted.push(done);
                }
                Err(error) => {
                    let failure = EntryFailure::for_entry(&entry, error);
                    self.sink.entry_failed(&failure);
                    if self.options.policy == FailurePolicy::Abort {
                        tasks.shutdown().await;
                        return Err(failure.error);
                    }
                    report.failures.push(failure);
                }
            }
        }

        report.extracted.sort_by_key(|e| e.index);
        report.failures.sort_by_key(|f| f.index);
        Ok(report)
    }
}

/// Read one entry's byte range and write it (decoded if needed) to `path`.
async fn extract_entry<R: ReadAt + ?Sized>(
    reader: &R,
    decoder: Option<Arc<dyn Decoder>>,
    entry: &IndexEntry,
    path: &Path,
) -> Result<u64> {
    let (offset, size) = entry.byte_range().ok_or(Error::InvalidEntry {
        index: entry.index,
        sequence: entry.sequence,
        offset: entry.offset,
        size: entry.size,
    })?;

    let truncated = |cause| Error::TruncatedRead {
        filename: path.to_path_buf(),
        offset,
        size,
        cause,
    };

    if offset + size > reader.size() {
        let read = reader.size().saturating_sub(offset);
        return Err(truncated(ReadCause::ShortRead { read }));
    }

    let mut buf = vec![0u8; size as usize];
    let read = reader
        .read_at(offset, &mut buf)
        .await
        .map_err(|e| truncated(e.into()))?;
    if read < buf.len() {
        return Err(truncated(ReadCause::ShortRead { read: read as u64 }));
    }

    let data: Arc<[u8]> = buf.into();
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_output(decoder.as_deref(), data, &target))
        .await
        .map_err(|e| Error::TaskFailed {
            index: entry.index,
            reason: e.to_string(),
        })?
}

/// Decode `data` (when a decoder is given) and write the result to `path`.
///
/// Creates or truncates `path`. A decode error surfacing mid-stream removes
/// the partial file. Returns the number of bytes written.
pub fn write_output(decoder: Option<&dyn Decoder>, data: Arc<[u8]>, path: &Path) -> Result<u64> {
    let decode_failed = |source| Error::DecodeFailed {
        filename: path.to_path_buf(),
        source,
    };
    let output_io = |source| Error::OutputIo {
        path: path.to_path_buf(),
        source,
    };

    let mut stream = match decoder {
        Some(decoder) => decoder.decode(data).map_err(decode_failed)?,
        None => codec::passthrough(data),
    };

    let mut out = fs::File::create(path).map_err(output_io)?;
    let mut chunk = vec![0u8; COPY_CHUNK];
    let mut written = 0u64;
    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                drop(out);
                let _ = fs::remove_file(path);
                return Err(decode_failed(DecodeError::from_io(e)));
            }
        };
        out.write_all(&chunk[..n]).map_err(output_io)?;
        written += n as u64;
    }
    out.flush().map_err(output_io)?;

    Ok(written)
}

/// Decode a single-stream input into `naming.single_path()` on the calling
/// thread.
pub fn extract_single(
    input: &Path,
    decoder: &dyn Decoder,
    naming: &OutputNaming,
) -> Result<ExtractedEntry> {
    let data = fs::read(input).map_err(|source| Error::InputIo {
        path: input.to_path_buf(),
        source,
    })?;

    let path: PathBuf = naming.single_path();
    let bytes_written = write_output(Some(decoder), data.into(), &path)?;
    Ok(ExtractedEntry {
        index: 0,
        sequence: None,
        path,
        bytes_written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ContainerVariant;
    use crate::codec::{DecodedStream, NwaDecoder};
    use crate::diagnostics::NullSink;
    use async_trait::async_trait;
    use std::io;

    /// In-memory source whose task panics when `poisoned` is requested.
    struct PanickingReader {
        data: Vec<u8>,
        poisoned: u64,
    }

    #[async_trait]
    impl ReadAt for PanickingReader {
        async fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
            assert_ne!(offset, self.poisoned, "read of poisoned range");
            let start = (offset as usize).min(self.data.len());
            let n = buf.len().min(self.data.len() - start);
            buf[..n].copy_from_slice(&self.data[start..start + n]);
            Ok(n)
        }

        fn size(&self) -> u64 {
            self.data.len() as u64
        }
    }

    /// Yields a few bytes, then fails.
    struct FailingDecoder;

    struct FailingStream {
        sent: bool,
    }

    impl Read for FailingStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(DecodeError::CorruptBlock {
                    block: 3,
                    reason: "bad code",
                }
                .into_io());
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"RIFF");
            Ok(4)
        }
    }

    impl Decoder for FailingDecoder {
        fn decode(&self, _input: Arc<[u8]>) -> std::result::Result<DecodedStream, DecodeError> {
            Ok(Box::new(FailingStream { sent: false }))
        }
    }

    struct RejectingDecoder;

    impl Decoder for RejectingDecoder {
        fn decode(&self, _input: Arc<[u8]>) -> std::result::Result<DecodedStream, DecodeError> {
            Err(DecodeError::InvalidHeader("not an nwa stream"))
        }
    }

    #[test]
    fn passthrough_writes_input_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.ogg");

        let written = write_output(None, Arc::from(&b"OggS payload"[..]), &path).unwrap();

        assert_eq!(written, 12);
        assert_eq!(fs::read(&path).unwrap(), b"OggS payload");
    }

    #[test]
    fn mid_stream_failure_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");

        let err = write_output(Some(&FailingDecoder), Arc::from(&[0u8; 8][..]), &path).unwrap_err();

        match err {
            Error::DecodeFailed { filename, source } => {
                assert_eq!(filename, path);
                assert!(matches!(source, DecodeError::CorruptBlock { block: 3, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!path.exists());
    }

    #[test]
    fn rejected_stream_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");

        let err = write_output(Some(&RejectingDecoder), Arc::from(&[0u8; 8][..]), &path).unwrap_err();

        assert!(matches!(err, Error::DecodeFailed { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_output_is_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("clip.ogg");

        let err = write_output(None, Arc::from(&b"data"[..]), &path).unwrap_err();

        assert!(matches!(err, Error::OutputIo { .. }));
    }

    #[tokio::test]
    async fn panicked_task_is_charged_to_its_own_entry() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = format!("{}/", dir.path().display());
        let naming = OutputNaming::new(&prefix, Path::new("voice.ovk"), ContainerVariant::IndexedTypeB);
        let table = IndexTable {
            variant: ContainerVariant::IndexedTypeB,
            entries: (0..4)
                .map(|i| IndexEntry {
                    index: i,
                    size: 4,
                    offset: 4 + 4 * i as i32,
                    sequence: 10 + i as i32,
                    original_size: Some(4),
                })
                .collect(),
        };
        let reader = Arc::new(PanickingReader {
            data: vec![7u8; 20],
            poisoned: 12,
        });

        let report = Extractor::new(reader, Arc::new(NwaDecoder), Arc::new(NullSink))
            .with_options(ExtractOptions {
                policy: FailurePolicy::Collect,
                max_concurrency: None,
            })
            .extract_all(&table, &naming)
            .await
            .unwrap();

        let extracted: Vec<usize> = report.extracted.iter().map(|e| e.index).collect();
        assert_eq!(extracted, vec![0, 1, 3]);
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.index, 2);
        assert_eq!(failure.sequence, Some(12));
        assert!(matches!(failure.error, Error::TaskFailed { index: 2, .. }));
        assert!(!dir.path().join("voice-12.ogg").exists());
    }
}
