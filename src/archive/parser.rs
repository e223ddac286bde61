//! Index table parser.
//!
//! An indexed container starts with a little-endian `i32` entry count,
//! followed by one fixed-width record per entry:
//!
//! ```text
//! [count: i32]
//! [size: i32][offset: i32][sequence: i32][original_size: i32]   16-byte records
//! [size: i32][offset: i32][sequence: i32]                       12-byte records
//! ```
//!
//! The parser only checks that the table is structurally readable. Whether
//! each entry points somewhere sensible is the validator's job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, IndexDefect, Result};
use crate::io::ReadAt;

use super::structures::{COUNT_SIZE, IndexEntry, IndexTable};
use super::variant::{ContainerVariant, RecordLayout};

/// Reads the index table of an indexed container.
pub struct IndexParser<R: ReadAt> {
    reader: Arc<R>,
    variant: ContainerVariant,
    layout: RecordLayout,
    path: PathBuf,
}

impl<R: ReadAt> IndexParser<R> {
    /// Returns `None` for variants without an index table.
    pub fn new(reader: Arc<R>, variant: ContainerVariant, path: &Path) -> Option<Self> {
        Some(Self {
            layout: variant.record_layout()?,
            reader,
            variant,
            path: path.to_path_buf(),
        })
    }

    fn corrupt(&self, defect: IndexDefect) -> Error {
        Error::CorruptIndex {
            variant: self.variant.name(),
            path: self.path.clone(),
            defect,
        }
    }

    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.reader
            .read_at(offset, buf)
            .await
            .map_err(|source| Error::InputIo {
                path: self.path.clone(),
                source,
            })
    }

    /// Read the declared entry count. Fails on a short header or a count <= 0.
    pub async fn read_count(&self) -> Result<usize> {
        let mut buf = [0u8; COUNT_SIZE];
        let available = self.read_at(0, &mut buf).await?;
        if available < COUNT_SIZE {
            return Err(self.corrupt(IndexDefect::ShortHeader { available }));
        }

        let count = i32::from_le_bytes(buf);
        if count <= 0 {
            return Err(self.corrupt(IndexDefect::NonPositiveCount(count)));
        }
        Ok(count as usize)
    }

    /// Read the whole table.
    ///
    /// The records are fetched with a single read, clamped to what the source
    /// actually holds so a bogus count cannot force a huge allocation. The
    /// first record that does not fit ends parsing with
    /// [`IndexDefect::ShortRecord`].
    pub async fn read_table(&self) -> Result<IndexTable> {
        let count = self.read_count().await?;
        let width = self.layout.width;

        let wanted = count as u64 * width as u64;
        let present = self.reader.size().saturating_sub(COUNT_SIZE as u64);
        let mut records = vec![0u8; wanted.min(present) as usize];
        let available = self.read_at(COUNT_SIZE as u64, &mut records).await?;
        records.truncate(available);

        let mut entries = Vec::with_capacity(count.min(records.len() / width + 1));
        for index in 0..count {
            let start = index * width;
            let Some(record) = records.get(start..start + width) else {
                return Err(self.corrupt(IndexDefect::ShortRecord {
                    index,
                    available: records.len().saturating_sub(start),
                    width,
                }));
            };
            let entry = IndexEntry::from_record(index, record, self.layout).map_err(|_| {
                self.corrupt(IndexDefect::ShortRecord {
                    index,
                    available: record.len(),
                    width,
                })
            })?;
            entries.push(entry);
        }

        Ok(IndexTable {
            variant: self.variant,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory source that counts reads.
    struct MemReader {
        data: Vec<u8>,
        reads: AtomicUsize,
    }

    impl MemReader {
        fn new(data: Vec<u8>) -> Arc<Self> {
            Arc::new(Self {
                data,
                reads: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ReadAt for MemReader {
        async fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let start = (offset as usize).min(self.data.len());
            let n = buf.len().min(self.data.len() - start);
            buf[..n].copy_from_slice(&self.data[start..start + n]);
            Ok(n)
        }

        fn size(&self) -> u64 {
            self.data.len() as u64
        }
    }

    fn table(count: i32, records: &[&[i32]]) -> Vec<u8> {
        let mut out = count.to_le_bytes().to_vec();
        for record in records {
            for field in *record {
                out.extend_from_slice(&field.to_le_bytes());
            }
        }
        out
    }

    fn parser_over(data: Vec<u8>, variant: ContainerVariant) -> (Arc<MemReader>, IndexParser<MemReader>) {
        let reader = MemReader::new(data);
        let parser = IndexParser::new(reader.clone(), variant, Path::new("test.ovk")).unwrap();
        (reader, parser)
    }

    #[tokio::test]
    async fn reads_full_records() {
        let data = table(2, &[&[100, 36, 1, 400], &[50, 136, 2, 200]]);
        let (_, parser) = parser_over(data, ContainerVariant::IndexedTypeB);

        let table = parser.read_table().await.unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.entries[0].size, 100);
        assert_eq!(table.entries[0].offset, 36);
        assert_eq!(table.entries[1].sequence, 2);
        assert_eq!(table.entries[1].original_size, Some(200));
    }

    #[tokio::test]
    async fn reads_compact_records() {
        let data = table(3, &[&[10, 40, 7], &[10, 50, 8], &[10, 60, 9]]);
        let (_, parser) = parser_over(data, ContainerVariant::IndexedTypeA);

        let table = parser.read_table().await.unwrap();
        let sequences: Vec<i32> = table.entries.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![7, 8, 9]);
        assert!(table.entries.iter().all(|e| e.original_size.is_none()));
        assert_eq!(table.entries[2].index, 2);
    }

    #[tokio::test]
    async fn non_positive_count_fails_before_records() {
        for count in [0, -1, i32::MIN] {
            let (reader, parser) = parser_over(table(count, &[&[1, 2, 3, 4]]), ContainerVariant::IndexedTypeB);
            let err = parser.read_table().await.unwrap_err();
            match err {
                Error::CorruptIndex { variant, defect, .. } => {
                    assert_eq!(variant, "Ogg-ovk");
                    assert_eq!(defect, IndexDefect::NonPositiveCount(count));
                }
                other => panic!("unexpected {other:?}"),
            }
            assert_eq!(reader.reads.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn short_header_is_corrupt() {
        let (_, parser) = parser_over(vec![1, 0], ContainerVariant::IndexedTypeA);
        let err = parser.read_table().await.unwrap_err();
        assert!(matches!(
            err,
            Error::CorruptIndex {
                variant: "Koe-nwk",
                defect: IndexDefect::ShortHeader { available: 2 },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn short_record_stops_parsing() {
        let mut data = table(2, &[&[100, 36, 1, 400]]);
        data.extend_from_slice(&[0u8; 10]);
        let (_, parser) = parser_over(data, ContainerVariant::IndexedTypeB);

        let err = parser.read_table().await.unwrap_err();
        assert!(matches!(
            err,
            Error::CorruptIndex {
                defect: IndexDefect::ShortRecord {
                    index: 1,
                    available: 10,
                    width: 16
                },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn huge_count_does_not_allocate_table() {
        let (_, parser) = parser_over(table(i32::MAX, &[&[1, 2, 3]]), ContainerVariant::IndexedTypeA);
        let err = parser.read_table().await.unwrap_err();
        assert!(matches!(
            err,
            Error::CorruptIndex {
                defect: IndexDefect::ShortRecord { index: 1, .. },
                ..
            }
        ));
    }

    #[test]
    fn single_stream_has_no_parser() {
        let reader = MemReader::new(Vec::new());
        assert!(IndexParser::new(reader, ContainerVariant::SingleStream, Path::new("a.nwa")).is_none());
    }
}
