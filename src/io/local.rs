use super::ReadAt;
use async_trait::async_trait;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Local file reader with random access support.
///
/// Every [`read_at`](ReadAt::read_at) call opens its own read-only handle, so
/// concurrent readers never share a file cursor.
pub struct LocalFileReader {
    path: PathBuf,
    size: u64,
}

impl LocalFileReader {
    pub fn new(path: &Path) -> io::Result<Self> {
        let size = std::fs::metadata(path)?.len();
        Ok(Self {
            path: path.to_path_buf(),
            size,
        })
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(offset)).await?;

        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]).await? {
                0 => break,
                n => filled += n,
            }
        }
        Ok(filled)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    fn sample_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        file.write_all(&data).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn reads_exact_range() {
        let file = sample_file();
        let reader = LocalFileReader::new(file.path()).unwrap();
        assert_eq!(reader.size(), 4096);

        let mut buf = [0u8; 4];
        let n = reader.read_at(254, &mut buf).await.unwrap();
        assert_eq!(n, 4);
        assert_eq!(buf, [254, 255, 0, 1]);
    }

    #[tokio::test]
    async fn short_count_at_end_of_file() {
        let file = sample_file();
        let reader = LocalFileReader::new(file.path()).unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(reader.read_at(4090, &mut buf).await.unwrap(), 6);
        assert_eq!(reader.read_at(5000, &mut buf).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reads_do_not_interfere() {
        let file = sample_file();
        let reader = Arc::new(LocalFileReader::new(file.path()).unwrap());

        let mut tasks = tokio::task::JoinSet::new();
        for start in (0..4096u64).step_by(256) {
            let reader = reader.clone();
            tasks.spawn(async move {
                let mut buf = vec![0u8; 256];
                let n = reader.read_at(start, &mut buf).await.unwrap();
                (start, n, buf)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (start, n, buf) = joined.unwrap();
            assert_eq!(n, 256);
            assert_eq!(buf[0] as u64, start % 256);
            assert!(buf.iter().enumerate().all(|(i, b)| *b as usize == i));
        }
    }
}
