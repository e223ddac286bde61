mod local;

pub use local::LocalFileReader;

use async_trait::async_trait;
use std::io;

/// Trait for random access reading from an immutable data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer.
    ///
    /// Fills as much of `buf` as the source holds past `offset` and returns
    /// the number of bytes read; a short count means the source ended.
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;
}
