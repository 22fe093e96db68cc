//! Addressable byte storage.

use async_trait::async_trait;

use super::Result;

/// An EEPROM-like store with a current position.
///
/// Reads and writes start at the position set by [`seek`](Self::seek) and
/// advance it. The block and page sizes are hints: implementations split
/// transfers so that no bus transaction exceeds the block size and no write
/// crosses a page boundary.
#[async_trait]
pub trait EepromDevice: Send {
    /// Total capacity in bytes.
    fn capacity(&self) -> usize;

    fn seek(&mut self, offset: usize);

    /// Read up to `buffer.len()` bytes, returning how many were read.
    async fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write all of `data`.
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    fn block_size(&self) -> usize;

    fn set_block_size(&mut self, size: usize);

    fn set_page_size(&mut self, size: usize);
}
