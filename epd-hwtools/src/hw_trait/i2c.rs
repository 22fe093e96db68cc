//! I2C bus trait.

use async_trait::async_trait;

use super::Result;

/// Register-level access to devices on an I2C bus.
///
/// Addresses are 7-bit. Every call is one complete bus transaction; a
/// `write_read` keeps the bus between its two phases (repeated start).
#[async_trait]
pub trait I2c: Send {
    /// Write `data` to the device at `address`.
    async fn write(&mut self, address: u8, data: &[u8]) -> Result<()>;

    /// Read `buffer.len()` bytes from the device at `address`.
    async fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<()>;

    /// Write `data`, then read `buffer.len()` bytes in the same transaction.
    async fn write_read(&mut self, address: u8, data: &[u8], buffer: &mut [u8]) -> Result<()>;
}
