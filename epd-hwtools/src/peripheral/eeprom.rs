//! 24xx-class serial EEPROM Driver
//!
//! Two-byte (big-endian) word addressing. Reads may run across pages; page
//! writes must not, and the device does not acknowledge its address while
//! an internal write cycle is in progress.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time;

use crate::hw_trait::{self, EepromDevice, HwError, I2c};
use crate::tracing::prelude::*;

/// Default display EEPROM I2C address
pub const EEPROM_DEF_I2C_ADDR: u8 = 0x50;

/// Capacity of the display EEPROM (24AA256)
pub const EEPROM_DEF_SIZE: usize = 32 * 1024;

/// Default maximum I2C transfer size, address bytes included
pub const EEPROM_DEF_BLOCK_SIZE: usize = 96;

pub const EEPROM_DEF_PAGE_SIZE: usize = 64;

const ADDRESS_BYTES: usize = 2;

/// Write cycle completion polling
const WRITE_POLL_INTERVAL: Duration = Duration::from_millis(1);
const WRITE_POLL_ATTEMPTS: u32 = 20;

/// 24xx EEPROM driver
pub struct Eeprom24<I2C> {
    i2c: I2C,
    address: u8,
    size: usize,
    position: usize,
    block_size: usize,
    page_size: usize,
}

impl<I2C: I2c> Eeprom24<I2C> {
    pub fn new(i2c: I2C, address: u8, size: usize) -> Self {
        Self {
            i2c,
            address,
            size,
            position: 0,
            block_size: EEPROM_DEF_BLOCK_SIZE,
            page_size: EEPROM_DEF_PAGE_SIZE,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    fn word_address(&self) -> [u8; ADDRESS_BYTES] {
        (self.position as u16).to_be_bytes()
    }

    // Data bytes that fit in one transaction next to the word address
    fn payload_limit(&self) -> usize {
        self.block_size.saturating_sub(ADDRESS_BYTES).max(1)
    }

    async fn wait_write_cycle(&mut self) -> hw_trait::Result<()> {
        let word = self.word_address();
        for _ in 0..WRITE_POLL_ATTEMPTS {
            time::sleep(WRITE_POLL_INTERVAL).await;
            if self.i2c.write(self.address, &word).await.is_ok() {
                return Ok(());
            }
        }
        Err(HwError::Timeout("EEPROM write cycle".into()))
    }
}

#[async_trait]
impl<I2C: I2c> EepromDevice for Eeprom24<I2C> {
    fn capacity(&self) -> usize {
        self.size
    }

    fn seek(&mut self, offset: usize) {
        self.position = offset.min(self.size);
    }

    async fn read(&mut self, buffer: &mut [u8]) -> hw_trait::Result<usize> {
        let total = buffer.len().min(self.size - self.position);
        let mut done = 0;

        while done < total {
            let chunk = (total - done).min(self.block_size);
            let word = self.word_address();
            self.i2c
                .write_read(self.address, &word, &mut buffer[done..done + chunk])
                .await?;
            self.position += chunk;
            done += chunk;
        }

        Ok(total)
    }

    async fn write(&mut self, data: &[u8]) -> hw_trait::Result<()> {
        if data.len() > self.size - self.position {
            return Err(HwError::InvalidParameter(format!(
                "write of {} bytes at 0x{:04X} exceeds EEPROM size {}",
                data.len(),
                self.position,
                self.size
            )));
        }

        let mut done = 0;
        while done < data.len() {
            let page_left = self.page_size - (self.position % self.page_size);
            let chunk = (data.len() - done).min(page_left).min(self.payload_limit());

            let mut frame = Vec::with_capacity(ADDRESS_BYTES + chunk);
            frame.extend_from_slice(&self.word_address());
            frame.extend_from_slice(&data[done..done + chunk]);
            self.i2c.write(self.address, &frame).await?;

            self.wait_write_cycle().await?;
            self.position += chunk;
            done += chunk;
        }

        Ok(())
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn set_block_size(&mut self, size: usize) {
        debug!(size, "EEPROM I2C block size");
        self.block_size = size.max(ADDRESS_BYTES + 1);
    }

    fn set_page_size(&mut self, size: usize) {
        debug!(size, "EEPROM page size");
        self.page_size = size.max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw_trait::fake::FakeI2c;

    #[tokio::test(start_paused = true)]
    async fn test_write_splits_on_page_boundary() {
        let mut eeprom = Eeprom24::new(FakeI2c::default(), EEPROM_DEF_I2C_ADDR, EEPROM_DEF_SIZE);
        eeprom.seek(60);

        eeprom.write(&[0xAA; 10]).await.unwrap();

        // data frame, poll, data frame, poll
        let frames: Vec<_> = eeprom.i2c.writes.iter().map(|(_, f)| f.clone()).collect();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0][..2], [0x00, 60]);
        assert_eq!(frames[0].len(), 2 + 4);
        assert_eq!(frames[2][..2], [0x00, 64]);
        assert_eq!(frames[2].len(), 2 + 6);
        assert_eq!(eeprom.position(), 70);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_respects_block_size() {
        let mut eeprom = Eeprom24::new(FakeI2c::default(), EEPROM_DEF_I2C_ADDR, EEPROM_DEF_SIZE);
        eeprom.set_block_size(18);

        eeprom.write(&[0x55; 40]).await.unwrap();

        let data_frames: Vec<_> = eeprom
            .i2c
            .writes
            .iter()
            .map(|(_, f)| f.len())
            .filter(|len| *len > 2)
            .collect();
        assert_eq!(data_frames, vec![18, 18, 10]);
    }

    #[tokio::test]
    async fn test_read_clamps_at_end() {
        let i2c = FakeI2c::with_responses([vec![1, 2, 3, 4]]);
        let mut eeprom = Eeprom24::new(i2c, EEPROM_DEF_I2C_ADDR, 16);
        eeprom.seek(12);

        let mut buffer = [0u8; 8];
        let n = eeprom.read(&mut buffer).await.unwrap();

        assert_eq!(n, 4);
        assert_eq!(&buffer[..4], &[1, 2, 3, 4]);
        assert_eq!(eeprom.i2c.writes, vec![(EEPROM_DEF_I2C_ADDR, vec![0x00, 12])]);
    }

    #[tokio::test]
    async fn test_write_past_end_is_rejected() {
        let mut eeprom = Eeprom24::new(FakeI2c::default(), EEPROM_DEF_I2C_ADDR, 16);
        eeprom.seek(10);
        assert!(eeprom.write(&[0; 8]).await.is_err());
        assert!(eeprom.i2c.writes.is_empty());
    }
}
