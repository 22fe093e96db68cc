//! In-memory devices for tests.

use std::collections::VecDeque;

use async_trait::async_trait;

use super::{EepromDevice, HwError, I2c, Result};

/// Records every write and answers reads from a queue of canned responses.
#[derive(Default)]
pub struct FakeI2c {
    pub writes: Vec<(u8, Vec<u8>)>,
    pub responses: VecDeque<Vec<u8>>,
    pub fail: bool,
}

impl FakeI2c {
    pub fn with_responses<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        Self {
            responses: responses.into_iter().collect(),
            ..Default::default()
        }
    }

    fn answer(&mut self, buffer: &mut [u8]) -> Result<()> {
        let response = self
            .responses
            .pop_front()
            .ok_or_else(|| HwError::Other("no scripted response".into()))?;
        let data = response.get(..buffer.len()).ok_or_else(|| {
            HwError::Other(format!(
                "scripted response of {} bytes for a {} byte read",
                response.len(),
                buffer.len()
            ))
        })?;
        buffer.copy_from_slice(data);
        Ok(())
    }
}

#[async_trait]
impl I2c for FakeI2c {
    async fn write(&mut self, address: u8, data: &[u8]) -> Result<()> {
        if self.fail {
            return Err(HwError::Other("NAK".into()));
        }
        self.writes.push((address, data.to_vec()));
        Ok(())
    }

    async fn read(&mut self, _address: u8, buffer: &mut [u8]) -> Result<()> {
        if self.fail {
            return Err(HwError::Other("NAK".into()));
        }
        self.answer(buffer)
    }

    async fn write_read(&mut self, address: u8, data: &[u8], buffer: &mut [u8]) -> Result<()> {
        if self.fail {
            return Err(HwError::Other("NAK".into()));
        }
        self.writes.push((address, data.to_vec()));
        self.answer(buffer)
    }
}

/// Memory-backed EEPROM.
///
/// `corrupt_at` makes the byte written at that offset read back inverted.
/// Any read or write covering `fail_at` fails without touching the data.
/// `max_read` caps the bytes returned by a single read.
pub struct FakeEeprom {
    pub data: Vec<u8>,
    pub position: usize,
    pub block_size: usize,
    pub page_size: usize,
    pub corrupt_at: Option<usize>,
    pub fail_at: Option<usize>,
    pub max_read: Option<usize>,
}

impl FakeEeprom {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0xFF; capacity],
            position: 0,
            block_size: 0,
            page_size: 0,
            corrupt_at: None,
            fail_at: None,
            max_read: None,
        }
    }

    fn check_fault(&self, len: usize) -> Result<()> {
        match self.fail_at {
            Some(offset) if (self.position..self.position + len).contains(&offset) => {
                Err(HwError::Other(format!("NAK at offset {}", offset)))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl EepromDevice for FakeEeprom {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn seek(&mut self, offset: usize) {
        self.position = offset.min(self.data.len());
    }

    async fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut n = buffer.len().min(self.data.len() - self.position);
        if let Some(max) = self.max_read {
            n = n.min(max);
        }
        self.check_fault(n)?;
        buffer[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > self.data.len() - self.position {
            return Err(HwError::InvalidParameter("write past end".into()));
        }
        self.check_fault(data.len())?;
        for (i, byte) in data.iter().enumerate() {
            let offset = self.position + i;
            self.data[offset] = if self.corrupt_at == Some(offset) { !byte } else { *byte };
        }
        self.position += data.len();
        Ok(())
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn set_block_size(&mut self, size: usize) {
        self.block_size = size;
    }

    fn set_page_size(&mut self, size: usize) {
        self.page_size = size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_short_scripted_response_is_an_error() {
        let mut i2c = FakeI2c::with_responses([vec![0x01]]);
        let mut buffer = [0u8; 2];

        let result = i2c.read(0x50, &mut buffer).await;
        assert!(matches!(result, Err(HwError::Other(_))));
        assert_eq!(buffer, [0, 0]);
    }

    #[tokio::test]
    async fn test_eeprom_fault_leaves_data_untouched() {
        let mut eeprom = FakeEeprom::new(64);
        eeprom.fail_at = Some(20);
        eeprom.seek(16);

        assert!(eeprom.write(&[0u8; 8]).await.is_err());
        assert!(eeprom.data.iter().all(|b| *b == 0xFF));
        assert_eq!(eeprom.position, 16);

        eeprom.seek(0);
        eeprom.write(&[0u8; 20]).await.unwrap();
        assert_eq!(eeprom.position, 20);
    }
}
