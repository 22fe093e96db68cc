//! DAC5820 dual 8-bit DAC Driver
//!
//! Channel A drives the VCOM reference on the display interface board.
//!
//! Every command is a two-byte write. The high nibble of the first byte is
//! the command; for output updates the 8-bit value straddles the remaining
//! nibbles:
//!
//! ```text
//! [ C3 C2 C1 C0 D7 D6 D5 D4 ] [ D3 D2 D1 D0 x x x x ]
//! ```
//!
//! The extended command (`0xF`) carries the power-down mode and channel
//! mask in its second byte.

use async_trait::async_trait;

use crate::hw_trait::{self, DacChannel, DacPowerMode, I2c, VcomDac};
use crate::tracing::prelude::*;

/// Default DAC5820 I2C address
pub const DAC5820_DEF_I2C_ADDR: u8 = 0x38;

mod commands {
    pub const LOAD_UPDATE_A: u8 = 0x0;
    pub const LOAD_UPDATE_B: u8 = 0x1;
    pub const EXTENDED: u8 = 0xF;
}

mod power_down {
    pub const ON: u8 = 0b00;
    pub const OFF_1K: u8 = 0b01;
    pub const OFF_100K: u8 = 0b10;
    pub const OFF_FLOAT: u8 = 0b11;
}

fn channel_mask(channel: DacChannel) -> u8 {
    match channel {
        DacChannel::A => 0x01,
        DacChannel::B => 0x02,
    }
}

/// Encode an output update command.
pub fn encode_output(channel: DacChannel, value: u8) -> [u8; 2] {
    let command = match channel {
        DacChannel::A => commands::LOAD_UPDATE_A,
        DacChannel::B => commands::LOAD_UPDATE_B,
    };
    [(command << 4) | (value >> 4), (value & 0x0F) << 4]
}

/// Encode a power mode command.
pub fn encode_power(channel: DacChannel, mode: DacPowerMode) -> [u8; 2] {
    let pd = match mode {
        DacPowerMode::On => power_down::ON,
        DacPowerMode::Off1k => power_down::OFF_1K,
        DacPowerMode::Off100k => power_down::OFF_100K,
        DacPowerMode::OffFloat => power_down::OFF_FLOAT,
    };
    [commands::EXTENDED << 4, (pd << 4) | channel_mask(channel)]
}

/// DAC5820 driver
pub struct Dac5820<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Dac5820<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }
}

#[async_trait]
impl<I2C: I2c> VcomDac for Dac5820<I2C> {
    async fn set_power(&mut self, channel: DacChannel, mode: DacPowerMode) -> hw_trait::Result<()> {
        debug!(%channel, %mode, "DAC power");
        self.i2c.write(self.address, &encode_power(channel, mode)).await
    }

    async fn output(&mut self, channel: DacChannel, value: u8) -> hw_trait::Result<()> {
        debug!(%channel, value, "DAC output");
        self.i2c.write(self.address, &encode_output(channel, value)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw_trait::fake::FakeI2c;
    use test_case::test_case;

    #[test_case(DacChannel::A, 0x00 => [0x00, 0x00])]
    #[test_case(DacChannel::A, 0x80 => [0x08, 0x00]; "mid scale")]
    #[test_case(DacChannel::A, 0xFF => [0x0F, 0xF0]; "full scale")]
    #[test_case(DacChannel::B, 0xA5 => [0x1A, 0x50])]
    fn test_encode_output(channel: DacChannel, value: u8) -> [u8; 2] {
        encode_output(channel, value)
    }

    #[test_case(DacChannel::A, DacPowerMode::On => [0xF0, 0x01])]
    #[test_case(DacChannel::A, DacPowerMode::Off100k => [0xF0, 0x21])]
    #[test_case(DacChannel::B, DacPowerMode::OffFloat => [0xF0, 0x32])]
    #[test_case(DacChannel::B, DacPowerMode::Off1k => [0xF0, 0x12])]
    fn test_encode_power(channel: DacChannel, mode: DacPowerMode) -> [u8; 2] {
        encode_power(channel, mode)
    }

    #[tokio::test]
    async fn test_output_writes_to_device() {
        let mut dac = Dac5820::new(FakeI2c::default(), DAC5820_DEF_I2C_ADDR);
        dac.output(DacChannel::A, 128).await.unwrap();
        assert_eq!(dac.i2c.writes, vec![(DAC5820_DEF_I2C_ADDR, vec![0x08, 0x00])]);
    }
}
