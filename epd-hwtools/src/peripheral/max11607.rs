//! MAX11607 4-channel 10-bit ADC Driver
//!
//! Channel 1 is wired to the VCOM output through a 1:10 divider.
//!
//! Datasheet: <https://www.analog.com/media/en/technical-documentation/data-sheets/MAX11606-MAX11611.pdf>

use strum::{Display, EnumString};

use crate::hw_trait::{self, HwError, I2c};
use crate::tracing::prelude::*;

/// MAX11607 I2C address (fixed by the part)
pub const ADC11607_DEF_I2C_ADDR: u8 = 0x34;

/// Number of analog inputs
pub const ADC11607_NB_CHANNELS: usize = 4;

/// Scale factor between the VCOM channel reading and the VCOM voltage
pub const VCOM_COEFF: f32 = 10.0;

/// Channel carrying the divided VCOM voltage
pub const VCOM_CHANNEL: usize = 1;

const SETUP: u8 = 0x80;
const SETUP_NO_RESET: u8 = 0x02;
const CONFIG_SINGLE_ENDED: u8 = 0x01;

const RESULT_MASK: u16 = 0x03FF;
const RESULT_MAX: u16 = 0x03FF;

/// Reference voltage selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
pub enum Reference {
    #[default]
    #[strum(serialize = "internal")]
    Internal,
    #[strum(serialize = "external")]
    External,
    #[strum(serialize = "vdd")]
    Vdd,
}

impl Reference {
    // SEL2..SEL0 bits of the setup byte
    fn sel_bits(self) -> u8 {
        match self {
            Reference::Vdd => 0b000,
            Reference::External => 0b010,
            Reference::Internal => 0b101,
        }
    }

    /// Reference voltage in volts.
    ///
    /// The external reference is assumed to be the 2.5 V fitted on the
    /// display interface board.
    pub fn volts(self) -> f32 {
        match self {
            Reference::Internal => 2.048,
            Reference::External => 2.5,
            Reference::Vdd => 3.3,
        }
    }
}

/// MAX11607 driver
pub struct Max11607<I2C> {
    i2c: I2C,
    address: u8,
    reference: Reference,
    results: [Option<u16>; ADC11607_NB_CHANNELS],
}

impl<I2C: I2c> Max11607<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            reference: Reference::default(),
            results: [None; ADC11607_NB_CHANNELS],
        }
    }

    pub fn nb_channels(&self) -> usize {
        ADC11607_NB_CHANNELS
    }

    /// Select the reference voltage.
    pub async fn set_reference(&mut self, reference: Reference) -> hw_trait::Result<()> {
        let setup = SETUP | (reference.sel_bits() << 4) | SETUP_NO_RESET;
        self.i2c.write(self.address, &[setup]).await?;
        self.reference = reference;
        self.results = [None; ADC11607_NB_CHANNELS];
        debug!(%reference, "ADC reference selected");
        Ok(())
    }

    /// Convert all channels and latch the results.
    pub async fn read_results(&mut self) -> hw_trait::Result<()> {
        // Scan AIN0 up to the last channel, single-ended
        let config = (((ADC11607_NB_CHANNELS - 1) as u8) << 1) | CONFIG_SINGLE_ENDED;
        let mut data = [0u8; ADC11607_NB_CHANNELS * 2];
        self.i2c
            .write_read(self.address, &[config], &mut data)
            .await?;

        for (channel, pair) in data.chunks_exact(2).enumerate() {
            let raw = u16::from_be_bytes([pair[0], pair[1]]) & RESULT_MASK;
            self.results[channel] = Some(raw);
        }
        trace!(results = ?self.results, "ADC results");
        Ok(())
    }

    /// Latched raw result of `channel`.
    pub fn result(&self, channel: usize) -> hw_trait::Result<u16> {
        self.results
            .get(channel)
            .copied()
            .flatten()
            .ok_or_else(|| HwError::InvalidParameter(format!("no result for channel {}", channel)))
    }

    pub fn volts(&self, result: u16) -> f32 {
        result as f32 * self.reference.volts() / (RESULT_MAX as f32 + 1.0)
    }

    pub fn millivolts(&self, result: u16) -> u32 {
        (result as u32 * (self.reference.volts() * 1000.0) as u32) / (RESULT_MAX as u32 + 1)
    }
}
