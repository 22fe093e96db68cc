//! MAX17135 HV PMIC Driver
//!
//! This module provides a driver for the Maxim MAX17135 e-paper display
//! power supply: positive/negative source drivers, gate drivers, a VCOM
//! reference and an 8-slot power-up/down timing sequencer.
//!
//! Datasheet: <https://www.analog.com/media/en/technical-documentation/data-sheets/MAX17135.pdf>

use std::time::Duration;

use async_trait::async_trait;
use bitflags::bitflags;
use tokio::time;

use crate::hw_trait::{self, HvPmic, HvRail, HwError, I2c, LineControl};
use crate::switch::SwitchId;
use crate::tracing::prelude::*;

/// Default MAX17135 I2C address
pub const HVPMIC_DEF_I2C_ADDR: u8 = 0x48;

/// Number of power sequencer timing slots
pub const HVPMIC_NB_TIMINGS: usize = 8;

/// MAX17135 register addresses
pub mod registers {
    pub const EXT_TEMP: u8 = 0x00;
    pub const CONF: u8 = 0x01;
    pub const INT_TEMP: u8 = 0x04;
    pub const TEMP_STAT: u8 = 0x05;
    pub const PROD_REV: u8 = 0x06;
    pub const PROD_ID: u8 = 0x07;
    pub const DVR: u8 = 0x08;
    pub const ENABLE: u8 = 0x09;
    pub const FAULT: u8 = 0x0A;
    pub const PROG: u8 = 0x0C;
    pub const TIMING_1: u8 = 0x10;
}

bitflags! {
    /// ENABLE register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Enable: u8 {
        const EN = 0x01;
        const CEN = 0x02;
        const CEN2 = 0x04;
    }
}

bitflags! {
    /// FAULT register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Fault: u8 {
        const FBPG = 0x01;
        const HVINP = 0x02;
        const HVINN = 0x04;
        const FBNG = 0x08;
        const HVINPSC = 0x10;
        const HVINNSC = 0x20;
        const OT = 0x40;
        /// Not a fault: all supplies are in regulation
        const POK = 0x80;
    }
}

/// CONF register: temperature sensor shutdown
const CONF_TEMP_SHUTDOWN: u8 = 0x01;

/// Power-OK polling: interval and number of attempts
const POK_POLL_INTERVAL: Duration = Duration::from_millis(5);
const POK_POLL_ATTEMPTS: u32 = 100;

impl From<HvRail> for Enable {
    fn from(rail: HvRail) -> Self {
        match rail {
            HvRail::En => Enable::EN,
            HvRail::Cen => Enable::CEN,
            HvRail::Cen2 => Enable::CEN2,
        }
    }
}

/// Rail names accepted by the `hvpmic` command.
pub const RAILS: &[SwitchId<HvRail>] = &[
    SwitchId::new("en", HvRail::En),
    SwitchId::new("cen", HvRail::Cen),
    SwitchId::new("cen2", HvRail::Cen2),
];

/// Temperature sensor selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempSensor {
    Internal,
    External,
}

/// Name of the most significant fault reported in a FAULT register value.
///
/// Returns `"NONE"` when no fault bit is set; the POK bit is ignored.
pub fn fault_name(fault: Fault) -> &'static str {
    let faults = fault.difference(Fault::POK);
    const NAMES: [(Fault, &str); 7] = [
        (Fault::FBPG, "FBPG"),
        (Fault::HVINP, "HVINP"),
        (Fault::HVINN, "HVINN"),
        (Fault::FBNG, "FBNG"),
        (Fault::HVINPSC, "HVINPSC"),
        (Fault::HVINNSC, "HVINNSC"),
        (Fault::OT, "OT"),
    ];
    NAMES
        .iter()
        .find(|(flag, _)| faults.contains(*flag))
        .map(|(_, name)| *name)
        .unwrap_or("NONE")
}

/// Convert a raw temperature register value to degrees Celsius.
///
/// The temperature is a 9-bit two's complement value left-aligned in the
/// 16-bit register, in 0.5 °C steps.
pub fn convert_temperature(raw: i16) -> f32 {
    (raw >> 7) as f32 * 0.5
}

/// MAX17135 driver
pub struct Max17135<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Max17135<I2C> {
    /// Create a new MAX17135 instance and log its identification.
    pub async fn init(i2c: I2C, address: u8) -> hw_trait::Result<Self> {
        let mut pmic = Self { i2c, address };
        let prod_id = pmic.read_byte(registers::PROD_ID).await?;
        let prod_rev = pmic.read_byte(registers::PROD_REV).await?;
        debug!("HVPMIC id: 0x{:02X}, rev: 0x{:02X}", prod_id, prod_rev);
        Ok(pmic)
    }

    pub async fn prod_id(&mut self) -> hw_trait::Result<u8> {
        self.read_byte(registers::PROD_ID).await
    }

    pub async fn prod_rev(&mut self) -> hw_trait::Result<u8> {
        self.read_byte(registers::PROD_REV).await
    }

    /// Read all the power sequencer timings, in milliseconds
    pub async fn timings(&mut self) -> hw_trait::Result<[u8; HVPMIC_NB_TIMINGS]> {
        let mut timings = [0u8; HVPMIC_NB_TIMINGS];
        self.i2c
            .write_read(self.address, &[registers::TIMING_1], &mut timings)
            .await?;
        Ok(timings)
    }

    /// Set one timing slot, in milliseconds
    pub async fn set_timing(&mut self, index: usize, ms: u8) -> hw_trait::Result<()> {
        if index >= HVPMIC_NB_TIMINGS {
            return Err(HwError::InvalidParameter(format!(
                "invalid timing number {} (valid: 0 - {})",
                index,
                HVPMIC_NB_TIMINGS - 1
            )));
        }
        self.write_byte(registers::TIMING_1 + index as u8, ms).await
    }

    /// Write the first `timings.len()` timing slots
    pub async fn set_timings(&mut self, timings: &[u8]) -> hw_trait::Result<()> {
        if timings.len() > HVPMIC_NB_TIMINGS {
            return Err(HwError::InvalidParameter(format!(
                "too many timings: {} (max: {})",
                timings.len(),
                HVPMIC_NB_TIMINGS
            )));
        }
        for (index, ms) in timings.iter().enumerate() {
            self.set_timing(index, *ms).await?;
        }
        Ok(())
    }

    /// Read the VCOM register (DVR)
    pub async fn vcom(&mut self) -> hw_trait::Result<u8> {
        self.read_byte(registers::DVR).await
    }

    /// Write the VCOM register (DVR)
    pub async fn set_vcom(&mut self, value: u8) -> hw_trait::Result<()> {
        self.write_byte(registers::DVR, value).await
    }

    pub async fn fault(&mut self) -> hw_trait::Result<Fault> {
        let value = self.read_byte(registers::FAULT).await?;
        Ok(Fault::from_bits_retain(value))
    }

    pub async fn enable(&mut self) -> hw_trait::Result<Enable> {
        let value = self.read_byte(registers::ENABLE).await?;
        Ok(Enable::from_bits_retain(value))
    }

    pub async fn temp_sensor_enabled(&mut self) -> hw_trait::Result<bool> {
        let conf = self.read_byte(registers::CONF).await?;
        Ok(conf & CONF_TEMP_SHUTDOWN == 0)
    }

    /// Read a temperature sensor, in degrees Celsius
    pub async fn temperature(&mut self, sensor: TempSensor) -> hw_trait::Result<f32> {
        let register = match sensor {
            TempSensor::Internal => registers::INT_TEMP,
            TempSensor::External => registers::EXT_TEMP,
        };
        let raw = self.read_word_be(register).await?;
        Ok(convert_temperature(raw as i16))
    }

    #[cfg(test)]
    pub(crate) fn bus(&self) -> &I2C {
        &self.i2c
    }

    // Helper methods for I2C operations

    async fn read_byte(&mut self, register: u8) -> hw_trait::Result<u8> {
        let mut data = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register], &mut data)
            .await?;
        Ok(data[0])
    }

    async fn write_byte(&mut self, register: u8, data: u8) -> hw_trait::Result<()> {
        self.i2c.write(self.address, &[register, data]).await
    }

    async fn read_word_be(&mut self, register: u8) -> hw_trait::Result<u16> {
        let mut data = [0u8; 2];
        self.i2c
            .write_read(self.address, &[register], &mut data)
            .await?;
        Ok(u16::from_be_bytes(data))
    }
}

#[async_trait]
impl<I2C: I2c> LineControl for Max17135<I2C> {
    type Line = HvRail;

    async fn get_line(&mut self, rail: HvRail) -> hw_trait::Result<bool> {
        Ok(self.enable().await?.contains(Enable::from(rail)))
    }

    async fn set_line(&mut self, rail: HvRail, on: bool) -> hw_trait::Result<()> {
        let mut enable = self.enable().await?;
        enable.set(Enable::from(rail), on);
        self.write_byte(registers::ENABLE, enable.bits()).await
    }
}

#[async_trait]
impl<I2C: I2c> HvPmic for Max17135<I2C> {
    async fn wait_for_power_ok(&mut self) -> hw_trait::Result<()> {
        for attempt in 0..POK_POLL_ATTEMPTS {
            let fault = self.fault().await?;

            if fault.contains(Fault::POK) {
                trace!(attempt, "POK");
                return Ok(());
            }

            let name = fault_name(fault);
            if name != "NONE" {
                error!("HVPMIC fault while waiting for POK: {}", name);
                return Err(HwError::Other(format!("HVPMIC fault: {}", name)));
            }

            time::sleep(POK_POLL_INTERVAL).await;
        }

        Err(HwError::Timeout("HVPMIC power-OK".into()))
    }
}
