//! Device handles for one command.
//!
//! Each device is opened on first use, on its own handle to the configured
//! I2C bus, at its default address unless the configuration overrides it.
//! Handles live as long as the context and are closed when it is dropped.

use crate::abort::AbortSignal;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::hw_trait::LinuxI2c;
use crate::peripheral::{
    cpld::CPLD_DEF_I2C_ADDR,
    dac5820::DAC5820_DEF_I2C_ADDR,
    eeprom::{EEPROM_DEF_I2C_ADDR, EEPROM_DEF_SIZE},
    max11607::ADC11607_DEF_I2C_ADDR,
    max17135::HVPMIC_DEF_I2C_ADDR,
    pbtn::PBTN_DEF_I2C_ADDR,
    ButtonPad, Cpld, Dac5820, Eeprom24, Max11607, Max17135,
};
use crate::tracing::prelude::*;

pub type Bus = LinuxI2c;

pub struct DeviceContext {
    config: Config,
    abort: AbortSignal,
    cpld: Option<Cpld<Bus>>,
    hvpmic: Option<Max17135<Bus>>,
    dac: Option<Dac5820<Bus>>,
    adc: Option<Max11607<Bus>>,
    pbtn: Option<ButtonPad<Bus>>,
    eeprom: Option<Eeprom24<Bus>>,
}

impl DeviceContext {
    pub fn new(config: Config, abort: AbortSignal) -> Self {
        Self {
            config,
            abort,
            cpld: None,
            hvpmic: None,
            dac: None,
            adc: None,
            pbtn: None,
            eeprom: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn abort(&self) -> &AbortSignal {
        &self.abort
    }

    fn open_bus(&self, device: &str, address: u8) -> Result<Bus> {
        debug!(
            "Opening {} at 0x{:02X} on {}",
            device,
            address,
            self.config.i2c_bus.display()
        );
        Ok(LinuxI2c::open(&self.config.i2c_bus)?)
    }

    pub async fn require_cpld(&mut self) -> Result<&mut Cpld<Bus>> {
        let cpld = match self.cpld.take() {
            Some(cpld) => cpld,
            None => {
                let address = self.config.address_or(CPLD_DEF_I2C_ADDR);
                Cpld::init(self.open_bus("CPLD", address)?, address).await?
            }
        };
        Ok(self.cpld.insert(cpld))
    }

    pub async fn require_hvpmic(&mut self) -> Result<&mut Max17135<Bus>> {
        let hvpmic = match self.hvpmic.take() {
            Some(hvpmic) => hvpmic,
            None => {
                let address = self.config.address_or(HVPMIC_DEF_I2C_ADDR);
                Max17135::init(self.open_bus("HVPMIC", address)?, address).await?
            }
        };
        Ok(self.hvpmic.insert(hvpmic))
    }

    pub fn require_dac(&mut self) -> Result<&mut Dac5820<Bus>> {
        let dac = match self.dac.take() {
            Some(dac) => dac,
            None => {
                let address = self.config.address_or(DAC5820_DEF_I2C_ADDR);
                Dac5820::new(self.open_bus("DAC", address)?, address)
            }
        };
        Ok(self.dac.insert(dac))
    }

    pub fn require_adc(&mut self) -> Result<&mut Max11607<Bus>> {
        let adc = match self.adc.take() {
            Some(adc) => adc,
            None => {
                let address = self.config.address_or(ADC11607_DEF_I2C_ADDR);
                Max11607::new(self.open_bus("ADC", address)?, address)
            }
        };
        Ok(self.adc.insert(adc))
    }

    pub fn require_pbtn(&mut self) -> Result<&mut ButtonPad<Bus>> {
        let pbtn = match self.pbtn.take() {
            Some(pbtn) => pbtn,
            None => {
                let address = self.config.address_or(PBTN_DEF_I2C_ADDR);
                ButtonPad::new(self.open_bus("push buttons", address)?, address)
            }
        };
        Ok(self.pbtn.insert(pbtn))
    }

    pub fn require_eeprom(&mut self) -> Result<&mut Eeprom24<Bus>> {
        let eeprom = match self.eeprom.take() {
            Some(eeprom) => eeprom,
            None => {
                let address = self.config.address_or(EEPROM_DEF_I2C_ADDR);
                Eeprom24::new(self.open_bus("EEPROM", address)?, address, EEPROM_DEF_SIZE)
            }
        };
        Ok(self.eeprom.insert(eeprom))
    }

    /// The devices of the power-on procedure, all opened.
    pub async fn require_power_on_devices(
        &mut self,
    ) -> Result<(&mut Cpld<Bus>, &mut Max17135<Bus>, &mut Dac5820<Bus>)> {
        self.require_cpld().await?;
        self.require_hvpmic().await?;
        self.require_dac()?;

        match (&mut self.cpld, &mut self.hvpmic, &mut self.dac) {
            (Some(cpld), Some(hvpmic), Some(dac)) => Ok((cpld, hvpmic, dac)),
            _ => Err(Error::NotFound("power devices".into())),
        }
    }

    /// The devices of the power-off procedure, all opened.
    pub async fn require_power_off_devices(&mut self) -> Result<(&mut Cpld<Bus>, &mut Dac5820<Bus>)> {
        self.require_cpld().await?;
        self.require_dac()?;

        match (&mut self.cpld, &mut self.dac) {
            (Some(cpld), Some(dac)) => Ok((cpld, dac)),
            _ => Err(Error::NotFound("power devices".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn context() -> DeviceContext {
        let config = Config {
            i2c_bus: PathBuf::from("/nonexistent/i2c-bus"),
            ..Config::default()
        };
        DeviceContext::new(config, AbortSignal::new())
    }

    #[tokio::test]
    async fn test_open_failure_leaves_no_handle() {
        let mut ctx = context();

        assert!(matches!(ctx.require_cpld().await, Err(Error::Device(_))));
        assert!(ctx.cpld.is_none());

        assert!(ctx.require_eeprom().is_err());
        assert!(ctx.eeprom.is_none());
    }

    #[tokio::test]
    async fn test_power_devices_fail_on_first_missing() {
        let mut ctx = context();
        assert!(ctx.require_power_on_devices().await.is_err());
        assert!(ctx.hvpmic.is_none());
        assert!(ctx.dac.is_none());
    }

    #[test]
    fn test_abort_is_shared() {
        let abort = AbortSignal::new();
        let ctx = DeviceContext::new(Config::default(), abort.clone());
        abort.raise();
        assert!(ctx.abort().is_set());
    }
}
