//! Peripheral chip drivers.
//!
//! This module contains drivers for the chips on the display interface
//! board: the switch bank CPLD, the MAX17135 HV PMIC, the DAC5820 VCOM DAC,
//! the MAX11607 ADC, the push button GPIO expander and the display EEPROM.
//! All drivers are generic over the hw_trait interfaces.

pub mod cpld;
pub mod dac5820;
pub mod eeprom;
pub mod max11607;
pub mod max17135;
pub mod pbtn;

pub use cpld::Cpld;
pub use dac5820::Dac5820;
pub use eeprom::Eeprom24;
pub use max11607::Max11607;
pub use max17135::Max17135;
pub use pbtn::ButtonPad;
