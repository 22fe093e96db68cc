//! Test tools for e-paper display power hardware.
//!
//! Drivers for the chips of a display interface board (switch bank CPLD, HV
//! PMIC, VCOM DAC, ADC, push buttons and display EEPROM), the display power
//! sequences built on top of them, and the EEPROM transfer engine.

#![deny(unsafe_code)]

pub mod abort;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod context;
pub mod error;
pub mod hw_trait;
pub mod peripheral;
pub mod power;
pub mod switch;
pub mod tracing;
pub mod transfer;
