//! Display power primitives.
//!
//! The power sequencer drives three devices: the CPLD switch bank (through
//! [`LineControl`](super::LineControl) with [`SwitchLine`]), the HV PMIC
//! ([`HvPmic`]) and the VCOM DAC ([`VcomDac`]).

use async_trait::async_trait;
use strum::{Display, EnumString, IntoStaticStr};

use super::Result;

/// Switch lines of the CPLD switch bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum SwitchLine {
    /// HV enable
    #[strum(serialize = "hv")]
    Hv,
    /// VCOM switch driver enable
    #[strum(serialize = "vcom_en")]
    VcomEnable,
    /// VCOM switch close (off to open, on to close)
    #[strum(serialize = "vcom_close")]
    VcomClose,
    /// VCOM power supply enable
    #[strum(serialize = "vcom_psu")]
    VcomPsu,
    /// BPCOM clamp enable
    #[strum(serialize = "bpcom_clamp")]
    BpcomClamp,
}

/// Enable lines of the HV PMIC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum HvRail {
    #[strum(serialize = "en")]
    En,
    #[strum(serialize = "cen")]
    Cen,
    #[strum(serialize = "cen2")]
    Cen2,
}

/// DAC output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum DacChannel {
    A,
    B,
}

/// DAC channel power mode.
///
/// The power-down modes differ in how the output is terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum DacPowerMode {
    #[strum(serialize = "on")]
    On,
    /// Powered down, output left floating
    #[strum(serialize = "off")]
    OffFloat,
    /// Powered down, output pulled to GND through 1 kOhm
    #[strum(serialize = "off1k")]
    Off1k,
    /// Powered down, output pulled to GND through 100 kOhm
    #[strum(serialize = "off100k")]
    Off100k,
}

/// HV PMIC primitives used by the power sequencer.
#[async_trait]
pub trait HvPmic: Send {
    /// Block until the PMIC reports power-OK.
    ///
    /// The wait is bounded by the implementation; it fails with a timeout
    /// rather than spinning forever.
    async fn wait_for_power_ok(&mut self) -> Result<()>;
}

/// VCOM DAC primitives used by the power sequencer.
#[async_trait]
pub trait VcomDac: Send {
    async fn set_power(&mut self, channel: DacChannel, mode: DacPowerMode) -> Result<()>;

    async fn output(&mut self, channel: DacChannel, value: u8) -> Result<()>;
}
