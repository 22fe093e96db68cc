//! Command implementations.
//!
//! One module per subcommand. Each command takes the device it drives from
//! the [`DeviceContext`], opening it on first use, and reports plain values
//! on stdout and everything else through the log.

pub mod adc;
pub mod cpld;
pub mod dac;
pub mod eeprom;
pub mod hvpmic;
pub mod pbtn;
pub mod power;

use anyhow::{Context, Result};

use crate::cli::Command;
use crate::context::DeviceContext;
use crate::error::Error;

/// Run one command against the devices of `ctx`.
pub async fn run(ctx: &mut DeviceContext, command: &Command) -> Result<()> {
    match command {
        Command::Cpld { switch, value } => {
            let cpld = ctx.require_cpld().await.context("failed to open the CPLD")?;
            cpld::run(cpld, switch.as_deref(), value.as_deref()).await
        }
        Command::Hvpmic { command } => {
            let pmic = ctx.require_hvpmic().await.context("failed to open the HVPMIC")?;
            hvpmic::run(pmic, command.as_ref()).await
        }
        Command::Dac { channel, value } => {
            let dac = ctx.require_dac().context("failed to open the DAC")?;
            dac::run(dac, channel, value).await
        }
        Command::Adc { reference, channel } => {
            let adc = ctx.require_adc().context("failed to open the ADC")?;
            adc::run(adc, reference.as_deref(), channel.as_deref()).await
        }
        Command::Pbtn => {
            let abort = ctx.abort().clone();
            let pad = ctx.require_pbtn().context("failed to open the push buttons")?;
            pbtn::run(pad, &abort).await
        }
        Command::Eeprom { command } => {
            let block_size = eeprom::parse_block_size(ctx.config().command_option.as_deref())?;
            let abort = ctx.abort().clone();
            let device = ctx.require_eeprom().context("failed to open the EEPROM")?;
            eeprom::run(device, command, block_size, &abort).await
        }
        Command::Power {
            state,
            sequence,
            vcom,
        } => power::run(ctx, state, sequence.as_deref(), vcom.as_deref()).await,
    }
}

/// Parse a decimal byte value, naming `what` in the error.
pub(crate) fn parse_u8(value: &str, what: &str) -> crate::error::Result<u8> {
    value
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("invalid {} {} (valid: 0 - 255)", what, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("0" => Some(0))]
    #[test_case("255" => Some(255))]
    #[test_case("256" => None)]
    #[test_case("-1" => None)]
    #[test_case("0x10" => None; "decimal only")]
    fn test_parse_u8(value: &str) -> Option<u8> {
        parse_u8(value, "value").ok()
    }
}
