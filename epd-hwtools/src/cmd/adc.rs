use std::str::FromStr;

use anyhow::Result;

use crate::error::Error;
use crate::hw_trait::I2c;
use crate::peripheral::max11607::{Max11607, Reference, ADC11607_NB_CHANNELS, VCOM_CHANNEL, VCOM_COEFF};
use crate::tracing::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    /// VCOM feedback, scaled back to the actual VCOM voltage
    Vcom,
    Input(usize),
}

fn parse_reference(reference: Option<&str>) -> crate::error::Result<Reference> {
    match reference {
        None => Ok(Reference::default()),
        Some(name) => Reference::from_str(name)
            .map_err(|_| Error::InvalidArgument(format!("invalid reference voltage: {}", name))),
    }
}

fn parse_channel(channel: &str) -> crate::error::Result<Channel> {
    if channel == "vcom" {
        return Ok(Channel::Vcom);
    }
    match channel.parse() {
        Ok(input) if input < ADC11607_NB_CHANNELS => Ok(Channel::Input(input)),
        _ => Err(Error::InvalidArgument(format!(
            "invalid channel number {} (0-{})",
            channel,
            ADC11607_NB_CHANNELS - 1
        ))),
    }
}

/// Convert all channels; print one on stdout or log them all.
pub async fn run<I2C: I2c>(adc: &mut Max11607<I2C>, reference: Option<&str>, channel: Option<&str>) -> Result<()> {
    let reference = parse_reference(reference)?;
    let channel = channel.map(parse_channel).transpose()?;

    adc.set_reference(reference).await?;
    adc.read_results().await?;

    match channel {
        Some(Channel::Vcom) => {
            let result = adc.result(VCOM_CHANNEL)?;
            println!("{:.6}", adc.volts(result) * VCOM_COEFF);
        }
        Some(Channel::Input(input)) => {
            let result = adc.result(input)?;
            println!("{:.6}", adc.volts(result));
        }
        None => {
            for input in 0..adc.nb_channels() {
                let result = adc.result(input)?;
                info!(
                    "ch. {}, result: {} ({:.3} V, {} mV)",
                    input,
                    result,
                    adc.volts(result),
                    adc.millivolts(result)
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw_trait::fake::FakeI2c;
    use crate::peripheral::max11607::ADC11607_DEF_I2C_ADDR;
    use test_case::test_case;

    #[test_case(None => Reference::Internal)]
    #[test_case(Some("external") => Reference::External)]
    #[test_case(Some("vdd") => Reference::Vdd)]
    fn test_parse_reference(name: Option<&str>) -> Reference {
        parse_reference(name).unwrap()
    }

    #[test_case("vcom" => Some(Channel::Vcom))]
    #[test_case("0" => Some(Channel::Input(0)))]
    #[test_case("3" => Some(Channel::Input(3)))]
    #[test_case("4" => None)]
    #[test_case("-1" => None)]
    fn test_parse_channel(channel: &str) -> Option<Channel> {
        parse_channel(channel).ok()
    }

    #[tokio::test]
    async fn test_bad_arguments_are_rejected_before_conversion() {
        let mut adc = Max11607::new(FakeI2c::default(), ADC11607_DEF_I2C_ADDR);
        assert!(run(&mut adc, Some("1v8"), None).await.is_err());
        assert!(run(&mut adc, None, Some("9")).await.is_err());
    }

    #[tokio::test]
    async fn test_read_all_channels() {
        let i2c = FakeI2c::with_responses([vec![0xFC, 0x00, 0xFE, 0x00, 0xFF, 0xFF, 0xFD, 0x23]]);
        let mut adc = Max11607::new(i2c, ADC11607_DEF_I2C_ADDR);
        run(&mut adc, Some("internal"), None).await.unwrap();
    }
}
