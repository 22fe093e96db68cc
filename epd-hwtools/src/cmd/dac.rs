use std::str::FromStr;

use anyhow::Result;

use super::parse_u8;
use crate::error::Error;
use crate::hw_trait::{DacChannel, DacPowerMode, VcomDac};
use crate::tracing::prelude::*;

/// What to do with a DAC channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DacRequest {
    Power(DacPowerMode),
    Output(u8),
}

fn parse_request(channel: &str, value: &str) -> crate::error::Result<(DacChannel, DacRequest)> {
    let channel = DacChannel::from_str(channel)
        .map_err(|_| Error::InvalidArgument("invalid channel identifier (A or B)".into()))?;

    let request = match DacPowerMode::from_str(value) {
        Ok(mode) => DacRequest::Power(mode),
        Err(_) => DacRequest::Output(parse_u8(value, "value")?),
    };

    Ok((channel, request))
}

pub async fn run<D: VcomDac>(dac: &mut D, channel: &str, value: &str) -> Result<()> {
    let (channel, request) = parse_request(channel, value)?;

    match request {
        DacRequest::Power(mode) => {
            debug!(%channel, %mode, "DAC power");
            dac.set_power(channel, mode).await?;
        }
        DacRequest::Output(value) => {
            debug!(%channel, value, "DAC output");
            dac.output(channel, value).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw_trait;
    use async_trait::async_trait;
    use test_case::test_case;

    #[derive(Default)]
    struct RecordingDac {
        calls: Vec<String>,
    }

    #[async_trait]
    impl VcomDac for RecordingDac {
        async fn set_power(&mut self, channel: DacChannel, mode: DacPowerMode) -> hw_trait::Result<()> {
            self.calls.push(format!("power {} {}", channel, mode));
            Ok(())
        }

        async fn output(&mut self, channel: DacChannel, value: u8) -> hw_trait::Result<()> {
            self.calls.push(format!("output {} {}", channel, value));
            Ok(())
        }
    }

    #[test_case("A", "on", "power A on")]
    #[test_case("B", "off", "power B off")]
    #[test_case("A", "off1k", "power A off1k")]
    #[test_case("A", "off100k", "power A off100k")]
    #[test_case("B", "200", "output B 200")]
    #[tokio::test]
    async fn test_dac_request(channel: &str, value: &str, expected: &str) {
        let mut dac = RecordingDac::default();
        run(&mut dac, channel, value).await.unwrap();
        assert_eq!(dac.calls, vec![expected.to_string()]);
    }

    #[test_case("C", "on"; "unknown channel")]
    #[test_case("a", "on"; "channel is case sensitive")]
    #[test_case("A", "256"; "value out of range")]
    #[test_case("A", "half"; "unknown mode")]
    #[tokio::test]
    async fn test_invalid_request_does_not_touch_the_dac(channel: &str, value: &str) {
        let mut dac = RecordingDac::default();
        assert!(run(&mut dac, channel, value).await.is_err());
        assert!(dac.calls.is_empty());
    }
}
