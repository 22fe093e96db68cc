use anyhow::{Context, Result};

use crate::context::DeviceContext;
use crate::error::Error;
use crate::power::{self, DEFAULT_VCOM};
use crate::switch::{on_off_str, parse_on_off};
use crate::tracing::prelude::*;

/// VCOM value for power-on; an unusable value falls back to the default.
fn parse_vcom(vcom: Option<&str>) -> u8 {
    match vcom.map(str::parse::<u8>) {
        None => DEFAULT_VCOM,
        Some(Ok(vcom)) => vcom,
        Some(Err(_)) => {
            warn!("invalid vcom value (valid range: 0-255)");
            DEFAULT_VCOM
        }
    }
}

pub async fn run(ctx: &mut DeviceContext, state: &str, sequence: Option<&str>, vcom: Option<&str>) -> Result<()> {
    let on = parse_on_off(state).map_err(|_| {
        Error::InvalidArgument("invalid arguments (possible values are `on' or `off')".into())
    })?;
    let sequence = power::resolve(sequence)?;

    if on {
        let vcom = parse_vcom(vcom);
        let (cpld, pmic, dac) = ctx
            .require_power_on_devices()
            .await
            .context("failed to open the power devices")?;
        power::power_on(sequence, cpld, pmic, dac, vcom).await?;
    } else {
        let (cpld, dac) = ctx
            .require_power_off_devices()
            .await
            .context("failed to open the power devices")?;
        power::power_off(sequence, cpld, dac).await?;
    }

    info!("Power {}", on_off_str(on));
    Ok(())
}
