use anyhow::{bail, Result};

use super::parse_u8;
use crate::cli::HvpmicCommand;
use crate::error::Error;
use crate::hw_trait::{self, I2c, LineControl};
use crate::peripheral::max17135::{fault_name, Max17135, TempSensor, HVPMIC_NB_TIMINGS, RAILS};
use crate::power::{apply_timings, TimingProfile, SEQUENCES};
use crate::switch::{on_off_str, report_or_set};
use crate::tracing::prelude::*;

pub async fn run<I2C: I2c>(pmic: &mut Max17135<I2C>, command: Option<&HvpmicCommand>) -> Result<()> {
    let Some(command) = command else {
        return dump_state(pmic).await;
    };

    match command {
        HvpmicCommand::Timing { index, ms } => set_timing(pmic, index, ms).await,
        HvpmicCommand::Timings { values } => timings(pmic, values).await,
        HvpmicCommand::Vcom { value } => {
            let vcom = parse_u8(value, "VCOM value")?;
            info!("setting VCOM to {} (0x{:02X})", vcom, vcom);
            pmic.set_vcom(vcom).await?;
            Ok(())
        }
        HvpmicCommand::Fault => {
            let fault = pmic.fault().await?;
            info!("HVPMIC fault: {}", fault_name(fault));
            Ok(())
        }
        HvpmicCommand::En { value } => rail(pmic, "en", value.as_deref()).await,
        HvpmicCommand::Cen { value } => rail(pmic, "cen", value.as_deref()).await,
        HvpmicCommand::Cen2 { value } => rail(pmic, "cen2", value.as_deref()).await,
    }
}

async fn rail<I2C: I2c>(pmic: &mut Max17135<I2C>, name: &str, value: Option<&str>) -> Result<()> {
    report_or_set(RAILS, pmic, name, value).await?;
    Ok(())
}

async fn set_timing<I2C: I2c>(pmic: &mut Max17135<I2C>, index: &str, ms: &str) -> Result<()> {
    let index: usize = match index.parse() {
        Ok(index) if index < HVPMIC_NB_TIMINGS => index,
        _ => {
            return Err(Error::InvalidArgument(format!(
                "invalid timing number {} (valid: 0 - {})",
                index,
                HVPMIC_NB_TIMINGS - 1
            ))
            .into())
        }
    };
    let ms = parse_u8(ms, "timing value")?;

    info!("setting timing #{} to {} ms", index, ms);
    pmic.set_timing(index, ms).await?;
    Ok(())
}

/// Print the timings, or program them from a sequence name or a list of values.
async fn timings<I2C: I2c>(pmic: &mut Max17135<I2C>, values: &[String]) -> Result<()> {
    if values.is_empty() {
        for (index, ms) in pmic.timings().await?.iter().enumerate() {
            println!("{}: {}", index, ms);
        }
        return Ok(());
    }

    if let [name] = values {
        if let Some(sequence) = SEQUENCES.iter().find(|seq| seq.name == name.as_str()) {
            apply_timings(pmic, sequence).await?;
            return Ok(());
        }
    }

    let profile = parse_timings(values)?;
    pmic.set_timings(profile.as_array()).await?;
    Ok(())
}

/// Parse a list of timings; extra values are ignored.
fn parse_timings(values: &[String]) -> crate::error::Result<TimingProfile> {
    if values.len() > HVPMIC_NB_TIMINGS {
        warn!("only using the {} first timings", HVPMIC_NB_TIMINGS);
    }

    let timings = values
        .iter()
        .take(HVPMIC_NB_TIMINGS)
        .map(|value| parse_u8(value, "timing"))
        .collect::<crate::error::Result<Vec<u8>>>()?;

    TimingProfile::from_slice(&timings)
}

async fn temperatures<I2C: I2c>(pmic: &mut Max17135<I2C>) -> hw_trait::Result<(f32, f32)> {
    let internal = pmic.temperature(TempSensor::Internal).await?;
    let external = pmic.temperature(TempSensor::External).await?;
    Ok((internal, external))
}

// Log everything readable, carrying on past failures.
async fn dump_state<I2C: I2c>(pmic: &mut Max17135<I2C>) -> Result<()> {
    let mut failed = false;

    let prod_id = pmic.prod_id().await?;
    let prod_rev = pmic.prod_rev().await?;
    info!("HVPMIC id: 0x{:02X}, rev: 0x{:02X}", prod_id, prod_rev);

    for rail in RAILS {
        let name = rail.name.to_uppercase();
        match pmic.get_line(rail.line).await {
            Ok(on) => info!("{} status: {}", name, on_off_str(on)),
            Err(e) => {
                error!("failed to get {} status: {}", name, e);
                failed = true;
            }
        }
    }

    match pmic.timings().await {
        Ok(timings) => {
            for (index, ms) in timings.iter().enumerate() {
                info!("timing #{}: {:3} ms", index, ms);
            }
        }
        Err(e) => {
            error!("failed to get the timings: {}", e);
            failed = true;
        }
    }

    match pmic.vcom().await {
        Ok(vcom) => info!("VCOM: {} (0x{:02X})", vcom, vcom),
        Err(e) => {
            error!("failed to read VCOM: {}", e);
            failed = true;
        }
    }

    match pmic.temp_sensor_enabled().await {
        Ok(enabled) => info!("temperature sensor enabled: {}", if enabled { "yes" } else { "no" }),
        Err(e) => {
            error!("failed to get the temperature sensor state: {}", e);
            failed = true;
        }
    }

    match temperatures(pmic).await {
        Ok((internal, external)) => {
            info!("internal temperature: {:.1} C", internal);
            info!("external temperature: {:.1} C", external);
        }
        Err(e) => {
            error!("failed to read temperatures: {}", e);
            failed = true;
        }
    }

    if failed {
        bail!("failed to read the complete HVPMIC state");
    }
    Ok(())
}
