use anyhow::Result;

use crate::hw_trait::I2c;
use crate::peripheral::cpld::{Cpld, SWITCHES};
use crate::switch::report_or_set;
use crate::tracing::prelude::*;

pub async fn run<I2C: I2c>(cpld: &mut Cpld<I2C>, switch: Option<&str>, value: Option<&str>) -> Result<()> {
    let Some(switch) = switch else {
        info!("CPLD v{}, board id: {}", cpld.version(), cpld.board_id());
        info!("initial CPLD data: [{}]", hex_bytes(cpld.dump()));
        return Ok(());
    };

    if switch == "version" {
        println!("{}", cpld.version());
        return Ok(());
    }

    report_or_set(SWITCHES, cpld, switch, value).await?;
    Ok(())
}

fn hex_bytes(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
