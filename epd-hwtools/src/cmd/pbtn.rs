use anyhow::Result;

use crate::abort::AbortSignal;
use crate::hw_trait::I2c;
use crate::peripheral::pbtn::{ButtonPad, Buttons};
use crate::tracing::prelude::*;

/// Guided push button test.
pub async fn run<I2C: I2c>(pad: &mut ButtonPad<I2C>, abort: &AbortSignal) -> Result<()> {
    info!("Type Ctrl-C to abort");

    info!("waiting for button #7 on");
    let state = pad.wait(Buttons::BTN_7, true, abort).await?;
    info!("result: {:?}", state);

    info!("waiting for button #7 off");
    let state = pad.wait(Buttons::BTN_7, false, abort).await?;
    info!("result: {:?}", state);

    info!("waiting for button #9 on");
    let state = pad.wait(Buttons::BTN_9, true, abort).await?;
    info!("result: {:?}", state);

    info!("please release all buttons now");
    pad.wait(Buttons::ALL, false, abort).await?;
    info!("thanks");

    info!("waiting for any button on");
    let pressed = pad.wait_any(Buttons::ALL, true, abort).await?;
    info!("result: 0x{:02X}", pressed.bits());

    Ok(())
}
