//! Push buttons on a PCA9535-class I2C GPIO expander
//!
//! The buttons pull their input low when pressed. Waiting for a button
//! state is a polling loop which checks the abort signal between two reads
//! of the input port.

use std::time::Duration;

use bitflags::bitflags;
use tokio::time;

use crate::abort::AbortSignal;
use crate::error::{Error, Result};
use crate::hw_trait::{self, I2c};
use crate::tracing::prelude::*;

/// Default GPIO expander I2C address
pub const PBTN_DEF_I2C_ADDR: u8 = 0x20;

const REG_INPUT_PORT_0: u8 = 0x00;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

bitflags! {
    /// Buttons, as wired on input port 0
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Buttons: u8 {
        const BTN_5 = 0x08;
        const BTN_6 = 0x10;
        const BTN_7 = 0x20;
        const BTN_8 = 0x40;
        const BTN_9 = 0x80;
        const ALL = Self::BTN_5.bits()
            | Self::BTN_6.bits()
            | Self::BTN_7.bits()
            | Self::BTN_8.bits()
            | Self::BTN_9.bits();
    }
}

/// Push button pad driver
pub struct ButtonPad<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> ButtonPad<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Buttons currently held down.
    pub async fn pressed(&mut self) -> hw_trait::Result<Buttons> {
        let mut port = [0u8; 1];
        self.i2c
            .write_read(self.address, &[REG_INPUT_PORT_0], &mut port)
            .await?;
        // Active low
        Ok(Buttons::from_bits_truncate(!port[0]))
    }

    /// Wait until every button in `buttons` is down (`pressed`) or up.
    pub async fn wait(&mut self, buttons: Buttons, pressed: bool, abort: &AbortSignal) -> Result<Buttons> {
        self.poll(abort, |state| {
            let down = state & buttons;
            if pressed {
                down == buttons
            } else {
                down.is_empty()
            }
        })
        .await
    }

    /// Wait until any button in `buttons` is down (`pressed`) or up.
    ///
    /// Returns the buttons of `buttons` that are down at that time.
    pub async fn wait_any(&mut self, buttons: Buttons, pressed: bool, abort: &AbortSignal) -> Result<Buttons> {
        let state = self
            .poll(abort, |state| {
                let down = state & buttons;
                if pressed {
                    !down.is_empty()
                } else {
                    down != buttons
                }
            })
            .await?;
        Ok(state & buttons)
    }

    async fn poll<F>(&mut self, abort: &AbortSignal, mut done: F) -> Result<Buttons>
    where
        F: FnMut(Buttons) -> bool,
    {
        loop {
            if abort.is_set() {
                debug!("Button wait aborted");
                return Err(Error::Aborted);
            }

            let state = self.pressed().await?;
            if done(state) {
                return Ok(state);
            }

            time::sleep(POLL_INTERVAL).await;
        }
    }
}
