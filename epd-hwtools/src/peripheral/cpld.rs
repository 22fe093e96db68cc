//! Display interface CPLD
//!
//! The CPLD on the display interface board holds the HV and VCOM switch
//! network. It exposes a small register image over I2C: a plain read
//! returns the whole image, a plain write replaces it.
//!
//! Register image:
//!
//! | byte | content                      |
//! |------|------------------------------|
//! | 0    | firmware version (read-only) |
//! | 1    | board id (read-only)         |
//! | 2    | switch control bits          |

use async_trait::async_trait;
use bitflags::bitflags;

use crate::hw_trait::{self, I2c, LineControl, SwitchLine};
use crate::switch::SwitchId;
use crate::tracing::prelude::*;

/// Default CPLD I2C address
pub const CPLD_DEF_I2C_ADDR: u8 = 0x70;

const CPLD_DATA_SIZE: usize = 3;
const CPLD_VERSION_BYTE: usize = 0;
const CPLD_BOARD_ID_BYTE: usize = 1;
const CPLD_SWITCH_BYTE: usize = 2;

bitflags! {
    /// Switch control bits (register image byte 2)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Switches: u8 {
        const HVEN = 0x01;
        const COM_SW_EN = 0x02;
        const COM_SW_CLOSE = 0x04;
        const COM_PSU = 0x08;
        const BPCOM_CLAMP = 0x10;
    }
}

impl From<SwitchLine> for Switches {
    fn from(line: SwitchLine) -> Self {
        match line {
            SwitchLine::Hv => Switches::HVEN,
            SwitchLine::VcomEnable => Switches::COM_SW_EN,
            SwitchLine::VcomClose => Switches::COM_SW_CLOSE,
            SwitchLine::VcomPsu => Switches::COM_PSU,
            SwitchLine::BpcomClamp => Switches::BPCOM_CLAMP,
        }
    }
}

/// Switch names accepted by the `cpld` command.
pub const SWITCHES: &[SwitchId<SwitchLine>] = &[
    SwitchId::new("hv", SwitchLine::Hv),
    SwitchId::new("vcom_en", SwitchLine::VcomEnable),
    SwitchId::new("vcom_close", SwitchLine::VcomClose),
    SwitchId::new("vcom_psu", SwitchLine::VcomPsu),
    SwitchId::new("bpcom_clamp", SwitchLine::BpcomClamp),
];

/// CPLD driver
pub struct Cpld<I2C> {
    i2c: I2C,
    address: u8,
    data: [u8; CPLD_DATA_SIZE],
}

impl<I2C: I2c> Cpld<I2C> {
    /// Create a CPLD instance and read its initial register image.
    pub async fn init(i2c: I2C, address: u8) -> hw_trait::Result<Self> {
        let mut cpld = Self {
            i2c,
            address,
            data: [0; CPLD_DATA_SIZE],
        };
        cpld.refresh().await?;
        debug!(
            version = cpld.version(),
            board_id = cpld.board_id(),
            "CPLD initialized"
        );
        Ok(cpld)
    }

    /// Firmware version, as read at the last refresh
    pub fn version(&self) -> u8 {
        self.data[CPLD_VERSION_BYTE]
    }

    /// Board id, as read at the last refresh
    pub fn board_id(&self) -> u8 {
        self.data[CPLD_BOARD_ID_BYTE]
    }

    /// Raw register image, as read at the last refresh
    pub fn dump(&self) -> &[u8] {
        &self.data
    }

    #[cfg(test)]
    pub(crate) fn bus(&self) -> &I2C {
        &self.i2c
    }

    pub fn switches(&self) -> Switches {
        Switches::from_bits_retain(self.data[CPLD_SWITCH_BYTE])
    }

    /// Re-read the register image from the device.
    pub async fn refresh(&mut self) -> hw_trait::Result<()> {
        let mut data = [0u8; CPLD_DATA_SIZE];
        self.i2c.read(self.address, &mut data).await?;
        self.data = data;
        Ok(())
    }

    async fn set_switch(&mut self, switch: Switches, on: bool) -> hw_trait::Result<()> {
        self.refresh().await?;
        let mut image = self.data;
        let mut switches = Switches::from_bits_retain(image[CPLD_SWITCH_BYTE]);
        switches.set(switch, on);
        image[CPLD_SWITCH_BYTE] = switches.bits();

        self.i2c.write(self.address, &image).await?;
        self.data = image;
        trace!(?switch, on, "CPLD switch written");
        Ok(())
    }
}

#[async_trait]
impl<I2C: I2c> LineControl for Cpld<I2C> {
    type Line = SwitchLine;

    async fn get_line(&mut self, line: SwitchLine) -> hw_trait::Result<bool> {
        self.refresh().await?;
        Ok(self.switches().contains(Switches::from(line)))
    }

    async fn set_line(&mut self, line: SwitchLine, on: bool) -> hw_trait::Result<()> {
        self.set_switch(Switches::from(line), on).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw_trait::fake::FakeI2c;

    #[tokio::test]
    async fn test_init_reads_identification() {
        let i2c = FakeI2c::with_responses([vec![0x05, 0x02, 0x00]]);
        let cpld = Cpld::init(i2c, CPLD_DEF_I2C_ADDR).await.unwrap();

        assert_eq!(cpld.version(), 5);
        assert_eq!(cpld.board_id(), 2);
        assert_eq!(cpld.dump(), &[0x05, 0x02, 0x00]);
    }

    #[tokio::test]
    async fn test_set_line_preserves_other_switches() {
        let i2c = FakeI2c::with_responses([
            vec![0x05, 0x02, 0x11],
            vec![0x05, 0x02, 0x11],
        ]);
        let mut cpld = Cpld::init(i2c, CPLD_DEF_I2C_ADDR).await.unwrap();

        cpld.set_line(SwitchLine::VcomClose, true).await.unwrap();

        let (address, image) = cpld.i2c.writes.last().unwrap();
        assert_eq!(*address, CPLD_DEF_I2C_ADDR);
        assert_eq!(image, &vec![0x05, 0x02, 0x15]);
    }

    #[tokio::test]
    async fn test_get_line_reads_fresh_state() {
        let i2c = FakeI2c::with_responses([
            vec![0x05, 0x02, 0x00],
            vec![0x05, 0x02, 0x10],
        ]);
        let mut cpld = Cpld::init(i2c, CPLD_DEF_I2C_ADDR).await.unwrap();

        assert!(cpld.get_line(SwitchLine::BpcomClamp).await.unwrap());
    }

    #[test]
    fn test_switch_table_matches_line_names() {
        for sw in SWITCHES {
            let name: &'static str = sw.line.into();
            assert_eq!(sw.name, name);
        }
    }
}
