//! Linux `i2c-dev` bus access.
//!
//! Transactions go through the `I2C_RDWR` ioctl so that a register write
//! followed by a read is issued with a repeated start, which the PMIC and
//! the ADC require.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{I2c, Result};
use crate::tracing::prelude::*;
use rdwr::Message;

/// An opened `/dev/i2c-N` character device.
pub struct LinuxI2c {
    file: File,
    path: PathBuf,
}

impl LinuxI2c {
    /// Open the bus device at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        debug!(bus = %path.display(), "Opened I2C bus");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl I2c for LinuxI2c {
    async fn write(&mut self, address: u8, data: &[u8]) -> Result<()> {
        trace!(address = format!("0x{:02X}", address), ?data, "I2C write");
        rdwr::transfer(&self.file, &mut [Message::write(address, data)?])
    }

    async fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<()> {
        rdwr::transfer(&self.file, &mut [Message::read(address, buffer)?])?;
        trace!(address = format!("0x{:02X}", address), data = ?buffer, "I2C read");
        Ok(())
    }

    async fn write_read(&mut self, address: u8, data: &[u8], buffer: &mut [u8]) -> Result<()> {
        rdwr::transfer(
            &self.file,
            &mut [Message::write(address, data)?, Message::read(address, buffer)?],
        )?;
        trace!(
            address = format!("0x{:02X}", address),
            ?data,
            read = ?buffer,
            "I2C write/read"
        );
        Ok(())
    }
}

/// The `I2C_RDWR` ioctl, the only unsafe code of the crate.
#[allow(unsafe_code)]
mod rdwr {
    use std::ffi::c_void;
    use std::fs::File;
    use std::marker::PhantomData;
    use std::os::fd::AsRawFd;

    use crate::hw_trait::{HwError, Result};

    const I2C_M_RD: u16 = 0x0001;

    /// A kernel `struct i2c_msg` borrowing its buffer for `'a`.
    #[repr(C)]
    pub(super) struct Message<'a> {
        addr: u16,
        flags: u16,
        len: u16,
        buf: *mut u8,
        _buf: PhantomData<&'a [u8]>,
    }

    impl<'a> Message<'a> {
        pub(super) fn write(address: u8, data: &'a [u8]) -> Result<Self> {
            // The kernel never writes through a message without I2C_M_RD
            Self::new(address, 0, data.as_ptr().cast_mut(), data.len())
        }

        pub(super) fn read(address: u8, buffer: &'a mut [u8]) -> Result<Self> {
            Self::new(address, I2C_M_RD, buffer.as_mut_ptr(), buffer.len())
        }

        fn new(address: u8, flags: u16, buf: *mut u8, len: usize) -> Result<Self> {
            let len = u16::try_from(len).map_err(|_| {
                HwError::InvalidParameter(format!("I2C message too long: {} bytes", len))
            })?;
            Ok(Self {
                addr: address as u16,
                flags,
                len,
                buf,
                _buf: PhantomData,
            })
        }
    }

    #[repr(C)]
    struct RdwrData {
        msgs: *mut c_void,
        nmsgs: u32,
    }

    nix::ioctl_write_ptr_bad!(i2c_rdwr, 0x0707, RdwrData);

    pub(super) fn transfer(file: &File, msgs: &mut [Message<'_>]) -> Result<()> {
        let nmsgs = u32::try_from(msgs.len())
            .map_err(|_| HwError::InvalidParameter("too many I2C messages".into()))?;
        let data = RdwrData {
            msgs: msgs.as_mut_ptr().cast(),
            nmsgs,
        };

        // SAFETY: each message borrows its buffer for longer than this call
        // and its `len` is that buffer's length, checked in `Message::new`.
        unsafe { i2c_rdwr(file.as_raw_fd(), &data) }?;
        Ok(())
    }
}
