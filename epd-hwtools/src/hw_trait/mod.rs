//! Hardware abstraction layer traits.
//!
//! This module defines the hardware interface traits (the I2C bus, boolean
//! control lines, and the power and storage primitives) that allow drivers
//! and the sequencing/transfer logic to work with different underlying
//! implementations, whether direct Linux hardware access or in-memory test
//! doubles.

#[cfg(test)]
pub mod fake;
pub mod i2c;
pub mod line;
pub mod linux;
pub mod power;
pub mod storage;

// Re-export traits
pub use i2c::I2c;
pub use line::LineControl;
pub use linux::LinuxI2c;
pub use power::{DacChannel, DacPowerMode, HvPmic, HvRail, SwitchLine, VcomDac};
pub use storage::EepromDevice;

/// Common error type for hardware operations
#[derive(Debug, thiserror::Error)]
pub enum HwError {
    /// I/O error from the underlying bus device
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid parameter or argument
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation not supported by hardware
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Timeout waiting for a hardware condition
    #[error("Hardware timeout: {0}")]
    Timeout(String),

    /// Other hardware-specific error
    #[error("Hardware error: {0}")]
    Other(String),
}

impl From<nix::Error> for HwError {
    fn from(errno: nix::Error) -> Self {
        HwError::Io(std::io::Error::from(errno))
    }
}

pub type Result<T> = std::result::Result<T, HwError>;
