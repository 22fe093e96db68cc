//! Common error types for epd-hwtools.
//!
//! This module provides a centralized Error enum using thiserror,
//! with conversions from the driver-level error types used throughout
//! the crate.

use thiserror::Error;

use crate::hw_trait::HwError;

/// Main error type for epd-hwtools operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed symbolic name or out-of-range numeric value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown power sequence, switch or rail name
    #[error("Not found: {0}")]
    NotFound(String),

    /// A bus primitive of a device collaborator failed
    #[error("Device error: {0}")]
    Device(#[from] HwError),

    /// I/O errors on host files and standard streams
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// EEPROM self-test found a byte that did not read back as written
    #[error("Verification mismatch at offset 0x{offset:04X}")]
    VerificationMismatch { offset: usize },

    /// Cooperative cancellation observed in a polling loop
    #[error("Aborted")]
    Aborted,

    /// Cooperative cancellation observed between two EEPROM chunks
    #[error("Transfer aborted after {bytes_moved} bytes")]
    TransferAborted { bytes_moved: usize },

    /// A power sequence step failed; no later step was run
    #[error("Power sequence step failed: {label}")]
    StepFailure {
        label: &'static str,
        #[source]
        source: HwError,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error stems from the abort signal.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted | Error::TransferAborted { .. })
    }
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
