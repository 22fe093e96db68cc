//! Configuration management for epd-hwtools.
//!
//! Settings are layered: built-in defaults, then an optional JSON file, then
//! environment variables, then command-line flags (applied by the binary).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

use crate::error::{Error, Result};

/// Default I2C bus device
pub const DEFAULT_I2C_BUS: &str = "/dev/i2c-1";

/// Path of a JSON configuration file
pub const ENV_CONFIG: &str = "EPD_HWTOOLS_CONFIG";
pub const ENV_I2C_BUS: &str = "EPD_HWTOOLS_I2C_BUS";
pub const ENV_I2C_ADDR: &str = "EPD_HWTOOLS_I2C_ADDR";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// I2C bus device node
    pub i2c_bus: PathBuf,

    /// Overrides the default address of whichever device the command uses
    pub i2c_address: Option<u8>,

    /// Free-form command option (the EEPROM I2C block size)
    pub command_option: Option<String>,

    /// Default log level, overridden by RUST_LOG
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            i2c_bus: PathBuf::from(DEFAULT_I2C_BUS),
            i2c_address: None,
            command_option: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Defaults, then `file` (or the one named by `EPD_HWTOOLS_CONFIG`),
    /// then the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with(file, |name| std::env::var(name).ok())
    }

    pub fn load_with<F>(file: Option<&Path>, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_file = var(ENV_CONFIG).map(PathBuf::from);
        let mut config = match file.map(Path::to_path_buf).or(env_file) {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env(var)?;
        Ok(config)
    }

    /// Apply environment overrides.
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bus) = var(ENV_I2C_BUS) {
            self.i2c_bus = PathBuf::from(bus);
        }
        if let Some(address) = var(ENV_I2C_ADDR) {
            self.i2c_address = Some(parse_i2c_address(&address)?);
        }
        Ok(())
    }

    /// Address to use for a device whose default is `default`.
    pub fn address_or(&self, default: u8) -> u8 {
        self.i2c_address.unwrap_or(default)
    }

    pub fn log_level(&self) -> Result<LevelFilter> {
        self.log_level
            .parse()
            .map_err(|_| Error::Config(format!("invalid log level: {}", self.log_level)))
    }
}

/// Parse a 7-bit I2C address given in hexadecimal, with or without `0x`.
pub fn parse_i2c_address(text: &str) -> Result<u8> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);

    match u8::from_str_radix(digits, 16) {
        Ok(address) if address <= 0x7F => Ok(address),
        _ => Err(Error::InvalidArgument(format!("invalid I2C address: {}", text))),
    }
}
