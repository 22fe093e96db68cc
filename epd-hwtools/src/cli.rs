//! Command-line interface definition.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{parse_i2c_address, Config};

/// Display power hardware test tools
#[derive(Debug, Parser)]
#[command(name = "epd-hwtools")]
#[command(about = "Drive e-paper display power hardware over I2C")]
#[command(version)]
pub struct Cli {
    /// I2C bus device
    #[arg(short, long, global = true)]
    pub bus: Option<PathBuf>,

    /// I2C address of the device, in hexadecimal (overrides its default)
    #[arg(short, long, global = true, value_parser = parse_i2c_address)]
    pub address: Option<u8>,

    /// Command option (EEPROM I2C block size)
    #[arg(short = 'o', long = "option", global = true)]
    pub option: Option<String>,

    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Default log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Command-line flags take precedence over every other layer.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(bus) = &self.bus {
            config.i2c_bus = bus.clone();
        }
        if let Some(address) = self.address {
            config.i2c_address = Some(address);
        }
        if let Some(option) = &self.option {
            config.command_option = Some(option.clone());
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Switch bank: dump, `version`, or a switch name with optional on|off
    Cpld {
        /// `version` or one of hv, vcom_en, vcom_close, vcom_psu, bpcom_clamp
        switch: Option<String>,
        /// on or off; omit to report the current state
        value: Option<String>,
    },
    /// HV PMIC: dump the state without a subcommand
    Hvpmic {
        #[command(subcommand)]
        command: Option<HvpmicCommand>,
    },
    /// DAC: set a channel power mode or output value
    Dac {
        /// A or B
        channel: String,
        /// on, off, off1k, off100k or 0..255
        value: String,
    },
    /// ADC: read the converted voltages
    Adc {
        /// internal, external or vdd
        reference: Option<String>,
        /// 0..3, or vcom for the scaled VCOM channel
        channel: Option<String>,
    },
    /// Push buttons: interactive test procedure
    Pbtn,
    /// Display EEPROM
    Eeprom {
        #[command(subcommand)]
        command: EepromCommand,
    },
    /// Run a power sequence
    Power {
        /// on or off
        state: String,
        /// Power sequence name (default: the first one)
        sequence: Option<String>,
        /// VCOM DAC value 0..255 (power on only)
        vcom: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum HvpmicCommand {
    /// Set one power sequencer timing
    Timing {
        /// Timing slot 0..7
        index: String,
        /// Delay in milliseconds 0..255
        ms: String,
    },
    /// Show the timings, or set them from a sequence name or a list of values
    Timings { values: Vec<String> },
    /// Set the VCOM register
    Vcom { value: String },
    /// Show the current fault
    Fault,
    /// EN rail enable
    En { value: Option<String> },
    /// CEN rail enable
    Cen { value: Option<String> },
    /// CEN2 rail enable
    Cen2 { value: Option<String> },
}

#[derive(Debug, Subcommand)]
pub enum EepromCommand {
    /// Write random data to the whole EEPROM and verify it (destroys its contents)
    #[command(name = "full_rw")]
    FullRw,
    /// Copy the EEPROM to a file (stdout by default)
    E2f {
        file: Option<PathBuf>,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Copy a file (stdin by default) to the EEPROM
    F2e {
        file: Option<PathBuf>,
        #[command(flatten)]
        range: RangeArgs,
        /// Fill the rest of the range with zeros when the input ends early
        #[arg(long)]
        pad: bool,
    },
}

#[derive(Debug, Clone, Copy, Args)]
pub struct RangeArgs {
    /// EEPROM offset to start at
    #[arg(long, default_value_t = 0)]
    pub skip: usize,
    /// Number of bytes to transfer (default: up to the end of the EEPROM)
    #[arg(long)]
    pub size: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::try_parse_from(["epd-hwtools", "-b", "/dev/i2c-2", "-a", "49", "cpld", "hv", "on"]).unwrap();
        let mut config = Config::default();
        cli.apply_to(&mut config);

        assert_eq!(config.i2c_bus, PathBuf::from("/dev/i2c-2"));
        assert_eq!(config.i2c_address, Some(0x49));
        match cli.command {
            Command::Cpld { switch, value } => {
                assert_eq!(switch.as_deref(), Some("hv"));
                assert_eq!(value.as_deref(), Some("on"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_eeprom_range() {
        let cli = Cli::try_parse_from([
            "epd-hwtools", "-o", "32", "eeprom", "f2e", "data.bin", "--skip", "128", "--size", "256", "--pad",
        ])
        .unwrap();

        assert_eq!(cli.option.as_deref(), Some("32"));
        match cli.command {
            Command::Eeprom {
                command: EepromCommand::F2e { file, range, pad },
            } => {
                assert_eq!(file, Some(PathBuf::from("data.bin")));
                assert_eq!(range.skip, 128);
                assert_eq!(range.size, Some(256));
                assert!(pad);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_full_rw_name() {
        let cli = Cli::try_parse_from(["epd-hwtools", "eeprom", "full_rw"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Eeprom {
                command: EepromCommand::FullRw
            }
        ));
    }

    #[test]
    fn test_invalid_address_is_rejected() {
        assert!(Cli::try_parse_from(["epd-hwtools", "-a", "0x80", "pbtn"]).is_err());
    }
}
