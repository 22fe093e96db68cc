//! Display power sequences.
//!
//! A power sequence is a pair of ordered procedures, one bringing the HV
//! supplies and the VCOM switch network up and one bringing them down. Each
//! procedure is a fixed list of labeled steps addressing three devices: the
//! CPLD switch bank, the HV PMIC and the VCOM DAC.
//!
//! Steps run strictly in order. The first failing step ends the procedure
//! with [`Error::StepFailure`] carrying its label; nothing after it runs and
//! nothing before it is undone, so the hardware is left in the state the
//! failing step produced for inspection.
//!
//! The power-off procedure is not the mirror image of power-on: it neither
//! releases the BPCOM clamp nor checks POK.

use crate::error::{Error, Result};
use crate::hw_trait::{self, DacChannel, DacPowerMode, HvPmic, HwError, I2c, LineControl, SwitchLine, VcomDac};
use crate::peripheral::max17135::{Max17135, HVPMIC_NB_TIMINGS};
use crate::tracing::prelude::*;

/// VCOM DAC value used when none is given (mid-scale)
pub const DEFAULT_VCOM: u8 = 128;

/// DAC channel driving VCOM
pub const VCOM_DAC_CHANNEL: DacChannel = DacChannel::A;

/// HV PMIC power sequencer timings, one per slot, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimingProfile([u8; HVPMIC_NB_TIMINGS]);

impl TimingProfile {
    pub const fn new(timings: [u8; HVPMIC_NB_TIMINGS]) -> Self {
        Self(timings)
    }

    /// Build a profile from up to 8 values; missing slots are 0.
    pub fn from_slice(values: &[u8]) -> Result<Self> {
        if values.len() > HVPMIC_NB_TIMINGS {
            return Err(Error::InvalidArgument(format!(
                "too many timings: {} (max: {})",
                values.len(),
                HVPMIC_NB_TIMINGS
            )));
        }
        let mut timings = [0u8; HVPMIC_NB_TIMINGS];
        timings[..values.len()].copy_from_slice(values);
        Ok(Self(timings))
    }

    pub fn as_array(&self) -> &[u8; HVPMIC_NB_TIMINGS] {
        &self.0
    }
}

/// What a step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Drive a CPLD switch line
    Switch(SwitchLine, bool),
    /// Wait until the HV PMIC reports power-OK
    WaitForPowerOk,
    /// Write the VCOM value to the DAC channel
    VcomOutput,
    /// Set the DAC channel power mode
    DacPower(DacPowerMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub label: &'static str,
    pub action: Action,
}

const fn step(label: &'static str, action: Action) -> Step {
    Step { label, action }
}

#[derive(Debug)]
pub struct PowerSequence {
    pub name: &'static str,
    pub timings: TimingProfile,
    pub on: &'static [Step],
    pub off: &'static [Step],
}

const SEQ0_ON: &[Step] = &[
    step("BPCOM clamp", Action::Switch(SwitchLine::BpcomClamp, true)),
    step("HV enable", Action::Switch(SwitchLine::Hv, true)),
    step("wait for POK", Action::WaitForPowerOk),
    step("COM open", Action::Switch(SwitchLine::VcomClose, false)),
    step("COM enable", Action::Switch(SwitchLine::VcomEnable, true)),
    step("COM PSU on", Action::Switch(SwitchLine::VcomPsu, true)),
    step("VCOM DAC value", Action::VcomOutput),
    step("DAC power on", Action::DacPower(DacPowerMode::On)),
    step("COM close", Action::Switch(SwitchLine::VcomClose, true)),
];

const SEQ0_OFF: &[Step] = &[
    step("COM open", Action::Switch(SwitchLine::VcomClose, false)),
    step("COM disable", Action::Switch(SwitchLine::VcomEnable, false)),
    step("DAC power off", Action::DacPower(DacPowerMode::Off100k)),
    step("COM PSU off", Action::Switch(SwitchLine::VcomPsu, false)),
    step("HV disable", Action::Switch(SwitchLine::Hv, false)),
];

/// Configured power sequences; the first one is the default.
pub const SEQUENCES: &[PowerSequence] = &[PowerSequence {
    name: "seq0",
    timings: TimingProfile::new([8, 2, 11, 3, 0, 0, 0, 0]),
    on: SEQ0_ON,
    off: SEQ0_OFF,
}];

/// Look up a power sequence by name, or the default one.
pub fn resolve(name: Option<&str>) -> Result<&'static PowerSequence> {
    resolve_in(SEQUENCES, name)
}

pub fn resolve_in<'a>(sequences: &'a [PowerSequence], name: Option<&str>) -> Result<&'a PowerSequence> {
    let found = match name {
        None => sequences.first(),
        Some(name) => sequences.iter().find(|seq| seq.name == name),
    };

    found.ok_or_else(|| {
        let name = name.unwrap_or("<default>");
        error!("Sequence not found: {}", name);
        Error::NotFound(format!("power sequence {}", name))
    })
}

// Devices addressed by a procedure. Power-off runs without the PMIC.
struct Devices<'a> {
    switches: &'a mut (dyn LineControl<Line = SwitchLine> + 'a),
    pmic: Option<&'a mut (dyn HvPmic + 'a)>,
    dac: &'a mut (dyn VcomDac + 'a),
}

impl Devices<'_> {
    async fn execute(&mut self, action: Action, vcom: u8) -> hw_trait::Result<()> {
        match action {
            Action::Switch(line, on) => self.switches.set_line(line, on).await,
            Action::WaitForPowerOk => match self.pmic.as_deref_mut() {
                Some(pmic) => pmic.wait_for_power_ok().await,
                None => Err(HwError::NotSupported("no HV PMIC in this procedure".into())),
            },
            Action::VcomOutput => self.dac.output(VCOM_DAC_CHANNEL, vcom).await,
            Action::DacPower(mode) => self.dac.set_power(VCOM_DAC_CHANNEL, mode).await,
        }
    }

    async fn run(&mut self, steps: &[Step], vcom: u8) -> Result<()> {
        for step in steps {
            match self.execute(step.action, vcom).await {
                Ok(()) => info!("{} ok", step.label),
                Err(source) => {
                    error!(error = %source, "{} failed (ERROR)", step.label);
                    return Err(Error::StepFailure {
                        label: step.label,
                        source,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Run the power-on procedure of `sequence` with the given VCOM DAC value.
pub async fn power_on<S, P, D>(
    sequence: &PowerSequence,
    switches: &mut S,
    pmic: &mut P,
    dac: &mut D,
    vcom: u8,
) -> Result<()>
where
    S: LineControl<Line = SwitchLine>,
    P: HvPmic,
    D: VcomDac,
{
    debug!(sequence = sequence.name, vcom, "Power on");
    let mut devices = Devices {
        switches,
        pmic: Some(pmic),
        dac,
    };
    devices.run(sequence.on, vcom).await
}

/// Run the power-off procedure of `sequence`.
pub async fn power_off<S, D>(sequence: &PowerSequence, switches: &mut S, dac: &mut D) -> Result<()>
where
    S: LineControl<Line = SwitchLine>,
    D: VcomDac,
{
    debug!(sequence = sequence.name, "Power off");
    let mut devices = Devices {
        switches,
        pmic: None,
        dac,
    };
    devices.run(sequence.off, DEFAULT_VCOM).await
}

/// Program the HV PMIC power sequencer with the timings of `sequence`.
pub async fn apply_timings<I2C: I2c>(pmic: &mut Max17135<I2C>, sequence: &PowerSequence) -> Result<()> {
    info!("Setting timings for {}:", sequence.name);
    for (index, ms) in sequence.timings.as_array().iter().enumerate() {
        info!("{}: {}", index, ms);
    }
    pmic.set_timings(sequence.timings.as_array()).await?;
    Ok(())
}
