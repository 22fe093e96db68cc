//! Report or set named on/off lines.
//!
//! Commands address switches by name (`hv`, `vcom_close`, `cen2`, ...). A
//! table maps each name onto the device's own line identifier, and
//! [`report_or_set`] either reports the line state or drives it, for any
//! device implementing [`LineControl`].

use crate::error::{Error, Result};
use crate::hw_trait::LineControl;
use crate::tracing::prelude::*;

/// One entry of a switch table.
#[derive(Debug, Clone, Copy)]
pub struct SwitchId<L> {
    pub name: &'static str,
    pub line: L,
}

impl<L> SwitchId<L> {
    pub const fn new(name: &'static str, line: L) -> Self {
        Self { name, line }
    }
}

/// What [`report_or_set`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The line was queried and is in this state
    Reported(bool),
    /// The line was driven to this state
    Set(bool),
}

/// Parse `on` or `off`.
pub fn parse_on_off(value: &str) -> Result<bool> {
    match value {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(Error::InvalidArgument(format!(
            "invalid value: {}, expected [on off]",
            other
        ))),
    }
}

pub fn on_off_str(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

/// Find `name` in `table`.
pub fn lookup<L: Copy>(table: &[SwitchId<L>], name: &str) -> Option<L> {
    table.iter().find(|sw| sw.name == name).map(|sw| sw.line)
}

/// Report the state of switch `name`, or set it when `value` is given.
///
/// The name is resolved and the value parsed before the device is touched:
/// an unknown name or a malformed value never results in a bus access.
pub async fn report_or_set<D>(
    table: &[SwitchId<D::Line>],
    device: &mut D,
    name: &str,
    value: Option<&str>,
) -> Result<SwitchOutcome>
where
    D: LineControl + ?Sized,
{
    let line = lookup(table, name).ok_or_else(|| Error::NotFound(format!("switch {}", name)))?;

    match value {
        None => {
            let on = device.get_line(line).await?;
            info!("{}: {}", name, on_off_str(on));
            Ok(SwitchOutcome::Reported(on))
        }
        Some(value) => {
            let on = parse_on_off(value)?;
            device.set_line(line, on).await?;
            debug!(switch = name, state = on_off_str(on), "Switch set");
            Ok(SwitchOutcome::Set(on))
        }
    }
}
