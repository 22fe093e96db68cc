//! Boolean control lines.
//!
//! Several unrelated devices expose on/off lines: the CPLD switch bank has
//! its HV and VCOM switches, the HV PMIC has its rail enables. They are all
//! queried and toggled through this one trait, so the generic
//! [`report_or_set`](crate::switch::report_or_set) utility works for any of
//! them.

use async_trait::async_trait;

use super::Result;

#[async_trait]
pub trait LineControl: Send {
    /// Device-specific line identifier.
    type Line: Copy + Send + Sync + std::fmt::Debug + 'static;

    /// Read the current state of `line`.
    async fn get_line(&mut self, line: Self::Line) -> Result<bool>;

    /// Drive `line` on or off.
    async fn set_line(&mut self, line: Self::Line, on: bool) -> Result<()>;
}
