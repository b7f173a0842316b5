//! Seam to the platform's I2C master driver.
//!
//! The driver owns clocking, bus timing and pull-up configuration. This
//! crate only sequences calls into it.

use crate::{address::BusId, command::CommandLink, config::MasterConfig, error::I2cError};

/// Creates master handles for the controllers on the chip.
pub trait Platform {
    type Handle: MasterHandle;

    /// Applies `config` to `bus` and starts the driver.
    ///
    /// Reserves the peripheral and its pins for the lifetime of the handle.
    /// Fails with [`I2cError::Config`] for parameters the hardware does not
    /// support and [`I2cError::ResourceBusy`] when a driver is already
    /// installed on `bus`.
    fn install(&mut self, bus: BusId, config: &MasterConfig) -> Result<Self::Handle, I2cError>;
}

/// An installed master driver for one controller.
pub trait MasterHandle {
    /// Rate of the tick unit `execute` takes its timeout in.
    fn tick_rate_hz(&self) -> u32;

    /// Runs `link` as one transaction, blocking until it completes or
    /// `timeout_ticks` elapse.
    fn execute(&mut self, link: &mut CommandLink<'_>, timeout_ticks: u32) -> Result<(), I2cError>;
}

impl<H: MasterHandle + ?Sized> MasterHandle for &mut H {
    fn tick_rate_hz(&self) -> u32 {
        (**self).tick_rate_hz()
    }

    fn execute(&mut self, link: &mut CommandLink<'_>, timeout_ticks: u32) -> Result<(), I2cError> {
        (**self).execute(link, timeout_ticks)
    }
}
