use embedded_hal::blocking::i2c::{Read, Write, WriteRead};

use crate::{
    address::BusId, driver::Platform, error::I2cError, observe::TransactionObserver,
    registry::BusRegistry,
};

/// One bus of a [`BusRegistry`] behind the `embedded-hal` blocking I2C
/// traits, so off-the-shelf sensor drivers can run on it.
///
/// A one-byte write followed by data is a register write, and a one-byte
/// `write_read` is a register read; both go through the registry's register
/// path and are reported to its observer. Anything else is sent as a plain
/// transfer.
pub struct BusProxy<'r, P: Platform, O> {
    registry: &'r mut BusRegistry<P, O>,
    bus: BusId,
}

impl<'r, P: Platform, O: TransactionObserver> BusProxy<'r, P, O> {
    pub(crate) fn new(registry: &'r mut BusRegistry<P, O>, bus: BusId) -> Self {
        Self { registry, bus }
    }

    pub fn bus(&self) -> BusId {
        self.bus
    }
}

impl<'r, P: Platform, O: TransactionObserver> Write for BusProxy<'r, P, O> {
    type Error = I2cError;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        match bytes.split_first() {
            Some((reg, payload)) => self
                .registry
                .write_register(self.bus, address, *reg, payload),
            None => self.registry.write(self.bus, address, bytes),
        }
    }
}

impl<'r, P: Platform, O: TransactionObserver> Read for BusProxy<'r, P, O> {
    type Error = I2cError;

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.registry.read(self.bus, address, buffer)
    }
}

impl<'r, P: Platform, O: TransactionObserver> WriteRead for BusProxy<'r, P, O> {
    type Error = I2cError;

    fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error> {
        match bytes {
            [reg] => self.registry.read_register(self.bus, address, *reg, buffer),
            _ => self.registry.write_read(self.bus, address, bytes, buffer),
        }
    }
}
