//! Bus registry: one installed master handle per bus id.
//!
//! Handles are created by [`BusRegistry::init_master`] and every register
//! access looks its bus up here, so there is no global driver table.
//!
//! Calls block on the calling thread until the transaction completes or the
//! configured timeout elapses, and are therefore executed in submission
//! order. The registry itself is not synchronized: methods take `&mut self`,
//! and callers sharing a registry between threads wrap it in a `Mutex` (or
//! similar) and hold the lock for each call.

use std::collections::BTreeMap;

use log::*;

use crate::{
    address::{BusId, DeviceAddress, Pin},
    config::{MasterConfig, Settings},
    driver::Platform,
    error::I2cError,
    hal::BusProxy,
    observe::{LogObserver, TransactionEvent, TransactionObserver},
    transaction,
};

pub struct BusRegistry<P: Platform, O = LogObserver> {
    platform: P,
    buses: BTreeMap<BusId, P::Handle>,
    settings: Settings,
    observer: O,
}

impl<P: Platform> BusRegistry<P> {
    /// Registry with the compiled-in settings and debug logging of every
    /// transaction.
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            buses: BTreeMap::new(),
            settings: Settings::default(),
            observer: LogObserver,
        }
    }
}

impl<P: Platform, O: TransactionObserver> BusRegistry<P, O> {
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the observer notified after each register transaction.
    pub fn with_observer<O2: TransactionObserver>(self, observer: O2) -> BusRegistry<P, O2> {
        BusRegistry {
            platform: self.platform,
            buses: self.buses,
            settings: self.settings,
            observer,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn is_initialized(&self, bus: BusId) -> bool {
        self.buses.contains_key(&bus)
    }

    pub fn handle(&self, bus: BusId) -> Option<&P::Handle> {
        self.buses.get(&bus)
    }

    pub fn handle_mut(&mut self, bus: BusId) -> Option<&mut P::Handle> {
        self.buses.get_mut(&bus)
    }

    /// Configures `bus` as master on the given pins with pull-ups enabled
    /// and starts its driver.
    ///
    /// Must be called once per bus before any register access. A second
    /// call for the same bus fails with [`I2cError::ResourceBusy`].
    pub fn init_master(
        &mut self,
        bus: BusId,
        scl: Pin,
        sda: Pin,
        clock_hz: u32,
    ) -> Result<(), I2cError> {
        self.init_with(bus, MasterConfig::new(scl, sda, clock_hz))
    }

    /// Like [`init_master`](Self::init_master) with a full [`MasterConfig`].
    pub fn init_with(&mut self, bus: BusId, config: MasterConfig) -> Result<(), I2cError> {
        config.validate()?;
        if self.buses.contains_key(&bus) {
            return Err(I2cError::ResourceBusy(bus));
        }

        let handle = self.platform.install(bus, &config)?;
        info!(
            "I2C{}: master on SCL {} / SDA {} at {} Hz",
            bus, config.scl.0, config.sda.0, config.clock_hz
        );
        self.buses.insert(bus, handle);
        Ok(())
    }

    /// Writes `payload` to register `reg` of device `addr` on `bus`.
    pub fn write_register(
        &mut self,
        bus: BusId,
        addr: u8,
        reg: u8,
        payload: &[u8],
    ) -> Result<(), I2cError> {
        let device = DeviceAddress::new(addr)?;
        let handle = self
            .buses
            .get_mut(&bus)
            .ok_or(I2cError::NotInitialized(bus))?;

        let outcome = transaction::write_register(handle, &self.settings, device, reg, payload);
        self.observer.on_transaction(&TransactionEvent::write(
            bus, device, reg, payload, outcome,
        ));
        outcome
    }

    /// Reads `out.len()` bytes from register `reg` of device `addr` on `bus`.
    ///
    /// When this fails the contents of `out` are undefined.
    pub fn read_register(
        &mut self,
        bus: BusId,
        addr: u8,
        reg: u8,
        out: &mut [u8],
    ) -> Result<(), I2cError> {
        let device = DeviceAddress::new(addr)?;
        let handle = self
            .buses
            .get_mut(&bus)
            .ok_or(I2cError::NotInitialized(bus))?;

        let outcome = transaction::read_register(handle, &self.settings, device, reg, out);
        self.observer
            .on_transaction(&TransactionEvent::read(bus, device, reg, out, outcome));
        outcome
    }

    /// Plain write of `bytes` to device `addr`, without a register byte.
    /// Not reported to the observer.
    pub fn write(&mut self, bus: BusId, addr: u8, bytes: &[u8]) -> Result<(), I2cError> {
        let device = DeviceAddress::new(addr)?;
        let handle = self
            .buses
            .get_mut(&bus)
            .ok_or(I2cError::NotInitialized(bus))?;
        transaction::write(handle, &self.settings, device, bytes)
    }

    /// Plain read from device `addr`. Not reported to the observer.
    pub fn read(&mut self, bus: BusId, addr: u8, out: &mut [u8]) -> Result<(), I2cError> {
        let device = DeviceAddress::new(addr)?;
        let handle = self
            .buses
            .get_mut(&bus)
            .ok_or(I2cError::NotInitialized(bus))?;
        transaction::read(handle, &self.settings, device, out)
    }

    /// Write then read across a repeated START. Not reported to the observer.
    pub fn write_read(
        &mut self,
        bus: BusId,
        addr: u8,
        bytes: &[u8],
        out: &mut [u8],
    ) -> Result<(), I2cError> {
        let device = DeviceAddress::new(addr)?;
        let handle = self
            .buses
            .get_mut(&bus)
            .ok_or(I2cError::NotInitialized(bus))?;
        transaction::write_read(handle, &self.settings, device, bytes, out)
    }

    /// Borrows `bus` as an `embedded-hal` blocking I2C bus.
    pub fn proxy(&mut self, bus: BusId) -> Result<BusProxy<'_, P, O>, I2cError> {
        if !self.is_initialized(bus) {
            return Err(I2cError::NotInitialized(bus));
        }
        Ok(BusProxy::new(self, bus))
    }
}
