//! In-memory I2C bus for host-side testing.
//!
//! [`SimHandle`] interprets a [`CommandLink`] the way a master controller
//! would, against a set of [`SimDevice`]s that behave like ordinary
//! register-pointer peripherals (first written byte selects the register,
//! subsequent bytes auto-increment). Every bus condition and byte is
//! recorded in a trace so tests can assert the exact wire sequence.

use std::collections::{HashMap, HashSet};

use crate::{
    address::BusId,
    command::{Command, CommandLink, ReadAck},
    config::MasterConfig,
    driver::{MasterHandle, Platform},
    error::{I2cError, TransactionError},
};

/// Highest GPIO number the simulated chip accepts.
pub const MAX_PIN: u8 = 39;
/// Fast-mode plus.
pub const MAX_CLOCK_HZ: u32 = 1_000_000;
/// `ESP_ERR_INVALID_STATE`, reported for malformed command sequences.
pub const INVALID_SEQUENCE: i32 = 0x103;

/// What happened on the wires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    Start,
    /// A byte driven by the master.
    Byte(u8),
    /// `len` bytes clocked in from the slave.
    Read { len: usize, last_nack: bool },
    Stop,
}

/// Misbehaviour injected into a simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    NackAddress,
    NackRegister,
    NackData,
    /// Holds SCL low for this many ticks on every transaction.
    ClockStretch { ticks: u32 },
}

#[derive(Debug, Clone)]
pub struct SimDevice {
    address: u8,
    registers: [u8; 256],
    pointer: u8,
    fault: Option<Fault>,
}

impl SimDevice {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            registers: [0; 256],
            pointer: 0,
            fault: None,
        }
    }

    /// Preloads registers starting at `start`.
    pub fn with_registers(mut self, start: u8, values: &[u8]) -> Self {
        for (i, v) in values.iter().enumerate() {
            self.registers[start.wrapping_add(i as u8) as usize] = *v;
        }
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn register(&self, reg: u8) -> u8 {
        self.registers[reg as usize]
    }

    pub fn pointer(&self) -> u8 {
        self.pointer
    }

    pub fn set_fault(&mut self, fault: Option<Fault>) {
        self.fault = fault;
    }

    fn nacks(&self, fault: Fault) -> bool {
        self.fault == Some(fault)
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    /// No START issued yet.
    Idle,
    /// Next byte is an address byte.
    Addressing,
    /// Write to device `idx`; `selected` is false until the register byte.
    Writing { idx: usize, selected: bool },
    Reading { idx: usize },
}

/// A simulated controller with an installed master driver.
#[derive(Debug, Default)]
pub struct SimHandle {
    tick_rate_hz: u32,
    devices: Vec<SimDevice>,
    trace: Vec<BusEvent>,
    last_timeout_ticks: Option<u32>,
    lose_arbitration: bool,
    transactions: usize,
}

impl SimHandle {
    pub fn new(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    pub fn attach(&mut self, device: SimDevice) -> &mut Self {
        self.devices.push(device);
        self
    }

    pub fn device(&self, address: u8) -> Option<&SimDevice> {
        self.devices.iter().find(|d| d.address == address)
    }

    pub fn device_mut(&mut self, address: u8) -> Option<&mut SimDevice> {
        self.devices.iter_mut().find(|d| d.address == address)
    }

    pub fn trace(&self) -> &[BusEvent] {
        &self.trace
    }

    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    pub fn last_timeout_ticks(&self) -> Option<u32> {
        self.last_timeout_ticks
    }

    /// Number of `execute` calls so far, failed ones included.
    pub fn transactions(&self) -> usize {
        self.transactions
    }

    /// Makes the next transaction lose arbitration at its first START.
    pub fn lose_next_arbitration(&mut self) {
        self.lose_arbitration = true;
    }

    fn run(&mut self, link: &mut CommandLink<'_>, timeout_ticks: u32) -> Result<(), I2cError> {
        let mut phase = Phase::Idle;
        for command in link.commands_mut() {
            match command {
                Command::Start => {
                    self.trace.push(BusEvent::Start);
                    if self.lose_arbitration {
                        self.lose_arbitration = false;
                        return Err(TransactionError::ArbitrationLost.into());
                    }
                    phase = Phase::Addressing;
                }
                Command::WriteByte { byte, ack_check } => {
                    phase = self.write_byte(phase, *byte, *ack_check, timeout_ticks)?;
                }
                Command::Write { bytes, ack_check } => {
                    for byte in bytes.iter() {
                        phase = self.write_byte(phase, *byte, *ack_check, timeout_ticks)?;
                    }
                }
                Command::Read { buf, ack } => {
                    let idx = match phase {
                        Phase::Reading { idx } => idx,
                        _ => return Err(I2cError::Platform(INVALID_SEQUENCE)),
                    };
                    self.trace.push(BusEvent::Read {
                        len: buf.len(),
                        last_nack: *ack == ReadAck::LastNack,
                    });
                    let device = &mut self.devices[idx];
                    for out in buf.iter_mut() {
                        *out = device.registers[device.pointer as usize];
                        device.pointer = device.pointer.wrapping_add(1);
                    }
                }
                Command::Stop => {
                    self.trace.push(BusEvent::Stop);
                    phase = Phase::Idle;
                }
            }
        }
        Ok(())
    }

    fn write_byte(
        &mut self,
        phase: Phase,
        byte: u8,
        ack_check: bool,
        timeout_ticks: u32,
    ) -> Result<Phase, I2cError> {
        self.trace.push(BusEvent::Byte(byte));
        let nack = |acked: bool| -> Result<(), I2cError> {
            if !acked && ack_check {
                Err(TransactionError::Nack.into())
            } else {
                Ok(())
            }
        };

        match phase {
            Phase::Idle => Err(I2cError::Platform(INVALID_SEQUENCE)),
            Phase::Addressing => {
                let address = byte >> 1;
                let idx = self.devices.iter().position(|d| d.address == address);
                let idx = match idx {
                    Some(idx) if !self.devices[idx].nacks(Fault::NackAddress) => idx,
                    _ => {
                        nack(false)?;
                        // Unchecked NACK: nobody is listening, the bytes go nowhere.
                        return Ok(Phase::Idle);
                    }
                };
                if let Some(Fault::ClockStretch { ticks }) = self.devices[idx].fault {
                    if ticks > timeout_ticks {
                        return Err(TransactionError::Timeout.into());
                    }
                }
                if byte & 1 == 1 {
                    Ok(Phase::Reading { idx })
                } else {
                    Ok(Phase::Writing {
                        idx,
                        selected: false,
                    })
                }
            }
            Phase::Writing { idx, selected } => {
                let device = &mut self.devices[idx];
                if !selected {
                    nack(!device.nacks(Fault::NackRegister))?;
                    device.pointer = byte;
                } else {
                    nack(!device.nacks(Fault::NackData))?;
                    device.registers[device.pointer as usize] = byte;
                    device.pointer = device.pointer.wrapping_add(1);
                }
                Ok(Phase::Writing {
                    idx,
                    selected: true,
                })
            }
            Phase::Reading { .. } => Err(I2cError::Platform(INVALID_SEQUENCE)),
        }
    }
}

impl MasterHandle for SimHandle {
    fn tick_rate_hz(&self) -> u32 {
        self.tick_rate_hz
    }

    fn execute(&mut self, link: &mut CommandLink<'_>, timeout_ticks: u32) -> Result<(), I2cError> {
        self.transactions += 1;
        self.last_timeout_ticks = Some(timeout_ticks);
        let result = self.run(link, timeout_ticks);
        if result.is_err() {
            // The controller releases the bus after an aborted transaction.
            self.trace.push(BusEvent::Stop);
        }
        result
    }
}

/// A simulated chip with `controllers` I2C peripherals.
#[derive(Debug)]
pub struct SimPlatform {
    controllers: u8,
    tick_rate_hz: u32,
    installed: HashSet<BusId>,
    pending: HashMap<BusId, Vec<SimDevice>>,
}

impl Default for SimPlatform {
    fn default() -> Self {
        // Two controllers and a 100 Hz tick, like a stock ESP32.
        Self::new(2, 100)
    }
}

impl SimPlatform {
    pub fn new(controllers: u8, tick_rate_hz: u32) -> Self {
        Self {
            controllers,
            tick_rate_hz,
            installed: HashSet::new(),
            pending: HashMap::new(),
        }
    }

    /// Wires `device` to `bus`. It shows up on the handle at install time.
    pub fn attach(&mut self, bus: BusId, device: SimDevice) -> &mut Self {
        self.pending.entry(bus).or_default().push(device);
        self
    }

    pub fn is_installed(&self, bus: BusId) -> bool {
        self.installed.contains(&bus)
    }
}

impl Platform for SimPlatform {
    type Handle = SimHandle;

    fn install(&mut self, bus: BusId, config: &MasterConfig) -> Result<SimHandle, I2cError> {
        if bus.0 >= self.controllers {
            return Err(I2cError::Config("no such I2C controller"));
        }
        if config.scl.0 > MAX_PIN || config.sda.0 > MAX_PIN {
            return Err(I2cError::Config("unsupported pin"));
        }
        if config.clock_hz > MAX_CLOCK_HZ {
            return Err(I2cError::Config("clock frequency out of range"));
        }
        if !self.installed.insert(bus) {
            return Err(I2cError::ResourceBusy(bus));
        }

        let mut handle = SimHandle::new(self.tick_rate_hz);
        for device in self.pending.remove(&bus).unwrap_or_default() {
            handle.attach(device);
        }
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Pin;

    fn config() -> MasterConfig {
        MasterConfig::new(Pin(22), Pin(21), 400_000)
    }

    #[test]
    fn test_install_twice_is_busy() {
        let mut platform = SimPlatform::default();
        assert!(platform.install(BusId(0), &config()).is_ok());
        assert!(matches!(
            platform.install(BusId(0), &config()),
            Err(I2cError::ResourceBusy(BusId(0)))
        ));
        assert!(platform.install(BusId(1), &config()).is_ok());
    }

    #[test]
    fn test_install_rejects_bad_parameters() {
        let mut platform = SimPlatform::default();
        assert!(matches!(
            platform.install(BusId(2), &config()),
            Err(I2cError::Config(_))
        ));
        assert!(matches!(
            platform.install(BusId(0), &MasterConfig::new(Pin(40), Pin(21), 100_000)),
            Err(I2cError::Config(_))
        ));
        assert!(matches!(
            platform.install(BusId(0), &MasterConfig::new(Pin(22), Pin(21), 3_400_000)),
            Err(I2cError::Config(_))
        ));
        // Failed setup must not reserve the bus.
        assert!(!platform.is_installed(BusId(0)));
    }

    #[test]
    fn test_pending_devices_move_to_handle() {
        let mut platform = SimPlatform::default();
        platform.attach(BusId(1), SimDevice::new(0x53));
        let handle = platform.install(BusId(1), &config()).unwrap();
        assert!(handle.device(0x53).is_some());
        assert_eq!(handle.tick_rate_hz(), 100);
    }

    #[test]
    fn test_unchecked_nack_is_ignored() {
        let mut handle = SimHandle::new(100);
        let mut link = CommandLink::new();
        link.start().write_byte(0x46, false).stop();
        assert!(handle.execute(&mut link, 10).is_ok());
    }

    #[test]
    fn test_register_nack() {
        let mut handle = SimHandle::new(100);
        handle.attach(SimDevice::new(0x23).with_fault(Fault::NackRegister));
        let mut link = CommandLink::new();
        link.start()
            .write_byte(0x46, true)
            .write_byte(0x0f, true)
            .stop();
        assert_eq!(
            handle.execute(&mut link, 10),
            Err(I2cError::Transaction(TransactionError::Nack))
        );
        assert_eq!(
            handle.trace(),
            &[
                BusEvent::Start,
                BusEvent::Byte(0x46),
                BusEvent::Byte(0x0f),
                BusEvent::Stop
            ]
        );
    }

    #[test]
    fn test_clock_stretch_times_out() {
        let mut handle = SimHandle::new(100);
        handle.attach(SimDevice::new(0x23).with_fault(Fault::ClockStretch { ticks: 20 }));
        let mut link = CommandLink::new();
        link.start().write_byte(0x46, true).stop();
        assert_eq!(
            handle.execute(&mut link, 10),
            Err(I2cError::Transaction(TransactionError::Timeout))
        );

        let mut link = CommandLink::new();
        link.start().write_byte(0x46, true).stop();
        assert!(handle.execute(&mut link, 20).is_ok());
    }

    #[test]
    fn test_read_without_address_is_rejected() {
        let mut handle = SimHandle::new(100);
        let mut buf = [0u8; 1];
        let mut link = CommandLink::new();
        link.start().read(&mut buf, ReadAck::LastNack).stop();
        assert_eq!(
            handle.execute(&mut link, 10),
            Err(I2cError::Platform(INVALID_SEQUENCE))
        );
    }
}
