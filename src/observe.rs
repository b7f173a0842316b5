//! Transaction events for diagnostics.
//!
//! The registry reports every register access to a [`TransactionObserver`]
//! after it completes. [`LogObserver`] turns the event into a debug line.

use core::fmt;

use log::*;
use serde::Serialize;

use crate::{
    address::{BusId, DeviceAddress},
    error::I2cError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionKind {
    Write,
    Read,
}

/// Short form of the transferred data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PayloadSummary {
    Byte(u8),
    /// Two bytes, little-endian like the target stores them.
    Word(u16),
    Size(usize),
}

impl PayloadSummary {
    pub fn of(bytes: &[u8]) -> Self {
        match *bytes {
            [b] => PayloadSummary::Byte(b),
            [lo, hi] => PayloadSummary::Word(u16::from_le_bytes([lo, hi])),
            _ => PayloadSummary::Size(bytes.len()),
        }
    }
}

impl fmt::Display for PayloadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadSummary::Byte(v) => write!(f, "VAL = {:#04x}", v),
            PayloadSummary::Word(v) => write!(f, "VAL = {:#06x}", v),
            PayloadSummary::Size(n) => write!(f, "SIZE = {}", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransactionEvent {
    pub kind: TransactionKind,
    pub bus: BusId,
    pub device: DeviceAddress,
    pub register: u8,
    pub payload: PayloadSummary,
    pub outcome: Result<(), I2cError>,
}

impl TransactionEvent {
    /// Event for a register write of `payload`.
    pub fn write(
        bus: BusId,
        device: DeviceAddress,
        register: u8,
        payload: &[u8],
        outcome: Result<(), I2cError>,
    ) -> Self {
        Self {
            kind: TransactionKind::Write,
            bus,
            device,
            register,
            payload: PayloadSummary::of(payload),
            outcome,
        }
    }

    /// Event for a register read into `out`. The value is only reported
    /// when the read succeeded; after a failure `out` holds nothing useful.
    pub fn read(
        bus: BusId,
        device: DeviceAddress,
        register: u8,
        out: &[u8],
        outcome: Result<(), I2cError>,
    ) -> Self {
        let payload = match outcome {
            Ok(()) => PayloadSummary::of(out),
            Err(_) => PayloadSummary::Size(out.len()),
        };
        Self {
            kind: TransactionKind::Read,
            bus,
            device,
            register,
            payload,
            outcome,
        }
    }
}

impl fmt::Display for TransactionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.kind {
            TransactionKind::Write => "write_register",
            TransactionKind::Read => "read_register",
        };
        write!(
            f,
            "{}(PORT = {}, ADDR = {}, REG = {:#04x}, {}): ",
            op, self.bus, self.device, self.register, self.payload
        )?;
        match &self.outcome {
            Ok(()) => f.write_str("ok"),
            Err(e) => write!(f, "{}", e),
        }
    }
}

pub trait TransactionObserver {
    fn on_transaction(&mut self, event: &TransactionEvent);
}

impl<F> TransactionObserver for F
where
    F: FnMut(&TransactionEvent),
{
    fn on_transaction(&mut self, event: &TransactionEvent) {
        self(event)
    }
}

/// Writes each event to the `log` facade at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl TransactionObserver for LogObserver {
    fn on_transaction(&mut self, event: &TransactionEvent) {
        debug!(target: "I2C", "{}", event);
    }
}
