use serde::Serialize;
use thiserror::Error;

use crate::address::BusId;

/// Failure of a single bus transaction as reported by the master driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum TransactionError {
    /// The slave did not acknowledge an ack-checked byte.
    #[error("no acknowledge from device")]
    Nack,
    /// Another master won the bus.
    #[error("arbitration lost")]
    ArbitrationLost,
    /// The transaction did not complete within the configured timeout.
    #[error("bus timeout")]
    Timeout,
}

/// Errors returned by the register accessor.
///
/// Everything is reported, nothing is retried. A caller that wants
/// resilience wraps the call in its own retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum I2cError {
    /// Invalid parameter to driver setup, e.g. an unsupported pin.
    #[error("invalid configuration: {0}")]
    Config(&'static str),
    /// A driver is already installed on this bus.
    #[error("bus {0} is already in use")]
    ResourceBusy(BusId),
    /// Read or write on a bus that was never initialized.
    #[error("bus {0} has not been initialized")]
    NotInitialized(BusId),
    #[error("transaction failed: {0}")]
    Transaction(#[from] TransactionError),
    #[error("{0:#04x} is not a 7-bit device address")]
    InvalidAddress(u8),
    #[error("transfer of {len} bytes exceeds the limit of {max}")]
    TooLong { len: usize, max: usize },
    #[error("read of zero bytes")]
    EmptyRead,
    /// Raw platform error code that has no better classification.
    #[error("platform error {0:#x}")]
    Platform(i32),
}

impl I2cError {
    /// True for errors raised by the device or bus during a transaction.
    pub fn is_transaction(&self) -> bool {
        matches!(self, I2cError::Transaction(_))
    }
}
