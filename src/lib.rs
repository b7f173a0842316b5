//! Register-style access to I2C slave devices through a master controller.
//!
//! A [`BusRegistry`] owns one installed master handle per bus. After
//! [`BusRegistry::init_master`] has brought a bus up, single blocking
//! transactions read and write device registers:
//!
//! ```
//! use i2c_regs::{sim::{SimDevice, SimPlatform}, BusId, BusRegistry, Pin};
//!
//! let mut platform = SimPlatform::default();
//! platform.attach(BusId(0), SimDevice::new(0x23).with_registers(0x00, &[0xaa, 0xbb]));
//!
//! let mut registry = BusRegistry::new(platform);
//! registry.init_master(BusId(0), Pin(22), Pin(21), 400_000)?;
//!
//! let mut out = [0u8; 2];
//! registry.read_register(BusId(0), 0x23, 0x00, &mut out)?;
//! assert_eq!(out, [0xaa, 0xbb]);
//! # Ok::<(), i2c_regs::I2cError>(())
//! ```
//!
//! Errors are reported, never retried. Build with the `esp-idf` feature for
//! the ESP-IDF backend in [`esp`]; [`sim`] provides an in-memory bus for host
//! tests.

pub mod address;
pub mod command;
pub mod config;
pub mod driver;
pub mod error;
#[cfg(feature = "esp-idf")]
pub mod esp;
pub mod hal;
pub mod observe;
pub mod registry;
pub mod sim;
pub mod transaction;

pub use address::{BusId, DeviceAddress, Pin};
pub use config::{MasterConfig, Settings, Timeout};
pub use driver::{MasterHandle, Platform};
pub use error::{I2cError, TransactionError};
pub use observe::{LogObserver, TransactionEvent, TransactionObserver};
pub use registry::BusRegistry;
