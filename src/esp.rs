//! ESP-IDF legacy I2C master driver backend.
//!
//! Every transaction builds a native command link from the [`CommandLink`],
//! runs it with `i2c_master_cmd_begin` and deletes it again.

use core::marker::PhantomData;

use esp_idf_sys::*;
use esp_idf_sys::{esp, EspError};
use log::*;

use crate::{
    address::BusId,
    command::{Command, CommandLink, ReadAck},
    config::MasterConfig,
    driver::{MasterHandle, Platform},
    error::{I2cError, TransactionError},
};

/// The chip's I2C controllers, addressed by port number.
///
/// Installation goes straight to the IDF driver, which refuses a second
/// install on the same port. Don't hand a port used here to
/// `esp_idf_hal::i2c::I2cDriver` as well.
#[derive(Debug, Default)]
pub struct EspPlatform;

impl EspPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl Platform for EspPlatform {
    type Handle = EspHandle;

    fn install(&mut self, bus: BusId, config: &MasterConfig) -> Result<EspHandle, I2cError> {
        let port = bus.0 as i2c_port_t;
        let conf = i2c_config_t {
            mode: i2c_mode_t_I2C_MODE_MASTER,
            sda_io_num: config.sda.0 as i32,
            sda_pullup_en: config.sda_pullup,
            scl_io_num: config.scl.0 as i32,
            scl_pullup_en: config.scl_pullup,
            __bindgen_anon_1: i2c_config_t__bindgen_ty_1 {
                master: i2c_config_t__bindgen_ty_1__bindgen_ty_1 {
                    clk_speed: config.clock_hz,
                },
            },
            ..Default::default()
        };

        esp!(unsafe { i2c_param_config(port, &conf) }).map_err(|e| {
            warn!("I2C{}: i2c_param_config: {}", bus, e);
            match e.code() {
                c if c == ESP_ERR_INVALID_ARG as i32 => {
                    I2cError::Config("rejected by i2c_param_config")
                }
                c => I2cError::Platform(c),
            }
        })?;

        // Slave buffers and interrupt flags are unused in master mode.
        esp!(unsafe { i2c_driver_install(port, i2c_mode_t_I2C_MODE_MASTER, 0, 0, 0) }).map_err(
            |e| {
                warn!("I2C{}: i2c_driver_install: {}", bus, e);
                match e.code() {
                    c if c == ESP_FAIL || c == ESP_ERR_INVALID_STATE as i32 => {
                        I2cError::ResourceBusy(bus)
                    }
                    c if c == ESP_ERR_INVALID_ARG as i32 => {
                        I2cError::Config("rejected by i2c_driver_install")
                    }
                    c => I2cError::Platform(c),
                }
            },
        )?;

        Ok(EspHandle { port })
    }
}

/// An installed master driver on one port.
#[derive(Debug)]
pub struct EspHandle {
    port: i2c_port_t,
}

impl EspHandle {
    pub fn port(&self) -> i2c_port_t {
        self.port
    }
}

impl MasterHandle for EspHandle {
    fn tick_rate_hz(&self) -> u32 {
        configTICK_RATE_HZ
    }

    fn execute(&mut self, link: &mut CommandLink<'_>, timeout_ticks: u32) -> Result<(), I2cError> {
        let mut native = NativeLink::new()?;
        for command in link.commands_mut() {
            native.push(command).map_err(|e| I2cError::Platform(e.code()))?;
        }

        esp!(unsafe { i2c_master_cmd_begin(self.port, native.0, timeout_ticks) }).map_err(|e| {
            match e.code() {
                // The legacy driver reports a missing ACK (and a lost
                // arbitration) as a plain failure.
                c if c == ESP_FAIL => TransactionError::Nack.into(),
                c if c == ESP_ERR_TIMEOUT as i32 => TransactionError::Timeout.into(),
                c => I2cError::Platform(c),
            }
        })
    }
}

/// Owned `i2c_cmd_handle_t`, deleted on drop. Borrows the buffers it points
/// into for as long as it lives.
struct NativeLink<'b>(i2c_cmd_handle_t, PhantomData<&'b mut [u8]>);

impl<'b> NativeLink<'b> {
    fn new() -> Result<Self, I2cError> {
        let handle = unsafe { i2c_cmd_link_create() };
        if handle.is_null() {
            return Err(I2cError::Platform(ESP_ERR_NO_MEM as i32));
        }
        Ok(Self(handle, PhantomData))
    }

    fn push(&mut self, command: &'b mut Command<'_>) -> Result<(), EspError> {
        match command {
            Command::Start => esp!(unsafe { i2c_master_start(self.0) }),
            Command::WriteByte { byte, ack_check } => {
                esp!(unsafe { i2c_master_write_byte(self.0, *byte, *ack_check) })
            }
            Command::Write { bytes, ack_check } => esp!(unsafe {
                i2c_master_write(self.0, bytes.as_ptr() as *mut u8, bytes.len(), *ack_check)
            }),
            Command::Read { buf, ack } => {
                let ack = match ack {
                    ReadAck::Ack => i2c_ack_type_t_I2C_MASTER_ACK,
                    ReadAck::Nack => i2c_ack_type_t_I2C_MASTER_NACK,
                    ReadAck::LastNack => i2c_ack_type_t_I2C_MASTER_LAST_NACK,
                };
                esp!(unsafe { i2c_master_read(self.0, buf.as_mut_ptr(), buf.len(), ack) })
            }
            Command::Stop => esp!(unsafe { i2c_master_stop(self.0) }),
        }
    }
}

impl Drop for NativeLink<'_> {
    fn drop(&mut self) {
        unsafe { i2c_cmd_link_delete(self.0) }
    }
}
