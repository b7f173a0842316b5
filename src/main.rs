use esp_idf_hal::delay::FreeRtos;
use esp_idf_sys as _; // If using the `binstart` feature of `esp-idf-sys`, always keep this module imported
use log::*;

use i2c_regs::{esp::EspPlatform, BusId, BusRegistry, Pin};

use anyhow::Result;

const BUS: BusId = BusId(0);
const SCL: Pin = Pin(22);
const SDA: Pin = Pin(21);

// ENS160 air quality sensor, a common part on these boards.
const DEVICE: u8 = 0x53;
const PART_ID_REG: u8 = 0x00;
const OPMODE_REG: u8 = 0x10;
const STATUS_REG: u8 = 0x20;
const OPMODE_STANDARD: u8 = 0x02;

fn main() -> Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_sys::link_patches();
    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("Setting up I2C bus...");
    let mut registry = BusRegistry::new(EspPlatform::new());
    registry.init_master(BUS, SCL, SDA, 400_000)?;

    let mut part_id = [0u8; 2];
    registry.read_register(BUS, DEVICE, PART_ID_REG, &mut part_id)?;
    info!("device {:#04x}: part id {:#06x}", DEVICE, u16::from_le_bytes(part_id));

    registry.write_register(BUS, DEVICE, OPMODE_REG, &[OPMODE_STANDARD])?;

    loop {
        let mut status = [0u8; 1];
        match registry.read_register(BUS, DEVICE, STATUS_REG, &mut status) {
            Ok(()) => info!("device {:#04x}: status {:#04x}", DEVICE, status[0]),
            // Retrying is up to us; just try again on the next poll.
            Err(e) => warn!("device {:#04x}: {}", DEVICE, e),
        }
        FreeRtos::delay_ms(1000);
    }
}
