//! Register transactions over an installed master handle.
//!
//! These functions build the command sequence, run it once and return the
//! driver's result. They perform no logging and no retries; a failed
//! transaction has to be repeated in full by the caller.

use crate::{
    address::DeviceAddress,
    command::{CommandLink, ReadAck},
    config::Settings,
    driver::MasterHandle,
    error::I2cError,
};

/// START, address+W, register, payload, STOP. Every byte is ACK-checked.
pub fn write_link<'a>(addr: DeviceAddress, reg: u8, payload: &'a [u8]) -> CommandLink<'a> {
    let mut link = CommandLink::new();
    link.start()
        .write_byte(addr.write_byte(), true)
        .write_byte(reg, true)
        .write(payload, true)
        .stop();
    link
}

/// START, address+W, `bytes`, repeated START, address+R, read with the last
/// byte NACKed, STOP.
pub fn write_read_link<'a>(
    addr: DeviceAddress,
    bytes: &'a [u8],
    out: &'a mut [u8],
) -> CommandLink<'a> {
    let mut link = CommandLink::new();
    link.start()
        .write_byte(addr.write_byte(), true)
        .write(bytes, true)
        .start()
        .write_byte(addr.read_byte(), true)
        .read(out, ReadAck::LastNack)
        .stop();
    link
}

fn check_len(len: usize, settings: &Settings) -> Result<(), I2cError> {
    if len > settings.max_transfer_len {
        Err(I2cError::TooLong {
            len,
            max: settings.max_transfer_len,
        })
    } else {
        Ok(())
    }
}

fn check_read_len(len: usize, settings: &Settings) -> Result<(), I2cError> {
    if len == 0 {
        return Err(I2cError::EmptyRead);
    }
    check_len(len, settings)
}

fn execute<H: MasterHandle>(
    handle: &mut H,
    settings: &Settings,
    link: &mut CommandLink<'_>,
) -> Result<(), I2cError> {
    let ticks = settings.timeout.to_ticks(handle.tick_rate_hz());
    handle.execute(link, ticks)
}

/// Writes `payload` to register `reg` of the device at `addr`.
///
/// An empty payload only sets the device's register pointer.
pub fn write_register<H: MasterHandle>(
    handle: &mut H,
    settings: &Settings,
    addr: DeviceAddress,
    reg: u8,
    payload: &[u8],
) -> Result<(), I2cError> {
    check_len(payload.len(), settings)?;
    let mut link = write_link(addr, reg, payload);
    execute(handle, settings, &mut link)
}

/// Reads `out.len()` bytes starting at register `reg`.
///
/// On error the contents of `out` are undefined.
pub fn read_register<H: MasterHandle>(
    handle: &mut H,
    settings: &Settings,
    addr: DeviceAddress,
    reg: u8,
    out: &mut [u8],
) -> Result<(), I2cError> {
    check_read_len(out.len(), settings)?;
    let reg = [reg];
    let mut link = write_read_link(addr, &reg, out);
    execute(handle, settings, &mut link)
}

/// Plain write without a register byte.
pub fn write<H: MasterHandle>(
    handle: &mut H,
    settings: &Settings,
    addr: DeviceAddress,
    bytes: &[u8],
) -> Result<(), I2cError> {
    check_len(bytes.len(), settings)?;
    let mut link = CommandLink::new();
    link.start()
        .write_byte(addr.write_byte(), true)
        .write(bytes, true)
        .stop();
    execute(handle, settings, &mut link)
}

/// Plain read without a register byte.
pub fn read<H: MasterHandle>(
    handle: &mut H,
    settings: &Settings,
    addr: DeviceAddress,
    out: &mut [u8],
) -> Result<(), I2cError> {
    check_read_len(out.len(), settings)?;
    let mut link = CommandLink::new();
    link.start()
        .write_byte(addr.read_byte(), true)
        .read(out, ReadAck::LastNack)
        .stop();
    execute(handle, settings, &mut link)
}

/// Writes `bytes` then reads into `out` across a repeated START.
pub fn write_read<H: MasterHandle>(
    handle: &mut H,
    settings: &Settings,
    addr: DeviceAddress,
    bytes: &[u8],
    out: &mut [u8],
) -> Result<(), I2cError> {
    check_len(bytes.len(), settings)?;
    check_read_len(out.len(), settings)?;
    let mut link = write_read_link(addr, bytes, out);
    execute(handle, settings, &mut link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        command::Command,
        config::Timeout,
        error::TransactionError,
        sim::{BusEvent, SimDevice, SimHandle},
    };

    fn addr(a: u8) -> DeviceAddress {
        DeviceAddress::new(a).unwrap()
    }

    fn settings() -> Settings {
        Settings {
            timeout: Timeout::from_millis(50),
            max_transfer_len: 16,
        }
    }

    #[test]
    fn test_write_link_shape() {
        let payload = [0x01, 0x02];
        let link = write_link(addr(0x23), 0x0f, &payload);
        assert_eq!(
            link.commands(),
            &[
                Command::Start,
                Command::WriteByte {
                    byte: 0x46,
                    ack_check: true
                },
                Command::WriteByte {
                    byte: 0x0f,
                    ack_check: true
                },
                Command::Write {
                    bytes: &payload[..],
                    ack_check: true
                },
                Command::Stop,
            ]
        );
    }

    #[test]
    fn test_write_register_bus_trace() {
        let mut handle = SimHandle::new(100);
        handle.attach(SimDevice::new(0x23));

        write_register(&mut handle, &settings(), addr(0x23), 0x0f, &[0x01]).unwrap();

        assert_eq!(
            handle.trace(),
            &[
                BusEvent::Start,
                BusEvent::Byte(0x46),
                BusEvent::Byte(0x0f),
                BusEvent::Byte(0x01),
                BusEvent::Stop,
            ]
        );
        assert_eq!(handle.device(0x23).unwrap().register(0x0f), 0x01);
        // 50 ms at 100 Hz
        assert_eq!(handle.last_timeout_ticks(), Some(5));
    }

    #[test]
    fn test_read_register_bus_trace() {
        let mut handle = SimHandle::new(100);
        handle.attach(SimDevice::new(0x23).with_registers(0x00, &[0xaa, 0xbb]));

        let mut out = [0u8; 2];
        read_register(&mut handle, &settings(), addr(0x23), 0x00, &mut out).unwrap();

        assert_eq!(out, [0xaa, 0xbb]);
        assert_eq!(
            handle.trace(),
            &[
                BusEvent::Start,
                BusEvent::Byte(0x46),
                BusEvent::Byte(0x00),
                BusEvent::Start,
                BusEvent::Byte(0x47),
                BusEvent::Read {
                    len: 2,
                    last_nack: true
                },
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn test_empty_write_sets_pointer_only() {
        let mut handle = SimHandle::new(100);
        handle.attach(SimDevice::new(0x40));

        write_register(&mut handle, &settings(), addr(0x40), 0x05, &[]).unwrap();

        assert_eq!(
            handle.trace(),
            &[
                BusEvent::Start,
                BusEvent::Byte(0x80),
                BusEvent::Byte(0x05),
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn test_length_checks_happen_before_bus_traffic() {
        let mut handle = SimHandle::new(100);
        handle.attach(SimDevice::new(0x23));

        let payload = [0u8; 17];
        assert_eq!(
            write_register(&mut handle, &settings(), addr(0x23), 0x00, &payload),
            Err(I2cError::TooLong { len: 17, max: 16 })
        );
        let mut out = [0u8; 0];
        assert_eq!(
            read_register(&mut handle, &settings(), addr(0x23), 0x00, &mut out),
            Err(I2cError::EmptyRead)
        );
        assert!(handle.trace().is_empty());
    }

    #[test]
    fn test_nack_on_missing_device() {
        let mut handle = SimHandle::new(100);

        let mut out = [0u8; 1];
        let result = read_register(&mut handle, &settings(), addr(0x10), 0x00, &mut out);
        assert_eq!(result, Err(I2cError::Transaction(TransactionError::Nack)));
        assert_eq!(handle.trace().last(), Some(&BusEvent::Stop));
    }

    #[test]
    fn test_write_read_plain() {
        let mut handle = SimHandle::new(100);
        handle.attach(SimDevice::new(0x53).with_registers(0x20, &[0x82, 0x03]));

        let mut out = [0u8; 2];
        write_read(&mut handle, &settings(), addr(0x53), &[0x20], &mut out).unwrap();
        assert_eq!(out, [0x82, 0x03]);

        write(&mut handle, &settings(), addr(0x53), &[0x10, 0x02]).unwrap();
        assert_eq!(handle.device(0x53).unwrap().register(0x10), 0x02);

        let mut one = [0u8; 1];
        read(&mut handle, &settings(), addr(0x53), &mut one).unwrap();
        // Pointer auto-incremented past 0x10 by the write.
        assert_eq!(one, [0x00]);
    }
}
