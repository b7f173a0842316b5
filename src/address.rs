use core::{convert::TryFrom, fmt};

use serde::Serialize;

use crate::error::I2cError;

/// Identifies one physical I2C controller on the chip (port 0, 1, ...).
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct BusId(pub u8);

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for BusId {
    fn from(v: u8) -> Self {
        Self(v)
    }
}

/// A GPIO number used for SCL or SDA.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize)]
pub struct Pin(pub u8);

impl From<u8> for Pin {
    fn from(v: u8) -> Self {
        Self(v)
    }
}

/// 7-bit slave address.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    pub const MAX: u8 = 0x7f;

    pub fn new(address: u8) -> Result<Self, I2cError> {
        if address > Self::MAX {
            Err(I2cError::InvalidAddress(address))
        } else {
            Ok(Self(address))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Address byte with the R/W bit clear.
    pub fn write_byte(self) -> u8 {
        self.0 << 1
    }

    /// Address byte with the R/W bit set.
    pub fn read_byte(self) -> u8 {
        (self.0 << 1) | 1
    }
}

impl TryFrom<u8> for DeviceAddress {
    type Error = I2cError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Self::new(v)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_bytes() {
        let addr = DeviceAddress::new(0x23).unwrap();
        assert_eq!(addr.write_byte(), 0x46);
        assert_eq!(addr.read_byte(), 0x47);

        let top = DeviceAddress::new(0x7f).unwrap();
        assert_eq!(top.write_byte(), 0xfe);
        assert_eq!(top.read_byte(), 0xff);
    }

    #[test]
    fn test_rejects_eight_bit_address() {
        assert_eq!(
            DeviceAddress::try_from(0x80),
            Err(I2cError::InvalidAddress(0x80))
        );
        assert!(DeviceAddress::try_from(0x00).is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(DeviceAddress::new(0x0a).unwrap().to_string(), "0x0a");
        assert_eq!(BusId(1).to_string(), "1");
    }
}
