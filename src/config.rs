use serde::Serialize;

use crate::{address::Pin, error::I2cError};

/// Build-time configuration, read from `cfg.toml` when present.
#[toml_cfg::toml_config]
pub struct Config {
    #[default(1000)]
    timeout_ms: u32,
    #[default(256)]
    max_transfer_len: u32,
}

/// Transaction timeout in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timeout {
    pub ms: u32,
}

impl Timeout {
    pub const fn from_millis(ms: u32) -> Self {
        Self { ms }
    }

    /// Converts to the platform's tick unit.
    ///
    /// Truncates like the FreeRTOS `pdMS_TO_TICKS` macro, except that a
    /// non-zero timeout never collapses to a zero-tick (non-blocking) wait.
    pub fn to_ticks(self, tick_rate_hz: u32) -> u32 {
        let ticks = (self.ms as u64 * tick_rate_hz as u64 / 1000).min(u32::MAX as u64) as u32;
        if ticks == 0 && self.ms > 0 {
            1
        } else {
            ticks
        }
    }
}

/// Settings applied to every transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub timeout: Timeout,
    /// Longest payload or destination buffer accepted in one transaction.
    pub max_transfer_len: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: Timeout::from_millis(CONFIG.timeout_ms),
            max_transfer_len: CONFIG.max_transfer_len as usize,
        }
    }
}

/// Master-mode setup for one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MasterConfig {
    pub scl: Pin,
    pub sda: Pin,
    pub clock_hz: u32,
    pub scl_pullup: bool,
    pub sda_pullup: bool,
}

impl MasterConfig {
    /// Master configuration with the internal pull-ups enabled on both lines.
    pub fn new(scl: Pin, sda: Pin, clock_hz: u32) -> Self {
        Self {
            scl,
            sda,
            clock_hz,
            scl_pullup: true,
            sda_pullup: true,
        }
    }

    pub fn validate(&self) -> Result<(), I2cError> {
        if self.clock_hz == 0 {
            return Err(I2cError::Config("clock frequency must be non-zero"));
        }
        if self.scl == self.sda {
            return Err(I2cError::Config("SCL and SDA must use different pins"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_ticks() {
        // 100 Hz is the ESP-IDF default tick rate, 10 ms per tick.
        assert_eq!(Timeout::from_millis(1000).to_ticks(100), 100);
        assert_eq!(Timeout::from_millis(25).to_ticks(100), 2);
        assert_eq!(Timeout::from_millis(1000).to_ticks(1000), 1000);
    }

    #[test]
    fn test_timeout_never_rounds_to_zero() {
        assert_eq!(Timeout::from_millis(5).to_ticks(100), 1);
        assert_eq!(Timeout::from_millis(0).to_ticks(100), 0);
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.timeout.ms, CONFIG.timeout_ms);
        assert_eq!(settings.max_transfer_len, CONFIG.max_transfer_len as usize);
    }

    #[test]
    fn test_master_config() {
        let config = MasterConfig::new(Pin(22), Pin(21), 400_000);
        assert!(config.scl_pullup && config.sda_pullup);
        assert!(config.validate().is_ok());

        assert!(matches!(
            MasterConfig::new(Pin(22), Pin(22), 400_000).validate(),
            Err(I2cError::Config(_))
        ));
        assert!(matches!(
            MasterConfig::new(Pin(22), Pin(21), 0).validate(),
            Err(I2cError::Config(_))
        ));
    }
}
