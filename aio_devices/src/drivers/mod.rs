//! AIO driver implementations.
//!
//! This module contains the built-in simulation drivers:
//!
//! - [`loopback`] - Byte FIFO per instance, full capability set
//! - [`adc`] - Simulated input-only ADC
//! - [`dac`] - Simulated output-only DAC with exclusive channels
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `AioDriver` trait from `aio_common::device`
//! 3. Add a `DriverKind` variant and a match arm in [`create_driver`]

pub mod adc;
pub mod dac;
pub mod loopback;

pub use adc::{AdcRequest, SimAdcDriver};
pub use dac::{DacRequest, SimDacDriver};
pub use loopback::{LOOPBACK_CAPACITY, LoopbackDriver, LoopbackRequest};

use aio_common::config::{AioConfig, DriverConfig, DriverKind};
use aio_common::device::AioDriver;
use aio_common::error::{AioError, FIRST_DRIVER_CODE};
use tracing::info;

use crate::dispatch::AioDevices;

/// Driver status: instance does not exist.
pub const ERR_NO_INSTANCE: i32 = FIRST_DRIVER_CODE - 1;

/// Driver status: ioctl parameter missing or of the wrong type.
pub const ERR_BAD_PARAM: i32 = FIRST_DRIVER_CODE - 2;

/// Bytes per converter sample (little-endian `u16`).
pub const SAMPLE_BYTES: usize = 2;

/// Largest code representable with `bits` of resolution (1..=16).
#[inline]
pub(crate) fn max_code(bits: u8) -> u16 {
    ((1u32 << bits) - 1) as u16
}

/// Factory function type for creating driver instances from configuration.
pub type DriverFactory = fn(&DriverConfig) -> Result<Box<dyn AioDriver>, AioError>;

/// Create a driver instance for one `[[drivers]]` entry.
///
/// # Errors
/// `AioError::InvalidDescriptor` if the entry cannot describe a valid driver.
pub fn create_driver(config: &DriverConfig) -> Result<Box<dyn AioDriver>, AioError> {
    let driver: Box<dyn AioDriver> = match config.kind {
        DriverKind::Loopback => Box::new(LoopbackDriver::new(&config.root, config.instances)?),
        DriverKind::Adc => Box::new(SimAdcDriver::new(
            &config.root,
            config.instances,
            config.resolution_bits,
        )?),
        DriverKind::Dac => Box::new(SimDacDriver::new(
            &config.root,
            config.instances,
            config.resolution_bits,
        )?),
    };
    Ok(driver)
}

/// Build an `AioDevices` context and register every configured driver.
///
/// Registration errors are fatal: the first one aborts bring-up.
pub fn from_config(config: &AioConfig) -> Result<AioDevices, AioError> {
    from_config_with(config, create_driver)
}

/// As [`from_config`], with a caller-supplied factory.
pub fn from_config_with(
    config: &AioConfig,
    factory: DriverFactory,
) -> Result<AioDevices, AioError> {
    let mut devices = AioDevices::init();
    for entry in &config.drivers {
        let driver = factory(entry)?;
        devices.add_driver(driver)?;
    }
    info!(
        "{}: {} drivers registered",
        config.shared.service_name,
        devices.registry().len()
    );
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aio_common::config::ConfigLoader;

    fn config(body: &str) -> AioConfig {
        let text = format!("[shared]\nservice_name = \"test\"\n{body}");
        AioConfig::from_toml(&text).unwrap()
    }

    #[test]
    fn max_code_bounds() {
        assert_eq!(max_code(1), 1);
        assert_eq!(max_code(10), 1023);
        assert_eq!(max_code(16), u16::MAX);
    }

    #[test]
    fn driver_codes_below_layer_codes() {
        assert!(ERR_NO_INSTANCE < FIRST_DRIVER_CODE);
        assert!(ERR_BAD_PARAM < FIRST_DRIVER_CODE);
        assert_ne!(ERR_NO_INSTANCE, ERR_BAD_PARAM);
    }

    #[test]
    fn builds_all_kinds() {
        let cfg = config(
            r#"
[[drivers]]
kind = "loopback"
root = "/dev/aio/loop"
instances = 2

[[drivers]]
kind = "adc"
root = "/dev/serial/aio/in"
instances = 4

[[drivers]]
kind = "dac"
root = "/dev/serial/aio/out"
"#,
        );
        let devices = from_config(&cfg).unwrap();
        let names: Vec<&str> = devices.registry().iter().map(|(_, d)| d.root_path()).collect();
        assert_eq!(
            names,
            vec!["/dev/aio/loop", "/dev/serial/aio/in", "/dev/serial/aio/out"]
        );
    }

    #[test]
    fn overlapping_roots_abort_bring_up() {
        let cfg = config(
            r#"
[[drivers]]
kind = "loopback"
root = "/dev/aio"

[[drivers]]
kind = "dac"
root = "/dev/aio/dac"
"#,
        );
        assert_eq!(from_config(&cfg).err(), Some(AioError::DuplicatePath));
    }

    #[test]
    fn bad_root_rejected() {
        let cfg = config(
            r#"
[[drivers]]
kind = "adc"
root = "dev/adc"
"#,
        );
        assert_eq!(from_config(&cfg).err(), Some(AioError::InvalidDescriptor));
    }

    #[test]
    fn custom_factory() {
        fn only_loopback(cfg: &DriverConfig) -> Result<Box<dyn AioDriver>, AioError> {
            Ok(Box::new(LoopbackDriver::new(&cfg.root, 1)?))
        }
        let cfg = config(
            r#"
[[drivers]]
kind = "adc"
root = "/dev/adc"
instances = 8
"#,
        );
        let devices = from_config_with(&cfg, only_loopback).unwrap();
        let (_, desc) = devices.registry().iter().next().unwrap();
        assert_eq!(desc.instances(), 1);
    }
}
