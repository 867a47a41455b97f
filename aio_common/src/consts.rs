//! System-wide constants for the AIO workspace.
//!
//! Single source of truth for table capacities and path limits.
//! Imported by all crates, no duplication permitted.

use static_assertions::const_assert;

/// Maximum number of drivers the registry can hold at once.
pub const MAX_DRIVERS: usize = 8;

/// Maximum number of instances a single driver may expose.
///
/// Exclusive-open claims are tracked in a `u32` bitmap per driver.
pub const MAX_INSTANCES: u8 = 32;

/// Maximum length of a driver root path in bytes (e.g. `/dev/serial/aio/in`).
pub const MAX_ROOT_PATH_LEN: usize = 32;

/// Path segment separator.
pub const PATH_SEPARATOR: u8 = b'/';

/// Canonical service name (used for logging).
pub const AIO_SERVICE_NAME: &str = "aio_devices";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/aio/devices.toml";

const_assert!(MAX_INSTANCES as u32 <= u32::BITS);
const_assert!(MAX_DRIVERS > 0);
const_assert!(MAX_ROOT_PATH_LEN >= 2);
