//! Prelude module for common re-exports.
//!
//! ```rust
//! use aio_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{AioConfig, ConfigError, ConfigLoader, DriverKind, LogLevel, SharedConfig};

// ─── Limits ─────────────────────────────────────────────────────────
pub use crate::consts::{MAX_DRIVERS, MAX_INSTANCES, MAX_ROOT_PATH_LEN};

// ─── Drivers ────────────────────────────────────────────────────────
pub use crate::device::{AccessMode, AioDriver, Capabilities, DriverDescriptor, OpenFlags};

// ─── Errors ─────────────────────────────────────────────────────────
pub use crate::error::{AioError, DriverError, IntoStatus};
