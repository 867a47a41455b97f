//! # AIO Devices Library
//!
//! Device-abstraction dispatch layer for analog/digital I/O peripherals.
//!
//! Application code opens devices by path (`/dev/serial/aio/in/0`) and
//! reads, writes or controls them through one uniform surface; drivers
//! implement the `AioDriver` trait from `aio_common::device` and register
//! themselves at firmware start.
//!
//! # Module Structure
//!
//! - [`registry`] - Fixed-capacity driver table with generational ids
//! - [`resolver`] - Path to (driver, instance) resolution
//! - [`handle`] - Caller-owned open sessions with atomic state
//! - [`dispatch`] - `AioDevices`, the open/close/read/write/ioctl facade
//! - [`drivers`] - Built-in simulation drivers and config bring-up
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    aio_devices (single crate)                    │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────────┐  │
//! │  │ DeviceHandle│◄──►│  AioDevices  │◄──►│   DriverRegistry    │  │
//! │  │ (caller)    │    │  (dispatch)  │    │ + resolver          │  │
//! │  └─────────────┘    └──────┬───────┘    └─────────────────────┘  │
//! │                            │                                     │
//! │                            ▼                                     │
//! │                   ┌────────────────┐                             │
//! │                   │  AioDriver     │ (trait object)              │
//! │                   │  trait         │                             │
//! │                   └────────────────┘                             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use aio_common::prelude::*;
//! use aio_devices::AioDevices;
//! use aio_devices::drivers::LoopbackDriver;
//!
//! let mut devices: AioDevices = AioDevices::init();
//! devices
//!     .add_driver(Box::new(LoopbackDriver::new("/dev/aio", 2).unwrap()))
//!     .unwrap();
//!
//! let handle = devices.open("/dev/aio/0", OpenFlags::RDWR).unwrap();
//! assert_eq!(devices.write(&handle, b"ping"), Ok(4));
//! let mut buf = [0u8; 4];
//! assert_eq!(devices.read(&handle, &mut buf), Ok(4));
//! assert_eq!(&buf, b"ping");
//! devices.close(&handle).unwrap();
//! ```

#![deny(missing_docs)]

pub mod dispatch;
pub mod drivers;
pub mod handle;
pub mod registry;
pub mod resolver;

// Re-export key types for convenience
pub use crate::dispatch::AioDevices;
pub use crate::handle::{DeviceHandle, HandleState};
pub use crate::registry::{DriverId, DriverRegistry};
