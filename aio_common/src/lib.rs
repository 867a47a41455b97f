//! AIO Common Library
//!
//! Shared vocabulary for the AIO device dispatch layer, used by drivers,
//! the dispatch facade and firmware bring-up code.
//!
//! # Module Structure
//!
//! - [`consts`] - Table capacities and path limits
//! - [`error`] - Dispatch and driver error types, status codes
//! - [`device`] - Open flags, access modes and the `AioDriver` trait
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use aio_common::prelude::*;
//!
//! let mode = AccessMode::from_flags(OpenFlags::RDWR);
//! assert_eq!(mode, Some(AccessMode::ReadWrite));
//! ```

pub mod config;
pub mod consts;
pub mod device;
pub mod error;
pub mod prelude;
