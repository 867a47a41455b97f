//! Error types for AIO dispatch and drivers.
//!
//! This module defines:
//! - `AioError` - errors returned by the dispatch layer
//! - `DriverError` - errors returned by driver implementations
//! - `IntoStatus` - lowering of results to the C-style `i32` status
//!
//! # Status codes
//!
//! | Error | Code |
//! |-------|------|
//! | `DeviceNotFound` | -1 |
//! | `InvalidInstance` | -2 |
//! | `DuplicatePath` | -3 |
//! | `RegistryFull` | -4 |
//! | `InvalidDescriptor` | -5 |
//! | `AccessDenied` | -6 |
//! | `NotOpen` | -7 |
//! | `ResourceBusy` | -8 |
//! | `DriverFailure(c)` | `c`, always `<= FIRST_DRIVER_CODE` |

use thiserror::Error;

/// First status code available to drivers. Driver codes are `<=` this value.
pub const FIRST_DRIVER_CODE: i32 = -16;

/// Error types for AIO dispatch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum AioError {
    /// No registered driver claims the path.
    #[error("no driver registered for device path")]
    DeviceNotFound,

    /// Instance selector is malformed or out of range.
    #[error("invalid device instance selector")]
    InvalidInstance,

    /// Root path collides with a registered driver.
    #[error("driver root path collides with a registered driver")]
    DuplicatePath,

    /// Registry capacity exhausted.
    #[error("driver registry is full")]
    RegistryFull,

    /// Driver descriptor failed validation.
    #[error("invalid driver descriptor")]
    InvalidDescriptor,

    /// Operation not permitted by the access mode or driver capabilities.
    #[error("access denied")]
    AccessDenied,

    /// Handle is closed or in error state.
    #[error("device handle is not open")]
    NotOpen,

    /// Instance is already exclusively open.
    #[error("device instance is busy")]
    ResourceBusy,

    /// Driver-specific failure carrying the driver's status code.
    #[error("driver failure (code {0})")]
    DriverFailure(i32),
}

impl AioError {
    /// Build a `DriverFailure`, moving the code into the driver range.
    #[inline]
    pub const fn driver_failure(code: i32) -> Self {
        if code <= FIRST_DRIVER_CODE {
            Self::DriverFailure(code)
        } else {
            Self::DriverFailure(FIRST_DRIVER_CODE)
        }
    }

    /// Negative status code for the C-style boundary.
    pub const fn code(&self) -> i32 {
        match self {
            Self::DeviceNotFound => -1,
            Self::InvalidInstance => -2,
            Self::DuplicatePath => -3,
            Self::RegistryFull => -4,
            Self::InvalidDescriptor => -5,
            Self::AccessDenied => -6,
            Self::NotOpen => -7,
            Self::ResourceBusy => -8,
            Self::DriverFailure(code) => {
                if *code <= FIRST_DRIVER_CODE {
                    *code
                } else {
                    FIRST_DRIVER_CODE
                }
            }
        }
    }

    /// Registration-time errors, expected to be fixed at integration time.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DuplicatePath | Self::RegistryFull | Self::InvalidDescriptor
        )
    }
}

/// Error types returned by driver implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum DriverError {
    /// Operation is not part of this driver's capability set.
    #[error("operation not supported by driver")]
    Unsupported,

    /// Hardware resource is held elsewhere.
    #[error("driver resource busy")]
    Busy,

    /// Unknown ioctl request code.
    #[error("unknown ioctl request {0}")]
    UnknownRequest(i32),

    /// Transient I/O failure; the session stays usable.
    #[error("I/O failure (code {0})")]
    Io(i32),

    /// Fatal failure; the session must be closed and re-opened.
    #[error("device fault (code {0})")]
    Fault(i32),
}

impl DriverError {
    /// Whether the failure leaves the handle unusable.
    #[inline]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fault(_))
    }
}

impl From<DriverError> for AioError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Unsupported => AioError::AccessDenied,
            DriverError::Busy => AioError::ResourceBusy,
            DriverError::UnknownRequest(_) => AioError::driver_failure(FIRST_DRIVER_CODE),
            DriverError::Io(code) | DriverError::Fault(code) => AioError::driver_failure(code),
        }
    }
}

/// Lowering of dispatch results to the "negative = failure" `i32` convention.
pub trait IntoStatus {
    /// Convert into a status code. Non-negative on success.
    fn into_status(self) -> i32;
}

impl IntoStatus for Result<usize, AioError> {
    fn into_status(self) -> i32 {
        match self {
            Ok(count) => i32::try_from(count).unwrap_or(i32::MAX),
            Err(e) => e.code(),
        }
    }
}

/// Negative `Ok` values cannot be told apart from failures and are lowered
/// to 0. `AioDevices::ioctl` never produces them.
impl IntoStatus for Result<i32, AioError> {
    fn into_status(self) -> i32 {
        match self {
            Ok(value) => value.max(0),
            Err(e) => e.code(),
        }
    }
}

impl IntoStatus for Result<(), AioError> {
    fn into_status(self) -> i32 {
        match self {
            Ok(()) => 0,
            Err(e) => e.code(),
        }
    }
}
