//! Dispatch facade.
//!
//! `AioDevices` is the process-wide AIO context: it owns the driver
//! registry and exposes the POSIX-like entry points.
//!
//! # Phases
//!
//! | Phase | Calls | Receiver |
//! |-------|-------|----------|
//! | Init | `init`, `add_driver` | `&mut self` |
//! | Run | `open`, `close`, `read`, `write`, `ioctl` | `&self` |
//! | Shutdown | `release_driver`, drop | `&mut self` |
//!
//! Registration therefore cannot overlap dispatch traffic. Run-phase calls
//! are safe from several threads/contexts at once; per-call cost is O(1)
//! apart from the root scan in `open`. Nothing here allocates or blocks.

use aio_common::consts::MAX_DRIVERS;
use aio_common::device::{AccessMode, AioDriver, Capabilities, OpenFlags};
use aio_common::error::{AioError, DriverError};
use std::any::Any;
use tracing::{debug, trace, warn};

use crate::handle::{DeviceHandle, HandleState};
use crate::registry::{DriverId, DriverRegistry, RegisteredDriver};
use crate::resolver::resolve;

/// AIO device context: driver registry plus dispatch entry points.
pub struct AioDevices<const N: usize = MAX_DRIVERS> {
    registry: DriverRegistry<N>,
}

impl<const N: usize> AioDevices<N> {
    /// Create the context with an empty registry. Called once at firmware start.
    pub const fn init() -> Self {
        Self {
            registry: DriverRegistry::new(),
        }
    }

    /// Register a driver.
    ///
    /// # Errors
    /// `RegistryFull` or `DuplicatePath`; both are configuration errors.
    pub fn add_driver(&mut self, driver: Box<dyn AioDriver>) -> Result<DriverId, AioError> {
        self.registry.add(driver)
    }

    /// Release a driver by identity. Unknown or stale ids are ignored.
    ///
    /// Handles still bound to the driver move to `Error` on their next
    /// operation.
    pub fn release_driver(&mut self, id: DriverId) {
        if self.registry.remove(id).is_none() {
            debug!("release_driver: id {} not registered", id);
        }
    }

    /// Read-only view of the registry.
    #[inline]
    pub fn registry(&self) -> &DriverRegistry<N> {
        &self.registry
    }

    /// Open the device at `path`.
    ///
    /// # Errors
    /// - `DeviceNotFound` if no driver claims the path
    /// - `InvalidInstance` if the instance selector is bad
    /// - `AccessDenied` if `flags` carry no access bit, or the driver lacks
    ///   OPEN or the capabilities the mode needs
    /// - `ResourceBusy` if the instance is exclusive and already open
    /// - driver open failures, mapped through `AioError::from`
    pub fn open(&self, path: &str, flags: OpenFlags) -> Result<DeviceHandle, AioError> {
        let mode = AccessMode::from_flags(flags).ok_or(AioError::AccessDenied)?;
        let resolved = resolve(&self.registry, path)?;
        let entry = self
            .registry
            .get(resolved.driver)
            .ok_or(AioError::DeviceNotFound)?;

        let caps = entry.descriptor().capabilities();
        if !caps.contains(Capabilities::OPEN | mode.required_capabilities()) {
            debug!("open {}: mode {} not supported by driver", path, mode);
            return Err(AioError::AccessDenied);
        }

        let exclusive = entry.descriptor().is_exclusive();
        if exclusive && !entry.claim(resolved.instance) {
            debug!("open {}: instance busy", path);
            return Err(AioError::ResourceBusy);
        }

        if let Err(e) = entry.driver().open(resolved.instance, mode, flags) {
            if exclusive {
                entry.unclaim(resolved.instance);
            }
            debug!("open {}: driver refused: {}", path, e);
            return Err(e.into());
        }

        debug!(
            "Opened {} ({}, driver {}, instance {})",
            path,
            mode,
            entry.driver().name(),
            resolved.instance
        );
        Ok(DeviceHandle::opened(resolved.driver, resolved.instance, mode, flags))
    }

    /// Close a handle.
    ///
    /// The handle is Closed when this returns, whatever the outcome.
    /// Closing a Closed handle is a successful no-op, so racing or repeated
    /// closes are safe; exactly one of them reaches the driver.
    ///
    /// # Errors
    /// The driver's close failure, after the local state is already Closed.
    pub fn close(&self, handle: &DeviceHandle) -> Result<(), AioError> {
        if handle.begin_close() == HandleState::Closed {
            return Ok(());
        }

        let Some(entry) = self.registry.get(handle.driver()) else {
            debug!("close: driver {} already released", handle.driver());
            return Ok(());
        };

        let result = if entry.descriptor().capabilities().contains(Capabilities::CLOSE) {
            entry.driver().close(handle.instance())
        } else {
            Ok(())
        };

        if entry.descriptor().is_exclusive() {
            entry.unclaim(handle.instance());
        }

        match result {
            Ok(()) => {
                debug!(
                    "Closed {} instance {}",
                    entry.descriptor().root_path(),
                    handle.instance()
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    "Close of {} instance {} failed: {}",
                    entry.descriptor().root_path(),
                    handle.instance(),
                    e
                );
                Err(e.into())
            }
        }
    }

    /// Read up to `buf.len()` bytes. A short count is not an error.
    ///
    /// # Errors
    /// `NotOpen`, `DeviceNotFound` (driver released since open),
    /// `AccessDenied`, or the driver's failure.
    pub fn read(&self, handle: &DeviceHandle, buf: &mut [u8]) -> Result<usize, AioError> {
        let entry = self.bound(handle)?;
        if !handle.mode().can_read()
            || !entry.descriptor().capabilities().contains(Capabilities::READ)
        {
            return Err(AioError::AccessDenied);
        }

        let count = entry
            .driver()
            .read(handle.instance(), buf)
            .map_err(|e| self.driver_failure(handle, e))?;
        trace!("read {} of {} bytes", count, buf.len());
        Ok(count.min(buf.len()))
    }

    /// Write up to `buf.len()` bytes. A short count is not an error.
    ///
    /// # Errors
    /// Same as [`read`](Self::read).
    pub fn write(&self, handle: &DeviceHandle, buf: &[u8]) -> Result<usize, AioError> {
        let entry = self.bound(handle)?;
        if !handle.mode().can_write()
            || !entry.descriptor().capabilities().contains(Capabilities::WRITE)
        {
            return Err(AioError::AccessDenied);
        }

        let count = entry
            .driver()
            .write(handle.instance(), buf)
            .map_err(|e| self.driver_failure(handle, e))?;
        trace!("wrote {} of {} bytes", count, buf.len());
        Ok(count.min(buf.len()))
    }

    /// Driver-defined control request.
    ///
    /// `request` and the concrete type behind `param` are defined by each
    /// driver's own request enumeration.
    ///
    /// A negative value returned as success by the driver breaks the status
    /// convention and is reported as `DriverFailure` with that code.
    ///
    /// # Errors
    /// `NotOpen`, `DeviceNotFound` (driver released since open),
    /// `AccessDenied` if the driver has no ioctl, or the driver's failure
    /// (unknown requests included).
    pub fn ioctl(
        &self,
        handle: &DeviceHandle,
        request: i32,
        param: Option<&mut dyn Any>,
    ) -> Result<i32, AioError> {
        let entry = self.bound(handle)?;
        if !entry.descriptor().capabilities().contains(Capabilities::IOCTL) {
            return Err(AioError::AccessDenied);
        }

        let value = entry
            .driver()
            .ioctl(handle.instance(), request, param)
            .map_err(|e| self.driver_failure(handle, e))?;
        if value < 0 {
            warn!(
                "Driver {} ioctl {} returned negative value {}",
                entry.driver().name(),
                request,
                value
            );
            return Err(AioError::driver_failure(value));
        }
        Ok(value)
    }

    /// Current state of `handle`, demoting it to Error if its driver is gone.
    pub fn handle_state(&self, handle: &DeviceHandle) -> HandleState {
        if handle.is_open() && !self.registry.contains(handle.driver()) {
            handle.mark_error();
        }
        handle.state()
    }

    /// Atomic state check plus O(1) driver lookup.
    fn bound(&self, handle: &DeviceHandle) -> Result<&RegisteredDriver, AioError> {
        if !handle.is_open() {
            return Err(AioError::NotOpen);
        }
        match self.registry.get(handle.driver()) {
            Some(entry) => Ok(entry),
            None => {
                if handle.mark_error() {
                    warn!("Handle bound to released driver {}", handle.driver());
                }
                Err(AioError::DeviceNotFound)
            }
        }
    }

    fn driver_failure(&self, handle: &DeviceHandle, err: DriverError) -> AioError {
        if err.is_fatal() && handle.mark_error() {
            warn!(
                "Driver {} instance {} faulted: {}",
                handle.driver(),
                handle.instance(),
                err
            );
        }
        err.into()
    }
}

impl<const N: usize> Default for AioDevices<N> {
    fn default() -> Self {
        Self::init()
    }
}
