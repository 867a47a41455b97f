//! Device handles.
//!
//! A `DeviceHandle` is the caller-owned token for one open session. Its
//! binding (driver, instance, mode) is fixed at open; only the state
//! changes afterwards, through an atomic so that a close issued from an
//! interrupt context can race a read issued from a task.

use aio_common::device::{AccessMode, OpenFlags};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::registry::DriverId;

/// Lifecycle state of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandleState {
    /// Closed, or never opened. All operations except `close` fail.
    Closed = 0,
    /// Open and bound to a live driver.
    Open = 1,
    /// Driver released or faulted. Only `close` is accepted.
    Error = 2,
}

impl HandleState {
    #[inline]
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Open,
            2 => Self::Error,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One open session against one device instance.
///
/// Returned by value from `AioDevices::open`; the caller owns its storage
/// (stack, static, or a pool of its own). Not `Clone`: a copy would be a
/// second session sharing one close.
#[derive(Debug)]
pub struct DeviceHandle {
    driver: DriverId,
    instance: u8,
    mode: AccessMode,
    flags: OpenFlags,
    state: AtomicU8,
}

impl DeviceHandle {
    pub(crate) fn opened(driver: DriverId, instance: u8, mode: AccessMode, flags: OpenFlags) -> Self {
        Self {
            driver,
            instance,
            mode,
            flags,
            state: AtomicU8::new(HandleState::Open as u8),
        }
    }

    /// Driver this handle is bound to.
    #[inline]
    pub fn driver(&self) -> DriverId {
        self.driver
    }

    /// Instance selected at open.
    #[inline]
    pub fn instance(&self) -> u8 {
        self.instance
    }

    /// Access mode fixed at open.
    #[inline]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Flags passed to open.
    #[inline]
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> HandleState {
        HandleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether the handle is open.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.state() == HandleState::Open
    }

    /// Move Open → Error. No effect on Closed or Error handles.
    pub(crate) fn mark_error(&self) -> bool {
        self.state
            .compare_exchange(
                HandleState::Open as u8,
                HandleState::Error as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Force Closed, returning the previous state.
    ///
    /// Exactly one of several racing callers observes a non-Closed state.
    pub(crate) fn begin_close(&self) -> HandleState {
        HandleState::from_u8(self.state.swap(HandleState::Closed as u8, Ordering::AcqRel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DriverRegistry;
    use aio_common::device::{AioDriver, Capabilities, DriverDescriptor};

    struct Stub;

    impl AioDriver for Stub {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn descriptor(&self) -> DriverDescriptor {
            DriverDescriptor::new("/dev/stub", 1, Capabilities::all()).unwrap()
        }
    }

    fn handle() -> DeviceHandle {
        let mut reg = DriverRegistry::<1>::new();
        let id = reg.add(Box::new(Stub)).unwrap();
        DeviceHandle::opened(id, 0, AccessMode::ReadWrite, OpenFlags::RDWR)
    }

    #[test]
    fn new_handle_is_open() {
        let h = handle();
        assert_eq!(h.state(), HandleState::Open);
        assert!(h.is_open());
        assert_eq!(h.mode(), AccessMode::ReadWrite);
        assert_eq!(h.instance(), 0);
        assert_eq!(h.flags(), OpenFlags::RDWR);
    }

    #[test]
    fn error_transition_only_from_open() {
        let h = handle();
        assert!(h.mark_error());
        assert_eq!(h.state(), HandleState::Error);
        assert!(!h.mark_error());

        assert_eq!(h.begin_close(), HandleState::Error);
        assert!(!h.mark_error());
        assert_eq!(h.state(), HandleState::Closed);
    }

    #[test]
    fn close_is_observed_once() {
        let h = handle();
        assert_eq!(h.begin_close(), HandleState::Open);
        assert_eq!(h.begin_close(), HandleState::Closed);
        assert_eq!(h.begin_close(), HandleState::Closed);
    }

    #[test]
    fn state_display() {
        assert_eq!(HandleState::Open.to_string(), "open");
        assert_eq!(HandleState::Error.to_string(), "error");
    }
}
