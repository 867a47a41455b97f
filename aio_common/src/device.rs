//! AIO driver trait and device vocabulary.
//!
//! This module defines:
//! - `OpenFlags` - open flag vocabulary
//! - `AccessMode` - access mode derived from the open flags
//! - `Capabilities` - operations a driver implements
//! - `DriverDescriptor` - root path, instance count and capabilities
//! - `AioDriver` trait - interface for pluggable AIO drivers

use crate::consts::{MAX_INSTANCES, MAX_ROOT_PATH_LEN, PATH_SEPARATOR};
use crate::error::{AioError, DriverError};
use bitflags::bitflags;
use core::any::Any;
use core::fmt;

bitflags! {
    /// Flags accepted by `open`.
    ///
    /// `USERBUF` marks zero-copy transfer through a caller-supplied buffer.
    /// It is forwarded to the driver and does not change routing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u8 {
        /// Open for reading.
        const RDONLY  = 0x01;
        /// Open for writing.
        const WRONLY  = 0x02;
        /// Open for reading and writing.
        const RDWR    = Self::RDONLY.bits() | Self::WRONLY.bits();
        /// Use caller-supplied buffer.
        const USERBUF = 0x10;
    }
}

bitflags! {
    /// Operations implemented by a driver.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Driver has an open routine.
        const OPEN  = 0x01;
        /// Driver has a close routine.
        const CLOSE = 0x02;
        /// Driver supports ioctl.
        const IOCTL = 0x04;
        /// Driver supports read.
        const READ  = 0x08;
        /// Driver supports write.
        const WRITE = 0x10;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Access mode of an open session, fixed at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AccessMode {
    /// Read only.
    ReadOnly = 1,
    /// Write only.
    WriteOnly = 2,
    /// Read and write.
    ReadWrite = 3,
}

impl AccessMode {
    /// Derive the mode from open flags. `None` when no access bit is set.
    pub const fn from_flags(flags: OpenFlags) -> Option<Self> {
        let read = flags.contains(OpenFlags::RDONLY);
        let write = flags.contains(OpenFlags::WRONLY);
        match (read, write) {
            (true, true) => Some(Self::ReadWrite),
            (true, false) => Some(Self::ReadOnly),
            (false, true) => Some(Self::WriteOnly),
            (false, false) => None,
        }
    }

    /// Whether reads are permitted.
    #[inline]
    pub const fn can_read(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    /// Whether writes are permitted.
    #[inline]
    pub const fn can_write(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }

    /// Capabilities a driver needs to honour this mode.
    pub const fn required_capabilities(self) -> Capabilities {
        match self {
            Self::ReadOnly => Capabilities::READ,
            Self::WriteOnly => Capabilities::WRITE,
            Self::ReadWrite => Capabilities::READ.union(Capabilities::WRITE),
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "ro"),
            Self::WriteOnly => write!(f, "wo"),
            Self::ReadWrite => write!(f, "rw"),
        }
    }
}

/// Root path storage.
pub type RootPath = heapless::String<MAX_ROOT_PATH_LEN>;

/// Static description of a driver: where it lives and what it can do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverDescriptor {
    root_path: RootPath,
    instances: u8,
    capabilities: Capabilities,
    exclusive: bool,
}

impl DriverDescriptor {
    /// Create a validated descriptor.
    ///
    /// # Errors
    /// Returns `AioError::InvalidDescriptor` if:
    /// - `root_path` is empty, longer than `MAX_ROOT_PATH_LEN`, or not ASCII
    /// - `root_path` does not start with `/` or ends with `/`
    /// - `root_path` contains an empty segment (`//`)
    /// - `instances` is 0 or above `MAX_INSTANCES`
    pub fn new(
        root_path: &str,
        instances: u8,
        capabilities: Capabilities,
    ) -> Result<Self, AioError> {
        validate_root_path(root_path)?;
        if instances == 0 || instances > MAX_INSTANCES {
            return Err(AioError::InvalidDescriptor);
        }
        let root_path =
            RootPath::try_from(root_path).map_err(|_| AioError::InvalidDescriptor)?;
        Ok(Self {
            root_path,
            instances,
            capabilities,
            exclusive: false,
        })
    }

    /// Mark instances as exclusive: at most one open handle each.
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Root path claimed by the driver.
    #[inline]
    pub fn root_path(&self) -> &str {
        self.root_path.as_str()
    }

    /// Number of instances (`0..instances` are valid selectors).
    #[inline]
    pub const fn instances(&self) -> u8 {
        self.instances
    }

    /// Implemented operations.
    #[inline]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Whether instances are exclusive.
    #[inline]
    pub const fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    /// Whether this root overlaps `other` at a segment boundary, in either direction.
    pub fn overlaps(&self, other: &str) -> bool {
        let a = self.root_path();
        segment_prefix(a, other) || segment_prefix(other, a)
    }
}

/// `prefix` equals `path` or is followed in `path` by a separator.
pub fn segment_prefix(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.as_bytes()[0] == PATH_SEPARATOR,
        None => false,
    }
}

fn validate_root_path(path: &str) -> Result<(), AioError> {
    let bytes = path.as_bytes();
    if bytes.len() < 2 || bytes.len() > MAX_ROOT_PATH_LEN || !path.is_ascii() {
        return Err(AioError::InvalidDescriptor);
    }
    if bytes[0] != PATH_SEPARATOR || bytes[bytes.len() - 1] == PATH_SEPARATOR {
        return Err(AioError::InvalidDescriptor);
    }
    if bytes.windows(2).any(|w| w[0] == PATH_SEPARATOR && w[1] == PATH_SEPARATOR) {
        return Err(AioError::InvalidDescriptor);
    }
    Ok(())
}

/// Trait defining the interface for AIO drivers.
///
/// The dispatch layer manages drivers through this trait. Each method
/// receives the instance selected by the device path.
///
/// # Contract
///
/// - Methods take `&self`. Drivers serve task and interrupt contexts at
///   once, so per-instance state lives behind interior mutability.
/// - No method may block indefinitely. Any wait (e.g. a conversion) must be
///   bounded by the driver itself.
/// - `read`/`write` return the number of bytes transferred. Short transfers
///   are valid.
/// - Operations absent from `descriptor().capabilities()` are never called;
///   the defaults return `DriverError::Unsupported`.
pub trait AioDriver: Send + Sync {
    /// Returns the driver's identifier (e.g. "loopback", "adc").
    fn name(&self) -> &'static str;

    /// Returns the descriptor registered for this driver.
    fn descriptor(&self) -> DriverDescriptor;

    /// Prepare `instance` for use.
    fn open(&self, _instance: u8, _mode: AccessMode, _flags: OpenFlags) -> Result<(), DriverError> {
        Ok(())
    }

    /// Release the hardware resource behind `instance`.
    fn close(&self, _instance: u8) -> Result<(), DriverError> {
        Ok(())
    }

    /// Driver-defined control request. `param` is an opaque payload
    /// whose concrete type depends on `request`.
    ///
    /// Success values must be non-negative; failures are reported through
    /// `DriverError`. The dispatch layer turns a negative `Ok` into a
    /// `DriverFailure`.
    fn ioctl(
        &self,
        _instance: u8,
        request: i32,
        _param: Option<&mut dyn Any>,
    ) -> Result<i32, DriverError> {
        Err(DriverError::UnknownRequest(request))
    }

    /// Read up to `buf.len()` bytes.
    fn read(&self, _instance: u8, _buf: &mut [u8]) -> Result<usize, DriverError> {
        Err(DriverError::Unsupported)
    }

    /// Write up to `buf.len()` bytes.
    fn write(&self, _instance: u8, _buf: &[u8]) -> Result<usize, DriverError> {
        Err(DriverError::Unsupported)
    }
}
