//! Loopback driver.
//!
//! Every instance is a fixed-capacity byte FIFO: writes push, reads pop.
//! Used for bring-up checks and as the reference driver in tests.

use aio_common::consts::MAX_INSTANCES;
use aio_common::device::{AioDriver, Capabilities, DriverDescriptor};
use aio_common::error::{AioError, DriverError};
use heapless::Deque;
use parking_lot::Mutex;
use std::any::Any;
use tracing::trace;

/// Bytes buffered per loopback instance.
pub const LOOPBACK_CAPACITY: usize = 64;

/// Loopback ioctl requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum LoopbackRequest {
    /// Drop all queued bytes. Returns the number dropped.
    Flush = 0,
    /// Returns the number of queued bytes.
    Pending = 1,
    /// Returns the free space in bytes.
    Capacity = 2,
}

impl TryFrom<i32> for LoopbackRequest {
    type Error = DriverError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Flush),
            1 => Ok(Self::Pending),
            2 => Ok(Self::Capacity),
            other => Err(DriverError::UnknownRequest(other)),
        }
    }
}

type Fifo = Deque<u8, LOOPBACK_CAPACITY>;

/// Loopback driver implementing the `AioDriver` trait.
pub struct LoopbackDriver {
    descriptor: DriverDescriptor,
    fifos: heapless::Vec<Mutex<Fifo>, { MAX_INSTANCES as usize }>,
}

impl LoopbackDriver {
    /// Create a loopback driver at `root` with `instances` FIFOs.
    ///
    /// # Errors
    /// `AioError::InvalidDescriptor` for a bad root path or instance count.
    pub fn new(root: &str, instances: u8) -> Result<Self, AioError> {
        let descriptor = DriverDescriptor::new(root, instances, Capabilities::all())?;
        let mut fifos = heapless::Vec::new();
        for _ in 0..instances {
            fifos
                .push(Mutex::new(Fifo::new()))
                .map_err(|_| AioError::InvalidDescriptor)?;
        }
        Ok(Self { descriptor, fifos })
    }

    fn fifo(&self, instance: u8) -> Result<&Mutex<Fifo>, DriverError> {
        self.fifos
            .get(instance as usize)
            .ok_or(DriverError::Io(super::ERR_NO_INSTANCE))
    }
}

impl AioDriver for LoopbackDriver {
    fn name(&self) -> &'static str {
        "loopback"
    }

    fn descriptor(&self) -> DriverDescriptor {
        self.descriptor.clone()
    }

    fn ioctl(
        &self,
        instance: u8,
        request: i32,
        _param: Option<&mut dyn Any>,
    ) -> Result<i32, DriverError> {
        let mut fifo = self.fifo(instance)?.lock();
        let value = match LoopbackRequest::try_from(request)? {
            LoopbackRequest::Flush => {
                let dropped = fifo.len();
                fifo.clear();
                dropped
            }
            LoopbackRequest::Pending => fifo.len(),
            LoopbackRequest::Capacity => LOOPBACK_CAPACITY - fifo.len(),
        };
        Ok(value as i32)
    }

    fn read(&self, instance: u8, buf: &mut [u8]) -> Result<usize, DriverError> {
        let mut fifo = self.fifo(instance)?.lock();
        let mut count = 0;
        for slot in buf.iter_mut() {
            match fifo.pop_front() {
                Some(byte) => {
                    *slot = byte;
                    count += 1;
                }
                None => break,
            }
        }
        trace!("loopback {}: read {} bytes", instance, count);
        Ok(count)
    }

    fn write(&self, instance: u8, buf: &[u8]) -> Result<usize, DriverError> {
        let mut fifo = self.fifo(instance)?.lock();
        let mut count = 0;
        for &byte in buf {
            if fifo.push_back(byte).is_err() {
                break;
            }
            count += 1;
        }
        trace!("loopback {}: wrote {} bytes", instance, count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let lb = LoopbackDriver::new("/dev/loop", 2).unwrap();
        assert_eq!(lb.write(0, b"abc"), Ok(3));

        let mut buf = [0u8; 8];
        assert_eq!(lb.read(0, &mut buf), Ok(3));
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(lb.read(0, &mut buf), Ok(0));
    }

    #[test]
    fn instances_are_independent() {
        let lb = LoopbackDriver::new("/dev/loop", 2).unwrap();
        lb.write(1, b"xy").unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(lb.read(0, &mut buf), Ok(0));
        assert_eq!(lb.read(1, &mut buf), Ok(2));
    }

    #[test]
    fn short_write_when_full() {
        let lb = LoopbackDriver::new("/dev/loop", 1).unwrap();
        let data = [7u8; LOOPBACK_CAPACITY + 5];
        assert_eq!(lb.write(0, &data), Ok(LOOPBACK_CAPACITY));
        assert_eq!(lb.write(0, &data), Ok(0));
        assert_eq!(lb.ioctl(0, LoopbackRequest::Capacity as i32, None), Ok(0));
    }

    #[test]
    fn ioctl_requests() {
        let lb = LoopbackDriver::new("/dev/loop", 1).unwrap();
        lb.write(0, b"hello").unwrap();
        assert_eq!(lb.ioctl(0, LoopbackRequest::Pending as i32, None), Ok(5));
        assert_eq!(
            lb.ioctl(0, LoopbackRequest::Capacity as i32, None),
            Ok((LOOPBACK_CAPACITY - 5) as i32)
        );
        assert_eq!(lb.ioctl(0, LoopbackRequest::Flush as i32, None), Ok(5));
        assert_eq!(lb.ioctl(0, LoopbackRequest::Pending as i32, None), Ok(0));
        assert_eq!(lb.ioctl(0, 42, None), Err(DriverError::UnknownRequest(42)));
    }

    #[test]
    fn out_of_range_instance() {
        let lb = LoopbackDriver::new("/dev/loop", 1).unwrap();
        assert_eq!(lb.write(3, b"a"), Err(DriverError::Io(super::super::ERR_NO_INSTANCE)));
    }

    #[test]
    fn full_capability_set() {
        let lb = LoopbackDriver::new("/dev/loop", 1).unwrap();
        assert_eq!(lb.descriptor().capabilities(), Capabilities::all());
        assert!(!lb.descriptor().is_exclusive());
    }
}
