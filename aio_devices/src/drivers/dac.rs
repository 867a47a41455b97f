//! Simulated DAC driver.
//!
//! Output-only converter with exclusive channels. Writes latch the last
//! whole sample; closing a channel drives it back to zero.

use aio_common::consts::MAX_INSTANCES;
use aio_common::device::{AioDriver, Capabilities, DriverDescriptor};
use aio_common::error::{AioError, DriverError};
use std::any::Any;
use std::sync::atomic::{AtomicU16, Ordering};
use tracing::{debug, trace};

use super::{ERR_NO_INSTANCE, SAMPLE_BYTES, max_code};

/// DAC ioctl requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum DacRequest {
    /// Returns the latched output code.
    GetOutput = 0,
    /// Returns the resolution in bits.
    GetResolution = 1,
}

impl TryFrom<i32> for DacRequest {
    type Error = DriverError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::GetOutput),
            1 => Ok(Self::GetResolution),
            other => Err(DriverError::UnknownRequest(other)),
        }
    }
}

/// Simulated DAC implementing the `AioDriver` trait.
pub struct SimDacDriver {
    descriptor: DriverDescriptor,
    resolution_bits: u8,
    outputs: heapless::Vec<AtomicU16, { MAX_INSTANCES as usize }>,
}

impl SimDacDriver {
    /// Create a DAC at `root` with `channels` outputs of `resolution_bits`.
    ///
    /// # Errors
    /// `AioError::InvalidDescriptor` for a bad root, channel count, or a
    /// resolution outside `1..=16`.
    pub fn new(root: &str, channels: u8, resolution_bits: u8) -> Result<Self, AioError> {
        if !(1..=16).contains(&resolution_bits) {
            return Err(AioError::InvalidDescriptor);
        }
        let caps = Capabilities::OPEN | Capabilities::CLOSE | Capabilities::WRITE | Capabilities::IOCTL;
        let descriptor = DriverDescriptor::new(root, channels, caps)?.exclusive();
        let mut outputs = heapless::Vec::new();
        for _ in 0..channels {
            outputs
                .push(AtomicU16::new(0))
                .map_err(|_| AioError::InvalidDescriptor)?;
        }
        Ok(Self {
            descriptor,
            resolution_bits,
            outputs,
        })
    }

    fn output(&self, instance: u8) -> Result<&AtomicU16, DriverError> {
        self.outputs
            .get(instance as usize)
            .ok_or(DriverError::Io(ERR_NO_INSTANCE))
    }
}

impl AioDriver for SimDacDriver {
    fn name(&self) -> &'static str {
        "dac"
    }

    fn descriptor(&self) -> DriverDescriptor {
        self.descriptor.clone()
    }

    fn close(&self, instance: u8) -> Result<(), DriverError> {
        self.output(instance)?.store(0, Ordering::Release);
        debug!("dac channel {} released, output zeroed", instance);
        Ok(())
    }

    fn ioctl(
        &self,
        instance: u8,
        request: i32,
        _param: Option<&mut dyn Any>,
    ) -> Result<i32, DriverError> {
        let output = self.output(instance)?;
        match DacRequest::try_from(request)? {
            DacRequest::GetOutput => Ok(i32::from(output.load(Ordering::Acquire))),
            DacRequest::GetResolution => Ok(i32::from(self.resolution_bits)),
        }
    }

    fn write(&self, instance: u8, buf: &[u8]) -> Result<usize, DriverError> {
        let output = self.output(instance)?;
        let limit = max_code(self.resolution_bits);
        let mut samples = 0usize;
        for chunk in buf.chunks_exact(SAMPLE_BYTES) {
            let code = u16::from_le_bytes([chunk[0], chunk[1]]).min(limit);
            output.store(code, Ordering::Release);
            samples += 1;
        }
        trace!("dac channel {}: {} samples", instance, samples);
        Ok(samples * SAMPLE_BYTES)
    }
}
