//! Simulated ADC driver.
//!
//! Input-only converter. Each channel holds the raw code the next
//! conversion returns; tests and the CLI inject it through
//! `AdcRequest::SetSample`. Channels are lock-free so reads are safe from
//! interrupt context.

use aio_common::consts::MAX_INSTANCES;
use aio_common::device::{AccessMode, AioDriver, Capabilities, DriverDescriptor, OpenFlags};
use aio_common::error::{AioError, DriverError};
use std::any::Any;
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};
use tracing::{debug, trace};

use super::{ERR_BAD_PARAM, ERR_NO_INSTANCE, SAMPLE_BYTES, max_code};

/// ADC ioctl requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum AdcRequest {
    /// Inject the simulated input. Param: `u16` raw code, clamped to the
    /// resolution. Returns the stored code.
    SetSample = 0,
    /// Returns the resolution in bits.
    GetResolution = 1,
    /// Returns the number of conversions performed on the channel.
    GetSampleCount = 2,
}

impl TryFrom<i32> for AdcRequest {
    type Error = DriverError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::SetSample),
            1 => Ok(Self::GetResolution),
            2 => Ok(Self::GetSampleCount),
            other => Err(DriverError::UnknownRequest(other)),
        }
    }
}

#[derive(Debug, Default)]
struct AdcChannel {
    sample: AtomicU16,
    conversions: AtomicU32,
}

/// Simulated ADC implementing the `AioDriver` trait.
pub struct SimAdcDriver {
    descriptor: DriverDescriptor,
    resolution_bits: u8,
    channels: heapless::Vec<AdcChannel, { MAX_INSTANCES as usize }>,
}

impl SimAdcDriver {
    /// Create an ADC at `root` with `channels` inputs of `resolution_bits`.
    ///
    /// # Errors
    /// `AioError::InvalidDescriptor` for a bad root, channel count, or a
    /// resolution outside `1..=16`.
    pub fn new(root: &str, channels: u8, resolution_bits: u8) -> Result<Self, AioError> {
        if !(1..=16).contains(&resolution_bits) {
            return Err(AioError::InvalidDescriptor);
        }
        let caps = Capabilities::OPEN | Capabilities::CLOSE | Capabilities::READ | Capabilities::IOCTL;
        let descriptor = DriverDescriptor::new(root, channels, caps)?;
        let mut list = heapless::Vec::new();
        for _ in 0..channels {
            list.push(AdcChannel::default())
                .map_err(|_| AioError::InvalidDescriptor)?;
        }
        Ok(Self {
            descriptor,
            resolution_bits,
            channels: list,
        })
    }

    fn channel(&self, instance: u8) -> Result<&AdcChannel, DriverError> {
        self.channels
            .get(instance as usize)
            .ok_or(DriverError::Io(ERR_NO_INSTANCE))
    }
}

impl AioDriver for SimAdcDriver {
    fn name(&self) -> &'static str {
        "adc"
    }

    fn descriptor(&self) -> DriverDescriptor {
        self.descriptor.clone()
    }

    fn open(&self, instance: u8, mode: AccessMode, flags: OpenFlags) -> Result<(), DriverError> {
        self.channel(instance)?;
        debug!("adc channel {} opened ({}, {:?})", instance, mode, flags);
        Ok(())
    }

    fn close(&self, instance: u8) -> Result<(), DriverError> {
        self.channel(instance)?;
        Ok(())
    }

    fn ioctl(
        &self,
        instance: u8,
        request: i32,
        param: Option<&mut dyn Any>,
    ) -> Result<i32, DriverError> {
        let channel = self.channel(instance)?;
        match AdcRequest::try_from(request)? {
            AdcRequest::SetSample => {
                let raw = param
                    .and_then(|p| p.downcast_mut::<u16>())
                    .map(|v| *v)
                    .ok_or(DriverError::Io(ERR_BAD_PARAM))?;
                let code = raw.min(max_code(self.resolution_bits));
                channel.sample.store(code, Ordering::Release);
                Ok(i32::from(code))
            }
            AdcRequest::GetResolution => Ok(i32::from(self.resolution_bits)),
            AdcRequest::GetSampleCount => {
                let count = channel.conversions.load(Ordering::Acquire);
                Ok(i32::try_from(count).unwrap_or(i32::MAX))
            }
        }
    }

    /// Fills whole little-endian `u16` samples; a trailing odd byte is left
    /// untouched and not counted.
    fn read(&self, instance: u8, buf: &mut [u8]) -> Result<usize, DriverError> {
        let channel = self.channel(instance)?;
        let mut samples = 0u32;
        for chunk in buf.chunks_exact_mut(SAMPLE_BYTES) {
            let code = channel.sample.load(Ordering::Acquire);
            chunk.copy_from_slice(&code.to_le_bytes());
            samples += 1;
        }
        // Saturates; the closure never returns None.
        let _ = channel
            .conversions
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_add(samples))
            });
        trace!("adc channel {}: {} samples", instance, samples);
        Ok(samples as usize * SAMPLE_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(adc: &SimAdcDriver, instance: u8, value: u16) -> Result<i32, DriverError> {
        let mut v = value;
        adc.ioctl(instance, AdcRequest::SetSample as i32, Some(&mut v as &mut dyn Any))
    }

    #[test]
    fn read_returns_injected_sample() {
        let adc = SimAdcDriver::new("/dev/adc", 4, 10).unwrap();
        assert_eq!(set(&adc, 2, 513), Ok(513));

        let mut buf = [0u8; 4];
        assert_eq!(adc.read(2, &mut buf), Ok(4));
        assert_eq!(u16::from_le_bytes([buf[0], buf[1]]), 513);
        assert_eq!(u16::from_le_bytes([buf[2], buf[3]]), 513);
        assert_eq!(
            adc.ioctl(2, AdcRequest::GetSampleCount as i32, None),
            Ok(2)
        );
    }

    #[test]
    fn sample_clamped_to_resolution() {
        let adc = SimAdcDriver::new("/dev/adc", 1, 10).unwrap();
        assert_eq!(set(&adc, 0, u16::MAX), Ok(1023));
        assert_eq!(adc.ioctl(0, AdcRequest::GetResolution as i32, None), Ok(10));
    }

    #[test]
    fn odd_buffer_gives_short_read() {
        let adc = SimAdcDriver::new("/dev/adc", 1, 12).unwrap();
        set(&adc, 0, 0x0ABC).unwrap();
        let mut buf = [0xFFu8; 3];
        assert_eq!(adc.read(0, &mut buf), Ok(2));
        assert_eq!(buf, [0xBC, 0x0A, 0xFF]);

        let mut tiny = [0u8; 1];
        assert_eq!(adc.read(0, &mut tiny), Ok(0));
    }

    #[test]
    fn bad_param() {
        let adc = SimAdcDriver::new("/dev/adc", 1, 10).unwrap();
        assert_eq!(
            adc.ioctl(0, AdcRequest::SetSample as i32, None),
            Err(DriverError::Io(ERR_BAD_PARAM))
        );
        let mut wrong = 5u32;
        assert_eq!(
            adc.ioctl(0, AdcRequest::SetSample as i32, Some(&mut wrong as &mut dyn Any)),
            Err(DriverError::Io(ERR_BAD_PARAM))
        );
    }

    #[test]
    fn input_only() {
        let adc = SimAdcDriver::new("/dev/adc", 1, 10).unwrap();
        let caps = adc.descriptor().capabilities();
        assert!(caps.contains(Capabilities::READ));
        assert!(!caps.contains(Capabilities::WRITE));
        assert_eq!(adc.write(0, &[1, 2]), Err(DriverError::Unsupported));
    }

    #[test]
    fn sample_count_saturates() {
        let adc = SimAdcDriver::new("/dev/adc", 1, 10).unwrap();
        adc.channels[0]
            .conversions
            .store(u32::MAX - 1, Ordering::Release);

        let mut buf = [0u8; 6];
        assert_eq!(adc.read(0, &mut buf), Ok(6));
        assert_eq!(adc.channels[0].conversions.load(Ordering::Acquire), u32::MAX);
        assert_eq!(
            adc.ioctl(0, AdcRequest::GetSampleCount as i32, None),
            Ok(i32::MAX)
        );
    }

    #[test]
    fn invalid_resolution() {
        assert!(SimAdcDriver::new("/dev/adc", 1, 0).is_err());
        assert!(SimAdcDriver::new("/dev/adc", 1, 17).is_err());
    }
}
