//! Path resolution.
//!
//! Maps `<root>/<instance>` device paths to a registered driver and an
//! instance number. Runs once per `open`; later operations use the
//! resolved `DriverId`.

use aio_common::consts::PATH_SEPARATOR;
use aio_common::error::AioError;

use crate::registry::{DriverId, DriverRegistry};

/// Result of resolving a device path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// Driver claiming the path.
    pub driver: DriverId,
    /// Instance selected by the path suffix.
    pub instance: u8,
}

/// Resolve `path` against the registry by longest root prefix.
///
/// Roots only match at a segment boundary, so `/dev/aio` never claims
/// `/dev/aiox/0`. Registered roots never overlap, so at most one root is a
/// segment prefix of any path; the longest-match scan still picks the
/// longest for clarity of contract.
///
/// # Errors
/// - `AioError::DeviceNotFound` if no registered root prefixes `path`
/// - `AioError::InvalidInstance` if the suffix is missing, malformed, or
///   not below the driver's instance count
pub fn resolve<const N: usize>(
    registry: &DriverRegistry<N>,
    path: &str,
) -> Result<Resolved, AioError> {
    // (driver, instance count, root length, remainder after root)
    let mut best: Option<(DriverId, u8, usize, &str)> = None;

    for (id, descriptor) in registry.iter() {
        let root = descriptor.root_path();
        let Some(rest) = path.strip_prefix(root) else {
            continue;
        };
        if !rest.is_empty() && rest.as_bytes()[0] != PATH_SEPARATOR {
            continue;
        }
        if best.is_none_or(|(_, _, len, _)| len < root.len()) {
            best = Some((id, descriptor.instances(), root.len(), rest));
        }
    }

    let (driver, instances, _, rest) = best.ok_or(AioError::DeviceNotFound)?;
    let selector = rest
        .strip_prefix(PATH_SEPARATOR as char)
        .ok_or(AioError::InvalidInstance)?;
    let instance = parse_instance(selector, instances)?;

    Ok(Resolved { driver, instance })
}

/// Parse a decimal instance selector and range-check it.
///
/// Accepts ASCII digits only (no sign, no whitespace, no further `/`).
pub fn parse_instance(selector: &str, instances: u8) -> Result<u8, AioError> {
    if selector.is_empty() {
        return Err(AioError::InvalidInstance);
    }

    let mut value: u32 = 0;
    for b in selector.bytes() {
        if !b.is_ascii_digit() {
            return Err(AioError::InvalidInstance);
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u32::from(b - b'0')))
            .ok_or(AioError::InvalidInstance)?;
    }

    if value >= u32::from(instances) {
        return Err(AioError::InvalidInstance);
    }
    Ok(value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aio_common::device::{AioDriver, Capabilities, DriverDescriptor};

    struct Stub {
        root: &'static str,
        instances: u8,
    }

    impl AioDriver for Stub {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn descriptor(&self) -> DriverDescriptor {
            DriverDescriptor::new(self.root, self.instances, Capabilities::all()).unwrap()
        }
    }

    fn registry() -> (DriverRegistry<4>, DriverId, DriverId) {
        let mut reg = DriverRegistry::new();
        let aio = reg
            .add(Box::new(Stub {
                root: "/dev/aio",
                instances: 2,
            }))
            .unwrap();
        let adc = reg
            .add(Box::new(Stub {
                root: "/dev/serial/aio/in",
                instances: 12,
            }))
            .unwrap();
        (reg, aio, adc)
    }

    #[test]
    fn resolves_instance() {
        let (reg, aio, adc) = registry();
        assert_eq!(
            resolve(&reg, "/dev/aio/0"),
            Ok(Resolved {
                driver: aio,
                instance: 0
            })
        );
        assert_eq!(resolve(&reg, "/dev/aio/1").unwrap().instance, 1);
        assert_eq!(
            resolve(&reg, "/dev/serial/aio/in/11"),
            Ok(Resolved {
                driver: adc,
                instance: 11
            })
        );
    }

    #[test]
    fn unknown_root() {
        let (reg, _, _) = registry();
        assert_eq!(resolve(&reg, "/dev/unknown/0"), Err(AioError::DeviceNotFound));
        assert_eq!(resolve(&reg, "/dev/aiox/0"), Err(AioError::DeviceNotFound));
        assert_eq!(resolve(&reg, ""), Err(AioError::DeviceNotFound));
        assert_eq!(resolve(&reg, "/dev"), Err(AioError::DeviceNotFound));
    }

    #[test]
    fn empty_registry() {
        let reg = DriverRegistry::<2>::new();
        assert_eq!(resolve(&reg, "/dev/aio/0"), Err(AioError::DeviceNotFound));
    }

    #[test]
    fn malformed_selectors() {
        let (reg, _, _) = registry();
        for path in [
            "/dev/aio",
            "/dev/aio/",
            "/dev/aio/x",
            "/dev/aio/-1",
            "/dev/aio/+1",
            "/dev/aio/ 1",
            "/dev/aio/0/1",
            "/dev/aio/99999999999999",
        ] {
            assert_eq!(
                resolve(&reg, path),
                Err(AioError::InvalidInstance),
                "path {path:?}"
            );
        }
    }

    #[test]
    fn out_of_range_selector() {
        let (reg, _, _) = registry();
        assert_eq!(resolve(&reg, "/dev/aio/2"), Err(AioError::InvalidInstance));
        assert_eq!(resolve(&reg, "/dev/aio/7"), Err(AioError::InvalidInstance));
        assert_eq!(resolve(&reg, "/dev/serial/aio/in/12"), Err(AioError::InvalidInstance));
    }

    #[test]
    fn parse_instance_bounds() {
        assert_eq!(parse_instance("0", 1), Ok(0));
        assert_eq!(parse_instance("007", 8), Ok(7));
        assert_eq!(parse_instance("31", 32), Ok(31));
        assert_eq!(parse_instance("32", 32), Err(AioError::InvalidInstance));
        assert_eq!(parse_instance("", 32), Err(AioError::InvalidInstance));
        assert_eq!(parse_instance("4294967296", 32), Err(AioError::InvalidInstance));
    }
}
