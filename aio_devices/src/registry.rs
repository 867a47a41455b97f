//! Driver registry for AIO drivers.
//!
//! Provides a fixed-capacity `DriverRegistry` owning registered drivers
//! behind generational `DriverId`s. It is constructed at startup and
//! owned by the dispatch facade; there is no global state.

use aio_common::consts::MAX_DRIVERS;
use aio_common::device::{AioDriver, DriverDescriptor};
use aio_common::error::AioError;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, info};

/// Stable identity of a registered driver.
///
/// A released slot bumps its generation, so an id held past
/// `release` never resolves to the driver that reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverId {
    slot: usize,
    generation: u32,
}

impl DriverId {
    /// Slot index in the registry table.
    #[inline]
    pub const fn slot(&self) -> usize {
        self.slot
    }

    /// Generation of the slot at registration time.
    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.slot, self.generation)
    }
}

/// A driver together with its cached descriptor and instance claims.
pub(crate) struct RegisteredDriver {
    descriptor: DriverDescriptor,
    driver: Box<dyn AioDriver>,
    /// One bit per exclusively open instance.
    claimed: AtomicU32,
}

impl RegisteredDriver {
    #[inline]
    pub(crate) fn descriptor(&self) -> &DriverDescriptor {
        &self.descriptor
    }

    #[inline]
    pub(crate) fn driver(&self) -> &dyn AioDriver {
        self.driver.as_ref()
    }

    /// Claim `instance` for exclusive use. Returns false if already claimed.
    pub(crate) fn claim(&self, instance: u8) -> bool {
        let bit = 1u32 << instance;
        self.claimed.fetch_or(bit, Ordering::AcqRel) & bit == 0
    }

    /// Release an exclusive claim on `instance`.
    pub(crate) fn unclaim(&self, instance: u8) {
        let bit = 1u32 << instance;
        self.claimed.fetch_and(!bit, Ordering::AcqRel);
    }

    #[cfg(test)]
    pub(crate) fn is_claimed(&self, instance: u8) -> bool {
        self.claimed.load(Ordering::Acquire) & (1u32 << instance) != 0
    }
}

struct Slot {
    generation: u32,
    entry: Option<RegisteredDriver>,
}

/// Fixed-capacity table of registered drivers.
///
/// Mutation (`add`, `remove`) takes `&mut self` and lookups take `&self`,
/// so registration can only happen while no dispatch borrows are live.
pub struct DriverRegistry<const N: usize = MAX_DRIVERS> {
    slots: heapless::Vec<Slot, N>,
    live: usize,
}

impl<const N: usize> DriverRegistry<N> {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            slots: heapless::Vec::new(),
            live: 0,
        }
    }

    /// Register a driver.
    ///
    /// # Errors
    /// - `AioError::RegistryFull` if all `N` slots hold live drivers
    /// - `AioError::DuplicatePath` if the driver's root path equals, contains,
    ///   or is contained by a registered root (segment-wise)
    pub fn add(&mut self, driver: Box<dyn AioDriver>) -> Result<DriverId, AioError> {
        let descriptor = driver.descriptor();

        if self.live >= N {
            return Err(AioError::RegistryFull);
        }

        if let Some((_, existing)) = self
            .iter()
            .find(|(_, existing)| existing.overlaps(descriptor.root_path()))
        {
            debug!(
                "Rejecting '{}': overlaps registered root '{}'",
                descriptor.root_path(),
                existing.root_path()
            );
            return Err(AioError::DuplicatePath);
        }

        let name = driver.name();
        let entry = RegisteredDriver {
            descriptor,
            driver,
            claimed: AtomicU32::new(0),
        };

        let id = match self.slots.iter().position(|s| s.entry.is_none()) {
            Some(idx) => {
                let slot = &mut self.slots[idx];
                slot.entry = Some(entry);
                DriverId {
                    slot: idx,
                    generation: slot.generation,
                }
            }
            None => {
                let idx = self.slots.len();
                self.slots
                    .push(Slot {
                        generation: 0,
                        entry: Some(entry),
                    })
                    .map_err(|_| AioError::RegistryFull)?;
                DriverId {
                    slot: idx,
                    generation: 0,
                }
            }
        };
        self.live += 1;

        if let Some(entry) = self.get(id) {
            info!(
                "Registered driver '{}' at {} ({} instances, id {})",
                name,
                entry.descriptor.root_path(),
                entry.descriptor.instances(),
                id
            );
        }
        Ok(id)
    }

    /// Remove a driver by identity, handing it back to the caller.
    ///
    /// Returns `None` if `id` is unknown or already released.
    pub fn remove(&mut self, id: DriverId) -> Option<Box<dyn AioDriver>> {
        let slot = self.slots.get_mut(id.slot)?;
        if slot.generation != id.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.live -= 1;

        info!(
            "Released driver '{}' at {} (id {})",
            entry.driver.name(),
            entry.descriptor.root_path(),
            id
        );
        Some(entry.driver)
    }

    /// O(1) lookup of a live driver.
    #[inline]
    pub(crate) fn get(&self, id: DriverId) -> Option<&RegisteredDriver> {
        let slot = self.slots.get(id.slot)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    /// Descriptor of a live driver.
    pub fn descriptor(&self, id: DriverId) -> Option<&DriverDescriptor> {
        self.get(id).map(RegisteredDriver::descriptor)
    }

    /// Whether `id` refers to a live driver.
    pub fn contains(&self, id: DriverId) -> bool {
        self.get(id).is_some()
    }

    /// Iterate over live drivers in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (DriverId, &DriverDescriptor)> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.entry.as_ref().map(|entry| {
                (
                    DriverId {
                        slot: idx,
                        generation: slot.generation,
                    },
                    &entry.descriptor,
                )
            })
        })
    }

    /// Number of live drivers.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no driver is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Maximum number of live drivers.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for DriverRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}
