//! Concurrent dispatch tests.
//!
//! Run-phase calls take `&AioDevices`, so scoped threads share one context
//! and one handle without extra synchronisation.

use aio_common::device::{AccessMode, AioDriver, Capabilities, DriverDescriptor, OpenFlags};
use aio_common::error::{AioError, DriverError};
use aio_devices::drivers::{LoopbackDriver, SimDacDriver};
use aio_devices::{AioDevices, HandleState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;
const ROUNDS: usize = 200;

#[derive(Default)]
struct Counters {
    closes: AtomicUsize,
    reads: AtomicUsize,
}

struct Counting {
    counters: Arc<Counters>,
}

impl AioDriver for Counting {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn descriptor(&self) -> DriverDescriptor {
        DriverDescriptor::new("/dev/count", 4, Capabilities::all()).unwrap()
    }

    fn open(&self, _: u8, _: AccessMode, _: OpenFlags) -> Result<(), DriverError> {
        Ok(())
    }

    fn close(&self, _: u8) -> Result<(), DriverError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read(&self, _: u8, buf: &mut [u8]) -> Result<usize, DriverError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        buf.fill(0xA5);
        Ok(buf.len())
    }
}

fn counting_devices() -> (AioDevices, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let mut devices: AioDevices = AioDevices::init();
    devices
        .add_driver(Box::new(Counting {
            counters: counters.clone(),
        }))
        .unwrap();
    (devices, counters)
}

#[test]
fn racing_closes_reach_driver_once() {
    let (devices, counters) = counting_devices();

    for round in 0..ROUNDS {
        let handle = devices.open("/dev/count/0", OpenFlags::RDONLY).unwrap();
        let barrier = Barrier::new(THREADS);

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    assert_eq!(devices.close(&handle), Ok(()));
                });
            }
        });

        assert_eq!(handle.state(), HandleState::Closed);
        assert_eq!(counters.closes.load(Ordering::SeqCst), round + 1);
    }
}

#[test]
fn close_racing_reads() {
    let (devices, counters) = counting_devices();
    let handle = devices.open("/dev/count/1", OpenFlags::RDONLY).unwrap();
    let barrier = Barrier::new(THREADS + 1);

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                barrier.wait();
                let mut buf = [0u8; 8];
                loop {
                    match devices.read(&handle, &mut buf) {
                        Ok(n) => {
                            assert_eq!(n, 8);
                            assert_eq!(buf, [0xA5; 8]);
                        }
                        Err(e) => {
                            // Once closed, every further read sees NotOpen.
                            assert_eq!(e, AioError::NotOpen);
                            break;
                        }
                    }
                }
            });
        }

        s.spawn(|| {
            barrier.wait();
            thread::yield_now();
            assert_eq!(devices.close(&handle), Ok(()));
        });
    });

    assert_eq!(handle.state(), HandleState::Closed);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);

    let after = counters.reads.load(Ordering::SeqCst);
    let mut buf = [0u8; 8];
    assert_eq!(devices.read(&handle, &mut buf), Err(AioError::NotOpen));
    assert_eq!(counters.reads.load(Ordering::SeqCst), after);
}

#[test]
fn independent_handles_in_parallel() {
    let mut devices: AioDevices = AioDevices::init();
    devices
        .add_driver(Box::new(LoopbackDriver::new("/dev/aio/loop", 4).unwrap()))
        .unwrap();

    thread::scope(|s| {
        for instance in 0..4u8 {
            let devices = &devices;
            s.spawn(move || {
                let path = format!("/dev/aio/loop/{instance}");
                let handle = devices.open(&path, OpenFlags::RDWR).unwrap();
                for i in 0..ROUNDS {
                    let byte = instance.wrapping_mul(31).wrapping_add(i as u8);
                    assert_eq!(devices.write(&handle, &[byte, !byte]), Ok(2));
                    let mut buf = [0u8; 2];
                    assert_eq!(devices.read(&handle, &mut buf), Ok(2));
                    assert_eq!(buf, [byte, !byte]);
                }
                devices.close(&handle).unwrap();
            });
        }
    });
}

#[test]
fn exclusive_open_has_single_winner() {
    let mut devices: AioDevices = AioDevices::init();
    devices
        .add_driver(Box::new(SimDacDriver::new("/dev/dac", 1, 12).unwrap()))
        .unwrap();

    for _ in 0..ROUNDS / 10 {
        let barrier = Barrier::new(THREADS);
        let winners = AtomicUsize::new(0);

        let handles: Vec<_> = thread::scope(|s| {
            let joins: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        match devices.open("/dev/dac/0", OpenFlags::WRONLY) {
                            Ok(handle) => {
                                winners.fetch_add(1, Ordering::SeqCst);
                                Some(handle)
                            }
                            Err(e) => {
                                assert_eq!(e, AioError::ResourceBusy);
                                None
                            }
                        }
                    })
                })
                .collect();
            joins.into_iter().filter_map(|j| j.join().unwrap()).collect()
        });

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(handles.len(), 1);
        devices.close(&handles[0]).unwrap();
    }
}
