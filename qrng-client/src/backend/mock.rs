//! Scripted in-memory backend
//!
//! Produces deterministic bytes from a seeded generator and lets tests script
//! its behavior: a finite supply that ends the stream, failures on open or
//! read, groups that cannot be certified. Every entry point is counted in a
//! shared [`MockCounters`] so tests can assert which calls reached the
//! backend after it has been moved into a session.

use super::{BoardType, Certification, DeviceBackend};
use crate::{Error, Result, GROUP_SIZE};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Failure a mock can be scripted to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    NoDevice,
    Opening,
    Reading,
    Timeout,
    RetriesExceeded,
}

impl MockFailure {
    fn to_error(self) -> Error {
        match self {
            MockFailure::NoDevice => Error::NoDeviceFound("mock".to_string()),
            MockFailure::Opening => Error::OpeningDevice("mock".to_string()),
            MockFailure::Reading => Error::ReadingDevice("mock".to_string()),
            MockFailure::Timeout => Error::NetTimeout,
            MockFailure::RetriesExceeded => Error::NetRetriesExceeded { attempts: 5 },
        }
    }
}

/// Call counters shared between a mock and the test holding it
#[derive(Debug, Clone, Default)]
pub struct MockCounters {
    inner: Arc<CountersInner>,
}

#[derive(Debug, Default)]
struct CountersInner {
    opens: AtomicUsize,
    reads: AtomicUsize,
    raw_reads: AtomicUsize,
    certified_reads: AtomicUsize,
    closes: AtomicUsize,
}

impl MockCounters {
    pub fn opens(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.inner.reads.load(Ordering::SeqCst)
    }

    pub fn raw_reads(&self) -> usize {
        self.inner.raw_reads.load(Ordering::SeqCst)
    }

    pub fn certified_reads(&self) -> usize {
        self.inner.certified_reads.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    /// Every data call that reached the backend
    pub fn data_calls(&self) -> usize {
        self.reads() + self.raw_reads() + self.certified_reads()
    }
}

/// In-memory backend for tests and dry runs
pub struct MockBackend {
    rng: StdRng,
    supply: Option<usize>,
    open_failure: Option<MockFailure>,
    read_failure: Option<MockFailure>,
    uncertified: HashSet<usize>,
    groups_served: usize,
    counters: MockCounters,
}

impl MockBackend {
    /// Mock that always supplies exactly what is requested
    pub fn new() -> Self {
        Self {
            rng: StdRng::seed_from_u64(0x5EED),
            supply: None,
            open_failure: None,
            read_failure: None,
            uncertified: HashSet::new(),
            groups_served: 0,
            counters: MockCounters::default(),
        }
    }

    /// Total bytes available before the stream ends
    pub fn with_supply(mut self, bytes: usize) -> Self {
        self.supply = Some(bytes);
        self
    }

    pub fn failing_open(mut self, failure: MockFailure) -> Self {
        self.open_failure = Some(failure);
        self
    }

    pub fn failing_reads(mut self, failure: MockFailure) -> Self {
        self.read_failure = Some(failure);
        self
    }

    /// Refuse to certify the `index`-th group ever requested
    pub fn with_uncertified_group(mut self, index: usize) -> Self {
        self.uncertified.insert(index);
        self
    }

    pub fn counters(&self) -> MockCounters {
        self.counters.clone()
    }

    /// Bytes that can still be served, capped at `wanted`
    fn take_supply(&mut self, wanted: usize) -> usize {
        match self.supply.as_mut() {
            Some(left) => {
                let n = wanted.min(*left);
                *left -= n;
                n
            }
            None => wanted,
        }
    }

    fn check_read(&self) -> Result<()> {
        match self.read_failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn open(&mut self, _board: BoardType, _device: &str) -> Result<()> {
        self.counters.inner.opens.fetch_add(1, Ordering::SeqCst);
        match self.open_failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.counters.inner.reads.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;

        let n = self.take_supply(buf.len());
        self.rng.fill_bytes(&mut buf[..n]);
        Ok(n)
    }

    fn read_raw(&mut self, buf: &mut [u16]) -> Result<usize> {
        self.counters.inner.raw_reads.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;

        let n = self.take_supply(buf.len() * 2) / 2;
        for sample in &mut buf[..n] {
            *sample = self.rng.next_u32() as u16;
        }
        Ok(n)
    }

    fn read_certified(&mut self, group: &mut [u8; GROUP_SIZE]) -> Result<Certification> {
        self.counters.inner.certified_reads.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;

        let index = self.groups_served;
        self.groups_served += 1;

        if self.uncertified.contains(&index) {
            return Err(Error::InsufficientEntropy { group: 0, bits: 12 });
        }

        if self.take_supply(GROUP_SIZE) < GROUP_SIZE {
            return Err(Error::IncompleteData {
                read: 0,
                requested: GROUP_SIZE,
            });
        }

        self.rng.fill_bytes(group);
        Ok(Certification {
            entropy_bits: 64,
            value: 1.0,
        })
    }

    fn close(&mut self) {
        self.counters.inner.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supply_runs_out() {
        let mut mock = MockBackend::new().with_supply(10);
        let mut buf = [0u8; 8];
        assert_eq!(mock.read(&mut buf).unwrap(), 8);
        assert_eq!(mock.read(&mut buf).unwrap(), 2);
        assert_eq!(mock.read(&mut buf).unwrap(), 0);
        assert_eq!(mock.counters().reads(), 3);
    }

    #[test]
    fn test_scripted_failures() {
        let mut mock = MockBackend::new()
            .failing_open(MockFailure::NoDevice)
            .failing_reads(MockFailure::Timeout);
        assert!(matches!(
            mock.open(BoardType::VertexB1, "x"),
            Err(Error::NoDeviceFound(_))
        ));
        assert!(matches!(mock.read(&mut [0u8; 4]), Err(Error::NetTimeout)));
    }

    #[test]
    fn test_uncertified_group() {
        let mut mock = MockBackend::new().with_uncertified_group(1);
        let mut group = [0u8; GROUP_SIZE];
        assert!(mock.read_certified(&mut group).is_ok());
        assert!(matches!(
            mock.read_certified(&mut group),
            Err(Error::InsufficientEntropy { .. })
        ));
        assert!(mock.read_certified(&mut group).is_ok());
    }
}
