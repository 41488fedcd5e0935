//! Software pseudo-random backend
//!
//! Each backend owns its generator, so sessions never share PRNG state.
//! Output is not physical entropy and is therefore never certified.

use super::{BoardType, Certification, DeviceBackend};
use crate::{Error, Result, GROUP_SIZE};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::debug;

pub struct PrngBackend {
    rng: StdRng,
}

impl PrngBackend {
    /// Generator seeded from the operating system
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible generator
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl DeviceBackend for PrngBackend {
    fn name(&self) -> &'static str {
        "prng"
    }

    fn open(&mut self, board: BoardType, device: &str) -> Result<()> {
        debug!("Software generator standing in for {} at {}", board, device);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.rng.fill_bytes(buf);
        Ok(buf.len())
    }

    fn read_raw(&mut self, buf: &mut [u16]) -> Result<usize> {
        self.rng.fill(buf);
        Ok(buf.len())
    }

    fn read_certified(&mut self, _group: &mut [u8; GROUP_SIZE]) -> Result<Certification> {
        Err(Error::InsufficientEntropy { group: 0, bits: 0 })
    }

    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = PrngBackend::seeded(7);
        let mut b = PrngBackend::seeded(7);
        let (mut x, mut y) = ([0u8; 32], [0u8; 32]);
        a.read(&mut x).unwrap();
        b.read(&mut y).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn test_never_certified() {
        let mut prng = PrngBackend::seeded(1);
        let mut group = [0u8; GROUP_SIZE];
        assert!(matches!(
            prng.read_certified(&mut group),
            Err(Error::InsufficientEntropy { bits: 0, .. })
        ));
    }
}
