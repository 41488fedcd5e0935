//! Single value draws
//!
//! Scalars are built from plain [`Session::get`] reads, so they share its
//! status reporting. Seeding is never needed: any generator state belongs to
//! the backend. An incomplete draw yields an error, never a partially random
//! value.
//!
//! Uniform values keep the top 53 (`f64`) or 24 (`f32`) bits of a fixed
//! width integer and scale by `2^-53` / `2^-24`, so the largest possible
//! result is strictly below 1.0.

use crate::session::Session;
use crate::Result;

const F64_SCALE: f64 = 1.0 / (1u64 << 53) as f64;
const F32_SCALE: f32 = 1.0 / (1u32 << 24) as f32;

/// Map 64 random bits onto `[0, 1)`
pub fn unit_f64(bits: u64) -> f64 {
    (bits >> 11) as f64 * F64_SCALE
}

/// Map 32 random bits onto `[0, 1)`
pub fn unit_f32(bits: u32) -> f32 {
    (bits >> 8) as f32 * F32_SCALE
}

impl Session {
    fn draw<const N: usize>(&self) -> Result<[u8; N]> {
        let mut bytes = [0u8; N];
        self.get(&mut bytes)?;
        Ok(bytes)
    }

    /// Random `i32`, the width of a C `int`
    pub fn rand(&self) -> Result<i32> {
        self.draw::<4>().map(i32::from_le_bytes)
    }

    /// Uniform `f64` in `[0, 1)`
    pub fn urand(&self) -> Result<f64> {
        self.draw::<8>().map(|b| unit_f64(u64::from_le_bytes(b)))
    }

    /// Uniform `f32` in `[0, 1)`
    pub fn urand2(&self) -> Result<f32> {
        self.draw::<4>().map(|b| unit_f32(u32::from_le_bytes(b)))
    }

    /// Shuffle `items` in place (Fisher-Yates driven by [`Session::urand`])
    pub fn shuffle<T>(&self, items: &mut [T]) -> Result<()> {
        for i in (1..items.len()).rev() {
            let j = ((self.urand()? * (i + 1) as f64) as usize).min(i);
            items.swap(i, j);
        }
        Ok(())
    }
}
