//! Random sources for prize selection
//!
//! The engine only needs a uniform value in [0, 1). The browser seeds the
//! XorShift generator from `getrandom`, the simulator from a CLI seed, and
//! tests inject fixed values.

use parity_scale_codec::{Decode, Encode};
use scale_info::TypeInfo;

/// Source of randomness for draws
pub trait DrawRng {
    /// Generate a random u32
    fn next_u32(&mut self) -> u32;

    /// Uniform value in [0, 1)
    fn next_unit(&mut self) -> f64 {
        self.next_u32() as f64 / 4_294_967_296.0
    }
}

impl<R: DrawRng + ?Sized> DrawRng for &mut R {
    fn next_u32(&mut self) -> u32 {
        (**self).next_u32()
    }

    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// XorShift32 RNG - simple, fast, deterministic
///
/// Not cryptographic. The same seed always produces the same sequence, which
/// is what the odds simulator relies on.
#[derive(Debug, Clone, Encode, Decode, TypeInfo)]
pub struct XorShiftRng {
    state: u32,
}

impl XorShiftRng {
    /// Create a new RNG from a u64 seed
    ///
    /// The seed is folded into a u32, ensuring state is never 0.
    pub fn seed_from_u64(seed: u64) -> Self {
        let state = ((seed as u32) ^ ((seed >> 32) as u32)).max(1);
        Self { state }
    }
}

impl DrawRng for XorShiftRng {
    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

/// Replays a fixed list of unit values, cycling when exhausted
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    values: alloc::vec::Vec<f64>,
    cursor: usize,
}

impl ScriptedRng {
    pub fn new(values: &[f64]) -> Self {
        Self {
            values: values.to_vec(),
            cursor: 0,
        }
    }
}

impl DrawRng for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        (self.next_unit() * 4_294_967_296.0) as u32
    }

    fn next_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xorshift_deterministic() {
        let mut rng1 = XorShiftRng::seed_from_u64(12345);
        let mut rng2 = XorShiftRng::seed_from_u64(12345);

        for _ in 0..100 {
            assert_eq!(rng1.next_u32(), rng2.next_u32());
        }
    }

    #[test]
    fn test_xorshift_different_seeds() {
        let mut rng1 = XorShiftRng::seed_from_u64(12345);
        let mut rng2 = XorShiftRng::seed_from_u64(54321);

        assert_ne!(rng1.next_u32(), rng2.next_u32());
    }

    #[test]
    fn test_next_unit_stays_below_one() {
        let mut rng = XorShiftRng::seed_from_u64(42);

        for _ in 0..1000 {
            let val = rng.next_unit();
            assert!((0.0..1.0).contains(&val));
        }
    }

    #[test]
    fn test_zero_seed_is_usable() {
        let mut rng = XorShiftRng::seed_from_u64(0);
        assert_ne!(rng.next_u32(), 0);
    }

    #[test]
    fn test_scripted_rng_cycles() {
        let mut rng = ScriptedRng::new(&[0.25, 0.75]);
        assert_eq!(rng.next_unit(), 0.25);
        assert_eq!(rng.next_unit(), 0.75);
        assert_eq!(rng.next_unit(), 0.25);
    }
}
