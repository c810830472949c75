//! Mulberry32 stream shared by every stochastic decision in the engine.
//!
//! All arithmetic is modulo 2^32 so a given seed yields the same sequence on
//! any platform and in any port of the algorithm. Nothing here reads the
//! clock; entropy enters only through the seed.

use serde::{Deserialize, Serialize};

const GOLDEN_GAMMA: u32 = 0x6D2B_79F5;
const TWO_POW_32: f64 = 4_294_967_296.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeededRng {
    state: u32,
}

impl SeededRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Seeds wider than 32 bits are reduced modulo 2^32.
    pub fn from_seed_u64(seed: u64) -> Self {
        Self::new(seed as u32)
    }

    /// Restore a stream from a previously captured [`SeededRng::state`].
    pub fn from_state(state: u32) -> Self {
        Self { state }
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    /// Restart the stream in place, reducing `seed` like [`SeededRng::from_seed_u64`].
    pub fn reseed(&mut self, seed: u64) {
        *self = Self::from_seed_u64(seed);
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / TWO_POW_32
    }

    /// Uniform float in `[min, max)`.
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        self.next_f64() * (max - min) + min
    }

    /// Uniform integer in `[min, max]`, both ends inclusive.
    pub fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as f64;
        min + (self.next_f64() * span).floor() as i64
    }

    /// `true` with probability `probability`, which is clamped to `[0, 1]`.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability.clamp(0.0, 1.0)
    }

    /// Returns `None` for an empty slice without advancing the stream.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = (self.next_f64() * items.len() as f64).floor() as usize;
        items.get(index.min(items.len() - 1))
    }

    /// In-place Fisher-Yates, walking from the tail.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next_f64() * (i + 1) as f64).floor() as usize;
            items.swap(i, j.min(i));
        }
    }

    /// `value` plus uniform jitter in `[-intensity, intensity)`.
    pub fn wobble(&mut self, value: f64, intensity: f64) -> f64 {
        value + (self.next_f64() - 0.5) * 2.0 * intensity
    }

    /// Version-4 shaped identifier drawn from the stream.
    pub fn uuid_like(&mut self) -> String {
        const TEMPLATE: &str = "xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx";
        let mut out = String::with_capacity(TEMPLATE.len());
        for c in TEMPLATE.chars() {
            let nibble = match c {
                'x' => (self.next_f64() * 16.0) as u32,
                'y' => ((self.next_f64() * 16.0) as u32 & 0x3) | 0x8,
                literal => {
                    out.push(literal);
                    continue;
                }
            };
            out.push(char::from_digit(nibble, 16).unwrap_or('0'));
        }
        out
    }
}
