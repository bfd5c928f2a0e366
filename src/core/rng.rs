//! RNG module - deterministic pseudo-random numbers for board generation
//!
//! A small LCG covers everything the board core needs: color rolls for
//! spawned tiles, Fisher-Yates permutation for the deadlock shuffle, and
//! weighted rolls for static-obstacle placement. Given the same seed a whole
//! level replays identically, which is what the tests lean on.

use crate::types::ColorId;

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        // LCG formula: (a * state + c) mod m
        // Using Numerical Recipes constants: a=1664525, c=1013904223, m=2^32
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max); returns 0 when max is 0
    pub fn next_range(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        self.next_u32() % max
    }

    /// Roll a color from a palette of `colors` entries
    pub fn next_color(&mut self, colors: u8) -> ColorId {
        self.next_range(colors.max(1) as u32) as ColorId
    }

    /// Weighted coin flip: true with roughly `percent` in 100 odds
    pub fn chance(&mut self, percent: u8) -> bool {
        self.next_range(100) < percent.min(100) as u32
    }

    /// Shuffle a slice using Fisher-Yates
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_range((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }

    /// Current internal state (for replaying a level with the same sequence)
    pub fn state(&self) -> u32 {
        self.state
    }
}

impl Default for SimpleRng {
    fn default() -> Self {
        Self::new(1)
    }
}
