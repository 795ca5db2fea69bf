//! Bounded random sampling and vertical placement helpers
//!
//! All randomness in the simulation flows through [`SimRng`], seeded once
//! per session so layouts are reproducible.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Seeded simulation RNG
#[derive(Debug, Clone)]
pub struct SimRng {
    seed: u64,
    rng: Pcg32,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform sample in `[-max, max]` (0 when the range is empty)
    pub fn offset(&mut self, max: f32) -> f32 {
        if max <= 0.0 {
            return 0.0;
        }
        self.rng.random_range(-max..=max)
    }

    /// Uniform sample in `[min, max]` (`min` when the range is empty)
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        if min >= max {
            return min;
        }
        self.rng.random_range(min..=max)
    }

    /// Bernoulli trial: true with probability `chance` (clamped to 0..=1)
    pub fn roll(&mut self, chance: f32) -> bool {
        self.rng.random::<f32>() < chance.clamp(0.0, 1.0)
    }
}

/// Limit `target` to within `max_delta` of `previous`. No previous value
/// means no constraint.
pub fn clamp_delta(previous: Option<f32>, target: f32, max_delta: f32) -> f32 {
    match previous {
        Some(prev) => target.clamp(prev - max_delta, prev + max_delta),
        None => target,
    }
}

/// Push `y` away from `anchor` in steps of `push` until they are at least
/// `min_separation` apart, never leaving `[lo, hi]`.
///
/// The push direction is away from the anchor (downwards on a tie). If a
/// step would not move `y` because it is pinned at a bound, placement stops
/// short of the separation.
pub fn separate_from(anchor: f32, y: f32, min_separation: f32, push: f32, lo: f32, hi: f32) -> f32 {
    let mut y = y;
    if push <= 0.0 {
        return y;
    }
    while (y - anchor).abs() < min_separation {
        let step = if y > anchor { push } else { -push };
        let next = (y + step).clamp(lo, hi);
        if next == y {
            break;
        }
        y = next;
    }
    y
}
