//! Player growth from collected fruit
//!
//! Each strawberry raises the growth level by one, up to a cap. Scale grows
//! by a fixed increment per level until the slow-growth threshold, then by a
//! shrinking increment that never drops below a floor. Mass grows linearly
//! with level.

use serde::{Deserialize, Serialize};

use super::spawner::CollectibleKind;
use crate::tuning::GrowthTuning;

/// Growth level, derived size/mass and the transformed flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Growth {
    #[serde(skip)]
    tuning: GrowthTuning,
    level: u32,
    /// Switched to the fruit-eating appearance for the rest of the run
    transformed: bool,
}

impl Growth {
    pub fn new(tuning: GrowthTuning) -> Self {
        Self {
            tuning,
            level: 0,
            transformed: false,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_transformed(&self) -> bool {
        self.transformed
    }

    pub fn is_maxed(&self) -> bool {
        self.level >= self.tuning.max_level
    }

    /// Apply a pickup. Returns true if level or appearance changed.
    pub fn on_collectible_picked(&mut self, kind: CollectibleKind) -> bool {
        match kind {
            CollectibleKind::Coin => false,
            CollectibleKind::Strawberry => {
                let was_transformed = self.transformed;
                self.transformed = true;
                if self.is_maxed() {
                    log::debug!("Growth capped at level {}", self.level);
                    return !was_transformed;
                }
                self.level += 1;
                log::debug!(
                    "Growth level {} (scale {:.3})",
                    self.level,
                    self.current_scale()
                );
                true
            }
            CollectibleKind::Grape => {
                let changed = !self.transformed;
                self.transformed = true;
                changed
            }
        }
    }

    /// Scale added when reaching `level` (level 0 adds nothing)
    pub fn increment_for_level(&self, level: u32) -> f32 {
        let t = &self.tuning;
        if level == 0 {
            0.0
        } else if level <= t.slow_growth_start_level {
            t.increment
        } else {
            let steps = (level - t.slow_growth_start_level) as f32;
            (t.increment - t.increment_decay * steps).max(t.min_increment)
        }
    }

    /// Sum of increments for every level reached so far
    pub fn cumulative_scale_increment(&self) -> f32 {
        (1..=self.level).map(|l| self.increment_for_level(l)).sum()
    }

    pub fn current_scale(&self) -> f32 {
        self.tuning.base_scale + self.cumulative_scale_increment()
    }

    pub fn current_mass(&self) -> f32 {
        self.tuning.base_mass + self.level as f32 * self.tuning.weight_increment
    }

    pub fn base_scale(&self) -> f32 {
        self.tuning.base_scale
    }

    pub fn base_mass(&self) -> f32 {
        self.tuning.base_mass
    }

    pub fn reset(&mut self) {
        self.level = 0;
        self.transformed = false;
    }
}
