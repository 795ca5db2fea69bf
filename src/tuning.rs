//! Data-driven game balance
//!
//! Every number the simulation uses lives here so balance passes don't
//! touch simulation code. Partial JSON overrides are accepted: any table or
//! field left out keeps its default.

use serde::{Deserialize, Serialize};

use crate::consts::{FIELD_HEIGHT, FIELD_WIDTH, OFFSCREEN_MARGIN};
use crate::settings::GameMode;

/// Tuning failures
#[derive(Debug, thiserror::Error)]
pub enum TuningError {
    #[error("tuning parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid tuning: {0}")]
    Invalid(String),
}

/// Playfield geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldTuning {
    pub width: f32,
    pub height: f32,
    /// How far past the edges entities spawn and despawn
    pub offscreen_margin: f32,
}

impl Default for FieldTuning {
    fn default() -> Self {
        Self {
            width: FIELD_WIDTH,
            height: FIELD_HEIGHT,
            offscreen_margin: OFFSCREEN_MARGIN,
        }
    }
}

impl FieldTuning {
    /// X where new entities appear (right of the field)
    pub fn spawn_x(&self) -> f32 {
        self.width / 2.0 + self.offscreen_margin
    }

    /// X past which entities are removed (left of the field)
    pub fn despawn_x(&self) -> f32 {
        -self.width / 2.0 - self.offscreen_margin
    }

    pub fn mid_y(&self) -> f32 {
        0.0
    }

    pub fn half_height(&self) -> f32 {
        self.height / 2.0
    }
}

/// Gap size and cadence for one difficulty mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeTuning {
    pub gap_height: f32,
    /// Seconds between obstacle pairs
    pub spawn_interval: f64,
}

/// Obstacle spawning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleTuning {
    /// Horizontal speed (px/s)
    pub speed: f32,
    pub min_gap_height: f32,
    /// Largest allowed gap-centre change between consecutive pairs
    pub max_delta: f32,
    /// Gap centre offset range as a fraction of field height
    pub offset_fraction: f32,
    /// First pair after leaving the armed pause waits this fraction of the interval
    pub initial_delay_factor: f64,
    pub normal: ModeTuning,
    /// Relaxed mode is normal scaled up by this factor on both gap and interval
    pub basic_relax_factor: f32,
}

impl Default for ObstacleTuning {
    fn default() -> Self {
        Self {
            speed: 150.0,
            min_gap_height: 200.0,
            max_delta: 120.0,
            offset_fraction: 0.28,
            initial_delay_factor: 0.4,
            normal: ModeTuning {
                gap_height: 240.0,
                spawn_interval: 1.8,
            },
            basic_relax_factor: 1.25,
        }
    }
}

impl ObstacleTuning {
    /// Gap/interval table lookup. Gap height is never below `min_gap_height`.
    pub fn for_mode(&self, mode: GameMode) -> ModeTuning {
        let raw = match mode {
            GameMode::Normal => self.normal,
            GameMode::Basic => ModeTuning {
                gap_height: self.normal.gap_height * self.basic_relax_factor,
                spawn_interval: self.normal.spawn_interval * self.basic_relax_factor as f64,
            },
        };
        ModeTuning {
            gap_height: raw.gap_height.max(self.min_gap_height),
            spawn_interval: raw.spawn_interval,
        }
    }
}

/// Per-kind collectible parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollectibleKindTuning {
    /// Probability (0-1) of appearing in a given gap
    pub spawn_chance: f32,
    /// Speed relative to obstacle speed
    pub speed_multiplier: f32,
    /// Points awarded on pickup
    pub value: u32,
}

/// Collectible placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectibleTuning {
    /// Height of the vertical band (centred on the gap) rewards are placed in
    pub band_height: f32,
    pub min_separation: f32,
    /// Distance a conflicting reward is pushed per resolution step
    pub push_offset: f32,
    pub coin: CollectibleKindTuning,
    pub strawberry: CollectibleKindTuning,
    pub grape: CollectibleKindTuning,
}

impl Default for CollectibleTuning {
    fn default() -> Self {
        Self {
            band_height: 200.0,
            min_separation: 60.0,
            push_offset: 80.0,
            coin: CollectibleKindTuning {
                spawn_chance: 0.7,
                speed_multiplier: 1.0,
                value: 1,
            },
            strawberry: CollectibleKindTuning {
                spawn_chance: 0.3,
                speed_multiplier: 1.1,
                value: 2,
            },
            grape: CollectibleKindTuning {
                spawn_chance: 0.15,
                speed_multiplier: 1.2,
                value: 3,
            },
        }
    }
}

/// Player growth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthTuning {
    pub base_scale: f32,
    pub increment: f32,
    /// Levels above this one grow by a decaying increment
    pub slow_growth_start_level: u32,
    pub increment_decay: f32,
    pub min_increment: f32,
    pub max_level: u32,
    pub base_mass: f32,
    pub weight_increment: f32,
}

impl Default for GrowthTuning {
    fn default() -> Self {
        Self {
            base_scale: 2.0,
            increment: 0.15,
            slow_growth_start_level: 5,
            increment_decay: 0.02,
            min_increment: 0.05,
            max_level: 10,
            base_mass: 0.15,
            weight_increment: 0.005,
        }
    }
}

/// Player impulses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Upward impulse applied per flap
    pub flap_impulse: f32,
    /// Start position of the player entity
    pub start_x: f32,
    pub start_y: f32,
    /// Knock-back applied when the run ends
    pub fall_impulse: (f32, f32),
    pub fall_mass: f32,
    pub fall_angular_velocity: f32,
    pub fall_linear_damping: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            flap_impulse: 62.0,
            start_x: -240.0,
            start_y: 0.0,
            fall_impulse: (-50.0, -200.0),
            fall_mass: 0.1,
            fall_angular_velocity: -3.0,
            fall_linear_damping: 0.1,
        }
    }
}

/// Session-level timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTuning {
    /// Seconds after game over before the restart prompt is forced visible
    pub restart_fallback_delay: f64,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            restart_fallback_delay: 1.5,
        }
    }
}

/// Complete balance table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Tuning {
    pub field: FieldTuning,
    pub obstacles: ObstacleTuning,
    pub collectibles: CollectibleTuning,
    pub growth: GrowthTuning,
    pub player: PlayerTuning,
    pub session: SessionTuning,
}

impl Tuning {
    /// Parse a (possibly partial) JSON override and validate it
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        if self.field.width <= 0.0 || self.field.height <= 0.0 {
            return Err(TuningError::Invalid("field dimensions must be positive".into()));
        }
        if self.obstacles.speed <= 0.0 {
            return Err(TuningError::Invalid("obstacle speed must be positive".into()));
        }
        for mode in GameMode::ALL {
            let interval = self.obstacles.for_mode(mode).spawn_interval;
            if !interval.is_finite() || interval <= 0.0 {
                return Err(TuningError::Invalid(format!(
                    "spawn interval for {} must be positive",
                    mode.as_str()
                )));
            }
        }
        let kinds = [
            ("coin", &self.collectibles.coin),
            ("strawberry", &self.collectibles.strawberry),
            ("grape", &self.collectibles.grape),
        ];
        for (name, kind) in kinds {
            if !(0.0..=1.0).contains(&kind.spawn_chance) {
                return Err(TuningError::Invalid(format!(
                    "{name} spawn chance must be within 0..=1"
                )));
            }
            if kind.speed_multiplier <= 0.0 {
                return Err(TuningError::Invalid(format!(
                    "{name} speed multiplier must be positive"
                )));
            }
        }
        if self.growth.min_increment <= 0.0 {
            return Err(TuningError::Invalid("growth floor must be positive".into()));
        }
        Ok(())
    }
}
