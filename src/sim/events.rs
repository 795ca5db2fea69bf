//! Boundary types between the simulation and its host
//!
//! Incoming: [`CollisionKind`] (from the physics world) and [`TapRegion`]
//! (from input). Outgoing: [`GameEvent`], drained by the presentation layer
//! after every tick.

use glam::Vec2;
use serde::Serialize;

use super::spawner::CollectibleKind;
use super::state::SessionPhase;
use crate::EntityId;

/// Physics category bits used by hosts that report raw contact masks
pub mod category {
    pub const PLAYER: u32 = 0b0000_0001;
    pub const GROUND: u32 = 0b0000_0010;
    pub const CEILING: u32 = 0b0000_0100;
    pub const OBSTACLE: u32 = 0b0000_1000;
    pub const SCORE_DETECTOR: u32 = 0b0001_0000;
    pub const COIN: u32 = 0b0010_0000;
    pub const STRAWBERRY: u32 = 0b0100_0000;
    pub const GRAPE: u32 = 0b1000_0000;
}

/// A contact between the player entity and something else
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CollisionKind {
    /// Player hit an obstacle (fatal)
    Obstacle,
    /// Player hit the ground (fatal)
    Boundary,
    /// Player crossed the scoring detector of an obstacle pair
    ScoringZone { obstacle: EntityId },
    /// Player touched a collectible
    Collectible { id: EntityId },
}

impl CollisionKind {
    pub fn is_fatal(&self) -> bool {
        matches!(self, CollisionKind::Obstacle | CollisionKind::Boundary)
    }

    /// Resolve a raw contact (two category masks plus the id of the
    /// non-player body) into a collision kind. Contacts that don't involve
    /// the player, or that the game ignores (the ceiling only blocks), give `None`.
    pub fn from_categories(a: u32, b: u32, other_id: EntityId) -> Option<Self> {
        let mask = a | b;
        if mask & category::PLAYER == 0 {
            return None;
        }
        match mask & !category::PLAYER {
            category::OBSTACLE => Some(CollisionKind::Obstacle),
            category::GROUND => Some(CollisionKind::Boundary),
            category::SCORE_DETECTOR => Some(CollisionKind::ScoringZone { obstacle: other_id }),
            category::COIN | category::STRAWBERRY | category::GRAPE => {
                Some(CollisionKind::Collectible { id: other_id })
            }
            _ => None,
        }
    }
}

/// Screen region a tap landed in, resolved by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TapRegion {
    /// Anywhere not covered by a button
    Field,
    PauseButton,
    ResumeButton,
    /// "Start" on the pause overlay: abandon the run and re-arm
    StartButton,
    RestartButton,
    /// Back to the welcome screen from game over
    HomeButton,
    PlayNormal,
    PlayBasic,
}

impl TapRegion {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "field" => Some(TapRegion::Field),
            "pause" => Some(TapRegion::PauseButton),
            "resume" => Some(TapRegion::ResumeButton),
            "start" => Some(TapRegion::StartButton),
            "restart" => Some(TapRegion::RestartButton),
            "home" => Some(TapRegion::HomeButton),
            "play" | "play_normal" => Some(TapRegion::PlayNormal),
            "play_basic" => Some(TapRegion::PlayBasic),
            _ => None,
        }
    }
}

/// Sound cues the audio collaborator knows how to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SoundCue {
    Wing,
    Point,
    Hit,
    Die,
    Swoosh,
    Coin,
    Fruit,
}

/// What a spawned visual represents
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum VisualKind {
    ObstaclePair { gap_center_y: f32, gap_height: f32 },
    Collectible(CollectibleKind),
}

/// Why a visual was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DespawnReason {
    /// Scrolled past the trailing edge
    Exited,
    /// Picked up by the player
    Collected,
    /// Session reset
    Cleared,
}

/// Notifications for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    SpawnVisual {
        id: EntityId,
        kind: VisualKind,
        position: Vec2,
        /// Leftward speed in px/s
        speed: f32,
    },
    DespawnVisual {
        id: EntityId,
        reason: DespawnReason,
    },
    /// In-flight obstacles and collectibles stopped (or resumed) moving
    MotionFrozen(bool),
    PhaseChanged {
        from: SessionPhase,
        to: SessionPhase,
    },
    ScoreChanged(u32),
    GrowthChanged {
        level: u32,
        scale: f32,
        mass: f32,
        transformed: bool,
    },
    /// Apply an upward impulse to the player
    Flap { impulse: f32 },
    /// Knock the player out of the sky at the end of a run
    TerminalFall {
        impulse: Vec2,
        mass: f32,
        angular_velocity: f32,
        linear_damping: f32,
    },
    /// Put the player back at its start position with base size
    PlayerReset {
        position: Vec2,
        scale: f32,
        mass: f32,
    },
    PlaySound { cue: SoundCue, volume: f32 },
    /// Screen shake and flash
    ImpactEffect,
    NewHighScore(u32),
    RestartPromptShown {
        final_score: u32,
        high_score: u32,
    },
    PlayerNameChanged(String),
}
