//! Fluttor - an endless side-scrolling gap-dodging game
//!
//! Core modules:
//! - `sim`: Session simulation (spawner, growth, state machine, timers)
//! - `highscores`: Score counters and per-player leaderboard
//! - `persistence`: Key/value storage backends
//! - `platform`: Browser/native platform abstraction
//! - `settings`: Player preferences and difficulty modes
//! - `tuning`: Data-driven game balance
//!
//! Rendering, audio playback and physics live outside this crate. The core
//! talks to them through [`sim::GameEvent`] (outgoing) and [`sim::TickInput`]
//! (incoming).

pub mod highscores;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use highscores::ScoreStore;
pub use settings::{GameMode, Settings};
pub use tuning::Tuning;

/// Identifier shared by every spawned entity (obstacle pairs and collectibles)
pub type EntityId = u32;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep used by hosts that step at a constant rate
    pub const SIM_DT: f64 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Playfield dimensions (origin at the centre of the field)
    pub const FIELD_WIDTH: f32 = 750.0;
    pub const FIELD_HEIGHT: f32 = 1334.0;

    /// Horizontal distance beyond the field edge where entities appear/vanish
    pub const OFFSCREEN_MARGIN: f32 = 150.0;

    /// Name used until the player types their own
    pub const DEFAULT_PLAYER_NAME: &str = "Jugador";
}
