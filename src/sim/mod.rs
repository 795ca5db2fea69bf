//! Deterministic session simulation
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time only moves through [`Session::advance`]
//! - Seeded RNG only
//! - No rendering, audio or physics dependencies

pub mod clock;
pub mod events;
pub mod growth;
pub mod placement;
pub mod spawner;
pub mod state;
pub mod tick;

pub use clock::{Clock, TimerHandle, TimerTask};
pub use events::{CollisionKind, DespawnReason, GameEvent, SoundCue, TapRegion, VisualKind};
pub use growth::Growth;
pub use placement::SimRng;
pub use spawner::{Collectible, CollectibleKind, ObstaclePair, RewardLayout, Spawner};
pub use state::{Session, SessionPhase};
pub use tick::{FixedStep, TickInput, tick};
