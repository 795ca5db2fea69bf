//! Obstacle and collectible spawning
//!
//! The spawner owns every in-flight obstacle pair and collectible. It runs a
//! repeating [`TimerTask::Spawn`] cycle on the session clock, moves entities
//! leftward while unfrozen, and removes them past the trailing edge.
//!
//! Pausing captures the time left until the next spawn so that resuming
//! keeps the cycle phase instead of restarting the interval.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::clock::{Clock, TimerHandle, TimerTask};
use super::events::{DespawnReason, GameEvent, SoundCue, VisualKind};
use super::placement::{SimRng, clamp_delta, separate_from};
use crate::EntityId;
use crate::settings::GameMode;
use crate::tuning::{CollectibleKindTuning, CollectibleTuning, FieldTuning, ObstacleTuning};

/// Reward types that can appear in an obstacle gap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectibleKind {
    Coin,
    Strawberry,
    Grape,
}

impl CollectibleKind {
    /// Placement order. Later kinds yield to earlier ones on overlap.
    pub const ALL: [CollectibleKind; 3] = [
        CollectibleKind::Coin,
        CollectibleKind::Strawberry,
        CollectibleKind::Grape,
    ];

    pub fn tuning<'a>(&self, tuning: &'a CollectibleTuning) -> &'a CollectibleKindTuning {
        match self {
            CollectibleKind::Coin => &tuning.coin,
            CollectibleKind::Strawberry => &tuning.strawberry,
            CollectibleKind::Grape => &tuning.grape,
        }
    }

    pub fn sound(&self) -> SoundCue {
        match self {
            CollectibleKind::Coin => SoundCue::Coin,
            CollectibleKind::Strawberry | CollectibleKind::Grape => SoundCue::Fruit,
        }
    }
}

/// A top/bottom obstacle pair sharing one gap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstaclePair {
    pub id: EntityId,
    /// Horizontal position of the pair's centre line
    pub x: f32,
    pub gap_center_y: f32,
    pub gap_height: f32,
    /// Leftward speed (px/s)
    pub speed: f32,
    /// Clock time the pair was created
    pub spawn_time: f64,
    /// Whether the scoring detector already paid out
    pub scored: bool,
}

impl ObstaclePair {
    /// Top edge of the bottom obstacle and bottom edge of the top one
    pub fn gap_bounds(&self) -> (f32, f32) {
        let half = self.gap_height / 2.0;
        (self.gap_center_y - half, self.gap_center_y + half)
    }
}

/// A reward placed inside a gap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collectible {
    pub id: EntityId,
    pub kind: CollectibleKind,
    pub position: Vec2,
    pub speed: f32,
    pub value: u32,
    /// Pair this reward was spawned with
    pub obstacle: EntityId,
}

/// Vertical positions chosen for one gap's rewards. `None` means the kind
/// didn't roll this time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RewardLayout {
    pub coin: Option<f32>,
    pub strawberry: Option<f32>,
    pub grape: Option<f32>,
}

impl RewardLayout {
    /// Roll and place rewards in a band centred on `gap_center_y`.
    ///
    /// Draw order is fixed (presence then position, coin, strawberry, grape)
    /// so a seed always gives the same layout. Overlaps resolve pairwise in
    /// that same order without re-checking earlier pairs.
    pub fn roll(tuning: &CollectibleTuning, gap_center_y: f32, rng: &mut SimRng) -> Self {
        let half = tuning.band_height / 2.0;
        let (lo, hi) = (gap_center_y - half, gap_center_y + half);

        let mut place = |chance: f32| {
            if rng.roll(chance) {
                Some(rng.range(lo, hi))
            } else {
                None
            }
        };
        let coin = place(tuning.coin.spawn_chance);
        let mut strawberry = place(tuning.strawberry.spawn_chance);
        let mut grape = place(tuning.grape.spawn_chance);

        let separate = |anchor: f32, y: f32| {
            separate_from(
                anchor,
                y,
                tuning.min_separation,
                tuning.push_offset,
                lo,
                hi,
            )
        };
        if let (Some(c), Some(s)) = (coin, strawberry) {
            strawberry = Some(separate(c, s));
        }
        if let (Some(c), Some(g)) = (coin, grape) {
            grape = Some(separate(c, g));
        }
        if let (Some(s), Some(g)) = (strawberry, grape) {
            grape = Some(separate(s, g));
        }

        Self {
            coin,
            strawberry,
            grape,
        }
    }

    pub fn get(&self, kind: CollectibleKind) -> Option<f32> {
        match kind {
            CollectibleKind::Coin => self.coin,
            CollectibleKind::Strawberry => self.strawberry,
            CollectibleKind::Grape => self.grape,
        }
    }

    /// Placed rewards in placement order
    pub fn placed(&self) -> impl Iterator<Item = (CollectibleKind, f32)> + '_ {
        CollectibleKind::ALL
            .into_iter()
            .filter_map(|kind| self.get(kind).map(|y| (kind, y)))
    }
}

/// Obstacle/collectible generator and owner of in-flight entities
#[derive(Debug, Clone)]
pub struct Spawner {
    field: FieldTuning,
    obstacle_tuning: ObstacleTuning,
    collectible_tuning: CollectibleTuning,
    mode: GameMode,
    gap_height: f32,
    spawn_interval: f64,

    obstacles: Vec<ObstaclePair>,
    collectibles: Vec<Collectible>,
    /// Gap centre of the most recent pair, for the delta limit
    last_gap_center: Option<f32>,
    /// Pending spawn timer and its fire time
    timer: Option<(TimerHandle, f64)>,
    /// Phase captured by `pause`, consumed by `resume`
    time_to_next_spawn: Option<f64>,
    frozen: bool,
    spawned_pairs: u32,
    /// Never reset so ids stay unique across runs
    next_id: EntityId,
}

impl Spawner {
    pub fn new(field: FieldTuning, obstacles: ObstacleTuning, collectibles: CollectibleTuning) -> Self {
        let table = obstacles.for_mode(GameMode::default());
        Self {
            field,
            obstacle_tuning: obstacles,
            collectible_tuning: collectibles,
            mode: GameMode::default(),
            gap_height: table.gap_height,
            spawn_interval: table.spawn_interval,
            obstacles: Vec::new(),
            collectibles: Vec::new(),
            last_gap_center: None,
            timer: None,
            time_to_next_spawn: None,
            frozen: false,
            spawned_pairs: 0,
            next_id: 1,
        }
    }

    /// Select gap height and interval for `mode`. Applies to pairs spawned
    /// from now on.
    pub fn configure(&mut self, mode: GameMode) {
        let table = self.obstacle_tuning.for_mode(mode);
        self.mode = mode;
        self.gap_height = table.gap_height;
        self.spawn_interval = table.spawn_interval;
        log::debug!(
            "Spawner configured for {}: gap {} interval {}s",
            mode.as_str(),
            self.gap_height,
            self.spawn_interval
        );
    }

    /// Spawn a pair immediately and start the repeating cycle
    pub fn start(&mut self, clock: &mut Clock, rng: &mut SimRng, events: &mut Vec<GameEvent>) {
        self.cancel_timer(clock);
        self.time_to_next_spawn = None;
        self.set_frozen(false, events);
        let now = clock.now();
        self.spawn_pair(now, rng, events);
        self.schedule(clock, now + self.spawn_interval);
    }

    /// Start the cycle with the first spawn `delay` seconds from now
    pub fn start_after(&mut self, delay: f64, clock: &mut Clock, events: &mut Vec<GameEvent>) {
        self.cancel_timer(clock);
        self.time_to_next_spawn = None;
        self.set_frozen(false, events);
        self.schedule(clock, clock.now() + delay.max(0.0));
    }

    /// Handle a fired [`TimerTask::Spawn`]: spawn one pair and schedule the next
    pub fn on_spawn_timer(&mut self, clock: &mut Clock, rng: &mut SimRng, events: &mut Vec<GameEvent>) {
        let Some((_, at)) = self.timer.take() else {
            log::debug!("Spawn timer fired with no cycle running");
            return;
        };
        self.spawn_pair(at, rng, events);
        self.schedule(clock, at + self.spawn_interval);
    }

    /// Stop the cycle and freeze motion, remembering how long until the next
    /// spawn would have happened.
    pub fn pause(&mut self, clock: &mut Clock, events: &mut Vec<GameEvent>) {
        if let Some((handle, at)) = self.timer.take() {
            clock.cancel(handle);
            // Fire times are shifted on resume, so this excludes frozen spans
            let remaining = (at - clock.now()).max(0.0);
            log::debug!("Spawner paused, next spawn in {remaining:.3}s");
            self.time_to_next_spawn = Some(remaining);
        }
        self.set_frozen(true, events);
    }

    /// Undo [`pause`](Self::pause). Does not restart a cycle that's already running.
    pub fn resume(&mut self, clock: &mut Clock, events: &mut Vec<GameEvent>) {
        self.set_frozen(false, events);
        if self.timer.is_some() {
            return;
        }
        if let Some(remaining) = self.time_to_next_spawn.take() {
            self.schedule(clock, clock.now() + remaining);
        }
    }

    /// Cancel the cycle and freeze every entity where it is
    pub fn stop_all(&mut self, clock: &mut Clock, events: &mut Vec<GameEvent>) {
        self.cancel_timer(clock);
        self.time_to_next_spawn = None;
        self.set_frozen(true, events);
    }

    /// Destroy every obstacle and collectible
    pub fn remove_all(&mut self, events: &mut Vec<GameEvent>) {
        for pair in self.obstacles.drain(..) {
            events.push(GameEvent::DespawnVisual {
                id: pair.id,
                reason: DespawnReason::Cleared,
            });
        }
        for item in self.collectibles.drain(..) {
            events.push(GameEvent::DespawnVisual {
                id: item.id,
                reason: DespawnReason::Cleared,
            });
        }
    }

    /// Back to a fresh run: no entities, no cycle, no previous gap centre
    pub fn reset(&mut self, clock: &mut Clock, events: &mut Vec<GameEvent>) {
        self.cancel_timer(clock);
        self.time_to_next_spawn = None;
        self.remove_all(events);
        self.last_gap_center = None;
        self.spawned_pairs = 0;
        self.set_frozen(false, events);
    }

    /// Move entities left by `dt` seconds and despawn what left the field
    pub fn advance(&mut self, dt: f64, events: &mut Vec<GameEvent>) {
        if self.frozen || dt <= 0.0 {
            return;
        }
        let dt = dt as f32;
        let despawn_x = self.field.despawn_x();

        for pair in &mut self.obstacles {
            pair.x -= pair.speed * dt;
        }
        for item in &mut self.collectibles {
            item.position.x -= item.speed * dt;
        }

        self.obstacles.retain(|pair| {
            let keep = pair.x > despawn_x;
            if !keep {
                events.push(GameEvent::DespawnVisual {
                    id: pair.id,
                    reason: DespawnReason::Exited,
                });
            }
            keep
        });
        self.collectibles.retain(|item| {
            let keep = item.position.x > despawn_x;
            if !keep {
                events.push(GameEvent::DespawnVisual {
                    id: item.id,
                    reason: DespawnReason::Exited,
                });
            }
            keep
        });
    }

    /// Remove a collectible on pickup. `None` if it was already taken or gone.
    pub fn collect(&mut self, id: EntityId, events: &mut Vec<GameEvent>) -> Option<Collectible> {
        let idx = self.collectibles.iter().position(|c| c.id == id)?;
        let item = self.collectibles.remove(idx);
        events.push(GameEvent::DespawnVisual {
            id,
            reason: DespawnReason::Collected,
        });
        Some(item)
    }

    /// Mark a pair's scoring detector as used. True only the first time.
    pub fn mark_scored(&mut self, obstacle: EntityId) -> bool {
        match self.obstacles.iter_mut().find(|p| p.id == obstacle) {
            Some(pair) if !pair.scored => {
                pair.scored = true;
                true
            }
            _ => false,
        }
    }

    pub fn obstacles(&self) -> &[ObstaclePair] {
        &self.obstacles
    }

    pub fn collectibles(&self) -> &[Collectible] {
        &self.collectibles
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn gap_height(&self) -> f32 {
        self.gap_height
    }

    pub fn spawn_interval(&self) -> f64 {
        self.spawn_interval
    }

    /// Whether a spawn timer is pending
    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Pairs spawned since the last reset
    pub fn spawned_pairs(&self) -> u32 {
        self.spawned_pairs
    }

    pub fn last_gap_center(&self) -> Option<f32> {
        self.last_gap_center
    }

    /// Remaining time captured by the last pause, if not yet resumed
    pub fn time_to_next_spawn(&self) -> Option<f64> {
        self.time_to_next_spawn
    }

    fn spawn_pair(&mut self, now: f64, rng: &mut SimRng, events: &mut Vec<GameEvent>) {
        let range = self.field.height * self.obstacle_tuning.offset_fraction;
        let target = self.field.mid_y() + rng.offset(range);
        let gap_center_y = clamp_delta(self.last_gap_center, target, self.obstacle_tuning.max_delta);
        self.last_gap_center = Some(gap_center_y);
        self.spawned_pairs += 1;

        let speed = self.obstacle_tuning.speed;
        let x = self.field.spawn_x();
        let id = self.alloc_id();
        events.push(GameEvent::SpawnVisual {
            id,
            kind: VisualKind::ObstaclePair {
                gap_center_y,
                gap_height: self.gap_height,
            },
            position: Vec2::new(x, gap_center_y),
            speed,
        });
        self.obstacles.push(ObstaclePair {
            id,
            x,
            gap_center_y,
            gap_height: self.gap_height,
            speed,
            spawn_time: now,
            scored: false,
        });

        let layout = RewardLayout::roll(&self.collectible_tuning, gap_center_y, rng);
        for (kind, y) in layout.placed() {
            let params = *kind.tuning(&self.collectible_tuning);
            let item = Collectible {
                id: self.alloc_id(),
                kind,
                position: Vec2::new(x, y),
                speed: speed * params.speed_multiplier,
                value: params.value,
                obstacle: id,
            };
            events.push(GameEvent::SpawnVisual {
                id: item.id,
                kind: VisualKind::Collectible(kind),
                position: item.position,
                speed: item.speed,
            });
            self.collectibles.push(item);
        }
        log::trace!("Spawned pair {id} at gap {gap_center_y:.1}");
    }

    fn schedule(&mut self, clock: &mut Clock, at: f64) {
        let handle = clock.schedule_at(at, TimerTask::Spawn);
        self.timer = Some((handle, at));
    }

    fn cancel_timer(&mut self, clock: &mut Clock) {
        if let Some((handle, _)) = self.timer.take() {
            clock.cancel(handle);
        }
    }

    fn set_frozen(&mut self, frozen: bool, events: &mut Vec<GameEvent>) {
        if self.frozen != frozen {
            self.frozen = frozen;
            events.push(GameEvent::MotionFrozen(frozen));
        }
    }

    fn alloc_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}
