//! Session state machine
//!
//! A [`Session`] owns one player's play session: phase, running score,
//! spawner, growth, the timer clock and the score store. Every transition
//! checks the current phase before touching anything, so duplicate input
//! (two fatal contacts in one frame, a double tap) is harmless.
//!
//! ```text
//! Welcome --play--> ArmedPause --tap--> Playing <--pause/resume--> Paused
//!                        ^                 |                          |
//!                        |              fatal hit                 start button
//!                        |                 v                          |
//!                        +---restart--- GameOver ---home---> Welcome  |
//!                        +--------------------------------------------+
//! ```

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::clock::{Clock, TimerTask};
use super::events::{CollisionKind, GameEvent, SoundCue, TapRegion};
use super::growth::Growth;
use super::placement::SimRng;
use super::spawner::Spawner;
use crate::highscores::ScoreStore;
use crate::platform;
use crate::settings::{GameMode, Settings};
use crate::tuning::{Tuning, TuningError};

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Mode selection screen
    Welcome,
    /// Game scene shown, waiting for the first tap
    ArmedPause,
    /// Active gameplay
    Playing,
    /// Paused by the player or by losing focus
    Paused,
    /// Run ended
    GameOver,
}

/// One play session
#[derive(Debug)]
pub struct Session {
    tuning: Tuning,
    settings: Settings,
    phase: SessionPhase,
    mode: GameMode,
    clock: Clock,
    rng: SimRng,
    spawner: Spawner,
    growth: Growth,
    scores: ScoreStore,
    score: u32,
    /// Bumped on every reset so timers from an earlier run can tell they're stale
    run: u32,
    game_over_committed: bool,
    restart_prompt_visible: bool,
    new_record: bool,
    events: Vec<GameEvent>,
}

impl Session {
    /// Fails if `tuning` doesn't pass [`Tuning::validate`]
    pub fn new(tuning: Tuning, settings: Settings, scores: ScoreStore, seed: u64) -> Result<Self, TuningError> {
        tuning.validate()?;
        Ok(Self::build(tuning, settings, scores, seed))
    }

    /// Default tuning and settings, scores kept in memory only
    pub fn in_memory(seed: u64) -> Self {
        Self::build(Tuning::default(), Settings::default(), ScoreStore::in_memory(), seed)
    }

    fn build(tuning: Tuning, settings: Settings, scores: ScoreStore, seed: u64) -> Self {
        let spawner = Spawner::new(
            tuning.field.clone(),
            tuning.obstacles.clone(),
            tuning.collectibles.clone(),
        );
        let growth = Growth::new(tuning.growth.clone());
        let mode = settings.preferred_mode;
        log::info!("Session created (seed {seed}, preferred mode {})", mode.as_str());
        Self {
            tuning,
            settings,
            phase: SessionPhase::Welcome,
            mode,
            clock: Clock::new(),
            rng: SimRng::new(seed),
            spawner,
            growth,
            scores,
            score: 0,
            run: 0,
            game_over_committed: false,
            restart_prompt_visible: false,
            new_record: false,
            events: Vec::new(),
        }
    }

    // === Accessors ===

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Points earned in the current run
    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn run(&self) -> u32 {
        self.run
    }

    /// Simulation time in seconds
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn spawner(&self) -> &Spawner {
        &self.spawner
    }

    pub fn growth(&self) -> &Growth {
        &self.growth
    }

    pub fn scores(&self) -> &ScoreStore {
        &self.scores
    }

    pub fn scores_mut(&mut self) -> &mut ScoreStore {
        &mut self.scores
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn is_restart_prompt_visible(&self) -> bool {
        self.restart_prompt_visible
    }

    /// Events produced since the last drain
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn player_name(&self) -> &str {
        self.scores.player_name()
    }

    pub fn set_player_name(&mut self, name: &str) {
        let stored = self.scores.set_player_name(name).to_string();
        log::info!("Player name set to {stored}");
        self.events.push(GameEvent::PlayerNameChanged(stored));
    }

    // === Input ===

    /// Route a tap to the transition it means in the current phase.
    /// Returns true if it did anything.
    pub fn handle_tap(&mut self, region: TapRegion) -> bool {
        match (self.phase, region) {
            (SessionPhase::Welcome, TapRegion::PlayNormal) => self.start(GameMode::Normal),
            (SessionPhase::Welcome, TapRegion::PlayBasic) => self.start(GameMode::Basic),
            (SessionPhase::ArmedPause, _) => self.begin_play(),
            (SessionPhase::Playing, TapRegion::PauseButton) => self.pause(),
            (SessionPhase::Playing, _) => self.flap(),
            (SessionPhase::Paused, TapRegion::ResumeButton) => self.resume(),
            (SessionPhase::Paused, TapRegion::StartButton) => self.return_to_start(),
            (SessionPhase::GameOver, TapRegion::RestartButton) if self.restart_prompt_visible => {
                self.restart()
            }
            (SessionPhase::GameOver, TapRegion::HomeButton) if self.restart_prompt_visible => {
                self.return_to_welcome()
            }
            (phase, region) => {
                log::debug!("Ignoring {region:?} tap in {phase:?}");
                false
            }
        }
    }

    /// React to a contact reported by the physics collaborator. Only
    /// processed while playing.
    pub fn handle_collision(&mut self, kind: CollisionKind) {
        if self.phase != SessionPhase::Playing {
            log::debug!("Ignoring {kind:?} in {:?}", self.phase);
            return;
        }
        match kind {
            CollisionKind::Obstacle | CollisionKind::Boundary => self.game_over(kind),
            CollisionKind::ScoringZone { obstacle } => {
                if self.spawner.mark_scored(obstacle) {
                    self.add_points(1);
                    self.sound(SoundCue::Point);
                }
            }
            CollisionKind::Collectible { id } => {
                let Some(item) = self.spawner.collect(id, &mut self.events) else {
                    log::debug!("Collectible {id} already taken");
                    return;
                };
                log::debug!("Picked up {:?} worth {}", item.kind, item.value);
                self.add_points(item.value);
                self.sound(item.kind.sound());
                if self.growth.on_collectible_picked(item.kind) {
                    self.emit_growth();
                }
            }
        }
    }

    // === Transitions ===

    /// Welcome -> ArmedPause with the chosen mode
    pub fn start(&mut self, mode: GameMode) -> bool {
        if self.phase != SessionPhase::Welcome {
            return false;
        }
        self.mode = mode;
        if self.settings.preferred_mode != mode {
            self.settings.preferred_mode = mode;
            self.settings.save(self.scores.backend_mut());
        }
        self.spawner.configure(mode);
        self.sound(SoundCue::Swoosh);
        self.reset_run();
        self.set_phase(SessionPhase::ArmedPause);
        true
    }

    /// ArmedPause -> Playing. The first pair arrives after a fraction of
    /// the spawn interval.
    pub fn begin_play(&mut self) -> bool {
        if self.phase != SessionPhase::ArmedPause {
            return false;
        }
        let delay = self.spawner.spawn_interval() * self.tuning.obstacles.initial_delay_factor;
        self.spawner.start_after(delay, &mut self.clock, &mut self.events);
        self.sound(SoundCue::Swoosh);
        self.set_phase(SessionPhase::Playing);
        true
    }

    /// Upward impulse on the player
    pub fn flap(&mut self) -> bool {
        if self.phase != SessionPhase::Playing {
            return false;
        }
        self.events.push(GameEvent::Flap {
            impulse: self.tuning.player.flap_impulse,
        });
        self.sound(SoundCue::Wing);
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.phase != SessionPhase::Playing {
            return false;
        }
        self.spawner.pause(&mut self.clock, &mut self.events);
        self.set_phase(SessionPhase::Paused);
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.phase != SessionPhase::Paused {
            return false;
        }
        self.spawner.resume(&mut self.clock, &mut self.events);
        self.set_phase(SessionPhase::Playing);
        true
    }

    /// Host lost focus. Pauses only an active run.
    pub fn suspend(&mut self) -> bool {
        if self.phase == SessionPhase::Playing {
            log::info!("Focus lost, pausing");
            self.pause()
        } else {
            false
        }
    }

    /// Paused -> ArmedPause, abandoning the run without recording it
    pub fn return_to_start(&mut self) -> bool {
        if self.phase != SessionPhase::Paused {
            return false;
        }
        self.sound(SoundCue::Swoosh);
        self.reset_run();
        self.set_phase(SessionPhase::ArmedPause);
        true
    }

    /// GameOver -> ArmedPause
    pub fn restart(&mut self) -> bool {
        if self.phase != SessionPhase::GameOver {
            return false;
        }
        self.sound(SoundCue::Swoosh);
        self.reset_run();
        self.set_phase(SessionPhase::ArmedPause);
        true
    }

    /// GameOver -> Welcome
    pub fn return_to_welcome(&mut self) -> bool {
        if self.phase != SessionPhase::GameOver {
            return false;
        }
        self.sound(SoundCue::Swoosh);
        self.reset_run();
        self.set_phase(SessionPhase::Welcome);
        true
    }

    /// Reveal final and best score. Does nothing if already shown or not
    /// in GameOver.
    pub fn show_restart_prompt(&mut self) -> bool {
        if self.phase != SessionPhase::GameOver || self.restart_prompt_visible {
            return false;
        }
        self.restart_prompt_visible = true;
        self.events.push(GameEvent::RestartPromptShown {
            final_score: self.score,
            high_score: self.scores.high_score(),
        });
        true
    }

    /// Whether the run that just ended set a new best score
    pub fn is_new_record(&self) -> bool {
        self.new_record
    }

    // === Time ===

    /// Move simulation time forward by `dt` seconds, firing due timers in
    /// order. Entities move up to each timer's instant before it fires.
    pub fn advance(&mut self, dt: f64) {
        if !dt.is_finite() {
            log::warn!("Ignoring non-finite time step {dt}");
            return;
        }
        if dt <= 0.0 {
            return;
        }
        let target = self.clock.now() + dt;
        while let Some(at) = self.clock.next_due(target) {
            self.spawner.advance(at - self.clock.now(), &mut self.events);
            match self.clock.pop_due(target) {
                Some((_, task)) => self.fire(task),
                None => break,
            }
        }
        self.spawner.advance(target - self.clock.now(), &mut self.events);
        self.clock.advance_to(target);
    }

    fn fire(&mut self, task: TimerTask) {
        match task {
            TimerTask::Spawn => {
                self.spawner
                    .on_spawn_timer(&mut self.clock, &mut self.rng, &mut self.events);
            }
            TimerTask::RestartFallback { run } => {
                if run == self.run && self.show_restart_prompt() {
                    log::debug!("Restart prompt forced visible by fallback");
                }
            }
            TimerTask::Sound { cue, run } => {
                if run == self.run {
                    self.sound(cue);
                }
            }
        }
    }

    // === Internals ===

    fn game_over(&mut self, cause: CollisionKind) {
        if self.game_over_committed {
            return;
        }
        self.game_over_committed = true;
        log::info!(
            "Game over ({cause:?}) with score {} in {} mode",
            self.score,
            self.mode.as_str()
        );

        self.sound(SoundCue::Hit);
        if cause == CollisionKind::Obstacle {
            self.clock.schedule_in(
                0.0,
                TimerTask::Sound {
                    cue: SoundCue::Die,
                    run: self.run,
                },
            );
        }

        self.spawner.stop_all(&mut self.clock, &mut self.events);

        self.new_record = self.scores.record_game_result(self.score);
        let name = self.scores.player_name().to_string();
        self.scores
            .record_player_score(&name, self.score, self.mode, platform::now_millis());
        if self.new_record {
            self.events.push(GameEvent::NewHighScore(self.score));
        }

        let player = &self.tuning.player;
        self.events.push(GameEvent::TerminalFall {
            impulse: Vec2::new(player.fall_impulse.0, player.fall_impulse.1),
            mass: player.fall_mass,
            angular_velocity: player.fall_angular_velocity,
            linear_damping: player.fall_linear_damping,
        });
        if self.settings.effective_impact_effect() {
            self.events.push(GameEvent::ImpactEffect);
        }

        self.clock.schedule_in(
            self.tuning.session.restart_fallback_delay,
            TimerTask::RestartFallback { run: self.run },
        );
        self.set_phase(SessionPhase::GameOver);
    }

    /// Everything a fresh run needs: no entities, score 0, base growth,
    /// player back at its start position
    fn reset_run(&mut self) {
        self.spawner.reset(&mut self.clock, &mut self.events);
        self.growth.reset();
        self.score = 0;
        self.run += 1;
        self.game_over_committed = false;
        self.restart_prompt_visible = false;
        self.new_record = false;

        let player = &self.tuning.player;
        self.events.push(GameEvent::PlayerReset {
            position: Vec2::new(player.start_x, player.start_y),
            scale: self.growth.current_scale(),
            mass: self.growth.current_mass(),
        });
        self.events.push(GameEvent::ScoreChanged(0));
        self.emit_growth();
    }

    fn add_points(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
        self.events.push(GameEvent::ScoreChanged(self.score));
    }

    fn emit_growth(&mut self) {
        self.events.push(GameEvent::GrowthChanged {
            level: self.growth.level(),
            scale: self.growth.current_scale(),
            mass: self.growth.current_mass(),
            transformed: self.growth.is_transformed(),
        });
    }

    fn sound(&mut self, cue: SoundCue) {
        self.events.push(GameEvent::PlaySound {
            cue,
            volume: self.settings.effective_volume(),
        });
    }

    fn set_phase(&mut self, to: SessionPhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        log::info!("Phase {from:?} -> {to:?}");
        self.phase = to;
        self.events.push(GameEvent::PhaseChanged { from, to });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing_session(seed: u64) -> Session {
        let mut s = Session::in_memory(seed);
        assert!(s.start(GameMode::Normal));
        assert!(s.begin_play());
        s.drain_events();
        s
    }

    #[test]
    fn test_guards_reject_wrong_phase() {
        let mut s = Session::in_memory(1);
        assert!(!s.begin_play());
        assert!(!s.pause());
        assert!(!s.resume());
        assert!(!s.restart());
        assert!(!s.show_restart_prompt());
        assert_eq!(s.phase(), SessionPhase::Welcome);

        assert!(s.start(GameMode::Basic));
        assert!(!s.start(GameMode::Normal));
        assert_eq!(s.mode(), GameMode::Basic);
        assert_eq!(s.spawner().gap_height(), 300.0);
    }

    #[test]
    fn test_double_fatal_commits_once() {
        let mut s = playing_session(2);
        s.handle_collision(CollisionKind::Obstacle);
        s.handle_collision(CollisionKind::Boundary);
        s.advance(0.1);

        assert_eq!(s.phase(), SessionPhase::GameOver);
        assert_eq!(s.scores().total_games_played(), 1);
        assert_eq!(s.scores().records().len(), 1);

        let events = s.drain_events();
        let count = |pred: &dyn Fn(&GameEvent) -> bool| events.iter().filter(|e| pred(*e)).count();
        assert_eq!(
            count(&|e| matches!(e, GameEvent::PhaseChanged { to: SessionPhase::GameOver, .. })),
            1
        );
        assert_eq!(count(&|e| matches!(e, GameEvent::TerminalFall { .. })), 1);
        assert_eq!(
            count(&|e| matches!(e, GameEvent::PlaySound { cue: SoundCue::Hit, .. })),
            1
        );
        assert_eq!(
            count(&|e| matches!(e, GameEvent::PlaySound { cue: SoundCue::Die, .. })),
            1
        );
    }

    #[test]
    fn test_boundary_hit_has_no_die_cue() {
        let mut s = playing_session(3);
        s.handle_collision(CollisionKind::Boundary);
        s.advance(0.1);
        assert!(!s
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::PlaySound { cue: SoundCue::Die, .. })));
    }

    #[test]
    fn test_die_cue_dropped_after_quick_restart() {
        let mut s = playing_session(11);
        s.handle_collision(CollisionKind::Obstacle);
        assert!(s.show_restart_prompt());
        assert!(s.restart());
        s.drain_events();

        s.advance(0.1);
        assert!(!s
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::PlaySound { cue: SoundCue::Die, .. })));
    }

    #[test]
    fn test_invalid_tuning_rejected() {
        let mut tuning = Tuning::default();
        tuning.obstacles.normal.spawn_interval = 0.0;
        let result = Session::new(tuning, Settings::default(), ScoreStore::in_memory(), 12);
        assert!(matches!(result, Err(TuningError::Invalid(_))));
    }

    #[test]
    fn test_non_finite_step_ignored() {
        let mut s = playing_session(13);
        let now = s.now();
        s.advance(f64::INFINITY);
        s.advance(f64::NAN);
        assert_eq!(s.now(), now);
        assert_eq!(s.spawner().spawned_pairs(), 0);

        s.advance(1.0);
        assert_eq!(s.spawner().spawned_pairs(), 1);
    }

    #[test]
    fn test_chosen_mode_is_saved() {
        let mut s = Session::in_memory(14);
        assert!(s.start(GameMode::Basic));
        let saved = Settings::load(s.scores_mut().backend_mut());
        assert_eq!(saved.preferred_mode, GameMode::Basic);
    }

    #[test]
    fn test_reduced_motion_skips_impact() {
        let settings = Settings {
            reduced_motion: true,
            ..Default::default()
        };
        let mut s = Session::new(Tuning::default(), settings, ScoreStore::in_memory(), 4).unwrap();
        s.start(GameMode::Normal);
        s.begin_play();
        s.handle_collision(CollisionKind::Obstacle);
        assert!(!s.events().contains(&GameEvent::ImpactEffect));
    }

    #[test]
    fn test_new_record_reported() {
        let mut s = playing_session(5);
        s.advance(1.0);
        let pair = s.spawner().obstacles()[0].id;
        s.handle_collision(CollisionKind::ScoringZone { obstacle: pair });
        s.handle_collision(CollisionKind::Obstacle);
        assert!(s.is_new_record());
        assert!(s.events().contains(&GameEvent::NewHighScore(1)));
        assert_eq!(s.scores().high_score(), 1);
    }

    #[test]
    fn test_reset_clears_run_state() {
        let mut s = playing_session(6);
        s.advance(3.0);
        let pair = s.spawner().obstacles()[0].id;
        s.handle_collision(CollisionKind::ScoringZone { obstacle: pair });
        s.handle_collision(CollisionKind::Obstacle);
        assert!(s.show_restart_prompt());
        assert!(s.restart());

        assert_eq!(s.phase(), SessionPhase::ArmedPause);
        assert_eq!(s.score(), 0);
        assert!(s.spawner().obstacles().is_empty());
        assert!(s.spawner().collectibles().is_empty());
        assert_eq!(s.spawner().last_gap_center(), None);
        assert_eq!(s.growth().level(), 0);
        assert!(!s.is_restart_prompt_visible());
        assert!(s.events().iter().any(|e| matches!(e, GameEvent::PlayerReset { .. })));
    }

    #[test]
    fn test_set_player_name() {
        let mut s = Session::in_memory(7);
        s.set_player_name("  Lu ");
        assert_eq!(s.player_name(), "Lu");
        s.set_player_name("");
        assert_eq!(s.player_name(), "Jugador");
        assert!(s.events().contains(&GameEvent::PlayerNameChanged("Jugador".into())));
    }

    #[test]
    fn test_sound_volume_follows_settings() {
        let mut s = Session::in_memory(8);
        s.settings_mut().muted = true;
        s.start(GameMode::Normal);
        assert!(s
            .events()
            .iter()
            .all(|e| !matches!(e, GameEvent::PlaySound { volume, .. } if *volume > 0.0)));
    }
}
