//! Per-frame simulation entry point
//!
//! Hosts collect the frame's contacts and taps into a [`TickInput`] and hand
//! it to [`tick`] together with the elapsed time. [`FixedStep`] wraps that in
//! a fixed-timestep accumulator for hosts with jittery frame times.

use super::events::{CollisionKind, TapRegion};
use super::state::Session;
use crate::consts::{MAX_SUBSTEPS, SIM_DT};

/// Input gathered during one frame
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Regions tapped, in order
    pub taps: Vec<TapRegion>,
    /// Contacts reported by the physics world, in order
    pub collisions: Vec<CollisionKind>,
    /// Host window lost focus or was hidden
    pub focus_lost: bool,
}

impl TickInput {
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty() && self.collisions.is_empty() && !self.focus_lost
    }
}

/// Apply one frame of input, then advance time by `dt` seconds.
///
/// Contacts are handled before taps since they happened during the
/// previous physics step.
pub fn tick(session: &mut Session, input: &TickInput, dt: f64) {
    if input.focus_lost {
        session.suspend();
    }
    for &kind in &input.collisions {
        session.handle_collision(kind);
    }
    for &region in &input.taps {
        session.handle_tap(region);
    }
    session.advance(dt);
}

/// Fixed-timestep accumulator
#[derive(Debug, Clone, Default)]
pub struct FixedStep {
    accumulator: f64,
}

impl FixedStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run as many [`SIM_DT`] ticks as `frame_dt` covers, capped at
    /// [`MAX_SUBSTEPS`]. Input is consumed by the first substep. Returns the
    /// number of substeps run.
    pub fn run(&mut self, session: &mut Session, input: &mut TickInput, frame_dt: f64) -> u32 {
        if !frame_dt.is_finite() {
            log::warn!("Ignoring non-finite frame time {frame_dt}");
            return 0;
        }
        self.accumulator += frame_dt.clamp(0.0, 0.1);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            tick(session, input, SIM_DT);
            *input = TickInput::default();
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        if substeps == MAX_SUBSTEPS {
            // Drop the backlog instead of spiralling
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        substeps
    }

    /// Forget leftover time (after a long pause or tab switch)
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::GameMode;
    use crate::sim::{GameEvent, SessionPhase, SoundCue};

    fn taps(regions: &[TapRegion]) -> TickInput {
        TickInput {
            taps: regions.to_vec(),
            ..Default::default()
        }
    }

    fn hit(kind: CollisionKind) -> TickInput {
        TickInput {
            collisions: vec![kind],
            ..Default::default()
        }
    }

    /// Welcome -> ArmedPause -> Playing in normal mode
    fn playing(seed: u64) -> Session {
        let mut session = Session::in_memory(seed);
        tick(&mut session, &taps(&[TapRegion::PlayNormal]), SIM_DT);
        assert_eq!(session.phase(), SessionPhase::ArmedPause);
        tick(&mut session, &taps(&[TapRegion::Field]), 0.0);
        assert_eq!(session.phase(), SessionPhase::Playing);
        session.drain_events();
        session
    }

    fn run_for(session: &mut Session, seconds: f64) {
        let steps = (seconds / SIM_DT).round() as u32;
        let input = TickInput::default();
        for _ in 0..steps {
            tick(session, &input, SIM_DT);
        }
    }

    #[test]
    fn test_tick_welcome_to_playing() {
        let mut session = Session::in_memory(12345);
        assert_eq!(session.phase(), SessionPhase::Welcome);

        // Field taps do nothing on the welcome screen
        tick(&mut session, &taps(&[TapRegion::Field]), SIM_DT);
        assert_eq!(session.phase(), SessionPhase::Welcome);

        tick(&mut session, &taps(&[TapRegion::PlayBasic]), SIM_DT);
        assert_eq!(session.phase(), SessionPhase::ArmedPause);
        assert_eq!(session.mode(), GameMode::Basic);

        // Nothing spawns while armed
        run_for(&mut session, 5.0);
        assert_eq!(session.spawner().spawned_pairs(), 0);

        tick(&mut session, &taps(&[TapRegion::Field]), SIM_DT);
        assert_eq!(session.phase(), SessionPhase::Playing);
    }

    #[test]
    fn test_ten_seconds_spawns_six_pairs() {
        let mut session = playing(42);
        run_for(&mut session, 10.0);
        // First pair after 0.4 * 1.8 s, then every 1.8 s
        assert_eq!(session.spawner().spawned_pairs(), 6);
        assert_eq!(session.score(), 0);
        assert!(!session
            .events()
            .iter()
            .any(|e| matches!(e, GameEvent::ScoreChanged(_))));
    }

    #[test]
    fn test_field_tap_flaps() {
        let mut session = playing(1);
        tick(&mut session, &taps(&[TapRegion::Field]), SIM_DT);
        let events = session.drain_events();
        assert!(events.contains(&GameEvent::Flap { impulse: 62.0 }));
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::PlaySound { cue: SoundCue::Wing, .. })));
    }

    #[test]
    fn test_pause_resume_keeps_spawn_phase() {
        let mut session = playing(7);
        // First spawn at 0.72, next due at 2.52
        run_for(&mut session, 1.5);
        tick(&mut session, &taps(&[TapRegion::PauseButton]), 0.0);
        assert_eq!(session.phase(), SessionPhase::Paused);
        let remaining = session.spawner().time_to_next_spawn().unwrap();
        assert!((remaining - 1.02).abs() < 1e-6);

        let frozen: Vec<f32> = session.spawner().obstacles().iter().map(|p| p.x).collect();
        run_for(&mut session, 20.0);
        let still: Vec<f32> = session.spawner().obstacles().iter().map(|p| p.x).collect();
        assert_eq!(frozen, still);
        assert_eq!(session.spawner().spawned_pairs(), 1);

        tick(&mut session, &taps(&[TapRegion::ResumeButton]), 0.0);
        assert_eq!(session.phase(), SessionPhase::Playing);
        run_for(&mut session, 1.0);
        assert_eq!(session.spawner().spawned_pairs(), 1);
        run_for(&mut session, 0.05);
        assert_eq!(session.spawner().spawned_pairs(), 2);
    }

    #[test]
    fn test_focus_loss_pauses_only_when_playing() {
        let mut session = Session::in_memory(3);
        let lost = TickInput {
            focus_lost: true,
            ..Default::default()
        };
        tick(&mut session, &lost, SIM_DT);
        assert_eq!(session.phase(), SessionPhase::Welcome);

        let mut session = playing(3);
        tick(&mut session, &lost, SIM_DT);
        assert_eq!(session.phase(), SessionPhase::Paused);
        tick(&mut session, &lost, SIM_DT);
        assert_eq!(session.phase(), SessionPhase::Paused);
    }

    #[test]
    fn test_start_button_from_pause_rearms() {
        let mut session = playing(4);
        run_for(&mut session, 3.0);
        tick(&mut session, &taps(&[TapRegion::PauseButton]), 0.0);
        tick(&mut session, &taps(&[TapRegion::StartButton]), 0.0);

        assert_eq!(session.phase(), SessionPhase::ArmedPause);
        assert!(session.spawner().obstacles().is_empty());
        assert_eq!(session.score(), 0);
        // Abandoned runs are not recorded
        assert_eq!(session.scores().total_games_played(), 0);
    }

    #[test]
    fn test_scoring_zone_pays_once_and_only_while_playing() {
        let mut session = playing(5);
        run_for(&mut session, 1.0);
        let pair = session.spawner().obstacles()[0].id;
        let zone = CollisionKind::ScoringZone { obstacle: pair };

        tick(&mut session, &hit(zone), SIM_DT);
        tick(&mut session, &hit(zone), SIM_DT);
        assert_eq!(session.score(), 1);

        tick(&mut session, &taps(&[TapRegion::PauseButton]), 0.0);
        let second = session.spawner().obstacles().last().map(|p| p.id);
        if let Some(id) = second {
            tick(&mut session, &hit(CollisionKind::ScoringZone { obstacle: id }), SIM_DT);
        }
        assert_eq!(session.score(), 1);
    }

    #[test]
    fn test_collectible_pickup_once_with_growth() {
        let mut session = playing(6);
        let mut waited = 0.0;
        while session.spawner().collectibles().is_empty() && waited < 30.0 {
            run_for(&mut session, 0.5);
            waited += 0.5;
        }
        let item = session.spawner().collectibles()[0].clone();

        tick(&mut session, &hit(CollisionKind::Collectible { id: item.id }), SIM_DT);
        tick(&mut session, &hit(CollisionKind::Collectible { id: item.id }), SIM_DT);
        assert_eq!(session.score(), item.value);

        let expected_level = u32::from(item.kind == crate::sim::CollectibleKind::Strawberry);
        assert_eq!(session.growth().level(), expected_level);
        assert_eq!(
            session.growth().is_transformed(),
            item.kind != crate::sim::CollectibleKind::Coin
        );
    }

    #[test]
    fn test_game_over_fallback_shows_prompt() {
        let mut session = playing(8);
        run_for(&mut session, 2.0);
        tick(&mut session, &hit(CollisionKind::Obstacle), 0.0);
        assert_eq!(session.phase(), SessionPhase::GameOver);

        // Restart is ignored until the prompt is up
        tick(&mut session, &taps(&[TapRegion::RestartButton]), 0.0);
        assert_eq!(session.phase(), SessionPhase::GameOver);

        run_for(&mut session, 1.4);
        assert!(!session.is_restart_prompt_visible());
        run_for(&mut session, 0.2);
        assert!(session.is_restart_prompt_visible());
        let shown = session
            .drain_events()
            .iter()
            .filter(|e| matches!(e, GameEvent::RestartPromptShown { .. }))
            .count();
        assert_eq!(shown, 1);

        tick(&mut session, &taps(&[TapRegion::RestartButton]), 0.0);
        assert_eq!(session.phase(), SessionPhase::ArmedPause);
    }

    #[test]
    fn test_stale_fallback_ignored_after_restart() {
        let mut session = playing(9);
        tick(&mut session, &hit(CollisionKind::Boundary), 0.0);
        assert!(session.show_restart_prompt());
        tick(&mut session, &taps(&[TapRegion::RestartButton]), 0.0);
        tick(&mut session, &taps(&[TapRegion::Field]), 0.0);
        run_for(&mut session, 0.5);
        tick(&mut session, &hit(CollisionKind::Obstacle), 0.0);

        // First run's fallback comes due at 1.5 s, this run's at 2.0 s
        run_for(&mut session, 1.1);
        assert!(!session.is_restart_prompt_visible());
        run_for(&mut session, 0.5);
        assert!(session.is_restart_prompt_visible());
    }

    #[test]
    fn test_home_returns_to_welcome() {
        let mut session = playing(10);
        tick(&mut session, &hit(CollisionKind::Obstacle), 0.0);
        session.show_restart_prompt();
        tick(&mut session, &taps(&[TapRegion::HomeButton]), 0.0);
        assert_eq!(session.phase(), SessionPhase::Welcome);
        assert!(session.spawner().obstacles().is_empty());
    }

    #[test]
    fn test_fixed_step_substeps() {
        let mut session = playing(11);
        let mut stepper = FixedStep::new();
        let mut input = taps(&[TapRegion::Field]);

        let n = stepper.run(&mut session, &mut input, SIM_DT * 3.5);
        assert_eq!(n, 3);
        assert!(input.is_empty());
        let flaps = session
            .drain_events()
            .iter()
            .filter(|e| matches!(e, GameEvent::Flap { .. }))
            .count();
        assert_eq!(flaps, 1);

        // Long frames are clamped to 0.1 s: 0.5 + 6 steps of backlog
        let n = stepper.run(&mut session, &mut TickInput::default(), 5.0);
        assert_eq!(n, 6);
        assert!(n <= MAX_SUBSTEPS);
    }

    #[test]
    fn test_fixed_step_skips_bad_frames() {
        let mut session = playing(12);
        let mut stepper = FixedStep::new();
        let mut input = taps(&[TapRegion::Field]);

        assert_eq!(stepper.run(&mut session, &mut input, f64::NAN), 0);
        assert_eq!(stepper.run(&mut session, &mut input, f64::INFINITY), 0);
        // Input waits for the next real frame
        assert!(!input.is_empty());

        assert_eq!(stepper.run(&mut session, &mut input, SIM_DT * 2.5), 2);
        assert!(input.is_empty());
    }
}
