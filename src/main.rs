//! Fluttor entry point
//!
//! The browser build is driven from JavaScript through `platform::WebGame`.
//! Natively this runs a headless autoplay: a scripted pilot stands in for the
//! physics world, reports contacts to the session, and the resulting
//! leaderboard is printed.

#[cfg(not(target_arch = "wasm32"))]
mod autoplay {
    use std::collections::HashSet;

    use anyhow::{Context, Result, bail};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use fluttor::consts::SIM_DT;
    use fluttor::highscores::{DEFAULT_LIST_LEN, format_date};
    use fluttor::platform;
    use fluttor::sim::{CollisionKind, Session, SessionPhase, TapRegion, TickInput, tick};
    use fluttor::{EntityId, GameMode, ScoreStore, Settings, Tuning};

    /// Longest a single autoplay run may last (simulated seconds)
    const MAX_RUN_SECONDS: f64 = 180.0;

    #[derive(Debug)]
    pub struct Args {
        runs: u32,
        seed: u64,
        mode: Option<GameMode>,
        player: Option<String>,
        tuning: Option<String>,
        ephemeral: bool,
    }

    impl Args {
        pub fn parse() -> Result<Self> {
            let mut args = Args {
                runs: 5,
                seed: platform::time_seed(),
                mode: None,
                player: None,
                tuning: None,
                ephemeral: false,
            };
            let mut it = std::env::args().skip(1);
            while let Some(flag) = it.next() {
                let mut value = || it.next().with_context(|| format!("{flag} needs a value"));
                match flag.as_str() {
                    "--runs" => args.runs = value()?.parse().context("--runs must be a number")?,
                    "--seed" => args.seed = value()?.parse().context("--seed must be a number")?,
                    "--mode" => {
                        let raw = value()?;
                        args.mode = Some(
                            GameMode::from_str(&raw).with_context(|| format!("unknown mode {raw}"))?,
                        );
                    }
                    "--player" => args.player = Some(value()?),
                    "--tuning" => args.tuning = Some(value()?),
                    "--ephemeral" => args.ephemeral = true,
                    "--help" | "-h" => {
                        println!(
                            "usage: fluttor [--runs N] [--seed S] [--mode normal|basic] \
                             [--player NAME] [--tuning FILE] [--ephemeral]"
                        );
                        std::process::exit(0);
                    }
                    other => bail!("unknown argument {other}"),
                }
            }
            Ok(args)
        }
    }

    /// Scripted stand-in for the physics world. Gets worse the longer a run
    /// goes so runs end.
    struct Pilot {
        rng: Pcg32,
        player_x: f32,
        handled: HashSet<EntityId>,
        since_flap: f64,
    }

    impl Pilot {
        fn new(seed: u64, player_x: f32) -> Self {
            Self {
                rng: Pcg32::seed_from_u64(seed ^ 0x5eed),
                player_x,
                handled: HashSet::new(),
                since_flap: 0.0,
            }
        }

        /// Contacts and taps for the next frame
        fn input(&mut self, session: &Session) -> TickInput {
            let mut input = TickInput::default();
            if session.phase() != SessionPhase::Playing {
                return input;
            }

            self.since_flap += SIM_DT;
            if self.since_flap >= 0.45 {
                self.since_flap = 0.0;
                input.taps.push(TapRegion::Field);
            }

            let skill = (0.97 - 0.015 * session.score() as f64).max(0.5);
            for pair in session.spawner().obstacles() {
                if pair.x <= self.player_x && self.handled.insert(pair.id) {
                    if self.rng.random_bool(skill) {
                        input.collisions.push(CollisionKind::ScoringZone { obstacle: pair.id });
                    } else {
                        input.collisions.push(CollisionKind::Obstacle);
                    }
                }
            }
            for item in session.spawner().collectibles() {
                if item.position.x <= self.player_x && self.handled.insert(item.id) && self.rng.random_bool(0.5) {
                    input.collisions.push(CollisionKind::Collectible { id: item.id });
                }
            }
            input
        }
    }

    fn load_tuning(path: Option<&str>) -> Result<Tuning> {
        let Some(path) = path else {
            return Ok(Tuning::default());
        };
        let json = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        Tuning::from_json(&json).with_context(|| format!("parsing {path}"))
    }

    /// Play one run from ArmedPause to the restart prompt. Returns the score.
    fn play_run(session: &mut Session, pilot: &mut Pilot) -> u32 {
        tick(
            session,
            &TickInput {
                taps: vec![TapRegion::Field],
                ..Default::default()
            },
            SIM_DT,
        );

        let start = session.now();
        while session.phase() == SessionPhase::Playing {
            let mut input = pilot.input(session);
            if session.now() - start > MAX_RUN_SECONDS {
                input.collisions.push(CollisionKind::Boundary);
            }
            tick(session, &input, SIM_DT);
        }

        // Let the game-over flow bring the prompt up on its own
        while !session.is_restart_prompt_visible() {
            tick(session, &TickInput::default(), SIM_DT);
        }
        log::debug!("{} events this run", session.drain_events().len());
        session.score()
    }

    pub fn run() -> Result<()> {
        let args = Args::parse()?;
        let tuning = load_tuning(args.tuning.as_deref())?;

        let (settings, scores) = if args.ephemeral {
            (Settings::default(), ScoreStore::in_memory())
        } else {
            let store = platform::default_store();
            (Settings::load(store.as_ref()), ScoreStore::load(store))
        };
        let mode = args.mode.unwrap_or(settings.preferred_mode);

        let player_x = tuning.player.start_x;
        let mut session = Session::new(tuning, settings, scores, args.seed)?;
        if let Some(name) = &args.player {
            session.set_player_name(name);
        }
        let mut pilot = Pilot::new(args.seed, player_x);

        log::info!(
            "Autoplay: {} runs of {} mode as {} (seed {})",
            args.runs,
            mode.display_name(),
            session.player_name(),
            args.seed
        );

        let region = match mode {
            GameMode::Normal => TapRegion::PlayNormal,
            GameMode::Basic => TapRegion::PlayBasic,
        };
        tick(
            &mut session,
            &TickInput {
                taps: vec![region],
                ..Default::default()
            },
            SIM_DT,
        );

        for i in 1..=args.runs {
            let score = play_run(&mut session, &mut pilot);
            let flag = if session.is_new_record() { "  new best!" } else { "" };
            println!("run {i:>3}: {score:>4} points{flag}");
            let next = if i == args.runs {
                TapRegion::HomeButton
            } else {
                TapRegion::RestartButton
            };
            tick(
                &mut session,
                &TickInput {
                    taps: vec![next],
                    ..Default::default()
                },
                SIM_DT,
            );
        }

        print_summary(&session);
        Ok(())
    }

    fn print_summary(session: &Session) {
        let scores = session.scores();
        let now = platform::now_millis();
        println!();
        println!(
            "best {}  games {}  average {:.1}",
            scores.high_score(),
            scores.total_games_played(),
            scores.average_score()
        );

        println!();
        println!("Leaderboard");
        for entry in scores.global_leaderboard(DEFAULT_LIST_LEN) {
            println!(
                "{:>2}. {:<16} {:>4}  {:<6} {}",
                entry.rank,
                entry.player_name,
                entry.score,
                entry.mode,
                format_date(entry.timestamp, now)
            );
        }

        let name = session.player_name();
        println!();
        println!("Recent for {name}");
        for record in scores.player_recent_scores(name, DEFAULT_LIST_LEN) {
            println!("    {:>4}  {}", record.score, format_date(record.timestamp, now));
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    env_logger::init();
    log::info!("Fluttor (native) starting...");
    autoplay::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::web::wasm_start, this is just to satisfy the compiler
}
