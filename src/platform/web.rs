//! Browser entry point and JS-facing game handle
//!
//! The page owns rendering, audio and physics. Each animation frame it
//! forwards taps and contacts, calls [`WebGame::frame`], then applies the
//! JSON events from [`WebGame::drain_events`].

use wasm_bindgen::prelude::*;

use crate::highscores::{ScoreStore, format_date};
use crate::persistence::LocalStore;
use crate::settings::{GameMode, Settings};
use crate::sim::{CollisionKind, FixedStep, Session, TapRegion, TickInput};
use crate::tuning::Tuning;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger already initialised".into());
    }
    log::info!("Fluttor starting...");
}

/// Game instance handed to JavaScript
#[wasm_bindgen]
pub struct WebGame {
    session: Session,
    stepper: FixedStep,
    input: TickInput,
}

#[wasm_bindgen]
impl WebGame {
    /// Create a session backed by LocalStorage. `tuning_json` may override
    /// any part of the default balance.
    #[wasm_bindgen(constructor)]
    pub fn new(tuning_json: Option<String>) -> Result<WebGame, JsValue> {
        let tuning = match tuning_json {
            Some(json) => Tuning::from_json(&json).map_err(|e| JsValue::from_str(&e.to_string()))?,
            None => Tuning::default(),
        };
        let settings = Settings::load(&LocalStore::new());
        let scores = ScoreStore::load(super::default_store());
        let session = Session::new(tuning, settings, scores, super::time_seed())
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WebGame {
            session,
            stepper: FixedStep::new(),
            input: TickInput::default(),
        })
    }

    /// Queue a tap on a named region (`field`, `pause`, `resume`, `start`,
    /// `restart`, `home`, `play_normal`, `play_basic`)
    pub fn tap(&mut self, region: &str) -> bool {
        match TapRegion::from_str(region) {
            Some(region) => {
                self.input.taps.push(region);
                true
            }
            None => {
                log::warn!("Unknown tap region {region}");
                false
            }
        }
    }

    /// Queue a raw physics contact given both bodies' category masks
    pub fn contact(&mut self, category_a: u32, category_b: u32, other_id: u32) {
        if let Some(kind) = CollisionKind::from_categories(category_a, category_b, other_id) {
            self.input.collisions.push(kind);
        }
    }

    /// Page hidden or window blurred
    pub fn focus_lost(&mut self) {
        self.input.focus_lost = true;
    }

    /// Advance by the frame's elapsed seconds. Returns substeps run.
    pub fn frame(&mut self, dt: f64) -> u32 {
        self.stepper.run(&mut self.session, &mut self.input, dt)
    }

    /// Pending events as a JSON array
    pub fn drain_events(&mut self) -> String {
        let events = self.session.drain_events();
        serde_json::to_string(&events).unwrap_or_else(|e| {
            log::warn!("Failed to encode {} events: {e}", events.len());
            "[]".to_string()
        })
    }

    pub fn phase(&self) -> String {
        format!("{:?}", self.session.phase())
    }

    pub fn score(&self) -> u32 {
        self.session.score()
    }

    pub fn high_score(&self) -> u32 {
        self.session.scores().high_score()
    }

    pub fn player_name(&self) -> String {
        self.session.player_name().to_string()
    }

    pub fn set_player_name(&mut self, name: &str) {
        self.session.set_player_name(name);
    }

    /// Persist the preferred mode and audio/motion preferences
    pub fn set_preferences(&mut self, mode: &str, volume: f32, muted: bool, reduced_motion: bool) {
        let settings = self.session.settings_mut();
        if let Some(mode) = GameMode::from_str(mode) {
            settings.preferred_mode = mode;
        }
        settings.set_master_volume(volume);
        settings.muted = muted;
        settings.reduced_motion = reduced_motion;
        settings.save(&mut LocalStore::new());
    }

    /// Leaderboard rows with display dates, as JSON
    pub fn leaderboard(&self, top_n: usize) -> String {
        let now = super::now_millis();
        let rows: Vec<serde_json::Value> = self
            .session
            .scores()
            .global_leaderboard(top_n)
            .into_iter()
            .map(|e| {
                serde_json::json!({
                    "rank": e.rank,
                    "playerName": e.player_name,
                    "score": e.score,
                    "mode": e.mode,
                    "when": format_date(e.timestamp, now),
                })
            })
            .collect();
        serde_json::Value::Array(rows).to_string()
    }
}
