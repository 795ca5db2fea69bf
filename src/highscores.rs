//! Score counters and per-player leaderboard
//!
//! Durable counters (best score, games played, score total) plus a capped
//! log of timestamped per-player results. Every mutation writes through to
//! the backing [`KeyValueStore`]; failed writes are logged and the in-memory
//! values stay authoritative.

use std::fmt;

use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_PLAYER_NAME;
use crate::persistence::{self, KeyValueStore, MemoryStore};
use crate::settings::GameMode;

/// Maximum number of per-player records kept (oldest evicted first)
pub const MAX_PLAYER_SCORES: usize = 100;

/// Default row count for recent/top/leaderboard queries
pub const DEFAULT_LIST_LEN: usize = 5;

const HIGH_SCORE_KEY: &str = "highScore";
const TOTAL_GAMES_KEY: &str = "totalGamesPlayed";
const TOTAL_SCORE_KEY: &str = "totalScore";
const PLAYER_SCORES_KEY: &str = "playerScores";
const PLAYER_NAME_KEY: &str = "playerName";

/// One finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    #[serde(rename = "playerName")]
    pub player_name: String,
    pub score: u32,
    /// Unix timestamp (ms) the run ended
    #[serde(rename = "date")]
    pub timestamp: f64,
    /// Mode label (`GameMode::as_str`)
    pub mode: String,
}

/// A player's best run, ranked against everyone else's
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-indexed
    pub rank: usize,
    pub player_name: String,
    pub score: u32,
    pub timestamp: f64,
    pub mode: String,
}

/// Persistent score counters and record log
pub struct ScoreStore {
    backend: Box<dyn KeyValueStore>,
    high_score: u32,
    total_games_played: u32,
    total_score: u64,
    records: Vec<ScoreRecord>,
    player_name: String,
}

impl fmt::Debug for ScoreStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoreStore")
            .field("high_score", &self.high_score)
            .field("total_games_played", &self.total_games_played)
            .field("total_score", &self.total_score)
            .field("records", &self.records.len())
            .field("player_name", &self.player_name)
            .finish_non_exhaustive()
    }
}

impl ScoreStore {
    /// Load everything from `backend`. Missing or unreadable keys start at
    /// zero (or the default player name).
    pub fn load(backend: Box<dyn KeyValueStore>) -> Self {
        let high_score = load_or_default(backend.as_ref(), HIGH_SCORE_KEY);
        let total_games_played = load_or_default(backend.as_ref(), TOTAL_GAMES_KEY);
        let total_score = load_or_default(backend.as_ref(), TOTAL_SCORE_KEY);
        let mut records: Vec<ScoreRecord> = load_or_default(backend.as_ref(), PLAYER_SCORES_KEY);
        if records.len() > MAX_PLAYER_SCORES {
            let excess = records.len() - MAX_PLAYER_SCORES;
            records.drain(..excess);
        }
        let player_name: String = load_or_default(backend.as_ref(), PLAYER_NAME_KEY);

        log::info!(
            "Loaded scores: best {high_score}, {total_games_played} games, {} records",
            records.len()
        );
        Self {
            backend,
            high_score,
            total_games_played,
            total_score,
            records,
            player_name: normalize_name(&player_name),
        }
    }

    /// Fresh store that forgets everything when dropped
    pub fn in_memory() -> Self {
        Self::load(Box::new(MemoryStore::new()))
    }

    /// The storage backend, shared with other persisted state
    pub fn backend_mut(&mut self) -> &mut dyn KeyValueStore {
        self.backend.as_mut()
    }

    /// Give back the storage backend (e.g. to reload it)
    pub fn into_backend(self) -> Box<dyn KeyValueStore> {
        self.backend
    }

    /// Count a finished game. Returns true if `score` beat the best score.
    pub fn record_game_result(&mut self, score: u32) -> bool {
        self.total_games_played = self.total_games_played.saturating_add(1);
        self.total_score = self.total_score.saturating_add(score as u64);
        let new_record = score > self.high_score;
        if new_record {
            log::info!("New high score: {score} (was {})", self.high_score);
            self.high_score = score;
            persist(self.backend.as_mut(), HIGH_SCORE_KEY, &self.high_score);
        }
        persist(self.backend.as_mut(), TOTAL_GAMES_KEY, &self.total_games_played);
        persist(self.backend.as_mut(), TOTAL_SCORE_KEY, &self.total_score);
        new_record
    }

    /// Append a timestamped record, evicting the oldest past the cap
    pub fn record_player_score(&mut self, player_name: &str, score: u32, mode: GameMode, timestamp: f64) {
        self.records.push(ScoreRecord {
            player_name: normalize_name(player_name),
            score,
            timestamp,
            mode: mode.as_str().to_string(),
        });
        if self.records.len() > MAX_PLAYER_SCORES {
            let excess = self.records.len() - MAX_PLAYER_SCORES;
            self.records.drain(..excess);
        }
        persist(self.backend.as_mut(), PLAYER_SCORES_KEY, &self.records);
    }

    /// Best recorded score for one player (0 if none)
    pub fn player_high_score(&self, player_name: &str) -> u32 {
        self.records_for(player_name)
            .map(|r| r.score)
            .max()
            .unwrap_or(0)
    }

    /// Most recent first
    pub fn player_recent_scores(&self, player_name: &str, n: usize) -> Vec<ScoreRecord> {
        self.records_for(player_name).rev().take(n).cloned().collect()
    }

    /// Highest first; equal scores keep insertion order
    pub fn player_top_scores(&self, player_name: &str, n: usize) -> Vec<ScoreRecord> {
        let mut scores: Vec<ScoreRecord> = self.records_for(player_name).cloned().collect();
        scores.sort_by(|a, b| b.score.cmp(&a.score));
        scores.truncate(n);
        scores
    }

    /// Each player's best run, highest first, at most `top_n` rows
    pub fn global_leaderboard(&self, top_n: usize) -> Vec<LeaderboardEntry> {
        let mut best: Vec<&ScoreRecord> = Vec::new();
        for record in &self.records {
            match best.iter_mut().find(|b| b.player_name == record.player_name) {
                Some(slot) if record.score > slot.score => *slot = record,
                Some(_) => {}
                None => best.push(record),
            }
        }
        best.sort_by(|a, b| b.score.cmp(&a.score));
        best.into_iter()
            .take(top_n)
            .enumerate()
            .map(|(i, r)| LeaderboardEntry {
                rank: i + 1,
                player_name: r.player_name.clone(),
                score: r.score,
                timestamp: r.timestamp,
                mode: r.mode.clone(),
            })
            .collect()
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn total_games_played(&self) -> u32 {
        self.total_games_played
    }

    pub fn total_score(&self) -> u64 {
        self.total_score
    }

    pub fn average_score(&self) -> f64 {
        if self.total_games_played == 0 {
            return 0.0;
        }
        self.total_score as f64 / self.total_games_played as f64
    }

    /// Zero the counters. The record log is kept.
    pub fn reset_all_scores(&mut self) {
        self.high_score = 0;
        self.total_games_played = 0;
        self.total_score = 0;
        persist(self.backend.as_mut(), HIGH_SCORE_KEY, &self.high_score);
        persist(self.backend.as_mut(), TOTAL_GAMES_KEY, &self.total_games_played);
        persist(self.backend.as_mut(), TOTAL_SCORE_KEY, &self.total_score);
        log::info!("All score counters reset");
    }

    /// Every record, oldest first
    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    /// Store a new current player name (trimmed; blank means the default).
    /// Returns the name actually stored.
    pub fn set_player_name(&mut self, name: &str) -> &str {
        self.player_name = normalize_name(name);
        persist(self.backend.as_mut(), PLAYER_NAME_KEY, &self.player_name);
        &self.player_name
    }

    fn records_for<'a>(&'a self, player_name: &'a str) -> impl DoubleEndedIterator<Item = &'a ScoreRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.player_name == player_name)
    }
}

/// Write one key through, logging instead of failing
fn persist<T: Serialize + ?Sized>(backend: &mut dyn KeyValueStore, key: &str, value: &T) {
    if let Err(e) = persistence::save_json(backend, key, value) {
        log::warn!("Failed to save {key}: {e}");
    }
}

fn load_or_default<T: DeserializeOwned + Default>(backend: &dyn KeyValueStore, key: &str) -> T {
    match persistence::load_json(backend, key) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(e) => {
            log::warn!("Unreadable {key} ({e}), starting from default");
            T::default()
        }
    }
}

fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        DEFAULT_PLAYER_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Format a record timestamp relative to `now` (both Unix ms)
pub fn format_date(timestamp: f64, now: f64) -> String {
    let diff_mins = (now - timestamp) / 60_000.0;
    let diff_hours = diff_mins / 60.0;
    let diff_days = diff_hours / 24.0;

    if diff_days >= 1.0 {
        let days = diff_days.floor() as i64;
        if days == 1 {
            "Yesterday".to_string()
        } else if days < 7 {
            format!("{days} days ago")
        } else {
            match DateTime::from_timestamp_millis(timestamp as i64) {
                Some(date) => date.format("%-m/%-d/%y").to_string(),
                None => "-".to_string(),
            }
        }
    } else if diff_hours >= 1.0 {
        let hours = diff_hours.floor() as i64;
        if hours == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{hours} hours ago")
        }
    } else if diff_mins >= 1.0 {
        let mins = diff_mins.floor() as i64;
        if mins == 1 {
            "1 min ago".to_string()
        } else {
            format!("{mins} mins ago")
        }
    } else {
        "Just now".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_first_run_defaults() {
        let store = ScoreStore::in_memory();
        assert_eq!(store.high_score(), 0);
        assert_eq!(store.total_games_played(), 0);
        assert_eq!(store.total_score(), 0);
        assert_eq!(store.average_score(), 0.0);
        assert!(store.records().is_empty());
        assert_eq!(store.player_name(), "Jugador");
        assert!(store.global_leaderboard(5).is_empty());
    }

    #[test]
    fn test_record_game_result() {
        let mut store = ScoreStore::in_memory();
        assert!(store.record_game_result(12));
        assert!(!store.record_game_result(7));
        assert!(!store.record_game_result(12));
        assert!(store.record_game_result(13));
        assert_eq!(store.high_score(), 13);
        assert_eq!(store.total_games_played(), 4);
        assert_eq!(store.total_score(), 44);
        assert!((store.average_score() - 11.0).abs() < 1e-9);

        store.reset_all_scores();
        assert_eq!(store.high_score(), 0);
        assert_eq!(store.total_games_played(), 0);
    }

    #[test]
    fn test_beating_previous_best() {
        let mut store = ScoreStore::in_memory();
        store.record_game_result(30);
        let games = store.total_games_played();
        assert!(store.record_game_result(50));
        assert_eq!(store.high_score(), 50);
        assert_eq!(store.total_games_played(), games + 1);
    }

    #[test]
    fn test_record_log_evicts_oldest() {
        let mut store = ScoreStore::in_memory();
        for i in 0..101 {
            store.record_player_score("ana", i, GameMode::Normal, i as f64);
        }
        assert_eq!(store.records().len(), MAX_PLAYER_SCORES);
        assert_eq!(store.records()[0].score, 1);
        assert_eq!(store.records()[99].score, 100);
    }

    #[test]
    fn test_player_queries() {
        let mut store = ScoreStore::in_memory();
        for (i, s) in [4, 9, 2, 9, 5].into_iter().enumerate() {
            store.record_player_score("ana", s, GameMode::Normal, i as f64);
        }
        store.record_player_score("bo", 50, GameMode::Basic, 10.0);

        assert_eq!(store.player_high_score("ana"), 9);
        assert_eq!(store.player_high_score("nobody"), 0);

        let recent: Vec<u32> = store.player_recent_scores("ana", 3).iter().map(|r| r.score).collect();
        assert_eq!(recent, vec![5, 9, 2]);

        let top = store.player_top_scores("ana", DEFAULT_LIST_LEN);
        let scores: Vec<u32> = top.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![9, 9, 5, 4, 2]);
        // Stable for ties
        assert_eq!(top[0].timestamp, 1.0);
        assert_eq!(top[1].timestamp, 3.0);
    }

    #[test]
    fn test_global_leaderboard() {
        let mut store = ScoreStore::in_memory();
        store.record_player_score("ana", 10, GameMode::Normal, 1.0);
        store.record_player_score("bo", 15, GameMode::Basic, 2.0);
        store.record_player_score("ana", 20, GameMode::Normal, 3.0);
        store.record_player_score("cy", 15, GameMode::Normal, 4.0);

        let board = store.global_leaderboard(5);
        let rows: Vec<(usize, &str, u32)> = board
            .iter()
            .map(|e| (e.rank, e.player_name.as_str(), e.score))
            .collect();
        assert_eq!(rows, vec![(1, "ana", 20), (2, "bo", 15), (3, "cy", 15)]);
        assert_eq!(board[1].mode, "basic");

        assert_eq!(store.global_leaderboard(1).len(), 1);
    }

    #[test]
    fn test_survives_reload() {
        let mut store = ScoreStore::in_memory();
        store.record_game_result(8);
        store.record_player_score("ana", 8, GameMode::Basic, 1234.0);
        assert_eq!(store.set_player_name("  Ana  "), "Ana");

        let store = ScoreStore::load(store.into_backend());
        assert_eq!(store.high_score(), 8);
        assert_eq!(store.total_games_played(), 1);
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.records()[0].mode, "basic");
        assert_eq!(store.player_name(), "Ana");
    }

    #[test]
    fn test_reset_survives_reload() {
        let mut store = ScoreStore::in_memory();
        store.record_game_result(40);
        store.record_player_score("ana", 40, GameMode::Normal, 1.0);
        store.reset_all_scores();

        let store = ScoreStore::load(store.into_backend());
        assert_eq!(store.high_score(), 0);
        assert_eq!(store.total_games_played(), 0);
        assert_eq!(store.total_score(), 0);
        assert_eq!(store.records().len(), 1);
    }

    #[test]
    fn test_persisted_layout() {
        let mut store = ScoreStore::in_memory();
        store.record_player_score("ana", 3, GameMode::Normal, 99.0);
        let backend = store.into_backend();
        let json = backend.get(PLAYER_SCORES_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{ "playerName": "ana", "score": 3, "date": 99.0, "mode": "normal" }])
        );
    }

    #[test]
    fn test_corrupt_keys_fall_back() {
        let mut backend = MemoryStore::new();
        backend.set(HIGH_SCORE_KEY, "\"lots\"".to_string()).unwrap();
        backend.set(TOTAL_GAMES_KEY, "3".to_string()).unwrap();
        backend.set(PLAYER_SCORES_KEY, "{broken".to_string()).unwrap();

        let store = ScoreStore::load(Box::new(backend));
        assert_eq!(store.high_score(), 0);
        assert_eq!(store.total_games_played(), 3);
        assert!(store.records().is_empty());
    }

    #[test]
    fn test_blank_name_uses_default() {
        let mut store = ScoreStore::in_memory();
        assert_eq!(store.set_player_name("   "), "Jugador");
        store.record_player_score("", 1, GameMode::Normal, 0.0);
        assert_eq!(store.records()[0].player_name, "Jugador");
    }

    #[test]
    fn test_format_date() {
        let now = 1_700_000_000_000.0;
        let min = 60_000.0;
        assert_eq!(format_date(now - 10_000.0, now), "Just now");
        assert_eq!(format_date(now - min, now), "1 min ago");
        assert_eq!(format_date(now - 5.0 * min, now), "5 mins ago");
        assert_eq!(format_date(now - 60.0 * min, now), "1 hour ago");
        assert_eq!(format_date(now - 180.0 * min, now), "3 hours ago");
        assert_eq!(format_date(now - 1440.0 * min, now), "Yesterday");
        assert_eq!(format_date(now - 3.0 * 1440.0 * min, now), "3 days ago");
        // 2023-11-14T22:13:20Z minus 10 days
        assert_eq!(format_date(now - 10.0 * 1440.0 * min, now), "11/4/23");
    }

    proptest! {
        #[test]
        fn prop_leaderboard_one_row_per_player(
            runs in proptest::collection::vec((0usize..6, 0u32..200), 0..150),
            top_n in 1usize..10,
        ) {
            let names = ["ana", "bo", "cy", "di", "ed", "flo"];
            let mut store = ScoreStore::in_memory();
            for (i, (who, score)) in runs.iter().enumerate() {
                store.record_player_score(names[*who], *score, GameMode::Normal, i as f64);
            }
            let board = store.global_leaderboard(top_n);
            prop_assert!(board.len() <= top_n);

            let mut seen = HashSet::new();
            for entry in &board {
                prop_assert!(seen.insert(entry.player_name.clone()));
                prop_assert_eq!(entry.score, store.player_high_score(&entry.player_name));
            }
            for w in board.windows(2) {
                prop_assert!(w[0].score >= w[1].score);
                prop_assert_eq!(w[0].rank + 1, w[1].rank);
            }
        }
    }
}
