//! Save games
//!
//! A save holds the configuration, the full [`GameState`] and one opaque
//! blob per stateful subsystem. Blobs are keyed by subsystem name; a name
//! missing from an older save restores that subsystem with `None`.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use duoblock_core::types::{State, MAX_CHUNKS, MAX_COMPONENTS};
use duoblock_core::CoreError;

use crate::builder::GameBuilder;
use crate::config::GameConfig;
use crate::game::{Game, Systems};
use crate::state::GameState;

pub const SAVE_VERSION: u32 = 1;

/// Subsystems with private state, in save order
pub const BLOB_ORDER: [&str; 9] = [
    "timing",
    "score",
    "level",
    "attack",
    "bag",
    "special",
    "metamorphosis",
    "triggers",
    "valleys",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    pub version: u32,
    pub config: GameConfig,
    pub state: GameState,
    pub blobs: BTreeMap<String, Vec<u8>>,
}

impl SaveGame {
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn save_blob(systems: &Systems, name: &str) -> Result<Vec<u8>, CoreError> {
    match name {
        "timing" => systems.timing.save_blob(),
        "score" => systems.score.save_blob(),
        "level" => systems.level.save_blob(),
        "attack" => systems.attack.save_blob(),
        "bag" => systems.bag.save_blob(),
        "special" => systems.special.save_blob(),
        "metamorphosis" => systems.metamorphosis.save_blob(),
        "triggers" => systems.triggers.save_blob(),
        "valleys" => systems.valleys.save_blob(),
        _ => Ok(Vec::new()),
    }
}

fn restore_blob(systems: &mut Systems, name: &str, blob: Option<&[u8]>) -> Result<(), CoreError> {
    match name {
        "timing" => systems.timing.restore_blob(blob),
        "score" => systems.score.restore_blob(blob),
        "level" => systems.level.restore_blob(blob),
        "attack" => systems.attack.restore_blob(blob),
        "bag" => systems.bag.restore_blob(blob),
        "special" => systems.special.restore_blob(blob),
        "metamorphosis" => systems.metamorphosis.restore_blob(blob),
        "triggers" => systems.triggers.restore_blob(blob),
        "valleys" => systems.valleys.restore_blob(blob),
        _ => Ok(()),
    }
}

/// Reject states this engine could not have produced
fn check_state(state: &GameState, config: &GameConfig) -> Result<(), CoreError> {
    if state.rows() != config.rows || state.cols() != config.cols {
        return Err(CoreError::IllegalState(format!(
            "saved grid is {}x{}, game is {}x{}",
            state.cols(),
            state.rows(),
            config.cols,
            config.rows
        )));
    }
    let sized = |grid: &duoblock_core::Grid| grid.rows() == config.rows && grid.cols() == config.cols;
    if !sized(&state.grid_before)
        || !sized(&state.grid_inverse_clear)
        || state.clear_flags.len() != config.rows
        || state.monochrome_flags.len() != config.rows
        || state.components.capacity() != MAX_COMPONENTS
        || state.chunks.capacity() != MAX_CHUNKS
        || state.components.count > MAX_COMPONENTS
        || state.chunks.count > MAX_CHUNKS
    {
        return Err(CoreError::IllegalState("saved buffers do not match the game".into()));
    }
    match state.state_after_progression {
        State::Preparing | State::EndingCycle => Ok(()),
        other => Err(CoreError::UnrecognizedProgression(format!(
            "progression cannot return to {:?}",
            other
        ))),
    }
}

impl Game {
    pub fn save(&self) -> Result<SaveGame, CoreError> {
        let mut blobs = BTreeMap::new();
        for name in BLOB_ORDER {
            let blob = save_blob(&self.systems, name)?;
            if !blob.is_empty() {
                blobs.insert(name.to_string(), blob);
            }
        }
        Ok(SaveGame {
            version: SAVE_VERSION,
            config: self.config.clone(),
            state: self.state.clone(),
            blobs,
        })
    }

    /// Load `save` into this game, meant for a freshly built game with the
    /// same configuration
    pub fn restore(&mut self, save: &SaveGame) -> Result<(), CoreError> {
        if save.version != SAVE_VERSION {
            return Err(CoreError::IllegalState(format!(
                "unsupported save version {}",
                save.version
            )));
        }
        check_state(&save.state, &self.config)?;
        if save.config != self.config {
            warn!("restoring a save made with a different configuration");
        }

        for name in BLOB_ORDER {
            let blob = save.blobs.get(name).map(Vec::as_slice);
            restore_blob(&mut self.systems, name, blob)?;
        }
        self.state.clone_from(&save.state);
        self.actions.clear();
        self.sink.clear();
        let level = self.systems.level.level();
        self.systems.timing.set_level(level);
        debug!(
            "restored save at cycle {} in {:?}",
            self.state.cycle, self.state.state
        );
        Ok(())
    }

    /// Build a game with the standard rules and restore `save` into it
    pub fn from_save(save: &SaveGame) -> Result<Game, CoreError> {
        let mut game = GameBuilder::new(save.config.clone()).build()?;
        game.restore(save)?;
        Ok(game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RecordingHost;

    fn playing(seed: u32) -> (Game, RecordingHost) {
        let config = GameConfig {
            seed,
            ..GameConfig::default()
        };
        let host = RecordingHost::without_timing();
        let mut game = GameBuilder::new(config)
            .host(Box::new(host.clone()))
            .build()
            .unwrap();
        game.start();
        (game, host)
    }

    /// Without timing nothing waits, so the host holds the game at `cycle`
    fn play_to(game: &mut Game, host: &RecordingHost, cycle: u64) {
        host.hold_at_cycle(Some(cycle));
        game.advance(0.25).unwrap();
    }

    #[test]
    fn test_save_json_roundtrip() {
        let (mut game, host) = playing(3);
        play_to(&mut game, &host, 2);
        let save = game.save().unwrap();
        let back = SaveGame::from_json(&save.to_json().unwrap()).unwrap();
        assert_eq!(back.version, SAVE_VERSION);
        assert_eq!(back.state, save.state);
        assert_eq!(back.blobs, save.blobs);
        assert!(back.blobs.contains_key("bag"));
    }

    #[test]
    fn test_restored_game_continues_identically() {
        let (mut original, original_host) = playing(9);
        play_to(&mut original, &original_host, 3);
        assert_eq!(original.cycle(), 3);
        let save = original.save().unwrap();

        let restored_host = RecordingHost::without_timing();
        let mut restored = GameBuilder::new(save.config.clone())
            .host(Box::new(restored_host.clone()))
            .build()
            .unwrap();
        restored.restore(&save).unwrap();
        assert_eq!(restored.state(), original.state());

        play_to(&mut original, &original_host, 6);
        play_to(&mut restored, &restored_host, 6);
        assert_eq!(restored.state(), original.state());
        assert_eq!(restored.score(), original.score());
        assert_eq!(restored.draw_history(), original.draw_history());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let save = playing(1).0.save().unwrap();
        let config = GameConfig {
            rows: 16,
            ..GameConfig::default()
        };
        let mut other = GameBuilder::new(config).build().unwrap();
        assert!(matches!(
            other.restore(&save),
            Err(CoreError::IllegalState(_))
        ));
    }

    #[test]
    fn test_bad_progression_return_rejected() {
        let mut save = playing(1).0.save().unwrap();
        save.state.state_after_progression = State::Falling;
        let mut game = GameBuilder::new(GameConfig::default()).build().unwrap();
        assert!(matches!(
            game.restore(&save),
            Err(CoreError::UnrecognizedProgression(_))
        ));
    }

    #[test]
    fn test_missing_blobs_keep_fresh_state() {
        let (mut game, host) = playing(4);
        play_to(&mut game, &host, 1);
        let mut save = game.save().unwrap();
        save.blobs.clear();
        let restored = Game::from_save(&save).unwrap();
        assert_eq!(restored.state(), &save.state);
        assert_eq!(restored.score(), 0);
    }
}
