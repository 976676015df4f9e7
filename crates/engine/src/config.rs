//! Game configuration
//!
//! Defaults describe a plain 8 x 20 game with swap reserve and standard
//! timing. `from_env` overlays a handful of environment variables, ignoring
//! values that do not parse.

use serde::{Deserialize, Serialize};

use duoblock_core::types::{GameEvents, ReserveBehavior, DEFAULT_COLS, DEFAULT_ROWS, MAX_COLS, MAX_ROWS};
use duoblock_core::CoreError;
use duoblock_rules::{DisplacementConfig, SpecialMode, TimingConfig, ROWS_PER_LEVEL};

/// Fewest rows a game may have
pub const MIN_ROWS: usize = 2;

/// Fewest columns a game may have; every piece box must fit across
pub const MIN_COLS: usize = 4;

/// Everything needed to build a [`crate::Game`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub rows: usize,
    pub cols: usize,
    pub seed: u32,
    pub reserve_behavior: ReserveBehavior,
    /// Events that halt `advance` until acknowledged
    pub significant_events: GameEvents,
    pub timing: TimingConfig,
    pub displacement: Option<DisplacementConfig>,
    pub rows_per_level: u32,
    pub start_level: u32,
    pub special_rows_per_charge: u32,
    pub special_mode: SpecialMode,
    /// Swap the panes every this many cycles
    pub metamorphosis_period: Option<u32>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            seed: 1,
            reserve_behavior: ReserveBehavior::Swap,
            significant_events: GameEvents::empty(),
            timing: TimingConfig::default(),
            displacement: None,
            rows_per_level: ROWS_PER_LEVEL,
            start_level: 0,
            special_rows_per_charge: duoblock_rules::special::DEFAULT_ROWS_PER_CHARGE,
            special_mode: SpecialMode::default(),
            metamorphosis_period: None,
        }
    }
}

impl GameConfig {
    /// Defaults overlaid with `DUOBLOCK_ROWS`, `DUOBLOCK_COLS`, `DUOBLOCK_SEED`,
    /// `DUOBLOCK_RESERVE` and `DUOBLOCK_LEVEL`
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();

        let rows = env::var("DUOBLOCK_ROWS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.rows);
        let cols = env::var("DUOBLOCK_COLS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.cols);
        let seed = env::var("DUOBLOCK_SEED")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.seed);
        let reserve_behavior = env::var("DUOBLOCK_RESERVE")
            .ok()
            .and_then(|s| ReserveBehavior::from_str(s.trim()))
            .unwrap_or(defaults.reserve_behavior);
        let start_level = env::var("DUOBLOCK_LEVEL")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.start_level);

        Self {
            rows,
            cols,
            seed,
            reserve_behavior,
            start_level,
            ..defaults
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !(MIN_ROWS..=MAX_ROWS).contains(&self.rows) {
            return Err(CoreError::Config(format!(
                "rows must be between {} and {}, got {}",
                MIN_ROWS, MAX_ROWS, self.rows
            )));
        }
        if !(MIN_COLS..=MAX_COLS).contains(&self.cols) {
            return Err(CoreError::Config(format!(
                "cols must be between {} and {}, got {}",
                MIN_COLS, MAX_COLS, self.cols
            )));
        }
        if self.rows_per_level == 0 {
            return Err(CoreError::Config("rows_per_level must be positive".into()));
        }
        Ok(())
    }
}
