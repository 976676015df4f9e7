//! Level module - a level every N cleared rows

use serde::{Deserialize, Serialize};

use duoblock_core::{CoreError, Level, Persist, Score};

/// Default rows per level
pub const ROWS_PER_LEVEL: u32 = 10;

/// Highest reachable level
pub const MAX_LEVEL: u32 = 30;

/// Level management
/// Level increases every `rows_per_level` rows cleared
pub fn calculate_level(start_level: u32, rows_cleared: u32, rows_per_level: u32) -> u32 {
    (start_level + rows_cleared / rows_per_level.max(1)).min(MAX_LEVEL)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct LevelState {
    level: u32,
    /// Levels gained or lost outside of clearing
    adjustment: i32,
}

#[derive(Debug, Clone)]
pub struct StandardLevel {
    start_level: u32,
    rows_per_level: u32,
    state: LevelState,
}

impl StandardLevel {
    pub fn new(start_level: u32, rows_per_level: u32) -> Self {
        let start_level = start_level.min(MAX_LEVEL);
        Self {
            start_level,
            rows_per_level,
            state: LevelState {
                level: start_level,
                adjustment: 0,
            },
        }
    }

    fn earned(&self, score: &dyn Score) -> u32 {
        let base = calculate_level(self.start_level, score.rows_cleared(), self.rows_per_level);
        (base as i64 + self.state.adjustment as i64).clamp(0, MAX_LEVEL as i64) as u32
    }
}

impl Default for StandardLevel {
    fn default() -> Self {
        Self::new(0, ROWS_PER_LEVEL)
    }
}

impl Persist for StandardLevel {
    fn save_blob(&self) -> Result<Vec<u8>, CoreError> {
        Ok(serde_json::to_vec(&self.state)?)
    }

    fn restore_blob(&mut self, blob: Option<&[u8]>) -> Result<(), CoreError> {
        if let Some(bytes) = blob {
            self.state = serde_json::from_slice(bytes)?;
        }
        Ok(())
    }
}

impl Level for StandardLevel {
    fn level(&self) -> u32 {
        self.state.level
    }

    fn should_level_up(&self, score: &dyn Score) -> bool {
        self.earned(score) > self.state.level
    }

    fn level_up(&mut self) {
        self.state.level = (self.state.level + 1).min(MAX_LEVEL);
    }

    fn change_level(&mut self, delta: i32) -> u32 {
        let next = (self.state.level as i64 + delta as i64).clamp(0, MAX_LEVEL as i64) as u32;
        self.state.adjustment += next as i32 - self.state.level as i32;
        self.state.level = next;
        next
    }
}
