//! Scoring module - points for drops, clears and cascades
//!
//! - Soft fall: +1 per row
//! - Hard drop: +2 per row
//! - Clear: `100 x rows x (cascade + 1)`; monochrome rows count double
//!
//! The cascade number is 0 for the first clear of a cycle and grows by one
//! for every further clear the same piece causes.

use serde::{Deserialize, Serialize};

use duoblock_core::{CoreError, Persist, Piece, Score};

/// Points per cleared row before the cascade multiplier
pub const ROW_POINTS: u64 = 100;

/// Calculate drop score
/// soft: +1 per row, hard: +2 per row
pub fn calculate_drop_score(rows: u32, is_hard_drop: bool) -> u64 {
    if is_hard_drop {
        rows as u64 * 2
    } else {
        rows as u64
    }
}

/// Calculate the points for one clear
pub fn calculate_clear_score(chromatic_rows: u32, monochrome_rows: u32, cascade: i32) -> u64 {
    let multiplier = (cascade.max(0) as u64) + 1;
    let rows = chromatic_rows as u64 + monochrome_rows as u64 * 2;
    ROW_POINTS * rows * multiplier
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ScoreState {
    score: u64,
    cycle_points: u64,
    rows_cleared: u32,
    pieces_entered: u32,
    reserve_uses: u32,
    rows_added: u32,
    longest_cascade: i32,
}

/// Cumulative scoring with per-cycle accounting
#[derive(Debug, Clone, Default)]
pub struct StandardScore {
    state: ScoreState,
}

impl StandardScore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points earned since the current cycle started
    pub fn cycle_points(&self) -> u64 {
        self.state.cycle_points
    }

    pub fn reserve_uses(&self) -> u32 {
        self.state.reserve_uses
    }

    pub fn longest_cascade(&self) -> i32 {
        self.state.longest_cascade
    }

    fn award(&mut self, points: u64) {
        self.state.score += points;
        self.state.cycle_points += points;
    }
}

impl Persist for StandardScore {
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

impl Score for StandardScore {
    fn start_cycle(&mut self) {
        self.state.cycle_points = 0;
    }

    fn did_enter(&mut self, _piece: &Piece) {
        self.state.pieces_entered += 1;
    }

    fn did_fall(&mut self, soft: bool) {
        if soft {
            self.award(calculate_drop_score(1, false));
        }
    }

    fn did_drop(&mut self, rows: i32) {
        self.award(calculate_drop_score(rows.max(0) as u32, true));
    }

    fn did_lock(&mut self, _piece: &Piece) {}

    fn did_components_fall(&mut self, _count: usize, _max_distance: i32) {}

    fn did_chunks_fall(&mut self, _count: usize, _max_distance: i32) {}

    fn did_clear(&mut self, cascade: i32, chromatic: &[u8], monochrome: &[u8]) {
        let mono = monochrome.iter().filter(|&&f| f != 0).count() as u32;
        let chroma = chromatic
            .iter()
            .zip(monochrome.iter())
            .filter(|(&c, &m)| c != 0 && m == 0)
            .count() as u32;
        self.state.rows_cleared += chroma + mono;
        self.state.longest_cascade = self.state.longest_cascade.max(cascade);
        self.award(calculate_clear_score(chroma, mono, cascade));
    }

    fn did_use_reserve(&mut self, _stored: &Piece, _released: &Piece) {
        self.state.reserve_uses += 1;
    }

    fn did_add_rows(&mut self, rows: u32) {
        self.state.rows_added += rows;
    }

    fn did_level_up(&mut self, _level: u32) {}

    fn end_cycle(&mut self) {}

    fn score(&self) -> u64 {
        self.state.score
    }

    fn rows_cleared(&self) -> u32 {
        self.state.rows_cleared
    }

    fn pieces_entered(&self) -> u32 {
        self.state.pieces_entered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_scores() {
        assert_eq!(calculate_drop_score(5, false), 5);
        assert_eq!(calculate_drop_score(5, true), 10);
    }

    #[test]
    fn test_clear_scores() {
        assert_eq!(calculate_clear_score(1, 0, 0), 100);
        assert_eq!(calculate_clear_score(2, 0, 1), 400);
        assert_eq!(calculate_clear_score(0, 1, 0), 200);
        // the cascade counter starts at -1 before the first clear
        assert_eq!(calculate_clear_score(1, 0, -1), 100);
    }

    #[test]
    fn test_monochrome_rows_not_counted_twice() {
        let mut score = StandardScore::new();
        score.did_clear(0, &[0b11, 0b01, 0], &[1, 0, 0]);
        assert_eq!(score.rows_cleared(), 2);
        assert_eq!(score.score(), 300);
    }

    #[test]
    fn test_cycle_points_reset() {
        let mut score = StandardScore::new();
        score.did_drop(3);
        assert_eq!(score.cycle_points(), 6);
        score.start_cycle();
        assert_eq!(score.cycle_points(), 0);
        assert_eq!(score.score(), 6);
    }
}
