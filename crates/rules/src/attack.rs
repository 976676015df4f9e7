//! Attack module - garbage, push rows, displacement and outgoing attacks
//!
//! Incoming attacks wait in a queue until their cycle is due, then become
//! pending effects the state machine unleashes one at a time while preparing
//! the next piece. Displacement rows rise on their own clock whose speed
//! accelerates.

use serde::{Deserialize, Serialize};

use duoblock_core::types::{block, DropKind, PANES};
use duoblock_core::{
    Attack, AttackKind, CoreError, Grid, IncomingAttack, OutgoingAttack, Persist, Piece, RowsAdded,
};

use crate::rng::SimpleRng;

/// Outgoing attacks held without reallocating
const OUTGOING_CAPACITY: usize = 8;

/// Rising-floor parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplacementConfig {
    /// Rows per second at the start
    pub rows_per_second: f64,
    /// Increase of `rows_per_second` per second
    pub accel_per_second: f64,
    /// Rows pushed in before the first piece
    pub prefill_rows: u32,
}

impl Default for DisplacementConfig {
    fn default() -> Self {
        Self {
            rows_per_second: 0.05,
            accel_per_second: 0.001,
            prefill_rows: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct AttackState {
    incoming: Vec<IncomingAttack>,
    garbage_rows: u32,
    push_rows: u32,
    drop_blocks: [u32; 5],
    level_change: i32,
    accel: u32,
    displacement: f64,
    displacement_rate: f64,
    outgoing: Vec<OutgoingAttack>,
    cycle: u64,
    rng: SimpleRng,
}

/// Standard garbage rules
#[derive(Debug, Clone)]
pub struct StandardAttack {
    displacement: Option<DisplacementConfig>,
    state: AttackState,
}

impl StandardAttack {
    pub fn new(seed: u32, displacement: Option<DisplacementConfig>) -> Self {
        Self {
            displacement,
            state: AttackState {
                incoming: Vec::new(),
                garbage_rows: 0,
                push_rows: 0,
                drop_blocks: [0; 5],
                level_change: 0,
                accel: 0,
                displacement: 0.0,
                displacement_rate: displacement.map(|d| d.rows_per_second).unwrap_or(0.0),
                outgoing: Vec::with_capacity(OUTGOING_CAPACITY),
                cycle: 0,
                // decorrelate from the piece bag
                rng: SimpleRng::new(seed.rotate_left(13) ^ 0x5bd1_e995),
            },
        }
    }

    /// Attacks received but not yet due
    pub fn incoming_len(&self) -> usize {
        self.state.incoming.len()
    }

    /// Push `rows` rows in from the bottom, built by `fill(row_index, grid)`
    fn push_rows<F>(&mut self, grid: &mut Grid, rows: u32, mut fill: F) -> RowsAdded
    where
        F: FnMut(&mut SimpleRng, &mut Grid, i32),
    {
        let rows = rows.min(grid.rows() as u32);
        if rows == 0 {
            return RowsAdded::default();
        }
        let overflow = grid.shift_up(rows as usize);
        for row in 0..rows as i32 {
            fill(&mut self.state.rng, grid, row);
        }
        RowsAdded { rows, overflow }
    }

    /// A linked row with one random gap
    fn gap_row(rng: &mut SimpleRng, grid: &mut Grid, row: i32) {
        let gap = rng.next_range(grid.cols() as u32) as i32;
        for col in 0..grid.cols() as i32 {
            if col == gap {
                continue;
            }
            for pane in 0..PANES {
                grid.set(pane, row, col, block::pane_code(pane));
            }
        }
    }

    /// A linked row with the pane 0 gap opposite the pane 1 gap; the row
    /// stays one connected group, and only a single-pane cell can complete it
    fn split_gap_row(rng: &mut SimpleRng, grid: &mut Grid, row: i32) {
        let cols = grid.cols() as i32;
        let gap = rng.next_range(cols as u32) as i32;
        for pane in 0..PANES {
            let pane_gap = (gap + pane as i32 * cols / 2) % cols;
            for col in 0..cols {
                if col != pane_gap {
                    grid.set(pane, row, col, block::pane_code(pane));
                }
            }
        }
    }
}

impl Default for StandardAttack {
    fn default() -> Self {
        Self::new(1, None)
    }
}

impl Persist for StandardAttack {
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

impl Attack for StandardAttack {
    fn queue_incoming(&mut self, attack: IncomingAttack) {
        self.state.incoming.push(attack);
    }

    fn dequeue_incoming(&mut self, cycle: u64) {
        let state = &mut self.state;
        let mut i = 0;
        while i < state.incoming.len() {
            if state.incoming[i].due_cycle > cycle {
                i += 1;
                continue;
            }
            match state.incoming.remove(i).kind {
                AttackKind::Garbage { rows } => state.garbage_rows += rows,
                AttackKind::Push { rows } => state.push_rows += rows,
                AttackKind::DropBlocks { kind, count } => state.drop_blocks[kind.index()] += count,
                AttackKind::LevelChange(delta) => state.level_change += delta,
                AttackKind::DisplacementAccel => state.accel += 1,
            }
        }
    }

    fn tick(&mut self, seconds: f64) {
        if let Some(config) = self.displacement {
            self.state.displacement_rate += config.accel_per_second * seconds;
            self.state.displacement += self.state.displacement_rate * seconds;
        }
    }

    fn prefill_displacement(&mut self, grid: &mut Grid) -> u32 {
        let Some(config) = self.displacement else {
            return 0;
        };
        self.push_rows(grid, config.prefill_rows, Self::gap_row).rows
    }

    fn has_garbage_rows(&self) -> bool {
        self.state.garbage_rows > 0
    }

    fn unleash_garbage_rows(&mut self, grid: &mut Grid) -> RowsAdded {
        let rows = std::mem::take(&mut self.state.garbage_rows);
        self.push_rows(grid, rows, Self::gap_row)
    }

    fn has_push_rows(&self) -> bool {
        self.state.push_rows > 0
    }

    fn unleash_push_rows(&mut self, grid: &mut Grid) -> RowsAdded {
        let rows = std::mem::take(&mut self.state.push_rows);
        self.push_rows(grid, rows, Self::split_gap_row)
    }

    fn has_displace_rows(&self) -> bool {
        self.displacement.is_some() && self.state.displacement >= 1.0
    }

    fn unleash_displace_rows(&mut self, grid: &mut Grid) -> RowsAdded {
        let rows = self.state.displacement.floor().max(0.0) as u32;
        self.state.displacement -= rows as f64;
        self.push_rows(grid, rows, Self::gap_row)
    }

    fn has_displacement_accel(&self) -> bool {
        self.state.accel > 0
    }

    fn unleash_displacement_accel(&mut self) {
        let steps = std::mem::take(&mut self.state.accel);
        if let Some(config) = self.displacement {
            self.state.displacement_rate += config.rows_per_second * steps as f64;
        }
    }

    fn has_drop_blocks(&self) -> bool {
        self.state.drop_blocks.iter().any(|&n| n > 0)
    }

    fn unleash_drop_blocks(&mut self, out: &mut [u32; 5]) -> u32 {
        for kind in DropKind::ORDER {
            out[kind.index()] += std::mem::take(&mut self.state.drop_blocks[kind.index()]);
        }
        out.iter().sum()
    }

    fn has_level_change(&self) -> bool {
        self.state.level_change != 0
    }

    fn unleash_level_change(&mut self) -> i32 {
        std::mem::take(&mut self.state.level_change)
    }

    fn has_outgoing_attacks(&self) -> bool {
        !self.state.outgoing.is_empty()
    }

    fn take_outgoing(&mut self) -> Option<OutgoingAttack> {
        if self.state.outgoing.is_empty() {
            None
        } else {
            Some(self.state.outgoing.remove(0))
        }
    }

    fn did_enter(&mut self, _piece: &Piece) {}

    fn did_lock(&mut self, _piece: &Piece) {}

    fn did_clear(&mut self, cascade: i32, rows: u32, monochrome_rows: u32) {
        let total = rows + monochrome_rows;
        if total >= 2 || cascade > 0 {
            let garbage_rows = total.saturating_sub(1) + cascade.max(0) as u32;
            if garbage_rows > 0 {
                self.state.outgoing.push(OutgoingAttack {
                    garbage_rows,
                    cycle: self.state.cycle,
                });
            }
        }
    }

    fn did_use_reserve(&mut self) {}

    fn end_cycle(&mut self, cycle: u64) {
        self.state.cycle = cycle;
    }

    fn issue_special_attack(&mut self) {
        self.state.outgoing.push(OutgoingAttack {
            garbage_rows: 2,
            cycle: self.state.cycle,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incoming_waits_for_cycle() {
        let mut attack = StandardAttack::default();
        attack.queue_incoming(IncomingAttack {
            due_cycle: 3,
            kind: AttackKind::Garbage { rows: 2 },
        });
        attack.dequeue_incoming(2);
        assert!(!attack.has_garbage_rows());
        attack.dequeue_incoming(3);
        assert!(attack.has_garbage_rows());
        assert_eq!(attack.incoming_len(), 0);
    }

    #[test]
    fn test_garbage_rows_have_one_gap() {
        let mut attack = StandardAttack::default();
        attack.queue_incoming(IncomingAttack {
            due_cycle: 0,
            kind: AttackKind::Garbage { rows: 2 },
        });
        attack.dequeue_incoming(0);
        let mut grid = Grid::from_ascii(4, &["....", "....", "....", "0..."]);
        let added = attack.unleash_garbage_rows(&mut grid);
        assert_eq!(added, RowsAdded { rows: 2, overflow: false });
        for row in 0..2 {
            let filled = (0..4).filter(|&c| grid.is_occupied(0, row, c)).count();
            assert_eq!(filled, 3);
        }
        assert!(grid.is_occupied(0, 2, 0));
        assert!(!attack.has_garbage_rows());
    }

    #[test]
    fn test_push_rows_gap_each_pane() {
        let mut attack = StandardAttack::default();
        attack.queue_incoming(IncomingAttack {
            due_cycle: 0,
            kind: AttackKind::Push { rows: 1 },
        });
        attack.dequeue_incoming(0);
        let mut grid = Grid::new(3, 4);
        attack.unleash_push_rows(&mut grid);
        assert!(!grid.is_row_full(0, 0));
        assert!(!grid.is_row_full(1, 0));
        assert_eq!(grid.block_count(), 6);
        // the two gaps never share a column
        assert!((0..4).all(|col| grid.is_occupied(0, 0, col) || grid.is_occupied(1, 0, col)));
    }

    #[test]
    fn test_drop_blocks_accumulate_by_kind() {
        let mut attack = StandardAttack::default();
        for (kind, count) in [(DropKind::Peaks, 2), (DropKind::Valleys, 1), (DropKind::Peaks, 1)] {
            attack.queue_incoming(IncomingAttack {
                due_cycle: 0,
                kind: AttackKind::DropBlocks { kind, count },
            });
        }
        attack.dequeue_incoming(0);
        let mut out = [0u32; 5];
        assert_eq!(attack.unleash_drop_blocks(&mut out), 4);
        assert_eq!(out[DropKind::Valleys.index()], 1);
        assert_eq!(out[DropKind::Peaks.index()], 3);
        assert!(!attack.has_drop_blocks());
    }

    #[test]
    fn test_displacement_clock() {
        let config = DisplacementConfig {
            rows_per_second: 1.0,
            accel_per_second: 0.0,
            prefill_rows: 2,
        };
        let mut attack = StandardAttack::new(9, Some(config));
        let mut grid = Grid::new(6, 4);
        assert_eq!(attack.prefill_displacement(&mut grid), 2);
        assert!(!attack.has_displace_rows());
        attack.tick(1.5);
        assert!(attack.has_displace_rows());
        assert_eq!(attack.unleash_displace_rows(&mut grid).rows, 1);
        assert!(!attack.has_displace_rows());
    }

    #[test]
    fn test_outgoing_after_multi_row_clear() {
        let mut attack = StandardAttack::default();
        attack.did_clear(0, 1, 0);
        assert!(!attack.has_outgoing_attacks());
        attack.did_clear(0, 3, 0);
        assert_eq!(attack.take_outgoing().map(|a| a.garbage_rows), Some(2));
        attack.issue_special_attack();
        assert!(attack.has_outgoing_attacks());
    }
}
