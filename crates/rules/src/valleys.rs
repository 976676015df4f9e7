//! Valleys module - where dropped garbage blocks land
//!
//! Columns are classified by comparing their height with their neighbours.
//! The walls count as infinitely high, so an edge column is never a peak.
//!
//! | Kind | Rule | Order |
//! |------|------|-------|
//! | valleys | both neighbours higher | deepest first |
//! | junctions | exactly one neighbour higher | lowest first |
//! | peaks | higher than both neighbours | highest first |
//! | corners | the two edge columns | lowest first |
//! | troll | every column | seeded shuffle |
//!
//! When no column matches, every column is offered, lowest first.

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use duoblock_core::types::{DropKind, MAX_COLS, PANES};
use duoblock_core::{CoreError, Grid, Persist, Valleys};

use crate::rng::SimpleRng;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ValleysState {
    rng: SimpleRng,
}

/// Height-profile column classification
#[derive(Debug, Clone)]
pub struct StandardValleys {
    state: ValleysState,
}

impl StandardValleys {
    pub fn new(seed: u32) -> Self {
        Self {
            state: ValleysState {
                rng: SimpleRng::new(seed.rotate_left(7) ^ 0x2545_f491),
            },
        }
    }
}

impl Default for StandardValleys {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Column heights across both panes
fn heights(grid: &Grid) -> ArrayVec<i32, MAX_COLS> {
    (0..grid.cols().min(MAX_COLS) as i32)
        .map(|col| grid.column_height(col) as i32)
        .collect()
}

fn neighbours(heights: &[i32], col: usize) -> (i32, i32) {
    let left = if col == 0 { i32::MAX } else { heights[col - 1] };
    let right = heights.get(col + 1).copied().unwrap_or(i32::MAX);
    (left, right)
}

/// Highest empty cell (in both panes) lying under an occupied cell of `col`
fn highest_hole(grid: &Grid, col: i32) -> Option<i32> {
    let top = grid.column_height(col) as i32;
    (0..top - 1)
        .rev()
        .find(|&row| (0..PANES).all(|pane| !grid.is_occupied(pane, row, col)))
}

impl Persist for StandardValleys {
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

impl Valleys for StandardValleys {
    fn columns(&mut self, grid: &Grid, kind: DropKind, out: &mut ArrayVec<i32, MAX_COLS>) {
        out.clear();
        let heights = heights(grid);
        let cols = heights.len();
        if cols == 0 {
            return;
        }

        match kind {
            DropKind::Valleys => {
                for col in 0..cols {
                    let (left, right) = neighbours(&heights, col);
                    if left > heights[col] && right > heights[col] {
                        out.push(col as i32);
                    }
                }
                // deepest first: the smaller neighbour minus the column
                out.sort_by_key(|&c| {
                    let (left, right) = neighbours(&heights, c as usize);
                    -(left.min(right).saturating_sub(heights[c as usize]))
                });
            }
            DropKind::Junctions => {
                for col in 0..cols {
                    let (left, right) = neighbours(&heights, col);
                    let h = heights[col];
                    if (left > h) != (right > h) {
                        out.push(col as i32);
                    }
                }
                out.sort_by_key(|&c| heights[c as usize]);
            }
            DropKind::Peaks => {
                for col in 0..cols {
                    let (left, right) = neighbours(&heights, col);
                    if heights[col] > left && heights[col] > right {
                        out.push(col as i32);
                    }
                }
                out.sort_by_key(|&c| -heights[c as usize]);
            }
            DropKind::Corners => {
                out.push(0);
                if cols > 1 {
                    out.push(cols as i32 - 1);
                }
                out.sort_by_key(|&c| heights[c as usize]);
            }
            DropKind::Troll => {
                out.extend(0..cols as i32);
                self.state.rng.shuffle(out.as_mut_slice());
            }
        }

        if out.is_empty() {
            out.extend(0..cols as i32);
            out.sort_by_key(|&c| heights[c as usize]);
        }
    }

    fn best_column(&self, grid: &Grid) -> Option<(i32, i32)> {
        (0..grid.cols() as i32)
            .filter_map(|col| highest_hole(grid, col).map(|hole| (col, hole)))
            .min_by_key(|&(col, hole)| (hole, col))
            .map(|(col, hole)| (col, hole + 1))
    }
}
