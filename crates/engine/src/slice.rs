//! Slice projection - what a renderer should draw right now
//!
//! A [`BlocksSlice`] borrows from the game and owns nothing. The variant is
//! picked from the most recent animated event while it waits for
//! acknowledgement, otherwise from the current state. Fall waves are built
//! into scratch grids owned by [`SliceProjector`], so projecting does not
//! allocate once the game is built.

use log::debug;

use duoblock_core::types::{GameEvents, State, MAX_CHUNKS};
use duoblock_core::{Collision, Grid, Offset, Piece};

use crate::state::{GameState, PiecePool};

/// Blocks that fell the same distance, drawn at their pre-fall positions
#[derive(Debug, Clone, PartialEq)]
pub struct FallWave {
    pub distance: i32,
    pub occupancy: Grid,
}

/// Render-ready view of the game
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlocksSlice<'a> {
    /// Nothing moving
    Stable { grid: &'a Grid },
    /// A piece under player control, with its landing position when it has one
    PieceFalling {
        grid: &'a Grid,
        piece: &'a Piece,
        offset: Offset,
        ghost: Option<Offset>,
    },
    /// Groups falling onto `floor`, one wave per distinct fall distance
    ChunksFalling {
        floor: &'a Grid,
        waves: &'a [FallWave],
    },
    RowsClearing {
        before: &'a Grid,
        after: &'a Grid,
        /// Only the removed cells
        cleared: &'a Grid,
        chromatic: &'a [u8],
        monochrome: &'a [u8],
    },
    Metamorphosizing { before: &'a Grid, after: &'a Grid },
    PushingRows {
        before: &'a Grid,
        after: &'a Grid,
        rows: u32,
    },
    /// A piece placed for entry that has not started falling
    PiecePreview {
        grid: &'a Grid,
        piece: &'a Piece,
        offset: Offset,
    },
}

impl BlocksSlice<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            BlocksSlice::Stable { .. } => "stable",
            BlocksSlice::PieceFalling { .. } => "pieceFalling",
            BlocksSlice::ChunksFalling { .. } => "chunksFalling",
            BlocksSlice::RowsClearing { .. } => "rowsClearing",
            BlocksSlice::Metamorphosizing { .. } => "metamorphosizing",
            BlocksSlice::PushingRows { .. } => "pushingRows",
            BlocksSlice::PiecePreview { .. } => "piecePreview",
        }
    }
}

/// Scratch storage for slice projection
#[derive(Debug)]
pub struct SliceProjector {
    waves: Vec<FallWave>,
    wave_count: usize,
}

impl SliceProjector {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            waves: (0..MAX_CHUNKS)
                .map(|_| FallWave {
                    distance: 0,
                    occupancy: Grid::new(rows, cols),
                })
                .collect(),
            wave_count: 0,
        }
    }

    pub fn project<'a>(
        &'a mut self,
        state: &'a GameState,
        collision: &dyn Collision,
    ) -> BlocksSlice<'a> {
        let recent = state.last_animated;
        if recent.intersects(state.unacknowledged) {
            if recent.contains(GameEvents::CLEARED) {
                return BlocksSlice::RowsClearing {
                    before: &state.grid_before,
                    after: &state.grid,
                    cleared: &state.grid_inverse_clear,
                    chromatic: &state.clear_flags,
                    monochrome: &state.monochrome_flags,
                };
            }
            if recent.contains(GameEvents::METAMORPHOSIZED) {
                return BlocksSlice::Metamorphosizing {
                    before: &state.grid_before,
                    after: &state.grid,
                };
            }
            if recent.intersects(
                GameEvents::GARBAGE_ADDED | GameEvents::ROWS_PUSHED | GameEvents::DISPLACED,
            ) {
                return BlocksSlice::PushingRows {
                    before: &state.grid_before,
                    after: &state.grid,
                    rows: state.rows_pushed,
                };
            }
            if recent.contains(GameEvents::CHUNKS_FELL) {
                self.build_waves(&state.chunks);
                return BlocksSlice::ChunksFalling {
                    floor: &state.grid_before,
                    waves: &self.waves[..self.wave_count],
                };
            }
            if recent.contains(GameEvents::COMPONENTS_FELL) {
                self.build_waves(&state.components);
                return BlocksSlice::ChunksFalling {
                    floor: &state.grid,
                    waves: &self.waves[..self.wave_count],
                };
            }
        }

        match state.state {
            State::Falling if !state.piece.is_empty() => BlocksSlice::PieceFalling {
                grid: &state.grid,
                piece: &state.piece,
                offset: state.offset,
                ghost: ghost_offset(collision, &state.grid, &state.piece, state.offset),
            },
            State::Entering if !state.piece.is_empty() => BlocksSlice::PiecePreview {
                grid: &state.grid,
                piece: &state.piece,
                offset: state.offset,
            },
            _ => BlocksSlice::Stable { grid: &state.grid },
        }
    }

    /// Group the live pool entries by fall distance, shortest first
    fn build_waves(&mut self, pool: &PiecePool) {
        self.wave_count = 0;
        for (piece, original, landed) in pool.live() {
            let distance = original.y - landed.y;
            let slot = match self.waves[..self.wave_count]
                .iter()
                .position(|w| w.distance == distance)
            {
                Some(slot) => slot,
                None => {
                    let slot = self.wave_count;
                    if slot >= self.waves.len() {
                        continue;
                    }
                    self.waves[slot].distance = distance;
                    self.waves[slot].occupancy.clear();
                    self.wave_count += 1;
                    slot
                }
            };
            let occupancy = &mut self.waves[slot].occupancy;
            for (pane, row, col, code) in piece.cells() {
                // cells above the top are dropped by `set`
                occupancy.set(pane, original.y + row, original.x + col, code);
            }
        }
        self.waves[..self.wave_count].sort_unstable_by_key(|w| w.distance);
    }
}

fn ghost_offset(collision: &dyn Collision, grid: &Grid, piece: &Piece, offset: Offset) -> Option<Offset> {
    if collision.collides(grid, piece, offset) {
        debug!("no ghost: piece overlaps the grid at {:?}", offset);
        return None;
    }
    let distance = collision.space_below(grid, piece, offset, true).max(0);
    Some(offset.translated(0, -distance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use duoblock_core::types::{block, ProgressionState};
    use duoblock_rules::StandardCollision;

    fn single(code_pane: usize) -> Piece {
        let mut piece = Piece::empty();
        piece.reset(1, 1);
        piece.set(code_pane, 0, 0, block::pane_code(code_pane));
        piece
    }

    #[test]
    fn test_stable_by_default() {
        let state = GameState::new(8, 4);
        let mut projector = SliceProjector::new(8, 4);
        let slice = projector.project(&state, &StandardCollision);
        assert_eq!(slice.name(), "stable");
    }

    #[test]
    fn test_falling_piece_has_ghost_on_floor() {
        let mut state = GameState::new(8, 4);
        state.state = State::Falling;
        state.piece = single(0);
        state.offset = Offset::new(1, 6);
        let mut projector = SliceProjector::new(8, 4);
        match projector.project(&state, &StandardCollision) {
            BlocksSlice::PieceFalling { ghost, offset, .. } => {
                assert_eq!(offset, Offset::new(1, 6));
                assert_eq!(ghost, Some(Offset::new(1, 0)));
            }
            other => panic!("unexpected slice {}", other.name()),
        }
    }

    #[test]
    fn test_overlapping_piece_has_no_ghost() {
        let mut state = GameState::new(8, 4);
        state.state = State::Falling;
        state.grid.set(0, 3, 1, block::S0);
        state.piece = single(0);
        state.offset = Offset::new(1, 3);
        let mut projector = SliceProjector::new(8, 4);
        assert!(matches!(
            projector.project(&state, &StandardCollision),
            BlocksSlice::PieceFalling { ghost: None, .. }
        ));
    }

    #[test]
    fn test_unacknowledged_clear_selects_rows_clearing() {
        let mut state = GameState::new(8, 4);
        state.state = State::Progression(ProgressionState::ChunksUnlock);
        state.last_animated = GameEvents::CLEARED;
        state.unacknowledged = GameEvents::CLEARED;
        state.monochrome_flags[0] = 1;
        let mut projector = SliceProjector::new(8, 4);
        match projector.project(&state, &StandardCollision) {
            BlocksSlice::RowsClearing { monochrome, .. } => assert_eq!(monochrome[0], 1),
            other => panic!("unexpected slice {}", other.name()),
        }

        // acknowledged: back to the state-derived slice
        state.unacknowledged = GameEvents::empty();
        assert_eq!(projector.project(&state, &StandardCollision).name(), "stable");
    }

    #[test]
    fn test_chunk_waves_grouped_by_distance() {
        let mut state = GameState::new(8, 4);
        state.last_animated = GameEvents::CHUNKS_FELL;
        state.unacknowledged = GameEvents::CHUNKS_FELL;
        let pool = &mut state.chunks;
        pool.count = 3;
        for (i, (x, from, to)) in [(0, 5, 0), (1, 4, 1), (2, 3, 0)].into_iter().enumerate() {
            pool.pieces[i] = single(1);
            pool.original_offsets[i] = Offset::new(x, from);
            pool.offsets[i] = Offset::new(x, to);
        }

        let mut projector = SliceProjector::new(8, 4);
        match projector.project(&state, &StandardCollision) {
            BlocksSlice::ChunksFalling { waves, .. } => {
                let distances: Vec<i32> = waves.iter().map(|w| w.distance).collect();
                assert_eq!(distances, vec![3, 5]);
                assert_eq!(waves[0].occupancy.block_count(), 2);
                assert!(waves[0].occupancy.is_occupied(1, 4, 1));
                assert!(waves[1].occupancy.is_occupied(1, 5, 0));
            }
            other => panic!("unexpected slice {}", other.name()),
        }
    }
}
