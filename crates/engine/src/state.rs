//! The serializable game aggregate
//!
//! [`GameState`] is everything the state machine owns: the grids, every
//! piece pool with its offsets, the current state and the per-cycle
//! counters. Piece pools are sized once at construction and overwritten in
//! place afterwards.

use serde::{Deserialize, Serialize};

use duoblock_core::types::{
    GameEvents, Lean, Period, State, MAX_CHUNKS, MAX_COLS, MAX_COMPONENTS, NEXT_LOOKAHEAD,
    RESERVE_LOOKAHEAD,
};
use duoblock_core::{Grid, Offset, Piece};

/// Local box edge every standard piece fits in
const PIECE_BOX: usize = 4;

/// A pool of pieces positioned on the grid, with their offsets from before
/// the last gravity pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiecePool {
    pub pieces: Vec<Piece>,
    pub offsets: Vec<Offset>,
    pub original_offsets: Vec<Offset>,
    /// Live entries at the front of the pool
    pub count: usize,
}

impl PiecePool {
    pub fn new(capacity: usize, rows: usize, cols: usize) -> Self {
        Self {
            pieces: (0..capacity).map(|_| Piece::with_capacity(rows, cols)).collect(),
            offsets: vec![Offset::default(); capacity],
            original_offsets: vec![Offset::default(); capacity],
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.pieces.len()
    }

    /// Remember the current offsets of the live entries
    pub fn mark_original(&mut self) {
        let n = self.count;
        self.original_offsets[..n].copy_from_slice(&self.offsets[..n]);
    }

    /// Largest fall of a live entry since `mark_original`
    pub fn max_fall(&self) -> i32 {
        (0..self.count)
            .map(|i| self.original_offsets[i].y - self.offsets[i].y)
            .max()
            .unwrap_or(0)
    }

    pub fn live(&self) -> impl Iterator<Item = (&Piece, Offset, Offset)> + '_ {
        (0..self.count).map(move |i| (&self.pieces[i], self.original_offsets[i], self.offsets[i]))
    }
}

/// Everything the state machine owns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub period: Period,
    pub state: State,
    /// Where progression returns when nothing is left to clear
    pub state_after_progression: State,

    pub grid: Grid,
    /// Snapshot before the last clear, push or metamorphosis; chunk floor during chunk falls
    pub grid_before: Grid,
    /// Only the cells the last clear removed
    pub grid_inverse_clear: Grid,

    /// The falling piece; empty between cycles
    pub piece: Piece,
    pub offset: Offset,
    pub next: [Piece; NEXT_LOOKAHEAD],
    /// FIFO, front first
    pub reserve: [Piece; RESERVE_LOOKAHEAD],
    /// Holds the outgoing piece while a reserve exchange is tried
    pub exchange: Piece,

    pub components: PiecePool,
    pub chunks: PiecePool,

    /// Chromatic clear flags per row
    pub clear_flags: Vec<u8>,
    /// Monochrome clear flags per row
    pub monochrome_flags: Vec<u8>,
    pub clear_pending: bool,

    pub rows_pushed: u32,
    /// Garbage blocks waiting for a chunk pass, per `DropKind::index`
    pub blocks_for_valleys: [u32; 5],
    /// (col, row) pairs to lift in the next chunk pass
    pub unlock_columns: Vec<(i32, i32)>,
    /// -1 until the first clear of a cycle
    pub clear_cascade: i32,

    pub reserve_queued: bool,
    pub reserve_queued_lean: Lean,
    pub used_reserve: bool,
    pub lock_cancelled: bool,
    pub metamorphosis_after_lock: Option<bool>,
    pub metamorphosis_before_end_cycle: Option<bool>,
    pub end_cycle_notified: bool,

    pub events_last_tick: GameEvents,
    /// Significant events fired and not yet acknowledged
    pub unacknowledged: GameEvents,
    /// Most recent animated event, for slice selection
    pub last_animated: GameEvents,

    pub cycle: u64,
    pub seconds: f64,
}

impl GameState {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            period: Period::Prestart,
            state: State::Initializing,
            state_after_progression: State::EndingCycle,
            grid: Grid::new(rows, cols),
            grid_before: Grid::new(rows, cols),
            grid_inverse_clear: Grid::new(rows, cols),
            piece: Piece::with_capacity(PIECE_BOX, PIECE_BOX),
            offset: Offset::default(),
            next: std::array::from_fn(|_| Piece::with_capacity(PIECE_BOX, PIECE_BOX)),
            reserve: std::array::from_fn(|_| Piece::with_capacity(PIECE_BOX, PIECE_BOX)),
            exchange: Piece::with_capacity(PIECE_BOX, PIECE_BOX),
            components: PiecePool::new(MAX_COMPONENTS, PIECE_BOX, PIECE_BOX),
            chunks: PiecePool::new(MAX_CHUNKS, rows, cols),
            clear_flags: vec![0; rows],
            monochrome_flags: vec![0; rows],
            clear_pending: false,
            rows_pushed: 0,
            blocks_for_valleys: [0; 5],
            unlock_columns: Vec::with_capacity(MAX_COLS),
            clear_cascade: -1,
            reserve_queued: false,
            reserve_queued_lean: Lean::None,
            used_reserve: false,
            lock_cancelled: false,
            metamorphosis_after_lock: None,
            metamorphosis_before_end_cycle: None,
            end_cycle_notified: false,
            events_last_tick: GameEvents::empty(),
            unacknowledged: GameEvents::empty(),
            last_animated: GameEvents::empty(),
            cycle: 0,
            seconds: 0.0,
        }
    }

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    /// Number of pieces waiting in the reserve
    pub fn reserve_len(&self) -> usize {
        self.reserve.iter().take_while(|p| !p.is_empty()).count()
    }

    pub fn blocks_pending(&self) -> bool {
        self.blocks_for_valleys.iter().any(|&n| n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duoblock_core::types::block;

    #[test]
    fn test_new_state_sizes_pools() {
        let state = GameState::new(16, 8);
        assert_eq!(state.components.capacity(), MAX_COMPONENTS);
        assert_eq!(state.chunks.capacity(), MAX_CHUNKS);
        assert_eq!(state.clear_flags.len(), 16);
        assert_eq!(state.clear_cascade, -1);
        assert_eq!(state.reserve_len(), 0);
        assert_eq!(state.state, State::Initializing);
    }

    #[test]
    fn test_pool_max_fall() {
        let mut pool = PiecePool::new(3, 4, 4);
        pool.count = 2;
        pool.offsets[0] = Offset::new(0, 5);
        pool.offsets[1] = Offset::new(2, 7);
        pool.mark_original();
        pool.offsets[0].y = 1;
        pool.offsets[1].y = 6;
        assert_eq!(pool.max_fall(), 4);
        assert_eq!(pool.live().count(), 2);
    }

    #[test]
    fn test_state_json_roundtrip() {
        let mut state = GameState::new(6, 4);
        state.grid.set(1, 0, 2, block::S1);
        state.reserve[0].reset(1, 1);
        state.reserve[0].set(0, 0, 0, block::S0);
        state.unlock_columns.push((2, 1));
        let json = serde_json::to_string(&state).unwrap();
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
        assert_eq!(back.reserve_len(), 1);
    }
}
