//! Minimal occupancy rules used by the unit tests of this crate

use crate::systems::{Collision, GravityCapabilities, Kick, Lock, Rotation};
use crate::types::{block, PieceKind, PANES};
use crate::{CoreError, Grid, Offset, Piece};

/// Same-pane occupancy collision with a solid floor and side walls
pub struct Occupancy;

impl Occupancy {
    fn blocked(&self, grid: &Grid, piece: &Piece, offset: Offset, floor: bool) -> bool {
        piece.cells().any(|(pane, r, c, _)| {
            let row = offset.y + r;
            let col = offset.x + c;
            if col < 0 || col >= grid.cols() as i32 {
                return true;
            }
            if row < 0 {
                return floor;
            }
            grid.is_occupied(pane, row, col)
        })
    }
}

impl Collision for Occupancy {
    fn collides(&self, grid: &Grid, piece: &Piece, offset: Offset) -> bool {
        self.blocked(grid, piece, offset, true)
    }

    fn space_below(&self, grid: &Grid, piece: &Piece, offset: Offset, use_wall_as_floor: bool) -> i32 {
        if piece.is_empty() {
            return 0;
        }
        let limit = offset.y + piece.bounds().map(|b| b.max_row).unwrap_or(0) + 1;
        let mut distance = 0;
        while distance < limit
            && !self.blocked(grid, piece, offset.translated(0, -(distance + 1)), use_wall_as_floor)
        {
            distance += 1;
        }
        distance
    }

    fn within(&self, grid: &Grid, piece: &Piece, offset: Offset) -> bool {
        piece.cells().all(|(_, r, c, _)| {
            let col = offset.x + c;
            col >= 0 && col < grid.cols() as i32 && offset.y + r >= 0
        })
    }

    fn codes_collide(&self, _pane: usize, a: u8, b: u8) -> bool {
        a != block::EMPTY && b != block::EMPTY
    }
}

impl GravityCapabilities for Occupancy {
    fn lock_preserves_identity(&self) -> bool {
        true
    }

    fn only_identical_codes_collide(&self) -> bool {
        true
    }
}

impl Lock for Occupancy {
    fn lock(&self, grid: &mut Grid, piece: &Piece, offset: Offset) -> Result<(), CoreError> {
        for (pane, r, c, code) in piece.cells() {
            let row = offset.y + r;
            let col = offset.x + c;
            if grid.is_occupied(pane, row, col) {
                return Err(CoreError::OrientationConflict { pane, row, col });
            }
            grid.set(pane, row, col, code);
        }
        Ok(())
    }

    fn unlock_piece(&mut self, _: &Piece, _: Offset, _: &mut [Piece], _: &mut [Offset]) -> usize {
        0
    }

    fn unlock_grid(&mut self, _: &mut Grid, _: &mut [Piece], _: &mut [Offset], start: usize) -> usize {
        start
    }

    fn unlock_column_above(
        &mut self,
        _: &mut Grid,
        _: i32,
        _: i32,
        _: &mut [Piece],
        _: &mut [Offset],
        start: usize,
    ) -> usize {
        start
    }
}

/// Tries the lean direction, then straight up
pub struct NudgeKick;

impl Kick for NudgeKick {
    fn kick(
        &self,
        collision: &dyn Collision,
        grid: &Grid,
        piece: &Piece,
        offset: &mut Offset,
        lean: (i32, i32),
    ) -> bool {
        for (dx, dy) in [(0, 0), lean, (0, 1)] {
            let candidate = offset.translated(dx, dy);
            if !collision.collides(grid, piece, candidate) {
                *offset = candidate;
                return true;
            }
        }
        false
    }
}

/// Quarter turns of a square local array
pub struct SquareTurns;

impl SquareTurns {
    fn rotate(piece: &mut Piece, quarter_turns: u8) {
        let n = piece.local_rows() as i32;
        for _ in 0..quarter_turns % 4 {
            let source = piece.clone();
            piece.clear_blocks();
            for (pane, r, c, code) in source.cells() {
                piece.set(pane, n - 1 - c, r, code);
            }
        }
        piece.rotation = (piece.rotation + quarter_turns) % 4;
    }
}

impl Rotation for SquareTurns {
    fn prepare(&self, piece: &mut Piece, kind: PieceKind) -> Result<(), CoreError> {
        piece.reset(3, 3);
        piece.kind = Some(kind);
        for pane in 0..PANES {
            if kind.variant.fills(pane) {
                // T shape
                for (r, c) in [(1, 0), (1, 1), (1, 2), (2, 1)] {
                    piece.set(pane, r, c, block::pane_code(pane));
                }
            }
        }
        Ok(())
    }

    fn turn_cw(&self, piece: &mut Piece) -> Result<(), CoreError> {
        Self::rotate(piece, 1);
        Ok(())
    }

    fn turn_ccw(&self, piece: &mut Piece) -> Result<(), CoreError> {
        Self::rotate(piece, 3);
        Ok(())
    }

    fn turn_180(&self, piece: &mut Piece) -> Result<(), CoreError> {
        Self::rotate(piece, 2);
        Ok(())
    }

    fn flip_vertical(&self, piece: &mut Piece) -> Result<(), CoreError> {
        Self::rotate(piece, 2);
        Ok(())
    }

    fn turn_0(&self, piece: &mut Piece) -> Result<(), CoreError> {
        let back = (4 - piece.rotation % 4) % 4;
        Self::rotate(piece, back);
        Ok(())
    }

    fn undo_turn(&self, piece: &mut Piece, previous_rotation: u8) -> Result<(), CoreError> {
        let back = (4 + previous_rotation % 4 - piece.rotation % 4) % 4;
        Self::rotate(piece, back);
        Ok(())
    }

    fn turn_minimum_horizontal_profile(&self, piece: &mut Piece) -> Result<(), CoreError> {
        self.turn_0(piece)
    }
}

/// A piece of `rows x cols` local cells built from text, top row first
pub fn piece_from_ascii(lines: &[&str]) -> Piece {
    let cols = lines.iter().map(|l| l.len()).max().unwrap_or(0);
    let grid = Grid::from_ascii(cols, lines);
    let mut piece = Piece::empty();
    piece.reset(grid.rows(), cols);
    for pane in 0..PANES {
        for row in 0..grid.rows() as i32 {
            for col in 0..cols as i32 {
                if let Some(code) = grid.get(pane, row, col) {
                    if code != block::EMPTY {
                        piece.set(pane, row, col, code);
                    }
                }
            }
        }
    }
    piece
}
