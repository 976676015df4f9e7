//! Rotation module - tetromino shape tables
//!
//! Shapes are laid out in a 4x4 local box, row 0 at the bottom. Rotation
//! states 0-3 are quarter turns clockwise (N, E, S, W); states 4-7 are the
//! same four states mirrored top to bottom.

use duoblock_core::types::{block, PieceKind, Shape, PANES};
use duoblock_core::{CoreError, Piece, Rotation};

/// Local box edge
pub const BOX: usize = 4;

/// Number of rotation states including the mirrored ones
pub const ROTATION_STATES: u8 = 8;

/// (col, row) of each block, row 0 at the bottom of the box
pub type ShapeCells = [(i32, i32); 4];

/// Convert a top-down (x, y) table row into box coordinates
const fn up(cells: [(i32, i32); 4]) -> ShapeCells {
    let top = BOX as i32 - 1;
    [
        (cells[0].0, top - cells[0].1),
        (cells[1].0, top - cells[1].1),
        (cells[2].0, top - cells[2].1),
        (cells[3].0, top - cells[3].1),
    ]
}

const I_SHAPES: [ShapeCells; 4] = [
    up([(0, 1), (1, 1), (2, 1), (3, 1)]),
    up([(2, 0), (2, 1), (2, 2), (2, 3)]),
    up([(0, 2), (1, 2), (2, 2), (3, 2)]),
    up([(1, 0), (1, 1), (1, 2), (1, 3)]),
];

const O_SHAPES: [ShapeCells; 4] = [up([(1, 0), (2, 0), (1, 1), (2, 1)]); 4];

const T_SHAPES: [ShapeCells; 4] = [
    up([(1, 0), (0, 1), (1, 1), (2, 1)]),
    up([(1, 0), (1, 1), (2, 1), (1, 2)]),
    up([(0, 1), (1, 1), (2, 1), (1, 2)]),
    up([(1, 0), (0, 1), (1, 1), (1, 2)]),
];

const S_SHAPES: [ShapeCells; 4] = [
    up([(1, 0), (2, 0), (0, 1), (1, 1)]),
    up([(1, 0), (1, 1), (2, 1), (2, 2)]),
    up([(1, 1), (2, 1), (0, 2), (1, 2)]),
    up([(0, 0), (0, 1), (1, 1), (1, 2)]),
];

const Z_SHAPES: [ShapeCells; 4] = [
    up([(0, 0), (1, 0), (1, 1), (2, 1)]),
    up([(2, 0), (1, 1), (2, 1), (1, 2)]),
    up([(0, 1), (1, 1), (1, 2), (2, 2)]),
    up([(1, 0), (0, 1), (1, 1), (0, 2)]),
];

const J_SHAPES: [ShapeCells; 4] = [
    up([(0, 0), (0, 1), (1, 1), (2, 1)]),
    up([(1, 0), (2, 0), (1, 1), (1, 2)]),
    up([(0, 1), (1, 1), (2, 1), (2, 2)]),
    up([(1, 0), (1, 1), (0, 2), (1, 2)]),
];

const L_SHAPES: [ShapeCells; 4] = [
    up([(2, 0), (0, 1), (1, 1), (2, 1)]),
    up([(1, 0), (1, 1), (1, 2), (2, 2)]),
    up([(0, 1), (1, 1), (2, 1), (0, 2)]),
    up([(0, 0), (1, 0), (1, 1), (1, 2)]),
];

/// Block cells of `shape` in rotation state `rotation` (0-7)
pub fn shape_cells(shape: Shape, rotation: u8) -> Option<ShapeCells> {
    if rotation >= ROTATION_STATES {
        return None;
    }
    let table = match shape {
        Shape::I => &I_SHAPES,
        Shape::O => &O_SHAPES,
        Shape::T => &T_SHAPES,
        Shape::S => &S_SHAPES,
        Shape::Z => &Z_SHAPES,
        Shape::J => &J_SHAPES,
        Shape::L => &L_SHAPES,
    };
    let mut cells = table[(rotation % 4) as usize];
    if rotation >= 4 {
        let top = BOX as i32 - 1;
        for cell in cells.iter_mut() {
            cell.1 = top - cell.1;
        }
    }
    Some(cells)
}

/// Rotation state reached by a clockwise quarter turn
pub fn clockwise(rotation: u8) -> u8 {
    if rotation < 4 {
        (rotation + 1) % 4
    } else {
        // a mirrored shape turns the other way
        4 + (rotation - 4 + 3) % 4
    }
}

pub fn counter_clockwise(rotation: u8) -> u8 {
    if rotation < 4 {
        (rotation + 3) % 4
    } else {
        4 + (rotation - 4 + 1) % 4
    }
}

pub fn half_turn(rotation: u8) -> u8 {
    if rotation < 4 {
        (rotation + 2) % 4
    } else {
        4 + (rotation - 4 + 2) % 4
    }
}

pub fn mirrored(rotation: u8) -> u8 {
    (rotation + 4) % ROTATION_STATES
}

/// Table-driven rotation for the 21 standard kinds
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRotation;

impl StandardRotation {
    /// Redraw `piece` in `rotation`
    fn draw(&self, piece: &mut Piece, rotation: u8) -> Result<(), CoreError> {
        let kind = piece
            .kind
            .ok_or_else(|| CoreError::InvalidPiece("cannot rotate a piece with no kind".into()))?;
        let cells = shape_cells(kind.shape, rotation).ok_or_else(|| {
            CoreError::InvalidPiece(format!("rotation {} out of range", rotation))
        })?;
        if piece.local_rows() != BOX || piece.local_cols() != BOX {
            piece.reset(BOX, BOX);
            piece.kind = Some(kind);
        } else {
            piece.clear_blocks();
        }
        for pane in 0..PANES {
            if !kind.variant.fills(pane) {
                continue;
            }
            for (col, row) in cells {
                piece.set(pane, row, col, block::pane_code(pane));
            }
        }
        piece.rotation = rotation;
        Ok(())
    }
}

impl Rotation for StandardRotation {
    fn prepare(&self, piece: &mut Piece, kind: PieceKind) -> Result<(), CoreError> {
        piece.reset(BOX, BOX);
        piece.kind = Some(kind);
        piece.default_rotation = 0;
        self.draw(piece, 0)
    }

    fn turn_cw(&self, piece: &mut Piece) -> Result<(), CoreError> {
        self.draw(piece, clockwise(piece.rotation))
    }

    fn turn_ccw(&self, piece: &mut Piece) -> Result<(), CoreError> {
        self.draw(piece, counter_clockwise(piece.rotation))
    }

    fn turn_180(&self, piece: &mut Piece) -> Result<(), CoreError> {
        self.draw(piece, half_turn(piece.rotation))
    }

    fn flip_vertical(&self, piece: &mut Piece) -> Result<(), CoreError> {
        self.draw(piece, mirrored(piece.rotation))
    }

    fn turn_0(&self, piece: &mut Piece) -> Result<(), CoreError> {
        let rotation = piece.default_rotation;
        self.draw(piece, rotation)
    }

    fn undo_turn(&self, piece: &mut Piece, previous_rotation: u8) -> Result<(), CoreError> {
        self.draw(piece, previous_rotation)
    }

    fn turn_minimum_horizontal_profile(&self, piece: &mut Piece) -> Result<(), CoreError> {
        let kind = piece
            .kind
            .ok_or_else(|| CoreError::InvalidPiece("cannot rotate a piece with no kind".into()))?;
        let mut best = 0u8;
        let mut best_profile = (i32::MIN, i32::MIN);
        for rotation in 0..4u8 {
            let Some(cells) = shape_cells(kind.shape, rotation) else {
                continue;
            };
            let min_col = cells.iter().map(|c| c.0).min().unwrap_or(0);
            let max_col = cells.iter().map(|c| c.0).max().unwrap_or(0);
            let min_row = cells.iter().map(|c| c.1).min().unwrap_or(0);
            let max_row = cells.iter().map(|c| c.1).max().unwrap_or(0);
            // widest first, then flattest
            let profile = (max_col - min_col, -(max_row - min_row));
            if profile > best_profile {
                best_profile = profile;
                best = rotation;
            }
        }
        self.draw(piece, best)
    }
}
