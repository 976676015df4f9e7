//! Piece and offset primitives
//!
//! A [`Piece`] is a dense local block array (`PANES x rows x cols`) with a
//! cached bounding box. It is positioned on a [`crate::Grid`] by an
//! [`Offset`]: local cell (row, col) lands on grid cell
//! (offset.y + row, offset.x + col).

use serde::{Deserialize, Serialize};

use crate::types::{block, PieceKind, PANES};

/// Integer placement of a piece's local origin on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
}

impl Offset {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Inclusive bounding box in local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub min_row: i32,
    pub min_col: i32,
    pub max_row: i32,
    pub max_col: i32,
}

impl Bounds {
    pub fn width(&self) -> i32 {
        self.max_col - self.min_col + 1
    }

    pub fn height(&self) -> i32 {
        self.max_row - self.min_row + 1
    }
}

/// A movable shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    /// None for anonymous fragments (components, chunks) and empty slots
    pub kind: Option<PieceKind>,
    pub rotation: u8,
    pub default_rotation: u8,
    rows: usize,
    cols: usize,
    blocks: Vec<u8>,
    bounds: Option<Bounds>,
}

impl Default for Piece {
    fn default() -> Self {
        Self::empty()
    }
}

impl Piece {
    /// A piece with no kind and no blocks
    pub fn empty() -> Self {
        Self {
            kind: None,
            rotation: 0,
            default_rotation: 0,
            rows: 0,
            cols: 0,
            blocks: Vec::new(),
            bounds: None,
        }
    }

    /// An empty piece whose block buffer can hold `rows x cols` without reallocating
    pub fn with_capacity(rows: usize, cols: usize) -> Self {
        let mut piece = Self::empty();
        piece.blocks.reserve(PANES * rows * cols);
        piece
    }

    /// Resize the local array to `rows x cols`, all empty, and forget the kind
    pub fn reset(&mut self, rows: usize, cols: usize) {
        self.kind = None;
        self.rotation = 0;
        self.default_rotation = 0;
        self.rows = rows;
        self.cols = cols;
        self.blocks.clear();
        self.blocks.resize(PANES * rows * cols, block::EMPTY);
        self.bounds = None;
    }

    /// Empty the block array, keeping kind and rotation
    pub fn clear_blocks(&mut self) {
        self.blocks.fill(block::EMPTY);
        self.bounds = None;
    }

    #[inline(always)]
    fn index(&self, pane: usize, row: i32, col: i32) -> Option<usize> {
        if pane >= PANES
            || row < 0
            || col < 0
            || row as usize >= self.rows
            || col as usize >= self.cols
        {
            return None;
        }
        Some(pane * self.rows * self.cols + row as usize * self.cols + col as usize)
    }

    pub fn local_rows(&self) -> usize {
        self.rows
    }

    pub fn local_cols(&self) -> usize {
        self.cols
    }

    /// Code at a local cell; EMPTY outside the local array
    pub fn get(&self, pane: usize, row: i32, col: i32) -> u8 {
        self.index(pane, row, col)
            .map(|idx| self.blocks[idx])
            .unwrap_or(block::EMPTY)
    }

    /// Set a local cell, keeping the bounding box current.
    ///
    /// Returns false if the cell is outside the local array.
    pub fn set(&mut self, pane: usize, row: i32, col: i32, code: u8) -> bool {
        let Some(idx) = self.index(pane, row, col) else {
            return false;
        };
        let previous = self.blocks[idx];
        self.blocks[idx] = code;
        if code != block::EMPTY {
            self.bounds = Some(match self.bounds {
                Some(b) => Bounds {
                    min_row: b.min_row.min(row),
                    min_col: b.min_col.min(col),
                    max_row: b.max_row.max(row),
                    max_col: b.max_col.max(col),
                },
                None => Bounds {
                    min_row: row,
                    min_col: col,
                    max_row: row,
                    max_col: col,
                },
            });
        } else if previous != block::EMPTY {
            self.recompute_bounds();
        }
        true
    }

    /// Recompute the cached bounding box from the block array
    pub fn recompute_bounds(&mut self) {
        let mut bounds: Option<Bounds> = None;
        for (_, row, col, _) in self.cells() {
            bounds = Some(match bounds {
                Some(b) => Bounds {
                    min_row: b.min_row.min(row),
                    min_col: b.min_col.min(col),
                    max_row: b.max_row.max(row),
                    max_col: b.max_col.max(col),
                },
                None => Bounds {
                    min_row: row,
                    min_col: col,
                    max_row: row,
                    max_col: col,
                },
            });
        }
        self.bounds = bounds;
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// No blocks at all
    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    /// Copy every value from `other`, reusing this piece's allocation
    pub fn take_values_from(&mut self, other: &Piece) {
        self.kind = other.kind;
        self.rotation = other.rotation;
        self.default_rotation = other.default_rotation;
        self.rows = other.rows;
        self.cols = other.cols;
        self.blocks.clear();
        self.blocks.extend_from_slice(&other.blocks);
        self.bounds = other.bounds;
    }

    /// Non-empty cells as `(pane, row, col, code)` in local coordinates
    pub fn cells(&self) -> impl Iterator<Item = (usize, i32, i32, u8)> + '_ {
        let rows = self.rows;
        let cols = self.cols;
        self.blocks
            .iter()
            .enumerate()
            .filter(|&(_, &code)| code != block::EMPTY)
            .map(move |(idx, &code)| {
                let pane = idx / (rows * cols);
                let rem = idx % (rows * cols);
                (pane, (rem / cols) as i32, (rem % cols) as i32, code)
            })
    }

    pub fn block_count(&self) -> usize {
        self.blocks.iter().filter(|&&c| c != block::EMPTY).count()
    }

    /// Width of the bounding box (0 when empty)
    pub fn width(&self) -> i32 {
        self.bounds.map(|b| b.width()).unwrap_or(0)
    }

    /// Height of the bounding box (0 when empty)
    pub fn height(&self) -> i32 {
        self.bounds.map(|b| b.height()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_track_set_and_clear() {
        let mut piece = Piece::empty();
        piece.reset(4, 4);
        assert!(piece.is_empty());

        piece.set(0, 1, 1, block::S0);
        piece.set(1, 2, 3, block::S1);
        assert_eq!(
            piece.bounds(),
            Some(Bounds {
                min_row: 1,
                min_col: 1,
                max_row: 2,
                max_col: 3
            })
        );

        piece.set(1, 2, 3, block::EMPTY);
        assert_eq!(piece.width(), 1);
        assert_eq!(piece.height(), 1);
    }

    #[test]
    fn test_take_values_from_reuses_buffer() {
        let mut source = Piece::empty();
        source.reset(3, 3);
        source.set(0, 0, 0, block::S0);
        source.rotation = 2;

        let mut target = Piece::with_capacity(8, 8);
        target.take_values_from(&source);
        assert_eq!(target, source);
    }

    #[test]
    fn test_cells_iterates_non_empty_only() {
        let mut piece = Piece::empty();
        piece.reset(2, 3);
        piece.set(0, 0, 2, block::S0);
        piece.set(1, 1, 0, block::S1);
        let cells: Vec<_> = piece.cells().collect();
        assert_eq!(cells, vec![(0, 0, 2, block::S0), (1, 1, 0, block::S1)]);
        assert_eq!(piece.block_count(), 2);
    }

    #[test]
    fn test_out_of_range_set_is_rejected() {
        let mut piece = Piece::empty();
        piece.reset(2, 2);
        assert!(!piece.set(0, 2, 0, block::S0));
        assert!(!piece.set(2, 0, 0, block::S0));
        assert_eq!(piece.get(0, 5, 5), block::EMPTY);
    }
}
