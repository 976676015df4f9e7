//! Grid module - the two-pane block field
//!
//! The grid is `PANES x rows x cols` bytes, one block code per cell.
//! Uses a flat vector allocated once at construction; every later copy
//! reuses that allocation.
//! Coordinates: (pane, row, col) where row 0 is the bottom of the field and
//! col 0 is the left wall.

use serde::{Deserialize, Serialize};

use crate::types::{block, PANES};

/// The block field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    /// Flat array of cells, pane-major then row-major (pane * rows * cols + row * cols + col)
    cells: Vec<u8>,
}

impl Grid {
    /// Create a new empty grid
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![block::EMPTY; PANES * rows * cols],
        }
    }

    /// Calculate flat index from coordinates
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
        Some(pane * self.rows * self.cols + (row as usize) * self.cols + col as usize)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether (row, col) lies inside the field
    pub fn in_bounds(&self, row: i32, col: i32) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols
    }

    /// Get the code at a cell; None if out of bounds
    pub fn get(&self, pane: usize, row: i32, col: i32) -> Option<u8> {
        self.index(pane, row, col).map(|idx| self.cells[idx])
    }

    /// Set the code at a cell; returns false if out of bounds
    pub fn set(&mut self, pane: usize, row: i32, col: i32, code: u8) -> bool {
        match self.index(pane, row, col) {
            Some(idx) => {
                self.cells[idx] = code;
                true
            }
            None => false,
        }
    }

    /// In bounds and empty
    pub fn is_empty_at(&self, pane: usize, row: i32, col: i32) -> bool {
        matches!(self.get(pane, row, col), Some(block::EMPTY))
    }

    /// In bounds and filled
    pub fn is_occupied(&self, pane: usize, row: i32, col: i32) -> bool {
        matches!(self.get(pane, row, col), Some(code) if code != block::EMPTY)
    }

    /// Overwrite this grid with `other`.
    ///
    /// Reuses the existing allocation when the dimensions match.
    pub fn copy_from(&mut self, other: &Grid) {
        self.rows = other.rows;
        self.cols = other.cols;
        self.cells.clone_from(&other.cells);
    }

    /// Empty every cell
    pub fn clear(&mut self) {
        self.cells.fill(block::EMPTY);
    }

    /// Empty one row in both panes
    pub fn clear_row(&mut self, row: usize) {
        if row >= self.rows {
            return;
        }
        for pane in 0..PANES {
            let start = pane * self.rows * self.cols + row * self.cols;
            self.cells[start..start + self.cols].fill(block::EMPTY);
        }
    }

    /// The codes of one pane's row
    pub fn pane_row(&self, pane: usize, row: usize) -> &[u8] {
        let start = pane * self.rows * self.cols + row * self.cols;
        &self.cells[start..start + self.cols]
    }

    /// Check if a pane's row is completely filled
    pub fn is_row_full(&self, pane: usize, row: usize) -> bool {
        if pane >= PANES || row >= self.rows {
            return false;
        }
        self.pane_row(pane, row).iter().all(|&c| c != block::EMPTY)
    }

    /// Check if a row is empty in both panes
    pub fn is_row_empty(&self, row: usize) -> bool {
        if row >= self.rows {
            return true;
        }
        (0..PANES).all(|pane| self.pane_row(pane, row).iter().all(|&c| c == block::EMPTY))
    }

    /// Number of rows holding at least one block
    pub fn occupied_rows(&self) -> usize {
        (0..self.rows).filter(|&row| !self.is_row_empty(row)).count()
    }

    /// One past the highest occupied row (0 for an empty grid)
    pub fn height(&self) -> usize {
        (0..self.rows)
            .rev()
            .find(|&row| !self.is_row_empty(row))
            .map(|row| row + 1)
            .unwrap_or(0)
    }

    /// One past the highest occupied cell in a column, across both panes
    pub fn column_height(&self, col: i32) -> usize {
        (0..self.rows as i32)
            .rev()
            .find(|&row| (0..PANES).any(|pane| self.is_occupied(pane, row, col)))
            .map(|row| row as usize + 1)
            .unwrap_or(0)
    }

    /// Total number of filled cells across both panes
    pub fn block_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != block::EMPTY).count()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|&c| c == block::EMPTY)
    }

    /// Shift every row up by `n`, emptying the bottom `n` rows.
    ///
    /// Returns true if any block was pushed out of the top.
    pub fn shift_up(&mut self, n: usize) -> bool {
        if n == 0 {
            return false;
        }
        let overflow = (self.rows.saturating_sub(n)..self.rows).any(|row| !self.is_row_empty(row));
        let width = self.cols;
        for pane in 0..PANES {
            let base = pane * self.rows * width;
            for row in (0..self.rows).rev() {
                let dst = base + row * width;
                if row >= n {
                    let src = base + (row - n) * width;
                    self.cells.copy_within(src..src + width, dst);
                } else {
                    self.cells[dst..dst + width].fill(block::EMPTY);
                }
            }
        }
        overflow
    }

    /// Remove the rows of `pane` picked by `removed`, dropping the rows above
    /// each one down to close the gap. Rows are tested by their index before
    /// the collapse. Returns the number of rows removed.
    pub fn collapse_rows<F>(&mut self, pane: usize, removed: F) -> usize
    where
        F: Fn(usize) -> bool,
    {
        if pane >= PANES {
            return 0;
        }
        let width = self.cols;
        let base = pane * self.rows * width;
        let mut kept = 0;
        for row in 0..self.rows {
            if removed(row) {
                continue;
            }
            if kept != row {
                let src = base + row * width;
                self.cells.copy_within(src..src + width, base + kept * width);
            }
            kept += 1;
        }
        self.cells[base + kept * width..base + self.rows * width].fill(block::EMPTY);
        self.rows - kept
    }

    /// Swap the contents of the two panes
    pub fn swap_panes(&mut self) {
        let pane_len = self.rows * self.cols;
        let (first, second) = self.cells.split_at_mut(pane_len);
        first.swap_with_slice(&mut second[..pane_len]);
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Build a grid from text rows, top row first.
    ///
    /// `.` is empty, `0` fills pane 0, `1` fills pane 1, `#` fills both panes.
    pub fn from_ascii(cols: usize, lines: &[&str]) -> Self {
        let rows = lines.len();
        let mut grid = Grid::new(rows, cols);
        for (i, line) in lines.iter().enumerate() {
            let row = (rows - 1 - i) as i32;
            for (col, ch) in line.chars().take(cols).enumerate() {
                let col = col as i32;
                match ch {
                    '0' => {
                        grid.set(0, row, col, block::S0);
                    }
                    '1' => {
                        grid.set(1, row, col, block::S1);
                    }
                    '#' => {
                        grid.set(0, row, col, block::S0);
                        grid.set(1, row, col, block::S1);
                    }
                    _ => {}
                }
            }
        }
        grid
    }

    /// Render as text rows, top row first (inverse of `from_ascii`)
    pub fn to_ascii(&self) -> Vec<String> {
        (0..self.rows as i32)
            .rev()
            .map(|row| {
                (0..self.cols as i32)
                    .map(|col| {
                        match (self.is_occupied(0, row, col), self.is_occupied(1, row, col)) {
                            (true, true) => '#',
                            (true, false) => '0',
                            (false, true) => '1',
                            (false, false) => '.',
                        }
                    })
                    .collect()
            })
            .collect()
    }
}
