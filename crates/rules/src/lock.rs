//! Lock module - writing pieces into the grid and splitting it back apart
//!
//! Two cells are connected when they are orthogonal neighbours in one pane, or
//! the two panes of the same (row, col). A group of connected cells is the
//! unit that falls.

use log::trace;

use duoblock_core::types::{block, PANES};
use duoblock_core::{CoreError, GravityCapabilities, Grid, Lock, Offset, Piece};

const UNLABELED: u16 = 0;

/// Standard lock with preallocated labelling scratch
#[derive(Debug, Clone)]
pub struct StandardLock {
    labels: Vec<u16>,
    stack: Vec<(usize, i32, i32)>,
}

impl StandardLock {
    /// Scratch sized for a `rows x cols` grid
    pub fn new(rows: usize, cols: usize) -> Self {
        let cells = PANES * rows * cols;
        Self {
            labels: vec![UNLABELED; cells],
            stack: Vec::with_capacity(cells),
        }
    }

    fn reserve(&mut self, rows: usize, cols: usize) {
        let cells = PANES * rows * cols;
        if self.labels.len() < cells {
            self.labels.resize(cells, UNLABELED);
        }
        if self.stack.capacity() < cells {
            self.stack.reserve(cells - self.stack.len());
        }
    }

    /// Label connected groups of `occupied` cells over a `rows x cols` field.
    ///
    /// Returns the number of groups; labels run from 1.
    fn label<F>(&mut self, rows: usize, cols: usize, occupied: F) -> u16
    where
        F: Fn(usize, i32, i32) -> bool,
    {
        self.reserve(rows, cols);
        let cells = PANES * rows * cols;
        let labels = &mut self.labels[..cells];
        labels.fill(UNLABELED);
        let index = |pane: usize, row: i32, col: i32| -> usize {
            pane * rows * cols + row as usize * cols + col as usize
        };

        let mut count: u16 = 0;
        for pane in 0..PANES {
            for row in 0..rows as i32 {
                for col in 0..cols as i32 {
                    if labels[index(pane, row, col)] != UNLABELED || !occupied(pane, row, col) {
                        continue;
                    }
                    count += 1;
                    labels[index(pane, row, col)] = count;
                    self.stack.clear();
                    self.stack.push((pane, row, col));

                    while let Some((p, r, c)) = self.stack.pop() {
                        let neighbours = [
                            (p, r - 1, c),
                            (p, r + 1, c),
                            (p, r, c - 1),
                            (p, r, c + 1),
                            (1 - p, r, c),
                        ];
                        for (np, nr, nc) in neighbours {
                            if nr < 0 || nc < 0 || nr >= rows as i32 || nc >= cols as i32 {
                                continue;
                            }
                            let idx = index(np, nr, nc);
                            if labels[idx] == UNLABELED && occupied(np, nr, nc) {
                                labels[idx] = count;
                                self.stack.push((np, nr, nc));
                            }
                        }
                    }
                }
            }
        }
        count
    }

    /// Bounding box of one label as (min_row, min_col, max_row, max_col)
    fn label_bounds(&self, rows: usize, cols: usize, label: u16) -> Option<(i32, i32, i32, i32)> {
        let mut bounds: Option<(i32, i32, i32, i32)> = None;
        for (idx, &l) in self.labels[..PANES * rows * cols].iter().enumerate() {
            if l != label {
                continue;
            }
            let rem = idx % (rows * cols);
            let row = (rem / cols) as i32;
            let col = (rem % cols) as i32;
            bounds = Some(match bounds {
                Some((r0, c0, r1, c1)) => (r0.min(row), c0.min(col), r1.max(row), c1.max(col)),
                None => (row, col, row, col),
            });
        }
        bounds
    }

    /// Copy the cells of `label` out of a field into `out`
    fn extract<G>(
        &self,
        rows: usize,
        cols: usize,
        label: u16,
        bounds: (i32, i32, i32, i32),
        code_at: G,
        out: &mut Piece,
    ) where
        G: Fn(usize, i32, i32) -> u8,
    {
        let (min_row, min_col, max_row, max_col) = bounds;
        out.reset((max_row - min_row + 1) as usize, (max_col - min_col + 1) as usize);
        for (idx, &l) in self.labels[..PANES * rows * cols].iter().enumerate() {
            if l != label {
                continue;
            }
            let pane = idx / (rows * cols);
            let rem = idx % (rows * cols);
            let row = (rem / cols) as i32;
            let col = (rem % cols) as i32;
            out.set(pane, row - min_row, col - min_col, code_at(pane, row, col));
        }
    }
}

impl GravityCapabilities for StandardLock {
    fn lock_preserves_identity(&self) -> bool {
        true
    }

    fn only_identical_codes_collide(&self) -> bool {
        true
    }
}

impl Lock for StandardLock {
    /// Cells above the top row are discarded
    fn lock(&self, grid: &mut Grid, piece: &Piece, offset: Offset) -> Result<(), CoreError> {
        let rows = grid.rows() as i32;
        let cols = grid.cols() as i32;
        for (pane, r, c, _) in piece.cells() {
            let row = offset.y + r;
            let col = offset.x + c;
            if row < 0 || col < 0 || col >= cols {
                return Err(CoreError::InvalidPiece(format!(
                    "lock outside the grid at row {}, column {}",
                    row, col
                )));
            }
            if row < rows && grid.is_occupied(pane, row, col) {
                return Err(CoreError::OrientationConflict { pane, row, col });
            }
        }
        for (pane, r, c, code) in piece.cells() {
            grid.set(pane, offset.y + r, offset.x + c, code);
        }
        Ok(())
    }

    fn unlock_piece(
        &mut self,
        piece: &Piece,
        offset: Offset,
        out: &mut [Piece],
        out_offsets: &mut [Offset],
    ) -> usize {
        let rows = piece.local_rows();
        let cols = piece.local_cols();
        let groups = self.label(rows, cols, |pane, row, col| {
            piece.get(pane, row, col) != block::EMPTY
        }) as usize;

        let count = groups.min(out.len()).min(out_offsets.len());
        for i in 0..count {
            let label = (i + 1) as u16;
            let Some(bounds) = self.label_bounds(rows, cols, label) else {
                continue;
            };
            self.extract(
                rows,
                cols,
                label,
                bounds,
                |pane, row, col| piece.get(pane, row, col),
                &mut out[i],
            );
            out_offsets[i] = offset.translated(bounds.1, bounds.0);
        }
        count
    }

    fn unlock_grid(
        &mut self,
        grid: &mut Grid,
        out: &mut [Piece],
        out_offsets: &mut [Offset],
        start: usize,
    ) -> usize {
        let rows = grid.rows();
        let cols = grid.cols();
        let groups = {
            let field: &Grid = grid;
            self.label(rows, cols, |pane, row, col| field.is_occupied(pane, row, col))
        };

        let capacity = out.len().min(out_offsets.len());
        let mut count = start;
        for label in 1..=groups {
            if count >= capacity {
                break;
            }
            let Some(bounds) = self.label_bounds(rows, cols, label) else {
                continue;
            };
            // resting on the floor
            if bounds.0 == 0 {
                continue;
            }
            {
                let field: &Grid = grid;
                self.extract(
                    rows,
                    cols,
                    label,
                    bounds,
                    |pane, row, col| field.get(pane, row, col).unwrap_or(block::EMPTY),
                    &mut out[count],
                );
            }
            out_offsets[count] = Offset::new(bounds.1, bounds.0);
            for (idx, &l) in self.labels[..PANES * rows * cols].iter().enumerate() {
                if l == label {
                    let pane = idx / (rows * cols);
                    let rem = idx % (rows * cols);
                    grid.set(pane, (rem / cols) as i32, (rem % cols) as i32, block::EMPTY);
                }
            }
            count += 1;
        }
        if count > start {
            trace!("unlocked {} floating groups out of {}", count - start, groups);
        }
        count
    }

    fn unlock_column_above(
        &mut self,
        grid: &mut Grid,
        col: i32,
        row: i32,
        out: &mut [Piece],
        out_offsets: &mut [Offset],
        start: usize,
    ) -> usize {
        let rows = grid.rows() as i32;
        let capacity = out.len().min(out_offsets.len());
        if col < 0 || col >= grid.cols() as i32 {
            return start;
        }
        let filled = |grid: &Grid, r: i32| (0..PANES).any(|pane| grid.is_occupied(pane, r, col));

        let mut count = start;
        let mut r = row.max(0);
        while r < rows && count < capacity {
            if !filled(grid, r) {
                r += 1;
                continue;
            }
            let run_start = r;
            while r < rows && filled(grid, r) {
                r += 1;
            }
            let piece = &mut out[count];
            piece.reset((r - run_start) as usize, 1);
            for run_row in run_start..r {
                for pane in 0..PANES {
                    let code = grid.get(pane, run_row, col).unwrap_or(block::EMPTY);
                    if code != block::EMPTY {
                        piece.set(pane, run_row - run_start, 0, code);
                        grid.set(pane, run_row, col, block::EMPTY);
                    }
                }
            }
            out_offsets[count] = Offset::new(col, run_start);
            count += 1;
        }
        count
    }
}
