//! Gravity resolver - simultaneous fall of disconnected block groups
//!
//! Given `n` pieces that are currently valid at their offsets (and not part of
//! the grid), every piece is moved down as if all of them were released at
//! once onto a solid floor and could land on each other:
//!
//! 1. find the smallest remaining clearance among the falling pieces
//! 2. move every falling piece down by that amount
//! 3. freeze every piece whose clearance was that minimum
//!
//! until nothing is falling. Ties freeze together, which lets two pieces settle
//! side by side in one round.
//!
//! Three strategies compute the same offsets with different bookkeeping. The
//! strategy is chosen once from the lock subsystem's declared capabilities:
//!
//! | Strategy | Requires | Landed pieces become |
//! |----------|----------|----------------------|
//! | `General` | nothing | locked into a scratch grid |
//! | `Efficient` | lock preserves identity | relative-offset comparison targets |
//! | `SuperEfficient` | also only identical codes collide | bits in an occupancy field |
//!
//! All scratch storage is allocated in [`GravityResolver::new`]; `resolve`
//! does not allocate.

use arrayvec::ArrayVec;

use crate::systems::{Collision, GravityCapabilities, Lock};
use crate::types::{MAX_CHUNKS, PANES};
use crate::{CoreError, Grid, Offset, Piece};

/// Which resolver algorithm runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GravityStrategy {
    General,
    Efficient,
    SuperEfficient,
}

impl GravityStrategy {
    /// Strongest strategy the capabilities allow
    pub fn select(capabilities: &dyn GravityCapabilities) -> Self {
        match (
            capabilities.lock_preserves_identity(),
            capabilities.only_identical_codes_collide(),
        ) {
            (true, true) => GravityStrategy::SuperEfficient,
            (true, false) => GravityStrategy::Efficient,
            _ => GravityStrategy::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GravityStrategy::General => "general",
            GravityStrategy::Efficient => "efficient",
            GravityStrategy::SuperEfficient => "super-efficient",
        }
    }
}

/// Resolver with its scratch buffers
#[derive(Debug, Clone)]
pub struct GravityResolver {
    strategy: GravityStrategy,
    rows: usize,
    cols: usize,
    /// Grid plus landed pieces (general)
    scratch: Grid,
    /// Occupancy per (pane, row, col) (super-efficient)
    occupied: Vec<bool>,
}

impl GravityResolver {
    pub fn new(strategy: GravityStrategy, rows: usize, cols: usize) -> Self {
        let (scratch_rows, occupied_len) = match strategy {
            GravityStrategy::General => (rows, 0),
            GravityStrategy::Efficient => (0, 0),
            GravityStrategy::SuperEfficient => (0, PANES * rows * cols),
        };
        Self {
            strategy,
            rows,
            cols,
            scratch: Grid::new(scratch_rows, cols),
            occupied: vec![false; occupied_len],
        }
    }

    pub fn strategy(&self) -> GravityStrategy {
        self.strategy
    }

    /// Settle `pieces` onto `grid`, updating `offsets` in place.
    ///
    /// Empty pieces do not take part and keep their offsets.
    pub fn resolve(
        &mut self,
        collision: &dyn Collision,
        lock: &dyn Lock,
        grid: &Grid,
        pieces: &[Piece],
        offsets: &mut [Offset],
    ) -> Result<(), CoreError> {
        let n = pieces.len();
        if n > MAX_CHUNKS || offsets.len() < n {
            return Err(CoreError::IllegalState(format!(
                "gravity resolver got {} pieces with {} offsets (limit {})",
                n,
                offsets.len(),
                MAX_CHUNKS
            )));
        }
        if grid.rows() != self.rows || grid.cols() != self.cols {
            return Err(CoreError::IllegalState(format!(
                "gravity resolver sized {}x{} used on a {}x{} grid",
                self.rows,
                self.cols,
                grid.rows(),
                grid.cols()
            )));
        }

        let mut falling = [false; MAX_CHUNKS];
        for (i, piece) in pieces.iter().enumerate() {
            falling[i] = !piece.is_empty();
        }

        match self.strategy {
            GravityStrategy::General => {
                self.resolve_general(collision, lock, grid, pieces, offsets, &mut falling)
            }
            GravityStrategy::Efficient => {
                Self::resolve_efficient(collision, grid, pieces, offsets, &mut falling);
                Ok(())
            }
            GravityStrategy::SuperEfficient => {
                self.resolve_super_efficient(grid, pieces, offsets, &mut falling);
                Ok(())
            }
        }
    }

    fn resolve_general(
        &mut self,
        collision: &dyn Collision,
        lock: &dyn Lock,
        grid: &Grid,
        pieces: &[Piece],
        offsets: &mut [Offset],
        falling: &mut [bool; MAX_CHUNKS],
    ) -> Result<(), CoreError> {
        self.scratch.copy_from(grid);
        let mut clearance = [0i32; MAX_CHUNKS];

        loop {
            let mut min = i32::MAX;
            for i in 0..pieces.len() {
                if falling[i] {
                    clearance[i] =
                        collision.space_below(&self.scratch, &pieces[i], offsets[i], true);
                    min = min.min(clearance[i]);
                }
            }
            if min == i32::MAX {
                return Ok(());
            }

            for i in 0..pieces.len() {
                if falling[i] {
                    offsets[i].y -= min;
                }
            }
            for i in 0..pieces.len() {
                if falling[i] && clearance[i] == min {
                    lock.lock(&mut self.scratch, &pieces[i], offsets[i])?;
                    falling[i] = false;
                }
            }
        }
    }

    fn resolve_efficient(
        collision: &dyn Collision,
        grid: &Grid,
        pieces: &[Piece],
        offsets: &mut [Offset],
        falling: &mut [bool; MAX_CHUNKS],
    ) {
        let rows = grid.rows() as i32;
        let mut floor = [0i32; MAX_CHUNKS];
        for i in 0..pieces.len() {
            if falling[i] {
                floor[i] = collision.space_below(grid, &pieces[i], offsets[i], true);
            }
        }

        let mut landed: ArrayVec<usize, MAX_CHUNKS> = ArrayVec::new();
        let mut clearance = [0i32; MAX_CHUNKS];
        let mut fallen = 0;

        loop {
            let mut min = i32::MAX;
            for i in 0..pieces.len() {
                if !falling[i] {
                    continue;
                }
                let mut distance = floor[i] - fallen;
                for &j in &landed {
                    distance = distance.min(relative_clearance(
                        collision,
                        rows,
                        &pieces[i],
                        offsets[i],
                        &pieces[j],
                        offsets[j],
                    ));
                }
                clearance[i] = distance;
                min = min.min(distance);
            }
            if min == i32::MAX {
                return;
            }

            fallen += min;
            for i in 0..pieces.len() {
                if falling[i] {
                    offsets[i].y -= min;
                }
            }
            for i in 0..pieces.len() {
                if falling[i] && clearance[i] == min {
                    falling[i] = false;
                    landed.push(i);
                }
            }
        }
    }

    fn resolve_super_efficient(
        &mut self,
        grid: &Grid,
        pieces: &[Piece],
        offsets: &mut [Offset],
        falling: &mut [bool; MAX_CHUNKS],
    ) {
        let rows = self.rows as i32;
        let cols = self.cols as i32;
        for (slot, &code) in self.occupied.iter_mut().zip(grid.cells()) {
            *slot = code != crate::types::block::EMPTY;
        }

        let mut clearance = [0i32; MAX_CHUNKS];
        loop {
            let mut min = i32::MAX;
            for i in 0..pieces.len() {
                if falling[i] {
                    clearance[i] = self.occupancy_clearance(&pieces[i], offsets[i]);
                    min = min.min(clearance[i]);
                }
            }
            if min == i32::MAX {
                return;
            }

            for i in 0..pieces.len() {
                if falling[i] {
                    offsets[i].y -= min;
                }
            }
            for i in 0..pieces.len() {
                if !(falling[i] && clearance[i] == min) {
                    continue;
                }
                falling[i] = false;
                for (pane, r, c, _) in pieces[i].cells() {
                    let row = offsets[i].y + r;
                    let col = offsets[i].x + c;
                    if row >= 0 && row < rows && col >= 0 && col < cols {
                        let idx = self.cell_index(pane, row, col);
                        self.occupied[idx] = true;
                    }
                }
            }
        }
    }

    #[inline(always)]
    fn cell_index(&self, pane: usize, row: i32, col: i32) -> usize {
        pane * self.rows * self.cols + row as usize * self.cols + col as usize
    }

    /// Free rows under the piece in the occupancy field
    fn occupancy_clearance(&self, piece: &Piece, offset: Offset) -> i32 {
        let rows = self.rows as i32;
        let mut best = i32::MAX;
        for (pane, r, c, _) in piece.cells() {
            let col = offset.x + c;
            let start = offset.y + r;
            let mut row = start - 1;
            while row >= 0 && (row >= rows || !self.occupied[self.cell_index(pane, row, col)]) {
                row -= 1;
            }
            best = best.min(start - row - 1);
        }
        best
    }
}

/// Rows `upper` can fall before one of its cells meets a cell of `lower`.
///
/// Cells of `lower` above the top row are ignored, matching a lock into a grid
/// that discards them.
fn relative_clearance(
    collision: &dyn Collision,
    rows: i32,
    upper: &Piece,
    upper_offset: Offset,
    lower: &Piece,
    lower_offset: Offset,
) -> i32 {
    let mut best = i32::MAX;
    for (pane, ur, uc, ucode) in upper.cells() {
        let row = upper_offset.y + ur;
        let col = upper_offset.x + uc;
        for (lpane, lr, lc, lcode) in lower.cells() {
            if lpane != pane || lower_offset.x + lc != col {
                continue;
            }
            let lrow = lower_offset.y + lr;
            if lrow < row && lrow < rows && collision.codes_collide(pane, ucode, lcode) {
                best = best.min(row - lrow - 1);
            }
        }
    }
    best
}
