//! Clear module - full-row detection per pane
//!
//! A row is cleared chromatically in a pane when that pane's row is full; the
//! flag holds bit `1 << pane`. A row full in both panes clears monochrome.
//! A cleared row is removed: a chromatic clear drops the rows above it in its
//! pane only, a monochrome clear drops them in both. Each call collapses all
//! of its flagged rows at once, so flags always index the grid as it was
//! before that call.

use log::trace;

use duoblock_core::types::{block, PANES};
use duoblock_core::{Clear, Grid};

/// Flag value for a monochrome clear
pub const MONOCHROME: u8 = 1;

/// Chromatic flag bit for a pane
pub const fn pane_flag(pane: usize) -> u8 {
    1 << pane
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardClear;

impl StandardClear {
    fn erase(grid: &mut Grid, row: usize, pane: usize) {
        for col in 0..grid.cols() as i32 {
            grid.set(pane, row as i32, col, block::EMPTY);
        }
    }
}

impl Clear for StandardClear {
    fn clearable(&self, grid: &Grid, flags: &mut [u8]) -> bool {
        let mut any = false;
        for (row, flag) in flags.iter_mut().enumerate().take(grid.rows()) {
            *flag = 0;
            for pane in 0..PANES {
                if grid.is_row_full(pane, row) {
                    *flag |= pane_flag(pane);
                }
            }
            any |= *flag != 0;
        }
        any
    }

    fn clearable_monochrome(&self, grid: &Grid, flags: &mut [u8]) -> bool {
        let mut any = false;
        for (row, flag) in flags.iter_mut().enumerate().take(grid.rows()) {
            *flag = if (0..PANES).all(|pane| grid.is_row_full(pane, row)) {
                MONOCHROME
            } else {
                0
            };
            any |= *flag != 0;
        }
        any
    }

    fn clear(&self, grid: &mut Grid, flags: &[u8]) {
        for pane in 0..PANES {
            let bit = pane_flag(pane);
            let removed = grid.collapse_rows(pane, |row| {
                flags.get(row).is_some_and(|&flag| flag & bit != 0)
            });
            if removed > 0 {
                trace!("pane {} dropped {} rows", pane, removed);
            }
        }
    }

    fn clear_monochrome(&self, grid: &mut Grid, flags: &[u8]) {
        for pane in 0..PANES {
            grid.collapse_rows(pane, |row| flags.get(row).is_some_and(|&flag| flag != 0));
        }
    }

    fn inverse_clear(&self, grid: &mut Grid, row: usize, flag: u8) {
        for pane in 0..PANES {
            if flag & pane_flag(pane) == 0 {
                Self::erase(grid, row, pane);
            }
        }
    }

    fn inverse_clear_monochrome(&self, grid: &mut Grid, row: usize, flag: u8) {
        if flag == 0 {
            grid.clear_row(row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chromatic_flags_per_pane() {
        let grid = Grid::from_ascii(3, &["111", "0#0", "###"]);
        let mut flags = [0u8; 3];
        assert!(StandardClear.clearable(&grid, &mut flags));
        assert_eq!(flags, [0b11, 0b01, 0b10]);
    }

    #[test]
    fn test_monochrome_needs_both_panes() {
        let grid = Grid::from_ascii(3, &["111", "###"]);
        let mut flags = [0u8; 2];
        assert!(StandardClear.clearable_monochrome(&grid, &mut flags));
        assert_eq!(flags, [MONOCHROME, 0]);
    }

    #[test]
    fn test_clear_collapses_only_flagged_panes() {
        let mut grid = Grid::from_ascii(3, &["#.1", "0#0"]);
        StandardClear.clear(&mut grid, &[pane_flag(0), 0]);
        assert_eq!(grid.to_ascii(), vec!["1.1", "01."]);
    }

    #[test]
    fn test_monochrome_clear_drops_rows_above() {
        let mut grid = Grid::from_ascii(4, &["..1.", "0...", "####", ".0..", "####"]);
        StandardClear.clear_monochrome(&mut grid, &[MONOCHROME, 0, MONOCHROME, 0, 0]);
        assert_eq!(
            grid.to_ascii(),
            vec!["....", "....", "..1.", "0...", ".0.."]
        );
        assert_eq!(grid.occupied_rows(), 3);
    }

    #[test]
    fn test_clear_removes_exactly_the_flagged_rows() {
        let mut grid = Grid::from_ascii(3, &["0..", "000", "0..", "000"]);
        let before = grid.occupied_rows();
        let mut flags = [0u8; 4];
        assert!(StandardClear.clearable(&grid, &mut flags));
        StandardClear.clear(&mut grid, &flags);
        assert_eq!(grid.to_ascii(), vec!["...", "...", "0..", "0.."]);
        assert_eq!(before - grid.occupied_rows(), 2);
    }

    #[test]
    fn test_inverse_clear_keeps_cleared_cells() {
        let mut grid = Grid::from_ascii(3, &["0#0"]);
        StandardClear.inverse_clear(&mut grid, 0, pane_flag(0));
        assert_eq!(grid.to_ascii(), vec!["000"]);

        let mut grid = Grid::from_ascii(3, &["###"]);
        StandardClear.inverse_clear_monochrome(&mut grid, 0, MONOCHROME);
        assert_eq!(grid.to_ascii(), vec!["###"]);
        StandardClear.inverse_clear_monochrome(&mut grid, 0, 0);
        assert!(grid.is_empty());
    }
}
