//! Metamorphosis module - whole-grid transforms
//!
//! The standard transform swaps the two panes and recodes every block so each
//! pane keeps holding its own code. Activation and deactivation are the same
//! swap; the state only records which side of it the grid is on.

use serde::{Deserialize, Serialize};

use duoblock_core::types::{block, PANES};
use duoblock_core::{CoreError, Grid, Metamorphosis, MetamorphosisOutcome, Persist};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct MetamorphosisState {
    active: bool,
    cycles: u32,
}

/// Swaps the panes on request, and optionally every `period` cycles
#[derive(Debug, Clone, Default)]
pub struct PaneSwapMetamorphosis {
    period: Option<u32>,
    state: MetamorphosisState,
}

impl PaneSwapMetamorphosis {
    pub fn new(period: Option<u32>) -> Self {
        Self {
            period: period.filter(|&p| p > 0),
            state: MetamorphosisState::default(),
        }
    }

    fn swap(grid: &mut Grid) {
        grid.swap_panes();
        for pane in 0..PANES {
            for row in 0..grid.rows() as i32 {
                for col in 0..grid.cols() as i32 {
                    if grid.is_occupied(pane, row, col) {
                        grid.set(pane, row, col, block::pane_code(pane));
                    }
                }
            }
        }
    }
}

impl Persist for PaneSwapMetamorphosis {
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

impl Metamorphosis for PaneSwapMetamorphosis {
    fn metamorphosize(&mut self, activate: bool, grid: &mut Grid) -> bool {
        if self.state.active == activate {
            return false;
        }
        Self::swap(grid);
        self.state.active = activate;
        true
    }

    fn end_cycle(&mut self, grid: &mut Grid) -> MetamorphosisOutcome {
        let Some(period) = self.period else {
            return MetamorphosisOutcome::default();
        };
        self.state.cycles += 1;
        if self.state.cycles < period {
            return MetamorphosisOutcome::default();
        }
        self.state.cycles = 0;
        let activate = !self.state.active;
        self.metamorphosize(activate, grid);
        MetamorphosisOutcome {
            activated: activate,
            deactivated: !activate,
        }
    }

    fn is_active(&self) -> bool {
        self.state.active
    }
}

/// Never transforms anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetamorphosis;

impl Persist for NoMetamorphosis {}

impl Metamorphosis for NoMetamorphosis {
    fn metamorphosize(&mut self, _activate: bool, _grid: &mut Grid) -> bool {
        false
    }

    fn end_cycle(&mut self, _grid: &mut Grid) -> MetamorphosisOutcome {
        MetamorphosisOutcome::default()
    }

    fn is_active(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_recodes_blocks() {
        let mut grid = Grid::from_ascii(3, &["0.1"]);
        let mut meta = PaneSwapMetamorphosis::default();
        assert!(meta.metamorphosize(true, &mut grid));
        assert_eq!(grid.to_ascii(), vec!["1.0"]);
        assert_eq!(grid.get(1, 0, 0), Some(block::S1));
        assert!(meta.is_active());
        // already active
        assert!(!meta.metamorphosize(true, &mut grid));
        assert!(meta.metamorphosize(false, &mut grid));
        assert_eq!(grid.to_ascii(), vec!["0.1"]);
    }

    #[test]
    fn test_periodic_toggle() {
        let mut grid = Grid::from_ascii(2, &["#0"]);
        let mut meta = PaneSwapMetamorphosis::new(Some(2));
        assert!(!meta.end_cycle(&mut grid).changed());
        let outcome = meta.end_cycle(&mut grid);
        assert!(outcome.activated && !outcome.deactivated);
        assert_eq!(grid.to_ascii(), vec!["#1"]);
        meta.end_cycle(&mut grid);
        assert!(meta.end_cycle(&mut grid).deactivated);
        assert!(!meta.is_active());
    }

    #[test]
    fn test_no_metamorphosis_is_inert() {
        let mut grid = Grid::from_ascii(2, &["0."]);
        let mut meta = NoMetamorphosis;
        assert!(!meta.metamorphosize(true, &mut grid));
        assert!(!meta.end_cycle(&mut grid).changed());
        assert_eq!(grid.to_ascii(), vec!["0."]);
    }
}
