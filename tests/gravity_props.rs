//! Gravity resolver properties against the standard rules

use proptest::prelude::*;

use duoblock::core::types::{block, MAX_CHUNKS, PANES};
use duoblock::core::{GravityResolver, GravityStrategy, Grid, Lock, Offset, Piece};
use duoblock::rules::{StandardCollision, StandardLock};

const ROWS: usize = 12;
const COLS: usize = 6;

const STRATEGIES: [GravityStrategy; 3] = [
    GravityStrategy::General,
    GravityStrategy::Efficient,
    GravityStrategy::SuperEfficient,
];

/// Random cells in the lower eight rows of both panes
fn random_grid() -> impl Strategy<Value = Grid> {
    prop::collection::vec(prop::bool::weighted(0.35), PANES * 8 * COLS).prop_map(|cells| {
        let mut grid = Grid::new(ROWS, COLS);
        for (i, occupied) in cells.into_iter().enumerate() {
            if occupied {
                let pane = i / (8 * COLS);
                let rem = i % (8 * COLS);
                let row = (rem / COLS) as i32;
                let col = (rem % COLS) as i32;
                grid.set(pane, row, col, block::pane_code(pane));
            }
        }
        grid
    })
}

/// Lift the floating groups out of `grid`
fn extract(lock: &mut StandardLock, grid: &mut Grid) -> (Vec<Piece>, Vec<Offset>) {
    let mut pieces = vec![Piece::empty(); MAX_CHUNKS];
    let mut offsets = vec![Offset::default(); MAX_CHUNKS];
    let count = lock.unlock_grid(grid, &mut pieces, &mut offsets, 0);
    pieces.truncate(count);
    offsets.truncate(count);
    (pieces, offsets)
}

fn settle(strategy: GravityStrategy, grid: &Grid, pieces: &[Piece], offsets: &[Offset]) -> Vec<Offset> {
    let lock = StandardLock::new(ROWS, COLS);
    let mut resolver = GravityResolver::new(strategy, ROWS, COLS);
    let mut out = offsets.to_vec();
    resolver
        .resolve(&StandardCollision, &lock, grid, pieces, &mut out)
        .unwrap();
    out
}

proptest! {
    #[test]
    fn prop_strategies_match_on_standard_rules(source in random_grid()) {
        let mut lock = StandardLock::new(ROWS, COLS);
        let mut floor = source.clone();
        let (pieces, offsets) = extract(&mut lock, &mut floor);
        prop_assume!(pieces.len() < MAX_CHUNKS);

        let general = settle(GravityStrategy::General, &floor, &pieces, &offsets);
        for strategy in STRATEGIES {
            prop_assert_eq!(&settle(strategy, &floor, &pieces, &offsets), &general, "{}", strategy.as_str());
        }
    }

    #[test]
    fn prop_settled_grid_has_nothing_floating(source in random_grid()) {
        let mut lock = StandardLock::new(ROWS, COLS);
        let mut grid = source.clone();
        let (pieces, offsets) = extract(&mut lock, &mut grid);
        prop_assume!(pieces.len() < MAX_CHUNKS);

        let landed = settle(GravityStrategy::SuperEfficient, &grid, &pieces, &offsets);
        for ((piece, from), to) in pieces.iter().zip(&offsets).zip(&landed) {
            prop_assert_eq!(from.x, to.x);
            prop_assert!(to.y < from.y);
            prop_assert!(lock.lock(&mut grid, piece, *to).is_ok());
        }
        prop_assert_eq!(grid.block_count(), source.block_count());

        let (again, _) = extract(&mut lock, &mut grid);
        prop_assert!(again.is_empty());
    }
}

#[test]
fn test_strategy_selection_for_standard_lock() {
    let lock = StandardLock::new(ROWS, COLS);
    assert_eq!(GravityStrategy::select(&lock), GravityStrategy::SuperEfficient);
}
