//! Collision module - same-pane occupancy with walls and a floor

use duoblock_core::types::block;
use duoblock_core::{Collision, Grid, Offset, Piece};

/// A piece cell collides when it leaves the column range, drops below row 0,
/// or lands on a filled cell of its own pane. Cells above the top row are free.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCollision;

impl StandardCollision {
    fn blocked(&self, grid: &Grid, piece: &Piece, offset: Offset, floor: bool) -> bool {
        let cols = grid.cols() as i32;
        piece.cells().any(|(pane, r, c, _)| {
            let row = offset.y + r;
            let col = offset.x + c;
            if col < 0 || col >= cols {
                return true;
            }
            if row < 0 {
                return floor;
            }
            grid.is_occupied(pane, row, col)
        })
    }
}

impl Collision for StandardCollision {
    fn collides(&self, grid: &Grid, piece: &Piece, offset: Offset) -> bool {
        self.blocked(grid, piece, offset, true)
    }

    fn space_below(
        &self,
        grid: &Grid,
        piece: &Piece,
        offset: Offset,
        use_wall_as_floor: bool,
    ) -> i32 {
        let Some(bounds) = piece.bounds() else {
            return 0;
        };
        let limit = if use_wall_as_floor {
            // the floor stops the lowest block
            (offset.y + bounds.min_row).max(0)
        } else {
            grid.rows() as i32
        };
        let mut distance = 0;
        while distance < limit
            && !self.blocked(
                grid,
                piece,
                offset.translated(0, -(distance + 1)),
                use_wall_as_floor,
            )
        {
            distance += 1;
        }
        distance
    }

    fn within(&self, grid: &Grid, piece: &Piece, offset: Offset) -> bool {
        let cols = grid.cols() as i32;
        piece.cells().all(|(_, r, c, _)| {
            let col = offset.x + c;
            col >= 0 && col < cols && offset.y + r >= 0
        })
    }

    fn codes_collide(&self, _pane: usize, a: u8, b: u8) -> bool {
        a != block::EMPTY && b != block::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::StandardRotation;
    use duoblock_core::types::{PieceKind, Shape, Variant};
    use duoblock_core::Rotation;

    fn o_piece(variant: Variant) -> Piece {
        let mut piece = Piece::empty();
        StandardRotation
            .prepare(&mut piece, PieceKind::new(Shape::O, variant))
            .unwrap();
        piece
    }

    #[test]
    fn test_walls_and_floor() {
        let grid = Grid::new(6, 4);
        let piece = o_piece(Variant::Pane0);
        // O occupies local columns 1..=2 and rows 2..=3
        assert!(!StandardCollision.collides(&grid, &piece, Offset::new(0, -2)));
        assert!(StandardCollision.collides(&grid, &piece, Offset::new(0, -3)));
        assert!(StandardCollision.collides(&grid, &piece, Offset::new(-2, 0)));
        assert!(StandardCollision.collides(&grid, &piece, Offset::new(2, 0)));
        // above the top is free
        assert!(!StandardCollision.collides(&grid, &piece, Offset::new(0, 10)));
    }

    #[test]
    fn test_other_pane_does_not_collide() {
        let grid = Grid::from_ascii(4, &["1111", "1111"]);
        let piece = o_piece(Variant::Pane0);
        assert!(!StandardCollision.collides(&grid, &piece, Offset::new(0, -2)));
        let linked = o_piece(Variant::Linked);
        assert!(StandardCollision.collides(&grid, &linked, Offset::new(0, -2)));
    }

    #[test]
    fn test_space_below() {
        let grid = Grid::from_ascii(4, &["....", "....", "....", ".0.."]);
        let piece = o_piece(Variant::Pane0);
        // lowest block at row 2 + y; column 1 is filled at row 0
        assert_eq!(StandardCollision.space_below(&grid, &piece, Offset::new(0, 3), true), 4);
        assert_eq!(StandardCollision.space_below(&grid, &piece, Offset::new(1, 3), true), 5);
        let empty = Grid::new(4, 4);
        assert_eq!(StandardCollision.space_below(&empty, &piece, Offset::new(1, 3), false), 4);
    }

    #[test]
    fn test_within_ignores_blocks() {
        let grid = Grid::from_ascii(4, &["####", "####"]);
        let piece = o_piece(Variant::Linked);
        assert!(StandardCollision.within(&grid, &piece, Offset::new(0, -2)));
        assert!(!StandardCollision.within(&grid, &piece, Offset::new(0, -3)));
    }
}
