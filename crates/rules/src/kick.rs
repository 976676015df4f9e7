//! Kick module - nearby placements tried after a turn

use duoblock_core::{Collision, Grid, Kick, Offset, Piece};

/// Candidate displacements in base order; the first is always tried first
pub const KICK_CANDIDATES: [(i32, i32); 9] = [
    (0, 0),
    (-1, 0),
    (1, 0),
    (0, -1),
    (-1, -1),
    (1, -1),
    (-2, 0),
    (2, 0),
    (0, 1),
];

/// Lean-ordered kick search.
///
/// After the unmoved candidate, displacements agreeing with the lean come
/// first, then neutral ones, then opposing ones; base order is kept within
/// each group.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardKick;

impl StandardKick {
    /// Candidate order for a lean bias
    pub fn ordered(lean: (i32, i32)) -> [(i32, i32); 9] {
        let mut candidates = KICK_CANDIDATES;
        candidates[1..].sort_by_key(|&(dx, dy)| -(dx * lean.0 + dy * lean.1).signum());
        candidates
    }
}

impl Kick for StandardKick {
    fn kick(
        &self,
        collision: &dyn Collision,
        grid: &Grid,
        piece: &Piece,
        offset: &mut Offset,
        lean: (i32, i32),
    ) -> bool {
        for (dx, dy) in Self::ordered(lean) {
            let candidate = offset.translated(dx, dy);
            if !collision.collides(grid, piece, candidate) {
                *offset = candidate;
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::StandardCollision;
    use crate::rotation::StandardRotation;
    use duoblock_core::types::{PieceKind, Shape, Variant};
    use duoblock_core::Rotation;

    #[test]
    fn test_no_lean_keeps_base_order() {
        assert_eq!(StandardKick::ordered((0, 0)), KICK_CANDIDATES);
    }

    #[test]
    fn test_left_lean_prefers_left() {
        let ordered = StandardKick::ordered((-1, 0));
        assert_eq!(ordered[0], (0, 0));
        assert_eq!(&ordered[1..4], &[(-1, 0), (-1, -1), (-2, 0)]);
        assert_eq!(ordered[8], (2, 0));
    }

    #[test]
    fn test_down_right_lean() {
        let ordered = StandardKick::ordered((1, -1));
        assert_eq!(ordered[1], (1, 0));
        assert_eq!(ordered[2], (0, -1));
    }

    #[test]
    fn test_kick_finds_free_spot() {
        let grid = Grid::from_ascii(4, &["0...", "0...", "0...", "0..."]);
        let mut piece = Piece::empty();
        StandardRotation
            .prepare(&mut piece, PieceKind::new(Shape::I, Variant::Pane0))
            .unwrap();
        StandardRotation.turn_cw(&mut piece).unwrap();
        // vertical I in local column 2; at x = -2 it sits in column 0
        let mut offset = Offset::new(-2, 0);
        assert!(StandardCollision.collides(&grid, &piece, offset));
        assert!(StandardKick.kick(&StandardCollision, &grid, &piece, &mut offset, (1, 0)));
        assert_eq!(offset, Offset::new(-1, 0));
    }
}
