//! Turn and kick resolution
//!
//! A turn is applied in place first; the kick subsystem then searches for a
//! nearby valid placement ordered by the lean. If none exists the rotation is
//! undone and the offset restored, so the piece always ends valid.

use log::trace;

use crate::systems::{Collision, Kick, Rotation};
use crate::types::{Lean, TurnKind};
use crate::{CoreError, Grid, Offset, Piece};

/// What a turn attempt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// No placement found; rotation and offset are as before the call
    Reverted,
    /// Valid without a kick search
    InPlace,
    /// Placed by the kick search; `moved` is false for a zero-distance kick
    Kicked { moved: bool },
}

impl TurnOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, TurnOutcome::Reverted)
    }

    /// The accepted placement differs from the pre-turn offset
    pub fn moved(&self) -> bool {
        matches!(self, TurnOutcome::Kicked { moved: true })
    }
}

/// Collaborators a turn needs
#[derive(Clone, Copy)]
pub struct TurnSystems<'a> {
    pub collision: &'a dyn Collision,
    pub kick: &'a dyn Kick,
    pub rotation: &'a dyn Rotation,
}

/// Resolve a piece that has already been rotated in place.
///
/// `previous_rotation` is the rotation value before the turn. When `can_kick`
/// is false only the unchanged offset is tried.
pub fn resolve_turn(
    systems: TurnSystems<'_>,
    grid: &Grid,
    piece: &mut Piece,
    offset: &mut Offset,
    previous_rotation: u8,
    lean: Lean,
    can_kick: bool,
) -> Result<TurnOutcome, CoreError> {
    let before = *offset;

    if can_kick {
        let mut candidate = before;
        if systems
            .kick
            .kick(systems.collision, grid, piece, &mut candidate, lean.bias())
        {
            *offset = candidate;
            if candidate != before {
                trace!(
                    "turn kicked by ({}, {})",
                    candidate.x - before.x,
                    candidate.y - before.y
                );
            }
            return Ok(TurnOutcome::Kicked {
                moved: candidate != before,
            });
        }
    } else if !systems.collision.collides(grid, piece, before) {
        return Ok(TurnOutcome::InPlace);
    }

    trace!("turn to rotation {} reverted", piece.rotation);
    systems.rotation.undo_turn(piece, previous_rotation)?;
    *offset = before;
    Ok(TurnOutcome::Reverted)
}

/// Apply `kind` to `piece` and resolve it
pub fn turn_piece(
    systems: TurnSystems<'_>,
    grid: &Grid,
    piece: &mut Piece,
    offset: &mut Offset,
    kind: TurnKind,
    lean: Lean,
    can_kick: bool,
) -> Result<TurnOutcome, CoreError> {
    let previous_rotation = piece.rotation;
    systems.rotation.apply(piece, kind)?;
    resolve_turn(systems, grid, piece, offset, previous_rotation, lean, can_kick)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{NudgeKick, Occupancy, SquareTurns};
    use crate::types::{PieceKind, Shape, Variant};
    use proptest::prelude::*;

    fn systems() -> TurnSystems<'static> {
        TurnSystems {
            collision: &Occupancy,
            kick: &NudgeKick,
            rotation: &SquareTurns,
        }
    }

    fn turn(
        grid: &Grid,
        piece: &mut Piece,
        offset: &mut Offset,
        kind: TurnKind,
        lean: Lean,
        can_kick: bool,
    ) -> TurnOutcome {
        turn_piece(systems(), grid, piece, offset, kind, lean, can_kick).unwrap()
    }

    fn t_piece() -> Piece {
        let mut piece = Piece::empty();
        SquareTurns
            .prepare(&mut piece, PieceKind::new(Shape::T, Variant::Pane0))
            .unwrap();
        piece
    }

    #[test]
    fn test_turn_in_open_space() {
        let grid = Grid::new(10, 6);
        let mut piece = t_piece();
        let mut offset = Offset::new(1, 3);
        let outcome = turn(&grid, &mut piece, &mut offset, TurnKind::Cw, Lean::None, true);
        assert_eq!(outcome, TurnOutcome::Kicked { moved: false });
        assert!(!outcome.moved());
        assert_eq!(piece.rotation, 1);
        assert_eq!(offset, Offset::new(1, 3));
    }

    #[test]
    fn test_turn_without_kick_in_place() {
        let grid = Grid::new(10, 6);
        let mut piece = t_piece();
        let mut offset = Offset::new(1, 3);
        let outcome = turn(&grid, &mut piece, &mut offset, TurnKind::Cw, Lean::None, false);
        assert_eq!(outcome, TurnOutcome::InPlace);
    }

    #[test]
    fn test_kick_off_wall_moves_piece() {
        let grid = Grid::new(10, 6);
        let mut piece = t_piece();
        // turned back to spawn the T spans local columns 0..=2, one past the left wall
        let mut offset = Offset::new(-1, 3);
        SquareTurns.turn_cw(&mut piece).unwrap();
        assert!(!Occupancy.collides(&grid, &piece, offset));

        let outcome = turn(&grid, &mut piece, &mut offset, TurnKind::Ccw, Lean::Right, true);
        assert_eq!(outcome, TurnOutcome::Kicked { moved: true });
        assert_eq!(offset, Offset::new(0, 3));
        assert!(!Occupancy.collides(&grid, &piece, offset));
    }

    #[test]
    fn test_revert_restores_rotation_and_offset() {
        // a T-shaped pocket capped from above: only the upside-down T fits
        let grid = Grid::from_ascii(5, &["00000", "0...0", "00.00", "00000"]);
        let mut piece = t_piece();
        SquareTurns.turn_180(&mut piece).unwrap();
        let mut offset = Offset::new(1, 1);
        assert!(!Occupancy.collides(&grid, &piece, offset));

        let before_piece = piece.clone();
        for can_kick in [false, true] {
            let outcome = turn(&grid, &mut piece, &mut offset, TurnKind::Cw, Lean::None, can_kick);
            assert_eq!(outcome, TurnOutcome::Reverted);
            assert!(!outcome.changed());
            assert_eq!(piece.rotation, 2);
            assert_eq!(piece, before_piece);
            assert_eq!(offset, Offset::new(1, 1));
        }
    }

    proptest! {
        #[test]
        fn prop_turn_leaves_piece_valid(
            holes in prop::collection::vec((0i32..6, 0i32..8), 0..20),
            x in -1i32..4,
            y in 0i32..6,
            turns in prop::collection::vec(0usize..4, 1..6),
            can_kick in any::<bool>(),
        ) {
            let mut grid = Grid::new(10, 6);
            for (col, row) in holes {
                grid.set(0, row, col, crate::types::block::S0);
            }
            let mut piece = t_piece();
            let mut offset = Offset::new(x, y);
            prop_assume!(!Occupancy.collides(&grid, &piece, offset));

            for t in turns {
                let kind = [TurnKind::Cw, TurnKind::Ccw, TurnKind::Half, TurnKind::Flip][t];
                let rotation = piece.rotation;
                let before = offset;
                let outcome = turn(&grid, &mut piece, &mut offset, kind, Lean::Left, can_kick);
                prop_assert!(!Occupancy.collides(&grid, &piece, offset));
                if outcome == TurnOutcome::Reverted {
                    prop_assert_eq!(piece.rotation, rotation);
                    prop_assert_eq!(offset, before);
                }
            }
        }
    }
}
