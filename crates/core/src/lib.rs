//! Simulation core - grid, pieces and the collision-sensitive algorithms
//!
//! This crate holds the data the state machine owns and the algorithms that
//! only depend on the rule-subsystem contracts. It has **no knowledge of the
//! concrete rules**: every shape, collision and clear decision goes through a
//! trait in [`systems`].
//!
//! # Module Structure
//!
//! - [`grid`]: the two-pane block field
//! - [`piece`]: pieces, offsets and bounding boxes
//! - [`systems`]: rule-subsystem traits (collision, rotation, kick, lock, ...)
//! - [`gravity`]: simultaneous fall of disconnected block groups
//! - [`turn`]: turn/kick resolution with exact revert
//! - [`error`]: the error taxonomy
//!
//! # Example
//!
//! ```
//! use duoblock_core::{Grid, Offset};
//!
//! let grid = Grid::from_ascii(4, &["....", "0..#"]);
//! assert_eq!(grid.height(), 1);
//! assert!(grid.is_occupied(1, 0, 3));
//! assert_eq!(Offset::new(1, 5).translated(0, -1), Offset::new(1, 4));
//! ```

pub mod error;
pub mod gravity;
pub mod grid;
pub mod piece;
pub mod systems;
pub mod turn;

#[cfg(test)]
pub(crate) mod testing;

pub use duoblock_types as types;

pub use error::CoreError;
pub use gravity::{GravityResolver, GravityStrategy};
pub use grid::Grid;
pub use piece::{Bounds, Offset, Piece};
pub use systems::{
    Attack, AttackKind, Bag, Clear, Collision, GravityCapabilities, IncomingAttack, Kick, Level,
    Lock, Metamorphosis, MetamorphosisOutcome, OutgoingAttack, Persist, RowsAdded, Rotation,
    Score, Special, SpecialUse, Timing, TriggerSink, Triggers, Valleys,
};
pub use turn::{resolve_turn, turn_piece, TurnOutcome, TurnSystems};
