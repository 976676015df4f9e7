//! Standard rule set - reference implementations of every rule subsystem
//!
//! The engine only knows the traits in [`duoblock_core::systems`]; this crate
//! supplies the rules a plain two-pane game is played with.
//!
//! # Module Structure
//!
//! - [`collision`]: same-pane occupancy collision, open top edge
//! - [`rotation`]: tetromino tables with mirrored states
//! - [`kick`]: lean-ordered kick candidates
//! - [`lock`]: lock, connected-group unlock and column lifts
//! - [`clear`]: chromatic and monochrome row clears
//! - [`timing`]: entry/fall/lock/clear delays
//! - [`score`], [`level`]: points and level progression
//! - [`attack`]: garbage, push rows, displacement
//! - [`valleys`]: garbage drop column choice
//! - [`rng`]: the seeded LCG and 7-bag
//! - [`metamorphosis`], [`special`], [`triggers`]: mode rules
//!
//! # Example
//!
//! ```
//! use duoblock_core::{Collision, Grid, Offset, Piece, Rotation};
//! use duoblock_core::types::{PieceKind, Shape, Variant};
//! use duoblock_rules::{StandardCollision, StandardRotation};
//!
//! let grid = Grid::new(20, 8);
//! let mut piece = Piece::empty();
//! StandardRotation
//!     .prepare(&mut piece, PieceKind::new(Shape::O, Variant::Linked))
//!     .unwrap();
//! assert!(!StandardCollision.collides(&grid, &piece, Offset::new(2, 0)));
//! ```

pub mod attack;
pub mod clear;
pub mod collision;
pub mod kick;
pub mod level;
pub mod lock;
pub mod metamorphosis;
pub mod rng;
pub mod rotation;
pub mod score;
pub mod special;
pub mod timing;
pub mod triggers;
pub mod valleys;

pub use attack::{DisplacementConfig, StandardAttack};
pub use clear::{pane_flag, StandardClear, MONOCHROME};
pub use collision::StandardCollision;
pub use kick::{StandardKick, KICK_CANDIDATES};
pub use level::{StandardLevel, ROWS_PER_LEVEL};
pub use lock::StandardLock;
pub use metamorphosis::{NoMetamorphosis, PaneSwapMetamorphosis};
pub use rng::{SevenBag, SimpleRng, VariantWeights};
pub use rotation::StandardRotation;
pub use score::StandardScore;
pub use special::{SpecialMode, StandardSpecial};
pub use timing::{StandardTiming, TimingConfig};
pub use triggers::{NoTriggers, ScriptedTriggers, TriggerHook};
pub use valleys::StandardValleys;
