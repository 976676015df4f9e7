//! Rule-subsystem interfaces
//!
//! The core owns the grid and the piece pools; everything that decides *what
//! the rules are* lives behind these traits. Implementations receive the grid
//! by reference for the duration of one call and must not retain it.
//!
//! Subsystems that carry state between calls also implement [`Persist`] so a
//! save game can store them as opaque blobs.

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::types::{DropKind, PieceKind, Trigger, TurnKind, MAX_COLS};
use crate::{CoreError, Grid, Offset, Piece};

/// Opaque save/restore of a subsystem's private state.
///
/// `restore_blob(None)` means the save predates this subsystem; the
/// implementation keeps its freshly configured state.
pub trait Persist {
    fn save_blob(&self) -> Result<Vec<u8>, CoreError> {
        Ok(Vec::new())
    }

    fn restore_blob(&mut self, blob: Option<&[u8]>) -> Result<(), CoreError> {
        let _ = blob;
        Ok(())
    }
}

/// Collision tests between a placed piece and a grid
pub trait Collision: Send {
    /// Whether `piece` at `offset` overlaps a wall, the floor or a blocking cell
    fn collides(&self, grid: &Grid, piece: &Piece, offset: Offset) -> bool;

    /// How many rows `piece` can fall from `offset` before colliding.
    ///
    /// With `use_wall_as_floor == false` the bottom edge is not solid and the
    /// answer is capped at the grid height.
    fn space_below(&self, grid: &Grid, piece: &Piece, offset: Offset, use_wall_as_floor: bool)
        -> i32;

    /// Bounds-only check
    fn within(&self, grid: &Grid, piece: &Piece, offset: Offset) -> bool;

    /// Whether a falling cell with code `a` is blocked by a resting cell `b` in `pane`
    fn codes_collide(&self, pane: usize, a: u8, b: u8) -> bool;
}

/// Rotation and shape construction
pub trait Rotation: Send {
    /// Fill `piece` with `kind` in its default rotation
    fn prepare(&self, piece: &mut Piece, kind: PieceKind) -> Result<(), CoreError>;

    fn turn_cw(&self, piece: &mut Piece) -> Result<(), CoreError>;

    fn turn_ccw(&self, piece: &mut Piece) -> Result<(), CoreError>;

    fn turn_180(&self, piece: &mut Piece) -> Result<(), CoreError>;

    fn flip_vertical(&self, piece: &mut Piece) -> Result<(), CoreError>;

    /// Return to the default rotation
    fn turn_0(&self, piece: &mut Piece) -> Result<(), CoreError>;

    /// Restore a rotation value recorded before a turn
    fn undo_turn(&self, piece: &mut Piece, previous_rotation: u8) -> Result<(), CoreError>;

    /// Orientation used for previews: widest and flattest
    fn turn_minimum_horizontal_profile(&self, piece: &mut Piece) -> Result<(), CoreError>;

    fn apply(&self, piece: &mut Piece, kind: TurnKind) -> Result<(), CoreError> {
        match kind {
            TurnKind::Cw => self.turn_cw(piece),
            TurnKind::Ccw => self.turn_ccw(piece),
            TurnKind::Half => self.turn_180(piece),
            TurnKind::Flip => self.flip_vertical(piece),
        }
    }
}

/// Kick search after an in-place rotation
pub trait Kick: Send {
    /// Try nearby offsets ordered by `lean`; on success `offset` holds the
    /// first collision-free candidate and true is returned.
    fn kick(
        &self,
        collision: &dyn Collision,
        grid: &Grid,
        piece: &Piece,
        offset: &mut Offset,
        lean: (i32, i32),
    ) -> bool;
}

/// Declared invariants that select the gravity algorithm
pub trait GravityCapabilities {
    /// Locking writes each cell's code unchanged
    fn lock_preserves_identity(&self) -> bool;

    /// Collision depends on nothing but whether two cells of one pane are filled
    fn only_identical_codes_collide(&self) -> bool;
}

/// Writing pieces into the grid and splitting the grid back into pieces
pub trait Lock: GravityCapabilities + Send {
    fn lock(&self, grid: &mut Grid, piece: &Piece, offset: Offset) -> Result<(), CoreError>;

    /// Split `piece` into disconnected components. Returns how many were written.
    fn unlock_piece(
        &mut self,
        piece: &Piece,
        offset: Offset,
        out: &mut [Piece],
        out_offsets: &mut [Offset],
    ) -> usize;

    /// Remove every unsupported group from `grid`, writing them from `start`.
    /// Returns the new total count.
    fn unlock_grid(
        &mut self,
        grid: &mut Grid,
        out: &mut [Piece],
        out_offsets: &mut [Offset],
        start: usize,
    ) -> usize;

    /// Lift the blocks of column `col` at and above `row` as chunks written
    /// from `start`. Returns the new total count.
    fn unlock_column_above(
        &mut self,
        grid: &mut Grid,
        col: i32,
        row: i32,
        out: &mut [Piece],
        out_offsets: &mut [Offset],
        start: usize,
    ) -> usize;
}

/// Row-clear detection and application.
///
/// Flags are one byte per row; the meaning of the bits belongs to the
/// implementation, zero always means "not cleared".
pub trait Clear: Send {
    fn clearable(&self, grid: &Grid, flags: &mut [u8]) -> bool;

    fn clearable_monochrome(&self, grid: &Grid, flags: &mut [u8]) -> bool;

    /// Remove the flagged rows, dropping the rows above them. `flags` index
    /// the grid as it is when called.
    fn clear(&self, grid: &mut Grid, flags: &[u8]);

    fn clear_monochrome(&self, grid: &mut Grid, flags: &[u8]);

    /// Keep only the cells of `row` that a clear with `flag` would remove
    fn inverse_clear(&self, grid: &mut Grid, row: usize, flag: u8);

    fn inverse_clear_monochrome(&self, grid: &mut Grid, row: usize, flag: u8);
}

/// Wall-clock gating of every piece action
pub trait Timing: Persist + Send {
    fn tick(&mut self, seconds: f64);

    fn set_level(&mut self, level: u32);

    fn can_enter(&self) -> bool;
    fn can_move(&self) -> bool;
    fn can_turn(&self) -> bool;
    fn can_flip(&self) -> bool;
    fn can_kick(&self, piece: &Piece) -> bool;
    fn can_fall(&self) -> bool;
    fn can_lock(&self) -> bool;
    fn can_clear(&self) -> bool;
    fn can_drop(&self) -> bool;

    fn did_prepare(&mut self);
    fn did_enter(&mut self);
    fn did_move(&mut self, grounded: bool);
    fn did_turn(&mut self, grounded: bool);
    fn did_kick(&mut self);
    fn did_fall(&mut self);
    fn did_soft_fall(&mut self);
    fn did_drop(&mut self);
    fn did_lock(&mut self);
    fn did_begin_clear(&mut self);
    fn did_clear(&mut self);
}

/// Fire-and-forget score accounting
pub trait Score: Persist + Send {
    fn start_cycle(&mut self);
    fn did_enter(&mut self, piece: &Piece);
    fn did_fall(&mut self, soft: bool);
    fn did_drop(&mut self, rows: i32);
    fn did_lock(&mut self, piece: &Piece);
    fn did_components_fall(&mut self, count: usize, max_distance: i32);
    fn did_chunks_fall(&mut self, count: usize, max_distance: i32);
    fn did_clear(&mut self, cascade: i32, chromatic: &[u8], monochrome: &[u8]);
    fn did_use_reserve(&mut self, stored: &Piece, released: &Piece);
    fn did_add_rows(&mut self, rows: u32);
    fn did_level_up(&mut self, level: u32);
    fn end_cycle(&mut self);

    fn score(&self) -> u64;
    fn rows_cleared(&self) -> u32;
    fn pieces_entered(&self) -> u32;
}

/// Level progression
pub trait Level: Persist + Send {
    fn level(&self) -> u32;
    fn should_level_up(&self, score: &dyn Score) -> bool;
    fn level_up(&mut self);
    /// Externally imposed change; returns the new level
    fn change_level(&mut self, delta: i32) -> u32;
}

/// Result of inserting rows from the bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowsAdded {
    pub rows: u32,
    /// Blocks were pushed out of the top
    pub overflow: bool,
}

/// An attack produced for an opponent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingAttack {
    pub garbage_rows: u32,
    pub cycle: u64,
}

/// Effect of an attack received from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackKind {
    /// Rows with one gap pushed in from the bottom
    Garbage { rows: u32 },
    /// Rows that can never clear pushed in from the bottom
    Push { rows: u32 },
    DropBlocks { kind: DropKind, count: u32 },
    LevelChange(i32),
    DisplacementAccel,
}

/// An attack waiting for its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingAttack {
    /// First cycle at which the attack takes effect
    pub due_cycle: u64,
    pub kind: AttackKind,
}

/// Garbage, pushes, displacement and level changes
pub trait Attack: Persist + Send {
    /// Accept an attack from outside; it waits until its cycle is due
    fn queue_incoming(&mut self, attack: IncomingAttack);

    /// Move incoming attacks due by `cycle` into the pending set
    fn dequeue_incoming(&mut self, cycle: u64);

    /// Advance the displacement clock
    fn tick(&mut self, seconds: f64);

    /// Fill the initial displacement rows; returns rows added
    fn prefill_displacement(&mut self, grid: &mut Grid) -> u32;

    fn has_garbage_rows(&self) -> bool;
    fn unleash_garbage_rows(&mut self, grid: &mut Grid) -> RowsAdded;

    fn has_push_rows(&self) -> bool;
    fn unleash_push_rows(&mut self, grid: &mut Grid) -> RowsAdded;

    fn has_displace_rows(&self) -> bool;
    fn unleash_displace_rows(&mut self, grid: &mut Grid) -> RowsAdded;

    fn has_displacement_accel(&self) -> bool;
    fn unleash_displacement_accel(&mut self);

    fn has_drop_blocks(&self) -> bool;
    /// Write pending drop counts per `DropKind::index` into `out`; returns the total
    fn unleash_drop_blocks(&mut self, out: &mut [u32; 5]) -> u32;

    fn has_level_change(&self) -> bool;
    fn unleash_level_change(&mut self) -> i32;

    fn has_outgoing_attacks(&self) -> bool;
    fn take_outgoing(&mut self) -> Option<OutgoingAttack>;

    fn did_enter(&mut self, piece: &Piece);
    fn did_lock(&mut self, piece: &Piece);
    fn did_clear(&mut self, cascade: i32, rows: u32, monochrome_rows: u32);
    fn did_use_reserve(&mut self);
    fn end_cycle(&mut self, cycle: u64);

    /// Special reserve use resolved to an attack
    fn issue_special_attack(&mut self);
}

/// Column choice for dropped garbage blocks
pub trait Valleys: Persist + Send {
    /// Candidate columns for `kind`, best first
    fn columns(&mut self, grid: &Grid, kind: DropKind, out: &mut ArrayVec<i32, MAX_COLS>);

    /// Column whose contents should be lifted by an "unlock best column" trigger,
    /// with the row to lift from
    fn best_column(&self, grid: &Grid) -> Option<(i32, i32)>;
}

/// Source of new pieces and the draw history
pub trait Bag: Persist + Send {
    fn draw(&mut self) -> PieceKind;

    /// A piece left the visible queues into the reserve, or came back out
    fn note_reserve(&mut self, stored: Option<PieceKind>, released: Option<PieceKind>);

    /// Draw counts indexed by `PieceKind::index`
    fn history(&self) -> &[u32];
}

/// What `Metamorphosis::end_cycle` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetamorphosisOutcome {
    pub activated: bool,
    pub deactivated: bool,
}

impl MetamorphosisOutcome {
    pub fn changed(&self) -> bool {
        self.activated || self.deactivated
    }
}

/// Whole-grid transforms
pub trait Metamorphosis: Persist + Send {
    fn metamorphosize(&mut self, activate: bool, grid: &mut Grid) -> bool;
    fn end_cycle(&mut self, grid: &mut Grid) -> MetamorphosisOutcome;
    fn is_active(&self) -> bool;
}

/// Outcome of spending a special charge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialUse {
    /// A generated piece re-enters in place of the falling one
    InsertReenter(PieceKind),
    /// An attack is issued; the falling piece is untouched
    Attack,
}

/// Special-piece charges
pub trait Special: Persist + Send {
    fn initialize(&mut self);
    fn has_charge(&self) -> bool;
    fn use_charge(&mut self) -> Option<SpecialUse>;
    fn did_clear(&mut self, rows: u32);
}

/// Requests pushed by trigger notifications
pub type TriggerSink = ArrayVec<Trigger, 8>;

/// Mode-specific rules hooked into state transitions.
///
/// Every method defaults to a no-op; an implementation pushes [`Trigger`]s
/// into `out` to have the core act on them right after the call returns.
pub trait Triggers: Persist + Send {
    fn did_enter(&mut self, piece: &Piece, offset: Offset, out: &mut TriggerSink) {
        let _ = (piece, offset, out);
    }

    fn did_turn(&mut self, piece: &Piece, offset: Offset, out: &mut TriggerSink) {
        let _ = (piece, offset, out);
    }

    fn did_kick(&mut self, piece: &Piece, offset: Offset, out: &mut TriggerSink) {
        let _ = (piece, offset, out);
    }

    fn will_lock(&mut self, piece: &Piece, offset: Offset, out: &mut TriggerSink) {
        let _ = (piece, offset, out);
    }

    fn did_lock(&mut self, piece: &Piece, offset: Offset, out: &mut TriggerSink) {
        let _ = (piece, offset, out);
    }

    fn did_clear(&mut self, cascade: i32, rows: u32, out: &mut TriggerSink) {
        let _ = (cascade, rows, out);
    }

    fn did_use_reserve(&mut self, stored: &Piece, released: &Piece, out: &mut TriggerSink) {
        let _ = (stored, released, out);
    }

    fn did_level_up(&mut self, level: u32, out: &mut TriggerSink) {
        let _ = (level, out);
    }

    fn will_end_cycle(&mut self, out: &mut TriggerSink) {
        let _ = out;
    }
}
