//! Core types module - shared data structures and constants
//!
//! This module defines the vocabulary shared by every crate in the workspace:
//! grid constants, block codes, piece kinds, player actions, the state-machine
//! states and the event bitset. All types are plain data with serde derives so
//! they can travel inside a save game unchanged.
//!
//! # Grid Geometry
//!
//! The block field is `PANES x rows x cols`, with row 0 at the bottom:
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `PANES` | 2 | depth layers that interact chromatically |
//! | `DEFAULT_ROWS` | 20 | default playfield height |
//! | `DEFAULT_COLS` | 8 | default playfield width |
//! | `NEXT_LOOKAHEAD` | 5 | visible next pieces |
//! | `RESERVE_LOOKAHEAD` | 2 | reserve queue depth |
//! | `MAX_COMPONENTS` | 4 | fragments a locking piece may split into |
//! | `MAX_CHUNKS` | 32 | floating groups handled per gravity pass |
//!
//! # Examples
//!
//! ```
//! use duoblock_types::{GameAction, Lean, PieceKind, Shape, Variant, State, ProgressionState};
//!
//! let kind = PieceKind::new(Shape::T, Variant::Linked);
//! assert_eq!(PieceKind::from_index(kind.index()), Some(kind));
//!
//! assert_eq!(Lean::DownLeft.bias(), (-1, -1));
//! assert_eq!(GameAction::from_str("drop"), Some(GameAction::Drop));
//!
//! let state = State::Progression(ProgressionState::ChunksFall);
//! assert!(state.is_progression());
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Number of depth panes in the block field
pub const PANES: usize = 2;

/// Default playfield height in rows
pub const DEFAULT_ROWS: usize = 20;

/// Default playfield width in columns
pub const DEFAULT_COLS: usize = 8;

/// Largest supported playfield height
pub const MAX_ROWS: usize = 64;

/// Largest supported playfield width
pub const MAX_COLS: usize = 32;

/// Number of upcoming pieces kept in the next queue
pub const NEXT_LOOKAHEAD: usize = 5;

/// Number of pieces the reserve queue can hold
pub const RESERVE_LOOKAHEAD: usize = 2;

/// Maximum number of components a locking piece splits into
pub const MAX_COMPONENTS: usize = 4;

/// Maximum number of floating chunks resolved in one gravity pass
pub const MAX_CHUNKS: usize = 32;

/// Block codes stored in the field.
///
/// The core never interprets these; they are the vocabulary of the standard
/// rule set. Pane 0 holds `S0`, pane 1 holds `S1`, and a cell filled in both
/// panes at the same position is a "linked" cell.
pub mod block {
    /// Empty cell sentinel
    pub const EMPTY: u8 = 0;
    /// Standard block in pane 0
    pub const S0: u8 = 1;
    /// Standard block in pane 1
    pub const S1: u8 = 2;

    /// Code written into `pane` by the standard rules.
    pub fn pane_code(pane: usize) -> u8 {
        if pane == 0 {
            S0
        } else {
            S1
        }
    }
}

/// The seven tetromino shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl Shape {
    pub const ALL: [Shape; 7] = [
        Shape::I,
        Shape::O,
        Shape::T,
        Shape::S,
        Shape::Z,
        Shape::J,
        Shape::L,
    ];

    /// Parse shape from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "i" => Some(Shape::I),
            "o" => Some(Shape::O),
            "t" => Some(Shape::T),
            "s" => Some(Shape::S),
            "z" => Some(Shape::Z),
            "j" => Some(Shape::J),
            "l" => Some(Shape::L),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::I => "i",
            Shape::O => "o",
            Shape::T => "t",
            Shape::S => "s",
            Shape::Z => "z",
            Shape::J => "j",
            Shape::L => "l",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Shape::I => 0,
            Shape::O => 1,
            Shape::T => 2,
            Shape::S => 3,
            Shape::Z => 4,
            Shape::J => 5,
            Shape::L => 6,
        }
    }
}

/// Which panes a piece occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    Pane0,
    Pane1,
    /// Occupies both panes at every cell
    Linked,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Pane0, Variant::Pane1, Variant::Linked];

    pub fn index(&self) -> usize {
        match self {
            Variant::Pane0 => 0,
            Variant::Pane1 => 1,
            Variant::Linked => 2,
        }
    }

    /// Whether this variant fills `pane`
    pub fn fills(&self, pane: usize) -> bool {
        match self {
            Variant::Pane0 => pane == 0,
            Variant::Pane1 => pane == 1,
            Variant::Linked => true,
        }
    }
}

/// A piece type: shape plus pane variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PieceKind {
    pub shape: Shape,
    pub variant: Variant,
}

impl PieceKind {
    /// Number of distinct kinds
    pub const COUNT: usize = 21;

    pub const fn new(shape: Shape, variant: Variant) -> Self {
        Self { shape, variant }
    }

    /// Dense index in `0..PieceKind::COUNT`
    pub fn index(&self) -> usize {
        self.variant.index() * 7 + self.shape.index()
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index >= Self::COUNT {
            return None;
        }
        Some(Self {
            shape: Shape::ALL[index % 7],
            variant: Variant::ALL[index / 7],
        })
    }
}

/// Directional preference used to order kick candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Lean {
    #[default]
    None,
    Left,
    Right,
    Down,
    DownLeft,
    DownRight,
}

impl Lean {
    /// Bias vector `(dx, dy)`; row numbers grow upward so "down" is `-1`.
    pub fn bias(&self) -> (i32, i32) {
        match self {
            Lean::None => (0, 0),
            Lean::Left => (-1, 0),
            Lean::Right => (1, 0),
            Lean::Down => (0, -1),
            Lean::DownLeft => (-1, -1),
            Lean::DownRight => (1, -1),
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" | "" => Some(Lean::None),
            "left" => Some(Lean::Left),
            "right" => Some(Lean::Right),
            "down" => Some(Lean::Down),
            "downleft" | "down-left" => Some(Lean::DownLeft),
            "downright" | "down-right" => Some(Lean::DownRight),
            _ => None,
        }
    }
}

/// Player actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameAction {
    MoveLeft,
    MoveRight,
    TurnCw(Lean),
    TurnCcw(Lean),
    Turn180(Lean),
    Flip(Lean),
    /// Soft fall by one row
    Fall,
    /// Hard drop to the resting position
    Drop,
    UseReserve(Lean),
}

impl GameAction {
    /// Parse action from string; turn/flip/reserve parse with no lean
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "moveleft" | "left" => Some(GameAction::MoveLeft),
            "moveright" | "right" => Some(GameAction::MoveRight),
            "turncw" | "cw" => Some(GameAction::TurnCw(Lean::None)),
            "turnccw" | "ccw" => Some(GameAction::TurnCcw(Lean::None)),
            "turn180" | "180" => Some(GameAction::Turn180(Lean::None)),
            "flip" => Some(GameAction::Flip(Lean::None)),
            "fall" => Some(GameAction::Fall),
            "drop" => Some(GameAction::Drop),
            "reserve" | "usereserve" => Some(GameAction::UseReserve(Lean::None)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameAction::MoveLeft => "moveLeft",
            GameAction::MoveRight => "moveRight",
            GameAction::TurnCw(_) => "turnCw",
            GameAction::TurnCcw(_) => "turnCcw",
            GameAction::Turn180(_) => "turn180",
            GameAction::Flip(_) => "flip",
            GameAction::Fall => "fall",
            GameAction::Drop => "drop",
            GameAction::UseReserve(_) => "useReserve",
        }
    }
}

/// In-place piece transformations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnKind {
    Cw,
    Ccw,
    Half,
    Flip,
}

/// Coarse game period gating whether the state machine runs at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    #[default]
    Prestart,
    Ongoing,
    Lost,
}

/// Sub-states of the progression phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressionState {
    ComponentsUnlock,
    ComponentsFall,
    ComponentsLock,
    TriggeredMetamorphosis,
    ChunksUnlock,
    ChunksFall,
    ChunksLock,
    Clear,
}

/// Outer states of the tick state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum State {
    #[default]
    Initializing,
    Synchronizing,
    Preparing,
    Entering,
    Falling,
    Progression(ProgressionState),
    EndingCycle,
}

impl State {
    pub fn is_progression(&self) -> bool {
        matches!(self, State::Progression(_))
    }

    pub fn progression(&self) -> Option<ProgressionState> {
        match self {
            State::Progression(p) => Some(*p),
            _ => None,
        }
    }
}

/// How the reserve ("hold") piece behaves; fixed per game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReserveBehavior {
    #[default]
    Swap,
    SwapReenter,
    Insert,
    InsertReenter,
    Special,
}

impl ReserveBehavior {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "swap" => Some(ReserveBehavior::Swap),
            "swap-reenter" | "swapreenter" => Some(ReserveBehavior::SwapReenter),
            "insert" => Some(ReserveBehavior::Insert),
            "insert-reenter" | "insertreenter" => Some(ReserveBehavior::InsertReenter),
            "special" => Some(ReserveBehavior::Special),
            _ => None,
        }
    }
}

/// Garbage drop placement heuristics, in the order they are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DropKind {
    Valleys,
    Junctions,
    Peaks,
    Corners,
    Troll,
}

impl DropKind {
    /// Application order inside a single chunk-unlock pass
    pub const ORDER: [DropKind; 5] = [
        DropKind::Valleys,
        DropKind::Junctions,
        DropKind::Peaks,
        DropKind::Corners,
        DropKind::Troll,
    ];

    pub fn index(&self) -> usize {
        match self {
            DropKind::Valleys => 0,
            DropKind::Junctions => 1,
            DropKind::Peaks => 2,
            DropKind::Corners => 3,
            DropKind::Troll => 4,
        }
    }
}

/// Effects a trigger system may request from the core.
///
/// Triggers are pushed into a sink during any notification and applied by the
/// state machine immediately after the notification returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    /// Skip writing the locking piece into the grid
    CancelLock,
    /// Lift the deepest column above its highest hole
    UnlockBestColumn,
    UnlockColumnAbove { col: i32, row: i32 },
    DropBlocks { kind: DropKind, count: u32 },
    ActivateMetamorphosisAfterLock,
    DeactivateMetamorphosisAfterLock,
    ActivateMetamorphosisBeforeEndCycle,
    DeactivateMetamorphosisBeforeEndCycle,
}

bitflags! {
    /// Event taxonomy fired by the state machine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct GameEvents: u32 {
        const MOVED = 1 << 0;
        const TURNED = 1 << 1;
        const FLIPPED = 1 << 2;
        const KICKED = 1 << 3;
        const FELL = 1 << 4;
        const DROPPED = 1 << 5;
        const COLLIDED = 1 << 6;
        const ENTERED = 1 << 7;
        const LOCKED = 1 << 8;
        const COMPONENTS_FELL = 1 << 9;
        const CHUNKS_FELL = 1 << 10;
        const CLEARED = 1 << 11;
        const METAMORPHOSIZED = 1 << 12;
        const GARBAGE_ADDED = 1 << 13;
        const ROWS_PUSHED = 1 << 14;
        const BLOCKS_DROPPED = 1 << 15;
        const DISPLACED = 1 << 16;
        const QUEUE_CHANGED = 1 << 17;
        const RESERVE_CHANGED = 1 << 18;
        const RESERVE_USED = 1 << 19;
        const LEVEL_UP = 1 << 20;
        const ACTION_CYCLE_ENDED = 1 << 21;
        const LOST = 1 << 22;
    }
}

impl GameEvents {
    /// Events that normally accompany an uninterrupted animation
    pub fn animated() -> Self {
        GameEvents::COMPONENTS_FELL
            | GameEvents::CHUNKS_FELL
            | GameEvents::CLEARED
            | GameEvents::METAMORPHOSIZED
            | GameEvents::GARBAGE_ADDED
            | GameEvents::ROWS_PUSHED
            | GameEvents::DISPLACED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piece_kind_index_covers_every_kind() {
        for index in 0..PieceKind::COUNT {
            let kind = PieceKind::from_index(index).unwrap();
            assert_eq!(kind.index(), index);
        }
        assert_eq!(PieceKind::from_index(PieceKind::COUNT), None);
    }

    #[test]
    fn lean_bias_points_down_for_down_leans() {
        assert_eq!(Lean::Down.bias().1, -1);
        assert_eq!(Lean::DownRight.bias(), (1, -1));
        assert_eq!(Lean::None.bias(), (0, 0));
    }

    #[test]
    fn drop_order_is_fixed() {
        let order: Vec<usize> = DropKind::ORDER.iter().map(|k| k.index()).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn state_progression_accessor() {
        assert_eq!(State::Falling.progression(), None);
        assert_eq!(
            State::Progression(ProgressionState::Clear).progression(),
            Some(ProgressionState::Clear)
        );
    }

    #[test]
    fn reserve_behavior_parses_dashed_names() {
        assert_eq!(
            ReserveBehavior::from_str("insert-reenter"),
            Some(ReserveBehavior::InsertReenter)
        );
        assert_eq!(ReserveBehavior::from_str("nope"), None);
    }
}
