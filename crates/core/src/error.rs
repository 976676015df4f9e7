use thiserror::Error;

/// Failures surfaced by the simulation core and its rule subsystems
#[derive(Debug, Error)]
pub enum CoreError {
    /// A rotation or placement produced a malformed piece
    #[error("invalid piece: {0}")]
    InvalidPiece(String),

    /// A lock would merge two incompatible cell codes
    #[error("orientation conflict at pane {pane}, row {row}, column {col}")]
    OrientationConflict { pane: usize, row: i32, col: i32 },

    /// An operation was invoked where the object cannot honor it
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A progression sub-state that the state machine does not know
    #[error("unrecognized progression state: {0}")]
    UnrecognizedProgression(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] serde_json::Error),
}

impl CoreError {
    pub fn is_orientation_conflict(&self) -> bool {
        matches!(self, CoreError::OrientationConflict { .. })
    }
}
