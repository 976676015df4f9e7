//! Duoblock (workspace facade crate).
//!
//! Re-exports the workspace crates under one name so hosts can depend on a
//! single package: `duoblock::{core,engine,rules,types}`.

pub use duoblock_core as core;
pub use duoblock_engine as engine;
pub use duoblock_rules as rules;
pub use duoblock_types as types;
