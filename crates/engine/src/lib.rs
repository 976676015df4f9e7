//! Game engine - the tick state machine and everything around it
//!
//! [`Game`] owns a [`GameState`] and one boxed collaborator per rule
//! subsystem. A host drives it with [`Game::advance`] and player actions,
//! reads it through accessors and [`Game::slice`], and receives
//! notifications through the [`Host`] trait.
//!
//! # Module Structure
//!
//! - [`config`]: game configuration and environment overlay
//! - [`builder`]: assembling a game from configuration and overrides
//! - [`game`]: the state machine
//! - `actions`, `reserve`: player actions on the falling piece
//! - [`slice`]: render projection
//! - [`persist`]: save games
//! - [`host`]: the host boundary
//! - [`state`]: the serializable aggregate
//!
//! # Example
//!
//! ```
//! use duoblock_engine::{GameBuilder, GameConfig};
//!
//! let mut game = GameBuilder::new(GameConfig::default()).build().unwrap();
//! game.start();
//! game.advance(0.5).unwrap();
//! assert!(!game.next_pieces()[0].is_empty());
//! ```

mod actions;
pub mod builder;
pub mod config;
pub mod game;
pub mod host;
pub mod persist;
mod reserve;
pub mod slice;
pub mod state;

pub use builder::GameBuilder;
pub use config::GameConfig;
pub use game::{entry_offset, Game, SharedGame};
pub use host::{Host, HostEvent, NullHost, RecordingHost};
pub use persist::{SaveGame, SAVE_VERSION};
pub use slice::{BlocksSlice, FallWave, SliceProjector};
pub use state::{GameState, PiecePool};
