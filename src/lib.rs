//! Game-state engine for multi-agent Sokoban.
//!
//! A [`Level`] is a validated, immutable puzzle. A [`GameState`] plays it:
//! callers submit already-legal moves, seal turns with checkpoints, undo turns
//! within the level's quota, and poll for the win condition.

pub mod board;
pub mod entity;
pub mod game;
pub mod level;
pub mod levels;
pub mod script;
pub mod snapshot;
pub mod transition;
mod zobrist;

pub use board::Board;
pub use entity::{AgentId, Entity, Position};
pub use game::{GameState, UndoError};
pub use level::{Level, LevelError, MalformedLevel, UndoQuota};
pub use levels::Levels;
pub use snapshot::{Snapshot, SnapshotError};
pub use transition::{Transition, TransitionError};
