//! Persisted form of a [`GameState`].
//!
//! A snapshot holds exactly what a session needs to resume: the board
//! contents, the sealed history, the open transition and the remaining undo
//! quota. Walls and goals come from the [`Level`] the snapshot is restored
//! against.

use crate::board::Board;
use crate::entity::{Entity, Position};
use crate::game::GameState;
use crate::level::{Level, UndoQuota};
use crate::transition::Transition;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("position {0} lies outside the level")]
    OutOfBounds(Position),

    #[error("wall layout differs from the level at {0}")]
    WallMismatch(Position),

    #[error("snapshot holds {found} movable entities, level has {expected}")]
    CountMismatch { expected: usize, found: usize },

    #[error("move {from} -> {to} cannot be undone on the saved board")]
    InvalidTransition { from: Position, to: Position },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Non-floor cells, sorted by position.
    pub cells: Vec<(Position, Entity)>,
    /// Sealed checkpoints, oldest first.
    pub history: Vec<Transition>,
    pub open: Transition,
    pub remaining_undo: UndoQuota,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl GameState {
    pub fn snapshot(&self) -> Snapshot {
        let mut cells: Vec<(Position, Entity)> = self.board().iter().collect();
        cells.sort();
        Snapshot {
            cells,
            history: self.history().cloned().collect(),
            open: self.open_transition().clone(),
            remaining_undo: self.remaining_undo(),
        }
    }

    /// Resume a session on `level` from `snapshot`.
    ///
    /// The board must keep the level's walls and the same number of boxes and
    /// agents, and every position the snapshot mentions must be on the board.
    /// The open transition and every checkpoint must undo cleanly, newest
    /// first, starting from the saved board.
    pub fn restore(level: &Level, snapshot: Snapshot) -> Result<GameState, SnapshotError> {
        let Snapshot {
            cells,
            history,
            open,
            remaining_undo,
        } = snapshot;

        let transitions = history.iter().chain(std::iter::once(&open));
        for pos in cells
            .iter()
            .map(|&(pos, _)| pos)
            .chain(transitions.flat_map(|t| t.touched().collect::<Vec<_>>()))
        {
            if !level.in_bounds(pos) {
                return Err(SnapshotError::OutOfBounds(pos));
            }
        }

        let board: Board = cells.into_iter().collect();
        for (pos, entity) in level.board().iter() {
            if entity == Entity::Wall && board.get(pos) != Entity::Wall {
                return Err(SnapshotError::WallMismatch(pos));
            }
        }
        for (pos, entity) in board.iter() {
            if entity == Entity::Wall && level.entity_at(pos) != Entity::Wall {
                return Err(SnapshotError::WallMismatch(pos));
            }
        }

        let movable = |board: &Board| board.iter().filter(|(_, e)| e.is_movable()).count();
        let expected = movable(level.board());
        let found = movable(&board);
        if expected != found {
            return Err(SnapshotError::CountMismatch { expected, found });
        }

        check_undoable(&board, &history, &open)?;

        Ok(GameState::from_parts(
            level,
            board,
            history,
            open,
            remaining_undo,
        ))
    }
}

// Replays every undo on a scratch board. Each reversed move must pick up a
// movable entity and drop it on floor or on a cell vacated by the same undo.
fn check_undoable(
    board: &Board,
    history: &[Transition],
    open: &Transition,
) -> Result<(), SnapshotError> {
    let mut scratch = board.clone();
    for transition in std::iter::once(open).chain(history.iter().rev()) {
        for (origin, dest) in transition.iter() {
            let vacated = transition.origin_of(origin).is_some();
            let landing_free = vacated || scratch.get(origin) == Entity::Floor;
            if !scratch.get(dest).is_movable() || !landing_free {
                return Err(SnapshotError::InvalidTransition {
                    from: origin,
                    to: dest,
                });
            }
        }
        scratch.apply(&transition.reverse());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::AgentId;

    fn p(x: u16, y: u16) -> Position {
        Position::new(x, y)
    }

    fn level() -> Level {
        Level::from_text("#######\n#@$  .#\n#######", UndoQuota::Limited(3)).unwrap()
    }

    #[test]
    fn test_snapshot_resume() {
        let level = level();
        let mut game = GameState::new(&level);
        game.move_entity(p(2, 1), p(3, 1));
        game.move_entity(p(1, 1), p(2, 1));
        game.checkpoint();
        game.move_entity(p(3, 1), p(4, 1));
        game.move_entity(p(2, 1), p(3, 1));

        let json = game.snapshot().to_json().unwrap();
        let mut resumed = GameState::restore(&level, Snapshot::from_json(&json).unwrap()).unwrap();

        assert_eq!(resumed.board(), game.board());
        assert_eq!(resumed.history_len(), 1);
        assert_eq!(resumed.open_transition(), game.open_transition());
        assert_eq!(resumed.remaining_undo(), UndoQuota::Limited(3));
        assert_eq!(resumed.fingerprint(), game.fingerprint());
        assert_eq!(resumed.empty_goals(), 1);

        resumed.rewind(2).unwrap();
        assert_eq!(resumed.board(), level.board());
    }

    #[test]
    fn test_restore_rejects_moved_wall() {
        let level = level();
        let mut snapshot = GameState::new(&level).snapshot();
        snapshot.cells.retain(|&(pos, _)| pos != p(0, 0));
        assert!(matches!(
            GameState::restore(&level, snapshot),
            Err(SnapshotError::WallMismatch(pos)) if pos == p(0, 0)
        ));
    }

    #[test]
    fn test_restore_rejects_out_of_bounds() {
        let level = level();
        let mut snapshot = GameState::new(&level).snapshot();
        snapshot.open = Transition::try_from(vec![(p(1, 1), p(9, 9))]).unwrap();
        assert!(matches!(
            GameState::restore(&level, snapshot),
            Err(SnapshotError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_restore_rejects_missing_entity() {
        let level = level();
        let mut snapshot = GameState::new(&level).snapshot();
        snapshot
            .cells
            .retain(|&(_, entity)| entity != Entity::Agent(AgentId(0)));
        assert!(matches!(
            GameState::restore(&level, snapshot),
            Err(SnapshotError::CountMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_restore_rejects_move_from_wall() {
        let level = level();
        let mut snapshot = GameState::new(&level).snapshot();
        // undoing this would put the agent back inside the wall
        snapshot.open = Transition::try_from(vec![(p(0, 1), p(1, 1))]).unwrap();
        assert!(matches!(
            GameState::restore(&level, snapshot),
            Err(SnapshotError::InvalidTransition { from, to }) if from == p(0, 1) && to == p(1, 1)
        ));
    }

    #[test]
    fn test_restore_rejects_move_to_empty_cell() {
        let level = level();
        let mut snapshot = GameState::new(&level).snapshot();
        snapshot.open = Transition::try_from(vec![(p(1, 1), p(4, 1))]).unwrap();
        assert!(matches!(
            GameState::restore(&level, snapshot),
            Err(SnapshotError::InvalidTransition { from, to }) if from == p(1, 1) && to == p(4, 1)
        ));
    }

    #[test]
    fn test_restore_rejects_broken_history() {
        let level = level();
        let mut game = GameState::new(&level);
        game.move_entity(p(2, 1), p(3, 1));
        game.move_entity(p(1, 1), p(2, 1));
        game.checkpoint();
        game.move_entity(p(2, 1), p(1, 1));

        // the sealed push loses the agent's step, so undoing the box would land
        // on the agent's cell
        let mut snapshot = game.snapshot();
        snapshot.history = vec![Transition::try_from(vec![(p(2, 1), p(3, 1))]).unwrap()];
        let mut tampered = snapshot.clone();
        assert!(matches!(
            GameState::restore(&level, snapshot),
            Err(SnapshotError::InvalidTransition { from, to }) if from == p(2, 1) && to == p(3, 1)
        ));

        // without the open step the agent is out of the way again
        tampered.open = Transition::new();
        let mut resumed = GameState::restore(&level, tampered).unwrap();
        resumed.undo().unwrap();
        assert_eq!(resumed.entity_at(p(2, 1)), Entity::Box(AgentId(0)));
    }

    #[test]
    fn test_from_json_rejects_duplicate_destination() {
        let level = level();
        let mut value = serde_json::to_value(GameState::new(&level).snapshot()).unwrap();
        value["open"] = serde_json::json!([
            [{ "x": 1, "y": 1 }, { "x": 3, "y": 1 }],
            [{ "x": 2, "y": 1 }, { "x": 3, "y": 1 }],
        ]);
        assert!(matches!(
            Snapshot::from_json(&value.to_string()),
            Err(SnapshotError::Json(_))
        ));
    }

    #[test]
    fn test_from_json_garbage() {
        assert!(matches!(
            Snapshot::from_json("{\"cells\": 3}"),
            Err(SnapshotError::Json(_))
        ));
    }
}
