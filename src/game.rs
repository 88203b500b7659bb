use crate::board::Board;
use crate::entity::{AgentId, Entity, Position};
use crate::level::{Level, UndoQuota, render};
use crate::transition::Transition;
use crate::zobrist::Zobrist;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::sync::Arc;
use thiserror::Error;

/// Why an undo was refused. A refused undo leaves the game untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UndoError {
    #[error("no undo quota remaining")]
    NoQuotaRemaining,

    #[error("nothing to undo")]
    NoHistory,
}

/// Live state of one play session on a [`Level`].
///
/// All board mutation goes through [`move_entity`](Self::move_entity),
/// [`undo`](Self::undo) and [`rewind`](Self::rewind). Moves made since the last
/// [`checkpoint`](Self::checkpoint) accumulate in an open transition; each
/// checkpoint seals it as one undoable unit.
#[derive(Debug, Clone)]
pub struct GameState {
    board: Board,
    width: u16,
    height: u16,
    goals: FxHashSet<Position>,
    // Oldest checkpoint first. Under `Limited(n)` at most n are kept.
    history: VecDeque<Transition>,
    open: Transition,
    remaining_undo: UndoQuota,
    empty_goals: usize,
    hash: u64,
    zobrist: Arc<Zobrist>,
}

impl GameState {
    pub fn new(level: &Level) -> Self {
        let board = level.board().clone();
        let goals = level.goal_tiles().clone();
        let empty_goals = goals.iter().filter(|&&pos| !board.get(pos).is_box()).count();
        let zobrist = Arc::clone(level.zobrist());
        let hash = zobrist.compute_hash(&board);

        GameState {
            board,
            width: level.width(),
            height: level.height(),
            goals,
            history: VecDeque::new(),
            open: Transition::new(),
            remaining_undo: level.undo_policy(),
            empty_goals,
            hash,
            zobrist,
        }
    }

    /// Rebuild a state from its parts. The parts are trusted to be
    /// consistent with `level`.
    pub(crate) fn from_parts(
        level: &Level,
        board: Board,
        history: Vec<Transition>,
        open: Transition,
        remaining_undo: UndoQuota,
    ) -> Self {
        let mut game = GameState::new(level);
        game.empty_goals = game
            .goals
            .iter()
            .filter(|&&pos| !board.get(pos).is_box())
            .count();
        game.hash = game.zobrist.compute_hash(&board);
        game.board = board;
        game.history = history.into();
        game.open = open;
        game.remaining_undo = remaining_undo;
        game.trim_history();
        game
    }

    pub fn entity_at(&self, pos: Position) -> Entity {
        self.board.get(pos)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    pub fn goal_tiles(&self) -> &FxHashSet<Position> {
        &self.goals
    }

    pub fn remaining_undo(&self) -> UndoQuota {
        self.remaining_undo
    }

    /// Number of sealed checkpoints that can still be undone.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub(crate) fn history(&self) -> impl Iterator<Item = &Transition> {
        self.history.iter()
    }

    /// Moves made since the last checkpoint.
    pub fn open_transition(&self) -> &Transition {
        &self.open
    }

    /// Goal tiles not currently holding a box.
    pub fn empty_goals(&self) -> usize {
        self.empty_goals
    }

    /// Zobrist hash of the current placement. Equal boards hash equal,
    /// whatever sequence of moves produced them.
    pub fn fingerprint(&self) -> u64 {
        self.hash
    }

    pub fn agent_position(&self, id: AgentId) -> Option<Position> {
        self.board
            .iter()
            .find(|&(_, entity)| entity == Entity::Agent(id))
            .map(|(pos, _)| pos)
    }

    /// Move whatever stands at `from` to `to`.
    ///
    /// The move must already be legal under the puzzle's rules; nothing beyond
    /// bounds is checked. Whatever was at `to` is overwritten, so a push moves
    /// the box first and the agent second.
    pub fn move_entity(&mut self, from: Position, to: Position) {
        assert!(self.in_bounds(from), "move source {} out of bounds", from);
        assert!(self.in_bounds(to), "move destination {} out of bounds", to);
        if from == to {
            return;
        }

        self.retract(from);
        self.retract(to);
        let entity = self.board.get(from);
        self.board.set(to, entity);
        self.board.set(from, Entity::Floor);
        self.account(from);
        self.account(to);

        self.open.record(from, to);
        tracing::debug!(%from, %to, %entity, "move");
    }

    /// Seal the moves made since the last checkpoint into one undoable unit.
    /// A turn without net moves is sealed too, and undoing it spends an undo
    /// without changing the board.
    ///
    /// Under `Unlimited` undo the history grows with every checkpoint.
    pub fn checkpoint(&mut self) {
        let sealed = mem::take(&mut self.open);
        self.history.push_back(sealed);
        self.trim_history();
        tracing::debug!(
            history = self.history.len(),
            remaining_undo = %self.remaining_undo,
            "checkpoint"
        );
    }

    /// Roll back one unit: the open moves if there are any, otherwise the most
    /// recent checkpoint. Spends one undo from the quota.
    ///
    /// Open moves go first because a sealed checkpoint only reverses cleanly
    /// from the board it was sealed on; reverting it underneath uncommitted
    /// moves would misplace entities.
    pub fn undo(&mut self) -> Result<(), UndoError> {
        if self.remaining_undo.is_exhausted() {
            return Err(UndoError::NoQuotaRemaining);
        }
        let transition = if !self.open.is_empty() {
            mem::take(&mut self.open)
        } else {
            self.history.pop_back().ok_or(UndoError::NoHistory)?
        };

        self.apply(&transition.reverse());
        self.remaining_undo.consume(1);
        self.trim_history();
        tracing::debug!(
            history = self.history.len(),
            remaining_undo = %self.remaining_undo,
            "undo"
        );
        Ok(())
    }

    /// Roll back `steps` units in a single board update, spending `steps`
    /// undos. Either every step is undone or, on error, none is.
    pub fn rewind(&mut self, steps: usize) -> Result<(), UndoError> {
        if steps == 0 {
            return Ok(());
        }
        if !self.remaining_undo.allows(steps) {
            return Err(UndoError::NoQuotaRemaining);
        }
        let open_units = usize::from(!self.open.is_empty());
        if open_units + self.history.len() < steps {
            return Err(UndoError::NoHistory);
        }

        let mut units = Vec::with_capacity(steps);
        if open_units == 1 {
            units.push(mem::take(&mut self.open));
        }
        while units.len() < steps {
            // Checked above: enough checkpoints remain.
            let Some(transition) = self.history.pop_back() else {
                break;
            };
            units.push(transition);
        }

        // Newest first: undoing the newest unit happens before the older ones.
        let net = units
            .iter()
            .map(Transition::reverse)
            .reduce(|done, next| done.merge_older_with(&next))
            .unwrap_or_default();

        self.apply(&net);
        self.remaining_undo.consume(steps);
        self.trim_history();
        tracing::debug!(
            steps,
            history = self.history.len(),
            remaining_undo = %self.remaining_undo,
            "rewind"
        );
        Ok(())
    }

    /// True when every goal tile holds a box, whoever owns it.
    pub fn is_win(&self) -> bool {
        self.empty_goals == 0
    }

    fn apply(&mut self, transition: &Transition) {
        let touched: Vec<Position> = transition.touched().collect();
        for &pos in &touched {
            self.retract(pos);
        }
        self.board.apply(transition);
        for &pos in &touched {
            self.account(pos);
        }
    }

    // Remove the bookkeeping contribution of `pos` before it changes.
    fn retract(&mut self, pos: Position) {
        let entity = self.board.get(pos);
        self.hash ^= self.zobrist.key(entity, pos);
        if entity.is_box() && self.goals.contains(&pos) {
            self.empty_goals += 1;
        }
    }

    // Add the bookkeeping contribution of `pos` after it changed.
    fn account(&mut self, pos: Position) {
        let entity = self.board.get(pos);
        self.hash ^= self.zobrist.key(entity, pos);
        if entity.is_box() && self.goals.contains(&pos) {
            self.empty_goals -= 1;
        }
    }

    // Checkpoints deeper than the remaining quota can never be undone.
    fn trim_history(&mut self) {
        if let UndoQuota::Limited(n) = self.remaining_undo {
            while self.history.len() > n as usize {
                self.history.pop_front();
            }
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(f, self.width, self.height, &self.board, &self.goals)
    }
}
