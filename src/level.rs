use crate::board::Board;
use crate::entity::{AgentId, Entity, Position};
use crate::zobrist::Zobrist;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Largest accepted board edge.
pub const MAX_SIZE: u16 = 256;

/// How many undos a level grants, and how many a game has left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UndoQuota {
    #[default]
    Unlimited,
    Limited(u32),
}

impl UndoQuota {
    pub fn is_exhausted(&self) -> bool {
        *self == UndoQuota::Limited(0)
    }

    /// Whether `count` more undos fit in the quota.
    pub fn allows(&self, count: usize) -> bool {
        match self {
            UndoQuota::Unlimited => true,
            UndoQuota::Limited(n) => count <= *n as usize,
        }
    }

    /// Spend `count` undos. Callers check [`allows`](Self::allows) first.
    pub fn consume(&mut self, count: usize) {
        if let UndoQuota::Limited(n) = self {
            *n = n.saturating_sub(count as u32);
        }
    }
}

impl fmt::Display for UndoQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndoQuota::Unlimited => write!(f, "unlimited"),
            UndoQuota::Limited(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for UndoQuota {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unlimited") {
            return Ok(UndoQuota::Unlimited);
        }
        s.parse::<u32>()
            .map(UndoQuota::Limited)
            .map_err(|_| format!("expected 'unlimited' or a non-negative count, got '{}'", s))
    }
}

/// A violated level invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedLevel {
    #[error("level dimensions must be positive")]
    EmptyDimensions,

    #[error("board {width}x{height} exceeds maximum size {max}", max = MAX_SIZE)]
    TooLarge { width: u16, height: u16 },

    #[error("position {0} lies outside the board")]
    OutOfBounds(Position),

    #[error("no agent found on board")]
    MissingAgent,

    #[error("goal count ({goals}) does not match box count ({boxes})")]
    BoxGoalCountMismatch { boxes: usize, goals: usize },

    #[error("box owned by agent {0} has no matching agent")]
    UnmatchedOwner(AgentId),

    #[error("agent {0} owns no box")]
    AgentWithoutBox(AgentId),

    #[error("agent {0} appears more than once")]
    DuplicateAgent(AgentId),

    #[error("more than one entity placed at {0}")]
    PositionCollision(Position),

    #[error("goal tile {0} is covered by a wall")]
    GoalOnWall(Position),
}

/// Error type for level construction and parsing.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid level: {0}")]
    Malformed(#[from] MalformedLevel),

    #[error("Invalid character '{ch}' at position ({x}, {y})")]
    InvalidCharacter { ch: char, x: usize, y: usize },

    #[error("Empty board")]
    EmptyBoard,

    #[error("Invalid directive: {0}")]
    InvalidDirective(String),
}

/// An immutable, validated puzzle definition.
#[derive(Debug, Clone)]
pub struct Level {
    width: u16,
    height: u16,
    board: Board,
    goals: FxHashSet<Position>,
    undo_policy: UndoQuota,
    zobrist: Arc<Zobrist>,
}

impl Level {
    /// Build a level from explicit placements, checking every invariant.
    ///
    /// Cells not listed in `placement` are floor. Listing the same position
    /// twice with anything other than floor is a collision.
    pub fn new(
        width: u16,
        height: u16,
        placement: impl IntoIterator<Item = (Position, Entity)>,
        goals: impl IntoIterator<Item = Position>,
        undo_policy: UndoQuota,
    ) -> Result<Self, MalformedLevel> {
        if width == 0 || height == 0 {
            return Err(MalformedLevel::EmptyDimensions);
        }
        if width > MAX_SIZE || height > MAX_SIZE {
            return Err(MalformedLevel::TooLarge { width, height });
        }
        let in_bounds = |pos: Position| pos.x < width && pos.y < height;

        let mut board = Board::new();
        for (pos, entity) in placement {
            if !in_bounds(pos) {
                return Err(MalformedLevel::OutOfBounds(pos));
            }
            if entity == Entity::Floor {
                continue;
            }
            if board.get(pos) != Entity::Floor {
                return Err(MalformedLevel::PositionCollision(pos));
            }
            board.set(pos, entity);
        }

        let mut goal_set = FxHashSet::default();
        for pos in goals {
            if !in_bounds(pos) {
                return Err(MalformedLevel::OutOfBounds(pos));
            }
            if board.get(pos) == Entity::Wall {
                return Err(MalformedLevel::GoalOnWall(pos));
            }
            goal_set.insert(pos);
        }

        let mut agents: FxHashMap<AgentId, Position> = FxHashMap::default();
        let mut owners: BTreeSet<AgentId> = BTreeSet::new();
        let mut box_count = 0;
        for (pos, entity) in board.iter() {
            match entity {
                Entity::Agent(id) => {
                    if agents.insert(id, pos).is_some() {
                        return Err(MalformedLevel::DuplicateAgent(id));
                    }
                }
                Entity::Box(owner) => {
                    owners.insert(owner);
                    box_count += 1;
                }
                Entity::Wall | Entity::Floor => {}
            }
        }

        if agents.is_empty() {
            return Err(MalformedLevel::MissingAgent);
        }
        if box_count != goal_set.len() {
            return Err(MalformedLevel::BoxGoalCountMismatch {
                boxes: box_count,
                goals: goal_set.len(),
            });
        }
        if let Some(&owner) = owners.iter().find(|owner| !agents.contains_key(*owner)) {
            return Err(MalformedLevel::UnmatchedOwner(owner));
        }
        let mut agent_ids: Vec<AgentId> = agents.keys().copied().collect();
        agent_ids.sort();
        if let Some(&id) = agent_ids.iter().find(|id| !owners.contains(*id)) {
            return Err(MalformedLevel::AgentWithoutBox(id));
        }

        let zobrist = Zobrist::new(width, height, board.iter().map(|(_, entity)| entity));

        Ok(Level {
            width,
            height,
            board,
            goals: goal_set,
            undo_policy,
            zobrist: Arc::new(zobrist),
        })
    }

    /// Parse a level from XSB text, extended for several agents.
    ///
    /// Characters:
    /// - `#` = Wall
    /// - ` ` or `-` = Floor
    /// - `.` = Goal
    /// - `@` / `+` = Agent 0, on floor / on goal
    /// - `$` / `*` = Box owned by agent 0, on floor / on goal
    /// - `A`..`Z` = Agents 0..25
    /// - `a`..`z` = Boxes owned by agents 0..25
    pub fn from_text(text: &str, undo_policy: UndoQuota) -> Result<Self, LevelError> {
        let lines: Vec<&str> = text.lines().collect();

        if lines.is_empty() {
            return Err(LevelError::EmptyBoard);
        }

        let height = lines.len();
        let width = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);
        if width == 0 {
            return Err(LevelError::EmptyBoard);
        }
        if width > MAX_SIZE as usize || height > MAX_SIZE as usize {
            return Err(MalformedLevel::TooLarge {
                width: width.min(u16::MAX as usize) as u16,
                height: height.min(u16::MAX as usize) as u16,
            }
            .into());
        }

        let mut placement = Vec::new();
        let mut goals = Vec::new();

        for (y, line) in lines.iter().enumerate() {
            for (x, ch) in line.chars().enumerate() {
                let pos = Position::new(x as u16, y as u16);
                let (entity, goal) = match ch {
                    '#' => (Entity::Wall, false),
                    ' ' | '-' => (Entity::Floor, false),
                    '.' => (Entity::Floor, true),
                    '@' => (Entity::Agent(AgentId(0)), false),
                    '+' => (Entity::Agent(AgentId(0)), true),
                    '$' => (Entity::Box(AgentId(0)), false),
                    '*' => (Entity::Box(AgentId(0)), true),
                    'A'..='Z' => (Entity::Agent(AgentId((ch as u8 - b'A') as u32)), false),
                    'a'..='z' => (Entity::Box(AgentId((ch as u8 - b'a') as u32)), false),
                    _ => return Err(LevelError::InvalidCharacter { ch, x, y }),
                };
                placement.push((pos, entity));
                if goal {
                    goals.push(pos);
                }
            }
        }

        Ok(Level::new(
            width as u16,
            height as u16,
            placement,
            goals,
            undo_policy,
        )?)
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn goal_tiles(&self) -> &FxHashSet<Position> {
        &self.goals
    }

    pub fn is_goal(&self, pos: Position) -> bool {
        self.goals.contains(&pos)
    }

    pub fn undo_policy(&self) -> UndoQuota {
        self.undo_policy
    }

    /// Same level with a different undo policy.
    pub fn with_undo_policy(mut self, undo_policy: UndoQuota) -> Self {
        self.undo_policy = undo_policy;
        self
    }

    pub fn entity_at(&self, pos: Position) -> Entity {
        self.board.get(pos)
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Initial placement.
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub(crate) fn zobrist(&self) -> &Arc<Zobrist> {
        &self.zobrist
    }
}

/// Render `board` on a `width`x`height` grid using the level text alphabet.
pub(crate) fn render(
    f: &mut fmt::Formatter<'_>,
    width: u16,
    height: u16,
    board: &Board,
    goals: &FxHashSet<Position>,
) -> fmt::Result {
    for y in 0..height {
        let mut line = String::with_capacity(width as usize);
        for x in 0..width {
            let pos = Position::new(x, y);
            line.push(board.get(pos).to_char(goals.contains(&pos)));
        }
        // Trim trailing spaces to match original input format
        writeln!(f, "{}", line.trim_end())?;
    }
    Ok(())
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(f, self.width, self.height, &self.board, &self.goals)
    }
}
