use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell coordinate on the board. `x` grows to the right, `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub const fn new(x: u16, y: u16) -> Self {
        Position { x, y }
    }
}

impl From<(u16, u16)> for Position {
    fn from((x, y): (u16, u16)) -> Self {
        Position { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Identifies an agent, and the boxes that agent owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What occupies a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Entity {
    Wall,
    Floor,
    Box(AgentId),
    Agent(AgentId),
}

impl Entity {
    /// Walls and floor never move; boxes and agents do.
    pub fn is_movable(&self) -> bool {
        match self {
            Entity::Box(_) | Entity::Agent(_) => true,
            Entity::Wall | Entity::Floor => false,
        }
    }

    pub fn is_box(&self) -> bool {
        matches!(self, Entity::Box(_))
    }

    /// Character used by the XSB-style text format. Goal markers for id 0
    /// use the classic `+`/`*` symbols; other ids have no on-goal variant.
    pub fn to_char(&self, on_goal: bool) -> char {
        match (self, on_goal) {
            (Entity::Wall, _) => '#',
            (Entity::Floor, false) => ' ',
            (Entity::Floor, true) => '.',
            (Entity::Agent(AgentId(0)), false) => '@',
            (Entity::Agent(AgentId(0)), true) => '+',
            (Entity::Box(AgentId(0)), false) => '$',
            (Entity::Box(AgentId(0)), true) => '*',
            (Entity::Agent(AgentId(id)), _) => letter(*id, b'A'),
            (Entity::Box(AgentId(id)), _) => letter(*id, b'a'),
        }
    }
}

fn letter(id: u32, base: u8) -> char {
    if id < 26 { (base + id as u8) as char } else { '?' }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Wall => write!(f, "Wall"),
            Entity::Floor => write!(f, "Floor"),
            Entity::Box(owner) => write!(f, "Box({})", owner),
            Entity::Agent(id) => write!(f, "Agent({})", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_char() {
        assert_eq!(Entity::Wall.to_char(false), '#');
        assert_eq!(Entity::Floor.to_char(true), '.');
        assert_eq!(Entity::Agent(AgentId(0)).to_char(true), '+');
        assert_eq!(Entity::Box(AgentId(0)).to_char(true), '*');
        assert_eq!(Entity::Agent(AgentId(2)).to_char(false), 'C');
        assert_eq!(Entity::Box(AgentId(25)).to_char(false), 'z');
        assert_eq!(Entity::Box(AgentId(26)).to_char(false), '?');
    }

    #[test]
    fn test_is_movable() {
        assert!(Entity::Box(AgentId(1)).is_movable());
        assert!(Entity::Agent(AgentId(1)).is_movable());
        assert!(!Entity::Wall.is_movable());
        assert!(!Entity::Floor.is_movable());
    }
}
