use crate::entity::{Entity, Position};
use crate::transition::Transition;
use rustc_hash::FxHashMap;

/// Sparse cell map. Absent cells read as [`Entity::Floor`], and floor is never
/// stored, so two boards holding the same entities always compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    cells: FxHashMap<Position, Entity>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds are not checked here; that is up to the level and its callers.
    pub fn get(&self, pos: Position) -> Entity {
        self.cells.get(&pos).copied().unwrap_or(Entity::Floor)
    }

    pub fn set(&mut self, pos: Position, entity: Entity) {
        match entity {
            Entity::Floor => {
                self.cells.remove(&pos);
            }
            _ => {
                self.cells.insert(pos, entity);
            }
        }
    }

    /// Relocate every entity named by `transition` at once. All sources are
    /// read before any destination is written, so pairs whose source is
    /// another pair's destination resolve correctly.
    pub fn apply(&mut self, transition: &Transition) {
        let moved: Vec<(Position, Entity)> = transition
            .iter()
            .map(|(from, to)| (to, self.get(from)))
            .collect();
        for (from, _) in transition.iter() {
            self.cells.remove(&from);
        }
        for (to, entity) in moved {
            self.set(to, entity);
        }
    }

    /// Non-floor cells in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, Entity)> + '_ {
        self.cells.iter().map(|(&pos, &entity)| (pos, entity))
    }

    /// Number of non-floor cells.
    pub fn occupied(&self) -> usize {
        self.cells.len()
    }
}

impl FromIterator<(Position, Entity)> for Board {
    fn from_iter<I: IntoIterator<Item = (Position, Entity)>>(iter: I) -> Self {
        let mut board = Board::new();
        for (pos, entity) in iter {
            board.set(pos, entity);
        }
        board
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::AgentId;

    fn p(x: u16, y: u16) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn test_get_defaults_to_floor() {
        let board = Board::new();
        assert_eq!(board.get(p(3, 7)), Entity::Floor);
    }

    #[test]
    fn test_set_floor_clears() {
        let mut explicit = Board::new();
        explicit.set(p(1, 1), Entity::Wall);
        explicit.set(p(1, 1), Entity::Floor);
        explicit.set(p(2, 2), Entity::Floor);

        assert_eq!(explicit, Board::new());
        assert_eq!(explicit.occupied(), 0);
    }

    #[test]
    fn test_apply_push() {
        let agent = Entity::Agent(AgentId(0));
        let crate_ = Entity::Box(AgentId(0));
        let mut board: Board = [(p(0, 0), agent), (p(1, 0), crate_)].into_iter().collect();

        let mut t = Transition::new();
        t.record(p(1, 0), p(2, 0));
        t.record(p(0, 0), p(1, 0));
        board.apply(&t);

        assert_eq!(board.get(p(0, 0)), Entity::Floor);
        assert_eq!(board.get(p(1, 0)), agent);
        assert_eq!(board.get(p(2, 0)), crate_);

        board.apply(&t.reverse());
        assert_eq!(board.get(p(0, 0)), agent);
        assert_eq!(board.get(p(1, 0)), crate_);
        assert_eq!(board.get(p(2, 0)), Entity::Floor);
    }

    #[test]
    fn test_apply_rotation() {
        // Three entities cycling through three cells must not clobber each other.
        let a = Entity::Agent(AgentId(0));
        let b = Entity::Box(AgentId(0));
        let c = Entity::Agent(AgentId(1));
        let mut board: Board = [(p(0, 0), a), (p(1, 0), b), (p(2, 0), c)].into_iter().collect();

        let t = Transition::try_from(vec![(p(0, 0), p(1, 0)), (p(1, 0), p(2, 0)), (p(2, 0), p(0, 0))]).unwrap();
        board.apply(&t);

        assert_eq!(board.get(p(0, 0)), c);
        assert_eq!(board.get(p(1, 0)), a);
        assert_eq!(board.get(p(2, 0)), b);
    }
}
