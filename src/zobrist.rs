use crate::board::Board;
use crate::entity::{Entity, Position};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;
use std::fmt;

/// Zobrist keys for the movable entities of one level.
///
/// Boxes sharing an owner are interchangeable, so keys are per entity value
/// rather than per box. Walls and floor never move and hash to zero.
pub struct Zobrist {
    width: usize,
    keys: FxHashMap<Entity, Vec<u64>>,
}

impl Zobrist {
    pub fn new(width: u16, height: u16, entities: impl IntoIterator<Item = Entity>) -> Self {
        // Use a seeded PRNG for reproducible Zobrist hashes
        let mut rng = ChaCha8Rng::seed_from_u64(0x123456789abcdef0);

        let mut entities: Vec<Entity> = entities.into_iter().filter(Entity::is_movable).collect();
        entities.sort();
        entities.dedup();

        let cells = width as usize * height as usize;
        let mut keys = FxHashMap::default();
        for entity in entities {
            let table: Vec<u64> = (0..cells).map(|_| rng.next_u64()).collect();
            keys.insert(entity, table);
        }

        Zobrist {
            width: width as usize,
            keys,
        }
    }

    /// Hash contribution of `entity` standing at `pos`.
    pub fn key(&self, entity: Entity, pos: Position) -> u64 {
        match self.keys.get(&entity) {
            Some(table) => table[pos.y as usize * self.width + pos.x as usize],
            None => 0,
        }
    }

    /// Hash of a whole board, XOR of every entity's key.
    pub fn compute_hash(&self, board: &Board) -> u64 {
        board
            .iter()
            .fold(0u64, |hash, (pos, entity)| hash ^ self.key(entity, pos))
    }
}

impl fmt::Debug for Zobrist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Zobrist")
            .field("width", &self.width)
            .field("entities", &self.keys.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::AgentId;

    #[test]
    fn test_keys_are_reproducible() {
        let entities = [Entity::Agent(AgentId(0)), Entity::Box(AgentId(0))];
        let a = Zobrist::new(4, 4, entities);
        let b = Zobrist::new(4, 4, entities.into_iter().rev());
        let pos = Position::new(2, 3);
        assert_eq!(a.key(Entity::Box(AgentId(0)), pos), b.key(Entity::Box(AgentId(0)), pos));
        assert_ne!(a.key(Entity::Box(AgentId(0)), pos), 0);
    }

    #[test]
    fn test_static_entities_hash_to_zero() {
        let z = Zobrist::new(4, 4, [Entity::Wall, Entity::Agent(AgentId(0))]);
        assert_eq!(z.key(Entity::Wall, Position::new(1, 1)), 0);
        assert_eq!(z.key(Entity::Floor, Position::new(1, 1)), 0);
        assert_eq!(z.key(Entity::Box(AgentId(9)), Position::new(1, 1)), 0);
    }

    #[test]
    fn test_interchangeable_boxes() {
        let owner = Entity::Box(AgentId(0));
        let z = Zobrist::new(4, 1, [owner]);
        let left: Board = [(Position::new(0, 0), owner), (Position::new(1, 0), owner)]
            .into_iter()
            .collect();
        let right: Board = [(Position::new(1, 0), owner), (Position::new(0, 0), owner)]
            .into_iter()
            .collect();
        assert_eq!(z.compute_hash(&left), z.compute_hash(&right));
    }
}
