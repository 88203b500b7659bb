use crate::entity::Position;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("more than one entity starts at {0}")]
    DuplicateOrigin(Position),
    #[error("more than one entity ends at {0}")]
    DuplicateDestination(Position),
}

/// Net relocations of entities since some boundary, keyed by where each entity
/// started. Each origin appears at most once, and so does each destination, so
/// the mapping can be reversed without loss.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(Position, Position)>", into = "Vec<(Position, Position)>")]
pub struct Transition {
    // origin -> current position
    moves: FxHashMap<Position, Position>,
    // current position -> origin
    origins: FxHashMap<Position, Position>,
}

impl Transition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the entity at `from` moved to `to`.
    ///
    /// If an entity previously recorded as arriving at `from` is the one moving,
    /// its entry is rewritten to end at `to`, so repeated moves of one entity
    /// collapse into a single origin->destination pair. An entity that returns
    /// to its origin drops out of the transition entirely.
    pub fn record(&mut self, from: Position, to: Position) {
        let origin = self.origins.remove(&from).unwrap_or(from);
        if origin == to {
            self.moves.remove(&origin);
        } else {
            self.moves.insert(origin, to);
            self.origins.insert(to, origin);
        }
    }

    /// The inverse transition: every entity travels back to its origin.
    pub fn reverse(&self) -> Transition {
        Transition {
            moves: self.origins.clone(),
            origins: self.moves.clone(),
        }
    }

    /// Compose `self` followed by `newer` into one net transition.
    ///
    /// Each pair in `newer` is looked up against `self` as it was before the
    /// merge: a `newer` move starting where `self` left some entity continues
    /// that entity's entry, everything else is a fresh entry.
    pub fn merge_older_with(&self, newer: &Transition) -> Transition {
        let mut merged = self.clone();
        let mut continued = Vec::with_capacity(newer.moves.len());

        for (&src, &dst) in &newer.moves {
            let origin = match self.origins.get(&src) {
                Some(&origin) => {
                    merged.moves.remove(&origin);
                    merged.origins.remove(&src);
                    origin
                }
                None => src,
            };
            continued.push((origin, dst));
        }

        for (origin, dst) in continued {
            if origin != dst {
                merged.moves.insert(origin, dst);
                merged.origins.insert(dst, origin);
            }
        }
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Where the entity that started at `origin` is now, if it moved.
    pub fn destination(&self, origin: Position) -> Option<Position> {
        self.moves.get(&origin).copied()
    }

    /// Where the entity now at `destination` started, if it moved there.
    pub fn origin_of(&self, destination: Position) -> Option<Position> {
        self.origins.get(&destination).copied()
    }

    /// Iterate `(origin, destination)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, Position)> + '_ {
        self.moves.iter().map(|(&from, &to)| (from, to))
    }

    /// Every position this transition reads or writes.
    pub fn touched(&self) -> impl Iterator<Item = Position> + '_ {
        self.moves
            .keys()
            .chain(self.origins.keys().filter(|p| !self.moves.contains_key(*p)))
            .copied()
    }
}

/// Build a transition from explicit `(origin, destination)` pairs. Pairs that
/// stay in place are dropped.
impl TryFrom<Vec<(Position, Position)>> for Transition {
    type Error = TransitionError;

    fn try_from(pairs: Vec<(Position, Position)>) -> Result<Self, Self::Error> {
        let mut transition = Transition::new();
        for (from, to) in pairs {
            if from == to {
                continue;
            }
            if transition.moves.insert(from, to).is_some() {
                return Err(TransitionError::DuplicateOrigin(from));
            }
            if transition.origins.insert(to, from).is_some() {
                return Err(TransitionError::DuplicateDestination(to));
            }
        }
        Ok(transition)
    }
}

impl From<Transition> for Vec<(Position, Position)> {
    fn from(transition: Transition) -> Self {
        let mut pairs: Vec<_> = transition.moves.into_iter().collect();
        pairs.sort();
        pairs
    }
}
