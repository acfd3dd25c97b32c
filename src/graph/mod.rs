//! Temporal knowledge graph: timestamped facts and their indexes.
//!
//! The graph is a fixed list of [`Quad`]s `(subject, relation, object, timestamp)`.
//!
//! - **Edge index** ([`EdgeIndex`]): per-entity and per-relation partitions, built once
//! - **Loader** ([`Dataset`]): reads a dataset directory and builds vocabularies
//!
//! Relations come in inverse pairs; [`InverseRelations`] maps each relation id
//! to the id of its inverse.

pub mod index;
pub mod loader;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

pub use index::EdgeIndex;
pub use loader::{Dataset, Vocabulary};

/// Dense entity id.
pub type EntityId = u32;
/// Dense relation id.
pub type RelationId = u32;
/// Discrete timestamp.
pub type Timestamp = i64;

/// A timestamped fact `(subject, relation, object, timestamp)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quad {
    pub subject: EntityId,
    pub relation: RelationId,
    pub object: EntityId,
    pub timestamp: Timestamp,
}

impl Quad {
    pub fn new(
        subject: EntityId,
        relation: RelationId,
        object: EntityId,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            subject,
            relation,
            object,
            timestamp,
        }
    }

    /// The same fact read in the opposite direction, using `inverse` as its relation.
    pub fn reversed(&self, inverse: RelationId) -> Self {
        Self {
            subject: self.object,
            relation: inverse,
            object: self.subject,
            timestamp: self.timestamp,
        }
    }
}

impl From<[i64; 4]> for Quad {
    fn from(raw: [i64; 4]) -> Self {
        Self {
            subject: raw[0] as EntityId,
            relation: raw[1] as RelationId,
            object: raw[2] as EntityId,
            timestamp: raw[3],
        }
    }
}

/// Mapping from a relation to its inverse relation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InverseRelations {
    map: HashMap<RelationId, RelationId>,
}

impl InverseRelations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `a` and `b` as inverses of each other.
    pub fn insert_pair(&mut self, a: RelationId, b: RelationId) {
        self.map.insert(a, b);
        self.map.insert(b, a);
    }

    /// Inverse of `relation`, if one is registered.
    pub fn get(&self, relation: RelationId) -> Option<RelationId> {
        self.map.get(&relation).copied()
    }

    /// Inverse of `relation`, failing when the mapping does not cover it.
    pub fn inverse_of(&self, relation: RelationId) -> GraphResult<RelationId> {
        self.get(relation)
            .ok_or(GraphError::MissingInverse { relation })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_swaps_endpoints_and_keeps_time() {
        let q = Quad::new(1, 0, 2, 42);
        assert_eq!(q.reversed(3), Quad::new(2, 3, 1, 42));
    }

    #[test]
    fn inverse_pairs_are_mirrored() {
        let mut inv = InverseRelations::new();
        inv.insert_pair(0, 3);
        assert_eq!(inv.get(0), Some(3));
        assert_eq!(inv.get(3), Some(0));
        assert!(inv.inverse_of(7).is_err());
    }

    #[test]
    fn quad_from_raw_row() {
        let q = Quad::from([5, 1, 6, 100]);
        assert_eq!(q.subject, 5);
        assert_eq!(q.relation, 1);
        assert_eq!(q.object, 6);
        assert_eq!(q.timestamp, 100);
    }
}
