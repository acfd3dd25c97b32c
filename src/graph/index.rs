//! Immutable edge index over the learning facts.
//!
//! Facts are partitioned by subject (neighbor index), by relation (relation
//! index) and by `(relation, subject)`. Every bucket is sorted by timestamp
//! ascending, so time-window filters reduce to binary searches.

use std::collections::HashMap;

use super::{EntityId, Quad, RelationId, Timestamp};

/// Per-entity and per-relation partitions of a fixed fact set.
///
/// Built once with [`EdgeIndex::build`] and never mutated afterwards, so a
/// single index can be shared by reference across worker threads.
#[derive(Clone, Default)]
pub struct EdgeIndex {
    /// Subject → outgoing facts.
    neighbors: HashMap<EntityId, Vec<Quad>>,
    /// Relation → facts with that relation.
    edges: HashMap<RelationId, Vec<Quad>>,
    /// (relation, subject) → facts, for body extension and head lookups.
    by_relation_subject: HashMap<(RelationId, EntityId), Vec<Quad>>,
    fact_count: usize,
}

impl EdgeIndex {
    /// Partition `facts` into the index buckets in one pass.
    pub fn build(facts: &[Quad]) -> Self {
        let mut neighbors: HashMap<EntityId, Vec<Quad>> = HashMap::new();
        let mut edges: HashMap<RelationId, Vec<Quad>> = HashMap::new();
        let mut by_relation_subject: HashMap<(RelationId, EntityId), Vec<Quad>> = HashMap::new();

        for fact in facts {
            neighbors.entry(fact.subject).or_default().push(*fact);
            edges.entry(fact.relation).or_default().push(*fact);
            by_relation_subject
                .entry((fact.relation, fact.subject))
                .or_default()
                .push(*fact);
        }

        // Stable sort: facts sharing a timestamp keep their input order.
        for bucket in neighbors
            .values_mut()
            .chain(edges.values_mut())
            .chain(by_relation_subject.values_mut())
        {
            bucket.sort_by_key(|f| f.timestamp);
        }

        Self {
            neighbors,
            edges,
            by_relation_subject,
            fact_count: facts.len(),
        }
    }

    /// Outgoing facts of `entity`, oldest first. Empty if the entity is never a subject.
    pub fn neighbors(&self, entity: EntityId) -> &[Quad] {
        self.neighbors.get(&entity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Facts with `relation`, oldest first. Empty for unknown relations.
    pub fn edges(&self, relation: RelationId) -> &[Quad] {
        self.edges.get(&relation).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Facts with `relation` whose subject is `subject`, oldest first.
    pub fn edges_from(&self, relation: RelationId, subject: EntityId) -> &[Quad] {
        self.by_relation_subject
            .get(&(relation, subject))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All relations with at least one fact, in ascending id order.
    pub fn relations(&self) -> Vec<RelationId> {
        let mut rels: Vec<RelationId> = self.edges.keys().copied().collect();
        rels.sort_unstable();
        rels
    }

    pub fn contains_relation(&self, relation: RelationId) -> bool {
        self.edges.contains_key(&relation)
    }

    /// Number of distinct subject entities.
    pub fn subject_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Number of indexed facts.
    pub fn fact_count(&self) -> usize {
        self.fact_count
    }
}

impl std::fmt::Debug for EdgeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeIndex")
            .field("facts", &self.fact_count)
            .field("subjects", &self.subject_count())
            .field("relations", &self.edges.len())
            .finish()
    }
}

/// The prefix of a timestamp-sorted bucket with `timestamp < bound`.
pub fn facts_before(facts: &[Quad], bound: Timestamp) -> &[Quad] {
    let end = facts.partition_point(|f| f.timestamp < bound);
    &facts[..end]
}

/// The sub-slice of a timestamp-sorted bucket with `min <= timestamp <= max`.
///
/// `None` leaves that side unbounded. An inverted window yields an empty slice.
pub fn facts_within(facts: &[Quad], min: Option<Timestamp>, max: Option<Timestamp>) -> &[Quad] {
    let start = min.map_or(0, |lo| facts.partition_point(|f| f.timestamp < lo));
    let end = max.map_or(facts.len(), |hi| facts.partition_point(|f| f.timestamp <= hi));
    if start >= end {
        &[]
    } else {
        &facts[start..end]
    }
}
