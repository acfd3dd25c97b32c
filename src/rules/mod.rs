//! Temporal logical rules mined from cyclic walks.
//!
//! A rule reads `head(X0, Xn, Tn) <- b1(X0, X1, T?), ..., bn(Xn-1, Xn, T?)`:
//! the body relations chain from the head's subject to its object, and the
//! body timestamps follow the rank pattern in `body_timestamp_order`.
//!
//! - [`build_rule`] turns a [`Walk`] into a canonical rule shape
//! - [`confidence`] estimates confidence by resampling rule bodies
//! - [`learner`] deduplicates shapes and keeps rules with positive confidence
//! - [`store`] groups kept rules by head relation

pub mod confidence;
pub mod learner;
pub mod store;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::GraphResult;
use crate::graph::{EntityId, InverseRelations, RelationId, Timestamp};
use crate::walk::Walk;

pub use confidence::{ConfidenceEstimate, ConfidenceEstimator, TemporalPattern};
pub use learner::{RuleLearner, RuleOutcome};
pub use store::{RuleStatistics, RuleStore};

/// A learned rule with its confidence statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub head_rel: RelationId,
    pub body_rels: Vec<RelationId>,
    /// Groups of body positions (0 = head subject, `body_rels.len()` = head
    /// object) bound to the same entity. Only groups of two or more, sorted.
    pub var_constraints: Vec<Vec<usize>>,
    /// Rank of each body timestamp; ties are broken by body position.
    pub body_timestamp_order: Vec<usize>,
    #[serde(default)]
    pub conf: f64,
    #[serde(default)]
    pub rule_supp: usize,
    #[serde(default)]
    pub body_supp: usize,
}

impl Rule {
    /// Structural identity of the rule, ignoring its statistics.
    pub fn key(&self) -> RuleKey {
        RuleKey {
            head_rel: self.head_rel,
            body_rels: self.body_rels.clone(),
            var_constraints: self.var_constraints.clone(),
            body_timestamp_order: self.body_timestamp_order.clone(),
        }
    }

    pub fn body_len(&self) -> usize {
        self.body_rels.len()
    }

    pub fn with_estimate(mut self, estimate: ConfidenceEstimate) -> Self {
        self.conf = estimate.conf;
        self.rule_supp = estimate.rule_supp;
        self.body_supp = estimate.body_supp;
        self
    }
}

/// Hashable rule shape used by the found-rules ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleKey {
    pub head_rel: RelationId,
    pub body_rels: Vec<RelationId>,
    pub var_constraints: Vec<Vec<usize>>,
    pub body_timestamp_order: Vec<usize>,
}

/// Build the rule shape read off a successful walk.
///
/// The walk is traversed backwards from its closing entity: body relations
/// are the inverses of walk relations `1..` in reverse order, so the body
/// chains from the head subject to the head object.
pub fn build_rule(walk: &Walk, inverse: &InverseRelations) -> GraphResult<Rule> {
    let body_rels = walk.relations[1..]
        .iter()
        .rev()
        .map(|r| inverse.inverse_of(*r))
        .collect::<GraphResult<Vec<_>>>()?;
    let entities: Vec<EntityId> = walk.entities[1..].iter().rev().copied().collect();
    let body_timestamps: Vec<Timestamp> = walk.timestamps[1..].iter().rev().copied().collect();

    Ok(Rule {
        head_rel: walk.relations[0],
        body_rels,
        var_constraints: var_constraints(&entities),
        body_timestamp_order: timestamp_order(&body_timestamps),
        conf: 0.0,
        rule_supp: 0,
        body_supp: 0,
    })
}

/// Positions of recurring entities, as sorted groups of size two or more.
pub fn var_constraints(entities: &[EntityId]) -> Vec<Vec<usize>> {
    let mut positions: BTreeMap<EntityId, Vec<usize>> = BTreeMap::new();
    for (i, e) in entities.iter().enumerate() {
        positions.entry(*e).or_default().push(i);
    }
    let mut groups: Vec<Vec<usize>> = positions.into_values().filter(|g| g.len() > 1).collect();
    groups.sort();
    groups
}

/// Rank-encode timestamps: each value takes the index of its first occurrence
/// in sorted order, and repeats count upwards from there in body order.
pub fn timestamp_order(timestamps: &[Timestamp]) -> Vec<usize> {
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();

    let mut base: HashMap<Timestamp, usize> = HashMap::new();
    for (i, ts) in sorted.iter().enumerate() {
        base.entry(*ts).or_insert(i);
    }

    let mut seen: HashMap<Timestamp, usize> = HashMap::new();
    timestamps
        .iter()
        .map(|ts| {
            let repeats = seen.entry(*ts).or_insert(0);
            let rank = base[ts] + *repeats;
            *repeats += 1;
            rank
        })
        .collect()
}
