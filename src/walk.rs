//! Cyclic temporal random walks.
//!
//! A walk of length `L` starts from a uniformly drawn fact of the target
//! relation and takes `L - 1` further steps through the neighbor index. Every
//! step may only use facts strictly older than the start fact, must not undo
//! the previous step through its exact inverse, and the final step has to
//! return to the start entity. Any dead end abandons the attempt.

use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bandit::{roulette, RecencyBucket};
use crate::config::ConfigError;
use crate::graph::index::facts_before;
use crate::graph::{EdgeIndex, EntityId, InverseRelations, Quad, RelationId, Timestamp};

/// Candidate pools up to this size skip recency stratification.
pub const STRATIFY_MIN_POOL: usize = 4;

/// Distribution used to pick the next edge among the filtered candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransitionDistr {
    /// Every candidate equally likely.
    #[default]
    #[serde(rename = "unif")]
    Uniform,
    /// Weight `exp(timestamp - current timestamp)`, favouring recent facts.
    #[serde(rename = "exp")]
    Exponential,
}

impl FromStr for TransitionDistr {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unif" => Ok(Self::Uniform),
            "exp" => Ok(Self::Exponential),
            other => Err(ConfigError::UnknownTransitionDistr {
                name: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for TransitionDistr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uniform => write!(f, "unif"),
            Self::Exponential => write!(f, "exp"),
        }
    }
}

/// A successful cyclic walk.
///
/// `relations[i]` and `timestamps[i]` belong to the edge from `entities[i]`
/// to `entities[i + 1]`; `entities.first() == entities.last()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    pub entities: Vec<EntityId>,
    pub relations: Vec<RelationId>,
    pub timestamps: Vec<Timestamp>,
}

impl Walk {
    fn start(edge: &Quad) -> Self {
        Self {
            entities: vec![edge.subject, edge.object],
            relations: vec![edge.relation],
            timestamps: vec![edge.timestamp],
        }
    }

    fn push(&mut self, edge: &Quad) {
        self.entities.push(edge.object);
        self.relations.push(edge.relation);
        self.timestamps.push(edge.timestamp);
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn is_cyclic(&self) -> bool {
        self.entities.first() == self.entities.last()
    }
}

/// Samples cyclic temporal walks against a shared [`EdgeIndex`].
#[derive(Debug, Clone, Copy)]
pub struct TemporalWalker<'a> {
    index: &'a EdgeIndex,
    inverse: &'a InverseRelations,
    distr: TransitionDistr,
}

impl<'a> TemporalWalker<'a> {
    pub fn new(index: &'a EdgeIndex, inverse: &'a InverseRelations, distr: TransitionDistr) -> Self {
        Self {
            index,
            inverse,
            distr,
        }
    }

    /// Try to sample a cyclic walk of `length` edges starting with `relation`.
    ///
    /// Returns `None` if any step runs out of candidates.
    pub fn sample_walk(
        &self,
        length: usize,
        relation: RelationId,
        bucket: RecencyBucket,
        rng: &mut impl Rng,
    ) -> Option<Walk> {
        let start_edges = self.index.edges(relation);
        if start_edges.is_empty() {
            return None;
        }
        let start = start_edges[rng.gen_range(0..start_edges.len())];
        let start_node = start.subject;
        let start_ts = start.timestamp;

        let mut walk = Walk::start(&start);
        let mut prev = start;
        for step in 1..length {
            let closing = step == length - 1;
            let candidates = self.candidates(&prev, start_node, start_ts, step > 1, closing);
            let next = self.sample_next_edge(&candidates, prev.timestamp, bucket, rng)?;
            walk.push(&next);
            prev = next;
        }
        Some(walk)
    }

    /// Facts reachable from the head of `prev` under the walk constraints.
    fn candidates(
        &self,
        prev: &Quad,
        start_node: EntityId,
        start_ts: Timestamp,
        exclude_inverse: bool,
        closing: bool,
    ) -> Vec<Quad> {
        let backtrack = exclude_inverse
            .then(|| self.inverse.get(prev.relation).map(|inv| prev.reversed(inv)))
            .flatten();

        facts_before(self.index.neighbors(prev.object), start_ts)
            .iter()
            .filter(|f| Some(**f) != backtrack)
            .filter(|f| !closing || f.object == start_node)
            .copied()
            .collect()
    }

    /// Pick the next edge from an oldest-first candidate pool.
    ///
    /// Pools larger than [`STRATIFY_MIN_POOL`] are first narrowed to the
    /// stratum selected by `bucket`; the transition distribution is then
    /// applied to what remains.
    pub fn sample_next_edge(
        &self,
        candidates: &[Quad],
        cur_ts: Timestamp,
        bucket: RecencyBucket,
        rng: &mut impl Rng,
    ) -> Option<Quad> {
        let pool = if candidates.len() <= STRATIFY_MIN_POOL {
            candidates
        } else {
            &candidates[bucket.stratum(candidates.len())]
        };
        if pool.is_empty() {
            return None;
        }

        let chosen = match self.distr {
            TransitionDistr::Uniform => rng.gen_range(0..pool.len()),
            TransitionDistr::Exponential => {
                let weights: Vec<f64> = pool
                    .iter()
                    .map(|f| (f.timestamp as f64 - cur_ts as f64).exp())
                    .collect();
                // All timestamps too far away to normalize: fall back to uniform.
                roulette(&weights, rng).unwrap_or_else(|| rng.gen_range(0..pool.len()))
            }
        };
        Some(pool[chosen])
    }
}
