//! Monte-Carlo confidence estimation.
//!
//! Bodies are resampled from the edge index following the rule's body
//! relations. Each extension step filters candidates by the comparison that
//! the rule's [`TemporalPattern`] prescribes for that step. Distinct
//! successful bodies form the body support; those completed by a later head
//! fact form the rule support.

use rand::Rng;

use crate::error::{LearnError, LearnResult};
use crate::graph::index::facts_within;
use crate::graph::{EdgeIndex, EntityId, RelationId, Timestamp};

use super::{var_constraints, Rule};

/// Longest rule body with a defined temporal pattern.
pub const MAX_BODY_LEN: usize = 3;

/// Default number of body samples per estimate.
pub const DEFAULT_NUM_SAMPLES: usize = 500;

/// Body timestamp orders for which an exact sampling procedure exists.
///
/// Variant names spell the rank sequence; `P021` is the order `[0, 2, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalPattern {
    P0,
    P01,
    P10,
    P012,
    P021,
    P102,
    P120,
    P201,
    P210,
}

/// Inclusive timestamp window for the next body edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeBound {
    pub min: Option<Timestamp>,
    pub max: Option<Timestamp>,
}

impl TimeBound {
    fn at_least(ts: Timestamp) -> Self {
        Self {
            min: Some(ts),
            max: None,
        }
    }

    fn at_most(ts: Timestamp) -> Self {
        Self {
            min: None,
            max: Some(ts),
        }
    }

    fn between(min: Timestamp, max: Timestamp) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

impl TemporalPattern {
    pub const ALL: [TemporalPattern; 9] = [
        Self::P0,
        Self::P01,
        Self::P10,
        Self::P012,
        Self::P021,
        Self::P102,
        Self::P120,
        Self::P201,
        Self::P210,
    ];

    /// The pattern for a body timestamp order, if one is defined.
    pub fn from_order(order: &[usize]) -> Option<Self> {
        Some(match order {
            [0] => Self::P0,
            [0, 1] => Self::P01,
            [1, 0] => Self::P10,
            [0, 1, 2] => Self::P012,
            [0, 2, 1] => Self::P021,
            [1, 0, 2] => Self::P102,
            [1, 2, 0] => Self::P120,
            [2, 0, 1] => Self::P201,
            [2, 1, 0] => Self::P210,
            _ => return None,
        })
    }

    /// Rank sequence as a compact string, e.g. `"021"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::P0 => "0",
            Self::P01 => "01",
            Self::P10 => "10",
            Self::P012 => "012",
            Self::P021 => "021",
            Self::P102 => "102",
            Self::P120 => "120",
            Self::P201 => "201",
            Self::P210 => "210",
        }
    }

    /// Window for body edge `step` (1-based past the first edge), given the
    /// timestamps `sampled` so far.
    pub fn bound(self, step: usize, sampled: &[Timestamp]) -> TimeBound {
        let first = sampled[0];
        let prev = sampled[step - 1];
        match (self, step) {
            (Self::P01, _) => TimeBound::at_least(first),
            (Self::P10, _) => TimeBound::at_most(first),
            (Self::P012, _) => TimeBound::at_least(prev),
            (Self::P210, _) => TimeBound::at_most(prev),
            (Self::P021, 1) | (Self::P120, 1) => TimeBound::at_least(first),
            (Self::P021, _) => TimeBound::between(first, sampled[1]),
            (Self::P102, 1) | (Self::P201, 1) => TimeBound::at_most(first),
            (Self::P102, _) => TimeBound::at_least(first),
            (Self::P120, _) => TimeBound::at_most(first),
            (Self::P201, _) => TimeBound::between(sampled[1], first),
            (Self::P0, _) => TimeBound::default(),
        }
    }
}

impl std::fmt::Display for TemporalPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence statistics of one rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceEstimate {
    /// `rule_supp / body_supp`, rounded to six decimals; 0 without body support.
    pub conf: f64,
    pub rule_supp: usize,
    pub body_supp: usize,
}

/// One sampled rule body: `entities[i] -[body_rels[i] @ timestamps[i]]-> entities[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BodySample {
    pub entities: Vec<EntityId>,
    pub timestamps: Vec<Timestamp>,
}

/// Estimates rule confidence by sampling bodies from an [`EdgeIndex`].
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceEstimator<'a> {
    index: &'a EdgeIndex,
    num_samples: usize,
}

impl<'a> ConfidenceEstimator<'a> {
    pub fn new(index: &'a EdgeIndex, num_samples: usize) -> Self {
        Self { index, num_samples }
    }

    /// Draw `num_samples` bodies and compute the rule's confidence.
    pub fn estimate(&self, rule: &Rule, rng: &mut impl Rng) -> LearnResult<ConfidenceEstimate> {
        let pattern = TemporalPattern::from_order(&rule.body_timestamp_order).ok_or_else(|| {
            LearnError::UnsupportedPattern {
                order: rule.body_timestamp_order.clone(),
            }
        })?;

        let mut bodies: Vec<BodySample> = (0..self.num_samples)
            .filter_map(|_| self.sample_body(rule, pattern, rng))
            .collect();
        bodies.sort();
        bodies.dedup();

        let body_supp = bodies.len();
        if body_supp == 0 {
            return Ok(ConfidenceEstimate {
                conf: 0.0,
                rule_supp: 0,
                body_supp: 0,
            });
        }
        let rule_supp = self.rule_support(&bodies, rule.head_rel);
        let conf = (rule_supp as f64 / body_supp as f64 * 1e6).round() / 1e6;

        Ok(ConfidenceEstimate {
            conf,
            rule_supp,
            body_supp,
        })
    }

    /// Sample one body matching the rule's relations, pattern and constraints.
    ///
    /// Returns `None` on a dead end or when the body's own entity grouping
    /// differs from a constrained rule's `var_constraints`.
    pub fn sample_body(
        &self,
        rule: &Rule,
        pattern: TemporalPattern,
        rng: &mut impl Rng,
    ) -> Option<BodySample> {
        let (&first_rel, rest) = rule.body_rels.split_first()?;
        let first_edges = self.index.edges(first_rel);
        if first_edges.is_empty() {
            return None;
        }
        let first = first_edges[rng.gen_range(0..first_edges.len())];

        let mut body = BodySample {
            entities: vec![first.subject, first.object],
            timestamps: vec![first.timestamp],
        };
        let mut cur_node = first.object;

        for (i, rel) in rest.iter().enumerate() {
            let bound = pattern.bound(i + 1, &body.timestamps);
            let candidates = facts_within(self.index.edges_from(*rel, cur_node), bound.min, bound.max);
            if candidates.is_empty() {
                return None;
            }
            let next = candidates[rng.gen_range(0..candidates.len())];
            body.entities.push(next.object);
            body.timestamps.push(next.timestamp);
            cur_node = next.object;
        }

        if !rule.var_constraints.is_empty() && var_constraints(&body.entities) != rule.var_constraints {
            return None;
        }
        Some(body)
    }

    /// Number of bodies completed by a head fact from the body's first to its
    /// last entity, strictly after the body's final timestamp.
    pub fn rule_support(&self, bodies: &[BodySample], head_rel: RelationId) -> usize {
        bodies
            .iter()
            .filter(|body| {
                let (Some(subject), Some(object), Some(last_ts)) = (
                    body.entities.first(),
                    body.entities.last(),
                    body.timestamps.last(),
                ) else {
                    return false;
                };
                let heads = self.index.edges_from(head_rel, *subject);
                let start = heads.partition_point(|f| f.timestamp <= *last_ts);
                heads[start..].iter().any(|f| f.object == *object)
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Quad;
    use rand::SeedableRng;

    fn seeded_rng() -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(11)
    }

    fn rule(head: RelationId, body: Vec<RelationId>, constraints: Vec<Vec<usize>>, order: Vec<usize>) -> Rule {
        Rule {
            head_rel: head,
            body_rels: body,
            var_constraints: constraints,
            body_timestamp_order: order,
            conf: 0.0,
            rule_supp: 0,
            body_supp: 0,
        }
    }

    /// For ten entity chains a -r1-> b -r2-> c, always in increasing time,
    /// followed by a later head fact a -h-> c.
    fn ordered_chains() -> Vec<Quad> {
        let mut facts = Vec::new();
        for i in 0..10u32 {
            let (a, b, c) = (3 * i, 3 * i + 1, 3 * i + 2);
            let t = 10 * i as Timestamp;
            facts.push(Quad::new(a, 1, b, t + 1));
            facts.push(Quad::new(b, 2, c, t + 2));
            facts.push(Quad::new(a, 0, c, t + 3));
        }
        facts
    }

    #[test]
    fn ordered_chains_reach_full_confidence() {
        let index = EdgeIndex::build(&ordered_chains());
        let estimator = ConfidenceEstimator::new(&index, DEFAULT_NUM_SAMPLES);
        let est = estimator
            .estimate(&rule(0, vec![1, 2], vec![], vec![0, 1]), &mut seeded_rng())
            .unwrap();
        assert_eq!(est.conf, 1.0);
        assert_eq!(est.body_supp, 10);
        assert_eq!(est.rule_supp, 10);
    }

    #[test]
    fn reversed_order_finds_no_bodies() {
        let index = EdgeIndex::build(&ordered_chains());
        let estimator = ConfidenceEstimator::new(&index, 200);
        let est = estimator
            .estimate(&rule(0, vec![1, 2], vec![], vec![1, 0]), &mut seeded_rng())
            .unwrap();
        assert_eq!(est.body_supp, 0);
        assert_eq!(est.conf, 0.0);
    }

    #[test]
    fn half_of_the_bodies_complete() {
        let facts = vec![
            Quad::new(0, 1, 1, 1),
            Quad::new(2, 1, 3, 1),
            Quad::new(1, 2, 4, 2),
            Quad::new(3, 2, 5, 2),
            Quad::new(0, 0, 4, 3),
            // Same time as the body end: does not complete it.
            Quad::new(2, 0, 5, 2),
        ];
        let index = EdgeIndex::build(&facts);
        let estimator = ConfidenceEstimator::new(&index, DEFAULT_NUM_SAMPLES);
        let est = estimator
            .estimate(&rule(0, vec![1, 2], vec![], vec![0, 1]), &mut seeded_rng())
            .unwrap();
        assert_eq!(est.body_supp, 2);
        assert_eq!(est.rule_supp, 1);
        assert_eq!(est.conf, 0.5);
    }

    #[test]
    fn confidence_is_rounded_to_six_digits() {
        let mut facts = vec![Quad::new(0, 0, 1, 9)];
        for i in 0..3 {
            facts.push(Quad::new(0, 1, 1, i));
        }
        let index = EdgeIndex::build(&facts);
        let estimator = ConfidenceEstimator::new(&index, DEFAULT_NUM_SAMPLES);
        // Three distinct single-edge bodies, all before the head at t=9.
        let est = estimator
            .estimate(&rule(0, vec![1], vec![], vec![0]), &mut seeded_rng())
            .unwrap();
        assert_eq!((est.rule_supp, est.body_supp), (3, 3));

        let index = EdgeIndex::build(&[
            Quad::new(0, 0, 1, 1),
            Quad::new(0, 1, 1, 0),
            Quad::new(0, 1, 1, 1),
            Quad::new(0, 1, 1, 2),
        ]);
        let estimator = ConfidenceEstimator::new(&index, DEFAULT_NUM_SAMPLES);
        let est = estimator
            .estimate(&rule(0, vec![1], vec![], vec![0]), &mut seeded_rng())
            .unwrap();
        assert_eq!((est.rule_supp, est.body_supp), (1, 3));
        assert_eq!(est.conf, 0.333333);
    }

    #[test]
    fn head_at_body_time_never_supports_even_at_the_time_limit() {
        let index = EdgeIndex::build(&[
            Quad::new(0, 1, 1, i64::MAX),
            Quad::new(0, 0, 1, i64::MAX),
            Quad::new(2, 1, 3, i64::MAX - 1),
            Quad::new(2, 0, 3, i64::MAX),
        ]);
        let estimator = ConfidenceEstimator::new(&index, DEFAULT_NUM_SAMPLES);
        let est = estimator
            .estimate(&rule(0, vec![1], vec![], vec![0]), &mut seeded_rng())
            .unwrap();
        assert_eq!((est.rule_supp, est.body_supp), (1, 2));
        assert_eq!(est.conf, 0.5);
    }

    #[test]
    fn constrained_rules_only_keep_matching_bodies() {
        // x -1-> y -2-> x closes a loop; x -1-> y -2-> z does not.
        let facts = vec![
            Quad::new(0, 1, 1, 1),
            Quad::new(1, 2, 0, 2),
            Quad::new(1, 2, 2, 2),
            Quad::new(0, 0, 0, 5),
        ];
        let index = EdgeIndex::build(&facts);
        let estimator = ConfidenceEstimator::new(&index, DEFAULT_NUM_SAMPLES);
        let mut rng = seeded_rng();

        let looped = rule(0, vec![1, 2], vec![vec![0, 2]], vec![0, 1]);
        for _ in 0..50 {
            if let Some(body) = estimator.sample_body(&looped, TemporalPattern::P01, &mut rng) {
                assert_eq!(body.entities, vec![0, 1, 0]);
            }
        }
        let est = estimator.estimate(&looped, &mut rng).unwrap();
        assert_eq!((est.rule_supp, est.body_supp), (1, 1));
    }

    #[test]
    fn longer_bodies_are_rejected() {
        let index = EdgeIndex::build(&ordered_chains());
        let estimator = ConfidenceEstimator::new(&index, 10);
        let err = estimator
            .estimate(&rule(0, vec![1, 2, 1, 2], vec![], vec![0, 1, 2, 3]), &mut seeded_rng())
            .unwrap_err();
        assert!(matches!(err, LearnError::UnsupportedPattern { .. }));
    }

    #[test]
    fn pattern_bounds() {
        let ts = [10, 20];
        assert_eq!(TemporalPattern::P01.bound(1, &ts[..1]), TimeBound::at_least(10));
        assert_eq!(TemporalPattern::P10.bound(1, &ts[..1]), TimeBound::at_most(10));
        assert_eq!(TemporalPattern::P012.bound(2, &ts), TimeBound::at_least(20));
        assert_eq!(TemporalPattern::P210.bound(2, &ts), TimeBound::at_most(20));
        assert_eq!(TemporalPattern::P021.bound(1, &ts[..1]), TimeBound::at_least(10));
        assert_eq!(TemporalPattern::P021.bound(2, &ts), TimeBound::between(10, 20));
        assert_eq!(TemporalPattern::P102.bound(1, &ts[..1]), TimeBound::at_most(10));
        assert_eq!(TemporalPattern::P102.bound(2, &ts), TimeBound::at_least(10));
        assert_eq!(TemporalPattern::P120.bound(1, &ts[..1]), TimeBound::at_least(10));
        assert_eq!(TemporalPattern::P120.bound(2, &ts), TimeBound::at_most(10));
        assert_eq!(TemporalPattern::P201.bound(1, &ts[..1]), TimeBound::at_most(10));
        assert_eq!(TemporalPattern::P201.bound(2, &ts), TimeBound::between(20, 10));
    }

    #[test]
    fn every_order_up_to_three_has_a_pattern() {
        for p in TemporalPattern::ALL {
            let order: Vec<usize> = p.as_str().bytes().map(|b| (b - b'0') as usize).collect();
            assert_eq!(TemporalPattern::from_order(&order), Some(p));
        }
        assert_eq!(TemporalPattern::from_order(&[0, 0]), None);
        assert_eq!(TemporalPattern::from_order(&[]), None);
    }
}
