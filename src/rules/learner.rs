//! Rule learner: walk → rule shape → dedup → confidence → store.

use std::collections::HashSet;

use rand::Rng;

use crate::error::LearnResult;
use crate::graph::{EdgeIndex, InverseRelations};
use crate::walk::Walk;

use super::confidence::ConfidenceEstimator;
use super::store::RuleStore;
use super::{build_rule, RuleKey};

/// What happened to the rule read off a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The shape was seen before; no estimate was made.
    Duplicate,
    /// New shape, but its confidence was zero.
    Discarded,
    /// New shape with positive confidence, now in the store.
    Accepted,
}

/// Turns walks into rules, keeping a ledger of every shape seen so far.
///
/// One learner belongs to one worker; its ledger and store are private.
#[derive(Debug)]
pub struct RuleLearner<'a> {
    inverse: &'a InverseRelations,
    estimator: ConfidenceEstimator<'a>,
    found: HashSet<RuleKey>,
    store: RuleStore,
    estimations: usize,
}

impl<'a> RuleLearner<'a> {
    pub fn new(index: &'a EdgeIndex, inverse: &'a InverseRelations, num_samples: usize) -> Self {
        Self {
            inverse,
            estimator: ConfidenceEstimator::new(index, num_samples),
            found: HashSet::new(),
            store: RuleStore::new(),
            estimations: 0,
        }
    }

    /// Build the rule for `walk`; on first sighting estimate its confidence
    /// and keep it if positive.
    pub fn create_rule(&mut self, walk: &Walk, rng: &mut impl Rng) -> LearnResult<RuleOutcome> {
        let rule = build_rule(walk, self.inverse)?;
        if !self.found.insert(rule.key()) {
            return Ok(RuleOutcome::Duplicate);
        }

        let estimate = self.estimator.estimate(&rule, rng)?;
        self.estimations += 1;
        if estimate.conf > 0.0 {
            self.store.insert(rule.with_estimate(estimate));
            Ok(RuleOutcome::Accepted)
        } else {
            tracing::debug!(
                head = rule.head_rel,
                body = ?rule.body_rels,
                order = ?rule.body_timestamp_order,
                body_supp = estimate.body_supp,
                "discarding rule without support"
            );
            Ok(RuleOutcome::Discarded)
        }
    }

    /// Number of distinct rule shapes seen.
    pub fn shapes_seen(&self) -> usize {
        self.found.len()
    }

    /// Number of confidence estimates made.
    pub fn estimations(&self) -> usize {
        self.estimations
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    pub fn into_store(self) -> RuleStore {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Quad;
    use rand::SeedableRng;

    fn inverses() -> InverseRelations {
        let mut inv = InverseRelations::new();
        for r in 0..3 {
            inv.insert_pair(r, r + 3);
        }
        inv
    }

    /// Triangle 0 -0-> 1 at t=30 closed through 1 -1-> 2 -2-> 0 in the past,
    /// with inverse facts so that the rule body can be resampled.
    fn triangle() -> (Vec<Quad>, Walk) {
        let base = [Quad::new(0, 0, 1, 30), Quad::new(1, 1, 2, 20), Quad::new(2, 2, 0, 10)];
        let mut facts = Vec::new();
        for q in base {
            facts.push(q);
            facts.push(q.reversed(q.relation + 3));
        }
        let walk = Walk {
            entities: vec![0, 1, 2, 0],
            relations: vec![0, 1, 2],
            timestamps: vec![30, 20, 10],
        };
        (facts, walk)
    }

    #[test]
    fn identical_shapes_are_estimated_once() {
        let (facts, walk) = triangle();
        let index = EdgeIndex::build(&facts);
        let inv = inverses();
        let mut learner = RuleLearner::new(&index, &inv, 50);
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);

        assert_eq!(learner.create_rule(&walk, &mut rng).unwrap(), RuleOutcome::Accepted);
        assert_eq!(learner.create_rule(&walk, &mut rng).unwrap(), RuleOutcome::Duplicate);
        assert_eq!(learner.estimations(), 1);
        assert_eq!(learner.shapes_seen(), 1);

        let rules = learner.store().get(0);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].body_rels, vec![5, 4]);
        assert_eq!(rules[0].conf, 1.0);
    }

    #[test]
    fn zero_confidence_rules_are_not_stored() {
        let (mut facts, walk) = triangle();
        // Drop the head fact: the body still samples, but nothing completes it.
        facts.retain(|q| q.relation != 0 && q.relation != 3);
        let index = EdgeIndex::build(&facts);
        let inv = inverses();
        let mut learner = RuleLearner::new(&index, &inv, 50);
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);

        assert_eq!(learner.create_rule(&walk, &mut rng).unwrap(), RuleOutcome::Discarded);
        assert_eq!(learner.create_rule(&walk, &mut rng).unwrap(), RuleOutcome::Duplicate);
        assert_eq!(learner.estimations(), 1);
        assert!(learner.store().is_empty());
    }
}
