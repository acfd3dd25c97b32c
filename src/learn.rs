//! Rule learning driver.
//!
//! Relations are split into contiguous shards, one per worker. Each worker
//! owns its RNG, its bucket scheduler and its rule learner, and runs every
//! (relation, length, walk) combination of its shard to completion. Head
//! relations never cross shards, so merging worker stores is a plain union.

use std::ops::Range;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::bandit::BucketScheduler;
use crate::config::LearnConfig;
use crate::error::{ChronoResult, LearnError, LearnResult};
use crate::graph::{EdgeIndex, InverseRelations, RelationId};
use crate::rules::{RuleLearner, RuleStore};
use crate::walk::TemporalWalker;

/// Outcome of a learning run.
#[derive(Debug, Clone)]
pub struct LearnReport {
    /// Merged rules, each head group sorted by descending confidence.
    pub store: RuleStore,
    pub stats: WorkerStats,
    pub elapsed: Duration,
}

/// Counters accumulated by workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub walk_attempts: usize,
    pub walk_successes: usize,
    /// Confidence estimates made (one per distinct rule shape).
    pub estimations: usize,
}

impl WorkerStats {
    fn absorb(&mut self, other: WorkerStats) {
        self.walk_attempts += other.walk_attempts;
        self.walk_successes += other.walk_successes;
        self.estimations += other.estimations;
    }
}

/// Split `n` relations into at most `workers` contiguous shards.
///
/// Each shard holds `n / workers` relations; the last one also takes the
/// remainder. The worker count is clamped to `n`.
pub fn partition_relations(n: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.min(n);
    if workers == 0 {
        return Vec::new();
    }
    let per = n / workers;
    (0..workers)
        .map(|i| {
            let end = if i + 1 == workers { n } else { (i + 1) * per };
            i * per..end
        })
        .collect()
}

/// Learn rules for the configured relations in parallel.
pub fn learn(
    index: &EdgeIndex,
    inverse: &InverseRelations,
    config: &LearnConfig,
) -> ChronoResult<LearnReport> {
    config.validate()?;
    let relations = config.target_relations(index)?;
    // Walk steps may traverse any relation, so every one needs an inverse.
    for rel in index.relations() {
        inverse.inverse_of(rel)?;
    }

    let shards = partition_relations(relations.len(), config.num_workers);
    tracing::info!(
        relations = relations.len(),
        workers = shards.len(),
        lengths = ?config.rule_lengths,
        num_walks = config.num_walks,
        transition_distr = %config.transition_distr,
        seed = ?config.seed,
        "learning rules"
    );

    let start = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(shards.len().max(1))
        .build()
        .map_err(|e| LearnError::WorkerPool {
            message: e.to_string(),
        })?;
    let outputs: Vec<LearnResult<(RuleStore, WorkerStats)>> = pool.install(|| {
        shards
            .into_par_iter()
            .enumerate()
            .map(|(worker, range)| learn_shard(worker, &relations[range], index, inverse, config))
            .collect()
    });

    let mut store = RuleStore::new();
    let mut stats = WorkerStats::default();
    for output in outputs {
        let (worker_store, worker_stats) = output?;
        store.merge(worker_store);
        stats.absorb(worker_stats);
    }
    store.sort_by_confidence();

    let elapsed = start.elapsed();
    let summary = store.statistics();
    tracing::info!(
        secs = elapsed.as_secs_f64(),
        rules = summary.total_rules,
        heads = summary.relations_with_rules,
        by_length = ?summary.by_length,
        patterns = ?summary.by_pattern,
        walks = stats.walk_attempts,
        closed = stats.walk_successes,
        "learning finished"
    );

    Ok(LearnReport {
        store,
        stats,
        elapsed,
    })
}

/// Learn rules for one shard of relations on the current thread.
pub fn learn_shard(
    worker: usize,
    relations: &[RelationId],
    index: &EdgeIndex,
    inverse: &InverseRelations,
    config: &LearnConfig,
) -> LearnResult<(RuleStore, WorkerStats)> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let walker = TemporalWalker::new(index, inverse, config.transition_distr);
    let mut learner = RuleLearner::new(index, inverse, config.num_samples);
    let mut scheduler = BucketScheduler::new();
    let mut stats = WorkerStats::default();

    for (k, &rel) in relations.iter().enumerate() {
        if index.edges(rel).is_empty() {
            return Err(LearnError::EmptyRelation { relation: rel });
        }
        for &length in &config.rule_lengths {
            let unit_start = Instant::now();
            let rules_before = learner.store().len();

            for _ in 0..config.num_walks {
                let bucket = scheduler.select(&mut rng);
                let walk = walker.sample_walk(length + 1, rel, bucket, &mut rng);
                scheduler.record(bucket, walk.is_some());
                stats.walk_attempts += 1;
                if let Some(walk) = walk {
                    stats.walk_successes += 1;
                    learner.create_rule(&walk, &mut rng)?;
                }
            }

            tracing::info!(
                worker,
                relation = k + 1,
                of = relations.len(),
                length,
                secs = unit_start.elapsed().as_secs_f64(),
                rules = learner.store().len() - rules_before,
                "relation done"
            );
        }
        scheduler.reset();
    }

    stats.estimations = learner.estimations();
    Ok((learner.into_store(), stats))
}
