//! Recency-bucket scheduler: a UCB1 bandit over four recency strata.
//!
//! Before each walk attempt the scheduler scores every bucket with
//! `successes / trials + sqrt(ln(N) / trials)` and samples a bucket in
//! proportion to its score (not arg-max), so no stratum is ever starved.
//! Arms start at `(1, 1)` and are reset whenever a new relation is processed.

use std::ops::Range;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// One of four quantile strata of a timestamp-sorted candidate pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecencyBucket {
    /// Oldest quarter.
    Q1,
    Q2,
    Q3,
    /// Most recent quarter.
    Q4,
}

impl RecencyBucket {
    pub const ALL: [RecencyBucket; 4] = [Self::Q1, Self::Q2, Self::Q3, Self::Q4];

    /// Upper quantile of this bucket.
    pub fn threshold(self) -> f64 {
        match self {
            Self::Q1 => 0.25,
            Self::Q2 => 0.5,
            Self::Q3 => 0.75,
            Self::Q4 => 1.0,
        }
    }

    /// Lower quantile of this bucket (the previous bucket's threshold).
    pub fn lower(self) -> f64 {
        match self {
            Self::Q1 => 0.0,
            Self::Q2 => 0.25,
            Self::Q3 => 0.5,
            Self::Q4 => 0.75,
        }
    }

    /// Index range this bucket selects in a pool of `len` oldest-first candidates.
    ///
    /// Bounds truncate toward zero, so a stratum of a small pool may be empty.
    pub fn stratum(self, len: usize) -> Range<usize> {
        let lo = (len as f64 * self.lower()) as usize;
        let hi = (len as f64 * self.threshold()) as usize;
        lo..hi.max(lo)
    }

    fn index(self) -> usize {
        match self {
            Self::Q1 => 0,
            Self::Q2 => 1,
            Self::Q3 => 2,
            Self::Q4 => 3,
        }
    }
}

impl std::fmt::Display for RecencyBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.threshold())
    }
}

/// Success and trial counts of one arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmStats {
    pub successes: u64,
    pub trials: u64,
}

impl Default for ArmStats {
    fn default() -> Self {
        Self {
            successes: 1,
            trials: 1,
        }
    }
}

/// UCB1 scheduler with proportional arm selection.
#[derive(Debug, Clone, Default)]
pub struct BucketScheduler {
    arms: [ArmStats; 4],
}

impl BucketScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore every arm to the `(1, 1)` prior.
    pub fn reset(&mut self) {
        self.arms = [ArmStats::default(); 4];
    }

    pub fn arm(&self, bucket: RecencyBucket) -> ArmStats {
        self.arms[bucket.index()]
    }

    /// UCB1 score per bucket, in [`RecencyBucket::ALL`] order.
    pub fn scores(&self) -> [f64; 4] {
        let total: u64 = self.arms.iter().map(|a| a.trials).sum();
        let ln_n = (total as f64).ln();
        self.arms.map(|arm| {
            let trials = arm.trials.max(1) as f64;
            arm.successes as f64 / trials + (ln_n / trials).sqrt()
        })
    }

    /// Scores normalized to a probability distribution.
    pub fn probabilities(&self) -> [f64; 4] {
        let scores = self.scores();
        let sum: f64 = scores.iter().sum();
        scores.map(|s| s / sum)
    }

    /// Sample a bucket in proportion to its UCB1 score.
    pub fn select(&self, rng: &mut impl Rng) -> RecencyBucket {
        let probs = self.probabilities();
        roulette(&probs, rng)
            .map(|i| RecencyBucket::ALL[i])
            .unwrap_or(RecencyBucket::Q4)
    }

    /// Record the outcome of a walk attempt made with `bucket`.
    pub fn record(&mut self, bucket: RecencyBucket, walk_successful: bool) {
        let arm = &mut self.arms[bucket.index()];
        arm.trials += 1;
        if walk_successful {
            arm.successes += 1;
        }
    }
}

/// Roulette-wheel selection over non-negative weights.
///
/// Returns `None` when the weights carry no usable mass (empty, all zero,
/// or a non-finite total).
pub(crate) fn roulette(weights: &[f64], rng: &mut impl Rng) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 || weights.iter().any(|w| !(*w >= 0.0)) {
        return None;
    }
    let r = rng.gen_range(0.0..total);
    let mut cumsum = 0.0;
    for (i, w) in weights.iter().enumerate() {
        cumsum += w;
        if r < cumsum {
            return Some(i);
        }
    }
    // Rounding can leave r just above the final cumulative sum.
    weights.iter().rposition(|w| *w > 0.0)
}
