//! Candidate scoring with learned rules.
//!
//! These functions rank answer candidates at query time. A candidate is
//! reached through one or more body groundings ("candidate walks") of a
//! rule; each walk is given as its body timestamps in body order. Scores
//! that look at walk timestamps return `None` when there are no walks.

use crate::graph::Timestamp;
use crate::rules::Rule;

/// Smoothed rule confidence: `rule_supp / (body_supp + c)`.
pub fn confidence_score(rule: &Rule, c: f64) -> f64 {
    rule.rule_supp as f64 / (rule.body_supp as f64 + c)
}

/// Latest timestamp, over all walks, of the body edge with the earliest rank.
fn latest_earliest_edge(rule: &Rule, walks: &[Vec<Timestamp>]) -> Option<Timestamp> {
    let min_rank = rule.body_timestamp_order.iter().min()?;
    let pos = rule.body_timestamp_order.iter().position(|r| r == min_rank)?;
    walks.iter().filter_map(|w| w.get(pos).copied()).max()
}

/// Exponential decay in the gap between the query and the candidate's
/// freshest grounding: `exp(lambda * (max_ts - query_ts))`.
pub fn time_decay_score(
    rule: &Rule,
    walks: &[Vec<Timestamp>],
    query_ts: Timestamp,
    lambda: f64,
) -> Option<f64> {
    let max_ts = latest_earliest_edge(rule, walks)?;
    Some((lambda * (max_ts - query_ts) as f64).exp())
}

/// `a * confidence + (1 - a) * time decay`.
pub fn combined_score(
    rule: &Rule,
    walks: &[Vec<Timestamp>],
    query_ts: Timestamp,
    lambda: f64,
    a: f64,
) -> Option<f64> {
    let decay = time_decay_score(rule, walks, query_ts, lambda)?;
    Some(a * confidence_score(rule, 0.0) + (1.0 - a) * decay)
}

/// Reward mixing a short-term hyperbolic and a long-term logarithmic decay
/// of the scaled time gap `d = 0.1 * (query_ts - max_ts)`:
/// `alpha / (1 + lambda1 * d) + (1 - alpha) / (1 + ln(lambda2 * d))`.
///
/// The result is not finite when `d` is zero or negative.
pub fn time_diff_reward(
    rule: &Rule,
    walks: &[Vec<Timestamp>],
    query_ts: Timestamp,
    alpha: f64,
    lambda1: f64,
    lambda2: f64,
) -> Option<f64> {
    let max_ts = latest_earliest_edge(rule, walks)?;
    let d = 0.1 * (query_ts - max_ts) as f64;
    let short_term = alpha / (1.0 + lambda1 * d);
    let long_term = (1.0 - alpha) / (1.0 + (lambda2 * d).ln());
    Some(short_term + long_term)
}

/// `a * confidence + (1 - a) * time_diff_reward`.
pub fn confidence_time_diff_score(
    rule: &Rule,
    walks: &[Vec<Timestamp>],
    query_ts: Timestamp,
    a: f64,
    alpha: f64,
    lambda1: f64,
    lambda2: f64,
) -> Option<f64> {
    let reward = time_diff_reward(rule, walks, query_ts, alpha, lambda1, lambda2)?;
    Some(a * confidence_score(rule, 0.0) + (1.0 - a) * reward)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(order: Vec<usize>) -> Rule {
        Rule {
            head_rel: 0,
            body_rels: vec![1; order.len()],
            var_constraints: vec![],
            body_timestamp_order: order,
            conf: 0.5,
            rule_supp: 3,
            body_supp: 6,
        }
    }

    #[test]
    fn confidence_is_smoothed() {
        let r = rule(vec![0]);
        assert_eq!(confidence_score(&r, 0.0), 0.5);
        assert_eq!(confidence_score(&r, 4.0), 0.3);
    }

    #[test]
    fn decay_uses_earliest_ranked_position() {
        // Position 1 has the smallest rank; its latest timestamp is 8.
        let r = rule(vec![1, 0]);
        let walks = vec![vec![9, 5], vec![9, 8], vec![10, 2]];
        let s = time_decay_score(&r, &walks, 10, 0.5).unwrap();
        assert!((s - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn decay_is_one_at_query_time() {
        let r = rule(vec![0]);
        assert_eq!(time_decay_score(&r, &[vec![7]], 7, 0.1), Some(1.0));
    }

    #[test]
    fn combined_weights_both_terms() {
        let r = rule(vec![0]);
        let walks = vec![vec![7]];
        assert_eq!(combined_score(&r, &walks, 7, 0.1, 1.0), Some(0.5));
        assert_eq!(combined_score(&r, &walks, 7, 0.1, 0.0), Some(1.0));
        assert_eq!(combined_score(&r, &walks, 7, 0.1, 0.5), Some(0.75));
    }

    #[test]
    fn reward_mixes_short_and_long_term() {
        let r = rule(vec![0]);
        // d = 0.1 * (20 - 10) = 1; ln(e * 1) = 1.
        let s = time_diff_reward(&r, &[vec![10]], 20, 0.5, 1.0, std::f64::consts::E).unwrap();
        assert!((s - (0.25 + 0.25)).abs() < 1e-12);

        let total =
            confidence_time_diff_score(&r, &[vec![10]], 20, 0.5, 0.5, 1.0, std::f64::consts::E)
                .unwrap();
        assert!((total - 0.5).abs() < 1e-12);
    }

    #[test]
    fn no_walks_no_score() {
        let r = rule(vec![0]);
        assert_eq!(time_decay_score(&r, &[], 10, 0.1), None);
        assert_eq!(time_diff_reward(&r, &[], 10, 0.5, 1.0, 1.0), None);
    }
}
