//! Rule store: accepted rules grouped by head relation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::RelationId;

use super::confidence::TemporalPattern;
use super::Rule;

/// Append-only collection of rules keyed by head relation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleStore {
    rules: BTreeMap<RelationId, Vec<Rule>>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rule: Rule) {
        self.rules.entry(rule.head_rel).or_default().push(rule);
    }

    /// Rules predicting `head_rel`, in insertion or confidence order.
    pub fn get(&self, head_rel: RelationId) -> &[Rule] {
        self.rules.get(&head_rel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Stable sort of every group by descending confidence.
    pub fn sort_by_confidence(&mut self) {
        for group in self.rules.values_mut() {
            group.sort_by(|a, b| b.conf.total_cmp(&a.conf));
        }
    }

    /// Union with another store. Groups for the same head are concatenated.
    pub fn merge(&mut self, other: RuleStore) {
        for (head, group) in other.rules {
            self.rules.entry(head).or_default().extend(group);
        }
    }

    /// Head relations with at least one rule, ascending.
    pub fn heads(&self) -> impl Iterator<Item = RelationId> + '_ {
        self.rules.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values().flatten()
    }

    /// Total number of rules.
    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn statistics(&self) -> RuleStatistics {
        let mut by_length = BTreeMap::new();
        let mut by_pattern = BTreeMap::new();
        for rule in self.iter() {
            *by_length.entry(rule.body_len()).or_insert(0) += 1;
            if let Some(p) = TemporalPattern::from_order(&rule.body_timestamp_order) {
                *by_pattern.entry(p.as_str().to_string()).or_insert(0) += 1;
            }
        }
        RuleStatistics {
            relations_with_rules: self.rules.len(),
            total_rules: self.len(),
            by_length,
            by_pattern,
        }
    }
}

/// Aggregate counts over a [`RuleStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStatistics {
    /// Head relations (inverses included) with at least one rule.
    pub relations_with_rules: usize,
    pub total_rules: usize,
    /// Body length → number of rules.
    pub by_length: BTreeMap<usize, usize>,
    /// Temporal pattern (e.g. `"021"`) → number of rules.
    pub by_pattern: BTreeMap<String, usize>,
}

impl std::fmt::Display for RuleStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Relations with rules: {}", self.relations_with_rules)?;
        writeln!(f, "Total rules:          {}", self.total_rules)?;
        let lengths: Vec<String> = self
            .by_length
            .iter()
            .map(|(len, n)| format!("{len}: {n}"))
            .collect();
        writeln!(f, "Rules by length:      {}", lengths.join(", "))?;
        let patterns: Vec<String> = self
            .by_pattern
            .iter()
            .map(|(p, n)| format!("{p}: {n}"))
            .collect();
        write!(f, "Temporal patterns:    {}", patterns.join(", "))
    }
}
