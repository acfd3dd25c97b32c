//! Rule persistence: JSON for machines, verbalized text for people.
//!
//! The JSON file maps head relation ids to their rule lists and loads back
//! into an identical [`RuleStore`]. The text file holds one rule per line:
//!
//! ```text
//! 0.750000     3     4  head(X0,X2,T2) <- r1(X0,X1,T0), r2(X1,X2,T1)
//! ```

use std::path::Path;

use crate::config::LearnConfig;
use crate::error::{StoreError, StoreResult};
use crate::graph::{RelationId, Vocabulary};
use crate::rules::{Rule, RuleStore};

/// File stem shared by the JSON and text outputs of one run.
pub fn rules_file_stem(run_tag: &str, config: &LearnConfig) -> String {
    let lengths: Vec<String> = config.rule_lengths.iter().map(usize::to_string).collect();
    let seed = config
        .seed
        .map_or_else(|| "None".to_string(), |s| s.to_string());
    format!(
        "{run_tag}_r[{}]_n{}_{}_s{seed}_rules",
        lengths.join(","),
        config.num_walks,
        config.transition_distr
    )
}

/// Write the store as JSON.
pub fn save_rules(store: &RuleStore, path: &Path) -> StoreResult<()> {
    let json = serde_json::to_string(store).map_err(|e| StoreError::Serialization {
        message: e.to_string(),
    })?;
    write_file(path, &json)
}

/// Read a store written by [`save_rules`].
pub fn load_rules(path: &Path) -> StoreResult<RuleStore> {
    let content = std::fs::read_to_string(path).map_err(|e| StoreError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| StoreError::Serialization {
        message: format!("{}: {e}", path.display()),
    })
}

/// Write every rule as one verbalized line.
pub fn save_rules_verbalized(store: &RuleStore, vocab: &Vocabulary, path: &Path) -> StoreResult<()> {
    let mut text = String::new();
    for rule in store.iter() {
        text.push_str(&verbalize_rule(rule, |r| vocab.relation_name(r)));
        text.push('\n');
    }
    write_file(path, &text)
}

/// Render a rule as `conf  rule_supp  body_supp  head(...) <- body...`.
///
/// Variables are numbered by entity group: constrained positions share a
/// variable, every other position gets its own.
pub fn verbalize_rule(rule: &Rule, relation_name: impl Fn(RelationId) -> String) -> String {
    let n = rule.body_len();
    let mut groups = rule.var_constraints.clone();
    for pos in 0..=n {
        if !groups.iter().any(|g| g.contains(&pos)) {
            groups.push(vec![pos]);
        }
    }
    groups.sort();
    let var = |pos: usize| groups.iter().position(|g| g.contains(&pos)).unwrap_or(pos);

    let head = format!(
        "{:8.6}  {:4}  {:4}  {}(X0,X{},T{})",
        rule.conf,
        rule.rule_supp,
        rule.body_supp,
        relation_name(rule.head_rel),
        var(n),
        n
    );
    let body: Vec<String> = rule
        .body_rels
        .iter()
        .enumerate()
        .map(|(i, rel)| {
            format!(
                "{}(X{},X{},T{})",
                relation_name(*rel),
                var(i),
                var(i + 1),
                rule.body_timestamp_order[i]
            )
        })
        .collect();
    format!("{head} <- {}", body.join(", "))
}

fn write_file(path: &Path, content: &str) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    std::fs::write(path, content).map_err(|e| StoreError::Io {
        path: path.display().to_string(),
        source: e,
    })
}
