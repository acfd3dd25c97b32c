// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # chronorule
//!
//! Temporal logical rule learning on temporal knowledge graphs.
//!
//! Rules are read off cyclic random walks that go back in time from a fact,
//! then scored by resampling their bodies against the graph.
//!
//! ## Architecture
//!
//! - **Graph** (`graph`): fact model, inverse relations, edge index, dataset loader
//! - **Walks** (`walk`): temporal walk sampler with recency stratification
//! - **Scheduling** (`bandit`): UCB1 over the four recency buckets
//! - **Rules** (`rules`): rule shapes, confidence estimation, rule store
//! - **Driver** (`learn`): relation sharding across a rayon pool
//! - **Output** (`export`, `score`): rule files and candidate scoring
//!
//! ## Library usage
//!
//! ```no_run
//! use chronorule::config::LearnConfig;
//! use chronorule::graph::Dataset;
//! use chronorule::learn::learn;
//!
//! let data = Dataset::load(std::path::Path::new("data/icews14")).unwrap();
//! let config = LearnConfig {
//!     rule_lengths: vec![1, 2, 3],
//!     seed: Some(12),
//!     ..Default::default()
//! };
//! let report = learn(&data.index(), &data.vocab.inverse, &config).unwrap();
//! println!("{}", report.store.statistics());
//! ```

pub mod bandit;
pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod learn;
pub mod rules;
pub mod score;
pub mod walk;
