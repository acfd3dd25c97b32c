//! Rich diagnostic error types for chronorule.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains. Sampling dead-ends are
//! not errors: walks and body samples report failure through `Option`.

use miette::Diagnostic;
use thiserror::Error;

use crate::graph::RelationId;

/// Top-level error type for chronorule.
#[derive(Debug, Error, Diagnostic)]
pub enum ChronoError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Learn(#[from] LearnError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] crate::config::ConfigError),
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("failed to read {path}")]
    #[diagnostic(
        code(chronorule::graph::io),
        help("Check that the dataset directory exists and contains a readable train.txt.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed fact at {path}:{line}: {message}")]
    #[diagnostic(
        code(chronorule::graph::malformed),
        help(
            "Each line must hold four tab-separated fields: \
             subject, relation, object, timestamp."
        )
    )]
    Malformed {
        path: String,
        line: usize,
        message: String,
    },

    #[error("failed to parse id mapping {path}: {message}")]
    #[diagnostic(
        code(chronorule::graph::mapping),
        help("Id mappings must be JSON objects from name to non-negative integer id.")
    )]
    Mapping { path: String, message: String },

    #[error("relation {relation} has no inverse relation")]
    #[diagnostic(
        code(chronorule::graph::missing_inverse),
        help("The inverse-relation mapping must cover every relation in the fact list.")
    )]
    MissingInverse { relation: RelationId },
}

// ---------------------------------------------------------------------------
// Learning errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LearnError {
    #[error("relation {relation} has no facts to start walks from")]
    #[diagnostic(
        code(chronorule::learn::empty_relation),
        help("Only request relations that occur in the learning facts.")
    )]
    EmptyRelation { relation: RelationId },

    #[error("no temporal pattern is defined for body timestamp order {order:?}")]
    #[diagnostic(
        code(chronorule::learn::unsupported_pattern),
        help("Confidence estimation supports rule bodies of length 1, 2 and 3 only.")
    )]
    UnsupportedPattern { order: Vec<usize> },

    #[error("worker pool could not be started: {message}")]
    #[diagnostic(code(chronorule::learn::pool))]
    WorkerPool { message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error on {path}")]
    #[diagnostic(
        code(chronorule::store::io),
        help("Check that the output directory is writable and the disk is not full.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(chronorule::store::serde),
        help("Rule files must be JSON objects mapping head relation ids to rule lists.")
    )]
    Serialization { message: String },
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;
pub type LearnResult<T> = std::result::Result<T, LearnError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Convenience result type for top-level operations.
pub type ChronoResult<T> = std::result::Result<T, ChronoError>;
