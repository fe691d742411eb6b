use thiserror::Error;

use crate::id::Uid;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    /// The source plan could not be queried (missing operator, broken
    /// adjacency). Aborts the whole plan-compilation attempt.
    #[error("Upstream plan error: {0}")]
    Upstream(String),

    /// An edge points at a uid that is not in the plan. Always a
    /// translator bug; never absorbed.
    #[error("Dangling edge: node {node} references missing node {missing}")]
    DanglingEdge { node: Uid, missing: Uid },

    #[error("Serialization error: {0}")]
    Serde(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serde(e.to_string())
    }
}
