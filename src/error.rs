//! Crate-wide error taxonomy.
//!
//! A single flat enum, in the style of this engine's sibling delta-compression
//! crate's `DeltaError`: the simplifier never recovers from any of these, so
//! there is no value in a per-module error type hierarchy.

use thiserror::Error;

/// Fatal errors raised by the path-collapse engine.
///
/// Every variant is fatal: the engine does not retry and does not emit
/// partial results afterward. See [`crate::simplifier::Simplifier`] for how
/// a `SimplifierError` poisons the engine once returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimplifierError {
    /// The upstream iterator violated the streaming contract: nodes arrived
    /// out of order, an edge referenced a node never delivered, or a k-mer
    /// chain was internally inconsistent (e.g. consecutive k-mers that don't
    /// overlap by k-1 bases).
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A split or merge failed to establish its postconditions. This
    /// indicates a bug in the engine, not bad input.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The arena could not grow to hold a new path-node.
    #[error("resource exhaustion: {0}")]
    ResourceExhaustion(String),
}

impl SimplifierError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        SimplifierError::MalformedInput(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        SimplifierError::InvariantViolation(msg.into())
    }

    pub fn exhausted(msg: impl Into<String>) -> Self {
        SimplifierError::ResourceExhaustion(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SimplifierError>;
