//! Error kinds for this crate (spec.md §7).
//!
//! Swap rejection (loop/conflict) is *not* an error — it is part of
//! [`crate::types::SwapResult`]. `UnrealizableSequence` is likewise not a
//! variant here; it is reported out-of-band via `tracing::warn!` plus
//! `unsatisfied_nodes()`/`unsatisfied_degree()` on the Havel-Hakimi
//! generators, per spec.md §7.

use crate::types::Edge;

/// The single error type returned by fallible operations in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or inconsistent configuration, detected before any I/O.
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// A push into an [`crate::edge_stream::EdgeStream`] violated
    /// non-decreasing order.
    #[error("edge {next:?} pushed after {prev:?}, violating sorted order")]
    OrderViolation { prev: Edge, next: Edge },

    /// A push into an [`crate::edge_stream::EdgeStream`] that disallows
    /// loops was given a loop edge.
    #[error("loop edge {0:?} pushed into a stream that disallows loops")]
    LoopNotAllowed(Edge),

    /// A push into an [`crate::edge_stream::EdgeStream`] that disallows
    /// multi-edges duplicated the previous edge.
    #[error("duplicate edge {0:?} pushed into a stream that disallows multi-edges")]
    MultiEdgeNotAllowed(Edge),

    /// A sorter, priority queue, or stream spill failed at the filesystem
    /// boundary.
    #[error("external-memory I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),

    /// An internal invariant was violated (e.g. adjacency-list overflow in
    /// EM-CB). Always fatal.
    #[error("internal invariant violated: {0}")]
    AssertionFailure(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
