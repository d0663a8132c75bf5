//! Core identifiers and the normalized edge representation shared by every
//! stream, generator, and randomization engine in this crate.

use serde::{Deserialize, Serialize};

/// A vertex identifier. Non-negative; [`INVALID_NODE`] is a reserved sentinel
/// used in-band by [`crate::edge_stream::EdgeStream`] to mark empty heads.
pub type NodeId = i32;

/// Reserved sentinel distinguishable from any real node id produced by this
/// crate (node ids are always non-negative).
pub const INVALID_NODE: NodeId = NodeId::MAX;

/// A vertex degree.
pub type Degree = i32;

/// An index into the current edge ordering of an [`crate::edge_stream::EdgeStream`].
pub type EdgeId = i64;

/// An identifier for one swap within an EM-ES batch. Ascending `SwapId`
/// order is the "time" dimension that time-forward processing forwards
/// values along.
pub type SwapId = i64;

/// A normalized undirected edge `(first, second)` with `first <= second`.
///
/// A *loop* has `first == second`. Two edges compare equal (are *parallel*)
/// exactly when their normalized forms are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub first: NodeId,
    pub second: NodeId,
}

impl Edge {
    /// Builds a normalized edge from two endpoints in any order.
    #[must_use]
    pub fn new(u: NodeId, v: NodeId) -> Self {
        if u <= v {
            Edge { first: u, second: v }
        } else {
            Edge { first: v, second: u }
        }
    }

    /// True if this edge is a self-loop.
    #[must_use]
    pub fn is_loop(&self) -> bool {
        self.first == self.second
    }
}

impl From<(NodeId, NodeId)> for Edge {
    fn from((u, v): (NodeId, NodeId)) -> Self {
        Edge::new(u, v)
    }
}

/// A request to swap the pairing of two distinct edges, identified by their
/// current [`EdgeId`]s, together with a direction bit.
///
/// For source edges `(a, b)` and `(c, d)`:
/// - `direction = false` targets `(a, c)` and `(b, d)`
/// - `direction = true`  targets `(a, d)` and `(b, c)`
///
/// Target edges are normalized after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapDescriptor {
    /// The smaller of the two referenced edge ids.
    pub e1: EdgeId,
    /// The larger of the two referenced edge ids.
    pub e2: EdgeId,
    pub direction: bool,
}

impl SwapDescriptor {
    /// Builds a descriptor, ordering `e1 < e2`. Panics if the two ids are
    /// equal; callers are expected to reject that case before construction
    /// (spec: "both edges of a swap are the same edge id: rejected
    /// pre-stage-1").
    #[must_use]
    pub fn new(a: EdgeId, b: EdgeId, direction: bool) -> Self {
        assert_ne!(a, b, "a swap cannot reference the same edge id twice");
        let (e1, e2) = if a < b { (a, b) } else { (b, a) };
        SwapDescriptor { e1, e2, direction }
    }

    /// Computes the two (unnormalized-then-normalized) target edges given
    /// the current values of the two source edges, in `(e1, e2)` order.
    #[must_use]
    pub fn targets(&self, src1: Edge, src2: Edge) -> [Edge; 2] {
        let (a, b) = (src1.first, src1.second);
        let (c, d) = (src2.first, src2.second);
        if self.direction {
            [Edge::new(a, d), Edge::new(b, c)]
        } else {
            [Edge::new(a, c), Edge::new(b, d)]
        }
    }
}

/// The outcome of attempting one swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapResult {
    pub performed: bool,
    pub loop_: bool,
    pub targets: [Edge; 2],
    pub conflict: [bool; 2],
}

impl SwapResult {
    /// Invariant from spec.md §8: `performed <=> !loop && !conflict[0] && !conflict[1]`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.performed == (!self.loop_ && !self.conflict[0] && !self.conflict[1])
    }
}
