//! Per-node coordination state for one EM-CB round, and the ranking of
//! nodes by hashed id that drives pairing and macrochunk assignment
//! (spec.md §4.6; REDESIGN FLAGS item 1 in SPEC_FULL.md).
//!
//! The source coordinates trading via a per-node mutex, an atomic
//! `active_threads` counter, and a `has_traded` flag (spec.md §5, "Shared-
//! resource policy"). Here that collapses to one state machine per node,
//! driven by wave barriers rather than fine-grained locking (design note
//! §9, "Parallel hand-off over hashed ranges"): a node starts `Pending`,
//! becomes `Ready` once its full incoming-neighborhood message count is
//! known, and is marked `Traded` once its pair's trade has been computed.

use crate::types::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    MessagesIncomplete,
    Ready,
    Traded,
}

/// One node's position in this round's hashed order: its original id, its
/// hashed value, and its rank (position once all nodes are sorted by hashed
/// value) — the rank is what pairs `(2i, 2i+1)` for trading.
#[derive(Debug, Clone, Copy)]
pub struct RankedNode {
    pub node: NodeId,
    pub hash: u64,
}

/// Orders every node by this round's hash, breaking ties by node id so the
/// ordering (and therefore the pairing) is deterministic.
#[must_use]
pub fn rank_nodes(hash: &crate::hash::RoundHash, num_nodes: u64) -> Vec<RankedNode> {
    let mut ranked: Vec<RankedNode> = (0..num_nodes as NodeId)
        .map(|node| RankedNode { node, hash: hash.apply(node) })
        .collect();
    ranked.sort_by_key(|r| (r.hash, r.node));
    ranked
}
