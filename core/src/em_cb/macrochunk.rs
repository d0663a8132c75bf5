//! Macrochunk partitioning (spec.md §4.6): splits the hashed-id space into
//! contiguous intervals sized to balance work, processed in ascending hash
//! order.

use crate::em_cb::message::RankedNode;

/// A contiguous run of ranked nodes, identified by its position range in
/// the hash-sorted node order.
#[derive(Debug, Clone)]
pub struct Macrochunk {
    pub nodes: Vec<RankedNode>,
}

/// Splits `ranked` (already hash-sorted) into `target_chunks` contiguous,
/// roughly equal-degree macrochunks. `degree_of` supplies each node's
/// current degree so chunk boundaries balance message volume rather than
/// raw node count.
#[must_use]
pub fn partition(ranked: &[RankedNode], target_chunks: usize, degree_of: impl Fn(crate::types::NodeId) -> usize) -> Vec<Macrochunk> {
    if ranked.is_empty() || target_chunks == 0 {
        return vec![Macrochunk { nodes: ranked.to_vec() }];
    }
    let total_work: usize = ranked.iter().map(|r| degree_of(r.node)).sum();
    let target_per_chunk = (total_work / target_chunks).max(1);

    let mut chunks = Vec::with_capacity(target_chunks);
    let mut current = Vec::new();
    let mut current_work = 0usize;
    for &r in ranked {
        current.push(r);
        current_work += degree_of(r.node);
        if current_work >= target_per_chunk && chunks.len() + 1 < target_chunks {
            chunks.push(Macrochunk { nodes: std::mem::take(&mut current) });
            current_work = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(Macrochunk { nodes: current });
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_cover_every_node_exactly_once() {
        let ranked: Vec<RankedNode> = (0..20).map(|n| RankedNode { node: n, hash: n as u64 }).collect();
        let chunks = partition(&ranked, 4, |_| 1);
        let total: usize = chunks.iter().map(|c| c.nodes.len()).sum();
        assert_eq!(total, 20);
        assert!(chunks.len() <= 4);
    }
}
