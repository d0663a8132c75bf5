//! `HHGeneratorRLE`: the Havel-Hakimi realization of a run-length-encoded
//! degree distribution (spec.md §4.8).
//!
//! Same external contract as [`crate::hh_generator::HHGenerator`], but the
//! input is already grouped into `(degree, count)` runs over consecutive
//! node ids rather than one entry per node — as a power-law degree sample
//! produces before any node-by-node expansion. Residual blocks live in a
//! single [`crate::pq::PriorityQueueEM`] keyed by `(degree, first_id)` with
//! degree inverted so the minimum key is the highest residual degree,
//! rather than in the `BTreeMap<Degree, Vec<Block>>` `HHGenerator` uses;
//! popping the minimum key and re-pushing a node's degraded remainder plays
//! the same role as `HHGenerator`'s `degrade`/`merge_around`, except
//! newly-adjacent same-degree blocks are left as separate PQ entries rather
//! than coalesced in place — a single-node-granularity PQ entry and a
//! block covering the same run cost the same to pop, so the explicit merge
//! the source performs is a memory optimization this in-memory queue
//! doesn't need, not a behavioral requirement.

use crate::error::Result;
use crate::pq::PriorityQueueEM;
use crate::runtime::Runtime;
use crate::sorter::Encode;
use crate::types::{Degree, Edge, NodeId};

/// One run of consecutive node ids sharing a residual degree.
#[derive(Debug, Clone, Copy)]
struct RleBlock {
    degree: Degree,
    count: u64,
    first_id: NodeId,
}

impl Encode for RleBlock {
    const WIDTH: usize = Degree::WIDTH + u64::WIDTH + NodeId::WIDTH;

    fn encode(&self, out: &mut Vec<u8>) {
        self.degree.encode(out);
        self.count.encode(out);
        self.first_id.encode(out);
    }

    fn decode(bytes: &[u8]) -> Self {
        let (d, rest) = bytes.split_at(Degree::WIDTH);
        let (c, f) = rest.split_at(u64::WIDTH);
        RleBlock { degree: Degree::decode(d), count: u64::decode(c), first_id: NodeId::decode(f) }
    }
}

/// `(inverted degree, first_id)` so the PQ's ascending order visits the
/// highest residual degree first, lowest id breaking ties.
type RankKey = (u64, u64);

fn rank_key(degree: Degree, first_id: NodeId) -> RankKey {
    ((i64::from(Degree::MAX) - i64::from(degree)) as u64, first_id as u64)
}

pub struct HHGeneratorRle {
    queue: PriorityQueueEM<RankKey, RleBlock>,
    unsatisfied_nodes: Vec<NodeId>,
    unsatisfied_degree: u64,
    max_edges: u64,
}

impl HHGeneratorRle {
    /// Builds a generator from `(degree, count)` runs over consecutive node
    /// ids starting at 0; a run's `count` nodes occupy ids
    /// `[offset, offset + count)` where `offset` is the sum of every
    /// preceding run's count.
    pub fn new(runtime: &Runtime, runs: &[(Degree, u64)]) -> Result<Self> {
        let mut queue = PriorityQueueEM::new();
        let mut offset: u64 = 0;
        let mut max_edges: u64 = 0;
        for &(degree, count) in runs {
            if count > 0 && degree > 0 {
                let block = RleBlock { degree, count, first_id: offset as NodeId };
                queue.push(runtime, rank_key(degree, block.first_id), block)?;
            }
            max_edges += degree as u64 * count;
            offset += count;
        }
        Ok(HHGeneratorRle { queue, unsatisfied_nodes: Vec::new(), unsatisfied_degree: 0, max_edges: max_edges / 2 })
    }

    #[must_use]
    pub fn max_edges(&self) -> u64 {
        self.max_edges
    }

    #[must_use]
    pub fn unsatisfied_nodes(&self) -> &[NodeId] {
        &self.unsatisfied_nodes
    }

    #[must_use]
    pub fn unsatisfied_degree(&self) -> u64 {
        self.unsatisfied_degree
    }

    fn pop_top(&mut self) -> Result<Option<RleBlock>> {
        let Some(key) = self.queue.peek_min_key() else { return Ok(None) };
        let mut matches = self.queue.drain_min(key)?;
        debug_assert_eq!(matches.len(), 1, "rank keys are unique per (degree, first_id)");
        Ok(matches.pop())
    }

    /// Draws up to `want` partner ids from the highest remaining blocks,
    /// splitting and degrading as it goes. Returns fewer than `want` only
    /// when the pool is exhausted.
    fn draw_partners(&mut self, runtime: &Runtime, want: u64) -> Result<Vec<NodeId>> {
        let mut drawn = Vec::with_capacity(want as usize);
        while (drawn.len() as u64) < want {
            let Some(block) = self.pop_top()? else { break };
            let need = want - drawn.len() as u64;
            let take = need.min(block.count);
            for i in 0..take {
                drawn.push(block.first_id + i as NodeId);
            }
            if block.count > take {
                let rest = RleBlock {
                    degree: block.degree,
                    count: block.count - take,
                    first_id: block.first_id + take as NodeId,
                };
                self.queue.push(runtime, rank_key(rest.degree, rest.first_id), rest)?;
            }
            if block.degree - 1 > 0 {
                let degraded = RleBlock { degree: block.degree - 1, count: take, first_id: block.first_id };
                self.queue.push(runtime, rank_key(degraded.degree, degraded.first_id), degraded)?;
            }
        }
        Ok(drawn)
    }

    /// Realizes the full distribution, emitting every edge via `emit`.
    pub fn generate(mut self, runtime: &Runtime, mut emit: impl FnMut(Edge) -> Result<()>) -> Result<Self> {
        loop {
            let Some(block) = self.pop_top()? else { break };
            let u = block.first_id;
            if block.count > 1 {
                let rest = RleBlock { degree: block.degree, count: block.count - 1, first_id: block.first_id + 1 };
                self.queue.push(runtime, rank_key(rest.degree, rest.first_id), rest)?;
            }

            let want = block.degree as u64;
            let drawn = self.draw_partners(runtime, want)?;
            if (drawn.len() as u64) < want {
                let deficit = want - drawn.len() as u64;
                self.unsatisfied_nodes.push(u);
                self.unsatisfied_degree += deficit;
                tracing::warn!(node = u, deficit, "Havel-Hakimi RLE sequence not realizable at this node");
            }
            for v in drawn {
                emit(Edge::new(u, v))?;
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_regular_six_nodes_from_one_run() {
        let rt = Runtime::for_testing(1);
        let gen = HHGeneratorRle::new(&rt, &[(3, 6)]).unwrap();
        assert_eq!(gen.max_edges(), 9);
        let mut edges = Vec::new();
        let gen = gen
            .generate(&rt, |e| {
                edges.push(e);
                Ok(())
            })
            .unwrap();
        assert!(gen.unsatisfied_nodes().is_empty());
        assert_eq!(edges.len(), 9);
        let mut deg = [0u32; 6];
        for e in &edges {
            deg[e.first as usize] += 1;
            deg[e.second as usize] += 1;
        }
        assert_eq!(deg, [3, 3, 3, 3, 3, 3]);
    }

    #[test]
    fn mixed_runs_match_per_node_degree_sum() {
        let rt = Runtime::for_testing(2);
        // ids 0..4 at degree 4 (star centers share partners), ids 4..8 at degree 1.
        let gen = HHGeneratorRle::new(&rt, &[(1, 4), (4, 1)]).unwrap();
        let mut edges = Vec::new();
        let gen = gen
            .generate(&rt, |e| {
                edges.push(e);
                Ok(())
            })
            .unwrap();
        let mut deg = [0u32; 5];
        for e in &edges {
            deg[e.first as usize] += 1;
            deg[e.second as usize] += 1;
        }
        assert!(gen.unsatisfied_nodes().is_empty());
        assert_eq!(deg[4], 4);
        assert_eq!(&deg[0..4], &[1, 1, 1, 1]);
    }

    #[test]
    fn unrealizable_distribution_reports_deficit() {
        let rt = Runtime::for_testing(3);
        let gen = HHGeneratorRle::new(&rt, &[(3, 1), (1, 2)]).unwrap();
        let mut edges = Vec::new();
        let gen = gen
            .generate(&rt, |e| {
                edges.push(e);
                Ok(())
            })
            .unwrap();
        assert!(!gen.unsatisfied_nodes().is_empty());
    }
}
