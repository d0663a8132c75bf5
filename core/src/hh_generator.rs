//! `HHGenerator`: the Havel–Hakimi realization of a monotone degree
//! sequence (spec.md §4.3).
//!
//! Node ids are assigned by position in the input sequence. Internally, the
//! residual degree sequence is kept as *blocks* of consecutive node ids that
//! currently share a residual degree — `(degree, first_id, count)` — rather
//! than one entry per node, so large runs of equal degree (as produced by a
//! power-law sample or a regular graph) collapse to a handful of blocks.
//! Each step checks out the block of highest degree, pairs its first node
//! against the next `d` available slots (splitting blocks as needed), and
//! merges any newly-adjacent blocks that end up with equal degree.

use crate::error::Result;
use crate::types::{Degree, Edge, NodeId};
use std::collections::BTreeMap;

/// One run of consecutive node ids sharing a residual degree.
#[derive(Debug, Clone, Copy)]
struct Block {
    first_id: NodeId,
    count: u32,
}

/// Havel–Hakimi realizing-edge-list generator.
///
/// Construction order: callers declare whether the input sequence is
/// already sorted increasing or decreasing; `HHGenerator` always realizes
/// highest-residual-degree-first internally regardless of input order.
pub struct HHGenerator {
    /// Blocks keyed by degree, highest degree served first.
    blocks: BTreeMap<Degree, Vec<Block>>,
    remaining_nodes: u64,
    unsatisfied_nodes: Vec<NodeId>,
    unsatisfied_degree: u64,
    max_edges: u64,
}

impl HHGenerator {
    /// Builds a generator from a degree sequence indexed by node id (the
    /// sequence need not be sorted; it is bucketed by degree internally).
    #[must_use]
    pub fn new(degrees: &[Degree]) -> Self {
        let mut by_degree: BTreeMap<Degree, Vec<NodeId>> = BTreeMap::new();
        for (id, &d) in degrees.iter().enumerate() {
            by_degree.entry(d).or_default().push(id as NodeId);
        }
        let mut blocks: BTreeMap<Degree, Vec<Block>> = BTreeMap::new();
        for (degree, ids) in by_degree {
            if degree == 0 {
                continue;
            }
            // ids are pushed in ascending node-id order already (enumerate
            // order); fold maximal runs of consecutive ids into one block.
            let mut run_start = ids[0];
            let mut run_len: u32 = 1;
            let mut runs = Vec::new();
            for w in ids.windows(2) {
                if w[1] == w[0] + 1 {
                    run_len += 1;
                } else {
                    runs.push(Block { first_id: run_start, count: run_len });
                    run_start = w[1];
                    run_len = 1;
                }
            }
            runs.push(Block { first_id: run_start, count: run_len });
            blocks.insert(degree, runs);
        }
        let remaining_nodes = degrees.len() as u64;
        let max_edges = degrees.iter().map(|&d| d as u64).sum::<u64>() / 2;
        HHGenerator {
            blocks,
            remaining_nodes,
            unsatisfied_nodes: Vec::new(),
            unsatisfied_degree: 0,
            max_edges,
        }
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

    fn highest_degree(&self) -> Option<Degree> {
        self.blocks.keys().next_back().copied()
    }

    /// Removes and returns the first node of the block at `degree`,
    /// shrinking or dropping the block. Panics if `degree` has no blocks.
    fn checkout_first(&mut self, degree: Degree) -> NodeId {
        let list = self.blocks.get_mut(&degree).expect("caller checked degree is present");
        let block = list[0];
        if block.count == 1 {
            list.remove(0);
        } else {
            list[0] = Block { first_id: block.first_id + 1, count: block.count - 1 };
        }
        if list.is_empty() {
            self.blocks.remove(&degree);
        }
        block.first_id
    }

    /// Takes up to `want` node ids from the block(s) at `degree`, splitting
    /// a block when only part of it is consumed, and returns them together
    /// with the count actually taken (less than `want` if `degree` runs out).
    fn take_from_degree(&mut self, degree: Degree, want: u32) -> Vec<NodeId> {
        let mut taken = Vec::new();
        loop {
            if taken.len() as u32 >= want {
                break;
            }
            let Some(list) = self.blocks.get_mut(&degree) else { break };
            if list.is_empty() {
                self.blocks.remove(&degree);
                break;
            }
            let block = list[0];
            let need = want - taken.len() as u32;
            if block.count <= need {
                for i in 0..block.count {
                    taken.push(block.first_id + i as NodeId);
                }
                list.remove(0);
            } else {
                for i in 0..need {
                    taken.push(block.first_id + i as NodeId);
                }
                list[0] = Block { first_id: block.first_id + need as NodeId, count: block.count - need };
            }
            if list.is_empty() {
                self.blocks.remove(&degree);
            }
        }
        taken
    }

    fn degrade(&mut self, node: NodeId, degree: Degree) {
        if degree <= 0 {
            return;
        }
        let new_degree = degree - 1;
        self.blocks.entry(new_degree).or_default().push(Block { first_id: node, count: 1 });
        if new_degree == 0 {
            self.blocks.remove(&0);
        }
        self.merge_around(new_degree);
    }

    /// Coalesces adjacent-id blocks at `degree` that became neighbors after
    /// a checkout/degrade. Keeps the block list for `degree` sorted by id
    /// and collapses consecutive runs.
    fn merge_around(&mut self, degree: Degree) {
        let Some(list) = self.blocks.get_mut(&degree) else { return };
        list.sort_by_key(|b| b.first_id);
        let mut merged: Vec<Block> = Vec::with_capacity(list.len());
        for b in list.drain(..) {
            if let Some(last) = merged.last_mut() {
                if last.first_id + last.count as NodeId == b.first_id {
                    last.count += b.count;
                    continue;
                }
            }
            merged.push(b);
        }
        *list = merged;
        if list.is_empty() {
            self.blocks.remove(&degree);
        }
    }

    /// Realizes the full sequence, emitting every edge via `emit`. Returns
    /// once all residual degree has been exhausted or no higher-degree
    /// partner remains; unrealizable deficits are recorded, not failed.
    pub fn generate(mut self, mut emit: impl FnMut(Edge) -> Result<()>) -> Result<Self> {
        while let Some(degree) = self.highest_degree() {
            let u = self.checkout_first(degree);
            let want = degree as u32;
            // Never pair `u` with itself: temporarily remove it from its own
            // degree bucket before drawing partners (already removed by
            // checkout_first above).
            let mut partners = Vec::new();
            let mut remaining_want = want;
            // Walk degree buckets from highest to lowest, skipping `degree`
            // itself's bucket re-entry (u isn't in it anymore).
            let degrees_desc: Vec<Degree> = self.blocks.keys().rev().copied().collect();
            for d in degrees_desc {
                if remaining_want == 0 {
                    break;
                }
                let got = self.take_from_degree(d, remaining_want);
                remaining_want -= got.len() as u32;
                for v in got {
                    partners.push((v, d));
                }
            }
            if remaining_want > 0 {
                self.unsatisfied_nodes.push(u);
                self.unsatisfied_degree += remaining_want as u64;
                tracing::warn!(node = u, deficit = remaining_want, "Havel-Hakimi sequence not realizable at this node");
            }
            for (v, d) in partners {
                emit(Edge::new(u, v))?;
                self.degrade(v, d);
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_regular_six_nodes() {
        let degrees = vec![3, 3, 3, 3, 3, 3];
        let gen = HHGenerator::new(&degrees);
        assert_eq!(gen.max_edges(), 9);
        let mut edges = Vec::new();
        let gen = gen.generate(|e| {
            edges.push(e);
            Ok(())
        }).unwrap();
        assert!(gen.unsatisfied_nodes().is_empty());
        assert_eq!(edges.len(), 9);
        let mut deg = [0u32; 6];
        for e in &edges {
            assert!(e.first < e.second);
            deg[e.first as usize] += 1;
            deg[e.second as usize] += 1;
        }
        assert_eq!(deg, [3, 3, 3, 3, 3, 3]);
    }

    #[test]
    fn star_graph_realizable() {
        let degrees = vec![4, 1, 1, 1, 1];
        let gen = HHGenerator::new(&degrees);
        let mut edges = Vec::new();
        let gen = gen.generate(|e| {
            edges.push(e);
            Ok(())
        }).unwrap();
        assert!(gen.unsatisfied_nodes().is_empty());
        assert_eq!(edges.len(), 4);
        for e in &edges {
            assert_eq!(e.first, 0);
        }
    }

    #[test]
    fn unrealizable_sequence_reports_deficit() {
        // A single node of degree 3 among nodes with total insufficient
        // partner capacity: [3, 1, 1] sums to 5 (odd) is already invalid
        // input for a real graph; use [3, 1, 1, 1] which Erdos-Gallai fails:
        // sorted desc 3,1,1,1 -> sum=6, but node 0 needs 3 distinct partners
        // with degree>=1 each decremented; this actually IS realizable
        // (star on 4 leaves... but only 3 leaves exist here). So degree-0
        // deficit should appear for the last unmatched partner slot.
        let degrees = vec![3, 1, 1];
        let gen = HHGenerator::new(&degrees);
        let mut edges = Vec::new();
        let gen = gen.generate(|e| {
            edges.push(e);
            Ok(())
        }).unwrap();
        assert!(!gen.unsatisfied_nodes().is_empty());
    }
}
