//! Stages 2–4 of TFP: conflict simulation, existence resolution, and commit
//! (spec.md §4.5, stages 2-4).
//!
//! The three stages are textually separate passes in spec.md because the
//! source keeps existence truth and edge state in *different* external
//! sorters/PQs that are each only single-pass mergeable with `E`. Here,
//! `E`'s current-edge-set is held as an in-memory `HashSet<Edge>` alongside
//! the dependency-chain PQ, so simulation, existence lookup, and commit
//! collapse into one forward pass over swaps in ascending `swap_id` — the
//! same sequence of decisions, since each only ever consults state already
//! committed by an earlier swap. This is the TFP/"naive sequential" pair the
//! source's three passes are provably equivalent to (spec.md §4.5: "Decides
//! each swap using only state visible to earlier swaps — equivalent to a
//! sequential algorithm that maintains E as a set").

use crate::em_es::dependency_chain::{Initial, Successors};
use crate::pq::PriorityQueueEM;
use crate::runtime::Runtime;
use crate::types::{Edge, SwapDescriptor, SwapId, SwapResult};
use std::collections::{HashMap, HashSet};

/// Outcome of the combined simulate/resolve/commit pass: the per-swap
/// results plus the final post-batch value of every edge id that had no
/// successor to forward to (these feed stage 5's apply pass).
pub struct CommitOutcome {
    pub results: Vec<SwapResult>,
    pub finals: HashMap<crate::types::EdgeId, Edge>,
}

/// Runs the combined stage 2-4 pass. `existing` is the full set of edges
/// currently in the stream (spec.md's "E" viewed as a set); it is mutated
/// in place to reflect every committed swap, in swap order.
pub fn run(
    runtime: &Runtime,
    swaps: &[SwapDescriptor],
    initial: &Initial,
    successors: &Successors,
    mut existing: HashSet<Edge>,
) -> crate::error::Result<CommitOutcome> {
    let mut pq: PriorityQueueEM<SwapId, (u8, Edge)> = PriorityQueueEM::new();
    let mut results = Vec::with_capacity(swaps.len());
    let mut finals = HashMap::new();

    for (i, swap) in swaps.iter().enumerate() {
        let swap_id = i as SwapId;
        let forwarded = pq.drain_min(swap_id)?;
        let src0 = resolve_source(initial, &forwarded, swap_id, 0)?;
        let src1 = resolve_source(initial, &forwarded, swap_id, 1)?;

        let targets = swap.targets(src0, src1);
        let loop_ = targets[0].is_loop() || targets[1].is_loop();
        let conflict = [
            !loop_ && existing.contains(&targets[0]) && targets[0] != src0 && targets[0] != src1,
            !loop_ && existing.contains(&targets[1]) && targets[1] != src0 && targets[1] != src1,
        ];
        let performed = !loop_ && !conflict[0] && !conflict[1];

        let (new0, new1) = if performed {
            existing.remove(&src0);
            existing.remove(&src1);
            existing.insert(targets[0]);
            existing.insert(targets[1]);
            (targets[0], targets[1])
        } else {
            (src0, src1)
        };

        forward_or_finalize(runtime, &mut pq, &mut finals, successors, swap, swap_id, 0, new0)?;
        forward_or_finalize(runtime, &mut pq, &mut finals, successors, swap, swap_id, 1, new1)?;

        results.push(SwapResult { performed, loop_, targets, conflict });
    }

    Ok(CommitOutcome { results, finals })
}

fn resolve_source(
    initial: &Initial,
    forwarded: &[(u8, Edge)],
    swap_id: SwapId,
    side: u8,
) -> crate::error::Result<Edge> {
    if let Some(e) = initial[swap_id as usize][side as usize] {
        return Ok(e);
    }
    forwarded
        .iter()
        .find(|(got_side, _)| *got_side == side)
        .map(|(_, edge)| *edge)
        .ok_or_else(|| {
            crate::error::Error::AssertionFailure(format!(
                "swap {swap_id} side {side} has neither an initial value nor a forwarded predecessor"
            ))
        })
}

#[allow(clippy::too_many_arguments)]
fn forward_or_finalize(
    runtime: &Runtime,
    pq: &mut PriorityQueueEM<SwapId, (u8, Edge)>,
    finals: &mut HashMap<crate::types::EdgeId, Edge>,
    successors: &Successors,
    swap: &SwapDescriptor,
    swap_id: SwapId,
    side: u8,
    value: Edge,
) -> crate::error::Result<()> {
    match successors[swap_id as usize][side as usize] {
        Some((succ_swap, succ_side)) => pq.push(runtime, succ_swap, (succ_side, value)),
        None => {
            let edge_id = if side == 0 { swap.e1 } else { swap.e2 };
            finals.insert(edge_id, value);
            Ok(())
        }
    }
}
