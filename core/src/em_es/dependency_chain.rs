//! Stage 1 of TFP: dependency chain construction (spec.md §4.5, stage 1).
//!
//! For each swap and each of its two edges, emit `(edge_id, swap_id, side)`.
//! Sorting by `(edge_id, swap_id)` groups every swap referencing the same
//! edge id into one run, in ascending swap order — the edge's *dependency
//! chain*. The earliest swap in a chain receives the edge's initial value
//! directly from `E`; every later swap in the chain instead receives it by
//! having the chain's previous swap forward its post-commit state through
//! [`crate::pq::PriorityQueueEM`], keyed by the later swap's id.

use crate::edge_stream::EdgeStream;
use crate::error::{Error, Result};
use crate::runtime::Runtime;
use crate::sorter::SortedRunBuilder;
use crate::types::{Edge, EdgeId, SwapDescriptor, SwapId};

/// Per-swap, per-side forwarding target: the `(successor_swap, successor_side)`
/// that should receive this swap's post-commit state for that side, if any
/// later swap in the batch references the same original edge id.
pub type Successors = Vec<[Option<(SwapId, u8)>; 2]>;

/// Per-swap, per-side initial edge value, populated for the earliest swap in
/// each edge id's dependency chain.
pub type Initial = Vec<[Option<Edge>; 2]>;

/// Runs stage 1 over `edges` (rewound fresh) and `swaps`.
pub fn run(runtime: &Runtime, edges: &mut EdgeStream, swaps: &[SwapDescriptor]) -> Result<(Initial, Successors)> {
    let mut builder = SortedRunBuilder::<(EdgeId, SwapId, u8)>::new(runtime.clone());
    for (swap_id, s) in swaps.iter().enumerate() {
        builder.push((s.e1, swap_id as SwapId, 0))?;
        builder.push((s.e2, swap_id as SwapId, 1))?;
    }
    let mut cursor = builder.finish()?;

    let mut initial: Initial = vec![[None, None]; swaps.len()];
    let mut successors: Successors = vec![[None, None]; swaps.len()];

    edges.rewind()?;
    let mut edge_id: EdgeId = 0;
    let mut current = edges.current();
    let mut pending = cursor.advance();

    while let Some((req_edge_id, _, _)) = pending {
        while edge_id < req_edge_id {
            edge_id += 1;
            current = edges.advance()?;
        }
        // Collect every request sharing `req_edge_id`; they are already in
        // ascending swap_id order within the run.
        let mut chain = Vec::new();
        while let Some((e, swap_id, side)) = pending {
            if e != req_edge_id {
                break;
            }
            chain.push((swap_id, side));
            pending = cursor.advance();
        }
        let edge_value = current.ok_or_else(|| {
            Error::AssertionFailure(format!(
                "swap batch references edge_id {req_edge_id} past the end of the edge stream"
            ))
        })?;
        if let Some(&(first_swap, first_side)) = chain.first() {
            initial[first_swap as usize][first_side as usize] = Some(edge_value);
        }
        for pair in chain.windows(2) {
            let (pred_swap, pred_side) = pair[0];
            let (succ_swap, succ_side) = pair[1];
            successors[pred_swap as usize][pred_side as usize] = Some((succ_swap, succ_side));
        }
    }

    Ok((initial, successors))
}
