//! Stage 5 of TFP: apply final edge updates back into a sorted `EdgeStream`
//! (spec.md §4.5, stage 5).
//!
//! Every edge id ends up with a final value: either the value recorded in
//! `finals` (because some swap in the batch committed a change that had no
//! further successor to forward to) or its original value, unchanged. A
//! swap can change an edge's *value*, so the output is re-sorted by edge
//! value rather than replayed in original edge-id order.

use crate::edge_stream::EdgeStream;
use crate::error::Result;
use crate::runtime::Runtime;
use crate::sorter::SortedRunBuilder;
use crate::types::{Edge, EdgeId};
use std::collections::HashMap;

pub fn run(
    runtime: &Runtime,
    edges: &mut EdgeStream,
    finals: &HashMap<EdgeId, Edge>,
    allow_loops: bool,
    allow_multi: bool,
) -> Result<EdgeStream> {
    let mut builder = SortedRunBuilder::<Edge>::new(runtime.clone());
    edges.rewind()?;
    let mut edge_id: EdgeId = 0;
    if let Some(mut e) = edges.current() {
        loop {
            let value = finals.get(&edge_id).copied().unwrap_or(e);
            builder.push(value)?;
            edge_id += 1;
            match edges.advance()? {
                Some(next) => e = next,
                None => break,
            }
        }
    }
    let mut cursor = builder.finish()?;
    let mut out = EdgeStream::with_runtime(runtime.clone(), allow_loops, allow_multi);
    while let Some(e) = cursor.advance() {
        out.push(e)?;
    }
    Ok(out)
}
