//! Configuration-model bootstrap and rewiring (spec.md §4.7).
//!
//! `generate` builds half-edges from a degree sequence and pairs them under
//! a random shuffle (a sort under a random key, the same pattern
//! [`crate::em_cb::trade`] uses for its exclusive-neighbor repartition);
//! the result may contain loops and parallel edges. `rewire` repeatedly
//! identifies those illegal edges and fixes them with semi-loaded EM-ES
//! swaps (spec.md §4.5 "Semi-loaded variant") until none remain or the
//! configured retry limit is reached.

use crate::edge_stream::EdgeStream;
use crate::em_es::{EmEs, SemiLoadedDescriptor};
use crate::error::Result;
use crate::runtime::Runtime;
use crate::swap_generator::SwapGenerator;
use crate::types::{Degree, Edge, EdgeId, NodeId};
use rand::Rng;

/// Builds a configuration-model edge stream from a degree sequence.
/// Self-loops and parallel edges are expected and permitted in the result;
/// callers that need a simple graph should follow up with [`rewire`].
pub fn generate(runtime: &Runtime, degrees: &[Degree]) -> Result<EdgeStream> {
    let mut half_edges: Vec<(u64, NodeId)> = Vec::new();
    for (id, &d) in degrees.iter().enumerate() {
        for _ in 0..d.max(0) {
            let key = runtime.with_degree_rng(|rng| rng.gen::<u64>());
            half_edges.push((key, id as NodeId));
        }
    }
    half_edges.sort_unstable_by_key(|&(key, _)| key);

    let mut raw: Vec<Edge> = Vec::with_capacity(half_edges.len() / 2);
    for pair in half_edges.chunks_exact(2) {
        raw.push(Edge::new(pair[0].1, pair[1].1));
    }
    raw.sort_unstable();
    EdgeStream::from_sorted(raw, true, true)
}

/// Outcome of a [`rewire`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewireOutcome {
    pub rounds_run: u32,
    pub remaining_illegal: u64,
}

/// Edge-stream positions that are loops, or duplicate the edge immediately
/// before them in sorted order (`edges` must already be sorted).
fn illegal_indices(edges: &[Edge]) -> Vec<EdgeId> {
    let mut out = Vec::new();
    for (i, e) in edges.iter().enumerate() {
        if e.is_loop() {
            out.push(i as EdgeId);
        } else if i > 0 && edges[i - 1] == *e {
            out.push(i as EdgeId);
        }
    }
    out
}

/// Repeatedly fixes loops and parallel edges with semi-loaded swaps against
/// uniformly random partners, optionally mixed with `cm_es_random_swap_fraction
/// * |E|` additional random legal swaps per round, until no illegal edges
/// remain or `cm_rewiring_retry_limit` rounds have run.
pub fn rewire(runtime: &Runtime, mut edges: EdgeStream, config: &crate::config::Config) -> Result<(EdgeStream, RewireOutcome)> {
    let mut rounds_run = 0;
    loop {
        let snapshot = edges.to_vec()?;
        let illegal = illegal_indices(&snapshot);
        if illegal.is_empty() || rounds_run >= config.cm_rewiring_retry_limit {
            return Ok((edges, RewireOutcome { rounds_run, remaining_illegal: illegal.len() as u64 }));
        }

        let n = snapshot.len() as EdgeId;
        let descriptors: Vec<SemiLoadedDescriptor> = illegal
            .iter()
            .map(|&idx| {
                let (value_idx, direction) = runtime.with_swap_rng(|rng| {
                    let mut other = rng.gen_range(0..n);
                    while other == idx {
                        other = rng.gen_range(0..n);
                    }
                    (other, rng.gen_bool(0.5))
                });
                SemiLoadedDescriptor { id_edge: idx, value_edge: snapshot[value_idx as usize], direction }
            })
            .collect();

        let (mut fixed, _results) = EmEs::run_semi_loaded(runtime, &mut edges, &descriptors, true, true)?;

        let extra = (config.cm_es_random_swap_fraction * fixed.size() as f64).round() as usize;
        if extra > 0 && fixed.size() > 1 {
            let generator = SwapGenerator::new(fixed.size() as EdgeId)?;
            let extra_swaps = runtime.with_swap_rng(|rng| generator.generate(extra, rng));
            let (rerouted, _) = EmEs::run(runtime, &mut fixed, &extra_swaps, true, true)?;
            fixed = rerouted;
        }

        edges = fixed;
        rounds_run += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn generated_stream_preserves_degree_sum() {
        let rt = Runtime::for_testing(1);
        let degrees = vec![3, 3, 3, 3, 3, 3];
        let mut stream = generate(&rt, &degrees).unwrap();
        let edges = stream.to_vec().unwrap();
        assert_eq!(edges.len(), degrees.iter().sum::<i32>() as usize / 2);
    }

    #[test]
    fn rewiring_eventually_clears_illegal_edges_or_hits_retry_limit() {
        let rt = Runtime::for_testing(7);
        let degrees = vec![4, 4, 4, 4, 4, 4, 4, 4];
        let stream = generate(&rt, &degrees).unwrap();
        let mut config = Config::default();
        config.cm_rewiring_retry_limit = 50;
        config.cm_es_random_swap_fraction = 0.0;
        let (mut rewired, outcome) = rewire(&rt, stream, &config).unwrap();
        let edges = rewired.to_vec().unwrap();
        if outcome.remaining_illegal == 0 {
            let illegal = illegal_indices(&edges);
            assert!(illegal.is_empty());
        }
    }

    #[test]
    fn illegal_indices_finds_loops_and_duplicates() {
        let edges = vec![Edge::new(0, 0), Edge::new(1, 2), Edge::new(1, 2), Edge::new(3, 4)];
        assert_eq!(illegal_indices(&edges), vec![0, 2]);
    }
}
