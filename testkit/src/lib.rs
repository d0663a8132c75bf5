//! Shared test fixtures and property-checking helpers for
//! `em-graph-randomize-core`'s own test suites and any downstream crate that
//! exercises it.

use em_graph_randomize_core::{Degree, Edge, EdgeStream, NodeId, Result};
use rand::Rng;

/// Builds a sorted, simple-graph [`EdgeStream`] from `(u, v)` pairs; panics
/// on malformed input since this is test-only plumbing.
#[must_use]
pub fn edge_stream_of(pairs: &[(NodeId, NodeId)]) -> EdgeStream {
    let mut edges: Vec<Edge> = pairs.iter().map(|&(u, v)| Edge::new(u, v)).collect();
    edges.sort_unstable();
    edges.dedup();
    EdgeStream::from_sorted(edges, false, false).expect("edge_stream_of: malformed fixture")
}

/// A regular degree sequence: `n` nodes each with degree `d`.
#[must_use]
pub fn regular_degree_sequence(n: usize, d: Degree) -> Vec<Degree> {
    vec![d; n]
}

/// A simple two-tier degree sequence: `hubs` nodes of degree `hub_degree`
/// followed by `leaves` nodes of degree `leaf_degree`, useful for exercising
/// block-splitting in the Havel-Hakimi generators.
#[must_use]
pub fn two_tier_degree_sequence(hubs: usize, hub_degree: Degree, leaves: usize, leaf_degree: Degree) -> Vec<Degree> {
    let mut degrees = vec![hub_degree; hubs];
    degrees.extend(std::iter::repeat(leaf_degree).take(leaves));
    degrees
}

/// Draws a power-law-shaped degree sequence via inverse-CDF sampling on
/// `[min_degree, max_degree]` with exponent `gamma` (`gamma <= -1`, the sign
/// convention [`em_graph_randomize_core::config::Config`] uses), then nudges
/// the total to even parity by incrementing the last entry if needed
/// (configuration-model and Havel-Hakimi both require an even degree sum).
#[must_use]
pub fn powerlaw_degree_sequence(n: usize, min_degree: Degree, max_degree: Degree, gamma: f64, rng: &mut impl Rng) -> Vec<Degree> {
    assert!(gamma <= -1.0, "gamma must be <= -1");
    let (lo, hi) = (f64::from(min_degree), f64::from(max_degree));
    let exponent = gamma + 1.0;
    let lo_pow = lo.powf(exponent);
    let hi_pow = hi.powf(exponent);
    let mut degrees: Vec<Degree> = (0..n)
        .map(|_| {
            let u: f64 = rng.gen_range(0.0..1.0);
            let x = (lo_pow + u * (hi_pow - lo_pow)).powf(1.0 / exponent);
            (x.round() as Degree).clamp(min_degree, max_degree)
        })
        .collect();
    if degrees.iter().map(|&d| d as i64).sum::<i64>() % 2 != 0 {
        if let Some(last) = degrees.last_mut() {
            if *last < max_degree {
                *last += 1;
            } else if *last > min_degree {
                *last -= 1;
            }
        }
    }
    degrees
}

/// Per-node degree of every edge in `edges`, assuming node ids are dense in
/// `0..num_nodes`. A loop counts twice against its own node, matching the
/// handshake convention used throughout `em_graph_randomize_core`.
#[must_use]
pub fn degree_sequence_of(edges: &[Edge], num_nodes: usize) -> Vec<u64> {
    let mut deg = vec![0u64; num_nodes];
    for e in edges {
        if e.is_loop() {
            deg[e.first as usize] += 2;
        } else {
            deg[e.first as usize] += 1;
            deg[e.second as usize] += 1;
        }
    }
    deg
}

/// True if `edges` is sorted ascending, loop-free, and duplicate-free.
#[must_use]
pub fn is_simple_sorted_graph(edges: &[Edge]) -> bool {
    edges.windows(2).all(|w| w[0] < w[1]) && edges.iter().all(|e| !e.is_loop())
}

/// Drains `stream` into a `Vec<Edge>`, panicking on I/O failure (test-only
/// convenience over [`EdgeStream::to_vec`]).
pub fn drain(stream: &mut EdgeStream) -> Vec<Edge> {
    stream.to_vec().expect("drain: edge stream I/O failed in test fixture")
}

/// Runs `f` and asserts it returns `Ok`, panicking with the error's
/// `Display` otherwise; saves call sites from `unwrap()`'s opaque panic
/// message when a `Result`'s error type matters for diagnosis.
pub fn expect_ok<T>(f: impl FnOnce() -> Result<T>) -> T {
    match f() {
        Ok(v) => v,
        Err(e) => panic!("expected Ok, got error: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn edge_stream_of_sorts_and_dedups() {
        let mut s = edge_stream_of(&[(1, 0), (0, 1), (2, 3)]);
        let out = drain(&mut s);
        assert_eq!(out, vec![Edge::new(0, 1), Edge::new(2, 3)]);
    }

    #[test]
    fn degree_sequence_of_counts_loops_twice() {
        let edges = vec![Edge::new(0, 0), Edge::new(0, 1)];
        assert_eq!(degree_sequence_of(&edges, 2), vec![3, 1]);
    }

    #[test]
    fn powerlaw_sequence_stays_in_bounds_and_even() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let degrees = powerlaw_degree_sequence(200, 2, 50, -2.5, &mut rng);
        assert!(degrees.iter().all(|&d| (2..=50).contains(&d)));
        assert_eq!(degrees.iter().map(|&d| d as i64).sum::<i64>() % 2, 0);
    }

    #[test]
    fn two_tier_sequence_has_expected_shape() {
        let degrees = two_tier_degree_sequence(2, 5, 3, 1);
        assert_eq!(degrees, vec![5, 5, 1, 1, 1]);
    }
}
