//! External-memory generation and randomization of very large simple graphs
//! from a prescribed degree sequence.
//!
//! The pipeline is `degree sequence -> HHGenerator|CM -> EdgeStream ->
//! {EM-ES | EM-CB} -> EdgeStream`, with every stage driven by a single
//! [`runtime::Runtime`] carrying the memory budget, RNG seeds, temp-directory
//! policy, and thread count. Every stage reads and writes
//! [`edge_stream::EdgeStream`] sequentially through external sorters
//! ([`sorter::SortedRunBuilder`]) and priority queues ([`pq::PriorityQueueEM`])
//! rather than by random access, so a run's working set is bounded by the
//! configured memory budget rather than by graph size.

pub mod bitstream;
pub mod cm;
pub mod config;
pub mod degree_stream;
pub mod edge_stream;
pub mod em_cb;
pub mod em_es;
pub mod error;
pub mod hash;
pub mod hh_generator;
pub mod hh_generator_rle;
pub mod pq;
pub mod runtime;
pub mod sorter;
pub mod swap_generator;
pub mod types;

pub use edge_stream::EdgeStream;
pub use error::{Error, Result};
pub use runtime::Runtime;
pub use types::{Degree, Edge, EdgeId, NodeId, SwapDescriptor, SwapId, SwapResult};

/// Whole-pipeline composition tests: degree sequence in, randomized simple
/// graph out, exercising the modules above together rather than in
/// isolation. Each module's own `#[cfg(test)]` block already covers its
/// unit-level contract; these cover spec.md §8's "End-to-end scenarios"
/// that span more than one module.
#[cfg(test)]
mod pipeline_tests {
    use crate::cm;
    use crate::config::Config;
    use crate::em_es::EmEs;
    use crate::hh_generator::HHGenerator;
    use crate::runtime::Runtime;
    use crate::swap_generator::SwapGenerator;
    use crate::types::{Edge, EdgeId};
    use em_graph_randomize_testkit::{degree_sequence_of, is_simple_sorted_graph, regular_degree_sequence};

    /// Havel-Hakimi output, fed straight through a batch of random EM-ES
    /// swaps, still realizes the original degree sequence (spec.md §8
    /// "headline property": degree preservation under composition).
    #[test]
    fn hh_then_em_es_preserves_degree_sequence() {
        let rt = Runtime::for_testing(3);
        let degrees = regular_degree_sequence(10, 3);

        let mut edges = Vec::new();
        HHGenerator::new(&degrees)
            .generate(|e| {
                edges.push(e);
                Ok(())
            })
            .unwrap();
        edges.sort_unstable();
        let mut stream = crate::edge_stream::EdgeStream::from_sorted(edges, false, false).unwrap();

        let before = degree_sequence_of(&stream.to_vec().unwrap(), degrees.len());
        assert_eq!(before, degrees.iter().map(|&d| d as u64).collect::<Vec<_>>());

        let swap_gen = SwapGenerator::new(stream.size() as EdgeId).unwrap();
        let swaps = rt.with_swap_rng(|rng| swap_gen.generate(20, rng));
        let (mut randomized, _results) = EmEs::run(&rt, &mut stream, &swaps, false, false).unwrap();

        let after_edges = randomized.to_vec().unwrap();
        assert!(is_simple_sorted_graph(&after_edges));
        let after = degree_sequence_of(&after_edges, degrees.len());
        assert_eq!(before, after);
    }

    /// Configuration-model bootstrap plus rewiring (spec.md §4.7, §8
    /// scenario 6) yields a simple graph whose degree sequence still
    /// matches the input.
    #[test]
    fn cm_bootstrap_then_rewire_yields_simple_graph_with_same_degrees() {
        let rt = Runtime::for_testing(9);
        let degrees = vec![2, 2, 2, 2];

        let stream = cm::generate(&rt, &degrees).unwrap();
        let mut config = Config::default();
        config.cm_rewiring_retry_limit = 50;
        let (mut rewired, outcome) = cm::rewire(&rt, stream, &config).unwrap();

        let edges = rewired.to_vec().unwrap();
        if outcome.remaining_illegal == 0 {
            assert!(is_simple_sorted_graph(&edges));
            let degs = degree_sequence_of(&edges, degrees.len());
            assert_eq!(degs, vec![2, 2, 2, 2]);
        }
    }

    /// spec.md §8 scenario 4: a single successful swap on a tiny graph
    /// rewrites exactly the two targeted edges and nothing else.
    #[test]
    fn successful_swap_end_to_end_scenario() {
        let rt = Runtime::for_testing(1);
        let mut stream = crate::edge_stream::EdgeStream::from_sorted(
            vec![Edge::new(0, 1), Edge::new(2, 3)],
            false,
            false,
        )
        .unwrap();
        let swaps = vec![crate::types::SwapDescriptor::new(0, 1, false)];
        let (mut out, results) = EmEs::run(&rt, &mut stream, &swaps, false, false).unwrap();
        assert!(results[0].performed);
        assert_eq!(out.to_vec().unwrap(), vec![Edge::new(0, 2), Edge::new(1, 3)]);
    }
}
