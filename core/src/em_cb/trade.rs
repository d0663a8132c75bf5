//! The Curveball trade operation (spec.md §4.6, "Trade operation").
//!
//! Given two vertices' locally sorted neighborhoods, splits off the shared
//! neighbors, randomly repartitions the rest, and reports which neighbor
//! moved to which side so the caller can update third-party adjacency
//! (spec.md's "Disperse" step).

use crate::types::NodeId;
use rand::seq::SliceRandom;
use rand::Rng;

/// Outcome of trading `u` against `v`.
pub struct TradeOutcome {
    pub new_u: Vec<NodeId>,
    pub new_v: Vec<NodeId>,
    /// Neighbors that ended up with `u` that were previously with `v` only.
    pub moved_to_u: Vec<NodeId>,
    /// Neighbors that ended up with `v` that were previously with `u` only.
    pub moved_to_v: Vec<NodeId>,
}

/// Trades `u` and `v`'s neighborhoods (both sorted, excluding `u`/`v`
/// themselves). `had_edge` is whether `{u, v}` was an edge before the trade;
/// if so it is preserved in both output neighborhoods.
pub fn trade(u: NodeId, v: NodeId, n_u: &[NodeId], n_v: &[NodeId], had_edge: bool, rng: &mut impl Rng) -> TradeOutcome {
    let a_u: Vec<NodeId> = n_u.iter().copied().filter(|&w| w != v).collect();
    let a_v: Vec<NodeId> = n_v.iter().copied().filter(|&w| w != u).collect();

    let (mut common, mut excl) = (Vec::new(), Vec::new());
    let (mut i, mut j) = (0, 0);
    while i < a_u.len() && j < a_v.len() {
        match a_u[i].cmp(&a_v[j]) {
            std::cmp::Ordering::Equal => {
                common.push(a_u[i]);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                excl.push(a_u[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                excl.push(a_v[j]);
                j += 1;
            }
        }
    }
    excl.extend_from_slice(&a_u[i..]);
    excl.extend_from_slice(&a_v[j..]);

    excl.shuffle(rng);
    let u_exclusive_count = a_u.len().saturating_sub(common.len());
    let (u_exclusive, v_exclusive) = excl.split_at(u_exclusive_count.min(excl.len()));

    let moved_to_u: Vec<NodeId> = u_exclusive.iter().copied().filter(|w| a_v.contains(w)).collect();
    let moved_to_v: Vec<NodeId> = v_exclusive.iter().copied().filter(|w| a_u.contains(w)).collect();

    let mut new_u = common.clone();
    new_u.extend_from_slice(u_exclusive);
    if had_edge {
        new_u.push(v);
    }
    new_u.sort_unstable();

    let mut new_v = common;
    new_v.extend_from_slice(v_exclusive);
    if had_edge {
        new_v.push(u);
    }
    new_v.sort_unstable();

    TradeOutcome { new_u, new_v, moved_to_u, moved_to_v }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn preserves_degree_sum() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let n_u = vec![2, 3, 5];
        let n_v = vec![3, 4, 6];
        let out = trade(0, 1, &n_u, &n_v, false, &mut rng);
        assert_eq!(out.new_u.len(), n_u.len());
        assert_eq!(out.new_v.len(), n_v.len());
    }

    #[test]
    fn preserves_shared_edge_when_present() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(2);
        let n_u = vec![1, 3];
        let n_v = vec![0, 2];
        let out = trade(0, 1, &n_u, &n_v, true, &mut rng);
        assert!(out.new_u.contains(&1));
        assert!(out.new_v.contains(&0));
    }

    #[test]
    fn common_neighbors_stay_common() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let n_u = vec![5, 9];
        let n_v = vec![5, 7];
        let out = trade(0, 1, &n_u, &n_v, false, &mut rng);
        assert!(out.new_u.contains(&5));
        assert!(out.new_v.contains(&5));
    }
}
