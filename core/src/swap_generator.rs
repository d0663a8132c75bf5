//! `SwapGenerator`: emits random `(e_i, e_j, dir)` swap requests over a
//! fixed edge-id domain (spec.md §4.4).

use crate::error::{Error, Result};
use crate::types::{EdgeId, SwapDescriptor};
use rand::Rng;

/// Draws `k` random swaps over edge ids `[0, m)`.
pub struct SwapGenerator {
    m: EdgeId,
}

impl SwapGenerator {
    /// Fails with [`Error::ConfigError`] if `m <= 1` (spec.md §4.4: "Fails
    /// construction if m <= 1").
    pub fn new(m: EdgeId) -> Result<Self> {
        if m <= 1 {
            return Err(Error::ConfigError(format!(
                "SwapGenerator requires at least 2 edges, got {m}"
            )));
        }
        Ok(SwapGenerator { m })
    }

    /// Draws one random swap: two distinct uniform edge indices in `[0, m)`
    /// plus a uniform direction bit.
    pub fn next_swap(&self, rng: &mut impl Rng) -> SwapDescriptor {
        let a = rng.gen_range(0..self.m);
        let mut b = rng.gen_range(0..self.m);
        while b == a {
            b = rng.gen_range(0..self.m);
        }
        SwapDescriptor::new(a, b, rng.gen_bool(0.5))
    }

    /// Draws `k` random swaps.
    pub fn generate(&self, k: usize, rng: &mut impl Rng) -> Vec<SwapDescriptor> {
        (0..k).map(|_| self.next_swap(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn rejects_too_small_domain() {
        assert!(SwapGenerator::new(0).is_err());
        assert!(SwapGenerator::new(1).is_err());
        assert!(SwapGenerator::new(2).is_ok());
    }

    #[test]
    fn generated_swaps_reference_distinct_edges_in_range() {
        let gen = SwapGenerator::new(10).unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for s in gen.generate(200, &mut rng) {
            assert!(s.e1 < s.e2);
            assert!(s.e2 < 10);
        }
    }
}
