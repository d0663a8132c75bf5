//! The EM-CB round hash: `h(x) = (a*x + b) mod p` for a prime `p` larger
//! than the node count, with a reserved identity hash for the final round
//! (spec.md §3, §4.6).

use crate::types::NodeId;

/// An affine hash over node ids modulo a prime, or the identity hash used
/// for the final Curveball round.
#[derive(Debug, Clone, Copy)]
pub enum RoundHash {
    Affine { a: u64, b: u64, p: u64 },
    Identity,
}

impl RoundHash {
    /// Builds a fresh random affine hash with modulus `p`, the smallest
    /// prime strictly greater than `num_nodes`. `a` is drawn from `[1, p)`
    /// (never 0, so the hash is invertible) and `b` from `[0, p)`.
    pub fn random(num_nodes: u64, rng: &mut impl rand::Rng) -> Self {
        let p = smallest_prime_above(num_nodes);
        let a = rng.gen_range(1..p);
        let b = rng.gen_range(0..p);
        RoundHash::Affine { a, b, p }
    }

    #[must_use]
    pub fn identity() -> Self {
        RoundHash::Identity
    }

    #[must_use]
    pub fn apply(&self, x: NodeId) -> u64 {
        match self {
            RoundHash::Identity => x as u64,
            RoundHash::Affine { a, b, p } => {
                let x = x as u64 % p;
                (a.wrapping_mul(x).wrapping_add(*b)) % p
            }
        }
    }

    /// Inverts a hashed value back to the original node id, via the modular
    /// inverse of `a` (spec.md §3: "supports inversion via the modular
    /// inverse of a"). Only meaningful for [`RoundHash::Affine`]; for
    /// [`RoundHash::Identity`] the hashed value *is* the node id.
    #[must_use]
    pub fn invert(&self, y: u64) -> NodeId {
        match self {
            RoundHash::Identity => y as NodeId,
            RoundHash::Affine { a, b, p } => {
                let a_inv = mod_inverse(*a, *p);
                let diff = (y + p - (b % p)) % p;
                ((a_inv.wrapping_mul(diff)) % p) as NodeId
            }
        }
    }

    /// The modulus; hashed values of this round lie in `[0, p)` (or
    /// `[0, node_count)` for the identity hash, by convention of the caller).
    #[must_use]
    pub fn modulus(&self) -> u64 {
        match self {
            RoundHash::Identity => u64::MAX,
            RoundHash::Affine { p, .. } => *p,
        }
    }
}

fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Smallest prime strictly greater than `n`.
#[must_use]
pub fn smallest_prime_above(n: u64) -> u64 {
    let mut candidate = n.max(1) + 1;
    while !is_prime(candidate) {
        candidate += 1;
    }
    candidate
}

/// Extended-Euclid modular inverse of `a` modulo prime `p`. `a` must be
/// nonzero mod `p`.
#[must_use]
pub fn mod_inverse(a: u64, p: u64) -> u64 {
    let (mut old_r, mut r) = (a as i128, p as i128);
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let q = old_r / r;
        let (new_r, new_s) = (old_r - q * r, old_s - q * s);
        old_r = r;
        r = new_r;
        old_s = s;
        s = new_s;
    }
    let p_i = p as i128;
    (((old_s % p_i) + p_i) % p_i) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn smallest_prime_above_basic_values() {
        assert_eq!(smallest_prime_above(1), 2);
        assert_eq!(smallest_prime_above(2), 3);
        assert_eq!(smallest_prime_above(10), 11);
        assert_eq!(smallest_prime_above(11), 13);
    }

    #[test]
    fn affine_hash_round_trips_through_invert() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let h = RoundHash::random(100, &mut rng);
        for x in 0..100 {
            let y = h.apply(x);
            assert_eq!(h.invert(y), x);
        }
    }

    #[test]
    fn identity_hash_is_its_own_inverse() {
        let h = RoundHash::identity();
        for x in 0..50 {
            assert_eq!(h.invert(h.apply(x)), x);
        }
    }
}
