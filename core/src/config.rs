//! Core invocation configuration (spec.md §6; SPEC_FULL.md §6 ambient
//! notes). Kept `serde`-derived so an external CLI/config-loading
//! collaborator can build one from TOML/JSON/argv without this crate
//! depending on `clap` or a TOML parser.

use serde::{Deserialize, Serialize};

use crate::runtime::MIN_MEMORY_BYTES;

/// How the initial graph is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputMethod {
    /// Havel-Hakimi realization of a sampled degree sequence.
    Hh,
    /// Configuration-model bootstrap plus rewiring.
    CmEs,
    /// Read a pre-built edge list from a binary input file.
    File,
    /// Read a file, then run CM-ES rewiring over it.
    FileThenCmEs,
}

/// How many swaps to run, expressed either directly or as a multiple of
/// `|E|`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NumSwaps {
    Fixed(u64),
    Factor(f64),
}

/// How large a single EM-ES run is, expressed either directly or as a
/// count of runs to spread `num_swaps` over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunSize {
    Fixed(u32),
    NumRuns(u32),
}

/// The single top-level configuration descriptor (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub num_nodes: u64,
    pub min_degree: u32,
    pub max_degree: u32,
    /// Power-law shape parameter; must be `<= -1`.
    pub gamma: f64,
    /// Must satisfy `scale_degree * min_degree >= 1`.
    pub scale_degree: f64,
    pub input_method: InputMethod,
    pub num_swaps: NumSwaps,
    pub run_size: RunSize,
    /// Must be `>= 4 * sorter-min + slack` ([`MIN_MEMORY_BYTES`]).
    pub internal_memory_bytes: usize,
    pub random_seed: u64,
    pub degree_seed: u64,
    /// Nonnegative real; extra fraction of `|E|` random legal swaps mixed
    /// into each CM rewiring round alongside the semi-loaded illegal-edge
    /// swaps (spec.md §4.7).
    pub cm_es_random_swap_fraction: f64,
    /// The retry threshold before CM rewiring falls back to a full
    /// illegal-edge sweep (design note §9: "the right threshold may be
    /// workload-dependent — leave it configurable").
    pub cm_rewiring_retry_limit: u32,
    pub threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            num_nodes: 1,
            min_degree: 1,
            max_degree: 1,
            gamma: -2.0,
            scale_degree: 1.0,
            input_method: InputMethod::Hh,
            num_swaps: NumSwaps::Factor(10.0),
            run_size: RunSize::NumRuns(1),
            internal_memory_bytes: MIN_MEMORY_BYTES,
            random_seed: 1,
            degree_seed: 2,
            cm_es_random_swap_fraction: 0.0,
            cm_rewiring_retry_limit: 5,
            threads: 0,
        }
    }
}

impl Config {
    /// Validates every constraint named in spec.md §6, returning the first
    /// violation found as a [`crate::error::Error::ConfigError`].
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error::ConfigError;

        if self.num_nodes == 0 {
            return Err(ConfigError("num_nodes must be positive".into()));
        }
        if self.gamma > -1.0 {
            return Err(ConfigError(format!("gamma must be <= -1, got {}", self.gamma)));
        }
        if self.scale_degree * f64::from(self.min_degree) < 1.0 {
            return Err(ConfigError(
                "scale_degree * min_degree must be >= 1".into(),
            ));
        }
        if self.min_degree > self.max_degree {
            return Err(ConfigError("min_degree must be <= max_degree".into()));
        }
        match self.num_swaps {
            NumSwaps::Factor(f) if f <= 0.0 => {
                return Err(ConfigError("factor_num_swaps must be positive".into()));
            }
            _ => {}
        }
        match self.run_size {
            RunSize::Fixed(r) if r == 0 || r as u64 > (1u64 << 31) - 1 => {
                return Err(ConfigError(
                    "run_size must be in [1, 2^31-1]".into(),
                ));
            }
            RunSize::NumRuns(n) if n == 0 => {
                return Err(ConfigError("num_runs must be positive".into()));
            }
            _ => {}
        }
        if self.internal_memory_bytes < MIN_MEMORY_BYTES {
            return Err(ConfigError(format!(
                "internal_memory_bytes must be >= {MIN_MEMORY_BYTES}"
            )));
        }
        if self.cm_es_random_swap_fraction < 0.0 {
            return Err(ConfigError(
                "cm_es_random_swap_fraction must be nonnegative".into(),
            ));
        }
        Ok(())
    }

    /// Resolves [`NumSwaps`] against an edge count.
    #[must_use]
    pub fn resolved_num_swaps(&self, edge_count: u64) -> u64 {
        match self.num_swaps {
            NumSwaps::Fixed(n) => n,
            NumSwaps::Factor(f) => (f * edge_count as f64).round() as u64,
        }
    }

    /// Resolves [`RunSize`] against a total swap count.
    #[must_use]
    pub fn resolved_run_size(&self, num_swaps: u64) -> u32 {
        match self.run_size {
            RunSize::Fixed(r) => r,
            RunSize::NumRuns(n) => {
                let n = n.max(1) as u64;
                num_swaps.div_ceil(n).min(u64::from(u32::MAX)) as u32
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_gamma_above_minus_one() {
        let mut c = Config::default();
        c.gamma = -0.5;
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_insufficient_memory_budget() {
        let mut c = Config::default();
        c.internal_memory_bytes = 10;
        assert!(c.validate().is_err());
    }

    #[test]
    fn resolves_num_swaps_from_factor() {
        let mut c = Config::default();
        c.num_swaps = NumSwaps::Factor(2.0);
        assert_eq!(c.resolved_num_swaps(100), 200);
    }

    #[test]
    fn resolves_run_size_from_num_runs() {
        let mut c = Config::default();
        c.run_size = RunSize::NumRuns(3);
        assert_eq!(c.resolved_run_size(10), 4);
    }
}
