//! The `Runtime` value threads memory budget, random seeds, temp-directory
//! policy, and thread count through every entry point, replacing the
//! process-wide mutable sorter/RNG configuration of the source system
//! (design note, spec.md §9: "Global mutable state").

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Shared execution context for one invocation of the generation or
/// randomization pipeline.
///
/// Cloning a `Runtime` is cheap (it is reference-counted); clones share the
/// same temp-directory policy and thread pool but each get their own RNG
/// state split off deterministically, so concurrent stages do not contend
/// on a single RNG lock.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<Inner>,
}

struct Inner {
    memory_budget: usize,
    temp_dir: PathBuf,
    threads: usize,
    swap_rng: Mutex<StdRng>,
    degree_rng: Mutex<StdRng>,
    pool: rayon::ThreadPool,
}

/// Lower bound enforced on `memory_budget`: four sorter minimums plus slack,
/// matching the configuration contract in spec.md §6.
pub const MIN_SORTER_BYTES: usize = 1 << 20;
pub const MIN_MEMORY_BYTES: usize = 4 * MIN_SORTER_BYTES + (1 << 16);

impl Runtime {
    /// Builds a runtime. `threads = 0` means "use all available cores".
    pub fn new(
        memory_budget: usize,
        random_seed: u64,
        degree_seed: u64,
        temp_dir: PathBuf,
        threads: usize,
    ) -> crate::error::Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| crate::error::Error::AssertionFailure(e.to_string()))?;
        Ok(Runtime {
            inner: Arc::new(Inner {
                memory_budget,
                temp_dir,
                threads: pool.current_num_threads(),
                swap_rng: Mutex::new(StdRng::seed_from_u64(random_seed)),
                degree_rng: Mutex::new(StdRng::seed_from_u64(degree_seed)),
                pool,
            }),
        })
    }

    /// A runtime suitable for small in-process tests: a generous in-memory
    /// budget, a fixed seed pair, and the system temp directory.
    #[must_use]
    pub fn for_testing(random_seed: u64) -> Self {
        Runtime::new(
            64 << 20,
            random_seed,
            random_seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1,
            std::env::temp_dir(),
            1,
        )
        .expect("in-process test runtime construction cannot fail")
    }

    #[must_use]
    pub fn memory_budget(&self) -> usize {
        self.inner.memory_budget
    }

    #[must_use]
    pub fn temp_dir(&self) -> &std::path::Path {
        &self.inner.temp_dir
    }

    #[must_use]
    pub fn threads(&self) -> usize {
        self.inner.threads
    }

    #[must_use]
    pub fn thread_pool(&self) -> &rayon::ThreadPool {
        &self.inner.pool
    }

    /// Draws from the swap/trade RNG stream under a short-lived lock.
    pub fn with_swap_rng<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut guard = self.inner.swap_rng.lock().expect("swap rng mutex poisoned");
        f(&mut guard)
    }

    /// Draws from the degree-sequence RNG stream under a short-lived lock.
    pub fn with_degree_rng<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut guard = self.inner.degree_rng.lock().expect("degree rng mutex poisoned");
        f(&mut guard)
    }

    /// Creates a fresh spill file rooted at the configured temp directory.
    pub fn spill_file(&self) -> crate::error::Result<tempfile::NamedTempFile> {
        Ok(tempfile::Builder::new()
            .prefix("em-run-")
            .tempfile_in(&self.inner.temp_dir)?)
    }
}
