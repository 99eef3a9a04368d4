//! Rayon thread pool configuration for candidate evaluation.
//!
//! Use [WorkerPool::install] to run the parallel Monte Carlo stage with a
//! fixed number of threads (benchmarks, reproducible timing comparisons), or
//! rely on Rayon's default (all CPU cores). Determinism does not depend on
//! the worker count: every candidate owns its seeded generator, so results
//! are identical at any thread count.

use rayon::ThreadPoolBuilder;

/// Configures how many worker threads evaluate candidates concurrently.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    /// Number of worker threads. If 0, use Rayon default (num_cpus).
    pub workers: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self {
            workers: 0, // Rayon default
        }
    }
}

impl WorkerPool {
    /// Use all available CPU cores (Rayon default).
    pub fn default_workers() -> Self {
        Self::default()
    }

    /// Use exactly `n` worker threads.
    pub fn with_workers(n: usize) -> Self {
        Self { workers: n }
    }

    /// Run a closure on a thread pool with this worker count. If
    /// [workers](WorkerPool::workers) is 0, uses the global Rayon pool (all
    /// cores). Otherwise builds a temporary pool with that many threads.
    pub fn install<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        if self.workers == 0 {
            f()
        } else {
            let pool = ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()
                .expect("Rayon thread pool");
            pool.install(f)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_runs_the_closure_on_any_worker_count() {
        assert_eq!(WorkerPool::default_workers().install(|| 41 + 1), 42);
        assert_eq!(WorkerPool::with_workers(2).install(|| 41 + 1), 42);
    }
}
