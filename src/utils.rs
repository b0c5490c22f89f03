//! Common utilities used across the crate.
//!
//! The sequential/parallel switch that the loss kernel uses to decide
//! whether sample rows are processed on a rayon pool, and the dedicated pool
//! that backs an explicit thread count.

use rayon::prelude::*;

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// When `Parallel`, components may use `rayon` parallel iterators.
/// When `Sequential`, components must iterate on the calling thread.
///
/// Components don't manage thread pools; they run on whatever pool is
/// current (the global pool unless the caller installed one).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Parallelism {
    #[default]
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Map every item, preserving input order in the returned vector.
    #[inline]
    pub fn maybe_par_map<T, B, I, F>(self, iter: I, f: F) -> Vec<B>
    where
        T: Send,
        B: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> B + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().map(f).collect()
        } else {
            iter.into_iter().map(f).collect()
        }
    }

    /// For-each over a plain iterator, bridged onto rayon in parallel mode.
    ///
    /// Useful for iterators that don't implement `IntoParallelIterator`
    /// (like ndarray's `outer_iter_mut().zip(..)`). Items are visited in
    /// unspecified order when parallel.
    #[inline]
    pub fn maybe_par_bridge_for_each<T, I, F>(self, iter: I, f: F)
    where
        T: Send,
        I: Iterator<Item = T> + Send,
        F: Fn(T) + Sync + Send,
    {
        if self.is_parallel() {
            iter.par_bridge().for_each(f);
        } else {
            iter.for_each(f);
        }
    }
}

// =============================================================================
// Thread Pools
// =============================================================================

/// Build a dedicated pool of exactly `n_threads` workers.
///
/// Returns `None` when no dedicated pool is needed:
///
/// - 0 = auto (run on the current pool)
/// - 1 = sequential (run on the calling thread)
///
/// Work that should honor the count must run inside
/// [`ThreadPool::install`](rayon::ThreadPool::install).
pub fn build_thread_pool(
    n_threads: usize,
) -> Result<Option<rayon::ThreadPool>, rayon::ThreadPoolBuildError> {
    if n_threads <= 1 {
        return Ok(None);
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallelism_from_threads() {
        assert_eq!(Parallelism::from_threads(1), Parallelism::Sequential);
        assert_eq!(Parallelism::from_threads(4), Parallelism::Parallel);
    }

    #[test]
    fn maybe_par_map_preserves_order() {
        for parallelism in [Parallelism::Sequential, Parallelism::Parallel] {
            let out = parallelism.maybe_par_map(0..100usize, |i| i * 2);
            let expected: Vec<usize> = (0..100).map(|i| i * 2).collect();
            assert_eq!(out, expected);
        }
    }

    #[test]
    fn maybe_par_bridge_for_each_visits_all() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        for parallelism in [Parallelism::Sequential, Parallelism::Parallel] {
            let sum = AtomicUsize::new(0);
            parallelism.maybe_par_bridge_for_each(1..=10usize, |i| {
                sum.fetch_add(i, Ordering::Relaxed);
            });
            assert_eq!(sum.load(Ordering::Relaxed), 55);
        }
    }

    #[test]
    fn no_dedicated_pool_for_auto_or_single_thread() {
        assert!(build_thread_pool(0).unwrap().is_none());
        assert!(build_thread_pool(1).unwrap().is_none());
    }

    #[test]
    fn dedicated_pool_has_requested_size() {
        let pool = build_thread_pool(3).unwrap().unwrap();
        assert_eq!(pool.current_num_threads(), 3);
        assert_eq!(pool.install(rayon::current_num_threads), 3);
    }
}
