//! Module providing parallel processing functionality
//!
//! Kernels run on a shared rayon pool only when the caller passes
//! `parallel = true`, the global configuration enables it, and the input is
//! at least `parallel_min_len` long. Results match the serial path exactly.

use lazy_static::lazy_static;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::global_config;

lazy_static! {
    static ref POOL: Option<ThreadPool> = {
        let threads = global_config().threading.worker_threads;
        match ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("colrs-worker-{}", i))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(err) => {
                log::warn!("failed to build worker pool, running serially: {}", err);
                None
            }
        }
    };
}

/// Whether a kernel over `len` items asked to run in parallel should do so
pub fn should_parallelize(parallel: bool, len: usize) -> bool {
    if !parallel {
        return false;
    }
    let config = global_config();
    config.threading.parallel_enabled && len >= config.threading.parallel_min_len
}

/// Number of threads in the worker pool
pub fn current_num_threads() -> usize {
    POOL.as_ref()
        .map(|p| p.current_num_threads())
        .unwrap_or(1)
}

/// Map `f` over `0..len`, in parallel when [`should_parallelize`] allows
pub fn map_range<R, F>(len: usize, parallel: bool, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(usize) -> R + Send + Sync,
{
    match POOL.as_ref() {
        Some(pool) if should_parallelize(parallel, len) => {
            pool.install(|| (0..len).into_par_iter().map(&f).collect())
        }
        _ => (0..len).map(f).collect(),
    }
}

/// Map `f` over a slice, in parallel when [`should_parallelize`] allows
pub fn map_slice<T, R, F>(items: &[T], parallel: bool, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Send + Sync,
{
    match POOL.as_ref() {
        Some(pool) if should_parallelize(parallel, items.len()) => {
            pool.install(|| items.par_iter().map(&f).collect())
        }
        _ => items.iter().map(f).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_matches_serial() {
        let serial = map_range(5000, false, |i| i * 2);
        let parallel = map_range(5000, true, |i| i * 2);
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_short_input_stays_serial() {
        assert!(!should_parallelize(true, 1));
        assert!(!should_parallelize(false, 1_000_000));
    }
}
