use std::cmp::Ordering;

use rayon::prelude::*;
use thiserror::Error;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),

    /// The chunk size of a chunked operation must be valid.
    #[error("chunk size must be > 0, got {0}")]
    InvalidChunkSize(usize),
}

/// Controls how the per-splat work of a load is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Use the global Rayon thread pool to process every splat in parallel.
    #[default]
    ParallelElements,

    /// Run sequentially on the current thread.
    ///
    /// Useful for tiny scenes, debugging, or when the caller already runs
    /// several loads in parallel.
    Serial,

    /// Run on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// A helper called directly with this strategy creates a new thread pool on every call.
    /// Wrap a sequence of calls in [`ExecutionStrategy::install`] to build it once.
    Fixed(usize),
}

fn build_pool(num_threads: usize) -> Result<rayon::ThreadPool, ParallelError> {
    if num_threads == 0 {
        return Err(ParallelError::InvalidThreadCount(num_threads));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| ParallelError::BuildError(e.to_string()))
}

impl ExecutionStrategy {
    /// Run a whole pipeline of helper calls on one thread pool.
    ///
    /// `op` receives the strategy its helper calls should use. For `Fixed(n)` the pool is
    /// built once and `op` runs inside it with [`ExecutionStrategy::ParallelElements`], so the
    /// helpers share that pool. The other strategies are handed over unchanged.
    pub fn install<R, F>(self, op: F) -> Result<R, ParallelError>
    where
        R: Send,
        F: FnOnce(ExecutionStrategy) -> R + Send,
    {
        match self {
            ExecutionStrategy::Fixed(n) => {
                let pool = build_pool(n)?;
                Ok(pool.install(|| op(ExecutionStrategy::ParallelElements)))
            }
            strategy => Ok(op(strategy)),
        }
    }

    // Runs `op` inline, or on the global or a dedicated pool when it receives `true`.
    fn dispatch<R, F>(self, op: F) -> Result<R, ParallelError>
    where
        R: Send,
        F: FnOnce(bool) -> R + Send,
    {
        match self {
            ExecutionStrategy::Serial => Ok(op(false)),
            ExecutionStrategy::ParallelElements => Ok(op(true)),
            ExecutionStrategy::Fixed(n) => Ok(build_pool(n)?.install(|| op(true))),
        }
    }
}

/// Map every element of `src` with `f` and collect the results in order.
pub fn map_collect<T, U, F>(
    src: &[T],
    strategy: ExecutionStrategy,
    f: F,
) -> Result<Vec<U>, ParallelError>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    strategy.dispatch(|parallel| match parallel {
        true => src.par_iter().map(&f).collect(),
        false => src.iter().map(&f).collect(),
    })
}

/// Map every exact chunk of `chunk_size` elements with `f` and collect the results in order.
///
/// Trailing elements that do not fill a whole chunk are ignored; callers validate alignment.
pub fn map_chunks_collect<T, U, F>(
    src: &[T],
    chunk_size: usize,
    strategy: ExecutionStrategy,
    f: F,
) -> Result<Vec<U>, ParallelError>
where
    T: Sync,
    U: Send,
    F: Fn(&[T]) -> U + Sync + Send,
{
    if chunk_size == 0 {
        return Err(ParallelError::InvalidChunkSize(chunk_size));
    }
    strategy.dispatch(|parallel| match parallel {
        true => src.par_chunks_exact(chunk_size).map(&f).collect(),
        false => src.chunks_exact(chunk_size).map(&f).collect(),
    })
}

/// Apply `f` to every element of `dst` in place.
pub fn for_each_mut<T, F>(
    dst: &mut [T],
    strategy: ExecutionStrategy,
    f: F,
) -> Result<(), ParallelError>
where
    T: Send,
    F: Fn(&mut T) + Sync + Send,
{
    strategy.dispatch(|parallel| match parallel {
        true => dst.par_iter_mut().for_each(&f),
        false => dst.iter_mut().for_each(&f),
    })
}

/// Map every element of `src` and fold the results with the associative `reduce`.
pub fn map_reduce<T, U, M, R>(
    src: &[T],
    strategy: ExecutionStrategy,
    identity: U,
    map: M,
    reduce: R,
) -> Result<U, ParallelError>
where
    T: Sync,
    U: Copy + Send + Sync,
    M: Fn(&T) -> U + Sync + Send,
    R: Fn(U, U) -> U + Sync + Send,
{
    strategy.dispatch(|parallel| match parallel {
        true => src.par_iter().map(&map).reduce(|| identity, &reduce),
        false => src.iter().map(&map).fold(identity, &reduce),
    })
}

/// Stable sort of `dst` with the comparator `compare`.
///
/// Both the serial and the parallel path keep equal elements in their relative order.
pub fn stable_sort_by<T, F>(
    dst: &mut [T],
    strategy: ExecutionStrategy,
    compare: F,
) -> Result<(), ParallelError>
where
    T: Send,
    F: Fn(&T, &T) -> Ordering + Sync + Send,
{
    strategy.dispatch(|parallel| match parallel {
        true => dst.par_sort_by(&compare),
        false => dst.sort_by(&compare),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_collect_serial() {
        let src = vec![1, 2, 3, 4];
        let dst = map_collect(&src, ExecutionStrategy::Serial, |s| *s * 2).unwrap();
        assert_eq!(dst, vec![2, 4, 6, 8]);
    }

    #[test]
    fn test_map_collect_parallel_elements() {
        let src = (0..1000).collect::<Vec<i64>>();
        let dst = map_collect(&src, ExecutionStrategy::ParallelElements, |s| *s * 2).unwrap();
        assert_eq!(dst, (0..1000).map(|s| s * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_map_collect_fixed_success() {
        let src = vec![1, 2, 3, 4];
        let dst = map_collect(&src, ExecutionStrategy::Fixed(2), |s| *s * 2).unwrap();
        assert_eq!(dst, vec![2, 4, 6, 8]);
    }

    #[test]
    fn test_map_collect_fixed_error() {
        let src = vec![1];
        let res = map_collect(&src, ExecutionStrategy::Fixed(0), |s| *s);
        assert_eq!(res, Err(ParallelError::InvalidThreadCount(0)));
    }

    #[test]
    fn test_map_chunks_collect() {
        let src = vec![1u8, 2, 3, 4, 5, 6, 7];
        let sums = map_chunks_collect(&src, 2, ExecutionStrategy::ParallelElements, |c| {
            c.iter().map(|v| *v as u32).sum::<u32>()
        })
        .unwrap();
        assert_eq!(sums, vec![3, 7, 11]);

        let res = map_chunks_collect(&src, 0, ExecutionStrategy::Serial, |c| c.len());
        assert_eq!(res, Err(ParallelError::InvalidChunkSize(0)));
    }

    #[test]
    fn test_for_each_mut_and_reduce() {
        let mut dst = vec![1.0f64, 2.0, 3.0];
        for_each_mut(&mut dst, ExecutionStrategy::Fixed(2), |v| *v += 1.0).unwrap();
        assert_eq!(dst, vec![2.0, 3.0, 4.0]);

        let sum = map_reduce(&dst, ExecutionStrategy::ParallelElements, 0.0, |v| *v, |a, b| a + b)
            .unwrap();
        assert_eq!(sum, 9.0);
    }

    #[test]
    fn test_stable_sort_keeps_ties_in_order() {
        let mut items = vec![(1, 'a'), (0, 'b'), (1, 'c'), (0, 'd')];
        stable_sort_by(&mut items, ExecutionStrategy::ParallelElements, |a, b| {
            a.0.cmp(&b.0)
        })
        .unwrap();
        assert_eq!(items, vec![(0, 'b'), (0, 'd'), (1, 'a'), (1, 'c')]);
    }

    #[test]
    fn test_install_shares_one_pool() -> Result<(), ParallelError> {
        let (threads, strategy) =
            ExecutionStrategy::Fixed(3).install(|s| (rayon::current_num_threads(), s))?;
        assert_eq!(threads, 3);
        assert_eq!(strategy, ExecutionStrategy::ParallelElements);

        // helpers called with the handed strategy run on the installed pool
        let src = vec![0u8; 64];
        let seen = ExecutionStrategy::Fixed(3)
            .install(|s| map_collect(&src, s, |_| rayon::current_num_threads()))??;
        assert!(seen.iter().all(|n| *n == 3));

        let strategy = ExecutionStrategy::Serial.install(|s| s)?;
        assert_eq!(strategy, ExecutionStrategy::Serial);

        assert_eq!(
            ExecutionStrategy::Fixed(0).install(|s| s),
            Err(ParallelError::InvalidThreadCount(0))
        );
        Ok(())
    }
}
