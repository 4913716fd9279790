use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use satlens_image::{Image, ImageError};

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),

    /// The row length must be valid.
    #[error("row length must be > 0")]
    InvalidRowLength,
}

impl From<ParallelError> for ImageError {
    fn from(err: ParallelError) -> Self {
        ImageError::ExecutionError(err.to_string())
    }
}

/// Controls how row-wise operations are executed.
///
/// Every strategy produces bit-identical results: each output sample is
/// accumulated in the same order regardless of how rows are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// Use the global Rayon thread pool to process rows in parallel.
    #[default]
    ParallelRows,

    /// Run sequentially on the current thread.
    ///
    /// Useful for small images, debugging, or as the reference the parallel
    /// strategies are checked against.
    Serial,

    /// Run on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call, which has significant overhead.
    Fixed(usize),
}

impl ExecutionStrategy {
    /// Check that the strategy can be executed.
    pub fn validate(&self) -> Result<(), ParallelError> {
        match self {
            ExecutionStrategy::Fixed(0) => Err(ParallelError::InvalidThreadCount(0)),
            _ => Ok(()),
        }
    }
}

/// Apply a function to each row of a buffer following the given strategy.
///
/// The closure receives the row index and the mutable row slice of `row_len`
/// elements.
pub fn for_each_row<T, F>(
    strategy: ExecutionStrategy,
    data: &mut [T],
    row_len: usize,
    op: F,
) -> Result<(), ParallelError>
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if row_len == 0 {
        return Err(ParallelError::InvalidRowLength);
    }

    match strategy {
        ExecutionStrategy::Serial => {
            data.chunks_exact_mut(row_len)
                .enumerate()
                .for_each(|(r, row)| op(r, row));
        }
        ExecutionStrategy::ParallelRows => {
            data.par_chunks_exact_mut(row_len)
                .enumerate()
                .for_each(|(r, row)| op(r, row));
        }
        ExecutionStrategy::Fixed(_) => {
            install(strategy, || {
                data.par_chunks_exact_mut(row_len)
                    .enumerate()
                    .for_each(|(r, row)| op(r, row));
            })?;
        }
    }

    Ok(())
}

/// Run `op` in the thread pool selected by the strategy.
///
/// `Fixed(n)` installs a local pool of `n` threads; the other strategies run
/// `op` on the calling thread, where rayon uses its global pool.
pub fn install<R, F>(strategy: ExecutionStrategy, op: F) -> Result<R, ParallelError>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    match strategy {
        ExecutionStrategy::Fixed(n) => {
            if n == 0 {
                return Err(ParallelError::InvalidThreadCount(n));
            }
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| ParallelError::BuildError(e.to_string()))?;
            Ok(pool.install(op))
        }
        _ => Ok(op()),
    }
}

/// Apply a function to each pixel of `src` and the matching pixel of `dst`.
///
/// Rows are scheduled following the strategy. The images must have the same size.
pub fn par_iter_rows<T1, const C1: usize, T2, const C2: usize>(
    src: &Image<T1, C1>,
    dst: &mut Image<T2, C2>,
    strategy: ExecutionStrategy,
    f: impl Fn(&[T1], &mut [T2]) + Send + Sync,
) -> Result<(), ParallelError>
where
    T1: Sync,
    T2: Send,
{
    let src_row_len = C1 * src.cols();
    let dst_row_len = C2 * dst.cols();
    let src = src.as_slice();

    for_each_row(strategy, dst.as_slice_mut(), dst_row_len, |r, dst_row| {
        src[r * src_row_len..(r + 1) * src_row_len]
            .chunks_exact(C1)
            .zip(dst_row.chunks_exact_mut(C2))
            .for_each(|(src_pixel, dst_pixel)| f(src_pixel, dst_pixel));
    })
}

/// Apply a function to each sample of `src` and the matching sample of `dst`.
///
/// Rows are scheduled following the strategy. The images must have the same size.
pub fn par_iter_rows_val<T1, const C1: usize, T2, const C2: usize>(
    src: &Image<T1, C1>,
    dst: &mut Image<T2, C2>,
    strategy: ExecutionStrategy,
    f: impl Fn(&T1, &mut T2) + Send + Sync,
) -> Result<(), ParallelError>
where
    T1: Sync,
    T2: Send,
{
    let src_row_len = C1 * src.cols();
    let dst_row_len = C2 * dst.cols();
    let src = src.as_slice();

    for_each_row(strategy, dst.as_slice_mut(), dst_row_len, |r, dst_row| {
        src[r * src_row_len..(r + 1) * src_row_len]
            .iter()
            .zip(dst_row.iter_mut())
            .for_each(|(src_val, dst_val)| f(src_val, dst_val));
    })
}
