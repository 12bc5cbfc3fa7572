//! Parallel processing utilities for image and frame operations
//!
//! This module provides functions for processing arrays in parallel
//! with deterministic seeding for reproducible results, and an explicit
//! executor that owns its worker pool for the duration of a single call.

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Process an Array2 in parallel chunks with deterministic seeding
///
/// This function processes a 2D array in parallel using row-wise chunks
/// for better cache locality and deterministic results. Each chunk gets
/// a unique RNG seeded from the base seed plus the chunk index.
///
/// # Arguments
/// * `array` - The 2D array to process
/// * `seed` - Base seed for random number generation
/// * `chunk_size` - Optional chunk size (number of rows per chunk). Defaults to 64 if None.
/// * `processor` - Closure that processes each chunk with its own RNG
///
/// # Returns
/// The processed array
pub fn process_array_in_parallel_chunks<F>(
    mut array: Array2<f64>,
    seed: u64,
    chunk_size: Option<usize>,
    processor: F,
) -> Array2<f64>
where
    F: Fn(&mut ndarray::ArrayViewMut2<f64>, &mut StdRng) + Send + Sync,
{
    let chunk_size = chunk_size.unwrap_or(64).max(1);

    array
        .axis_chunks_iter_mut(Axis(0), chunk_size)
        .into_par_iter()
        .enumerate()
        .for_each(|(chunk_idx, mut chunk)| {
            // Seed depends only on the chunk index, never on scheduling order
            let chunk_seed = seed.wrapping_add(chunk_idx as u64);
            let mut rng = StdRng::seed_from_u64(chunk_seed);

            processor(&mut chunk, &mut rng);
        });

    array
}

/// Task executor for independent per-item work.
///
/// `Sequential` runs every task on the calling thread. `Pool` owns a rayon
/// thread pool that is created by the caller and torn down when the executor
/// is dropped, so no process-wide pool state is ever configured.
///
/// Both variants return results in input order and apply exactly the same
/// closure to every item, so switching between them never changes numbers.
pub enum Executor {
    /// Run tasks one after another on the calling thread
    Sequential,
    /// Distribute tasks over a dedicated worker pool
    Pool(ThreadPool),
}

impl Executor {
    /// Executor that runs everything on the calling thread
    pub fn sequential() -> Self {
        Executor::Sequential
    }

    /// Build an executor backed by a fresh worker pool.
    ///
    /// # Arguments
    /// * `threads` - Worker count, or `None` to let rayon pick one per core
    pub fn with_threads(threads: Option<usize>) -> Result<Self, ThreadPoolBuildError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|idx| format!("lucky-worker-{idx}"));
        if let Some(count) = threads {
            builder = builder.num_threads(count);
        }
        Ok(Executor::Pool(builder.build()?))
    }

    /// Whether tasks are distributed across worker threads
    pub fn is_parallel(&self) -> bool {
        matches!(self, Executor::Pool(_))
    }

    /// Number of threads tasks can run on
    pub fn thread_count(&self) -> usize {
        match self {
            Executor::Sequential => 1,
            Executor::Pool(pool) => pool.current_num_threads(),
        }
    }

    /// Apply `task` to every item and join all results before returning.
    ///
    /// The returned vector is ordered like `items` regardless of the order
    /// in which workers finish.
    pub fn map<T, R, F>(&self, items: &[T], task: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Send + Sync,
    {
        match self {
            Executor::Sequential => items.iter().map(&task).collect(),
            Executor::Pool(pool) => pool.install(|| items.par_iter().map(&task).collect()),
        }
    }

    /// Like [`Executor::map`] but over the index range `0..count`
    pub fn map_range<R, F>(&self, count: usize, task: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> R + Send + Sync,
    {
        match self {
            Executor::Sequential => (0..count).map(&task).collect(),
            Executor::Pool(pool) => pool.install(|| (0..count).into_par_iter().map(&task).collect()),
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Executor::Sequential => write!(f, "Executor::Sequential"),
            Executor::Pool(pool) => write!(f, "Executor::Pool({} threads)", pool.current_num_threads()),
        }
    }
}
