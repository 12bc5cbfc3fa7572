//! Generic numerical helpers
//!
//! Parallel execution helpers and small statistics routines that are not
//! tied to any particular image operation.

pub mod parallel;
pub mod stats;

pub use parallel::{process_array_in_parallel_chunks, Executor};
pub use stats::{mean, median, median_in_place, population_std, StatsError};
