//! Shared components and utilities for the lucky imaging workspace.
//!
//! This crate contains the array-level building blocks used by both the
//! frame simulator and the reconstruction engine: FFT helpers, resampling,
//! centroiding, Gaussian fitting, noise generation and the worker-pool
//! helpers used to fan work out over frames.

pub mod algo;
pub mod image_proc;
