//! Noise generation for frame synthesis
//!
//! - **generate**: seeded Poisson and Gaussian noise fields

pub mod generate;

pub use generate::{apply_poisson_photon_noise, gaussian_field, poisson_field};
