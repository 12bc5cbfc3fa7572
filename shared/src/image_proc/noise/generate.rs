//! Noise generation utilities for detector simulation.
//!
//! Every generator takes an optional seed. Arrays are filled in row chunks
//! through [`process_array_in_parallel_chunks`], each chunk with its own RNG
//! derived from the seed and chunk index, so a seeded call is reproducible
//! regardless of how rayon schedules the chunks.

use crate::algo::process_array_in_parallel_chunks;
use ndarray::{Array2, ArrayView2};
use rand::{thread_rng, RngCore};
use rand_distr::{Distribution, Normal, NormalError, Poisson};

/// Means at or above this are sampled with the normal approximation
const POISSON_NORMAL_CUTOVER: f64 = 20.0;

fn resolve_seed(rng_seed: Option<u64>) -> u64 {
    rng_seed.unwrap_or_else(|| thread_rng().next_u64())
}

/// Apply Poisson arrival statistics to an image of expected counts
///
/// Each pixel's value is treated as the mean of a Poisson distribution.
/// Large means use a rounded normal approximation clipped at zero so the
/// output stays integer valued. Non-positive or non-finite means yield zero.
///
/// # Arguments
/// * `mean_electron_image` - Expected counts per pixel
/// * `rng_seed` - Optional seed for the random number generator
pub fn apply_poisson_photon_noise(
    mean_electron_image: &ArrayView2<f64>,
    rng_seed: Option<u64>,
) -> Array2<f64> {
    let seed = resolve_seed(rng_seed);

    process_array_in_parallel_chunks(
        mean_electron_image.to_owned(),
        seed,
        Some(64),
        |chunk, rng| {
            chunk.iter_mut().for_each(|pixel| {
                let mean = *pixel;
                *pixel = if !(mean.is_finite() && mean > 0.0) {
                    0.0
                } else if mean < POISSON_NORMAL_CUTOVER {
                    match Poisson::new(mean) {
                        Ok(poisson) => poisson.sample(rng),
                        Err(_) => 0.0,
                    }
                } else {
                    match Normal::new(mean, mean.sqrt()) {
                        Ok(normal) => normal.sample(rng).round().max(0.0),
                        Err(_) => 0.0,
                    }
                };
            });
        },
    )
}

/// Field of independent Poisson draws with a uniform mean
pub fn poisson_field(size: (usize, usize), mean: f64, rng_seed: Option<u64>) -> Array2<f64> {
    let means = Array2::from_elem(size, mean);
    apply_poisson_photon_noise(&means.view(), rng_seed)
}

/// Field of independent normal draws
///
/// Fails when `std_dev` is negative or not finite.
pub fn gaussian_field(
    size: (usize, usize),
    mean: f64,
    std_dev: f64,
    rng_seed: Option<u64>,
) -> Result<Array2<f64>, NormalError> {
    let normal = Normal::new(mean, std_dev)?;
    let seed = resolve_seed(rng_seed);

    Ok(process_array_in_parallel_chunks(
        Array2::zeros(size),
        seed,
        Some(64),
        |chunk, rng| {
            chunk.iter_mut().for_each(|pixel| *pixel = normal.sample(rng));
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gaussian_field_statistics() {
        let noise = gaussian_field((100, 100), 50.0, 5.0, Some(123)).unwrap();
        assert_eq!(noise.dim(), (100, 100));
        assert_relative_eq!(noise.mean().unwrap(), 50.0, epsilon = 0.5);
        assert_relative_eq!(noise.std(0.0), 5.0, epsilon = 0.5);
    }

    #[test]
    fn test_gaussian_field_rejects_negative_std() {
        assert!(gaussian_field((2, 2), 0.0, -1.0, Some(1)).is_err());
    }

    #[test]
    fn test_deterministic_output() {
        let a = gaussian_field((70, 5), 0.0, 1.0, Some(42)).unwrap();
        let b = gaussian_field((70, 5), 0.0, 1.0, Some(42)).unwrap();
        assert_eq!(a, b);

        let p1 = poisson_field((130, 3), 4.0, Some(9));
        let p2 = poisson_field((130, 3), 4.0, Some(9));
        assert_eq!(p1, p2);
    }

    #[test]
    fn test_poisson_noise_statistics() {
        for mean in [3.0, 500.0] {
            let noisy = poisson_field((200, 200), mean, Some(7));
            let sample_mean = noisy.mean().unwrap();
            let sample_var = noisy.var(0.0);
            assert_relative_eq!(sample_mean, mean, max_relative = 0.02);
            assert_relative_eq!(sample_var, mean, max_relative = 0.1);
            assert!(noisy.iter().all(|v| *v >= 0.0 && v.fract() == 0.0));
        }
    }

    #[test]
    fn test_poisson_zero_and_negative_means() {
        let means = ndarray::arr2(&[[0.0, -3.0], [f64::NAN, 0.0]]);
        let noisy = apply_poisson_photon_noise(&means.view(), Some(1));
        assert!(noisy.iter().all(|v| *v == 0.0));
    }
}
