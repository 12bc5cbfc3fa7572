//! Tip/tilt sequences for frame-to-frame image motion

use rand::rngs::StdRng;
use rand::{thread_rng, RngCore, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::error::SimError;

/// Draw `count` independent (row, col) shifts with RMS `rms_px` per axis.
///
/// # Arguments
/// * `count` - Number of frames
/// * `rms_px` - Standard deviation of each axis in pixels
/// * `rng_seed` - Optional seed for reproducible sequences
pub fn gaussian_tip_tilt(
    count: usize,
    rms_px: f64,
    rng_seed: Option<u64>,
) -> Result<Vec<(f64, f64)>, SimError> {
    let normal = Normal::new(0.0, rms_px)
        .map_err(|e| SimError::invalid("tip/tilt RMS", e.to_string()))?;
    let mut rng = StdRng::seed_from_u64(rng_seed.unwrap_or_else(|| thread_rng().next_u64()));

    Ok((0..count)
        .map(|_| (normal.sample(&mut rng), normal.sample(&mut rng)))
        .collect())
}

/// Largest absolute shift on either axis
pub fn max_excursion(shifts: &[(f64, f64)]) -> f64 {
    shifts
        .iter()
        .map(|(r, c)| r.abs().max(c.abs()))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sequence_is_seeded() {
        let a = gaussian_tip_tilt(20, 1.5, Some(3)).unwrap();
        let b = gaussian_tip_tilt(20, 1.5, Some(3)).unwrap();
        assert_eq!(a.len(), 20);
        assert_eq!(a, b);
    }

    #[test]
    fn test_rms_matches() {
        let shifts = gaussian_tip_tilt(20_000, 2.0, Some(5)).unwrap();
        let rms_row =
            (shifts.iter().map(|(r, _)| r * r).sum::<f64>() / shifts.len() as f64).sqrt();
        assert_relative_eq!(rms_row, 2.0, max_relative = 0.05);
    }

    #[test]
    fn test_zero_rms_is_static() {
        let shifts = gaussian_tip_tilt(5, 0.0, Some(1)).unwrap();
        assert!(shifts.iter().all(|s| *s == (0.0, 0.0)));
        assert_eq!(max_excursion(&shifts), 0.0);
    }

    #[test]
    fn test_negative_rms_rejected() {
        assert!(gaussian_tip_tilt(5, -1.0, None).is_err());
    }

    #[test]
    fn test_max_excursion() {
        assert_eq!(max_excursion(&[(1.0, -3.5), (2.0, 0.0)]), 3.5);
    }
}
