use ndarray::ArrayView2;
use shared::image_proc::{thresholded_centroid, CentroidResult};

use super::{Displacement, ShiftEstimator};
use crate::error::{DegenerateInput, Result};

/// Aligns on the intensity-weighted centroid of pixels above
/// `threshold * max(frame)`.
#[derive(Debug, Clone)]
pub struct CentroidEstimator {
    threshold: f64,
    reference_centroid: CentroidResult,
}

impl CentroidEstimator {
    pub fn new(reference: &ArrayView2<f64>, threshold: f64) -> Result<Self> {
        let reference_centroid =
            thresholded_centroid(reference, threshold).ok_or(DegenerateInput::ZeroCentroidMass)?;
        Ok(Self {
            threshold,
            reference_centroid,
        })
    }
}

impl ShiftEstimator for CentroidEstimator {
    fn name(&self) -> &'static str {
        "centroid"
    }

    fn displacement(&self, frame: &ArrayView2<f64>) -> Result<Displacement> {
        let centroid =
            thresholded_centroid(frame, self.threshold).ok_or(DegenerateInput::ZeroCentroidMass)?;
        Ok(Displacement::exact(
            centroid.row - self.reference_centroid.row,
            centroid.col - self.reference_centroid.col,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::blob;
    use super::*;
    use crate::error::LuckyError;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    #[test]
    fn test_sub_pixel_centroid_shift() {
        let reference = blob((32, 32), 16.0, 16.0, 50.0, 2.0);
        let frame = blob((32, 32), 17.5, 14.25, 50.0, 2.0);
        let estimator = CentroidEstimator::new(&reference.view(), 0.0).unwrap();
        let d = estimator.displacement(&frame.view()).unwrap();
        assert_abs_diff_eq!(d.row, 1.5, epsilon = 1e-6);
        assert_abs_diff_eq!(d.col, -1.75, epsilon = 1e-6);
        assert!(!d.used_fallback);
    }

    #[test]
    fn test_faint_frames_still_align() {
        let reference = blob((32, 32), 16.0, 16.0, 1e-18, 2.0);
        let frame = blob((32, 32), 17.0, 15.0, 1e-18, 2.0);
        let estimator = CentroidEstimator::new(&reference.view(), 0.0).unwrap();
        let alignment = estimator.align(&frame.view()).unwrap();
        assert_abs_diff_eq!(alignment.shift.row, -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(alignment.shift.col, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_blank_reference_is_degenerate() {
        let blank = Array2::zeros((8, 8));
        assert_eq!(
            CentroidEstimator::new(&blank.view(), 0.25).unwrap_err(),
            LuckyError::Degenerate(DegenerateInput::ZeroCentroidMass)
        );
    }
}
