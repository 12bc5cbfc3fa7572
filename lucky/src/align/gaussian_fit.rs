use log::debug;
use ndarray::ArrayView2;
use shared::image_proc::{centred_coordinates, fit_gaussian_2d, peak_pixel, FitOptions, Gaussian2D};

use super::{Displacement, ShiftEstimator};
use crate::error::{DegenerateInput, Result};

/// Aligns on the centre of a 2D Gaussian fitted to the whole frame.
///
/// The reference is fitted once on construction.
#[derive(Debug, Clone)]
pub struct GaussianFitEstimator {
    options: FitOptions,
    reference_centre: (f64, f64),
    reference_fallback: bool,
}

/// Fitted centre of the mean-subtracted `image` and whether the fallback
/// model was used. Coordinates are measured from `(h / 2, w / 2)`.
fn fit_centre(image: &ArrayView2<f64>, options: &FitOptions) -> Result<((f64, f64), bool)> {
    let (h, w) = image.dim();
    let mean = image.mean().ok_or(DegenerateInput::EmptyImage)?;
    let data = image.mapv(|v| v - mean);
    let peak = peak_pixel(&data.view()).ok_or(DegenerateInput::EmptyImage)?;

    let rows = centred_coordinates(0, h, h / 2);
    let cols = centred_coordinates(0, w, w / 2);
    let peak_at = (rows[peak.row], cols[peak.col]);
    let initial = Gaussian2D::new(peak.value, peak_at.0, peak_at.1, 2.0, 2.0);

    let inside = |g: &Gaussian2D| {
        g.is_finite()
            && (rows[0]..=rows[h - 1]).contains(&g.row_mean)
            && (cols[0]..=cols[w - 1]).contains(&g.col_mean)
    };

    match fit_gaussian_2d(&data.view(), &rows, &cols, initial, options) {
        Ok(fit) if inside(&fit) => Ok(((fit.row_mean, fit.col_mean), false)),
        outcome => {
            debug!("Frame fit rejected ({outcome:?}), using brightest pixel");
            Ok((peak_at, true))
        }
    }
}

impl GaussianFitEstimator {
    pub fn new(reference: &ArrayView2<f64>) -> Result<Self> {
        let options = FitOptions::default();
        let (reference_centre, reference_fallback) = fit_centre(reference, &options)?;
        Ok(Self {
            options,
            reference_centre,
            reference_fallback,
        })
    }
}

impl ShiftEstimator for GaussianFitEstimator {
    fn name(&self) -> &'static str {
        "gaussian-fit"
    }

    fn displacement(&self, frame: &ArrayView2<f64>) -> Result<Displacement> {
        let (centre, fallback) = fit_centre(frame, &self.options)?;
        Ok(Displacement {
            row: centre.0 - self.reference_centre.0,
            col: centre.1 - self.reference_centre.1,
            peak_value: None,
            used_fallback: fallback || self.reference_fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::blob;
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    #[test]
    fn test_sub_pixel_fit_shift() {
        let reference = blob((40, 40), 20.0, 20.0, 80.0, 2.5);
        let frame = blob((40, 40), 21.3, 18.6, 80.0, 2.5);
        let estimator = GaussianFitEstimator::new(&reference.view()).unwrap();
        let alignment = estimator.align(&frame.view()).unwrap();
        assert_abs_diff_eq!(alignment.shift.row, -1.3, epsilon = 1e-3);
        assert_abs_diff_eq!(alignment.shift.col, 1.4, epsilon = 1e-3);
        assert!(!alignment.used_fallback);
    }

    #[test]
    fn test_flat_frame_falls_back_to_brightest_pixel() {
        let reference = blob((16, 16), 8.0, 8.0, 10.0, 1.5);
        let flat = Array2::from_elem((16, 16), 4.0);
        let estimator = GaussianFitEstimator::new(&reference.view()).unwrap();
        let d = estimator.displacement(&flat.view()).unwrap();
        assert!(d.used_fallback);
        // First pixel in scan order relative to the reference centre
        assert_abs_diff_eq!(d.row, -8.0, epsilon = 1e-6);
        assert_abs_diff_eq!(d.col, -8.0, epsilon = 1e-6);
    }
}
