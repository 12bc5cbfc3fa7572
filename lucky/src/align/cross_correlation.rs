use log::debug;
use ndarray::{s, Array2, ArrayView2};
use shared::image_proc::{
    border_leaves_interior, centred_coordinates, cross_correlate_same, fit_gaussian_2d, peak_pixel,
    FitOptions, Gaussian2D,
};

use super::{Displacement, ShiftEstimator};
use crate::error::{DegenerateInput, Result};

/// Aligns on the peak of the cross-correlation with the reference.
///
/// Both images are mean subtracted and the correlation is normalised by its
/// peak. Zero lag sits at `(h / 2, w / 2)`. With sub-pixel refinement a 2D
/// Gaussian is fitted to the correlation inside a border of
/// `border` pixels; a failed fit falls back to the integer peak.
#[derive(Debug, Clone)]
pub struct CrossCorrelationEstimator {
    reference: Array2<f64>,
    sub_pixel: bool,
    border: usize,
    fit_options: FitOptions,
}

fn mean_subtracted(image: &ArrayView2<f64>) -> Array2<f64> {
    let mean = image.mean().unwrap_or(0.0);
    image.mapv(|v| v - mean)
}

impl CrossCorrelationEstimator {
    pub fn new(reference: &ArrayView2<f64>, sub_pixel: bool, border: usize) -> Self {
        Self {
            reference: mean_subtracted(reference),
            sub_pixel,
            border,
            fit_options: FitOptions::default(),
        }
    }

    /// Fit a Gaussian to the correlation window, returning the lag of its
    /// centre and whether the fallback model was used.
    fn refine(&self, corr: &Array2<f64>, integer_lag: (f64, f64)) -> ((f64, f64), bool) {
        let (h, w) = corr.dim();
        let b = self.border;
        if !border_leaves_interior(b, (h, w)) {
            debug!("Correlation border {b} leaves no fitting window, using integer peak");
            return (integer_lag, true);
        }
        let (wh, ww) = (h - 2 * b, w - 2 * b);
        let window = corr.slice(s![b..h - b, b..w - b]);
        let rows = centred_coordinates(b, wh, h / 2);
        let cols = centred_coordinates(b, ww, w / 2);

        let initial = Gaussian2D::new(1.0, integer_lag.0, integer_lag.1, 5.0, 5.0);
        let inside = |g: &Gaussian2D| {
            g.is_finite()
                && (rows[0]..=rows[wh - 1]).contains(&g.row_mean)
                && (cols[0]..=cols[ww - 1]).contains(&g.col_mean)
        };

        match fit_gaussian_2d(&window, &rows, &cols, initial, &self.fit_options) {
            Ok(fit) if inside(&fit) => ((fit.row_mean, fit.col_mean), false),
            outcome => {
                // Fallback model is a unit Gaussian at the integer peak
                debug!("Correlation fit rejected ({outcome:?}), using integer peak");
                (integer_lag, true)
            }
        }
    }
}

impl ShiftEstimator for CrossCorrelationEstimator {
    fn name(&self) -> &'static str {
        "cross-correlation"
    }

    fn displacement(&self, frame: &ArrayView2<f64>) -> Result<Displacement> {
        let frame = mean_subtracted(frame);
        let mut corr = cross_correlate_same(&self.reference.view(), &frame.view());

        let peak = peak_pixel(&corr.view()).ok_or(DegenerateInput::ZeroCorrelationPeak)?;
        if !(peak.value.is_finite() && peak.value > 0.0) {
            return Err(DegenerateInput::ZeroCorrelationPeak.into());
        }
        corr.mapv_inplace(|v| v / peak.value);

        let (h, w) = corr.dim();
        let integer_lag = (
            peak.row as f64 - (h / 2) as f64,
            peak.col as f64 - (w / 2) as f64,
        );

        let (lag, used_fallback) = if self.sub_pixel {
            self.refine(&corr, integer_lag)
        } else {
            (integer_lag, false)
        };

        // The peak sits at zero lag minus the frame's displacement
        Ok(Displacement {
            row: -lag.0,
            col: -lag.1,
            peak_value: None,
            used_fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::blob;
    use super::*;
    use crate::error::LuckyError;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_integer_lag_without_refinement() {
        let reference = blob((32, 32), 16.0, 16.0, 10.0, 1.5);
        let frame = blob((32, 32), 13.0, 18.0, 10.0, 1.5);
        let estimator = CrossCorrelationEstimator::new(&reference.view(), false, 0);
        let d = estimator.displacement(&frame.view()).unwrap();
        assert_eq!((d.row, d.col), (-3.0, 2.0));
    }

    #[test]
    fn test_identical_frames_have_zero_shift() {
        let reference = blob((33, 31), 15.0, 17.0, 10.0, 2.0);
        let estimator = CrossCorrelationEstimator::new(&reference.view(), true, 8);
        let alignment = estimator.align(&reference.view()).unwrap();
        assert_abs_diff_eq!(alignment.shift.row, 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(alignment.shift.col, 0.0, epsilon = 1e-4);
        assert!(!alignment.used_fallback);
    }

    #[test]
    fn test_sub_pixel_refinement() {
        let reference = blob((48, 48), 24.0, 24.0, 10.0, 2.0);
        let frame = blob((48, 48), 25.4, 22.7, 10.0, 2.0);
        let estimator = CrossCorrelationEstimator::new(&reference.view(), true, 12);
        let d = estimator.displacement(&frame.view()).unwrap();
        assert_abs_diff_eq!(d.row, 1.4, epsilon = 0.05);
        assert_abs_diff_eq!(d.col, -1.3, epsilon = 0.05);
    }

    #[test]
    fn test_peak_outside_fit_window_falls_back() {
        // Lags (-6, 5) sit outside the window of lags -4..=3 left by the border
        let reference = blob((32, 32), 16.0, 16.0, 10.0, 1.5);
        let frame = blob((32, 32), 22.0, 11.0, 10.0, 1.5);
        let estimator = CrossCorrelationEstimator::new(&reference.view(), true, 12);
        let d = estimator.displacement(&frame.view()).unwrap();
        assert_eq!((d.row, d.col), (6.0, -5.0));
        assert!(d.used_fallback);
    }

    #[test]
    fn test_non_finite_correlation_falls_back() {
        let reference = blob((16, 16), 8.0, 8.0, 10.0, 1.5);
        let estimator = CrossCorrelationEstimator::new(&reference.view(), true, 2);
        let corr = Array2::from_elem((16, 16), f64::NAN);
        assert_eq!(estimator.refine(&corr, (1.0, -2.0)), ((1.0, -2.0), true));
    }

    #[test]
    fn test_flat_frame_is_degenerate() {
        let reference = blob((16, 16), 8.0, 8.0, 10.0, 1.5);
        let flat = Array2::from_elem((16, 16), 3.0);
        let estimator = CrossCorrelationEstimator::new(&reference.view(), true, 4);
        assert_eq!(
            estimator.displacement(&flat.view()).unwrap_err(),
            LuckyError::Degenerate(DegenerateInput::ZeroCorrelationPeak)
        );
    }
}
