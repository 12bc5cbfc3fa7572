//! Alignment error analysis against known applied shifts

use log::{debug, info};
use ndarray::ArrayView2;
use serde::Serialize;
use shared::algo::{mean, population_std};

use crate::align::ShiftVector;
use crate::error::{ConfigError, Result};

/// Error of one frame's recovered correction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameError {
    pub row_px: f64,
    pub col_px: f64,
    pub magnitude_px: f64,
    pub row_arcsec: f64,
    pub col_arcsec: f64,
    pub magnitude_arcsec: f64,
}

/// Mean and population standard deviation of one error component
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorStats {
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorSummary {
    pub row: ErrorStats,
    pub col: ErrorStats,
    pub magnitude: ErrorStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentErrorReport {
    pub plate_scale_arcsec_per_px: f64,
    pub frames: Vec<FrameError>,
    pub pixels: ErrorSummary,
    pub arcsec: ErrorSummary,
}

fn stats(values: &[f64]) -> Result<ErrorStats> {
    let invalid = |e: shared::algo::StatsError| ConfigError::invalid("shift arrays", e.to_string());
    Ok(ErrorStats {
        mean: mean(values).map_err(invalid)?,
        std: population_std(values).map_err(invalid)?,
    })
}

fn summarise(frames: &[FrameError], pick: impl Fn(&FrameError) -> [f64; 3]) -> Result<ErrorSummary> {
    let columns: Vec<[f64; 3]> = frames.iter().map(pick).collect();
    let axis = |k: usize| -> Vec<f64> { columns.iter().map(|c| c[k]).collect() };
    Ok(ErrorSummary {
        row: stats(&axis(0))?,
        col: stats(&axis(1))?,
        magnitude: stats(&axis(2))?,
    })
}

/// Compare recovered corrections with the shifts that were applied.
///
/// A recovered correction is the negated applied shift, so the per-frame
/// residual is `applied + recovered`. Angular errors multiply by
/// `plate_scale` (arcsec per pixel).
pub fn alignment_errors(
    applied: &[ShiftVector],
    recovered: &[ShiftVector],
    plate_scale: f64,
) -> Result<AlignmentErrorReport> {
    if applied.len() != recovered.len() {
        return Err(ConfigError::invalid(
            "shift arrays",
            format!("{} applied vs {} recovered", applied.len(), recovered.len()),
        )
        .into());
    }
    if applied.is_empty() {
        return Err(ConfigError::invalid("shift arrays", "no frames to compare").into());
    }
    if !(plate_scale.is_finite() && plate_scale > 0.0) {
        return Err(ConfigError::invalid("plate scale", plate_scale.to_string()).into());
    }

    let frames: Vec<FrameError> = applied
        .iter()
        .zip(recovered)
        .map(|(a, r)| {
            let residual = ShiftVector::new(a.row + r.row, a.col + r.col);
            FrameError {
                row_px: residual.row,
                col_px: residual.col,
                magnitude_px: residual.magnitude(),
                row_arcsec: residual.row * plate_scale,
                col_arcsec: residual.col * plate_scale,
                magnitude_arcsec: residual.magnitude() * plate_scale,
            }
        })
        .collect();

    let pixels = summarise(&frames, |f| [f.row_px, f.col_px, f.magnitude_px])?;
    let arcsec = summarise(&frames, |f| [f.row_arcsec, f.col_arcsec, f.magnitude_arcsec])?;
    Ok(AlignmentErrorReport {
        plate_scale_arcsec_per_px: plate_scale,
        frames,
        pixels,
        arcsec,
    })
}

fn rows_to_shifts(name: &str, array: &ArrayView2<f64>) -> Result<Vec<ShiftVector>> {
    if array.ncols() != 2 {
        return Err(ConfigError::invalid(
            "shift arrays",
            format!("{name} has shape {:?}, expected (N, 2)", array.dim()),
        )
        .into());
    }
    Ok(array
        .rows()
        .into_iter()
        .map(|row| ShiftVector::new(row[0], row[1]))
        .collect())
}

/// [`alignment_errors`] over `N x 2` arrays of (row, col)
pub fn alignment_errors_from_arrays(
    applied: &ArrayView2<f64>,
    recovered: &ArrayView2<f64>,
    plate_scale: f64,
) -> Result<AlignmentErrorReport> {
    alignment_errors(
        &rows_to_shifts("applied", applied)?,
        &rows_to_shifts("recovered", recovered)?,
        plate_scale,
    )
}

impl AlignmentErrorReport {
    /// Per-frame table at debug level, summary at info level
    pub fn log(&self) {
        debug!("frame   row_px   col_px    mag_px  mag_arcsec");
        for (i, f) in self.frames.iter().enumerate() {
            debug!(
                "{i:5} {:8.4} {:8.4} {:9.4} {:11.4}",
                f.row_px, f.col_px, f.magnitude_px, f.magnitude_arcsec
            );
        }
        let p = &self.pixels;
        let a = &self.arcsec;
        info!(
            "Alignment error over {} frames: row {:.4} ± {:.4} px, col {:.4} ± {:.4} px, \
             magnitude {:.4} ± {:.4} px ({:.4} ± {:.4} arcsec)",
            self.frames.len(),
            p.row.mean,
            p.row.std,
            p.col.mean,
            p.col.std,
            p.magnitude.mean,
            p.magnitude.std,
            a.magnitude.mean,
            a.magnitude.std
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_perfect_recovery_has_zero_error() {
        let applied = [ShiftVector::new(1.0, -2.0), ShiftVector::new(0.5, 0.25)];
        let recovered = [ShiftVector::new(-1.0, 2.0), ShiftVector::new(-0.5, -0.25)];
        let report = alignment_errors(&applied, &recovered, 0.5).unwrap();
        assert!(report.frames.iter().all(|f| f.magnitude_px == 0.0));
        assert_eq!(report.pixels.magnitude.mean, 0.0);
        assert_eq!(report.pixels.magnitude.std, 0.0);
    }

    #[test]
    fn test_errors_and_statistics() {
        let applied = array![[0.0, 0.0], [0.0, 0.0]];
        let recovered = array![[3.0, 4.0], [1.0, 0.0]];
        let report =
            alignment_errors_from_arrays(&applied.view(), &recovered.view(), 2.0).unwrap();

        assert_eq!(report.frames[0].magnitude_px, 5.0);
        assert_eq!(report.frames[0].magnitude_arcsec, 10.0);
        assert_relative_eq!(report.pixels.row.mean, 2.0);
        assert_relative_eq!(report.pixels.row.std, 1.0);
        assert_relative_eq!(report.pixels.col.mean, 2.0);
        assert_relative_eq!(report.pixels.magnitude.mean, 3.0);
        assert_relative_eq!(report.arcsec.magnitude.mean, 6.0);
        assert_relative_eq!(report.arcsec.magnitude.std, 4.0);

        // Inputs are untouched
        assert_eq!(recovered, array![[3.0, 4.0], [1.0, 0.0]]);
    }

    #[test]
    fn test_rejects_mismatched_inputs() {
        let applied = array![[0.0, 0.0]];
        let recovered = array![[0.0, 0.0], [1.0, 1.0]];
        assert!(alignment_errors_from_arrays(&applied.view(), &recovered.view(), 1.0).is_err());

        let wide = array![[0.0, 0.0, 0.0]];
        assert!(alignment_errors_from_arrays(&wide.view(), &wide.view(), 1.0).is_err());

        let one = [ShiftVector::zero()];
        assert!(alignment_errors(&one, &one, 0.0).is_err());
        assert!(alignment_errors(&[], &[], 1.0).is_err());
    }
}
