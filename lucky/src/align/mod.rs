//! Frame alignment strategies.
//!
//! Every strategy locates a feature in the frame and the same feature in
//! the reference. The displacement `d = frame - reference` (row, col) is
//! the distance the frame's content has moved. The frame is registered by
//! resampling it by `-d`, and the reported [`ShiftVector`] is `-d`: the
//! correction that was applied to bring the frame onto the reference.
//!
//! Reference features are computed once when an [`Aligner`] is prepared and
//! shared read-only by every frame.

mod centroid;
mod cross_correlation;
mod gaussian_fit;
mod peak_pixel;

pub use centroid::CentroidEstimator;
pub use cross_correlation::CrossCorrelationEstimator;
pub use gaussian_fit::GaussianFitEstimator;
pub use peak_pixel::PeakPixelEstimator;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use shared::image_proc::shift_image;

use crate::config::{LuckyConfig, LuckyMethod};
use crate::error::{ConfigError, Result};

/// Registration correction in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ShiftVector {
    pub row: f64,
    pub col: f64,
}

impl ShiftVector {
    pub fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn magnitude(&self) -> f64 {
        self.row.hypot(self.col)
    }
}

impl From<(f64, f64)> for ShiftVector {
    fn from((row, col): (f64, f64)) -> Self {
        Self::new(row, col)
    }
}

/// Feature displacement of a frame relative to the reference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Displacement {
    pub row: f64,
    pub col: f64,
    /// Brightest pixel used for ranking (peak-pixel strategy only)
    pub peak_value: Option<f64>,
    /// A fit failed and the fixed fallback model was used
    pub used_fallback: bool,
}

impl Displacement {
    pub(crate) fn exact(row: f64, col: f64) -> Self {
        Self {
            row,
            col,
            peak_value: None,
            used_fallback: false,
        }
    }
}

/// Output of aligning one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// Frame resampled onto the reference
    pub registered: Array2<f64>,
    pub shift: ShiftVector,
    pub peak_value: Option<f64>,
    pub used_fallback: bool,
}

/// Estimate how far a frame's content sits from the reference's.
pub trait ShiftEstimator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Displacement of `frame` relative to the prepared reference
    fn displacement(&self, frame: &ArrayView2<f64>) -> Result<Displacement>;

    /// Register `frame` onto the reference
    fn align(&self, frame: &ArrayView2<f64>) -> Result<Alignment> {
        let d = self.displacement(frame)?;
        Ok(Alignment {
            registered: shift_image(frame, (-d.row, -d.col)),
            shift: ShiftVector::new(-d.row, -d.col),
            peak_value: d.peak_value,
            used_fallback: d.used_fallback,
        })
    }
}

/// The closed set of alignment strategies
#[derive(Debug, Clone)]
pub enum Aligner {
    PeakPixel(PeakPixelEstimator),
    Centroid(CentroidEstimator),
    CrossCorrelation(CrossCorrelationEstimator),
    GaussianFit(GaussianFitEstimator),
}

impl Aligner {
    /// Prepare the strategy for `method` against `reference`.
    ///
    /// FAS aligns by cross-correlation. Blind stacking has no strategy and
    /// is rejected here. Errors locating the reference are returned as-is.
    pub fn prepare(
        method: LuckyMethod,
        config: &LuckyConfig,
        reference: &ArrayView2<f64>,
    ) -> Result<Self> {
        let aligner = match method {
            LuckyMethod::BlindStack => {
                return Err(ConfigError::UnsupportedMethod(format!(
                    "{method} has no alignment step"
                ))
                .into())
            }
            LuckyMethod::PeakPixel => {
                Aligner::PeakPixel(PeakPixelEstimator::new(reference, config.bid_area)?)
            }
            LuckyMethod::Centroid => {
                Aligner::Centroid(CentroidEstimator::new(reference, config.centroid_threshold)?)
            }
            LuckyMethod::CrossCorrelation | LuckyMethod::FourierAmplitudeSelection => {
                Aligner::CrossCorrelation(CrossCorrelationEstimator::new(
                    reference,
                    config.sub_pixel,
                    config.correlation_border,
                ))
            }
            LuckyMethod::GaussianFit => Aligner::GaussianFit(GaussianFitEstimator::new(reference)?),
        };
        Ok(aligner)
    }

    fn inner(&self) -> &dyn ShiftEstimator {
        match self {
            Aligner::PeakPixel(e) => e,
            Aligner::Centroid(e) => e,
            Aligner::CrossCorrelation(e) => e,
            Aligner::GaussianFit(e) => e,
        }
    }
}

impl ShiftEstimator for Aligner {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn displacement(&self, frame: &ArrayView2<f64>) -> Result<Displacement> {
        self.inner().displacement(frame)
    }
}

/// Align a single frame to a reference.
///
/// Unlike batch reconstruction, degenerate frames are reported as errors
/// here rather than replaced by a zero shift.
pub fn align_frame(
    frame: &ArrayView2<f64>,
    reference: &ArrayView2<f64>,
    config: &LuckyConfig,
) -> Result<Alignment> {
    if frame.dim() != reference.dim() {
        return Err(ConfigError::ShapeMismatch {
            reference: reference.dim(),
            frames: frame.dim(),
        }
        .into());
    }
    config.validate(reference.dim())?;
    Aligner::prepare(config.method, config, reference)?.align(frame)
}
