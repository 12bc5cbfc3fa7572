use ndarray::ArrayView2;
use shared::image_proc::{peak_pixel, PeakPixel};

use super::{Displacement, ShiftEstimator};
use crate::error::{DegenerateInput, Result};

/// Aligns on the brightest pixel inside an optional centred bid area.
#[derive(Debug, Clone)]
pub struct PeakPixelEstimator {
    bid_area: Option<(usize, usize)>,
    reference_peak: PeakPixel,
}

/// Brightest pixel of the centred `bid_area` window, in full-frame indices
fn bid_area_peak(image: &ArrayView2<f64>, bid_area: Option<(usize, usize)>) -> Option<PeakPixel> {
    let (h, w) = image.dim();
    let (bh, bw) = bid_area.unwrap_or((h, w));
    let (bh, bw) = (bh.min(h), bw.min(w));
    let (r0, c0) = ((h - bh) / 2, (w - bw) / 2);

    let window = image.slice(ndarray::s![r0..r0 + bh, c0..c0 + bw]);
    peak_pixel(&window).map(|p| PeakPixel {
        row: p.row + r0,
        col: p.col + c0,
        value: p.value,
    })
}

impl PeakPixelEstimator {
    pub fn new(reference: &ArrayView2<f64>, bid_area: Option<(usize, usize)>) -> Result<Self> {
        let reference_peak = bid_area_peak(reference, bid_area).ok_or(DegenerateInput::EmptyImage)?;
        Ok(Self {
            bid_area,
            reference_peak,
        })
    }
}

impl ShiftEstimator for PeakPixelEstimator {
    fn name(&self) -> &'static str {
        "peak-pixel"
    }

    fn displacement(&self, frame: &ArrayView2<f64>) -> Result<Displacement> {
        let peak = bid_area_peak(frame, self.bid_area).ok_or(DegenerateInput::EmptyImage)?;
        Ok(Displacement {
            row: peak.row as f64 - self.reference_peak.row as f64,
            col: peak.col as f64 - self.reference_peak.col as f64,
            peak_value: Some(peak.value),
            used_fallback: false,
        })
    }
}
