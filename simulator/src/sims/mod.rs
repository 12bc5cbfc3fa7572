//! Frame-level simulations: tip/tilt, frame synthesis and image quality

pub mod lucky_frame;
pub mod tip_tilt;

use ndarray::{Array2, ArrayView2};

use crate::error::SimError;

/// Strehl ratio: peak of an aberrated PSF over the diffraction-limited peak
pub fn strehl_ratio(psf: &ArrayView2<f64>, psf_dl: &ArrayView2<f64>) -> Result<f64, SimError> {
    let peak = psf.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let peak_dl = psf_dl.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(peak_dl.is_finite() && peak_dl > 0.0) {
        return Err(SimError::invalid(
            "diffraction-limited PSF",
            format!("peak {peak_dl} is not positive"),
        ));
    }
    Ok(peak / peak_dl)
}

/// Circular Gaussian star of peak `amplitude` centred at `(row, col)`
pub fn gaussian_star(
    shape: (usize, usize),
    centre: (f64, f64),
    amplitude: f64,
    sigma: f64,
) -> Array2<f64> {
    let two_sigma_sq = 2.0 * sigma * sigma;
    Array2::from_shape_fn(shape, |(r, c)| {
        let dr = r as f64 - centre.0;
        let dc = c as f64 - centre.1;
        amplitude * (-(dr * dr + dc * dc) / two_sigma_sq).exp()
    })
}
