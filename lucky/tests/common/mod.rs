//! Common utilities for lucky imaging tests

#![allow(dead_code)]

use ndarray::Array2;
use shared::image_proc::{gaussian_kernel, shift_image};
use simulator::sims::gaussian_star;
use simulator::{synthesize_frame, FrameNoise, LuckyFrameConfig};

/// Gaussian blob of peak `amplitude` and width `sigma` at `centre`
pub fn blob(size: usize, centre: (f64, f64), amplitude: f64, sigma: f64) -> Array2<f64> {
    gaussian_star((size, size), centre, amplitude, sigma)
}

/// Copies of `image` translated by each (row, col) shift
pub fn shifted_copies(image: &Array2<f64>, shifts: &[(f64, f64)]) -> Vec<Array2<f64>> {
    shifts
        .iter()
        .map(|&shift| shift_image(&image.view(), shift))
        .collect()
}

/// Noiseless synthesized observations of a point source
pub struct SyntheticStack {
    pub reference: Array2<f64>,
    pub frames: Vec<Array2<f64>>,
}

/// Synthesize a `size` x `size` frame per tip/tilt through the full
/// simulator chain with a Gaussian seeing PSF and noise disabled.
pub fn synthesize_stack(size: usize, seeing_sigma: f64, tip_tilt: &[(f64, f64)]) -> SyntheticStack {
    let buffer = 8;
    let padded = size + 2 * buffer;
    let mut truth = Array2::<f64>::zeros((padded, padded));
    truth[[padded / 2, padded / 2]] = 1.0e6;

    let kernel_size = 2 * (4.0 * seeing_sigma).ceil() as usize + 1;
    let psf = gaussian_kernel(kernel_size, seeing_sigma);
    let config = LuckyFrameConfig {
        scale_factor: 1.0,
        exposure_time_s: 1.0,
        final_size: (size, size),
        gain: 1.0,
        saturation: f64::INFINITY,
    };

    let frame = |shift: (f64, f64)| {
        synthesize_frame(
            &truth.view(),
            &psf.view(),
            None,
            shift,
            &config,
            FrameNoise::Disabled,
        )
        .expect("synthesis succeeds")
    };

    SyntheticStack {
        reference: frame((0.0, 0.0)),
        frames: tip_tilt.iter().map(|&shift| frame(shift)).collect(),
    }
}
