//! Fourier Amplitude Selection.
//!
//! Frames that are already registered to a common reference are tapered at
//! their edges and transformed. Every frequency inside a low-frequency disc
//! takes the `k` frames with the largest amplitude at that frequency; the
//! remaining frequencies all take the same `k` frames, those with the
//! brightest pixel. The retained complex values are averaged and inverse
//! transformed, and the magnitude of the result is the reconstruction.
//!
//! Every spectrum must exist before any frequency can be ranked, so work is
//! split per frame for the transforms and per row of the frequency plane
//! for the selection.

use log::debug;
use ndarray::{Array1, Array2};
use rustfft::num_complex::Complex64;
use shared::algo::Executor;
use shared::image_proc::{
    border_leaves_interior, edge_ramp, fft2, fftshift, gaussian_smooth, ifft2, ifftshift, peak_pixel,
};

use crate::config::FasConfig;
use crate::error::{ConfigError, Result};

/// Number of frames kept per frequency, `round(r * n)` clamped to `[1, n]`.
///
/// Halves round to even.
pub fn frames_to_keep(selection_fraction: f64, n: usize) -> usize {
    let k = (selection_fraction * n as f64).round_ties_even();
    if k.is_finite() && k >= 1.0 {
        (k as usize).min(n)
    } else {
        1
    }
}

/// Transform of one edge-tapered frame
struct FrameSpectrum {
    /// Centred complex spectrum
    spectrum: Array2<Complex64>,
    /// Ranking amplitudes, optionally smoothed
    amplitude: Array2<f64>,
    /// Brightest pixel of the tapered frame
    peak: f64,
}

impl FrameSpectrum {
    fn compute(frame: &Array2<f64>, config: &FasConfig, parallel: bool) -> Self {
        let ramped = edge_ramp(&frame.view(), config.edge_buffer);
        let peak = peak_pixel(&ramped.view())
            .map(|p| p.value)
            .unwrap_or(f64::NEG_INFINITY);
        let spectrum = fftshift(&fft2(&ramped.view()).view());
        let amplitude = spectrum.mapv(|c| c.norm());
        let amplitude = gaussian_smooth(&amplitude.view(), config.smoothing_sigma, parallel);
        Self {
            spectrum,
            amplitude,
            peak,
        }
    }
}

/// Indices of `values` ordered by descending value; equal values keep
/// their input order.
fn ranked_desc(values: impl Iterator<Item = f64>) -> Vec<usize> {
    let values: Vec<f64> = values.collect();
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    order
}

fn check_inputs(frames: &[&Array2<f64>], selection_fraction: f64, config: &FasConfig) -> Result<()> {
    let first = frames.first().ok_or(ConfigError::InsufficientFrames(0))?;
    let expected = first.dim();
    if let Some((index, frame)) = frames.iter().enumerate().find(|(_, f)| f.dim() != expected) {
        return Err(ConfigError::FrameShapeMismatch {
            index,
            found: frame.dim(),
            expected,
        }
        .into());
    }
    let (h, w) = expected;
    if h == 0 || w == 0 {
        return Err(ConfigError::invalid("frame shape", format!("{expected:?}")).into());
    }
    if !(selection_fraction.is_finite() && selection_fraction > 0.0 && selection_fraction <= 1.0) {
        return Err(ConfigError::invalid(
            "selection fraction",
            format!("{selection_fraction} is outside (0, 1]"),
        )
        .into());
    }
    if !border_leaves_interior(config.edge_buffer, expected) {
        return Err(ConfigError::invalid(
            "FAS edge buffer",
            format!("{} leaves no pixels in {expected:?}", config.edge_buffer),
        )
        .into());
    }
    if !(config.cutoff_fraction.is_finite() && config.cutoff_fraction >= 0.0) {
        return Err(ConfigError::invalid("FAS cutoff fraction", config.cutoff_fraction.to_string()).into());
    }
    if !(config.smoothing_sigma.is_finite() && config.smoothing_sigma >= 0.0) {
        return Err(ConfigError::invalid("FAS smoothing sigma", config.smoothing_sigma.to_string()).into());
    }
    Ok(())
}

/// Combine registered `frames` by Fourier Amplitude Selection.
///
/// # Arguments
/// * `frames` - Registered frames sharing one shape
/// * `selection_fraction` - Fraction of frames kept per frequency, in (0, 1]
/// * `config` - Edge taper, cutoff disc, smoothing and outside-disc options
/// * `executor` - Sequential or pooled scheduling; results are identical
pub fn fourier_amplitude_selection(
    frames: &[&Array2<f64>],
    selection_fraction: f64,
    config: &FasConfig,
    executor: &Executor,
) -> Result<Array2<f64>> {
    check_inputs(frames, selection_fraction, config)?;
    let (h, w) = frames[0].dim();
    let n = frames.len();
    let k = frames_to_keep(selection_fraction, n);

    let spectra = executor.map(frames, |frame| {
        FrameSpectrum::compute(frame, config, executor.is_parallel())
    });

    let radius = (config.cutoff_fraction * h.min(w) as f64).round_ties_even();
    let inside_disc = |i: usize, j: usize| {
        let u = j as f64 - (w / 2) as f64;
        let v = i as f64 - (h / 2) as f64;
        u.hypot(v) < radius
    };

    let outside_frames: Vec<usize> = if config.use_outside_cutoff_selection {
        let mut ranked = ranked_desc(spectra.iter().map(|s| s.peak));
        ranked.truncate(k);
        ranked
    } else {
        Vec::new()
    };
    debug!(
        "FAS over {n} frames of {h}x{w}: keeping {k} per frequency, disc radius {radius}, \
         outside frames {outside_frames:?}"
    );

    let rows = executor.map_range(h, |i| {
        (0..w)
            .map(|j| {
                if inside_disc(i, j) {
                    let mut ranked = ranked_desc(spectra.iter().map(|s| s.amplitude[[i, j]]));
                    ranked.truncate(k);
                    ranked.iter().map(|&f| spectra[f].spectrum[[i, j]]).sum::<Complex64>()
                } else {
                    outside_frames
                        .iter()
                        .map(|&f| spectra[f].spectrum[[i, j]])
                        .sum::<Complex64>()
                }
            })
            .collect::<Array1<Complex64>>()
    });

    let mut selected = Array2::<Complex64>::zeros((h, w));
    for (i, row) in rows.iter().enumerate() {
        selected.row_mut(i).assign(row);
    }
    selected.mapv_inplace(|c| c / k as f64);

    let image = ifft2(&ifftshift(&selected.view()).view());
    Ok(image.mapv(|c| c.norm()))
}
