//! Short-exposure ("lucky") frame synthesis.
//!
//! A frame is built from a truth image in count-rate units:
//!
//! 1. convolve with the (normalised) PSF at the truth plate scale
//! 2. optionally add a star image at the same plate scale
//! 3. resample to the detector plate scale, conserving flux
//! 4. apply the tip/tilt shift
//! 5. crop the edge buffer away to the detector size
//! 6. convert count rates to integer counts over the exposure
//! 7. multiply by the detector gain
//! 8. add pre-gain background and post-gain read noise
//! 9. clip to `[0, saturation]`
//!
//! The edge buffer absorbs the tip/tilt shift; if the shift exceeds it the
//! shifted image is clipped at its border and a warning is logged.

use log::{debug, warn};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use shared::image_proc::fft::fft_convolve_same;
use shared::image_proc::noise::apply_poisson_photon_noise;
use shared::image_proc::transform::{centre_crop, resample_conserving_sum, shift_image};

use crate::error::SimError;
use crate::hardware::DetectorConfig;
use crate::noise_model::{NoiseFrames, NoiseParameters};

/// Exposure and detector settings shared by every frame of a stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuckyFrameConfig {
    /// Truth plate scale divided by detector plate scale
    pub scale_factor: f64,
    pub exposure_time_s: f64,
    /// Detector frame size (rows, cols)
    pub final_size: (usize, usize),
    pub gain: f64,
    pub saturation: f64,
}

impl LuckyFrameConfig {
    /// Take gain and saturation from a detector model
    pub fn for_detector(
        detector: &DetectorConfig,
        scale_factor: f64,
        exposure_time_s: f64,
        final_size: (usize, usize),
    ) -> Self {
        Self {
            scale_factor,
            exposure_time_s,
            final_size,
            gain: detector.gain,
            saturation: detector.saturation,
        }
    }

    fn validate(&self) -> Result<(), SimError> {
        if !(self.scale_factor.is_finite() && self.scale_factor > 0.0) {
            return Err(SimError::invalid("scale factor", self.scale_factor.to_string()));
        }
        if !(self.exposure_time_s.is_finite() && self.exposure_time_s >= 0.0) {
            return Err(SimError::invalid(
                "exposure time",
                format!("{} s", self.exposure_time_s),
            ));
        }
        if !(self.gain.is_finite() && self.gain > 0.0) {
            return Err(SimError::invalid("gain", self.gain.to_string()));
        }
        if self.saturation.is_nan() || self.saturation < 0.0 {
            return Err(SimError::invalid("saturation", self.saturation.to_string()));
        }
        if self.final_size.0 == 0 || self.final_size.1 == 0 {
            return Err(SimError::invalid("final size", format!("{:?}", self.final_size)));
        }
        Ok(())
    }
}

/// Noise treatment for a synthesized frame
#[derive(Debug, Clone, Copy)]
pub enum FrameNoise<'a> {
    /// Expected counts rounded to integers, no background or read noise
    Disabled,
    /// Rounded expected counts plus a pre-generated noise realization
    Supplied(&'a NoiseFrames),
    /// Poisson shot noise plus freshly sampled background and read noise
    Sampled {
        params: &'a NoiseParameters,
        rng_seed: Option<u64>,
    },
}

fn check_noise_shape(
    which: &'static str,
    frame: &Array2<f64>,
    expected: (usize, usize),
) -> Result<(), SimError> {
    if frame.dim() != expected {
        return Err(SimError::NoiseShapeMismatch {
            which,
            found: frame.dim(),
            expected,
        });
    }
    Ok(())
}

/// Synthesize one short-exposure frame.
///
/// # Arguments
/// * `truth` - Truth image in e-/s at the PSF plate scale
/// * `psf` - Normalised PSF kernel at the same plate scale
/// * `star` - Optional star image in e-/s, same shape as `truth`
/// * `tip_tilt` - (row, col) image motion in detector pixels
/// * `config` - Exposure and detector settings
/// * `noise` - Noise treatment
///
/// # Returns
/// A `config.final_size` frame in counts, clipped to `[0, saturation]`.
/// Deterministic unless `noise` is [`FrameNoise::Sampled`] without a seed.
pub fn synthesize_frame(
    truth: &ArrayView2<f64>,
    psf: &ArrayView2<f64>,
    star: Option<&ArrayView2<f64>>,
    tip_tilt: (f64, f64),
    config: &LuckyFrameConfig,
    noise: FrameNoise<'_>,
) -> Result<Array2<f64>, SimError> {
    config.validate()?;

    let mut convolved = fft_convolve_same(truth, psf);
    if let Some(star) = star {
        if star.dim() != convolved.dim() {
            return Err(SimError::StarShapeMismatch {
                star: star.dim(),
                convolved: convolved.dim(),
            });
        }
        convolved += star;
    }

    let resized = resample_conserving_sum(&convolved.view(), config.scale_factor);
    let (rh, rw) = resized.dim();
    let (fh, fw) = config.final_size;
    if fh > rh || fw > rw {
        return Err(SimError::OutputLargerThanImage {
            requested: config.final_size,
            available: (rh, rw),
        });
    }

    let edge_buffer = ((rh - fh) / 2).min((rw - fw) / 2) as f64;
    let excursion = tip_tilt.0.abs().max(tip_tilt.1.abs());
    if excursion > edge_buffer {
        warn!(
            "Tip/tilt of {:.2} px exceeds the {:.0} px edge buffer; shifted image will be clipped",
            excursion, edge_buffer
        );
    }

    let shifted = shift_image(&resized.view(), tip_tilt);
    let cropped = centre_crop(&shifted.view(), config.final_size);
    let expected = cropped.mapv(|rate| rate * config.exposure_time_s);
    debug!(
        "Synthesized frame {:?}: expected total {:.1} e-, tip/tilt ({:.2}, {:.2})",
        config.final_size,
        expected.sum(),
        tip_tilt.0,
        tip_tilt.1
    );

    let rounded = || expected.mapv(|n| n.round().max(0.0));
    let mut frame = match noise {
        FrameNoise::Disabled => rounded() * config.gain,
        FrameNoise::Supplied(frames) => {
            check_noise_shape("pre-gain", &frames.pre_gain, config.final_size)?;
            check_noise_shape("post-gain", &frames.post_gain, config.final_size)?;
            rounded() * config.gain + &frames.pre_gain + &frames.post_gain
        }
        FrameNoise::Sampled { params, rng_seed } => {
            let shot_seed = rng_seed.map(|s| s.wrapping_mul(0x9E37_79B9_7F4A_7C15));
            let counts = apply_poisson_photon_noise(&expected.view(), shot_seed);
            let frames = params.sample_frames(config.final_size, config.gain, rng_seed)?;
            counts * config.gain + &frames.pre_gain + &frames.post_gain
        }
    };

    frame.mapv_inplace(|v| v.clamp(0.0, config.saturation));
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sims::gaussian_star;
    use approx::assert_relative_eq;

    fn delta_psf() -> Array2<f64> {
        let mut psf = Array2::zeros((3, 3));
        psf[[1, 1]] = 1.0;
        psf
    }

    fn config(final_size: (usize, usize)) -> LuckyFrameConfig {
        LuckyFrameConfig {
            scale_factor: 1.0,
            exposure_time_s: 1.0,
            final_size,
            gain: 1.0,
            saturation: f64::INFINITY,
        }
    }

    #[test]
    fn test_noiseless_frame_is_cropped_truth() {
        let truth = gaussian_star((40, 40), (20.0, 20.0), 1000.0, 2.0);
        let frame = synthesize_frame(
            &truth.view(),
            &delta_psf().view(),
            None,
            (0.0, 0.0),
            &config((32, 32)),
            FrameNoise::Disabled,
        )
        .unwrap();

        assert_eq!(frame.dim(), (32, 32));
        assert_relative_eq!(frame[[16, 16]], 1000.0);
        assert!(frame.iter().all(|v| v.fract() == 0.0));
    }

    #[test]
    fn test_tip_tilt_moves_content() {
        let truth = gaussian_star((40, 40), (20.0, 20.0), 1000.0, 2.0);
        let frame = synthesize_frame(
            &truth.view(),
            &delta_psf().view(),
            None,
            (2.0, -3.0),
            &config((32, 32)),
            FrameNoise::Disabled,
        )
        .unwrap();

        let peak = shared::image_proc::peak_pixel(&frame.view()).unwrap();
        assert_eq!((peak.row, peak.col), (18, 13));
    }

    #[test]
    fn test_gain_and_saturation() {
        let truth = Array2::from_elem((8, 8), 10.0);
        let mut cfg = config((8, 8));
        cfg.gain = 5.0;
        cfg.saturation = 30.0;
        let frame = synthesize_frame(
            &truth.view(),
            &delta_psf().view(),
            None,
            (0.0, 0.0),
            &cfg,
            FrameNoise::Disabled,
        )
        .unwrap();
        assert!(frame.iter().all(|v| *v == 30.0));
    }

    #[test]
    fn test_supplied_noise_is_added_and_clipped() {
        let truth = Array2::from_elem((4, 4), 2.0);
        let frames = NoiseFrames {
            pre_gain: Array2::from_elem((4, 4), 1.0),
            post_gain: Array2::from_elem((4, 4), -10.0),
        };
        let frame = synthesize_frame(
            &truth.view(),
            &delta_psf().view(),
            None,
            (0.0, 0.0),
            &config((4, 4)),
            FrameNoise::Supplied(&frames),
        )
        .unwrap();
        assert!(frame.iter().all(|v| *v == 0.0));

        let wrong = NoiseFrames {
            pre_gain: Array2::zeros((3, 4)),
            post_gain: Array2::zeros((4, 4)),
        };
        assert!(matches!(
            synthesize_frame(
                &truth.view(),
                &delta_psf().view(),
                None,
                (0.0, 0.0),
                &config((4, 4)),
                FrameNoise::Supplied(&wrong),
            ),
            Err(SimError::NoiseShapeMismatch { which: "pre-gain", .. })
        ));
    }

    #[test]
    fn test_star_shape_checked() {
        let truth = Array2::zeros((10, 10));
        let star = Array2::zeros((9, 10));
        let result = synthesize_frame(
            &truth.view(),
            &delta_psf().view(),
            Some(&star.view()),
            (0.0, 0.0),
            &config((8, 8)),
            FrameNoise::Disabled,
        );
        assert!(matches!(result, Err(SimError::StarShapeMismatch { .. })));
    }

    #[test]
    fn test_output_larger_than_image() {
        let truth = Array2::zeros((10, 10));
        let result = synthesize_frame(
            &truth.view(),
            &delta_psf().view(),
            None,
            (0.0, 0.0),
            &config((12, 12)),
            FrameNoise::Disabled,
        );
        assert!(matches!(result, Err(SimError::OutputLargerThanImage { .. })));
    }

    #[test]
    fn test_sampled_noise_is_seeded() {
        let truth = gaussian_star((24, 24), (12.0, 12.0), 300.0, 1.5);
        let params = NoiseParameters {
            band: crate::noise_model::Band::H,
            exposure_time_s: 1.0,
            source: 300.0,
            sky: 20.0,
            dark: 1.0,
            cryostat: 0.5,
            read_noise: 4.0,
        };
        let run = || {
            synthesize_frame(
                &truth.view(),
                &delta_psf().view(),
                None,
                (0.0, 0.0),
                &config((20, 20)),
                FrameNoise::Sampled {
                    params: &params,
                    rng_seed: Some(99),
                },
            )
            .unwrap()
        };
        let a = run();
        assert_eq!(a, run());
        assert!(a.iter().all(|v| *v >= 0.0));
        assert!(a[[10, 10]] > 200.0);
    }
}
