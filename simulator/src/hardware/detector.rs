//! Detector configuration for frame synthesis.
//!
//! A lucky imaging camera is characterised by a handful of numbers: the
//! pixel pitch (which together with the telescope focal length sets the
//! plate scale), the avalanche/EM gain applied to detected electrons, the
//! full-well saturation after gain, and the noise terms that feed the
//! exposure noise budget.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::telescope::TelescopeConfig;

/// Detector parameters used by the simulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Name/model of the detector
    pub name: String,
    /// Width of detector in pixels
    pub width_px: usize,
    /// Height of detector in pixels
    pub height_px: usize,
    /// Pixel pitch in microns
    pub pixel_size_um: f64,
    /// Mean gain applied to detected electrons
    pub gain: f64,
    /// Saturation level in output counts (after gain)
    pub saturation: f64,
    /// Read noise RMS in electrons
    pub read_noise_e: f64,
    /// Dark current in electrons per pixel per second
    pub dark_current_e_per_s: f64,
    /// Flat quantum efficiency over the passband
    pub quantum_efficiency: f64,
}

impl DetectorConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        width_px: usize,
        height_px: usize,
        pixel_size_um: f64,
        gain: f64,
        saturation: f64,
        read_noise_e: f64,
        dark_current_e_per_s: f64,
        quantum_efficiency: f64,
    ) -> Self {
        Self {
            name: name.into(),
            width_px,
            height_px,
            pixel_size_um,
            gain,
            saturation,
            read_noise_e,
            dark_current_e_per_s,
            quantum_efficiency,
        }
    }

    /// Pixel pitch in metres
    pub fn pixel_size_m(&self) -> f64 {
        self.pixel_size_um * 1e-6
    }

    /// Angular size of one pixel behind the given telescope, in arcseconds
    pub fn plate_scale_arcsec_per_px(&self, telescope: &TelescopeConfig) -> f64 {
        telescope.plate_scale_arcsec_per_mm() * self.pixel_size_um * 1e-3
    }

    /// Read noise variance in electrons squared
    pub fn read_noise_variance(&self) -> f64 {
        self.read_noise_e * self.read_noise_e
    }
}

/// Standard detector models
pub mod models {
    use super::*;

    /// SAPHIRA HgCdTe avalanche photodiode array.
    ///
    /// Representative near-infrared values at a moderate avalanche gain.
    pub static SAPHIRA: Lazy<DetectorConfig> = Lazy::new(|| {
        DetectorConfig::new(
            "SAPHIRA",
            320,
            256,
            24.0,     // 24um pitch
            10.0,     // avalanche gain
            65_535.0, // 16-bit output
            9.0,      // read noise (e-)
            0.03,     // dark current (e-/s)
            0.8,      // QE
        )
    });
}
