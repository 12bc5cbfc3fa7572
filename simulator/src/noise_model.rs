//! Exposure noise budget for near-infrared lucky imaging.
//!
//! An [`ExposureNoiseModel`] stores per-pixel electron rates for the source
//! and each background term in every supported band. Evaluating it for an
//! exposure time yields [`NoiseParameters`]: expected counts for the Poisson
//! terms and the read-noise variance. The same parameters are reused for
//! every frame in a stack so all frames share one noise level.
//!
//! # Signal-to-noise
//!
//! ```text
//! SNR = N_source / sqrt(N_source + N_dark + N_cryo + N_sky + N_RN)
//! ```
//!
//! with `N_x = rate_x * t_exp` and `N_RN = read_noise^2`.

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{thread_rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use shared::image_proc::noise::{gaussian_field, poisson_field};

use crate::error::SimError;
use crate::hardware::DetectorConfig;

/// Near-infrared imaging band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    J,
    H,
    K,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Band::J => "J",
            Band::H => "H",
            Band::K => "K",
        };
        f.write_str(name)
    }
}

impl FromStr for Band {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "J" => Ok(Band::J),
            "H" => Ok(Band::H),
            "K" | "KS" => Ok(Band::K),
            other => Err(SimError::invalid("band", format!("unknown band '{other}'"))),
        }
    }
}

/// Electron rates per pixel for one band (e-/s)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandRates {
    pub source: f64,
    pub sky: f64,
    pub cryostat: f64,
}

/// Expected counts for one exposure.
///
/// All fields except `read_noise` are Poisson means in electrons;
/// `read_noise` is the read-noise variance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseParameters {
    pub band: Band,
    pub exposure_time_s: f64,
    pub source: f64,
    pub sky: f64,
    pub dark: f64,
    pub cryostat: f64,
    pub read_noise: f64,
}

/// Pre-generated noise for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseFrames {
    /// Background counts already multiplied by the detector gain
    pub pre_gain: Array2<f64>,
    /// Zero-mean read noise added after gain
    pub post_gain: Array2<f64>,
}

impl NoiseParameters {
    /// Per-pixel signal-to-noise ratio
    pub fn snr(&self) -> f64 {
        let variance = self.source + self.dark + self.cryostat + self.sky + self.read_noise;
        if variance > 0.0 {
            self.source / variance.sqrt()
        } else {
            0.0
        }
    }

    pub fn sigma_source(&self) -> f64 {
        self.source.sqrt()
    }

    pub fn sigma_sky(&self) -> f64 {
        self.sky.sqrt()
    }

    pub fn sigma_dark(&self) -> f64 {
        self.dark.sqrt()
    }

    pub fn sigma_cryostat(&self) -> f64 {
        self.cryostat.sqrt()
    }

    pub fn sigma_read_noise(&self) -> f64 {
        self.read_noise.sqrt()
    }

    /// Mean background counts per pixel before gain (sky + dark + cryostat)
    pub fn background(&self) -> f64 {
        self.sky + self.dark + self.cryostat
    }

    /// Draw one frame of background and read noise.
    ///
    /// The pre-gain frame is a Poisson realization of the combined sky, dark
    /// and cryostat counts multiplied by `gain`; the post-gain frame is
    /// zero-mean Gaussian read noise.
    pub fn sample_frames(
        &self,
        shape: (usize, usize),
        gain: f64,
        rng_seed: Option<u64>,
    ) -> Result<NoiseFrames, SimError> {
        let mut seeds = StdRng::seed_from_u64(rng_seed.unwrap_or_else(|| thread_rng().next_u64()));

        let pre_gain = poisson_field(shape, self.background(), Some(seeds.next_u64())) * gain;
        let post_gain = gaussian_field(shape, 0.0, self.sigma_read_noise(), Some(seeds.next_u64()))
            .map_err(|e| SimError::invalid("read noise", e.to_string()))?;

        Ok(NoiseFrames {
            pre_gain,
            post_gain,
        })
    }
}

/// Anything that can produce a noise budget for an exposure
pub trait NoiseModel {
    fn compute_noise(&self, band: Band, exposure_time_s: f64) -> Result<NoiseParameters, SimError>;
}

/// Rate-based noise budget for a telescope/detector/cryostat combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureNoiseModel {
    pub name: String,
    pub j: BandRates,
    pub h: BandRates,
    pub k: BandRates,
    /// Dark current in e-/s/px
    pub dark_current_e_per_s: f64,
    /// Read noise RMS in electrons
    pub read_noise_e: f64,
}

impl ExposureNoiseModel {
    /// Combine band rates with the detector's dark current and read noise
    pub fn for_detector(
        name: impl Into<String>,
        detector: &DetectorConfig,
        j: BandRates,
        h: BandRates,
        k: BandRates,
    ) -> Self {
        Self {
            name: name.into(),
            j,
            h,
            k,
            dark_current_e_per_s: detector.dark_current_e_per_s,
            read_noise_e: detector.read_noise_e,
        }
    }

    pub fn rates(&self, band: Band) -> &BandRates {
        match band {
            Band::J => &self.j,
            Band::H => &self.h,
            Band::K => &self.k,
        }
    }
}

impl NoiseModel for ExposureNoiseModel {
    fn compute_noise(&self, band: Band, exposure_time_s: f64) -> Result<NoiseParameters, SimError> {
        if !(exposure_time_s.is_finite() && exposure_time_s >= 0.0) {
            return Err(SimError::invalid(
                "exposure time",
                format!("{exposure_time_s} s"),
            ));
        }
        let rates = self.rates(band);
        Ok(NoiseParameters {
            band,
            exposure_time_s,
            source: rates.source * exposure_time_s,
            sky: rates.sky * exposure_time_s,
            dark: self.dark_current_e_per_s * exposure_time_s,
            cryostat: rates.cryostat * exposure_time_s,
            read_noise: self.read_noise_e * self.read_noise_e,
        })
    }
}

/// Standard noise budgets
pub mod models {
    use super::*;
    use crate::hardware::detector::models::SAPHIRA;

    /// SAPHIRA behind the ANU 2.3m for a 19 mag/arcsec^2 AB source.
    ///
    /// J and H skies are OH dominated; K is dominated by thermal emission
    /// from the sky and telescope.
    pub static SAPHIRA_ANU_2_3M: Lazy<ExposureNoiseModel> = Lazy::new(|| {
        ExposureNoiseModel::for_detector(
            "SAPHIRA @ ANU 2.3m",
            &SAPHIRA,
            BandRates {
                source: 127.0,
                sky: 52.0,
                cryostat: 0.02,
            },
            BandRates {
                source: 142.0,
                sky: 196.0,
                cryostat: 0.02,
            },
            BandRates {
                source: 108.0,
                sky: 1_350.0,
                cryostat: 0.02,
            },
        )
    });
}
