//! Telescope optical configuration for lucky imaging simulation.
//!
//! Provides the geometric quantities the frame synthesizer and the error
//! analyzer need: f-number, plate scale and diffraction-limited sampling.
//!
//! # Sampling
//!
//! A PSF sampled at the detector has Nyquist factor
//! `N = λ f_ratio / (2 l_px)`, where `l_px` is the pixel pitch. Either
//! quantity determines the other, so [`TelescopeConfig::psf_sampling`]
//! accepts exactly one of them.
//!
//! ```rust
//! use simulator::hardware::telescope::{TelescopeConfig, models::ANU_2_3M};
//!
//! let telescope = ANU_2_3M.clone();
//! let sampling = TelescopeConfig::psf_sampling(1.65e-6, 24e-6, Some(telescope.f_number()), None)
//!     .unwrap();
//! println!("f/{:.1}, Nyquist factor {:.2}", sampling.f_ratio, sampling.nyquist);
//! ```

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::SimError;

/// Arcseconds per radian
pub const ARCSEC_PER_RAD: f64 = 206_264.8;

/// Telescope optical system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelescopeConfig {
    /// Primary mirror diameter in meters (clear aperture)
    pub aperture_m: f64,
    /// Effective focal length in meters (including optical train)
    pub focal_length_m: f64,
    /// Total optical efficiency (0.0-1.0, includes all losses)
    pub light_efficiency: f64,
    /// Telescope model name or identifier
    pub name: String,
}

/// Resolved PSF sampling for a given wavelength and pixel pitch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PsfSampling {
    pub f_ratio: f64,
    /// Pixels per `λ f_ratio / 2`; 1.0 is Nyquist, larger is finer
    pub nyquist: f64,
}

impl TelescopeConfig {
    /// Create a new telescope configuration
    pub fn new(
        name: impl Into<String>,
        aperture_m: f64,
        focal_length_m: f64,
        light_efficiency: f64,
    ) -> Self {
        Self {
            name: name.into(),
            aperture_m,
            focal_length_m,
            light_efficiency,
        }
    }

    /// Get the f-number of the telescope
    pub fn f_number(&self) -> f64 {
        self.focal_length_m / self.aperture_m
    }

    /// Plate scale at the focal plane in arcseconds per mm
    pub fn plate_scale_arcsec_per_mm(&self) -> f64 {
        ARCSEC_PER_RAD / (self.focal_length_m * 1e3)
    }

    /// Diffraction-limited FWHM (`λ / D`) in arcseconds
    pub fn diffraction_limit_arcsec(&self, wavelength_m: f64) -> f64 {
        wavelength_m / self.aperture_m * ARCSEC_PER_RAD
    }

    /// Calculate the collecting area in square meters
    pub fn collecting_area_m2(&self) -> f64 {
        PI * (self.aperture_m / 2.0).powi(2)
    }

    /// Resolve PSF sampling from exactly one of an f-ratio or Nyquist factor.
    ///
    /// # Errors
    /// [`SimError::ConflictingSampling`] when both are given,
    /// [`SimError::MissingSampling`] when neither is, and
    /// [`SimError::InvalidParameter`] for non-positive inputs.
    pub fn psf_sampling(
        wavelength_m: f64,
        pixel_size_m: f64,
        f_ratio: Option<f64>,
        nyquist: Option<f64>,
    ) -> Result<PsfSampling, SimError> {
        if !(wavelength_m > 0.0) {
            return Err(SimError::invalid("wavelength", format!("{wavelength_m} m")));
        }
        if !(pixel_size_m > 0.0) {
            return Err(SimError::invalid("pixel size", format!("{pixel_size_m} m")));
        }

        match (f_ratio, nyquist) {
            (Some(_), Some(_)) => Err(SimError::ConflictingSampling),
            (None, None) => Err(SimError::MissingSampling),
            (Some(f), None) if f > 0.0 => Ok(PsfSampling {
                f_ratio: f,
                nyquist: wavelength_m * f / (2.0 * pixel_size_m),
            }),
            (None, Some(n)) if n > 0.0 => Ok(PsfSampling {
                f_ratio: 2.0 * n * pixel_size_m / wavelength_m,
                nyquist: n,
            }),
            (Some(f), None) => Err(SimError::invalid("f-ratio", f.to_string())),
            (None, Some(n)) => Err(SimError::invalid("Nyquist factor", n.to_string())),
        }
    }
}

/// Standard telescope models
pub mod models {
    use super::*;

    /// ANU 2.3m telescope at Siding Spring
    pub static ANU_2_3M: Lazy<TelescopeConfig> = Lazy::new(|| {
        TelescopeConfig::new(
            "ANU 2.3m", 2.3,      // 2.3m aperture
            41.55486, // effective focal length
            0.75,     // light efficiency
        )
    });
}
