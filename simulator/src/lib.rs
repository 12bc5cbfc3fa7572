//! Telescope, detector and noise simulation for lucky imaging
//!
//! This crate models the parts of the imaging chain that the reconstruction
//! code consumes: hardware parameters (plate scale, gain, saturation, PSF
//! sampling), the per-band exposure noise budget, tip/tilt sequences, and
//! the synthesis of individual short-exposure frames.

pub mod error;
pub mod hardware;
pub mod noise_model;
pub mod sims;

pub use error::SimError;
pub use hardware::{DetectorConfig, TelescopeConfig};
pub use noise_model::{Band, ExposureNoiseModel, NoiseFrames, NoiseModel, NoiseParameters};
pub use sims::lucky_frame::{synthesize_frame, FrameNoise, LuckyFrameConfig};
