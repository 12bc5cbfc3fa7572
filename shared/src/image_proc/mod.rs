//! Image processing primitives for lucky imaging simulation and reconstruction.
//!
//! # Module Organization
//!
//! - **fft**: 2D transforms, quadrant shifts and FFT-based convolution/correlation
//! - **transform**: sub-pixel shifting, centre cropping, edge ramps and resampling
//! - **convolve2d**: direct convolution with edge handling and Gaussian kernels
//! - **centroid**: peak-pixel search and thresholded first-moment centroids
//! - **gaussian_fit**: Levenberg-Marquardt fitting of 2D Gaussian profiles
//! - **noise**: Poisson and Gaussian noise fields for detector simulation
//!
//! All functions take array views and return freshly allocated arrays; no
//! input is ever modified in place.

pub mod centroid;
pub mod convolve2d;
pub mod fft;
pub mod gaussian_fit;
pub mod noise;
pub mod transform;

pub use centroid::{peak_pixel, thresholded_centroid, CentroidResult, PeakPixel};
pub use convolve2d::{convolve2d, gaussian_kernel, gaussian_smooth, ConvolveOptions, EdgeMode};
pub use fft::{cross_correlate_same, fft2, fft_convolve_same, fftshift, ifft2, ifftshift};
pub use gaussian_fit::{fit_gaussian_2d, centred_coordinates, FitError, FitOptions, Gaussian2D};
pub use transform::{
    border_leaves_interior, centre_crop, edge_ramp, pad_linear_ramp, resample_conserving_sum,
    shift_image,
};
