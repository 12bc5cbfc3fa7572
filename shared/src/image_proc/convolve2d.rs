//! Direct 2D convolution for ndarray images
//!
//! Small kernels (PSF blurs, amplitude smoothing) are applied directly
//! rather than through the FFT path, with optional rayon parallelism over
//! output pixels.

use ndarray::{Array2, ArrayView2, Zip};

/// Options for controlling the convolution operation
#[derive(Debug, Clone, Copy)]
pub struct ConvolveOptions {
    /// Whether to spread output pixels over the rayon pool
    pub parallel: bool,

    /// Controls how edges are handled
    pub edge_mode: EdgeMode,
}

impl Default for ConvolveOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            edge_mode: EdgeMode::Constant(0.0),
        }
    }
}

/// Edge handling modes for convolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeMode {
    /// Uses a constant value for pixels outside image bounds
    Constant(f64),

    /// Mirrors about the outer pixel edge (`d c b a | a b c d | d c b a`)
    Reflect,

    /// Wraps around to the other side of the image
    Wrap,

    /// Extends the edge pixels outward
    Extend,
}

/// Convolve a 2D image with a kernel centred on `(kh / 2, kw / 2)`.
///
/// Output has the shape of `input`. The kernel is applied without flipping,
/// which is identical to convolution for the symmetric kernels used here.
pub fn convolve2d(
    input: &ArrayView2<f64>,
    kernel: &ArrayView2<f64>,
    options: ConvolveOptions,
) -> Array2<f64> {
    let (rows, cols) = input.dim();
    let (kernel_rows, kernel_cols) = kernel.dim();
    let kr = kernel_rows / 2;
    let kc = kernel_cols / 2;

    let mut output = Array2::zeros((rows, cols));
    if rows == 0 || cols == 0 {
        return output;
    }

    let pixel = |i: usize, j: usize| -> f64 {
        let mut sum = 0.0;
        for ki in 0..kernel_rows {
            for kj in 0..kernel_cols {
                let ii = i as isize + ki as isize - kr as isize;
                let jj = j as isize + kj as isize - kc as isize;
                sum += get_pixel(input, ii, jj, options.edge_mode) * kernel[[ki, kj]];
            }
        }
        sum
    };

    if options.parallel {
        Zip::indexed(&mut output).par_for_each(|(i, j), out| *out = pixel(i, j));
    } else {
        Zip::indexed(&mut output).for_each(|(i, j), out| *out = pixel(i, j));
    }
    output
}

fn get_pixel(input: &ArrayView2<f64>, i: isize, j: isize, edge_mode: EdgeMode) -> f64 {
    let (rows, cols) = input.dim();
    let (rows, cols) = (rows as isize, cols as isize);
    if i >= 0 && i < rows && j >= 0 && j < cols {
        return input[[i as usize, j as usize]];
    }

    let (ri, rj) = match edge_mode {
        EdgeMode::Constant(value) => return value,
        EdgeMode::Reflect => (reflect_index(i, rows), reflect_index(j, cols)),
        EdgeMode::Wrap => (i.rem_euclid(rows), j.rem_euclid(cols)),
        EdgeMode::Extend => (i.clamp(0, rows - 1), j.clamp(0, cols - 1)),
    };
    input[[ri as usize, rj as usize]]
}

// Half-sample symmetric reflection, folded until in range for kernels
// wider than the image
fn reflect_index(idx: isize, size: isize) -> isize {
    let period = 2 * size;
    let folded = idx.rem_euclid(period);
    if folded < size {
        folded
    } else {
        period - folded - 1
    }
}

/// Create a normalised Gaussian kernel
///
/// A sigma that is not positive and finite gives a delta kernel.
///
/// # Arguments
///
/// * `size` - Kernel size (must be odd)
/// * `sigma` - Standard deviation of the Gaussian in pixels
pub fn gaussian_kernel(size: usize, sigma: f64) -> Array2<f64> {
    assert!(size % 2 == 1, "Kernel size must be odd");

    if !(sigma.is_finite() && sigma > 0.0) {
        let mut delta = Array2::zeros((size, size));
        delta[[size / 2, size / 2]] = 1.0;
        return delta;
    }

    let centre = (size / 2) as f64;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel = Array2::from_shape_fn((size, size), |(i, j)| {
        let y = i as f64 - centre;
        let x = j as f64 - centre;
        (-(x * x + y * y) / two_sigma_sq).exp()
    });

    let sum = kernel.sum();
    if sum > 0.0 {
        kernel.mapv_inplace(|v| v / sum);
    }
    kernel
}

/// Gaussian blur with reflected edges.
///
/// The kernel is truncated at `int(4 * sigma + 0.5)` pixels. A non-positive
/// sigma returns the input unchanged.
pub fn gaussian_smooth(image: &ArrayView2<f64>, sigma: f64, parallel: bool) -> Array2<f64> {
    if sigma <= 0.0 {
        return image.to_owned();
    }
    let radius = (4.0 * sigma + 0.5) as usize;
    let kernel = gaussian_kernel(2 * radius + 1, sigma);
    convolve2d(
        image,
        &kernel.view(),
        ConvolveOptions {
            parallel,
            edge_mode: EdgeMode::Reflect,
        },
    )
}
