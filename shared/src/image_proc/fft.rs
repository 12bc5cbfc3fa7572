//! Two-dimensional FFT helpers built on rustfft.
//!
//! Transforms run row-wise then column-wise over an `ndarray` buffer. The
//! inverse transform is normalised by `1 / (rows * cols)` so that
//! `ifft2(fft2(x)) == x` up to rounding.
//!
//! Linear convolution and correlation are zero padded to the full output
//! size, so there is no circular wrap-around between opposite image edges.

use ndarray::{s, Array2, ArrayView2, Zip};
use rustfft::num_complex::Complex64;
use rustfft::{FftDirection, FftPlanner};

fn transform_2d(mut data: Array2<Complex64>, direction: FftDirection) -> Array2<Complex64> {
    let (rows, cols) = data.dim();
    if rows == 0 || cols == 0 {
        return data;
    }

    let mut planner = FftPlanner::<f64>::new();
    let row_fft = planner.plan_fft(cols, direction);
    let col_fft = planner.plan_fft(rows, direction);
    let mut buffer: Vec<Complex64> = Vec::with_capacity(rows.max(cols));

    for mut row in data.rows_mut() {
        buffer.clear();
        buffer.extend(row.iter().copied());
        row_fft.process(&mut buffer);
        row.iter_mut().zip(&buffer).for_each(|(dst, src)| *dst = *src);
    }

    for mut col in data.columns_mut() {
        buffer.clear();
        buffer.extend(col.iter().copied());
        col_fft.process(&mut buffer);
        col.iter_mut().zip(&buffer).for_each(|(dst, src)| *dst = *src);
    }

    data
}

/// Forward 2D FFT of a real image
pub fn fft2(image: &ArrayView2<f64>) -> Array2<Complex64> {
    transform_2d(image.mapv(|v| Complex64::new(v, 0.0)), FftDirection::Forward)
}

/// Normalised inverse 2D FFT
pub fn ifft2(spectrum: &ArrayView2<Complex64>) -> Array2<Complex64> {
    let (rows, cols) = spectrum.dim();
    let mut out = transform_2d(spectrum.to_owned(), FftDirection::Inverse);
    let norm = 1.0 / (rows * cols).max(1) as f64;
    out.mapv_inplace(|c| c * norm);
    out
}

/// Move the zero-frequency term to the centre.
///
/// After the shift, DC sits at index `(rows / 2, cols / 2)`.
pub fn fftshift<T: Clone>(data: &ArrayView2<T>) -> Array2<T> {
    let (rows, cols) = data.dim();
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        data[[(i + rows - rows / 2) % rows, (j + cols - cols / 2) % cols]].clone()
    })
}

/// Inverse of [`fftshift`] for both even and odd sizes
pub fn ifftshift<T: Clone>(data: &ArrayView2<T>) -> Array2<T> {
    let (rows, cols) = data.dim();
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        data[[(i + rows / 2) % rows, (j + cols / 2) % cols]].clone()
    })
}

/// Full linear convolution, output shape `(ah + bh - 1, aw + bw - 1)`
fn convolve_full(a: &ArrayView2<f64>, b: &ArrayView2<f64>) -> Array2<f64> {
    let (ah, aw) = a.dim();
    let (bh, bw) = b.dim();
    let (fh, fw) = (ah + bh - 1, aw + bw - 1);

    let mut padded_a = Array2::<Complex64>::zeros((fh, fw));
    padded_a
        .slice_mut(s![..ah, ..aw])
        .zip_mut_with(a, |dst, &v| *dst = Complex64::new(v, 0.0));
    let mut padded_b = Array2::<Complex64>::zeros((fh, fw));
    padded_b
        .slice_mut(s![..bh, ..bw])
        .zip_mut_with(b, |dst, &v| *dst = Complex64::new(v, 0.0));

    let mut product = transform_2d(padded_a, FftDirection::Forward);
    let spectrum_b = transform_2d(padded_b, FftDirection::Forward);
    Zip::from(&mut product)
        .and(&spectrum_b)
        .for_each(|p, &q| *p *= q);

    let norm = 1.0 / (fh * fw) as f64;
    transform_2d(product, FftDirection::Inverse).mapv(|c| c.re * norm)
}

/// FFT convolution cropped to the shape of `image`, kernel centred.
///
/// The output window starts at `((kh - 1) / 2, (kw - 1) / 2)` of the full
/// convolution, so an odd kernel centred on its middle pixel leaves the
/// image registration unchanged.
pub fn fft_convolve_same(image: &ArrayView2<f64>, kernel: &ArrayView2<f64>) -> Array2<f64> {
    let (h, w) = image.dim();
    let (kh, kw) = kernel.dim();
    if h == 0 || w == 0 || kh == 0 || kw == 0 {
        return Array2::zeros((h, w));
    }

    let full = convolve_full(image, kernel);
    let (r0, c0) = ((kh - 1) / 2, (kw - 1) / 2);
    full.slice(s![r0..r0 + h, c0..c0 + w]).to_owned()
}

/// Cross-correlation of `frame` against `reference`, same shape as `reference`.
///
/// Computed as the convolution of the reference with the flipped frame. If
/// `frame` equals `reference` translated by `(dr, dc)`, the correlation
/// peak lands at `(h / 2 - dr, w / 2 - dc)`; zero lag sits at `(h / 2, w / 2)`.
pub fn cross_correlate_same(reference: &ArrayView2<f64>, frame: &ArrayView2<f64>) -> Array2<f64> {
    let flipped = frame.slice(s![..;-1, ..;-1]);
    fft_convolve_same(reference, &flipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr2;

    #[test]
    fn test_fft_roundtrip() {
        let image = Array2::from_shape_fn((6, 5), |(i, j)| (i * 7 + j * 3) as f64 % 5.0);
        let back = ifft2(&fft2(&image.view()).view());
        for (a, b) in image.iter().zip(back.iter()) {
            assert_abs_diff_eq!(*a, b.re, epsilon = 1e-10);
            assert_abs_diff_eq!(b.im, 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_dc_term_is_sum() {
        let image = Array2::from_elem((4, 4), 2.5);
        let spectrum = fft2(&image.view());
        assert_abs_diff_eq!(spectrum[[0, 0]].re, 40.0, epsilon = 1e-10);

        let shifted = fftshift(&spectrum.view());
        assert_abs_diff_eq!(shifted[[2, 2]].re, 40.0, epsilon = 1e-10);
    }

    #[test]
    fn test_fftshift_inverse_odd_size() {
        let data = Array2::from_shape_fn((5, 3), |(i, j)| i * 10 + j);
        let shifted = fftshift(&data.view());
        assert_eq!(shifted[[2, 1]], 0);
        assert_eq!(ifftshift(&shifted.view()), data);
    }

    #[test]
    fn test_convolve_same_with_delta_kernel() {
        let image = arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        let kernel = arr2(&[[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]]);
        let out = fft_convolve_same(&image.view(), &kernel.view());
        for (a, b) in image.iter().zip(out.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_autocorrelation_peaks_at_centre() {
        let image = Array2::from_shape_fn((8, 8), |(i, j)| {
            (-((i as f64 - 4.0).powi(2) + (j as f64 - 3.0).powi(2)) / 2.0).exp()
        });
        let corr = cross_correlate_same(&image.view(), &image.view());
        let (mut best, mut best_idx) = (f64::MIN, (0, 0));
        for ((i, j), &v) in corr.indexed_iter() {
            if v > best {
                best = v;
                best_idx = (i, j);
            }
        }
        assert_eq!(best_idx, (4, 4));
    }

    #[test]
    fn test_correlation_peak_tracks_translation() {
        let blob = |r0: f64, c0: f64| {
            Array2::from_shape_fn((16, 16), move |(i, j)| {
                (-((i as f64 - r0).powi(2) + (j as f64 - c0).powi(2)) / 4.0).exp()
            })
        };
        let reference = blob(8.0, 8.0);
        let frame = blob(10.0, 7.0);
        let corr = cross_correlate_same(&reference.view(), &frame.view());

        let mut best_idx = (0, 0);
        let mut best = f64::MIN;
        for ((i, j), &v) in corr.indexed_iter() {
            if v > best {
                best = v;
                best_idx = (i, j);
            }
        }
        // Frame moved by (+2, -1), so the peak sits at centre - (2, -1)
        assert_eq!(best_idx, (6, 9));
    }
}
