//! Geometric resampling: sub-pixel shifts, crops, ramp padding and
//! flux-conserving rescaling.
//!
//! All functions return new arrays and leave their input untouched.

use ndarray::{s, Array2, ArrayView2};

/// Translate an image by `(dr, dc)` pixels with bilinear interpolation.
///
/// `out[r, c] = in[r - dr, c - dc]`, with zero fill where the source falls
/// outside the image. Integer shifts reproduce the input exactly.
pub fn shift_image(image: &ArrayView2<f64>, shift: (f64, f64)) -> Array2<f64> {
    let (h, w) = image.dim();
    let (dr, dc) = shift;

    let sample = |r: isize, c: isize| -> f64 {
        if r < 0 || c < 0 || r >= h as isize || c >= w as isize {
            0.0
        } else {
            image[[r as usize, c as usize]]
        }
    };

    Array2::from_shape_fn((h, w), |(r, c)| {
        let src_r = r as f64 - dr;
        let src_c = c as f64 - dc;
        let r0 = src_r.floor();
        let c0 = src_c.floor();
        let fr = src_r - r0;
        let fc = src_c - c0;
        let (r0, c0) = (r0 as isize, c0 as isize);

        let mut value = 0.0;
        for (dy, wy) in [(0, 1.0 - fr), (1, fr)] {
            if wy == 0.0 {
                continue;
            }
            for (dx, wx) in [(0, 1.0 - fc), (1, fc)] {
                if wx == 0.0 {
                    continue;
                }
                value += wy * wx * sample(r0 + dy, c0 + dx);
            }
        }
        value
    })
}

/// Extract a centred `(rows, cols)` window.
///
/// The window offset is `floor((h - rows) / 2)` per axis. Requested sizes
/// larger than the image are clamped to the image size.
pub fn centre_crop(image: &ArrayView2<f64>, size: (usize, usize)) -> Array2<f64> {
    let (h, w) = image.dim();
    let rows = size.0.min(h);
    let cols = size.1.min(w);
    let r0 = (h - rows) / 2;
    let c0 = (w - cols) / 2;
    image.slice(s![r0..r0 + rows, c0..c0 + cols]).to_owned()
}

/// Pad every side by `width` pixels with a linear ramp down to zero.
///
/// Rows are padded first, then columns, so corner regions ramp from the
/// already padded rows. Pad pixel `p` counted from the outer border holds
/// `edge * p / width`; the outermost pixel is zero.
pub fn pad_linear_ramp(image: &ArrayView2<f64>, width: usize) -> Array2<f64> {
    let (h, w) = image.dim();
    if width == 0 {
        return image.to_owned();
    }
    let n = width as f64;
    let ramp = |edge: f64, p: usize| edge * p as f64 / n;

    // Axis 0
    let ph = h + 2 * width;
    let mut rows_padded = Array2::<f64>::zeros((ph, w));
    rows_padded
        .slice_mut(s![width..width + h, ..])
        .assign(image);
    if h > 0 {
        for c in 0..w {
            let top = image[[0, c]];
            let bottom = image[[h - 1, c]];
            for p in 0..width {
                rows_padded[[p, c]] = ramp(top, p);
                rows_padded[[ph - 1 - p, c]] = ramp(bottom, p);
            }
        }
    }

    // Axis 1
    let pw = w + 2 * width;
    let mut out = Array2::<f64>::zeros((ph, pw));
    out.slice_mut(s![.., width..width + w]).assign(&rows_padded);
    if w > 0 {
        for r in 0..ph {
            let left = rows_padded[[r, 0]];
            let right = rows_padded[[r, w - 1]];
            for p in 0..width {
                out[[r, p]] = ramp(left, p);
                out[[r, pw - 1 - p]] = ramp(right, p);
            }
        }
    }
    out
}

/// True when trimming `border` pixels from every side of `shape` leaves
/// at least one pixel on each axis.
pub fn border_leaves_interior(border: usize, (h, w): (usize, usize)) -> bool {
    border < h.div_ceil(2) && border < w.div_ceil(2)
}

/// Taper the outer `buffer` pixels of an image linearly to zero.
///
/// The image is centre-cropped by `buffer` on every side and padded back
/// with [`pad_linear_ramp`], so the output keeps the input shape. A buffer
/// that would consume the whole image returns all zeros.
pub fn edge_ramp(image: &ArrayView2<f64>, buffer: usize) -> Array2<f64> {
    let (h, w) = image.dim();
    if !border_leaves_interior(buffer, (h, w)) {
        return Array2::zeros((h, w));
    }
    let cropped = centre_crop(image, (h - 2 * buffer, w - 2 * buffer));
    pad_linear_ramp(&cropped.view(), buffer)
}

/// Rescale an image by `factor` while conserving its total sum.
///
/// The output has `ceil(h * factor) x ceil(w * factor)` pixels; each output
/// pixel samples the input bilinearly at its centre, with edge clamping,
/// and the result is renormalised to the input's sum.
pub fn resample_conserving_sum(image: &ArrayView2<f64>, factor: f64) -> Array2<f64> {
    let (h, w) = image.dim();
    let out_h = ((h as f64 * factor).ceil() as usize).max(1);
    let out_w = ((w as f64 * factor).ceil() as usize).max(1);
    if h == 0 || w == 0 {
        return Array2::zeros((out_h, out_w));
    }

    let clamp_r = |r: isize| r.clamp(0, h as isize - 1) as usize;
    let clamp_c = |c: isize| c.clamp(0, w as isize - 1) as usize;

    let mut out = Array2::from_shape_fn((out_h, out_w), |(r, c)| {
        let src_r = ((r as f64 + 0.5) / factor - 0.5).clamp(0.0, (h - 1) as f64);
        let src_c = ((c as f64 + 0.5) / factor - 0.5).clamp(0.0, (w - 1) as f64);
        let r0 = src_r.floor();
        let c0 = src_c.floor();
        let fr = src_r - r0;
        let fc = src_c - c0;
        let (r0, c0) = (r0 as isize, c0 as isize);

        (1.0 - fr) * (1.0 - fc) * image[[clamp_r(r0), clamp_c(c0)]]
            + (1.0 - fr) * fc * image[[clamp_r(r0), clamp_c(c0 + 1)]]
            + fr * (1.0 - fc) * image[[clamp_r(r0 + 1), clamp_c(c0)]]
            + fr * fc * image[[clamp_r(r0 + 1), clamp_c(c0 + 1)]]
    });

    let in_sum = image.sum();
    let out_sum = out.sum();
    if out_sum.abs() > f64::EPSILON {
        out.mapv_inplace(|v| v * in_sum / out_sum);
    }
    out
}
