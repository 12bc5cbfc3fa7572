//! Peak and centroid locators for frame registration
//!
//! Positions are reported in image-index convention: `row` is the vertical
//! (first) axis and `col` the horizontal (second) axis, both measured from
//! the array origin.

use ndarray::ArrayView2;

use serde::{Deserialize, Serialize};

/// Location and value of the brightest pixel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakPixel {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

/// Intensity-weighted centre of mass of a thresholded image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CentroidResult {
    /// Centroid along the row axis
    pub row: f64,
    /// Centroid along the column axis
    pub col: f64,
    /// Zeroth moment (sum of retained intensities)
    pub flux: f64,
    /// Number of pixels that survived the threshold
    pub pixels_used: usize,
}

/// Find the brightest pixel.
///
/// Ties resolve to the first maximum in row-major scan order. NaN pixels
/// are skipped. Returns `None` for an empty image or one with no finite
/// comparable values.
pub fn peak_pixel(image: &ArrayView2<f64>) -> Option<PeakPixel> {
    let mut best: Option<PeakPixel> = None;
    for ((row, col), &value) in image.indexed_iter() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some(ref current) if value <= current.value => {}
            _ => best = Some(PeakPixel { row, col, value }),
        }
    }
    best
}

/// Centre of mass after zeroing pixels below `threshold * max(image)`.
///
/// Pixels strictly below the cut are dropped; the rest contribute their
/// full intensity as weight. Returns `None` when the zeroth moment is
/// zero, which happens for blank frames or when every surviving pixel is
/// itself zero.
///
/// # Arguments
///
/// * `image` - Frame to locate
/// * `threshold` - Fraction of the frame maximum below which pixels are ignored
pub fn thresholded_centroid(image: &ArrayView2<f64>, threshold: f64) -> Option<CentroidResult> {
    let peak = peak_pixel(image)?;
    let cut = threshold * peak.value;

    let mut m00 = 0.0;
    let mut m10 = 0.0; // row moment
    let mut m01 = 0.0; // col moment
    let mut pixels_used = 0;

    for ((row, col), &intensity) in image.indexed_iter() {
        if intensity.is_nan() || intensity < cut {
            continue;
        }
        m00 += intensity;
        m10 += row as f64 * intensity;
        m01 += col as f64 * intensity;
        pixels_used += 1;
    }

    if m00 == 0.0 || !m00.is_finite() {
        return None;
    }

    Some(CentroidResult {
        row: m10 / m00,
        col: m01 / m00,
        flux: m00,
        pixels_used,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr2, Array2};

    #[test]
    fn test_peak_pixel_first_max_wins() {
        let image = arr2(&[[0.0, 5.0, 1.0], [5.0, 2.0, 5.0]]);
        let peak = peak_pixel(&image.view()).unwrap();
        assert_eq!((peak.row, peak.col), (0, 1));
        assert_eq!(peak.value, 5.0);
    }

    #[test]
    fn test_peak_pixel_empty() {
        let image = Array2::<f64>::zeros((0, 4));
        assert!(peak_pixel(&image.view()).is_none());
    }

    #[test]
    fn test_symmetric_blob_centroid() {
        let image = Array2::from_shape_fn((11, 11), |(r, c)| {
            let dr = r as f64 - 4.0;
            let dc = c as f64 - 6.0;
            (-(dr * dr + dc * dc) / 3.0).exp()
        });
        let result = thresholded_centroid(&image.view(), 0.25).unwrap();
        assert_relative_eq!(result.row, 4.0, epsilon = 1e-10);
        assert_relative_eq!(result.col, 6.0, epsilon = 1e-10);
    }

    #[test]
    fn test_threshold_removes_background() {
        let mut image = Array2::from_elem((8, 8), 1.0);
        image[[2, 5]] = 100.0;
        let thresholded = thresholded_centroid(&image.view(), 0.25).unwrap();
        assert_eq!(thresholded.pixels_used, 1);
        assert_relative_eq!(thresholded.row, 2.0);
        assert_relative_eq!(thresholded.col, 5.0);

        // Without a threshold the flat background drags the centroid inward
        let raw = thresholded_centroid(&image.view(), 0.0).unwrap();
        assert!(raw.col < 5.0);
    }

    #[test]
    fn test_faint_blob_keeps_its_centroid() {
        let image = Array2::from_shape_fn((11, 11), |(r, c)| {
            let dr = r as f64 - 5.0;
            let dc = c as f64 - 3.0;
            1e-18 * (-(dr * dr + dc * dc) / 3.0).exp()
        });
        let result = thresholded_centroid(&image.view(), 0.25).unwrap();
        assert_relative_eq!(result.row, 5.0, epsilon = 1e-10);
        assert_relative_eq!(result.col, 3.0, epsilon = 1e-10);
    }

    #[test]
    fn test_zero_mass_is_none() {
        let image = Array2::<f64>::zeros((5, 5));
        assert!(thresholded_centroid(&image.view(), 0.25).is_none());
    }
}
