//! Per-pixel combination of the reference with aligned frames

use ndarray::Array2;
use shared::algo::median_in_place;

use crate::config::StackingRule;

/// Combine `reference` and `frames` pixel by pixel.
///
/// Averaging sums the reference and then each frame in order before
/// dividing by `N + 1`. The median averages the two middle values when the
/// total count is even. All images must share the reference's shape.
pub fn combine(reference: &Array2<f64>, frames: &[&Array2<f64>], rule: StackingRule) -> Array2<f64> {
    debug_assert!(frames.iter().all(|f| f.dim() == reference.dim()));
    match rule {
        StackingRule::Average => {
            let mut sum = reference.clone();
            for frame in frames {
                sum += *frame;
            }
            sum / (frames.len() + 1) as f64
        }
        StackingRule::Median => {
            let mut scratch = Vec::with_capacity(frames.len() + 1);
            Array2::from_shape_fn(reference.dim(), |idx| {
                scratch.clear();
                scratch.push(reference[idx]);
                scratch.extend(frames.iter().map(|f| f[idx]));
                median_in_place(&mut scratch)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_average_includes_reference() {
        let reference = array![[0.0, 3.0], [6.0, 9.0]];
        let a = array![[3.0, 3.0], [0.0, 0.0]];
        let b = array![[6.0, 0.0], [3.0, 0.0]];
        let out = combine(&reference, &[&a, &b], StackingRule::Average);
        assert_eq!(out, array![[3.0, 2.0], [3.0, 3.0]]);
    }

    #[test]
    fn test_median_odd_and_even_counts() {
        let reference = array![[1.0]];
        let a = array![[10.0]];
        let b = array![[4.0]];
        assert_eq!(combine(&reference, &[&a, &b], StackingRule::Median)[[0, 0]], 4.0);
        assert_eq!(combine(&reference, &[&a], StackingRule::Median)[[0, 0]], 5.5);
    }

    #[test]
    fn test_median_rejects_outlier() {
        let reference = array![[2.0, 2.0]];
        let a = array![[2.0, 2.0]];
        let hot = array![[1000.0, 2.0]];
        let out = combine(&reference, &[&a, &hot], StackingRule::Median);
        assert_eq!(out, array![[2.0, 2.0]]);
    }
}
