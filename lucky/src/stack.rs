//! Canonical (reference, frames) pairing of an input stack

use ndarray::{Array2, ArrayView2, ArrayView3, Axis};

use crate::error::ConfigError;

/// A reference image plus the frames to align against it.
///
/// Construction normalises "stack with optional reference" input: without
/// an explicit reference the first frame becomes the reference and only the
/// remaining frames are aligned and stacked.
#[derive(Debug, Clone)]
pub struct FrameStack {
    reference: Array2<f64>,
    frames: Vec<Array2<f64>>,
}

impl FrameStack {
    /// Build a stack, checking that at least two images are present and
    /// that every image shares one shape.
    pub fn new(
        mut frames: Vec<Array2<f64>>,
        reference: Option<Array2<f64>>,
    ) -> Result<Self, ConfigError> {
        let total = frames.len() + usize::from(reference.is_some());
        if total < 2 || frames.is_empty() {
            return Err(ConfigError::InsufficientFrames(total));
        }

        let expected = frames[0].dim();
        if let Some((index, frame)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.dim() != expected)
        {
            return Err(ConfigError::FrameShapeMismatch {
                index,
                found: frame.dim(),
                expected,
            });
        }

        let reference = match reference {
            Some(reference) => {
                if reference.dim() != expected {
                    return Err(ConfigError::ShapeMismatch {
                        reference: reference.dim(),
                        frames: expected,
                    });
                }
                reference
            }
            None => frames.remove(0),
        };

        if expected.0 == 0 || expected.1 == 0 {
            return Err(ConfigError::invalid("frame shape", format!("{expected:?}")));
        }

        Ok(Self { reference, frames })
    }

    /// Build from an `(n, rows, cols)` cube
    pub fn from_cube(
        cube: &ArrayView3<f64>,
        reference: Option<&ArrayView2<f64>>,
    ) -> Result<Self, ConfigError> {
        let frames = cube.axis_iter(Axis(0)).map(|f| f.to_owned()).collect();
        Self::new(frames, reference.map(|r| r.to_owned()))
    }

    pub fn reference(&self) -> &Array2<f64> {
        &self.reference
    }

    /// Frames to be aligned, excluding the reference
    pub fn frames(&self) -> &[Array2<f64>] {
        &self.frames
    }

    /// Number of frames excluding the reference
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Shape shared by every image
    pub fn shape(&self) -> (usize, usize) {
        self.reference.dim()
    }

    /// The first `limit` frames, or all of them when `limit` is `None`
    pub fn limited(&self, limit: Option<usize>) -> Result<&[Array2<f64>], ConfigError> {
        match limit {
            None => Ok(&self.frames),
            Some(0) => Err(ConfigError::invalid("frame limit", "must be at least 1")),
            Some(n) if n > self.frames.len() => Err(ConfigError::FrameLimitExceeded {
                limit: n,
                available: self.frames.len(),
            }),
            Some(n) => Ok(&self.frames[..n]),
        }
    }
}
