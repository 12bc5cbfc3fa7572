//! Errors raised while building simulated frames

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("star image shape {star:?} does not match convolved image shape {convolved:?}")]
    StarShapeMismatch {
        star: (usize, usize),
        convolved: (usize, usize),
    },

    #[error("{which} noise frame shape {found:?} does not match output shape {expected:?}")]
    NoiseShapeMismatch {
        which: &'static str,
        found: (usize, usize),
        expected: (usize, usize),
    },

    #[error("output size {requested:?} is larger than the resampled image {available:?}")]
    OutputLargerThanImage {
        requested: (usize, usize),
        available: (usize, usize),
    },

    #[error("either an f-ratio or a Nyquist sampling factor may be given, not both")]
    ConflictingSampling,

    #[error("an f-ratio or a Nyquist sampling factor is required")]
    MissingSampling,

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl SimError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SimError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
