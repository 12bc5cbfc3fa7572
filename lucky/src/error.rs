use shared::image_proc::FitError;
use thiserror::Error;

/// Problems with the inputs or options of a reconstruction call.
///
/// Always raised before any frame is processed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unsupported lucky imaging method '{0}'")]
    UnsupportedMethod(String),

    #[error("unsupported stacking rule '{0}'")]
    UnsupportedStackingRule(String),

    #[error("unsupported execution mode '{0}'")]
    UnsupportedExecutionMode(String),

    /// A frame in the stack differs in shape from the first frame
    #[error("frame {index} has shape {found:?}, expected {expected:?}")]
    FrameShapeMismatch {
        index: usize,
        found: (usize, usize),
        expected: (usize, usize),
    },

    #[error("reference shape {reference:?} does not match frame shape {frames:?}")]
    ShapeMismatch {
        reference: (usize, usize),
        frames: (usize, usize),
    },

    /// Fewer than two images in total (reference plus one frame)
    #[error("at least 2 images are required, got {0}")]
    InsufficientFrames(usize),

    #[error("frame limit {limit} exceeds the {available} available frames")]
    FrameLimitExceeded { limit: usize, available: usize },

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// A single image that cannot be located
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DegenerateInput {
    /// Every pixel fell below the centroid threshold (division by zero)
    #[error("centroid mass is zero after thresholding")]
    ZeroCentroidMass,

    /// Cross-correlation peak is zero or not finite (division by zero)
    #[error("cross-correlation peak is not positive")]
    ZeroCorrelationPeak,

    #[error("image has no comparable pixels")]
    EmptyImage,
}

/// Errors produced by lucky imaging reconstruction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LuckyError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("degenerate input: {0}")]
    Degenerate(#[from] DegenerateInput),

    #[error("Gaussian fit failed: {0}")]
    FitFailure(#[from] FitError),
}

impl LuckyError {
    /// True for errors raised before any computation starts
    pub fn is_configuration(&self) -> bool {
        matches!(self, LuckyError::Config(_))
    }

    /// True for per-frame failures that batch processing recovers from
    pub fn is_degenerate(&self) -> bool {
        matches!(self, LuckyError::Degenerate(_))
    }
}

pub type Result<T> = std::result::Result<T, LuckyError>;
