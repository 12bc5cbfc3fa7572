//! Lucky imaging reconstruction.
//!
//! Combines a stack of short-exposure frames into one sharper image. Frames
//! are registered to a reference by one of four alignment strategies and
//! then averaged or median combined, optionally keeping only the brightest
//! frames, or combined per spatial frequency by Fourier Amplitude Selection.
//!
//! ```no_run
//! use lucky::{lucky_imaging, FrameStack, LuckyConfig, LuckyMethod};
//! # fn frames() -> Vec<ndarray::Array2<f64>> { unimplemented!() }
//!
//! let stack = FrameStack::new(frames(), None)?;
//! let result = lucky_imaging(&stack, &LuckyConfig::new(LuckyMethod::CrossCorrelation))?;
//! println!("combined {} frames", result.frames_combined);
//! # Ok::<(), lucky::LuckyError>(())
//! ```

pub mod align;
pub mod analysis;
pub mod combine;
pub mod config;
pub mod error;
pub mod fas;
pub mod pipeline;
pub mod stack;

pub use align::{align_frame, Aligner, Alignment, ShiftEstimator, ShiftVector};
pub use analysis::{alignment_errors, alignment_errors_from_arrays, AlignmentErrorReport};
pub use combine::combine;
pub use config::{ExecutionMode, FasConfig, LuckyConfig, LuckyMethod, StackingRule};
pub use error::{ConfigError, DegenerateInput, LuckyError, Result};
pub use fas::fourier_amplitude_selection;
pub use pipeline::{lucky_imaging, lucky_imaging_cube, LuckyResult};
pub use stack::FrameStack;
