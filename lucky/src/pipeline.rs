//! Reconstruction orchestration.
//!
//! [`lucky_imaging`] validates the configuration, builds the executor for
//! the call, aligns frames where the method needs it and hands the result
//! to the combiner. The worker pool lives only as long as the call.

use std::time::Instant;

use log::{info, warn};
use ndarray::{Array2, ArrayView2, ArrayView3};
use serde::Serialize;
use shared::algo::Executor;

use crate::align::{Aligner, Alignment, ShiftEstimator, ShiftVector};
use crate::combine::combine;
use crate::config::{ExecutionMode, LuckyConfig, LuckyMethod};
use crate::error::{ConfigError, LuckyError, Result};
use crate::fas::{fourier_amplitude_selection, frames_to_keep};
use crate::stack::FrameStack;

/// Output of a reconstruction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LuckyResult {
    pub image: Array2<f64>,
    /// One correction per processed frame, in input order
    pub shifts: Vec<ShiftVector>,
    /// Frames that contributed to the image, excluding the reference
    pub frames_combined: usize,
    /// Frames that were left unregistered or aligned with a fallback model
    pub fallback_frames: usize,
}

impl LuckyResult {
    /// Shifts as an `N x 2` array of (row, col)
    pub fn shift_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.shifts.len(), 2), |(i, axis)| {
            let shift = &self.shifts[i];
            if axis == 0 {
                shift.row
            } else {
                shift.col
            }
        })
    }
}

fn build_executor(mode: ExecutionMode) -> Result<Executor> {
    match mode {
        ExecutionMode::Sequential => Ok(Executor::sequential()),
        ExecutionMode::Parallel { threads } => Executor::with_threads(threads)
            .map_err(|e| ConfigError::WorkerPool(e.to_string()).into()),
    }
}

struct AlignedFrames {
    alignments: Vec<Alignment>,
    fallback_frames: usize,
}

/// Align every frame, keeping frames that cannot be located unregistered
/// with a zero shift.
fn align_frames(
    method: LuckyMethod,
    reference: &Array2<f64>,
    frames: &[Array2<f64>],
    config: &LuckyConfig,
    executor: &Executor,
) -> Result<AlignedFrames> {
    let aligner = Aligner::prepare(method, config, &reference.view())?;
    let outcomes = executor.map(frames, |frame| aligner.align(&frame.view()));

    let mut alignments = Vec::with_capacity(frames.len());
    let mut fallback_frames = 0;
    for (index, (frame, outcome)) in frames.iter().zip(outcomes).enumerate() {
        match outcome {
            Ok(alignment) => {
                if alignment.used_fallback {
                    warn!("Frame {index}: {} fit failed, using fallback model", aligner.name());
                    fallback_frames += 1;
                }
                alignments.push(alignment);
            }
            Err(LuckyError::Degenerate(reason)) => {
                warn!("Frame {index}: {reason}, leaving frame unregistered");
                fallback_frames += 1;
                alignments.push(Alignment {
                    registered: frame.clone(),
                    shift: ShiftVector::zero(),
                    peak_value: None,
                    used_fallback: true,
                });
            }
            Err(e) => return Err(e),
        }
    }
    Ok(AlignedFrames {
        alignments,
        fallback_frames,
    })
}

/// Indices of the `ceil(r * n)` frames with the brightest peak pixel.
///
/// At `r = 1` every frame is kept in input order. Otherwise the order is a
/// stable descending sort, so equal peaks keep their input order.
fn select_brightest(alignments: &[Alignment], selection_fraction: f64) -> Vec<usize> {
    let n = alignments.len();
    if selection_fraction >= 1.0 {
        return (0..n).collect();
    }
    let keep = ((selection_fraction * n as f64).ceil() as usize).clamp(1, n);
    let peak = |i: usize| alignments[i].peak_value.unwrap_or(f64::NEG_INFINITY);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| peak(b).total_cmp(&peak(a)));
    order.truncate(keep);
    order
}

/// Reconstruct a single image from a frame stack.
///
/// Configuration problems are reported before any frame is processed.
/// Frames that cannot be located are counted in
/// [`LuckyResult::fallback_frames`] rather than failing the call.
pub fn lucky_imaging(stack: &FrameStack, config: &LuckyConfig) -> Result<LuckyResult> {
    let shape = stack.shape();
    config.validate(shape)?;
    let frames = stack.limited(config.frame_limit)?;
    let executor = build_executor(config.execution)?;
    let reference = stack.reference();
    let method = config.method;

    info!(
        "Lucky imaging: method {method}, {} frames of {}x{}, {} stacking, {:?}",
        frames.len(),
        shape.0,
        shape.1,
        config.stacking,
        executor
    );
    let start = Instant::now();

    let result = match method {
        LuckyMethod::BlindStack => {
            let refs: Vec<&Array2<f64>> = frames.iter().collect();
            LuckyResult {
                image: combine(reference, &refs, config.stacking),
                shifts: vec![ShiftVector::zero(); frames.len()],
                frames_combined: frames.len(),
                fallback_frames: 0,
            }
        }
        LuckyMethod::FourierAmplitudeSelection => {
            let aligned = align_frames(method, reference, frames, config, &executor)?;
            let registered: Vec<&Array2<f64>> =
                aligned.alignments.iter().map(|a| &a.registered).collect();
            let image = fourier_amplitude_selection(
                &registered,
                config.selection_fraction,
                &config.fas,
                &executor,
            )?;
            LuckyResult {
                image,
                shifts: aligned.alignments.iter().map(|a| a.shift).collect(),
                frames_combined: frames_to_keep(config.selection_fraction, frames.len()),
                fallback_frames: aligned.fallback_frames,
            }
        }
        LuckyMethod::PeakPixel
        | LuckyMethod::Centroid
        | LuckyMethod::CrossCorrelation
        | LuckyMethod::GaussianFit => {
            let aligned = align_frames(method, reference, frames, config, &executor)?;
            let selected = if method == LuckyMethod::PeakPixel {
                select_brightest(&aligned.alignments, config.selection_fraction)
            } else {
                (0..aligned.alignments.len()).collect()
            };
            let refs: Vec<&Array2<f64>> = selected
                .iter()
                .map(|&i| &aligned.alignments[i].registered)
                .collect();
            LuckyResult {
                image: combine(reference, &refs, config.stacking),
                shifts: aligned.alignments.iter().map(|a| a.shift).collect(),
                frames_combined: refs.len(),
                fallback_frames: aligned.fallback_frames,
            }
        }
    };

    info!(
        "Lucky imaging: combined {} frames ({} fallbacks) in {:.3?}",
        result.frames_combined,
        result.fallback_frames,
        start.elapsed()
    );
    Ok(result)
}

/// Reconstruct from an `(n, rows, cols)` cube.
///
/// Without `reference` the first frame of the cube is the reference.
pub fn lucky_imaging_cube(
    cube: &ArrayView3<f64>,
    reference: Option<&ArrayView2<f64>>,
    config: &LuckyConfig,
) -> Result<LuckyResult> {
    let stack = FrameStack::from_cube(cube, reference)?;
    lucky_imaging(&stack, config)
}
