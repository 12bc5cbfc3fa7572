//! Reconstruction options.
//!
//! String forms accepted by the `FromStr` impls are case-insensitive and
//! treat spaces, hyphens and underscores alike, so `"peak pixel"`,
//! `"Peak-Pixel"` and `"peak_pixel"` all parse to [`LuckyMethod::PeakPixel`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shared::image_proc::border_leaves_interior;

use crate::error::ConfigError;

fn normalise(s: &str) -> String {
    s.trim()
        .to_ascii_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reconstruction method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LuckyMethod {
    /// Combine frames without alignment
    BlindStack,
    /// Align on the brightest pixel
    PeakPixel,
    /// Align on the thresholded centre of mass
    Centroid,
    /// Align on the cross-correlation peak with the reference
    CrossCorrelation,
    /// Align on the centre of a fitted 2D Gaussian
    GaussianFit,
    /// Cross-correlation alignment followed by per-frequency frame selection
    FourierAmplitudeSelection,
}

impl LuckyMethod {
    pub const ALL: [LuckyMethod; 6] = [
        LuckyMethod::BlindStack,
        LuckyMethod::PeakPixel,
        LuckyMethod::Centroid,
        LuckyMethod::CrossCorrelation,
        LuckyMethod::GaussianFit,
        LuckyMethod::FourierAmplitudeSelection,
    ];

    /// Whether frames are registered to the reference before combining
    pub fn aligns(&self) -> bool {
        !matches!(self, LuckyMethod::BlindStack)
    }
}

impl fmt::Display for LuckyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LuckyMethod::BlindStack => "blind-stack",
            LuckyMethod::PeakPixel => "peak-pixel",
            LuckyMethod::Centroid => "centroid",
            LuckyMethod::CrossCorrelation => "cross-correlation",
            LuckyMethod::GaussianFit => "gaussian-fit",
            LuckyMethod::FourierAmplitudeSelection => "fourier-amplitude-selection",
        };
        f.write_str(name)
    }
}

impl FromStr for LuckyMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise(s).as_str() {
            "blind stack" | "blind stacking" | "blind" => Ok(LuckyMethod::BlindStack),
            "peak pixel" | "pp" => Ok(LuckyMethod::PeakPixel),
            "centroid" | "centroiding" => Ok(LuckyMethod::Centroid),
            "cross correlation" | "cross corr" | "xcorr" => Ok(LuckyMethod::CrossCorrelation),
            "gaussian fit" | "gaussfit" | "gauss fit" => Ok(LuckyMethod::GaussianFit),
            "fourier amplitude selection" | "fas" => Ok(LuckyMethod::FourierAmplitudeSelection),
            _ => Err(ConfigError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Per-pixel combination of the reference and aligned frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StackingRule {
    #[default]
    Average,
    Median,
}

impl fmt::Display for StackingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackingRule::Average => f.write_str("average"),
            StackingRule::Median => f.write_str("median"),
        }
    }
}

impl FromStr for StackingRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise(s).as_str() {
            "average" | "mean" | "average combine" => Ok(StackingRule::Average),
            "median" | "median combine" => Ok(StackingRule::Median),
            _ => Err(ConfigError::UnsupportedStackingRule(s.to_string())),
        }
    }
}

/// How independent per-frame work is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    /// Worker pool created for the call; `None` uses one thread per core
    Parallel { threads: Option<usize> },
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => f.write_str("sequential"),
            ExecutionMode::Parallel { threads: None } => f.write_str("parallel"),
            ExecutionMode::Parallel { threads: Some(n) } => write!(f, "parallel:{n}"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = ConfigError;

    /// Accepts `sequential`, `serial`, `parallel` and `parallel:<threads>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsupported = || ConfigError::UnsupportedExecutionMode(s.to_string());
        let normalised = normalise(s);
        let (mode, threads) = match normalised.split_once(':') {
            Some((mode, threads)) => (mode.trim(), Some(threads.trim())),
            None => (normalised.as_str(), None),
        };
        match (mode, threads) {
            ("sequential" | "serial", None) => Ok(ExecutionMode::Sequential),
            ("parallel", None) => Ok(ExecutionMode::Parallel { threads: None }),
            ("parallel", Some(n)) => n
                .parse::<usize>()
                .map(|n| ExecutionMode::Parallel { threads: Some(n) })
                .map_err(|_| unsupported()),
            _ => Err(unsupported()),
        }
    }
}

/// Fourier Amplitude Selection options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FasConfig {
    /// Width in pixels of the linear taper applied to every frame edge
    pub edge_buffer: usize,
    /// Radius of the per-frequency selection disc as a fraction of `min(h, w)`
    pub cutoff_fraction: f64,
    /// Gaussian sigma applied to amplitude maps before ranking; 0 disables
    pub smoothing_sigma: f64,
    /// Keep the frames with the highest peak pixel outside the disc;
    /// when false those frequencies are zeroed
    pub use_outside_cutoff_selection: bool,
}

impl Default for FasConfig {
    fn default() -> Self {
        Self {
            edge_buffer: 32,
            cutoff_fraction: 1.0,
            smoothing_sigma: 0.0,
            use_outside_cutoff_selection: true,
        }
    }
}

/// Configuration for a lucky imaging reconstruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuckyConfig {
    pub method: LuckyMethod,
    pub stacking: StackingRule,
    /// Fraction of frames retained by peak-pixel selection and FAS, in (0, 1]
    pub selection_fraction: f64,
    pub execution: ExecutionMode,
    /// Refine cross-correlation peaks with a Gaussian fit
    pub sub_pixel: bool,
    /// Border excluded from the sub-pixel correlation fit
    pub correlation_border: usize,
    /// Centroid threshold as a fraction of the frame maximum
    pub centroid_threshold: f64,
    /// Centred (rows, cols) search window for the peak-pixel method
    pub bid_area: Option<(usize, usize)>,
    /// Process only the first `n` frames after the reference
    pub frame_limit: Option<usize>,
    pub fas: FasConfig,
}

impl Default for LuckyConfig {
    fn default() -> Self {
        Self {
            method: LuckyMethod::CrossCorrelation,
            stacking: StackingRule::Average,
            selection_fraction: 1.0,
            execution: ExecutionMode::Sequential,
            sub_pixel: true,
            correlation_border: 25,
            centroid_threshold: 0.25,
            bid_area: None,
            frame_limit: None,
            fas: FasConfig::default(),
        }
    }
}

impl LuckyConfig {
    /// Defaults for the given method
    pub fn new(method: LuckyMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Check every option against a frame shape
    pub fn validate(&self, shape: (usize, usize)) -> Result<(), ConfigError> {
        let (h, w) = shape;
        if h == 0 || w == 0 {
            return Err(ConfigError::invalid("frame shape", format!("{shape:?}")));
        }

        let r = self.selection_fraction;
        if !(r.is_finite() && r > 0.0 && r <= 1.0) {
            return Err(ConfigError::invalid(
                "selection fraction",
                format!("{r} is outside (0, 1]"),
            ));
        }

        if let ExecutionMode::Parallel { threads: Some(0) } = self.execution {
            return Err(ConfigError::invalid("thread count", "must be at least 1"));
        }

        match self.method {
            LuckyMethod::BlindStack | LuckyMethod::GaussianFit => {}
            LuckyMethod::PeakPixel => {
                if let Some((bh, bw)) = self.bid_area {
                    if bh == 0 || bw == 0 || bh > h || bw > w {
                        return Err(ConfigError::invalid(
                            "bid area",
                            format!("({bh}, {bw}) must be non-empty and fit in {shape:?}"),
                        ));
                    }
                }
            }
            LuckyMethod::Centroid => {
                let t = self.centroid_threshold;
                if !(t.is_finite() && (0.0..=1.0).contains(&t)) {
                    return Err(ConfigError::invalid(
                        "centroid threshold",
                        format!("{t} is outside [0, 1]"),
                    ));
                }
            }
            LuckyMethod::CrossCorrelation => self.validate_correlation(shape)?,
            LuckyMethod::FourierAmplitudeSelection => {
                self.validate_correlation(shape)?;
                let fas = &self.fas;
                if !border_leaves_interior(fas.edge_buffer, shape) {
                    return Err(ConfigError::invalid(
                        "FAS edge buffer",
                        format!("{} leaves no pixels in {shape:?}", fas.edge_buffer),
                    ));
                }
                if !(fas.cutoff_fraction.is_finite() && fas.cutoff_fraction >= 0.0) {
                    return Err(ConfigError::invalid(
                        "FAS cutoff fraction",
                        fas.cutoff_fraction.to_string(),
                    ));
                }
                if !(fas.smoothing_sigma.is_finite() && fas.smoothing_sigma >= 0.0) {
                    return Err(ConfigError::invalid(
                        "FAS smoothing sigma",
                        fas.smoothing_sigma.to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate_correlation(&self, (h, w): (usize, usize)) -> Result<(), ConfigError> {
        let b = self.correlation_border;
        if self.sub_pixel && !border_leaves_interior(b, (h, w)) {
            return Err(ConfigError::invalid(
                "correlation border",
                format!("{b} leaves no fitting window in ({h}, {w})"),
            ));
        }
        Ok(())
    }
}
