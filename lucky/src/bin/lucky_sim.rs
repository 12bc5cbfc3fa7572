//! End-to-end lucky imaging simulation
//!
//! Synthesizes a stack of short exposures of a single star with random
//! tip/tilt, reconstructs it with the chosen method and reports how well
//! the applied motion was recovered.
//!
//! Usage:
//! ```
//! cargo run --release --bin lucky_sim -- --method fas --frames 100 --noise
//! ```

use clap::{Parser, ValueEnum};
use log::info;
use ndarray::Array2;
use shared::image_proc::{gaussian_kernel, peak_pixel};
use simulator::hardware::detector::models::SAPHIRA;
use simulator::hardware::telescope::models::ANU_2_3M;
use simulator::noise_model::models::SAPHIRA_ANU_2_3M;
use simulator::sims::tip_tilt::{gaussian_tip_tilt, max_excursion};
use simulator::{synthesize_frame, Band, FrameNoise, LuckyFrameConfig, NoiseModel};

use lucky::{
    alignment_errors, lucky_imaging, ExecutionMode, FasConfig, FrameStack, LuckyConfig,
    LuckyMethod, ShiftVector, StackingRule,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MethodArg {
    BlindStack,
    PeakPixel,
    Centroid,
    CrossCorrelation,
    GaussianFit,
    Fas,
}

impl From<MethodArg> for LuckyMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::BlindStack => LuckyMethod::BlindStack,
            MethodArg::PeakPixel => LuckyMethod::PeakPixel,
            MethodArg::Centroid => LuckyMethod::Centroid,
            MethodArg::CrossCorrelation => LuckyMethod::CrossCorrelation,
            MethodArg::GaussianFit => LuckyMethod::GaussianFit,
            MethodArg::Fas => LuckyMethod::FourierAmplitudeSelection,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StackingArg {
    Average,
    Median,
}

impl From<StackingArg> for StackingRule {
    fn from(arg: StackingArg) -> Self {
        match arg {
            StackingArg::Average => StackingRule::Average,
            StackingArg::Median => StackingRule::Median,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Simulate and reconstruct a lucky imaging stack")]
struct Args {
    /// Reconstruction method
    #[arg(long, value_enum, default_value = "cross-correlation")]
    method: MethodArg,

    /// Per-pixel combination rule
    #[arg(long, value_enum, default_value = "average")]
    stacking: StackingArg,

    /// Number of frames to synthesize (excluding the reference)
    #[arg(long, default_value_t = 50)]
    frames: usize,

    /// Detector frame size in pixels (square)
    #[arg(long, default_value_t = 64)]
    size: usize,

    /// Pixels of margin around the frame that absorb tip/tilt
    #[arg(long, default_value_t = 8)]
    edge_buffer: usize,

    /// Seeing PSF sigma in pixels
    #[arg(long, default_value_t = 2.0, value_parser = parse_positive)]
    seeing_sigma: f64,

    /// Tip/tilt RMS per axis in pixels
    #[arg(long, default_value_t = 1.5)]
    tip_tilt_rms: f64,

    /// Star flux in e-/s
    #[arg(long, default_value_t = 5.0e6)]
    flux: f64,

    /// Exposure time per frame in seconds
    #[arg(long, default_value_t = 0.01)]
    exposure: f64,

    /// Imaging band for the noise budget (J, H or K)
    #[arg(long, default_value = "H")]
    band: Band,

    /// Add shot, background and read noise
    #[arg(long)]
    noise: bool,

    /// Fraction of frames kept by peak-pixel selection and FAS
    #[arg(long, default_value_t = 1.0)]
    selection_fraction: f64,

    /// Border excluded from the sub-pixel correlation fit
    #[arg(long, default_value_t = 16)]
    correlation_border: usize,

    /// FAS edge taper width
    #[arg(long, default_value_t = 8)]
    fas_edge_buffer: usize,

    /// FAS selection disc radius as a fraction of the frame size
    #[arg(long, default_value_t = 1.0)]
    fas_cutoff: f64,

    /// sequential, parallel or parallel:<threads>
    #[arg(long, default_value = "sequential")]
    execution: ExecutionMode,

    /// Seed for tip/tilt and noise
    #[arg(long)]
    seed: Option<u64>,

    /// Print the alignment error report as JSON
    #[arg(long)]
    json: bool,
}

fn parse_positive(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{value} must be positive"))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let padded = args.size + 2 * args.edge_buffer;
    let centre = (padded / 2) as f64;
    let mut truth = Array2::<f64>::zeros((padded, padded));
    truth[[padded / 2, padded / 2]] = args.flux;

    let kernel_size = 2 * (4.0 * args.seeing_sigma).ceil() as usize + 1;
    let psf = gaussian_kernel(kernel_size, args.seeing_sigma);

    let frame_config = LuckyFrameConfig::for_detector(
        &SAPHIRA,
        1.0,
        args.exposure,
        (args.size, args.size),
    );
    let noise_params = SAPHIRA_ANU_2_3M.compute_noise(args.band, args.exposure)?;
    info!(
        "{} band, {} s exposure: SNR {:.1}, star at ({centre}, {centre}) of {padded}x{padded}",
        args.band,
        args.exposure,
        noise_params.snr()
    );

    let tip_tilt = gaussian_tip_tilt(args.frames, args.tip_tilt_rms, args.seed)?;
    info!("Largest tip/tilt excursion {:.2} px", max_excursion(&tip_tilt));

    let synthesize = |shift: (f64, f64), index: u64| {
        let noise = if args.noise {
            FrameNoise::Sampled {
                params: &noise_params,
                rng_seed: args.seed.map(|s| s.wrapping_add(index)),
            }
        } else {
            FrameNoise::Disabled
        };
        synthesize_frame(&truth.view(), &psf.view(), None, shift, &frame_config, noise)
    };

    let reference = synthesize((0.0, 0.0), 0)?;
    let frames = tip_tilt
        .iter()
        .enumerate()
        .map(|(i, &shift)| synthesize(shift, i as u64 + 1))
        .collect::<Result<Vec<_>, _>>()?;

    let config = LuckyConfig {
        method: args.method.into(),
        stacking: args.stacking.into(),
        selection_fraction: args.selection_fraction,
        execution: args.execution,
        correlation_border: args.correlation_border,
        fas: FasConfig {
            edge_buffer: args.fas_edge_buffer,
            cutoff_fraction: args.fas_cutoff,
            ..FasConfig::default()
        },
        ..LuckyConfig::default()
    };

    let stack = FrameStack::new(frames, Some(reference))?;
    let result = lucky_imaging(&stack, &config)?;

    let applied: Vec<ShiftVector> = tip_tilt.iter().map(|&s| s.into()).collect();
    let plate_scale = SAPHIRA.plate_scale_arcsec_per_px(&ANU_2_3M);
    let report = alignment_errors(&applied, &result.shifts, plate_scale)?;
    report.log();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Method: {}", config.method);
        println!(
            "Frames combined: {} ({} fallbacks)",
            result.frames_combined, result.fallback_frames
        );
        println!(
            "Alignment error: {:.4} ± {:.4} px ({:.4} ± {:.4} arcsec at {:.4} arcsec/px)",
            report.pixels.magnitude.mean,
            report.pixels.magnitude.std,
            report.arcsec.magnitude.mean,
            report.arcsec.magnitude.std,
            plate_scale
        );
    }

    if let Some(peak) = peak_pixel(&result.image.view()) {
        println!(
            "Combined image peak: {:.1} at ({}, {})",
            peak.value, peak.row, peak.col
        );
    }
    Ok(())
}
