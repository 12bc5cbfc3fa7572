//! Fourier Amplitude Selection through the full pipeline

mod common;

use approx::assert_abs_diff_eq;
use common::{blob, synthesize_stack};
use lucky::{lucky_imaging, FasConfig, FrameStack, LuckyConfig, LuckyMethod};
use shared::image_proc::peak_pixel;

fn fas_config(edge_buffer: usize, selection_fraction: f64) -> LuckyConfig {
    LuckyConfig {
        selection_fraction,
        correlation_border: 12,
        fas: FasConfig {
            edge_buffer,
            ..FasConfig::default()
        },
        ..LuckyConfig::new(LuckyMethod::FourierAmplitudeSelection)
    }
}

#[test]
fn test_identical_frames_reproduce_input() {
    let _ = env_logger::builder().is_test(true).try_init();
    let image = blob(40, (20.0, 19.0), 800.0, 2.0);
    let stack = FrameStack::new(vec![image.clone(); 5], None).unwrap();

    let mut config = fas_config(0, 0.5);
    config.sub_pixel = false;
    let result = lucky_imaging(&stack, &config).unwrap();

    assert_eq!(result.frames_combined, 2);
    for (a, b) in result.image.iter().zip(image.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-8);
    }
}

#[test]
fn test_reconstruction_is_centred_on_reference() {
    let tip_tilt = [(1.0, -2.0), (-1.5, 0.5), (2.0, 1.0), (0.0, -0.5), (-2.0, -2.0)];
    let synthetic = synthesize_stack(48, 1.8, &tip_tilt);
    let reference_peak = peak_pixel(&synthetic.reference.view()).unwrap();
    let stack = FrameStack::new(synthetic.frames, Some(synthetic.reference)).unwrap();

    let result = lucky_imaging(&stack, &fas_config(6, 0.6)).unwrap();
    assert_eq!(result.frames_combined, 3);
    assert_eq!(result.fallback_frames, 0);
    for (shift, &(dr, dc)) in result.shifts.iter().zip(&tip_tilt) {
        assert_abs_diff_eq!(shift.row, -dr, epsilon = 0.1);
        assert_abs_diff_eq!(shift.col, -dc, epsilon = 0.1);
    }

    let peak = peak_pixel(&result.image.view()).unwrap();
    assert_eq!((peak.row, peak.col), (reference_peak.row, reference_peak.col));
}

#[test]
fn test_narrow_cutoff_uses_brightest_frames_outside_disc() {
    let dim = blob(32, (16.0, 16.0), 100.0, 2.0);
    let bright = blob(32, (16.0, 16.0), 400.0, 2.0);
    let stack = FrameStack::new(vec![dim.clone(), dim.clone(), bright.clone()], Some(dim)).unwrap();

    let mut config = fas_config(0, 0.5);
    config.sub_pixel = false;
    config.fas.cutoff_fraction = 0.0;
    let result = lucky_imaging(&stack, &config).unwrap();

    // round(0.5 * 3) = 2 frames outside an empty disc: the bright frame and
    // the first dim one
    assert_eq!(result.frames_combined, 2);
    assert_abs_diff_eq!(result.image[[16, 16]], 250.0, epsilon = 1e-8);
}
