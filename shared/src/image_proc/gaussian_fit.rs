//! Axis-aligned 2D Gaussian fitting by Levenberg-Marquardt.
//!
//! Model: `f(r, c) = A * exp(-((r - r0)^2 / 2 sr^2 + (c - c0)^2 / 2 sc^2))`
//!
//! There is no background term; callers subtract the mean or normalise the
//! data beforehand. The damped normal equations are solved with nalgebra.

use nalgebra::{Matrix5, Vector5};
use ndarray::ArrayView2;
use thiserror::Error;

/// Smallest standard deviation a step may propose before it is rejected
const MIN_STD: f64 = 1e-6;

/// Damping above which the optimizer gives up improving the current fit
const MAX_LAMBDA: f64 = 1e10;

/// Errors raised while fitting
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("no data points to fit")]
    EmptyData,

    #[error("coordinate lengths {rows}x{cols} do not match data shape {shape:?}")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        shape: (usize, usize),
    },

    #[error("fit did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("normal equations are singular")]
    Singular,

    #[error("fit produced non-finite parameters")]
    NonFinite,
}

/// Axis-aligned 2D Gaussian
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian2D {
    pub amplitude: f64,
    pub row_mean: f64,
    pub col_mean: f64,
    pub row_std: f64,
    pub col_std: f64,
}

impl Gaussian2D {
    pub fn new(amplitude: f64, row_mean: f64, col_mean: f64, row_std: f64, col_std: f64) -> Self {
        Self {
            amplitude,
            row_mean,
            col_mean,
            row_std,
            col_std,
        }
    }

    /// Evaluate at a point
    pub fn evaluate(&self, row: f64, col: f64) -> f64 {
        let dr = row - self.row_mean;
        let dc = col - self.col_mean;
        self.amplitude
            * (-0.5 * (dr * dr / (self.row_std * self.row_std) + dc * dc / (self.col_std * self.col_std)))
                .exp()
    }

    pub fn is_finite(&self) -> bool {
        self.params().iter().all(|p| p.is_finite())
    }

    fn params(&self) -> Vector5<f64> {
        Vector5::new(
            self.amplitude,
            self.row_mean,
            self.col_mean,
            self.row_std,
            self.col_std,
        )
    }

    fn from_params(p: &Vector5<f64>) -> Self {
        Self::new(p[0], p[1], p[2], p[3].abs(), p[4].abs())
    }

    fn value_and_gradient(&self, row: f64, col: f64) -> (f64, Vector5<f64>) {
        let sr2 = self.row_std * self.row_std;
        let sc2 = self.col_std * self.col_std;
        let dr = row - self.row_mean;
        let dc = col - self.col_mean;
        let e = (-0.5 * (dr * dr / sr2 + dc * dc / sc2)).exp();
        let g = self.amplitude * e;
        (
            g,
            Vector5::new(
                e,
                g * dr / sr2,
                g * dc / sc2,
                g * dr * dr / (sr2 * self.row_std),
                g * dc * dc / (sc2 * self.col_std),
            ),
        )
    }
}

/// Optimizer settings
#[derive(Debug, Clone)]
pub struct FitOptions {
    pub max_iterations: usize,
    /// Converged once every parameter step is below this
    pub tolerance: f64,
    pub initial_lambda: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-8,
            initial_lambda: 1e-3,
        }
    }
}

/// Axis coordinates `start - centre, ..., start + len - 1 - centre`
pub fn centred_coordinates(start: usize, len: usize, centre: usize) -> Vec<f64> {
    (start..start + len)
        .map(|i| i as f64 - centre as f64)
        .collect()
}

fn sum_squared_residuals(
    model: &Gaussian2D,
    data: &ArrayView2<f64>,
    row_coords: &[f64],
    col_coords: &[f64],
) -> f64 {
    data.indexed_iter()
        .map(|((i, j), &z)| {
            let r = z - model.evaluate(row_coords[i], col_coords[j]);
            r * r
        })
        .sum()
}

/// Fit a 2D Gaussian to `data` sampled at the given axis coordinates.
///
/// `row_coords[i]` and `col_coords[j]` give the position of `data[[i, j]]`.
/// Returns the best model found; a fit whose damping runs away is returned
/// as-is, exhausting `max_iterations` is an error.
pub fn fit_gaussian_2d(
    data: &ArrayView2<f64>,
    row_coords: &[f64],
    col_coords: &[f64],
    initial: Gaussian2D,
    options: &FitOptions,
) -> Result<Gaussian2D, FitError> {
    let shape = data.dim();
    if shape.0 == 0 || shape.1 == 0 {
        return Err(FitError::EmptyData);
    }
    if row_coords.len() != shape.0 || col_coords.len() != shape.1 {
        return Err(FitError::ShapeMismatch {
            rows: row_coords.len(),
            cols: col_coords.len(),
            shape,
        });
    }
    if !initial.is_finite() {
        return Err(FitError::NonFinite);
    }

    let mut model = Gaussian2D::from_params(&initial.params());
    let mut lambda = options.initial_lambda;
    let mut chi2 = sum_squared_residuals(&model, data, row_coords, col_coords);

    for _ in 0..options.max_iterations {
        let mut hessian = Matrix5::<f64>::zeros();
        let mut gradient = Vector5::<f64>::zeros();
        for ((i, j), &z) in data.indexed_iter() {
            let (value, jac) = model.value_and_gradient(row_coords[i], col_coords[j]);
            hessian += jac * jac.transpose();
            gradient += jac * (z - value);
        }

        let mut damped = hessian;
        for k in 0..5 {
            damped[(k, k)] *= 1.0 + lambda;
        }

        let delta = damped.lu().solve(&gradient).ok_or(FitError::Singular)?;
        let candidate = model.params() + delta;
        let proposed = Gaussian2D::from_params(&candidate);

        let acceptable = proposed.is_finite()
            && proposed.row_std > MIN_STD
            && proposed.col_std > MIN_STD;
        let new_chi2 = if acceptable {
            sum_squared_residuals(&proposed, data, row_coords, col_coords)
        } else {
            f64::INFINITY
        };

        if new_chi2 < chi2 {
            model = proposed;
            chi2 = new_chi2;
            lambda *= 0.1;
            if delta.amax() < options.tolerance {
                return Ok(model);
            }
        } else {
            lambda *= 10.0;
            if lambda > MAX_LAMBDA {
                log::debug!("Gaussian fit damping exceeded {MAX_LAMBDA:e}, keeping current estimate");
                return Ok(model);
            }
        }
    }

    Err(FitError::NotConverged {
        iterations: options.max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn synthetic(truth: &Gaussian2D, h: usize, w: usize) -> (Array2<f64>, Vec<f64>, Vec<f64>) {
        let rows = centred_coordinates(0, h, h / 2);
        let cols = centred_coordinates(0, w, w / 2);
        let data = Array2::from_shape_fn((h, w), |(i, j)| truth.evaluate(rows[i], cols[j]));
        (data, rows, cols)
    }

    #[test]
    fn test_centred_coordinates() {
        assert_eq!(centred_coordinates(0, 4, 2), vec![-2.0, -1.0, 0.0, 1.0]);
        assert_eq!(centred_coordinates(3, 2, 5), vec![-2.0, -1.0]);
    }

    #[test]
    fn test_recovers_offset_gaussian() {
        let truth = Gaussian2D::new(50.0, 1.3, -2.6, 2.0, 3.0);
        let (data, rows, cols) = synthetic(&truth, 32, 32);

        let initial = Gaussian2D::new(40.0, 1.0, -3.0, 2.5, 2.5);
        let fit =
            fit_gaussian_2d(&data.view(), &rows, &cols, initial, &FitOptions::default()).unwrap();

        assert_relative_eq!(fit.row_mean, 1.3, epsilon = 1e-6);
        assert_relative_eq!(fit.col_mean, -2.6, epsilon = 1e-6);
        assert_relative_eq!(fit.amplitude, 50.0, epsilon = 1e-5);
        assert_relative_eq!(fit.row_std, 2.0, epsilon = 1e-6);
        assert_relative_eq!(fit.col_std, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_exact_guess_stays_put() {
        let truth = Gaussian2D::new(1.0, 0.0, 0.0, 1.5, 1.5);
        let (data, rows, cols) = synthetic(&truth, 15, 15);
        let fit = fit_gaussian_2d(&data.view(), &rows, &cols, truth, &FitOptions::default())
            .unwrap();
        assert_relative_eq!(fit.row_mean, 0.0, epsilon = 1e-9);
        assert_relative_eq!(fit.col_mean, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_bad_input() {
        let data = Array2::<f64>::zeros((0, 3));
        let initial = Gaussian2D::new(1.0, 0.0, 0.0, 1.0, 1.0);
        assert_eq!(
            fit_gaussian_2d(&data.view(), &[], &[0.0, 1.0, 2.0], initial, &FitOptions::default()),
            Err(FitError::EmptyData)
        );

        let data = Array2::<f64>::zeros((2, 2));
        assert!(matches!(
            fit_gaussian_2d(&data.view(), &[0.0], &[0.0, 1.0], initial, &FitOptions::default()),
            Err(FitError::ShapeMismatch { .. })
        ));

        let nan_guess = Gaussian2D::new(f64::NAN, 0.0, 0.0, 1.0, 1.0);
        assert_eq!(
            fit_gaussian_2d(&data.view(), &[0.0, 1.0], &[0.0, 1.0], nan_guess, &FitOptions::default()),
            Err(FitError::NonFinite)
        );
    }

    #[test]
    fn test_iteration_budget_exhausted() {
        let truth = Gaussian2D::new(10.0, 2.0, -1.0, 2.0, 2.0);
        let (data, rows, cols) = synthetic(&truth, 24, 24);
        let options = FitOptions {
            max_iterations: 1,
            ..FitOptions::default()
        };
        let initial = Gaussian2D::new(5.0, 0.0, 0.0, 3.0, 3.0);
        assert_eq!(
            fit_gaussian_2d(&data.view(), &rows, &cols, initial, &options),
            Err(FitError::NotConverged { iterations: 1 })
        );
    }
}
