//! Small dense Levenberg-Marquardt solver.
//!
//! The problems solved here have at most six parameters and a few hundred
//! residuals, so every step solves the damped system directly with a QR
//! decomposition of the scaled, augmented Jacobian:
//!
//! ```text
//! | J D^-1        |       | -r |
//! | sqrt(lambda) I| y  =  |  0 |,   step = D^-1 y
//! ```
//!
//! `D` holds the (running maximum of the) Jacobian column norms, which makes
//! the damping and the step-size test independent of parameter scale. This
//! matters for the FTICR and Orbitrap models where one parameter is of order
//! 1 and the other of order 1e-9.

use crate::calibration::CalibrationMethod;
use nalgebra::{
    DMatrix,
    DVector,
};
use std::time::Instant;

const INITIAL_LAMBDA: f64 = 1e-3;
const MAX_LAMBDA: f64 = 1e16;
const MIN_LAMBDA: f64 = 1e-12;

/// A nonlinear least-squares problem: minimize `sum(r_i(p)^2)`.
pub trait LeastSquaresProblem {
    fn num_residuals(&self) -> usize;
    fn residuals(&self, params: &[f64], out: &mut [f64]);
    /// Row `i`, column `j` is `d r_i / d p_j`.
    fn jacobian(&self, params: &[f64], out: &mut DMatrix<f64>);
}

/// Residuals `method(measured_i, p) - target_i`.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationProblem<'a> {
    pub method: CalibrationMethod,
    pub measured: &'a [f64],
    pub target: &'a [f64],
}

impl LeastSquaresProblem for CalibrationProblem<'_> {
    fn num_residuals(&self) -> usize {
        self.measured.len()
    }

    fn residuals(&self, params: &[f64], out: &mut [f64]) {
        for ((o, &meas), &target) in out.iter_mut().zip(self.measured).zip(self.target) {
            *o = self.method.eval(params, meas) - target;
        }
    }

    fn jacobian(&self, params: &[f64], out: &mut DMatrix<f64>) {
        let mut row = vec![0.0; params.len()];
        for (i, &meas) in self.measured.iter().enumerate() {
            self.method.gradient(params, meas, &mut row);
            for (j, &g) in row.iter().enumerate() {
                out[(i, j)] = g;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmSettings {
    pub max_iterations: usize,
    /// Stop when an accepted step reduces the cost by less than `ftol * cost`.
    pub ftol: f64,
    /// Stop when the scaled step is smaller than `xtol` relative to the scaled parameters.
    pub xtol: f64,
    pub deadline: Option<Instant>,
}

impl Default for LmSettings {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            ftol: 1e-14,
            xtol: 1e-10,
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LmTermination {
    Converged,
    /// The damping grew without finding a better point. The current point
    /// is a minimum up to rounding.
    NoImprovement,
    MaxIterations,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LmOutcome {
    pub params: Vec<f64>,
    /// Sum of squared residuals at `params`.
    pub cost: f64,
    pub iterations: usize,
    pub termination: LmTermination,
}

pub fn levenberg_marquardt<P: LeastSquaresProblem + ?Sized>(
    problem: &P,
    initial: Vec<f64>,
    settings: &LmSettings,
) -> LmOutcome {
    let m = problem.num_residuals();
    let n = initial.len();

    let mut x = initial;
    let mut r = vec![0.0; m];
    problem.residuals(&x, &mut r);
    let mut cost = sum_of_squares(&r);

    if n == 0 || m == 0 || cost == 0.0 {
        return LmOutcome {
            params: x,
            cost,
            iterations: 0,
            termination: LmTermination::Converged,
        };
    }

    let mut jac = DMatrix::<f64>::zeros(m, n);
    let mut scale = vec![0.0_f64; n];
    let mut lambda = INITIAL_LAMBDA;
    let mut jacobian_stale = true;
    let mut x_trial = vec![0.0; n];
    let mut r_trial = vec![0.0; m];

    for iteration in 1..=settings.max_iterations {
        if settings.deadline.is_some_and(|d| Instant::now() >= d) {
            return LmOutcome {
                params: x,
                cost,
                iterations: iteration - 1,
                termination: LmTermination::TimedOut,
            };
        }

        if jacobian_stale {
            problem.jacobian(&x, &mut jac);
            for (j, s) in scale.iter_mut().enumerate() {
                let norm = jac.column(j).norm();
                *s = s.max(norm);
            }
            jacobian_stale = false;
        }

        let Some(y) = damped_step(&jac, &scale, &r, lambda) else {
            lambda *= 10.0;
            if lambda > MAX_LAMBDA {
                return LmOutcome {
                    params: x,
                    cost,
                    iterations: iteration,
                    termination: LmTermination::NoImprovement,
                };
            }
            continue;
        };

        for j in 0..n {
            x_trial[j] = x[j] + y[j] / effective_scale(scale[j]);
        }
        problem.residuals(&x_trial, &mut r_trial);
        let cost_trial = sum_of_squares(&r_trial);

        if cost_trial.is_finite() && cost_trial < cost {
            let reduction = cost - cost_trial;
            let step_norm = y.norm();
            let scaled_x_norm = x
                .iter()
                .zip(scale.iter())
                .map(|(xi, si)| (xi * effective_scale(*si)).powi(2))
                .sum::<f64>()
                .sqrt();

            std::mem::swap(&mut x, &mut x_trial);
            std::mem::swap(&mut r, &mut r_trial);
            cost = cost_trial;
            lambda = (lambda / 10.0).max(MIN_LAMBDA);
            jacobian_stale = true;

            if cost == 0.0
                || reduction <= settings.ftol * (cost + reduction)
                || step_norm <= settings.xtol * (scaled_x_norm + settings.xtol)
            {
                return LmOutcome {
                    params: x,
                    cost,
                    iterations: iteration,
                    termination: LmTermination::Converged,
                };
            }
        } else {
            lambda *= 10.0;
            if lambda > MAX_LAMBDA {
                return LmOutcome {
                    params: x,
                    cost,
                    iterations: iteration,
                    termination: LmTermination::NoImprovement,
                };
            }
        }
    }

    LmOutcome {
        params: x,
        cost,
        iterations: settings.max_iterations,
        termination: LmTermination::MaxIterations,
    }
}

#[inline]
fn effective_scale(s: f64) -> f64 {
    if s > 0.0 { s } else { 1.0 }
}

fn sum_of_squares(r: &[f64]) -> f64 {
    r.iter().map(|x| x * x).sum()
}

/// Solves the augmented system for the scaled step `y`.
fn damped_step(jac: &DMatrix<f64>, scale: &[f64], r: &[f64], lambda: f64) -> Option<DVector<f64>> {
    let (m, n) = jac.shape();
    let mut a = DMatrix::<f64>::zeros(m + n, n);
    let mut b = DVector::<f64>::zeros(m + n);
    let sqrt_lambda = lambda.sqrt();
    for j in 0..n {
        let s = effective_scale(scale[j]);
        for i in 0..m {
            a[(i, j)] = jac[(i, j)] / s;
        }
        a[(m + j, j)] = sqrt_lambda;
    }
    for i in 0..m {
        b[i] = -r[i];
    }

    let qr = a.qr();
    let qtb = qr.q().transpose() * b;
    let y = qr.r().solve_upper_triangular(&qtb)?;
    if y.iter().all(|v| v.is_finite()) {
        Some(y)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Exponential {
        t: Vec<f64>,
        y: Vec<f64>,
    }

    // y = a * exp(b * t)
    impl LeastSquaresProblem for Exponential {
        fn num_residuals(&self) -> usize {
            self.t.len()
        }

        fn residuals(&self, p: &[f64], out: &mut [f64]) {
            for i in 0..self.t.len() {
                out[i] = p[0] * (p[1] * self.t[i]).exp() - self.y[i];
            }
        }

        fn jacobian(&self, p: &[f64], out: &mut DMatrix<f64>) {
            for i in 0..self.t.len() {
                let e = (p[1] * self.t[i]).exp();
                out[(i, 0)] = e;
                out[(i, 1)] = p[0] * self.t[i] * e;
            }
        }
    }

    #[test]
    fn test_exponential_fit() {
        let t: Vec<f64> = (0..20).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = t.iter().map(|t| 2.5 * (-1.3 * t).exp()).collect();
        let problem = Exponential { t, y };
        let out = levenberg_marquardt(&problem, vec![1.0, 0.0], &LmSettings::default());
        assert!(matches!(
            out.termination,
            LmTermination::Converged | LmTermination::NoImprovement
        ));
        assert!((out.params[0] - 2.5).abs() < 1e-8, "{:?}", out);
        assert!((out.params[1] + 1.3).abs() < 1e-8, "{:?}", out);
    }

    #[test]
    fn test_linear_offset_fit() {
        let measured = [400.0, 700.0, 1000.0];
        let target: Vec<f64> = measured.iter().map(|m| m + 0.002).collect();
        let problem = CalibrationProblem {
            method: CalibrationMethod::Offset,
            measured: &measured,
            target: &target,
        };
        let out = levenberg_marquardt(&problem, vec![0.0], &LmSettings::default());
        assert!((out.params[0] - 0.002).abs() < 1e-9);
        assert!(out.cost < 1e-20);
    }

    #[test]
    fn test_no_parameters() {
        let measured = [400.0];
        let target = [400.1];
        let problem = CalibrationProblem {
            method: CalibrationMethod::None,
            measured: &measured,
            target: &target,
        };
        let out = levenberg_marquardt(&problem, vec![], &LmSettings::default());
        assert_eq!(out.iterations, 0);
        assert!(out.params.is_empty());
        assert!((out.cost - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let measured = [400.0, 700.0, 1000.0];
        let target = [400.1, 700.1, 1000.1];
        let problem = CalibrationProblem {
            method: CalibrationMethod::Offset,
            measured: &measured,
            target: &target,
        };
        let settings = LmSettings {
            deadline: Some(Instant::now()),
            ..LmSettings::default()
        };
        let out = levenberg_marquardt(&problem, vec![0.0], &settings);
        assert_eq!(out.termination, LmTermination::TimedOut);
    }
}
