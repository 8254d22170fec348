//! Per-spectrum fit with iterative outlier removal.
//!
//! Each round fits the calibration function to the remaining calibrants and
//! then removes the ones that do not agree with the fit. The loop stops as
//! soon as a round removes nothing, or fails when fewer calibrants remain
//! than the method needs. Removed calibrants are never re-added, so the
//! number of rounds is bounded by the number of calibrants.

pub mod levenberg_marquardt;
pub mod outliers;

pub use levenberg_marquardt::{
    CalibrationProblem,
    LeastSquaresProblem,
    LmOutcome,
    LmSettings,
    LmTermination,
    levenberg_marquardt,
};
pub use outliers::{
    reject_fixed,
    reject_robust,
};

use crate::calibration::{
    Calibration,
    CalibrationMethod,
};
use crate::utils::relative_error;
use std::time::{
    Duration,
    Instant,
};

/// How calibrants are judged after each fit round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectionMode {
    /// Keep calibrants within `ppm` of their target.
    Fixed { ppm: f64 },
    /// Quartile based fences, no fixed threshold.
    Robust,
}

impl RejectionMode {
    pub fn reject(&self, relative_errors: &[f64]) -> (Vec<usize>, bool) {
        match self {
            Self::Fixed { ppm } => reject_fixed(relative_errors, *ppm),
            Self::Robust => reject_robust(relative_errors),
        }
    }
}

/// A calibrant matched to a peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitPoint {
    pub measured: f64,
    pub target: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitSettings {
    /// Raised to the method's own minimum when lower.
    pub min_calibrants: usize,
    pub rejection: RejectionMode,
    pub timeout: Option<Duration>,
    pub max_iterations: usize,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            min_calibrants: 0,
            rejection: RejectionMode::Robust,
            timeout: None,
            max_iterations: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    /// `None` when too few calibrants survived or the fit timed out.
    pub calibration: Option<Calibration>,
    /// Calibrant count at the start of every round.
    pub rounds: Vec<usize>,
    /// Indices into the input points used by the final fit. Empty on failure.
    pub used: Vec<usize>,
    pub timed_out: bool,
}

impl FitReport {
    pub fn is_success(&self) -> bool {
        self.calibration.is_some()
    }

    fn failed(rounds: Vec<usize>, timed_out: bool) -> Self {
        Self {
            calibration: None,
            rounds,
            used: Vec::new(),
            timed_out,
        }
    }
}

/// Fits `method` to `points`, removing outliers until the fit is self consistent.
pub fn fit_spectrum(method: CalibrationMethod, points: &[FitPoint], settings: &FitSettings) -> FitReport {
    let min_calibrants = settings.min_calibrants.max(method.min_calibrants());
    let lm_settings = LmSettings {
        max_iterations: settings.max_iterations,
        deadline: settings.timeout.map(|t| Instant::now() + t),
        ..LmSettings::default()
    };

    let mut active: Vec<usize> = (0..points.len()).collect();
    let mut params = method.initial_params();
    let mut rounds = Vec::new();
    let mut satisfied = false;

    let mut measured = Vec::with_capacity(points.len());
    let mut target = Vec::with_capacity(points.len());
    let mut errors = Vec::with_capacity(points.len());

    while active.len() >= min_calibrants && !satisfied {
        rounds.push(active.len());

        measured.clear();
        target.clear();
        measured.extend(active.iter().map(|&i| points[i].measured));
        target.extend(active.iter().map(|&i| points[i].target));

        let problem = CalibrationProblem {
            method,
            measured: &measured,
            target: &target,
        };
        // Warm start from the previous round, the optimum moves little.
        let outcome = levenberg_marquardt(&problem, params, &lm_settings);
        if outcome.termination == LmTermination::TimedOut {
            return FitReport::failed(rounds, true);
        }
        params = outcome.params;

        errors.clear();
        errors.extend(
            measured
                .iter()
                .zip(target.iter())
                .map(|(&m, &t)| relative_error(t, method.eval(&params, m))),
        );
        let (kept, ok) = settings.rejection.reject(&errors);
        active = kept.into_iter().map(|k| active[k]).collect();
        satisfied = ok;
    }

    if !satisfied {
        return FitReport::failed(rounds, false);
    }
    FitReport {
        calibration: Some(Calibration::new(method, params)),
        rounds,
        used: active,
        timed_out: false,
    }
}
