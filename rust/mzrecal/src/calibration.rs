//! Calibration functions: measured m/z + parameter vector -> calibrated m/z.
//!
//! Every method has a fixed number of parameters. That count sizes the
//! initial guess and sets the minimum number of calibrants a fit needs
//! (parameter count + 1).

use crate::errors::ConfigError;
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

const CV_FTICR_SPECTROMETER: &str = "MS:1000079";
const CV_TOF_SPECTROMETER: &str = "MS:1000084";
const CV_ORBITRAP_SPECTROMETER: &str = "MS:1000484";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CalibrationMethod {
    /// Identity, only useful for diagnostics.
    None,
    /// `p1 / (1/mz - p0)`
    Fticr,
    /// `p2 * sqrt(mz) + p1 * mz + p0`
    Tof,
    /// `p1 / (1/sqrt(mz) - p0)^2`
    Orbitrap,
    /// `mz + p0`
    Offset,
    Poly1,
    Poly2,
    Poly3,
    Poly4,
    Poly5,
}

impl CalibrationMethod {
    pub const ALL: [CalibrationMethod; 10] = [
        Self::None,
        Self::Fticr,
        Self::Tof,
        Self::Orbitrap,
        Self::Offset,
        Self::Poly1,
        Self::Poly2,
        Self::Poly3,
        Self::Poly4,
        Self::Poly5,
    ];

    pub fn param_count(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Offset => 1,
            Self::Fticr | Self::Orbitrap => 2,
            Self::Tof => 3,
            Self::Poly1 => 2,
            Self::Poly2 => 3,
            Self::Poly3 => 4,
            Self::Poly4 => 5,
            Self::Poly5 => 6,
        }
    }

    pub fn min_calibrants(&self) -> usize {
        self.param_count() + 1
    }

    /// Parameters for which every method is (close to) the identity.
    pub fn initial_params(&self) -> Vec<f64> {
        let mut p = vec![0.0; self.param_count()];
        if p.len() >= 2 {
            p[1] = 1.0;
        }
        p
    }

    /// Picks the method matching the mass analyzer, POLY2 when there is none.
    pub fn from_instrument<S: AsRef<str>>(accessions: &[S]) -> Self {
        for acc in accessions {
            match acc.as_ref() {
                CV_FTICR_SPECTROMETER => return Self::Fticr,
                CV_TOF_SPECTROMETER => return Self::Tof,
                CV_ORBITRAP_SPECTROMETER => return Self::Orbitrap,
                _ => {}
            }
        }
        warn!("No recalibration method for instrument, using POLY2 recalibration");
        Self::Poly2
    }

    /// Evaluates the calibration function. `p.len()` must equal [`Self::param_count`].
    #[inline]
    pub fn eval(&self, p: &[f64], mz: f64) -> f64 {
        debug_assert_eq!(p.len(), self.param_count());
        match self {
            Self::None => mz,
            Self::Fticr => p[1] / (1.0 / mz - p[0]),
            Self::Tof => p[2] * mz.sqrt() + p[1] * mz + p[0],
            Self::Orbitrap => {
                let w = 1.0 / mz.sqrt() - p[0];
                p[1] / (w * w)
            }
            Self::Offset => mz + p[0],
            Self::Poly1 | Self::Poly2 | Self::Poly3 | Self::Poly4 | Self::Poly5 => {
                p.iter().rev().fold(0.0, |acc, &c| acc * mz + c)
            }
        }
    }

    /// Partial derivatives of [`Self::eval`] with respect to each parameter.
    #[inline]
    pub fn gradient(&self, p: &[f64], mz: f64, out: &mut [f64]) {
        debug_assert_eq!(p.len(), self.param_count());
        debug_assert_eq!(out.len(), self.param_count());
        match self {
            Self::None => {}
            Self::Fticr => {
                let d = 1.0 / (1.0 / mz - p[0]);
                out[0] = p[1] * d * d;
                out[1] = d;
            }
            Self::Tof => {
                out[0] = 1.0;
                out[1] = mz;
                out[2] = mz.sqrt();
            }
            Self::Orbitrap => {
                let d = 1.0 / (1.0 / mz.sqrt() - p[0]);
                out[0] = 2.0 * p[1] * d * d * d;
                out[1] = d * d;
            }
            Self::Offset => out[0] = 1.0,
            Self::Poly1 | Self::Poly2 | Self::Poly3 | Self::Poly4 | Self::Poly5 => {
                let mut power = 1.0;
                for o in out.iter_mut() {
                    *o = power;
                    power *= mz;
                }
            }
        }
    }
}

impl Display for CalibrationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "NONE",
            Self::Fticr => "FTICR",
            Self::Tof => "TOF",
            Self::Orbitrap => "Orbitrap",
            Self::Offset => "OFFSET",
            Self::Poly1 => "POLY1",
            Self::Poly2 => "POLY2",
            Self::Poly3 => "POLY3",
            Self::Poly4 => "POLY4",
            Self::Poly5 => "POLY5",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for CalibrationMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let method = match s.trim().to_uppercase().as_str() {
            "NONE" => Self::None,
            "FTICR" => Self::Fticr,
            "TOF" => Self::Tof,
            "ORBITRAP" => Self::Orbitrap,
            "OFFSET" => Self::Offset,
            "POLY1" => Self::Poly1,
            "POLY2" => Self::Poly2,
            "POLY3" => Self::Poly3,
            "POLY4" => Self::Poly4,
            "POLY5" => Self::Poly5,
            _ => {
                return Err(ConfigError::UnknownCalibrationMethod {
                    name: s.to_string(),
                });
            }
        };
        Ok(method)
    }
}

impl TryFrom<String> for CalibrationMethod {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CalibrationMethod> for String {
    fn from(value: CalibrationMethod) -> Self {
        value.to_string()
    }
}

/// A calibration method together with its fitted parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    method: CalibrationMethod,
    params: Vec<f64>,
}

impl Calibration {
    /// # Panics
    /// Panics when `params` does not have the method's parameter count.
    pub fn new(method: CalibrationMethod, params: Vec<f64>) -> Self {
        assert_eq!(
            params.len(),
            method.param_count(),
            "{} takes {} parameters",
            method,
            method.param_count()
        );
        Self { method, params }
    }

    /// Fallible constructor for parameters that come from outside the program.
    pub fn try_new(method: CalibrationMethod, params: Vec<f64>) -> Option<Self> {
        if params.len() == method.param_count() {
            Some(Self { method, params })
        } else {
            None
        }
    }

    pub fn method(&self) -> CalibrationMethod {
        self.method
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn into_params(self) -> Vec<f64> {
        self.params
    }

    #[inline]
    pub fn apply(&self, mz: f64) -> f64 {
        self.method.eval(&self.params, mz)
    }

    /// Derivatives of the calibrated m/z with respect to each parameter.
    pub fn jacobian_row(&self, mz: f64) -> Vec<f64> {
        let mut row = vec![0.0; self.params.len()];
        self.method.gradient(&self.params, mz, &mut row);
        row
    }
}
