use crate::calibration::CalibrationMethod;
use crate::errors::ConfigError;
use crate::fitting::{
    FitSettings,
    RejectionMode,
};
use crate::peak_matching::PeakMatchParams;
use crate::score_filter::{
    DEFAULT_SCORE_FILTER,
    ScoreFilter,
};
use crate::utils::{
    TupleRange,
    parse_float_range,
    parse_int_range,
};
use crate::window::ChargeSelection;
use serde::{
    Deserialize,
    Serialize,
};
use std::time::Duration;

/// User facing settings, as read from a configuration file.
///
/// Strings hold the range/filter syntax and are only interpreted by
/// [`RecalConfig::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecalConfig {
    /// Derived from the instrument when absent.
    pub method: Option<CalibrationMethod>,
    /// Minimum calibrants per spectrum. Absent or too low means the
    /// method's parameter count + 1.
    pub min_calibrants: Option<usize>,
    pub min_peak_intensity: f64,
    /// Retention time window around each spectrum, seconds.
    pub rt_window: String,
    /// Max m/z error (ppm) for trying a calibrant.
    pub ppm_try: f64,
    /// Max m/z error (ppm) for accepting a calibrant. Robust outlier
    /// rejection is used when absent.
    pub ppm_accept: Option<f64>,
    pub score_filter: String,
    /// Charge range such as `"1:5"`, or `"ident"`.
    pub charge: String,
    pub cal_peaks_multiplier: Option<f64>,
    pub require_centroided: bool,
    pub fit_timeout_ms: Option<u64>,
    pub record_diagnostics: bool,
    /// Spectrum index range to log in detail, e.g. `"3:6"`.
    pub debug_spectra: Option<String>,
    /// Empty MS2 spectra whose precursor could not be recalibrated.
    pub empty_non_calibrated: bool,
}

impl Default for RecalConfig {
    fn default() -> Self {
        Self {
            method: None,
            min_calibrants: None,
            min_peak_intensity: 10000.0,
            rt_window: "-10.0:10.0".to_string(),
            ppm_try: 10.0,
            ppm_accept: None,
            score_filter: DEFAULT_SCORE_FILTER.to_string(),
            charge: "1:5".to_string(),
            cal_peaks_multiplier: None,
            require_centroided: true,
            fit_timeout_ms: None,
            record_diagnostics: true,
            debug_spectra: None,
            empty_non_calibrated: false,
        }
    }
}

/// Validated settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub method: Option<CalibrationMethod>,
    pub min_calibrants: Option<usize>,
    pub rt_offsets: TupleRange<f64>,
    pub score_filter: ScoreFilter,
    pub charges: ChargeSelection,
    pub peak_matching: PeakMatchParams,
    pub rejection: RejectionMode,
    pub require_centroided: bool,
    pub fit_timeout: Option<Duration>,
    pub record_diagnostics: bool,
    pub debug_spectra: Option<TupleRange<i64>>,
    pub empty_non_calibrated: bool,
}

impl RecalConfig {
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let rt_offsets = parse_float_range(&self.rt_window, f64::MIN, f64::MAX)?;
        let score_filter = ScoreFilter::parse(&self.score_filter)?;
        let charges: ChargeSelection = self.charge.parse()?;

        if let Some(mult) = self.cal_peaks_multiplier {
            if !(mult > 0.0 && mult.is_finite()) {
                return Err(ConfigError::InvalidPeakMultiplier(mult));
            }
        }
        let debug_spectra = self
            .debug_spectra
            .as_deref()
            .map(|r| parse_int_range(r, 0, i64::MAX))
            .transpose()?;

        let rejection = match self.ppm_accept {
            Some(ppm) => RejectionMode::Fixed { ppm },
            None => RejectionMode::Robust,
        };

        Ok(ResolvedConfig {
            method: self.method,
            min_calibrants: self.min_calibrants,
            rt_offsets,
            score_filter,
            charges,
            peak_matching: PeakMatchParams {
                ppm_try: self.ppm_try,
                min_peak_intensity: self.min_peak_intensity,
                cal_peaks_multiplier: self.cal_peaks_multiplier,
            },
            rejection,
            require_centroided: self.require_centroided,
            fit_timeout: self.fit_timeout_ms.map(Duration::from_millis),
            record_diagnostics: self.record_diagnostics,
            debug_spectra,
            empty_non_calibrated: self.empty_non_calibrated,
        })
    }
}

impl ResolvedConfig {
    /// Effective minimum calibrant count for `method`.
    pub fn min_calibrants_for(&self, method: CalibrationMethod) -> usize {
        self.min_calibrants
            .unwrap_or(0)
            .max(method.min_calibrants())
    }

    pub fn fit_settings(&self, method: CalibrationMethod) -> FitSettings {
        FitSettings {
            min_calibrants: self.min_calibrants_for(method),
            rejection: self.rejection,
            timeout: self.fit_timeout,
            ..FitSettings::default()
        }
    }

    pub fn is_debug_spectrum(&self, index: usize) -> bool {
        self.debug_spectra
            .as_ref()
            .is_some_and(|r| r.contains(index as i64))
    }
}
