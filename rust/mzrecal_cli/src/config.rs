use mzrecal::{
    CalibrationMethod,
    RecalConfig,
};
use std::path::Path;

use crate::cli::ConfigOverrides;
use crate::errors::CliError;

/// Reads the configuration file, or the defaults when there is none.
pub fn load_config(path: Option<&Path>) -> Result<RecalConfig, CliError> {
    let Some(path) = path else {
        return Ok(RecalConfig::default());
    };
    let file = std::fs::File::open(path).map_err(|e| CliError::Io {
        source: e.to_string(),
        path: Some(path.to_string_lossy().to_string()),
    })?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| CliError::ParseError { msg: e.to_string() })
}

impl ConfigOverrides {
    pub fn apply_to(&self, config: &mut RecalConfig) -> Result<(), CliError> {
        if let Some(method) = &self.method {
            config.method = Some(method.parse::<CalibrationMethod>()?);
        }
        if let Some(min_cal) = self.min_cal {
            config.min_calibrants = Some(min_cal);
        }
        if let Some(min_peak) = self.min_peak {
            config.min_peak_intensity = min_peak;
        }
        if let Some(rt) = &self.rt {
            config.rt_window = rt.clone();
        }
        if let Some(ppm) = self.ppm_try {
            config.ppm_try = ppm;
        }
        if let Some(ppm) = self.ppm_accept {
            config.ppm_accept = Some(ppm);
        }
        if let Some(filter) = &self.score_filter {
            config.score_filter = filter.clone();
        }
        if let Some(charge) = &self.charge {
            config.charge = charge.clone();
        }
        if let Some(mult) = self.cal_peaks {
            config.cal_peaks_multiplier = Some(mult);
        }
        if let Some(range) = &self.debug_spectra {
            config.debug_spectra = Some(range.clone());
        }
        if self.empty_non_calibrated {
            config.empty_non_calibrated = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_fields() {
        let overrides = ConfigOverrides {
            method: Some("poly3".to_string()),
            rt: Some("-30:30".to_string()),
            ppm_accept: Some(2.5),
            empty_non_calibrated: true,
            ..Default::default()
        };
        let mut config = RecalConfig::default();
        overrides.apply_to(&mut config).unwrap();
        assert_eq!(config.method, Some(CalibrationMethod::Poly3));
        assert_eq!(config.rt_window, "-30:30");
        assert_eq!(config.ppm_accept, Some(2.5));
        assert!(config.empty_non_calibrated);
        assert_eq!(config.charge, RecalConfig::default().charge);
    }

    #[test]
    fn test_bad_method_override() {
        let overrides = ConfigOverrides {
            method: Some("cubic".to_string()),
            ..Default::default()
        };
        let res = overrides.apply_to(&mut RecalConfig::default());
        assert!(matches!(res, Err(CliError::Config { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let res = load_config(Some(Path::new("/nonexistent/mzrecal_config.json")));
        assert!(matches!(res, Err(CliError::Io { .. })));
        assert_eq!(load_config(None).unwrap(), RecalConfig::default());
    }
}
