use crate::calibration::{
    Calibration,
    CalibrationMethod,
};
use crate::errors::{
    DomainDataError,
    MzRecalError,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::HashMap;
use std::io::{
    Read,
    Write,
};
use std::path::Path;

/// Version of the persisted parameter format. Bump when the layout changes,
/// old files must still be readable.
pub const RECAL_FORMAT_VERSION: &str = "1.0";

/// Calibration parameters of one primary spectrum.
///
/// `p` is `None` exactly when the fit did not converge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecRecalParams {
    #[serde(rename = "SpecIndex")]
    pub spec_index: usize,
    #[serde(rename = "P")]
    pub p: Option<Vec<f64>>,
    #[serde(
        rename = "CalsInRTWindow",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cals_in_rt_window: Option<usize>,
    #[serde(
        rename = "CalsInMassWindow",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cals_in_mass_window: Option<usize>,
    #[serde(rename = "CalsUsed", default, skip_serializing_if = "Option::is_none")]
    pub cals_used: Option<usize>,
}

/// Recalibration parameters for a whole acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalFile {
    #[serde(rename = "MzRecalVersion")]
    pub version: String,
    #[serde(rename = "RecalMethod")]
    pub method: CalibrationMethod,
    #[serde(rename = "SpecRecalPar")]
    pub spec_recal_params: Vec<SpecRecalParams>,
}

impl RecalFile {
    pub fn new(method: CalibrationMethod, spec_recal_params: Vec<SpecRecalParams>) -> Self {
        Self {
            version: RECAL_FORMAT_VERSION.to_string(),
            method,
            spec_recal_params,
        }
    }

    /// Checks the format version and that every parameter vector fits the method.
    pub fn validate(&self) -> std::result::Result<(), DomainDataError> {
        if self.version != RECAL_FORMAT_VERSION {
            return Err(DomainDataError::UnsupportedFormatVersion {
                version: self.version.clone(),
            });
        }
        let expected = self.method.param_count();
        for spec in self.spec_recal_params.iter() {
            if let Some(p) = &spec.p {
                if p.len() != expected {
                    return Err(DomainDataError::WrongParameterCount {
                        spectrum: spec.spec_index,
                        expected,
                        real: p.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Spectrum index -> calibration, skipping spectra without parameters.
    pub fn calibrations(&self) -> HashMap<usize, Calibration> {
        self.spec_recal_params
            .iter()
            .filter_map(|s| {
                let p = s.p.clone()?;
                Calibration::try_new(self.method, p).map(|c| (s.spec_index, c))
            })
            .collect()
    }

    pub fn num_calibrated(&self) -> usize {
        self.spec_recal_params.iter().filter(|s| s.p.is_some()).count()
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let recal: RecalFile = serde_json::from_reader(reader)?;
        recal.validate()?;
        Ok(recal)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| MzRecalError::Io {
            source: e,
            path: Some(path.to_path_buf()),
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Writes indented JSON, easier to read for humans.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn to_path(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|e| MzRecalError::Io {
            source: e,
            path: Some(path.to_path_buf()),
        })?;
        let mut writer = std::io::BufWriter::new(file);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
