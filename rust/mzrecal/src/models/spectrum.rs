use crate::errors::{
    DataReadingError,
    Result,
};
use crate::traits::{
    SpectrumSink,
    SpectrumSource,
};
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Peak {
    pub mz: f64,
    pub intensity: f64,
}

/// Precursor ion of a secondary scan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Precursor {
    /// Reference to the primary scan as written by the instrument software.
    /// Not trusted for recalibration, see [`crate::precursor`].
    #[serde(default)]
    pub spectrum_ref: Option<String>,
    #[serde(default)]
    pub isolation_window_target_mz: Option<f64>,
    #[serde(default)]
    pub selected_ion_mz: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumRecord {
    pub id: String,
    pub ms_level: u8,
    pub retention_time: f64,
    #[serde(default = "default_true")]
    pub centroided: bool,
    #[serde(default)]
    pub total_ion_current: Option<f64>,
    #[serde(default)]
    pub ion_injection_time: Option<f64>,
    #[serde(default)]
    pub precursors: Vec<Precursor>,
    pub mz: Vec<f64>,
    pub intensity: Vec<f64>,
}

fn default_true() -> bool {
    true
}

impl SpectrumRecord {
    pub fn peaks(&self) -> std::result::Result<Vec<Peak>, DataReadingError> {
        if self.mz.len() != self.intensity.len() {
            return Err(DataReadingError::ExpectedSlicesSameLength {
                expected: self.mz.len(),
                other: self.intensity.len(),
                context: format!("m/z and intensity arrays of spectrum {}", self.id),
            });
        }
        Ok(self
            .mz
            .iter()
            .zip(self.intensity.iter())
            .map(|(&mz, &intensity)| Peak { mz, intensity })
            .collect())
    }

    pub fn set_peaks(&mut self, peaks: &[Peak]) {
        self.mz = peaks.iter().map(|p| p.mz).collect();
        self.intensity = peaks.iter().map(|p| p.intensity).collect();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStep {
    pub software: String,
    pub version: String,
}

/// An acquisition (one run) held in memory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Acquisition {
    #[serde(default)]
    pub instruments: Vec<String>,
    pub spectra: Vec<SpectrumRecord>,
    #[serde(default)]
    pub data_processing: Vec<ProcessingStep>,
}

impl Acquisition {
    fn spectrum(&self, index: usize) -> Result<&SpectrumRecord> {
        self.spectra
            .get(index)
            .ok_or(DataReadingError::SpectrumIndexOutOfBounds(index).into())
    }

    fn spectrum_mut(&mut self, index: usize) -> Result<&mut SpectrumRecord> {
        self.spectra
            .get_mut(index)
            .ok_or(DataReadingError::SpectrumIndexOutOfBounds(index).into())
    }
}

impl SpectrumSource for Acquisition {
    fn num_spectra(&self) -> usize {
        self.spectra.len()
    }

    fn retention_time(&self, index: usize) -> Result<f64> {
        Ok(self.spectrum(index)?.retention_time)
    }

    fn ms_level(&self, index: usize) -> Result<u8> {
        Ok(self.spectrum(index)?.ms_level)
    }

    fn is_centroided(&self, index: usize) -> Result<bool> {
        Ok(self.spectrum(index)?.centroided)
    }

    fn total_ion_current(&self, index: usize) -> Result<Option<f64>> {
        Ok(self.spectrum(index)?.total_ion_current)
    }

    fn ion_injection_time(&self, index: usize) -> Result<Option<f64>> {
        Ok(self.spectrum(index)?.ion_injection_time)
    }

    fn precursors(&self, index: usize) -> Result<Vec<Precursor>> {
        Ok(self.spectrum(index)?.precursors.clone())
    }

    fn peaks(&self, index: usize) -> Result<Vec<Peak>> {
        Ok(self.spectrum(index)?.peaks()?)
    }

    fn instrument_accessions(&self) -> Vec<String> {
        self.instruments.clone()
    }
}

impl SpectrumSink for Acquisition {
    fn update_peaks(&mut self, index: usize, peaks: Vec<Peak>) -> Result<()> {
        self.spectrum_mut(index)?.set_peaks(&peaks);
        Ok(())
    }

    fn update_precursors(&mut self, index: usize, precursors: Vec<Precursor>) -> Result<()> {
        self.spectrum_mut(index)?.precursors = precursors;
        Ok(())
    }

    fn annotate_processing(&mut self, software: &str, version: &str) {
        self.data_processing.push(ProcessingStep {
            software: software.to_string(),
            version: version.to_string(),
        });
    }
}
