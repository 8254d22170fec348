//! Seams to the file readers/writers that live outside this crate.
//!
//! The recalibration engine never parses mzML or mzIdentML itself; it talks
//! to these traits. [`crate::models::Acquisition`] and `[Identification]`
//! provide in-memory implementations.

use crate::errors::Result;
use crate::models::{
    Identification,
    Peak,
    Precursor,
};

pub trait SpectrumSource {
    fn num_spectra(&self) -> usize;
    fn retention_time(&self, index: usize) -> Result<f64>;
    fn ms_level(&self, index: usize) -> Result<u8>;
    fn is_centroided(&self, index: usize) -> Result<bool>;
    fn total_ion_current(&self, index: usize) -> Result<Option<f64>>;
    fn ion_injection_time(&self, index: usize) -> Result<Option<f64>>;
    fn precursors(&self, index: usize) -> Result<Vec<Precursor>>;
    fn peaks(&self, index: usize) -> Result<Vec<Peak>>;

    /// CV accessions of the mass analyzers used for the acquisition.
    fn instrument_accessions(&self) -> Vec<String>;
}

pub trait SpectrumSink {
    /// Replaces the peak arrays of a scan. An empty vector blanks the scan.
    fn update_peaks(&mut self, index: usize, peaks: Vec<Peak>) -> Result<()>;
    fn update_precursors(&mut self, index: usize, precursors: Vec<Precursor>) -> Result<()>;
    fn annotate_processing(&mut self, software: &str, version: &str);
}

pub trait IdentificationSource {
    fn num_identifications(&self) -> usize;
    fn identification(&self, index: usize) -> Result<Identification>;
}
