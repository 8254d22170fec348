use crate::errors::{
    DataReadingError,
    Result,
};
use crate::traits::IdentificationSource;
use serde::{
    Deserialize,
    Serialize,
};

/// A named score attached to a peptide-spectrum match, e.g.
/// `MS:1002257` / `Comet:expectation value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    #[serde(default)]
    pub accession: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub value: f64,
}

/// One peptide identification as delivered by the identification reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identification {
    pub peptide_id: String,
    pub sequence: String,
    #[serde(default)]
    pub modification_mass: f64,
    pub charge: u8,
    /// Seconds. `None` when the identification file carries no usable value.
    pub retention_time: Option<f64>,
    #[serde(default)]
    pub scores: Vec<Score>,
}

impl IdentificationSource for [Identification] {
    fn num_identifications(&self) -> usize {
        self.len()
    }

    fn identification(&self, index: usize) -> Result<Identification> {
        self.get(index)
            .cloned()
            .ok_or(DataReadingError::IdentificationIndexOutOfBounds(index).into())
    }
}

impl IdentificationSource for Vec<Identification> {
    fn num_identifications(&self) -> usize {
        self.as_slice().num_identifications()
    }

    fn identification(&self, index: usize) -> Result<Identification> {
        self.as_slice().identification(index)
    }
}
