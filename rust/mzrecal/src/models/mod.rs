pub mod identification;
pub mod recal_file;
pub mod spectrum;

pub use identification::{
    Identification,
    Score,
};
pub use recal_file::{
    RECAL_FORMAT_VERSION,
    RecalFile,
    SpecRecalParams,
};
pub use spectrum::{
    Acquisition,
    Peak,
    Precursor,
    ProcessingStep,
    SpectrumRecord,
};
