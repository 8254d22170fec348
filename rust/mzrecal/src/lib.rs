pub mod calibration;
pub mod catalog;
pub mod chemistry;
pub mod config;
pub mod errors;
pub mod fitting;
pub mod models;
pub mod peak_matching;
pub mod pipeline;
pub mod precursor;
pub mod score_filter;
pub mod traits;
pub mod utils;
pub mod window;

#[doc(inline)]
pub use calibration::{
    Calibration,
    CalibrationMethod,
};

#[doc(inline)]
pub use catalog::{
    Catalog,
    IdentifiedCalibrant,
    build_catalog,
};

#[doc(inline)]
pub use config::{
    RecalConfig,
    ResolvedConfig,
};

pub use errors::{
    MzRecalError,
    Result,
};

pub use models::{
    Acquisition,
    Identification,
    Peak,
    Precursor,
    RecalFile,
    SpecRecalParams,
};

#[doc(inline)]
pub use pipeline::{
    ApplyReport,
    CalibrantUsage,
    apply_recal,
    compute_recal,
};

pub use traits::{
    IdentificationSource,
    SpectrumSink,
    SpectrumSource,
};
