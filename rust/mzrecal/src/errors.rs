use std::path::PathBuf;

/// Errors caused by invalid settings. These are detected before any
/// data is read and abort the run.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    UnknownCalibrationMethod {
        name: String,
    },
    MalformedRange {
        input: String,
        reason: &'static str,
    },
    MalformedScoreFilter {
        input: String,
    },
    DuplicateScoreName {
        name: String,
    },
    InvalidScoreRange {
        name: String,
    },
    InvalidChargeSelection {
        input: String,
    },
    InvalidPeakMultiplier(f64),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCalibrationMethod { name } => {
                write!(f, "Unknown recalibration method: {}", name)
            }
            Self::MalformedRange { input, reason } => {
                write!(f, "Invalid range '{}': {}", input, reason)
            }
            Self::MalformedScoreFilter { input } => {
                write!(f, "Invalid score filter '{}'", input)
            }
            Self::DuplicateScoreName { name } => {
                write!(f, "Score {} defined more than once", name)
            }
            Self::InvalidScoreRange { name } => write!(f, "Invalid range for score {}", name),
            Self::InvalidChargeSelection { input } => {
                write!(f, "Invalid charge range '{}'", input)
            }
            Self::InvalidPeakMultiplier(x) => {
                write!(f, "Calibration peak multiplier must be positive, got {}", x)
            }
        }
    }
}

/// Errors caused by input data that makes the whole recalibration
/// meaningless.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainDataError {
    BadResidue {
        residue: char,
        sequence: String,
    },
    MissingRetentionTime {
        identification: usize,
    },
    NotCentroided {
        spectrum: usize,
    },
    WrongParameterCount {
        spectrum: usize,
        expected: usize,
        real: usize,
    },
    UnsupportedFormatVersion {
        version: String,
    },
}

impl std::fmt::Display for DomainDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadResidue { residue, sequence } => {
                write!(f, "Bad residue '{}' in peptide {}", residue, sequence)
            }
            Self::MissingRetentionTime { identification } => write!(
                f,
                "Identification {} has no usable retention time",
                identification
            ),
            Self::NotCentroided { spectrum } => write!(
                f,
                "Spectrum {} is not centroided, recalibration requires centroided data",
                spectrum
            ),
            Self::WrongParameterCount {
                spectrum,
                expected,
                real,
            } => write!(
                f,
                "Spectrum {} has {} calibration parameters, expected {}",
                spectrum, real, expected
            ),
            Self::UnsupportedFormatVersion { version } => {
                write!(f, "Unsupported recalibration file version {}", version)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataReadingError {
    SpectrumIndexOutOfBounds(usize),
    IdentificationIndexOutOfBounds(usize),
    ExpectedSlicesSameLength {
        expected: usize,
        other: usize,
        context: String,
    },
}

#[derive(Debug)]
pub enum MzRecalError {
    Config(ConfigError),
    DomainData(DomainDataError),
    DataReading(DataReadingError),
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },
    ParseError {
        msg: String,
    },
}

impl std::fmt::Display for MzRecalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {}", e),
            Self::DomainData(e) => write!(f, "Input data error: {}", e),
            Self::Io { source, path } => match path {
                Some(path) => write!(f, "Error reading file {}: {}", path.display(), source),
                None => write!(f, "IO error: {}", source),
            },
            _ => write!(f, "{:?}", self),
        }
    }
}

impl std::error::Error for MzRecalError {}

pub type Result<T> = std::result::Result<T, MzRecalError>;

impl From<ConfigError> for MzRecalError {
    fn from(x: ConfigError) -> Self {
        Self::Config(x)
    }
}

impl From<DomainDataError> for MzRecalError {
    fn from(x: DomainDataError) -> Self {
        Self::DomainData(x)
    }
}

impl From<DataReadingError> for MzRecalError {
    fn from(x: DataReadingError) -> Self {
        Self::DataReading(x)
    }
}

impl From<serde_json::Error> for MzRecalError {
    fn from(val: serde_json::Error) -> Self {
        MzRecalError::ParseError {
            msg: val.to_string(),
        }
    }
}

impl From<std::io::Error> for MzRecalError {
    fn from(x: std::io::Error) -> Self {
        Self::Io {
            source: x,
            path: None,
        }
    }
}
