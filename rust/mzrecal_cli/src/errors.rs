use mzrecal::MzRecalError;
use mzrecal::errors::ConfigError;

#[derive(Debug)]
pub enum CliError {
    Config {
        source: String,
    },
    ParseError {
        msg: String,
    },
    Io {
        source: String,
        path: Option<String>,
    },
    Processing {
        source: String,
    },
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config { source } => write!(f, "Error interpreting the config: {}", source),
            CliError::ParseError { msg } => write!(f, "Error parsing input: {}", msg),
            CliError::Io { source, path } => {
                if let Some(path) = path {
                    write!(f, "Error reading file {}: {}", path, source)
                } else {
                    write!(f, "Error reading file: {}", source)
                }
            }
            CliError::Processing { source } => write!(f, "Error during recalibration: {}", source),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config {
            source: e.to_string(),
        }
    }
}

impl From<MzRecalError> for CliError {
    fn from(e: MzRecalError) -> Self {
        match e {
            MzRecalError::Config(e) => e.into(),
            MzRecalError::ParseError { msg } => CliError::ParseError { msg },
            MzRecalError::Io { source, path } => CliError::Io {
                source: source.to_string(),
                path: path.map(|p| p.to_string_lossy().to_string()),
            },
            other => CliError::Processing {
                source: other.to_string(),
            },
        }
    }
}
