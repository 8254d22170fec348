use clap::{
    Args,
    Parser,
    Subcommand,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute recalibration parameters and write the recalibrated acquisition
    Run(ComputeArgs),
    /// Only compute and write recalibration parameters
    Compute(ComputeArgs),
    /// Recalibrate an acquisition with a previously written parameter file
    Apply(ApplyArgs),
    /// Write the default configuration as JSON
    WriteTemplate {
        /// Where to write the configuration
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct ComputeArgs {
    /// Acquisition (JSON)
    #[arg(short, long)]
    pub acquisition: PathBuf,

    /// Peptide identifications (JSON list)
    #[arg(short, long)]
    pub identifications: PathBuf,

    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the output directory
    #[arg(short, long)]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

/// Flags that over-write single fields of the configuration file.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Recalibration method (FTICR, TOF, Orbitrap, OFFSET, POLY1..POLY5, NONE)
    #[arg(long)]
    pub method: Option<String>,

    /// Minimum number of calibrants a spectrum needs to be recalibrated
    #[arg(long)]
    pub min_cal: Option<usize>,

    /// Minimum intensity of peaks considered as calibrant
    #[arg(long)]
    pub min_peak: Option<f64>,

    /// Retention time window around each spectrum, e.g. "-10.0:10.0"
    #[arg(long, allow_hyphen_values = true)]
    pub rt: Option<String>,

    /// m/z error (ppm) for trying a calibrant
    #[arg(long)]
    pub ppm_try: Option<f64>,

    /// m/z error (ppm) for accepting a calibrant, robust outlier removal when absent
    #[arg(long)]
    pub ppm_accept: Option<f64>,

    /// Identifications used as calibrant, e.g. "MS:1002257(0.0:1e-2)"
    #[arg(long)]
    pub score_filter: Option<String>,

    /// Charge range such as "1:5", or "ident"
    #[arg(long)]
    pub charge: Option<String>,

    /// Only use the most intense peaks, this multiple of the candidate count
    #[arg(long)]
    pub cal_peaks: Option<f64>,

    /// Spectrum index range to log in detail, e.g. "3:6"
    #[arg(long)]
    pub debug_spectra: Option<String>,

    /// Empty MS2 spectra whose precursor could not be recalibrated
    #[arg(long)]
    pub empty_non_calibrated: bool,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Acquisition (JSON)
    #[arg(short, long)]
    pub acquisition: PathBuf,

    /// Recalibration parameter file
    #[arg(short, long)]
    pub recal: PathBuf,

    /// Where to write the recalibrated acquisition
    #[arg(short, long)]
    pub output: PathBuf,

    /// Empty MS2 spectra whose precursor could not be recalibrated
    #[arg(long)]
    pub empty_non_calibrated: bool,
}
