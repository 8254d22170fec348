use mzrecal::models::{
    Acquisition,
    Identification,
};
use mzrecal::{
    RecalConfig,
    RecalFile,
    apply_recal,
    build_catalog,
    compute_recal,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{
    BufReader,
    BufWriter,
};
use std::path::{
    Path,
    PathBuf,
};
use std::time::Instant;
use tracing::info;

use crate::cli::{
    ApplyArgs,
    ComputeArgs,
};
use crate::errors::CliError;

fn io_error(e: std::io::Error, path: &Path) -> CliError {
    CliError::Io {
        source: e.to_string(),
        path: Some(path.to_string_lossy().to_string()),
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let file = File::open(path).map_err(|e| io_error(e, path))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| CliError::ParseError {
        msg: format!("{}: {}", path.display(), e),
    })
}

pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), CliError> {
    let file = File::create(path).map_err(|e| io_error(e, path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value).map_err(|e| CliError::Io {
        source: e.to_string(),
        path: Some(path.to_string_lossy().to_string()),
    })?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// `run.json` -> `<dir>/run<suffix>`
fn output_path(directory: &Path, acquisition: &Path, suffix: &str) -> PathBuf {
    let stem = acquisition
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "acquisition".to_string());
    directory.join(format!("{}{}", stem, suffix))
}

/// Computes the parameters for one acquisition, optionally applying them.
pub fn process_compute(args: &ComputeArgs, config: &RecalConfig, apply: bool) -> Result<(), CliError> {
    let resolved = config.resolve()?;

    std::fs::create_dir_all(&args.output_dir).map_err(|e| io_error(e, &args.output_dir))?;

    let st = Instant::now();
    let mut acquisition: Acquisition = read_json(&args.acquisition)?;
    let identifications: Vec<Identification> = read_json(&args.identifications)?;
    info!(
        "Read {} spectra and {} identifications in {:?}",
        acquisition.spectra.len(),
        identifications.len(),
        st.elapsed()
    );

    let catalog = build_catalog(&identifications, &resolved.score_filter)?;
    let (recal, usage) = compute_recal(&acquisition, &catalog, &resolved)?;

    let recal_path = output_path(&args.output_dir, &args.acquisition, ".recal.json");
    recal.to_path(&recal_path)?;
    info!("Wrote {}", recal_path.display());
    if resolved.record_diagnostics {
        write_json(
            &usage,
            &output_path(&args.output_dir, &args.acquisition, ".calibrants.json"),
        )?;
    }

    if apply {
        let report = apply_recal(&mut acquisition, &recal, resolved.empty_non_calibrated)?;
        info!("Apply report: {:?}", report);
        write_json(
            &acquisition,
            &output_path(&args.output_dir, &args.acquisition, "-recal.json"),
        )?;
    }
    Ok(())
}

pub fn process_apply(args: &ApplyArgs) -> Result<(), CliError> {
    let mut acquisition: Acquisition = read_json(&args.acquisition)?;
    let recal = RecalFile::from_path(&args.recal)?;
    let report = apply_recal(&mut acquisition, &recal, args.empty_non_calibrated)?;
    info!("Apply report: {:?}", report);
    write_json(&acquisition, &args.output)
}
