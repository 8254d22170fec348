//! Whole-acquisition entry points.
//!
//! [`compute_recal`] finds calibration parameters for every primary scan,
//! [`apply_recal`] applies a parameter file to an acquisition.

use crate::calibration::{
    Calibration,
    CalibrationMethod,
};
use crate::catalog::{
    Catalog,
    IdentifiedCalibrant,
};
use crate::config::ResolvedConfig;
use crate::errors::{
    DomainDataError,
    MzRecalError,
    Result,
};
use crate::fitting::{
    FitPoint,
    FitSettings,
    fit_spectrum,
};
use crate::models::{
    Peak,
    RecalFile,
    SpecRecalParams,
};
use crate::peak_matching::match_peaks;
use crate::precursor::{
    PropagationReport,
    propagate_precursors,
};
use crate::traits::{
    SpectrumSink,
    SpectrumSource,
};
use crate::window::{
    Calibrant,
    expand_charges,
    merge_same_mass,
    merge_same_mz,
    restrict_to_peak_range,
    select_in_rt_window,
};
use indicatif::{
    ParallelProgressIterator,
    ProgressStyle,
};
use rayon::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::{
    BTreeMap,
    HashMap,
};
use std::time::Instant;
use tracing::{
    debug,
    info,
    warn,
};

pub const SOFTWARE_NAME: &str = "mzRecal";
pub const SOFTWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Which spectra used each calibrant in their final fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrantUsage(BTreeMap<String, Vec<usize>>);

impl CalibrantUsage {
    pub fn record<I: IntoIterator<Item = String>>(&mut self, spectrum: usize, labels: I) {
        for label in labels {
            self.0.entry(label).or_default().push(spectrum);
        }
    }

    pub fn merge(mut self, other: Self) -> Self {
        for (label, mut spectra) in other.0 {
            self.0.entry(label).or_default().append(&mut spectra);
        }
        self
    }

    fn finish(mut self) -> Self {
        for spectra in self.0.values_mut() {
            spectra.sort_unstable();
            spectra.dedup();
        }
        self
    }

    pub fn spectra(&self, label: &str) -> Option<&[usize]> {
        self.0.get(label).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

struct SpectrumContext<'a> {
    catalog: &'a Catalog,
    config: &'a ResolvedConfig,
    method: CalibrationMethod,
    fit: FitSettings,
}

struct SpectrumOutcome {
    params: SpecRecalParams,
    used_labels: Vec<String>,
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Computes calibration parameters for every primary scan of `source`.
///
/// Spectra without enough calibrants get `P: None`, this is not an error.
/// Returns the parameters together with the calibrants each fit used.
pub fn compute_recal<S>(
    source: &S,
    catalog: &Catalog,
    config: &ResolvedConfig,
) -> Result<(RecalFile, CalibrantUsage)>
where
    S: SpectrumSource + Sync + ?Sized,
{
    let method = match config.method {
        Some(m) => m,
        None => CalibrationMethod::from_instrument(&source.instrument_accessions()),
    };
    info!("Using {} recalibration", method);

    let mut primary = Vec::new();
    for i in 0..source.num_spectra() {
        if source.ms_level(i)? != 1 {
            continue;
        }
        if config.require_centroided && !source.is_centroided(i)? {
            return Err(DomainDataError::NotCentroided { spectrum: i }.into());
        }
        primary.push(i);
    }

    let ctx = SpectrumContext {
        catalog,
        config,
        method,
        fit: config.fit_settings(method),
    };

    let st = Instant::now();
    let (mut spec_params, usage) = primary
        .par_iter()
        .progress_with_style(progress_style())
        .map(|&idx| process_spectrum(source, idx, &ctx))
        .try_fold(
            || (Vec::new(), CalibrantUsage::default()),
            |(mut params, mut usage), outcome| {
                let outcome = outcome?;
                usage.record(outcome.params.spec_index, outcome.used_labels);
                params.push(outcome.params);
                Ok::<_, MzRecalError>((params, usage))
            },
        )
        .try_reduce(
            || (Vec::new(), CalibrantUsage::default()),
            |(mut params_a, usage_a), (params_b, usage_b)| {
                params_a.extend(params_b);
                Ok((params_a, usage_a.merge(usage_b)))
            },
        )?;
    spec_params.sort_by_key(|p| p.spec_index);

    let recal = RecalFile::new(method, spec_params);
    info!(
        "Recalibrated {} of {} MS1 spectra in {:?}",
        recal.num_calibrated(),
        primary.len(),
        st.elapsed()
    );
    Ok((recal, usage.finish()))
}

fn process_spectrum<S>(source: &S, idx: usize, ctx: &SpectrumContext<'_>) -> Result<SpectrumOutcome>
where
    S: SpectrumSource + ?Sized,
{
    let config = ctx.config;
    let rt = source.retention_time(idx)?;
    let merged = merge_same_mass(select_in_rt_window(ctx.catalog, rt, &config.rt_offsets));
    let selected: Vec<&IdentifiedCalibrant> = merged.iter().map(|c| c.as_ref()).collect();
    let groups = merge_same_mz(expand_charges(&selected, config.charges));
    let cals_in_window = groups.len();

    let peaks = source.peaks(idx)?;
    let groups = restrict_to_peak_range(groups, &peaks);
    let matched = match_peaks(&peaks, groups, &config.peak_matching);

    let points: Vec<FitPoint> = matched
        .iter()
        .map(|g| FitPoint {
            measured: g.mz_measured,
            target: g.mz,
        })
        .collect();
    let report = fit_spectrum(ctx.method, &points, &ctx.fit);
    if report.timed_out {
        warn!("Fit of spectrum {} timed out, spectrum not recalibrated", idx);
    }
    debug!(
        "Spectrum {} rt {:.2}: {} in rt window, {} matched, {} used",
        idx,
        rt,
        cals_in_window,
        matched.len(),
        report.used.len()
    );

    if config.is_debug_spectrum(idx) {
        log_debug_spectrum(source, idx, rt, &peaks, &matched, &report.used, config)?;
    }

    let used_labels = if config.record_diagnostics {
        report
            .used
            .iter()
            .flat_map(|&i| matched[i].members.iter().map(|m| m.calibrant.label.clone()))
            .collect()
    } else {
        Vec::new()
    };
    let diag = |n: usize| config.record_diagnostics.then_some(n);
    let params = SpecRecalParams {
        spec_index: idx,
        cals_in_rt_window: diag(cals_in_window),
        cals_in_mass_window: diag(matched.len()),
        cals_used: diag(report.used.len()),
        p: report.calibration.map(Calibration::into_params),
    };
    Ok(SpectrumOutcome {
        params,
        used_labels,
    })
}

fn log_debug_spectrum<S>(
    source: &S,
    idx: usize,
    rt: f64,
    peaks: &[Peak],
    matched: &[Calibrant<'_>],
    used: &[usize],
    config: &ResolvedConfig,
) -> Result<()>
where
    S: SpectrumSource + ?Sized,
{
    let tic = source.total_ion_current(idx)?;
    let injection_time = source.ion_injection_time(idx)?;
    info!(
        "Spectrum {} rt {:.3} peaks {} TIC {:?} ion injection time {:?}",
        idx,
        rt,
        peaks.len(),
        tic,
        injection_time
    );
    let (low, high) = config.rt_offsets.as_tuple();
    let is_used = used_mask(used, matched.len());
    for (group, &group_used) in matched.iter().zip(is_used.iter()) {
        // Percentage of the m/z try window.
        let mz_rel = 1e8 * (1.0 - group.mz / group.mz_measured) / config.peak_matching.ppm_try;
        for member in group.members.iter() {
            let cal = member.calibrant;
            let (rt_shift, rt_rel) = if cal.elutes_always() {
                (0.0, 0.0)
            } else {
                let shift = rt - cal.retention_time;
                let bound = if shift < 0.0 { low } else { high };
                let rel = if bound != 0.0 { shift / bound } else { 0.0 };
                (shift, rel)
            };
            info!(
                "  mzMeas {:.6} mzComp {:.6} ({:.2}%) cal {} charge {} rtShift {:.3} ({:.2}%) used {}",
                group.mz_measured,
                group.mz,
                mz_rel,
                cal.label,
                member.charge,
                rt_shift,
                rt_rel * 100.0,
                group_used
            );
        }
    }
    Ok(())
}

fn used_mask(used: &[usize], len: usize) -> Vec<bool> {
    let mut mask = vec![false; len];
    for &k in used {
        mask[k] = true;
    }
    mask
}

/// Applies each calibration to every peak of its spectrum.
/// Returns the number of spectra updated.
pub fn recalibrate_primary_spectra<A>(
    acquisition: &mut A,
    calibrations: &HashMap<usize, Calibration>,
) -> Result<usize>
where
    A: SpectrumSource + SpectrumSink + Sync + ?Sized,
{
    let mut indices: Vec<usize> = calibrations.keys().copied().collect();
    indices.sort_unstable();

    let source: &A = &*acquisition;
    let updated: Vec<(usize, Vec<Peak>)> = indices
        .par_iter()
        .map(|&idx| -> Result<(usize, Vec<Peak>)> {
            let cal = &calibrations[&idx];
            let peaks = source
                .peaks(idx)?
                .into_iter()
                .map(|p| Peak {
                    mz: cal.apply(p.mz),
                    intensity: p.intensity,
                })
                .collect();
            Ok((idx, peaks))
        })
        .collect::<Result<Vec<_>>>()?;

    let count = updated.len();
    for (idx, peaks) in updated {
        acquisition.update_peaks(idx, peaks)?;
    }
    Ok(count)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    pub spectra_recalibrated: usize,
    pub precursors: PropagationReport,
}

/// Recalibrates primary scans with the parameters in `recal`, records the
/// processing step and corrects the precursors of secondary scans.
pub fn apply_recal<A>(acquisition: &mut A, recal: &RecalFile, empty_non_calibrated: bool) -> Result<ApplyReport>
where
    A: SpectrumSource + SpectrumSink + Sync + ?Sized,
{
    recal.validate()?;
    let calibrations = recal.calibrations();
    let spectra_recalibrated = recalibrate_primary_spectra(acquisition, &calibrations)?;
    info!(
        "Recalibrated peaks of {} spectra with {}",
        spectra_recalibrated, recal.method
    );
    acquisition.annotate_processing(SOFTWARE_NAME, SOFTWARE_VERSION);
    let precursors = propagate_precursors(acquisition, &calibrations, empty_non_calibrated)?;
    Ok(ApplyReport {
        spectra_recalibrated,
        precursors,
    })
}
