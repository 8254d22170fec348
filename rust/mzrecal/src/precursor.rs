//! Correction of precursor m/z values on secondary scans.
//!
//! The spectrum reference stored with a precursor is not reliable enough to
//! find the primary scan it was selected from. Instead the precursor scan is
//! taken to be the last primary scan acquired at or before the secondary scan.

use crate::calibration::Calibration;
use crate::errors::Result;
use crate::models::Precursor;
use crate::traits::{
    SpectrumSink,
    SpectrumSource,
};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{
    debug,
    info,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Secondary scans seen.
    pub total: usize,
    /// Secondary scans whose precursors were recalibrated.
    pub updated: usize,
    /// Secondary scans emptied because their primary scan had no calibration.
    pub blanked: usize,
}

/// Primary scans sorted by retention time, for precursor lookup.
#[derive(Debug, Clone, Default)]
pub struct PrimaryScanIndex {
    // (retention time, spectrum index), ties keep acquisition order.
    scans: Vec<(f64, usize)>,
}

impl PrimaryScanIndex {
    pub fn new(mut scans: Vec<(f64, usize)>) -> Self {
        scans.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        Self { scans }
    }

    pub fn from_source<S: SpectrumSource + ?Sized>(source: &S) -> Result<Self> {
        let mut scans = Vec::new();
        for i in 0..source.num_spectra() {
            if source.ms_level(i)? == 1 {
                scans.push((source.retention_time(i)?, i));
            }
        }
        Ok(Self::new(scans))
    }

    /// Index of the last primary scan with retention time <= `retention_time`.
    pub fn preceding(&self, retention_time: f64) -> Option<usize> {
        let pos = self.scans.partition_point(|(rt, _)| *rt <= retention_time);
        pos.checked_sub(1).map(|p| self.scans[p].1)
    }
}

pub fn recalibrate_precursor(precursor: &Precursor, calibration: &Calibration) -> Precursor {
    Precursor {
        spectrum_ref: precursor.spectrum_ref.clone(),
        isolation_window_target_mz: precursor
            .isolation_window_target_mz
            .map(|mz| calibration.apply(mz)),
        selected_ion_mz: precursor
            .selected_ion_mz
            .iter()
            .map(|&mz| calibration.apply(mz))
            .collect(),
    }
}

enum Correction {
    Update(usize, Vec<Precursor>),
    Blank(usize),
    Keep,
}

/// Applies the calibration of each secondary scan's precursor scan to its
/// precursor m/z values.
///
/// Secondary scans whose precursor scan has no calibration (or that precede
/// every primary scan) are left untouched, or emptied when
/// `empty_non_calibrated` is set.
#[tracing::instrument(level = "debug", skip_all)]
pub fn propagate_precursors<A>(
    acquisition: &mut A,
    calibrations: &HashMap<usize, Calibration>,
    empty_non_calibrated: bool,
) -> Result<PropagationReport>
where
    A: SpectrumSource + SpectrumSink + Sync + ?Sized,
{
    let primary = PrimaryScanIndex::from_source(&*acquisition)?;

    let mut secondary = Vec::new();
    for i in 0..acquisition.num_spectra() {
        if acquisition.ms_level(i)? == 2 {
            secondary.push(i);
        }
    }

    let source: &A = &*acquisition;
    let corrections: Vec<Correction> = secondary
        .par_iter()
        .map(|&idx| -> Result<Correction> {
            let rt = source.retention_time(idx)?;
            let calibration = primary.preceding(rt).and_then(|p| calibrations.get(&p));
            match calibration {
                Some(cal) => {
                    let precursors = source
                        .precursors(idx)?
                        .iter()
                        .map(|p| recalibrate_precursor(p, cal))
                        .collect();
                    Ok(Correction::Update(idx, precursors))
                }
                None if empty_non_calibrated => Ok(Correction::Blank(idx)),
                None => {
                    debug!("No calibration for precursor scan of spectrum {}", idx);
                    Ok(Correction::Keep)
                }
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let mut report = PropagationReport {
        total: secondary.len(),
        ..Default::default()
    };
    for correction in corrections {
        match correction {
            Correction::Update(idx, precursors) => {
                acquisition.update_precursors(idx, precursors)?;
                report.updated += 1;
            }
            Correction::Blank(idx) => {
                acquisition.update_peaks(idx, Vec::new())?;
                report.blanked += 1;
            }
            Correction::Keep => {}
        }
    }

    info!(
        "{} of {} MS2 precursors updated, {} MS2 spectra emptied",
        report.updated, report.total, report.blanked
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationMethod;
    use crate::models::{
        Acquisition,
        SpectrumRecord,
    };

    fn scan(ms_level: u8, rt: f64, precursor_mz: Option<f64>) -> SpectrumRecord {
        SpectrumRecord {
            id: format!("rt={}", rt),
            ms_level,
            retention_time: rt,
            centroided: true,
            total_ion_current: None,
            ion_injection_time: None,
            precursors: precursor_mz
                .map(|mz| {
                    vec![Precursor {
                        spectrum_ref: Some("scan=0".to_string()),
                        isolation_window_target_mz: Some(mz),
                        selected_ion_mz: vec![mz, mz + 0.5],
                    }]
                })
                .unwrap_or_default(),
            mz: vec![100.0, 200.0],
            intensity: vec![1.0, 2.0],
        }
    }

    fn offset(p0: f64) -> Calibration {
        Calibration::new(CalibrationMethod::Offset, vec![p0])
    }

    fn acquisition() -> Acquisition {
        Acquisition {
            instruments: vec![],
            spectra: vec![
                scan(2, 5.0, Some(500.0)),  // 0: before any MS1
                scan(1, 10.0, None),        // 1
                scan(2, 15.0, Some(600.0)), // 2
                scan(1, 20.0, None),        // 3
                scan(2, 20.0, Some(700.0)), // 4: same RT as MS1 3
                scan(1, 30.0, None),        // 5: not calibrated
                scan(2, 31.0, Some(800.0)), // 6
            ],
            data_processing: vec![],
        }
    }

    #[test]
    fn test_preceding_scan() {
        let index = PrimaryScanIndex::new(vec![(20.0, 3), (10.0, 1), (30.0, 5)]);
        assert_eq!(index.preceding(5.0), None);
        assert_eq!(index.preceding(10.0), Some(1));
        assert_eq!(index.preceding(15.0), Some(1));
        assert_eq!(index.preceding(29.9), Some(3));
        assert_eq!(index.preceding(1e9), Some(5));
    }

    #[test]
    fn test_earlier_primary_scan_is_used() {
        let mut acq = acquisition();
        let cals: HashMap<usize, Calibration> =
            [(1, offset(0.01)), (3, offset(0.02))].into_iter().collect();
        let report = propagate_precursors(&mut acq, &cals, false).unwrap();
        assert_eq!(
            report,
            PropagationReport {
                total: 4,
                updated: 2,
                blanked: 0
            }
        );

        let p = &acq.spectra[2].precursors[0];
        assert!((p.isolation_window_target_mz.unwrap() - 600.01).abs() < 1e-9);
        assert!((p.selected_ion_mz[0] - 600.01).abs() < 1e-9);
        assert!((p.selected_ion_mz[1] - 600.51).abs() < 1e-9);
        assert_eq!(p.spectrum_ref.as_deref(), Some("scan=0"));

        let p = &acq.spectra[4].precursors[0];
        assert!((p.selected_ion_mz[0] - 700.02).abs() < 1e-9);

        // Untouched
        assert_eq!(acq.spectra[0].precursors[0].selected_ion_mz[0], 500.0);
        assert_eq!(acq.spectra[6].precursors[0].selected_ion_mz[0], 800.0);
        assert_eq!(acq.spectra[6].mz.len(), 2);
    }

    #[test]
    fn test_uncalibrated_are_blanked_on_request() {
        let mut acq = acquisition();
        let cals: HashMap<usize, Calibration> = [(1, offset(0.01))].into_iter().collect();
        let report = propagate_precursors(&mut acq, &cals, true).unwrap();
        assert_eq!(report.total, 4);
        assert_eq!(report.updated, 1);
        assert_eq!(report.blanked, 3);
        assert!(acq.spectra[0].mz.is_empty());
        assert!(acq.spectra[4].mz.is_empty());
        assert!(acq.spectra[6].intensity.is_empty());
        assert_eq!(acq.spectra[2].mz.len(), 2);
    }
}
