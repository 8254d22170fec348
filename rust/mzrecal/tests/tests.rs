use mzrecal::catalog::{
    ANY_RETENTION_TIME,
    fixed_calibrants,
};
use mzrecal::chemistry::{
    mz_from_mass,
    peptide_mass,
};
use mzrecal::errors::DomainDataError;
use mzrecal::models::{
    Acquisition,
    Identification,
    Precursor,
    Score,
    SpectrumRecord,
};
use mzrecal::{
    CalibrationMethod,
    MzRecalError,
    RecalConfig,
    apply_recal,
    build_catalog,
    compute_recal,
};
use rand::{
    Rng,
    SeedableRng,
};
use rand_chacha::ChaCha8Rng;

const SEQUENCES: [&str; 12] = [
    "PEPTIDE",
    "PEPTIDER",
    "ELVISLIVESK",
    "SAMPLER",
    "LGDEHFK",
    "AVAGCAGAR",
    "YICDNQDTISSK",
    "HLVDEPQNLIK",
    "VFQEPLFYEAPR",
    "TCVADESHAGCEK",
    "AEFVEVTK",
    "QTALVELLK",
];
const LATE_SEQUENCE: &str = "LATEPEPTIDEK";
const LATE_RT: f64 = 5000.0;
const CALIBRANT_INTENSITY: f64 = 1e6;
const NUM_MS1: usize = 10;

struct Target {
    label: String,
    mz: f64,
    retention_time: f64,
}

/// Built-in compounds at 1+ and peptides at 2+, at least 50 ppm apart.
fn targets() -> Vec<Target> {
    let mut out: Vec<Target> = fixed_calibrants()
        .map(|c| Target {
            label: c.label.clone(),
            mz: mz_from_mass(c.mass, 1),
            retention_time: ANY_RETENTION_TIME,
        })
        .collect();
    let peptides = SEQUENCES
        .iter()
        .enumerate()
        .map(|(i, s)| (*s, 20.0 + 10.0 * i as f64))
        .chain(std::iter::once((LATE_SEQUENCE, LATE_RT)));
    for (seq, rt) in peptides {
        let mz = mz_from_mass(peptide_mass(seq).unwrap(), 2);
        if out.iter().all(|t| ((mz - t.mz) / mz).abs() > 50e-6) {
            out.push(Target {
                label: seq.to_string(),
                mz,
                retention_time: rt,
            });
        }
    }
    out
}

fn identifications(targets: &[Target]) -> Vec<Identification> {
    targets
        .iter()
        .filter(|t| t.retention_time != ANY_RETENTION_TIME)
        .map(|t| Identification {
            peptide_id: t.label.clone(),
            sequence: t.label.clone(),
            modification_mass: 0.0,
            charge: 2,
            retention_time: Some(t.retention_time),
            scores: vec![Score {
                accession: Some("MS:1002257".to_string()),
                name: Some("Comet:expectation value".to_string()),
                value: 1e-4,
            }],
        })
        .collect()
}

/// Measured m/z that `method` with `p` maps onto `target`.
fn invert(method: CalibrationMethod, p: &[f64], target: f64) -> f64 {
    let (mut lo, mut hi) = (0.9 * target, 1.1 * target);
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if method.eval(p, mid) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

fn scan(id: usize, ms_level: u8, rt: f64, mut peaks: Vec<(f64, f64)>) -> SpectrumRecord {
    peaks.sort_by(|a, b| a.0.total_cmp(&b.0));
    SpectrumRecord {
        id: format!("scan={}", id),
        ms_level,
        retention_time: rt,
        centroided: true,
        total_ion_current: Some(peaks.iter().map(|p| p.1).sum()),
        ion_injection_time: Some(10.0),
        precursors: vec![],
        mz: peaks.iter().map(|p| p.0).collect(),
        intensity: peaks.iter().map(|p| p.1).collect(),
    }
}

fn precursor(mz: f64) -> Precursor {
    Precursor {
        spectrum_ref: None,
        isolation_window_target_mz: Some(mz),
        selected_ion_mz: vec![mz],
    }
}

/// Index 0 is an MS2 scan before any MS1 scan, then MS1 and MS2 alternate.
fn acquisition(targets: &[Target], method: CalibrationMethod, p: &[f64]) -> Acquisition {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let measured: Vec<f64> = targets.iter().map(|t| invert(method, p, t.mz)).collect();

    let mut early = scan(0, 2, -1.0, vec![(200.0, 10.0)]);
    early.precursors = vec![precursor(measured[0])];
    let mut spectra = vec![early];

    for s in 0..NUM_MS1 {
        let rt = 10.0 * s as f64;
        let mut peaks: Vec<(f64, f64)> = measured.iter().map(|&mz| (mz, CALIBRANT_INTENSITY)).collect();
        // Noise below the intensity threshold, spanning the calibrant range.
        peaks.push((250.0, 10.0));
        peaks.push((2000.0, 10.0));
        for _ in 0..40 {
            peaks.push((rng.gen_range(300.0..1600.0), rng.gen_range(100.0..5000.0)));
        }
        spectra.push(scan(spectra.len(), 1, rt, peaks));

        let mut ms2 = scan(spectra.len(), 2, rt + 5.0, vec![(150.0, 50.0), (300.0, 80.0)]);
        let k = s % measured.len();
        ms2.precursors = vec![precursor(measured[k])];
        spectra.push(ms2);
    }

    Acquisition {
        instruments: vec![],
        spectra,
        data_processing: vec![],
    }
}

fn ms1_indices() -> Vec<usize> {
    (0..NUM_MS1).map(|s| 1 + 2 * s).collect()
}

fn test_config(method: Option<CalibrationMethod>) -> RecalConfig {
    RecalConfig {
        method,
        rt_window: "-200:200".to_string(),
        ppm_accept: Some(1.0),
        charge: "ident".to_string(),
        ..Default::default()
    }
}

fn nearest_rel_err(targets: &[Target], mz: f64) -> f64 {
    targets
        .iter()
        .map(|t| ((t.mz - mz) / t.mz).abs())
        .fold(f64::INFINITY, f64::min)
}

#[test]
fn test_recovers_known_calibrations() {
    let cases: [(CalibrationMethod, &[f64]); 6] = [
        (CalibrationMethod::Offset, &[0.002]),
        (CalibrationMethod::Poly1, &[0.001, 1.000003]),
        (CalibrationMethod::Poly2, &[0.001, 1.000002, 1e-9]),
        (CalibrationMethod::Tof, &[0.001, 1.000002, 1e-5]),
        (CalibrationMethod::Fticr, &[2e-9, 1.000001]),
        (CalibrationMethod::Orbitrap, &[1e-7, 0.999999]),
    ];
    let targets = targets();
    let idents = identifications(&targets);

    // Fixed ppm acceptance and robust rejection.
    for ((method, p), ppm_accept) in cases
        .into_iter()
        .flat_map(|case| [(case, Some(1.0)), (case, None)])
    {
        let mut acq = acquisition(&targets, method, p);
        let config = RecalConfig {
            ppm_accept,
            ..test_config(Some(method))
        }
        .resolve()
        .unwrap();
        let catalog = build_catalog(&idents, &config.score_filter).unwrap();

        let (recal, usage) = compute_recal(&acq, &catalog, &config).unwrap();
        assert_eq!(recal.method, method);
        assert_eq!(recal.spec_recal_params.len(), NUM_MS1);
        assert_eq!(recal.num_calibrated(), NUM_MS1, "{} {:?}", method, ppm_accept);
        let indices: Vec<usize> = recal.spec_recal_params.iter().map(|s| s.spec_index).collect();
        assert_eq!(indices, ms1_indices());

        for spec in recal.spec_recal_params.iter() {
            let fitted = spec.p.as_ref().unwrap();
            assert_eq!(fitted.len(), p.len());
            for (got, want) in fitted.iter().zip(p.iter()) {
                assert!(
                    (got - want).abs() < 1e-9,
                    "{} {:?} spectrum {}: {} vs {}",
                    method,
                    ppm_accept,
                    spec.spec_index,
                    got,
                    want
                );
            }
        }

        // Every target except the late peptide is in the window and used.
        let in_window = targets.len() - 1;
        for spec in recal.spec_recal_params.iter() {
            assert_eq!(spec.cals_in_rt_window, Some(in_window));
            assert_eq!(spec.cals_in_mass_window, Some(in_window));
            assert_eq!(spec.cals_used, Some(in_window));
        }
        assert_eq!(usage.spectra("cyclosiloxane6"), Some(&ms1_indices()[..]));
        assert_eq!(usage.spectra(LATE_SEQUENCE), None);
        assert_eq!(usage.len(), in_window);

        let report = apply_recal(&mut acq, &recal, false).unwrap();
        assert_eq!(report.spectra_recalibrated, NUM_MS1);
        assert_eq!(report.precursors.total, NUM_MS1 + 1);
        assert_eq!(report.precursors.updated, NUM_MS1);

        for &i in ms1_indices().iter() {
            let spec = &acq.spectra[i];
            for (&mz, &intensity) in spec.mz.iter().zip(spec.intensity.iter()) {
                if intensity == CALIBRANT_INTENSITY {
                    let err = nearest_rel_err(&targets, mz);
                    assert!(err < 1e-9, "{} spectrum {}: {:e}", method, i, err);
                }
            }
        }
        for &i in ms1_indices().iter() {
            let p = &acq.spectra[i + 1].precursors[0];
            assert!(nearest_rel_err(&targets, p.selected_ion_mz[0]) < 1e-9);
            assert!(nearest_rel_err(&targets, p.isolation_window_target_mz.unwrap()) < 1e-9);
        }
        // No primary scan before it, left as measured.
        let early = &acq.spectra[0].precursors[0];
        assert_eq!(early.selected_ion_mz[0], invert(method, p, targets[0].mz));

        assert_eq!(acq.data_processing.len(), 1);
        assert_eq!(acq.data_processing[0].software, "mzRecal");
    }
}

#[test]
fn test_method_from_instrument() {
    let targets = targets();
    let idents = identifications(&targets);
    let p = [1e-7, 0.999999];
    let mut acq = acquisition(&targets, CalibrationMethod::Orbitrap, &p);
    acq.instruments = vec!["MS:1000031".to_string(), "MS:1000484".to_string()];

    let config = test_config(None).resolve().unwrap();
    let catalog = build_catalog(&idents, &config.score_filter).unwrap();
    let (recal, _) = compute_recal(&acq, &catalog, &config).unwrap();
    assert_eq!(recal.method, CalibrationMethod::Orbitrap);
    assert_eq!(recal.num_calibrated(), NUM_MS1);
}

#[test]
fn test_no_matches_leaves_spectra_uncalibrated() {
    let targets = targets();
    let idents = identifications(&targets);
    let mut acq = acquisition(&targets, CalibrationMethod::Offset, &[0.002]);
    let before = acq.clone();

    let config = RecalConfig {
        min_peak_intensity: 1e7,
        ..test_config(Some(CalibrationMethod::Offset))
    }
    .resolve()
    .unwrap();
    let catalog = build_catalog(&idents, &config.score_filter).unwrap();
    let (recal, usage) = compute_recal(&acq, &catalog, &config).unwrap();
    assert_eq!(recal.spec_recal_params.len(), NUM_MS1);
    assert_eq!(recal.num_calibrated(), 0);
    assert!(usage.is_empty());
    for spec in recal.spec_recal_params.iter() {
        assert_eq!(spec.cals_in_mass_window, Some(0));
        assert!(spec.p.is_none());
    }

    let report = apply_recal(&mut acq, &recal, true).unwrap();
    assert_eq!(report.spectra_recalibrated, 0);
    assert_eq!(report.precursors.updated, 0);
    assert_eq!(report.precursors.blanked, NUM_MS1 + 1);
    for &i in ms1_indices().iter() {
        assert_eq!(acq.spectra[i], before.spectra[i]);
        assert!(acq.spectra[i + 1].mz.is_empty());
    }
}

#[test]
fn test_profile_spectra_are_rejected() {
    let targets = targets();
    let idents = identifications(&targets);
    let mut acq = acquisition(&targets, CalibrationMethod::Offset, &[0.002]);
    acq.spectra[3].centroided = false;

    let config = test_config(Some(CalibrationMethod::Offset)).resolve().unwrap();
    let catalog = build_catalog(&idents, &config.score_filter).unwrap();
    let res = compute_recal(&acq, &catalog, &config);
    assert!(matches!(
        res,
        Err(MzRecalError::DomainData(DomainDataError::NotCentroided { spectrum: 3 }))
    ));

    let config = RecalConfig {
        require_centroided: false,
        ..test_config(Some(CalibrationMethod::Offset))
    }
    .resolve()
    .unwrap();
    let (recal, _) = compute_recal(&acq, &catalog, &config).unwrap();
    assert_eq!(recal.num_calibrated(), NUM_MS1);
}

#[test]
fn test_debug_logging_and_diagnostics_do_not_change_fit() {
    let targets = targets();
    let idents = identifications(&targets);
    let acq = acquisition(&targets, CalibrationMethod::Poly1, &[0.001, 1.000003]);

    let base = test_config(Some(CalibrationMethod::Poly1)).resolve().unwrap();
    let catalog = build_catalog(&idents, &base.score_filter).unwrap();
    let (expected, _) = compute_recal(&acq, &catalog, &base).unwrap();

    let debug = RecalConfig {
        debug_spectra: Some("0:5".to_string()),
        record_diagnostics: false,
        ..test_config(Some(CalibrationMethod::Poly1))
    }
    .resolve()
    .unwrap();
    let (recal, usage) = compute_recal(&acq, &catalog, &debug).unwrap();
    assert!(usage.is_empty());
    for (a, b) in recal.spec_recal_params.iter().zip(expected.spec_recal_params.iter()) {
        assert_eq!(a.spec_index, b.spec_index);
        assert_eq!(a.p, b.p);
        assert_eq!(a.cals_in_rt_window, None);
        assert_eq!(a.cals_used, None);
    }
}

#[test]
fn test_repeated_identifications_share_one_calibrant() {
    let targets = targets();
    let mut idents = identifications(&targets);
    let mut repeat = idents[0].clone();
    repeat.peptide_id = format!("{}_rep", repeat.peptide_id);
    repeat.retention_time = repeat.retention_time.map(|rt| rt + 5.0);
    let merged_label = format!("{};{}", idents[0].peptide_id, repeat.peptide_id);
    idents.push(repeat);

    let acq = acquisition(&targets, CalibrationMethod::Offset, &[0.002]);
    let config = test_config(Some(CalibrationMethod::Offset)).resolve().unwrap();
    let catalog = build_catalog(&idents, &config.score_filter).unwrap();
    let (recal, usage) = compute_recal(&acq, &catalog, &config).unwrap();

    let in_window = targets.len() - 1;
    for spec in recal.spec_recal_params.iter() {
        assert_eq!(spec.cals_in_rt_window, Some(in_window));
        assert_eq!(spec.cals_used, Some(in_window));
    }
    assert_eq!(usage.spectra(&merged_label), Some(&ms1_indices()[..]));
    assert_eq!(usage.spectra(&idents[0].peptide_id), None);
    assert_eq!(usage.len(), in_window);
}

#[test]
fn test_recal_file_survives_json() {
    let targets = targets();
    let idents = identifications(&targets);
    let acq = acquisition(&targets, CalibrationMethod::Offset, &[0.002]);
    let config = test_config(Some(CalibrationMethod::Offset)).resolve().unwrap();
    let catalog = build_catalog(&idents, &config.score_filter).unwrap();
    let (recal, _) = compute_recal(&acq, &catalog, &config).unwrap();

    let mut buf = Vec::new();
    recal.to_writer(&mut buf).unwrap();
    let read = mzrecal::RecalFile::from_reader(buf.as_slice()).unwrap();
    assert_eq!(read.method, recal.method);
    assert_eq!(read.num_calibrated(), recal.num_calibrated());

    let mut applied = acq.clone();
    apply_recal(&mut applied, &read, false).unwrap();
    let spec = &applied.spectra[1];
    for (&mz, &intensity) in spec.mz.iter().zip(spec.intensity.iter()) {
        if intensity == CALIBRANT_INTENSITY {
            assert!(nearest_rel_err(&targets, mz) < 1e-9);
        }
    }
}
