use crate::models::Peak;
use crate::utils::{
    PPM,
    sorted_range_by_key,
};
use crate::window::Calibrant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakMatchParams {
    /// Half width of the search window around a candidate, in ppm.
    pub ppm_try: f64,
    /// Peaks at or below this intensity are never matched.
    pub min_peak_intensity: f64,
    /// When set, only the `multiplier * candidates` most intense peaks are used.
    pub cal_peaks_multiplier: Option<f64>,
}

impl Default for PeakMatchParams {
    fn default() -> Self {
        Self {
            ppm_try: 10.0,
            min_peak_intensity: 10000.0,
            cal_peaks_multiplier: None,
        }
    }
}

/// Applies the intensity and top-N filters and sorts the survivors by m/z.
pub fn prepare_peaks(peaks: &[Peak], num_candidates: usize, params: &PeakMatchParams) -> Vec<Peak> {
    let mut out: Vec<Peak> = peaks
        .iter()
        .filter(|p| p.intensity > params.min_peak_intensity)
        .copied()
        .collect();

    if let Some(multiplier) = params.cal_peaks_multiplier {
        let keep = (multiplier * num_candidates as f64).ceil() as usize;
        if keep < out.len() {
            out.sort_by(|a, b| b.intensity.total_cmp(&a.intensity));
            out.truncate(keep);
        }
    }

    // Readers usually hand out sorted peaks, but nothing guarantees it.
    out.sort_by(|a, b| a.mz.total_cmp(&b.mz));
    out
}

/// Most intense peak with m/z in `[mz_min, mz_max]`. `peaks` must be sorted by m/z.
/// Peaks without intensity never match.
pub fn max_peak_in_window(peaks: &[Peak], mz_min: f64, mz_max: f64) -> Option<Peak> {
    let range = sorted_range_by_key(peaks, mz_min, mz_max, |p| p.mz);
    peaks[range]
        .iter()
        .fold(None, |best: Option<Peak>, p| match best {
            Some(b) if b.intensity >= p.intensity => Some(b),
            _ if p.intensity > 0.0 => Some(*p),
            _ => best,
        })
}

/// Matches every group to the most intense peak within `ppm_try` of its m/z.
/// Unmatched groups are dropped.
///
/// Matching is greedy per group: two groups whose windows overlap can both be
/// assigned the same peak.
pub fn match_peaks<'a>(
    peaks: &[Peak],
    groups: Vec<Calibrant<'a>>,
    params: &PeakMatchParams,
) -> Vec<Calibrant<'a>> {
    let peaks = prepare_peaks(peaks, groups.len(), params);
    groups
        .into_iter()
        .filter_map(|mut group| {
            let tol = params.ppm_try * PPM * group.mz;
            let peak = max_peak_in_window(&peaks, group.mz - tol, group.mz + tol)?;
            group.mz_measured = peak.mz;
            Some(group)
        })
        .collect()
}
