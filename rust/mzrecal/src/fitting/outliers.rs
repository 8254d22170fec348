//! Outlier rejection between fit rounds.
//!
//! Both rules take the relative errors of the current calibrants and return
//! the indices (into that slice, in order) of the calibrants to keep, plus
//! whether nothing had to be removed.

use crate::utils::PPM;

/// Relative errors this small are rounding noise of an exact fit and are
/// always inside the robust fences.
pub const ROBUST_ERROR_FLOOR: f64 = 1e-12;

/// Keeps calibrants with `|error| <= ppm_accept` ppm.
pub fn reject_fixed(relative_errors: &[f64], ppm_accept: f64) -> (Vec<usize>, bool) {
    let limit = ppm_accept * PPM;
    let kept: Vec<usize> = relative_errors
        .iter()
        .enumerate()
        .filter(|(_, e)| e.abs() <= limit)
        .map(|(i, _)| i)
        .collect();
    let satisfied = kept.len() == relative_errors.len();
    (kept, satisfied)
}

/// Tukey fences on the quartiles of the relative errors (mzQC outlier rule).
///
/// Fewer than 4 calibrants cannot be judged and are accepted as is. The
/// fences never get closer to zero than [`ROBUST_ERROR_FLOOR`].
pub fn reject_robust(relative_errors: &[f64]) -> (Vec<usize>, bool) {
    let n = relative_errors.len();
    if n < 4 {
        return ((0..n).collect(), true);
    }

    let mut sorted = relative_errors.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let (q1, q3) = quartiles(&sorted);
    let iqr = q3 - q1;
    let low = (q1 - 1.5 * iqr).min(-ROBUST_ERROR_FLOOR);
    let high = (q3 + 1.5 * iqr).max(ROBUST_ERROR_FLOOR);

    let kept: Vec<usize> = relative_errors
        .iter()
        .enumerate()
        .filter(|(_, e)| **e >= low && **e <= high)
        .map(|(i, _)| i)
        .collect();
    let satisfied = kept.len() == n;
    (kept, satisfied)
}

/// First and third quartile of at least 4 sorted values.
fn quartiles(sorted: &[f64]) -> (f64, f64) {
    let n = sorted.len();
    debug_assert!(n >= 4);
    if n < 6 {
        return (sorted[1], sorted[n - 2]);
    }
    let half = n / 2;
    (median(&sorted[..half]), median(&sorted[n - half..]))
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}
