//! Master list of potential calibrants for one acquisition.
//!
//! Calibrants come from two sources: identified peptides that pass the score
//! filter, and a built-in list of compounds found in most samples
//! (cyclosiloxanes). The list is sorted by retention time so that the
//! calibrants eluting around a spectrum can be found with two binary searches.

use crate::chemistry::peptide_mass;
use crate::errors::{
    DomainDataError,
    Result,
};
use crate::score_filter::ScoreFilter;
use crate::traits::IdentificationSource;
use crate::utils::sorted_range_by_key;
use tracing::{
    info,
    warn,
};

/// Retention time of compounds that are present at every retention time.
pub const ANY_RETENTION_TIME: f64 = f64::MIN;

#[derive(Debug, Clone, PartialEq)]
pub struct IdentifiedCalibrant {
    /// Semicolon joined after [`crate::window::merge_same_mass`] when
    /// several identifications in one retention time window share the same mass.
    pub label: String,
    /// Uncharged monoisotopic mass.
    pub mass: f64,
    /// Seconds, or [`ANY_RETENTION_TIME`].
    pub retention_time: f64,
    pub id_charge: u8,
    pub single_charge_only: bool,
}

impl IdentifiedCalibrant {
    pub fn elutes_always(&self) -> bool {
        self.retention_time == ANY_RETENTION_TIME
    }
}

/// Cyclosiloxanes, H(6n)C(2n)O(n)Si(n), n = 6..12.
const FIXED_CALIBRANTS: [(&str, f64); 7] = [
    ("cyclosiloxane6", 444.1127481),
    ("cyclosiloxane7", 518.1315394),
    ("cyclosiloxane8", 592.1503308),
    ("cyclosiloxane9", 666.1691221),
    ("cyclosiloxane10", 740.1879134),
    ("cyclosiloxane11", 814.2067048),
    ("cyclosiloxane12", 888.2254961),
];

pub fn fixed_calibrants() -> impl Iterator<Item = IdentifiedCalibrant> {
    FIXED_CALIBRANTS
        .iter()
        .map(|(label, mass)| IdentifiedCalibrant {
            label: label.to_string(),
            mass: *mass,
            retention_time: ANY_RETENTION_TIME,
            id_charge: 1,
            single_charge_only: true,
        })
}

/// Calibrants sorted ascending by retention time.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    calibrants: Vec<IdentifiedCalibrant>,
    // Calibrants that elute at all times sort first, this is their count.
    num_always: usize,
}

impl Catalog {
    pub fn from_calibrants(mut calibrants: Vec<IdentifiedCalibrant>) -> Self {
        calibrants.sort_by(|a, b| a.retention_time.total_cmp(&b.retention_time));
        let num_always = calibrants
            .iter()
            .take_while(|c| c.retention_time == ANY_RETENTION_TIME)
            .count();
        Self {
            calibrants,
            num_always,
        }
    }

    pub fn len(&self) -> usize {
        self.calibrants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calibrants.is_empty()
    }

    pub fn as_slice(&self) -> &[IdentifiedCalibrant] {
        &self.calibrants
    }

    /// Calibrants eluting in `[rt_low, rt_high]` plus the ones eluting at
    /// every retention time. An empty or inverted window still returns the latter.
    pub fn select_in_rt_window(&self, rt_low: f64, rt_high: f64) -> Vec<&IdentifiedCalibrant> {
        let range = sorted_range_by_key(&self.calibrants, rt_low, rt_high, |c| c.retention_time);
        // The sentinel is the lowest f64, a window starting there already covers them.
        let range = range.start.max(self.num_always)..range.end.max(self.num_always);

        let mut out = Vec::with_capacity(range.len() + self.num_always);
        out.extend(self.calibrants[range].iter());
        out.extend(self.calibrants[..self.num_always].iter());
        out
    }
}

/// Builds the calibrant catalog from identifications and the built-in compounds.
///
/// Fails on an unknown residue or an identification without retention time,
/// partial catalogs would silently bias the recalibration.
pub fn build_catalog<I: IdentificationSource + ?Sized>(
    identifications: &I,
    filter: &ScoreFilter,
) -> Result<Catalog> {
    let num_idents = identifications.num_identifications();
    let mut calibrants = Vec::with_capacity(num_idents + FIXED_CALIBRANTS.len());

    for i in 0..num_idents {
        let ident = identifications.identification(i)?;
        if !filter.accepts(&ident.scores) {
            continue;
        }
        let retention_time = match ident.retention_time {
            Some(rt) if rt.is_finite() => rt,
            _ => return Err(DomainDataError::MissingRetentionTime { identification: i }.into()),
        };
        let mass = peptide_mass(&ident.sequence)? + ident.modification_mass;
        calibrants.push(IdentifiedCalibrant {
            label: ident.peptide_id,
            mass,
            retention_time,
            id_charge: ident.charge,
            single_charge_only: false,
        });
    }

    if calibrants.is_empty() {
        warn!(
            "No identified spectra will be used as calibrant. Is the score filter applicable for this file?"
        );
    } else {
        info!(
            "{} of {} identifications usable for calibration",
            calibrants.len(),
            num_idents
        );
    }

    calibrants.extend(fixed_calibrants());
    Ok(Catalog::from_calibrants(calibrants))
}
