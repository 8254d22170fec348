//! Per-spectrum candidate generation.
//!
//! Catalog entries eluting around a spectrum are expanded into charged
//! candidates. Candidates that land on (nearly) the same m/z cannot be told
//! apart by the peak matcher, so they are merged into one [`Calibrant`] group.

use crate::catalog::{
    Catalog,
    IdentifiedCalibrant,
};
use crate::chemistry::mz_from_mass;
use crate::errors::ConfigError;
use crate::models::Peak;
use crate::utils::{
    TupleRange,
    parse_int_range,
};
use std::borrow::Cow;
use std::fmt::Display;
use std::str::FromStr;

/// Absolute mass difference (Da) below which two catalog entries are merged.
pub const MERGE_MASS_TOLERANCE: f64 = 1e-7;

/// Relative m/z difference below which two candidates are merged.
pub const MERGE_MZ_TOLERANCE: f64 = 1e-7;

pub const MIN_CHARGE: u8 = 1;
pub const MAX_CHARGE: u8 = 5;

/// A catalog entry at one trial charge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargedCalibrant<'a> {
    pub calibrant: &'a IdentifiedCalibrant,
    pub charge: u8,
    pub mz: f64,
}

impl<'a> ChargedCalibrant<'a> {
    pub fn new(calibrant: &'a IdentifiedCalibrant, charge: u8) -> Self {
        Self {
            calibrant,
            charge,
            mz: mz_from_mass(calibrant.mass, charge),
        }
    }
}

/// Charged candidates sharing one m/z.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibrant<'a> {
    /// Ascending by m/z, the first member defines [`Calibrant::mz`].
    pub members: Vec<ChargedCalibrant<'a>>,
    pub mz: f64,
    /// m/z of the matched peak, 0.0 until matched.
    pub mz_measured: f64,
}

impl<'a> Calibrant<'a> {
    pub fn from_member(member: ChargedCalibrant<'a>) -> Self {
        Self {
            mz: member.mz,
            members: vec![member],
            mz_measured: 0.0,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.mz_measured > 0.0
    }
}

/// Which charges a catalog entry is tried at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeSelection {
    /// Only the charge the identification reported.
    Identification,
    /// Every charge in `min..=max`.
    Range { min: u8, max: u8 },
}

impl Default for ChargeSelection {
    fn default() -> Self {
        Self::Range {
            min: MIN_CHARGE,
            max: MAX_CHARGE,
        }
    }
}

impl FromStr for ChargeSelection {
    type Err = ConfigError;

    /// `"ident"` or an integer range such as `"1:3"`, clamped to `[1, 5]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("ident") {
            return Ok(Self::Identification);
        }
        let range = parse_int_range(s, MIN_CHARGE as i64, MAX_CHARGE as i64).map_err(|_| {
            ConfigError::InvalidChargeSelection {
                input: s.to_string(),
            }
        })?;
        Ok(Self::Range {
            min: range.start() as u8,
            max: range.end() as u8,
        })
    }
}

impl Display for ChargeSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identification => write!(f, "ident"),
            Self::Range { min, max } => write!(f, "{}:{}", min, max),
        }
    }
}

/// Catalog entries eluting in `retention_time + offsets`, plus the ones
/// eluting at every retention time.
pub fn select_in_rt_window<'a>(
    catalog: &'a Catalog,
    retention_time: f64,
    offsets: &TupleRange<f64>,
) -> Vec<&'a IdentifiedCalibrant> {
    catalog.select_in_rt_window(retention_time + offsets.start(), retention_time + offsets.end())
}

/// Sorts the selection by mass and folds entries within
/// [`MERGE_MASS_TOLERANCE`] of the current entry into it. The first entry keeps
/// its fields, the labels of the others are appended with `;`.
pub fn merge_same_mass(mut selected: Vec<&IdentifiedCalibrant>) -> Vec<Cow<'_, IdentifiedCalibrant>> {
    selected.sort_by(|a, b| a.mass.total_cmp(&b.mass));
    let mut merged: Vec<Cow<'_, IdentifiedCalibrant>> = Vec::with_capacity(selected.len());
    for cal in selected {
        match merged.last_mut() {
            Some(last) if (cal.mass - last.mass).abs() < MERGE_MASS_TOLERANCE => {
                let label = &mut last.to_mut().label;
                label.push(';');
                label.push_str(&cal.label);
            }
            _ => merged.push(Cow::Borrowed(cal)),
        }
    }
    merged
}

pub fn expand_charges<'a>(
    selected: &[&'a IdentifiedCalibrant],
    charges: ChargeSelection,
) -> Vec<ChargedCalibrant<'a>> {
    let per_entry = match charges {
        ChargeSelection::Identification => 1,
        ChargeSelection::Range { min, max } => (max.saturating_sub(min) + 1) as usize,
    };
    let mut out = Vec::with_capacity(selected.len() * per_entry);
    for &cal in selected {
        if cal.single_charge_only {
            out.push(ChargedCalibrant::new(cal, 1));
            continue;
        }
        match charges {
            ChargeSelection::Identification => {
                // A charge of zero cannot produce an m/z.
                if cal.id_charge >= 1 {
                    out.push(ChargedCalibrant::new(cal, cal.id_charge));
                }
            }
            ChargeSelection::Range { min, max } => {
                out.extend((min..=max).map(|z| ChargedCalibrant::new(cal, z)));
            }
        }
    }
    out
}

/// Sorts candidates by m/z and merges the ones closer than
/// [`MERGE_MZ_TOLERANCE`] (relative) to the current group.
pub fn merge_same_mz(mut charged: Vec<ChargedCalibrant<'_>>) -> Vec<Calibrant<'_>> {
    charged.sort_by(|a, b| a.mz.total_cmp(&b.mz));
    merge_groups(charged.into_iter().map(Calibrant::from_member).collect())
}

/// Merges groups, sorted ascending by m/z, whose m/z is within the relative
/// tolerance of the preceding group. Merging already merged groups is a no-op.
pub fn merge_groups(groups: Vec<Calibrant<'_>>) -> Vec<Calibrant<'_>> {
    let mut merged: Vec<Calibrant<'_>> = Vec::with_capacity(groups.len());
    for group in groups {
        match merged.last_mut() {
            Some(last) if (group.mz - last.mz).abs() < MERGE_MZ_TOLERANCE * last.mz => {
                last.members.extend(group.members);
            }
            _ => merged.push(group),
        }
    }
    merged
}

/// Drops groups outside the m/z range covered by `peaks`.
pub fn restrict_to_peak_range<'a>(groups: Vec<Calibrant<'a>>, peaks: &[Peak]) -> Vec<Calibrant<'a>> {
    let Some((lo, hi)) = peaks.iter().fold(None, |acc: Option<(f64, f64)>, p| match acc {
        None => Some((p.mz, p.mz)),
        Some((lo, hi)) => Some((lo.min(p.mz), hi.max(p.mz))),
    }) else {
        return Vec::new();
    };
    groups
        .into_iter()
        .filter(|g| g.mz >= lo && g.mz <= hi)
        .collect()
}
