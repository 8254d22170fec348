use crate::errors::DomainDataError;

pub const PROTON_MASS: f64 = 1.007276466879;
pub const WATER_MASS: f64 = 18.0105647;

/// Monoisotopic residue mass (amino acid minus H2O).
pub fn residue_mass(residue: char) -> Option<f64> {
    let mass = match residue {
        'A' => 71.0371138,
        'C' => 103.0091848,
        'D' => 115.0269430,
        'E' => 129.0425931,
        'F' => 147.0684139,
        'G' => 57.0214637,
        'H' => 137.0589119,
        'I' => 113.0840640,
        'K' => 128.0949630,
        'L' => 113.0840640,
        'M' => 131.0404849,
        'N' => 114.0429274,
        'O' => 237.1477269, // Pyrrolysine
        'P' => 97.0527638,
        'Q' => 128.0585775,
        'R' => 156.1011110,
        'S' => 87.0320284,
        'T' => 101.0476785,
        'U' => 144.9595902, // Selenocysteine
        'V' => 99.0684139,
        'W' => 186.0793129,
        'Y' => 163.0633285,
        _ => return None,
    };
    Some(mass)
}

/// Uncharged monoisotopic mass of an unmodified peptide.
pub fn peptide_mass(sequence: &str) -> Result<f64, DomainDataError> {
    sequence.chars().try_fold(WATER_MASS, |acc, aa| {
        residue_mass(aa)
            .map(|m| acc + m)
            .ok_or_else(|| DomainDataError::BadResidue {
                residue: aa,
                sequence: sequence.to_string(),
            })
    })
}

/// m/z of an ion of uncharged `mass` carrying `charge` protons.
#[inline]
pub fn mz_from_mass(mass: f64, charge: u8) -> f64 {
    let charge = charge as f64;
    (mass + charge * PROTON_MASS) / charge
}
