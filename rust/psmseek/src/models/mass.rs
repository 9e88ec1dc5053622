//! Monoisotopic masses used by the reference ion predictor.

pub const PROTON: f64 = 1.007_276_466_88;
pub const MASS_H2O_MONO: f64 = 18.010_565;
pub const MASS_NH3_MONO: f64 = 17.026_549;
pub const MASS_CO_MONO: f64 = 27.994_915;

/// Unmodified residue mass, `None` for anything that is not one of the 20
/// standard amino acids.
pub fn residue_mass(residue: u8) -> Option<f64> {
    let mass = match residue {
        b'G' => 57.021_464,
        b'A' => 71.037_114,
        b'S' => 87.032_028,
        b'P' => 97.052_764,
        b'V' => 99.068_414,
        b'T' => 101.047_679,
        b'C' => 103.009_185,
        b'L' | b'I' => 113.084_064,
        b'N' => 114.042_927,
        b'D' => 115.026_943,
        b'Q' => 128.058_578,
        b'K' => 128.094_963,
        b'E' => 129.042_593,
        b'M' => 131.040_485,
        b'H' => 137.058_912,
        b'F' => 147.068_414,
        b'R' => 156.101_111,
        b'Y' => 163.063_329,
        b'W' => 186.079_313,
        _ => return None,
    };
    Some(mass)
}

/// Neutral monoisotopic mass of an unmodified peptide.
pub fn peptide_mass(sequence: &str) -> Option<f64> {
    sequence
        .bytes()
        .try_fold(MASS_H2O_MONO, |acc, r| residue_mass(r).map(|m| acc + m))
}
