//! Shared m/z binning for both observed-spectrum preprocessors.

use crate::models::Spectrum;

pub const BIN_WIDTH_MONO: f64 = 1.000_507_9;
/// Peaks closer than this to the precursor m/z are dropped.
pub const PRECURSOR_EXCLUSION_WIDTH: f64 = 15.0;
pub const MASS_CUTOFF_MARGIN: f64 = 50.0;

#[inline]
pub fn mz_to_bin(mz: f64) -> usize {
    let bin = mz / BIN_WIDTH_MONO + 0.5;
    if bin <= 0.0 { 0 } else { bin as usize }
}

/// Highest fragment m/z considered for a spectrum at a charge.
pub fn mass_cutoff(precursor_mz: f64, charge: u8) -> f64 {
    precursor_mz * charge as f64 + MASS_CUTOFF_MARGIN
}

/// Peaks surviving the cutoff and precursor filters, as
/// `(bin, sqrt(intensity))`.
pub fn filtered_peaks(
    spectrum: &Spectrum,
    charge: u8,
) -> impl Iterator<Item = (usize, f32)> + '_ {
    let cutoff = mass_cutoff(spectrum.precursor_mz, charge);
    let lo = spectrum.precursor_mz - PRECURSOR_EXCLUSION_WIDTH;
    let hi = spectrum.precursor_mz + PRECURSOR_EXCLUSION_WIDTH;
    spectrum
        .peaks()
        .filter(move |(mz, _)| *mz <= cutoff && !(*mz > lo && *mz < hi))
        .map(|(mz, intensity)| (mz_to_bin(mz), intensity.max(0.0).sqrt()))
}
