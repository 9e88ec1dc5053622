use super::binning::{
    filtered_peaks,
    mass_cutoff,
    mz_to_bin,
};
use crate::models::mass::{
    MASS_H2O_MONO,
    MASS_NH3_MONO,
};
use crate::models::{
    IonSeries,
    IonType,
    Spectrum,
};
use tracing::trace;

const NUM_REGIONS: usize = 10;
const REGION_NORMALIZATION: f32 = 50.0;
const MAX_XCORR_OFFSET: i64 = 75;

const PRIMARY_INTENSITY: f32 = 50.0;
const FLANKING_INTENSITY: f32 = 25.0;
const NEUTRAL_LOSS_INTENSITY: f32 = 10.0;
const A_ION_INTENSITY: f32 = 10.0;

/// Cross-correlation score against a background-subtracted spectrum.
#[derive(Debug, Clone, Default)]
pub struct XcorrScorer {
    max_mz: usize,
    observed: Vec<f32>,
    theoretical: Vec<f32>,
    initialized: bool,
}

impl XcorrScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn max_mz(&self) -> usize {
        self.max_mz
    }

    pub(crate) fn observed(&self) -> &[f32] {
        &self.observed
    }

    pub fn score(&mut self, spectrum: &Spectrum, series: &IonSeries) -> f32 {
        if !self.initialized {
            self.preprocess(spectrum, series.charge());
        }
        self.build_theoretical(series);
        let dot: f32 = self
            .observed
            .iter()
            .zip(self.theoretical.iter())
            .map(|(o, t)| o * t)
            .sum();
        dot / 10000.0
    }

    fn preprocess(&mut self, spectrum: &Spectrum, charge: u8) {
        let cutoff = mass_cutoff(spectrum.precursor_mz, charge);
        self.max_mz = array_size(cutoff);
        self.observed = vec![0.0; self.max_mz];
        self.theoretical = vec![0.0; self.max_mz];

        let region_selector = ((spectrum.max_peak_mz() / NUM_REGIONS as f64) as usize).max(1);
        let mut max_per_region = [0.0f32; NUM_REGIONS];

        for (bin, intensity) in filtered_peaks(spectrum, charge) {
            let region = bin / region_selector;
            if region >= NUM_REGIONS || bin >= self.max_mz {
                continue;
            }
            if self.observed[bin] < intensity {
                self.observed[bin] = intensity;
                max_per_region[region] = max_per_region[region].max(intensity);
            }
        }

        self.normalize_regions(&max_per_region, region_selector);
        self.subtract_background();
        self.initialized = true;

        trace!(
            scan = spectrum.scan,
            charge,
            max_mz = self.max_mz,
            region_selector,
            "Preprocessed spectrum for Xcorr"
        );
    }

    fn normalize_regions(&mut self, max_per_region: &[f32; NUM_REGIONS], region_selector: usize) {
        let mut region = 0;
        let mut max_intensity = max_per_region[region];
        for bin in 0..self.max_mz {
            if bin >= region_selector * (region + 1) && region < NUM_REGIONS - 1 {
                region += 1;
                max_intensity = max_per_region[region];
            }
            if max_intensity != 0.0 {
                self.observed[bin] = self.observed[bin] / max_intensity * REGION_NORMALIZATION;
            }
            if bin > NUM_REGIONS * region_selector {
                return;
            }
        }
    }

    fn subtract_background(&mut self) {
        let obs = &self.observed;
        let size = self.max_mz as i64;
        let corrected: Vec<f32> = (0..size)
            .map(|idx| {
                let lo = (idx - MAX_XCORR_OFFSET).max(1);
                let hi = (idx + MAX_XCORR_OFFSET).min(size - 1);
                let background: f32 = (lo..=hi)
                    .map(|j| obs[j as usize] / (MAX_XCORR_OFFSET as f32 * 2.0))
                    .sum();
                obs[idx as usize] - background
            })
            .collect();
        self.observed = corrected;
    }

    fn build_theoretical(&mut self, series: &IonSeries) {
        self.theoretical.iter_mut().for_each(|x| *x = 0.0);
        for ion in series.iter() {
            let bin = mz_to_bin(ion.mz);
            if bin >= self.max_mz {
                continue;
            }
            match ion.ion_type {
                IonType::B | IonType::Y => {
                    if ion.modified {
                        continue;
                    }
                    self.add_intensity(Some(bin), PRIMARY_INTENSITY);
                    self.add_intensity(Some(bin + 1), FLANKING_INTENSITY);
                    self.add_intensity(bin.checked_sub(1), FLANKING_INTENSITY);
                    if ion.ion_type == IonType::B {
                        self.add_intensity(loss_bin(ion.mz, MASS_H2O_MONO), NEUTRAL_LOSS_INTENSITY);
                    }
                    self.add_intensity(loss_bin(ion.mz, MASS_NH3_MONO), NEUTRAL_LOSS_INTENSITY);
                }
                IonType::A => {
                    self.add_intensity(Some(bin), A_ION_INTENSITY);
                }
            }
        }
    }

    /// Keeps the larger of the existing and the new intensity.
    fn add_intensity(&mut self, bin: Option<usize>, intensity: f32) {
        if let Some(slot) = bin.and_then(|b| self.theoretical.get_mut(b)) {
            *slot = slot.max(intensity);
        }
    }
}

fn loss_bin(mz: f64, loss: f64) -> Option<usize> {
    let shifted = mz - loss;
    if shifted < 0.0 {
        None
    } else {
        Some(mz_to_bin(shifted))
    }
}

/// Cutoff rounded up to a multiple of 1024, with a floor of 512.
fn array_size(cutoff: f64) -> usize {
    if cutoff > 512.0 {
        let blocks = (cutoff / 1024.0).floor() as usize;
        let rem = cutoff - (blocks * 1024) as f64;
        if rem > 0.0 {
            (blocks + 1) * 1024
        } else {
            blocks * 1024
        }
    } else {
        512
    }
}
