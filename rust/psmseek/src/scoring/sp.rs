use super::binning::{
    MASS_CUTOFF_MARGIN,
    filtered_peaks,
    mass_cutoff,
    mz_to_bin,
};
use crate::models::{
    IonSeries,
    IonType,
    Spectrum,
};
use tracing::trace;

const SP_NORMALIZATION: f32 = 100.0;
const ZERO_PEAK_HALF_WINDOW: usize = 50;
const MIN_NORMALIZABLE: f32 = 1e-5;

/// b/y fragment statistics of the most recent Sp scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IonMatchStats {
    pub matched: u32,
    pub possible: u32,
}

impl IonMatchStats {
    pub fn fraction_matched(&self) -> f32 {
        if self.possible == 0 {
            0.0
        } else {
            self.matched as f32 / self.possible as f32
        }
    }
}

/// Preliminary score. Preprocesses the spectrum once, then scores every
/// candidate against the processed intensity array.
#[derive(Debug, Clone)]
pub struct SpScorer {
    beta: f32,
    max_mz: usize,
    intensity: Vec<f32>,
    last_idx: usize,
    initialized: bool,
    last_stats: IonMatchStats,
}

impl SpScorer {
    pub fn new(beta: f32, max_mz: f32) -> Self {
        Self {
            beta,
            max_mz: max_mz.max(1.0) as usize,
            intensity: Vec::new(),
            last_idx: 0,
            initialized: false,
            last_stats: IonMatchStats::default(),
        }
    }

    pub fn last_stats(&self) -> IonMatchStats {
        self.last_stats
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn intensity_array(&self) -> &[f32] {
        &self.intensity
    }

    pub fn score(&mut self, spectrum: &Spectrum, series: &IonSeries) -> f32 {
        if !self.initialized {
            self.preprocess(spectrum, series.charge());
        }

        let mut intensity_sum = 0.0f32;
        let mut repeat_count = 0u32;
        let matched = self.match_ion_type(series, IonType::B, &mut intensity_sum, &mut repeat_count)
            + self.match_ion_type(series, IonType::Y, &mut intensity_sum, &mut repeat_count);

        let possible = series
            .iter()
            .filter(|x| matches!(x.ion_type, IonType::B | IonType::Y))
            .count() as u32;
        self.last_stats = IonMatchStats { matched, possible };

        if matched == 0 || possible == 0 {
            return 0.0;
        }
        (intensity_sum * matched as f32) * (1.0 + repeat_count as f32 * self.beta)
            / possible as f32
    }

    fn match_ion_type(
        &self,
        series: &IonSeries,
        ion_type: IonType,
        intensity_sum: &mut f32,
        repeat_count: &mut u32,
    ) -> u32 {
        // Last matched cleavage index per ion charge, reset for every ion type.
        let mut before_cleavage: Vec<Option<usize>> =
            vec![None; IonSeries::max_ion_charge(series.charge()) as usize + 1];
        let mut matched = 0;

        for ion in series.of_type(ion_type) {
            let bin = mz_to_bin(ion.mz);
            let observed = self.intensity.get(bin).copied().unwrap_or(0.0);
            if observed <= 0.0 {
                continue;
            }
            matched += 1;
            *intensity_sum += observed;

            let slot = (ion.charge as usize).min(before_cleavage.len() - 1);
            let expected = before_cleavage[slot].map_or(0, |x| x + 1);
            if ion.cleavage_idx == expected {
                *repeat_count += 1;
            }
            before_cleavage[slot] = Some(ion.cleavage_idx);
        }
        matched
    }

    fn preprocess(&mut self, spectrum: &Spectrum, charge: u8) {
        let cutoff = mass_cutoff(spectrum.precursor_mz, charge);
        self.intensity = vec![0.0; self.max_mz];
        self.last_idx = 0;

        let mut max_intensity = 0.0f32;
        for (bin, intensity) in filtered_peaks(spectrum, charge) {
            if bin >= self.max_mz {
                continue;
            }
            if self.intensity[bin] < intensity {
                self.intensity[bin] = intensity;
                max_intensity = max_intensity.max(intensity);
            }
            self.last_idx = self.last_idx.max(bin);
        }

        if max_intensity >= MIN_NORMALIZABLE {
            for x in self.intensity[..=self.last_idx].iter_mut() {
                *x = *x * SP_NORMALIZATION / max_intensity;
            }
        }

        self.smooth();
        self.zero_peaks();
        self.extract_peaks(top_bins(cutoff));
        self.equalize_peaks();
        self.initialized = true;

        trace!(
            scan = spectrum.scan,
            charge,
            last_idx = self.last_idx,
            "Preprocessed spectrum for Sp"
        );
    }

    fn smooth(&mut self) {
        let arr = &self.intensity;
        let mut smoothed = vec![0.0f32; self.max_mz];
        if self.max_mz > 4 {
            for idx in 2..self.max_mz - 2 {
                smoothed[idx] = (arr[idx - 2]
                    + 4.0 * arr[idx - 1]
                    + 6.0 * arr[idx]
                    + 4.0 * arr[idx + 1]
                    + arr[idx + 2])
                    / 16.0;
                if self.last_idx < idx && smoothed[idx] == 0.0 {
                    self.last_idx = idx - 1;
                    break;
                }
            }
        }
        self.intensity = smoothed;
    }

    fn zero_peaks(&mut self) {
        let mut extracted = vec![0.0f32; self.max_mz];
        let mut source = std::mem::take(&mut self.intensity);
        self.zero_peak_mean_stdev(&mut source, &mut extracted, 1.0);
        self.zero_peak_mean_stdev(&mut source, &mut extracted, 2.0);
        self.intensity = extracted;
    }

    fn zero_peak_mean_stdev(&mut self, source: &mut [f32], extracted: &mut [f32], step: f32) {
        let len = source.len();
        for idx in 0..len {
            let start = idx.saturating_sub(ZERO_PEAK_HALF_WINDOW);
            let end = (idx + ZERO_PEAK_HALF_WINDOW).min(len - 1);
            let window = &source[start..=end];
            let count = window.len() as f32;

            // The mean divides by count - 1 while the variance divides by
            // count. Scores depend on this exact pairing.
            let mean = window.iter().sum::<f32>() / (count - 1.0);
            let variance = window
                .iter()
                .map(|x| {
                    let dev = x - mean;
                    dev * dev
                })
                .sum::<f32>()
                / count;
            let stdev = variance.sqrt();

            if source[idx] > mean + step * stdev {
                extracted[idx] = source[idx] - (mean - stdev);
                self.last_idx = self.last_idx.max(idx);
                if step == 1.0 {
                    source[idx] = 0.0;
                }
            }
        }
    }

    fn extract_peaks(&mut self, top_rank: usize) {
        let mut positive: Vec<f32> = self.intensity.iter().copied().filter(|x| *x > 0.0).collect();
        if positive.is_empty() {
            return;
        }
        positive.sort_unstable_by(|a, b| b.total_cmp(a));
        let max_intensity = positive[0];
        let cut_off = if top_rank == 0 || top_rank > positive.len() {
            0.0
        } else {
            positive[top_rank - 1]
        };

        for x in self.intensity.iter_mut().filter(|x| **x > 0.0) {
            if *x < cut_off {
                *x = 0.0;
            } else {
                *x = *x / max_intensity * SP_NORMALIZATION;
            }
        }
    }

    fn equalize_peaks(&mut self) {
        let last_idx = self.last_idx.min(self.intensity.len());
        let arr = &mut self.intensity;
        let mut idx = 0;
        while idx < last_idx {
            if arr[idx] > 0.0 {
                let mut max_intensity = arr[idx];
                let mut end_idx = idx + 1;
                while end_idx < last_idx && arr[end_idx] > 0.0 {
                    max_intensity = max_intensity.max(arr[end_idx]);
                    end_idx += 1;
                }
                for x in arr[idx..end_idx].iter_mut() {
                    *x = max_intensity;
                }
                idx = end_idx;
            }
            idx += 1;
        }
    }
}

/// Number of bins kept after peak extraction.
pub fn top_bins(cutoff: f64) -> usize {
    let span = cutoff - MASS_CUTOFF_MARGIN;
    if span < 3200.0 {
        let bins = (16.0 * span.max(0.0)).sqrt().round() as usize;
        bins.min(200)
    } else {
        (span / 14.0) as usize
    }
}
