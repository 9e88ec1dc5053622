use super::peptide::Peptide;
use crate::score_type::{
    SCORE_TYPE_COUNT,
    ScoreType,
};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

/// Stored on matches past the top ranks that were not given a p-value.
pub const P_VALUE_NA: f32 = f32::NAN;

pub fn is_p_value_na(x: f32) -> bool {
    x.is_nan()
}

/// Shared handle to a match. Samples and iterators clone the handle, never
/// the match.
pub type MatchHandle = Rc<Match>;

/// The spectrum a match was scored against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumRef {
    pub scan: u32,
    pub precursor_mz: f64,
}

/// One peptide/spectrum pairing.
///
/// Scores and ranks live in `Cell`s so a score written through any handle
/// (e.g. through a calibration sample) is visible through every other one.
#[derive(Debug)]
pub struct Match {
    peptide: Arc<Peptide>,
    spectrum: SpectrumRef,
    charge: u8,
    scores: [Cell<Option<f32>>; SCORE_TYPE_COUNT],
    ranks: [Cell<u32>; SCORE_TYPE_COUNT],
    b_y_ions_matched: u32,
    b_y_ions_possible: u32,
    delta_cn: Cell<f32>,
    ln_delta_cn: Cell<f32>,
    ln_experiment_size: Cell<f32>,
}

impl Match {
    pub fn new(peptide: Arc<Peptide>, spectrum: SpectrumRef, charge: u8) -> Self {
        Self {
            peptide,
            spectrum,
            charge,
            scores: Default::default(),
            ranks: Default::default(),
            b_y_ions_matched: 0,
            b_y_ions_possible: 0,
            delta_cn: Cell::new(0.0),
            ln_delta_cn: Cell::new(0.0),
            ln_experiment_size: Cell::new(0.0),
        }
    }

    pub fn with_ion_stats(mut self, matched: u32, possible: u32) -> Self {
        self.b_y_ions_matched = matched;
        self.b_y_ions_possible = possible;
        self
    }

    pub fn score(&self, score_type: ScoreType) -> Option<f32> {
        self.scores[score_type.index()].get()
    }

    /// Score used for ordering. Missing and NA scores sort last.
    pub(crate) fn sort_key(&self, score_type: ScoreType) -> f32 {
        match self.score(score_type) {
            Some(x) if !x.is_nan() => x,
            _ => f32::NEG_INFINITY,
        }
    }

    pub fn has_score(&self, score_type: ScoreType) -> bool {
        self.scores[score_type.index()].get().is_some()
    }

    pub(crate) fn set_score(&self, score_type: ScoreType, value: f32) {
        self.scores[score_type.index()].set(Some(value));
    }

    /// 0 means unranked.
    pub fn rank(&self, score_type: ScoreType) -> u32 {
        self.ranks[score_type.index()].get()
    }

    pub(crate) fn set_rank(&self, score_type: ScoreType, rank: u32) {
        self.ranks[score_type.index()].set(rank);
    }

    pub fn peptide(&self) -> &Arc<Peptide> {
        &self.peptide
    }

    pub fn spectrum(&self) -> SpectrumRef {
        self.spectrum
    }

    pub fn charge(&self) -> u8 {
        self.charge
    }

    pub fn is_decoy(&self) -> bool {
        self.peptide.is_decoy()
    }

    pub fn b_y_ions_matched(&self) -> u32 {
        self.b_y_ions_matched
    }

    pub fn b_y_ions_possible(&self) -> u32 {
        self.b_y_ions_possible
    }

    pub fn b_y_ions_fraction_matched(&self) -> f32 {
        if self.b_y_ions_possible == 0 {
            0.0
        } else {
            self.b_y_ions_matched as f32 / self.b_y_ions_possible as f32
        }
    }

    pub fn delta_cn(&self) -> f32 {
        self.delta_cn.get()
    }

    pub fn ln_delta_cn(&self) -> f32 {
        self.ln_delta_cn.get()
    }

    pub fn ln_experiment_size(&self) -> f32 {
        self.ln_experiment_size.get()
    }

    /// Copies the per-spectrum fields onto the match.
    pub(crate) fn stamp_spectrum_fields(
        &self,
        delta_cn: f32,
        ln_delta_cn: f32,
        ln_experiment_size: f32,
    ) {
        self.delta_cn.set(delta_cn);
        self.ln_delta_cn.set(ln_delta_cn);
        self.ln_experiment_size.set(ln_experiment_size);
    }

    pub fn to_record(&self) -> MatchRecord {
        MatchRecord {
            peptide: self.peptide.clone(),
            spectrum: self.spectrum,
            charge: self.charge,
            scores: std::array::from_fn(|i| self.scores[i].get()),
            ranks: std::array::from_fn(|i| self.ranks[i].get()),
            b_y_ions_matched: self.b_y_ions_matched,
            b_y_ions_possible: self.b_y_ions_possible,
        }
    }

    pub fn from_record(record: MatchRecord) -> Self {
        Self {
            peptide: record.peptide,
            spectrum: record.spectrum,
            charge: record.charge,
            scores: record.scores.map(Cell::new),
            ranks: record.ranks.map(Cell::new),
            b_y_ions_matched: record.b_y_ions_matched,
            b_y_ions_possible: record.b_y_ions_possible,
            delta_cn: Cell::new(0.0),
            ln_delta_cn: Cell::new(0.0),
            ln_experiment_size: Cell::new(0.0),
        }
    }
}

/// Owned, `Send` snapshot of a [`Match`]. This is what crosses threads and
/// what the `.csm` codec reads and writes.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub peptide: Arc<Peptide>,
    pub spectrum: SpectrumRef,
    pub charge: u8,
    pub scores: [Option<f32>; SCORE_TYPE_COUNT],
    pub ranks: [u32; SCORE_TYPE_COUNT],
    pub b_y_ions_matched: u32,
    pub b_y_ions_possible: u32,
}
