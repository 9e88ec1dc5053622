use super::sp::{
    IonMatchStats,
    SpScorer,
};
use super::xcorr::XcorrScorer;
use crate::config::SearchConfig;
use crate::errors::ConfigError;
use crate::models::{
    IonConstraint,
    IonSeries,
    Spectrum,
};
use crate::score_type::ScoreType;

/// A stateful scorer bound to one score type and, after its first call, to
/// one spectrum at one charge.
#[derive(Debug, Clone)]
pub enum Scorer {
    Sp(SpScorer),
    Xcorr(XcorrScorer),
}

impl Scorer {
    pub fn new(score_type: ScoreType, config: &SearchConfig) -> Result<Self, ConfigError> {
        match score_type {
            ScoreType::Sp => Ok(Scorer::Sp(SpScorer::new(config.beta, config.max_mz))),
            ScoreType::Xcorr => Ok(Scorer::Xcorr(XcorrScorer::new())),
            other => Err(ConfigError {
                msg: format!("No spectral scorer for score type {}", other),
            }),
        }
    }

    pub fn score_type(&self) -> ScoreType {
        match self {
            Scorer::Sp(_) => ScoreType::Sp,
            Scorer::Xcorr(_) => ScoreType::Xcorr,
        }
    }

    /// Ion types the predictor should produce for this scorer.
    pub fn ion_constraint(&self) -> IonConstraint {
        match self {
            Scorer::Sp(_) => IonConstraint::Sp,
            Scorer::Xcorr(_) => IonConstraint::Xcorr,
        }
    }

    pub fn score(&mut self, spectrum: &Spectrum, series: &IonSeries) -> f32 {
        match self {
            Scorer::Sp(x) => x.score(spectrum, series),
            Scorer::Xcorr(x) => x.score(spectrum, series),
        }
    }

    /// Statistics of the last Sp scoring. `None` for other scorers.
    pub fn ion_stats(&self) -> Option<IonMatchStats> {
        match self {
            Scorer::Sp(x) => Some(x.last_stats()),
            Scorer::Xcorr(_) => None,
        }
    }
}
