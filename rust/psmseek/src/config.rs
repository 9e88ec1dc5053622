use crate::errors::ConfigError;
use crate::score_type::ScoreType;
use serde::{
    Deserialize,
    Serialize,
};

/// How many of the top sampled scores the Weibull fit uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TopScoresToFit {
    /// Fit `floor(total * fraction)` scores, `0 < fraction <= 1`.
    Fraction(f64),
    /// Fit exactly this many; fewer available matches fails the fit.
    Count(usize),
    All,
}

/// Every knob the scoring and calibration code reads. Threaded explicitly
/// into each call instead of looked up globally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub prelim_score_type: ScoreType,
    pub score_type: ScoreType,
    /// Matches kept after preliminary scoring.
    pub max_rank_preliminary: usize,
    /// Matches per spectrum written to `.csm` files.
    pub top_match: usize,
    /// Matches per spectrum reported downstream.
    pub max_sqt_result: usize,
    /// Matches sampled for distribution fitting; 0 uses all of them.
    pub sample_count: usize,
    pub top_fit_sp: usize,
    pub top_scores_to_fit: TopScoresToFit,
    /// Bonus weight for consecutive fragment matches in Sp.
    pub beta: f32,
    /// Size of the Sp intensity array, in bins.
    pub max_mz: f32,
    /// Half-width (Da) of the candidate precursor window.
    pub mass_window: f64,
    pub max_matches: usize,
    pub pi0: f64,
    pub number_decoy_sets: usize,
    /// Seed for the calibration sampler. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            prelim_score_type: ScoreType::Sp,
            score_type: ScoreType::LogpBonfWeibullXcorr,
            max_rank_preliminary: 500,
            top_match: 5,
            max_sqt_result: 5,
            sample_count: 500,
            top_fit_sp: 1000,
            top_scores_to_fit: TopScoresToFit::Fraction(0.55),
            beta: 0.075,
            max_mz: 4000.0,
            mass_window: 3.0,
            max_matches: 10_000_000,
            pi0: 1.0,
            number_decoy_sets: 1,
            seed: None,
        }
    }
}

impl SearchConfig {
    /// Number of top matches that receive a p-value.
    pub fn top_rank_for_p_value(&self) -> usize {
        self.top_match.max(self.max_sqt_result)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prelim_score_type != ScoreType::Sp {
            return Err(ConfigError {
                msg: format!(
                    "Preliminary score type must be sp, got {}",
                    self.prelim_score_type
                ),
            });
        }
        let supported_main = matches!(
            self.score_type,
            ScoreType::Xcorr
                | ScoreType::LogpExpSp
                | ScoreType::LogpBonfExpSp
                | ScoreType::LogpWeibullSp
                | ScoreType::LogpBonfWeibullSp
                | ScoreType::LogpWeibullXcorr
                | ScoreType::LogpBonfWeibullXcorr
                | ScoreType::LogpEvdXcorr
                | ScoreType::LogpBonfEvdXcorr
        );
        if !supported_main {
            return Err(ConfigError {
                msg: format!("Unsupported main score type {}", self.score_type),
            });
        }
        if let TopScoresToFit::Fraction(frac) = self.top_scores_to_fit {
            if !(frac > 0.0 && frac <= 1.0) {
                return Err(ConfigError {
                    msg: format!("Fraction of top scores to fit must be in (0, 1], got {}", frac),
                });
            }
        }
        if self.number_decoy_sets > 3 {
            return Err(ConfigError {
                msg: format!(
                    "At most 3 decoy sets are supported, got {}",
                    self.number_decoy_sets
                ),
            });
        }
        if !(self.pi0 > 0.0 && self.pi0 <= 1.0) {
            return Err(ConfigError {
                msg: format!("pi0 must be in (0, 1], got {}", self.pi0),
            });
        }
        if self.max_mz < 1.0 {
            return Err(ConfigError {
                msg: format!("max_mz must be positive, got {}", self.max_mz),
            });
        }
        if self.top_match == 0 {
            return Err(ConfigError {
                msg: "top_match must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
