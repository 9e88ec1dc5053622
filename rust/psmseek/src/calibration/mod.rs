//! Fitting null score distributions and turning raw scores into
//! calibrated `-ln(p)` values.

mod evd;
mod exp_sp;
pub mod pvalues;
mod weibull;

pub use evd::{
    MAX_NEWTON_ITERATIONS,
    fit_evd,
};
pub use exp_sp::estimate_exp_sp;
pub use weibull::{
    SP_SHIFTS,
    ShiftRange,
    XCORR_SHIFTS,
    fit_count,
    fit_three_parameter_weibull,
};

/// Extreme value distribution location and decay.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvdParams {
    pub mu: f32,
    pub lambda: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeibullParams {
    pub eta: f32,
    pub beta: f32,
    pub shift: f32,
    pub correlation: f32,
}

/// Parameters of the exponential Sp model.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExpSpParams {
    pub sp_scores_mean: f32,
    pub base_score_sp: f32,
    pub top_fit_sp: usize,
}
