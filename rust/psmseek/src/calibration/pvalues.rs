//! Score to `-ln(p)` conversions.

const BONFERRONI_CUT_OFF_P: f64 = 1e-4;
const BONFERRONI_CUT_OFF_NP: f64 = 1e-2;
/// `log10` of the largest finite f64, used to avoid underflow near p = 0.
const DBL_MAX_10_EXP: f64 = 308.0;

/// `-ln(p)` under an exponential with the given mean. `score` is already
/// offset by the base Sp score.
pub fn logp_exp_sp(score: f64, mean: f64) -> f64 {
    -(-(1.0 / mean) * score).exp().ln()
}

pub fn logp_bonf_exp_sp(score: f64, mean: f64, num_peptides: usize) -> f64 {
    let p = (-(1.0 / mean) * score).exp();
    bonferroni_correct(p, num_peptides)
}

/// `-ln(p)` under a two-parameter Weibull. The shift is not applied.
pub fn logp_weibull(score: f64, eta: f64, beta: f64) -> f64 {
    (score / eta).powf(beta)
}

pub fn logp_bonf_weibull(score: f64, eta: f64, beta: f64, shift: f64, num_peptides: usize) -> f64 {
    let p = (-((score + shift) / eta).powf(beta)).exp();
    bonferroni_correct(p, num_peptides)
}

/// `P(S > score)` under an extreme value distribution, guarded against
/// floating point trouble at both ends.
pub fn evd_p_value(score: f64, mu: f64, lambda: f64) -> f64 {
    let z = lambda * (score - mu);
    if z <= -(-(f64::EPSILON.ln())).ln() {
        return 1.0;
    }
    if z >= 2.3 * DBL_MAX_10_EXP {
        return 0.0;
    }
    let p = (-z).exp();
    if p < 1e-7 { p } else { 1.0 - (-p).exp() }
}

pub fn logp_evd_xcorr(score: f64, mu: f64, lambda: f64) -> f64 {
    -evd_p_value(score, mu, lambda).ln()
}

pub fn logp_bonf_evd_xcorr(score: f64, mu: f64, lambda: f64, num_peptides: usize) -> f64 {
    bonferroni_correct(evd_p_value(score, mu, lambda), num_peptides)
}

/// `-ln` of the probability that the best of `n` independent candidates
/// scores at least as well. Uses the `p * n` approximation when that is
/// accurate and `1 - (1 - p)^n` would lose precision.
pub fn bonferroni_correct(p: f64, n: usize) -> f64 {
    let n_f = n as f64;
    if p > BONFERRONI_CUT_OFF_P || p * n_f > BONFERRONI_CUT_OFF_NP {
        -(1.0 - (1.0 - p).powf(n_f)).ln()
    } else {
        -(p * n_f).ln()
    }
}
