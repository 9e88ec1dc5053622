use super::EvdParams;
use crate::errors::CalibrationError;

const STARTING_LAMBDA: f64 = 1.0;
const CONVERGENCE_EPSILON: f64 = 0.001;
pub const MAX_NEWTON_ITERATIONS: usize = 10_000;

/// Maximum likelihood fit of a Gumbel (type I extreme value) distribution,
/// finding lambda by Newton-Raphson and mu from lambda.
pub fn fit_evd(scores: &[f32]) -> Result<EvdParams, CalibrationError> {
    if scores.len() < 2 {
        return Err(CalibrationError::TooFewSamples {
            found: scores.len(),
            required: 2,
        });
    }
    let scores: Vec<f64> = scores.iter().map(|x| *x as f64).collect();
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;

    let mut lambda = STARTING_LAMBDA;
    for _ in 0..MAX_NEWTON_ITERATIONS {
        let terms = ConstraintTerms::new(&scores, lambda);
        let f = 1.0 / lambda - mean + terms.weighted_mean();
        if !f.is_finite() {
            break;
        }
        if f.abs() < CONVERGENCE_EPSILON {
            let mu = -1.0 / lambda * (terms.exp_sum / n).ln();
            if !mu.is_finite() {
                break;
            }
            return Ok(EvdParams {
                mu: mu as f32,
                lambda: lambda as f32,
            });
        }
        let f_prime = terms.weighted_mean().powi(2) - terms.exp_sq_sum / terms.exp_sum
            - 1.0 / (lambda * lambda);
        lambda -= f / f_prime;
        if !lambda.is_finite() {
            break;
        }
    }

    Err(CalibrationError::NoConvergence {
        iterations: MAX_NEWTON_ITERATIONS,
    })
}

/// Sums of `e^{-L s}`, `s e^{-L s}` and `s^2 e^{-L s}`.
struct ConstraintTerms {
    exp_sum: f64,
    exp_score_sum: f64,
    exp_sq_sum: f64,
}

impl ConstraintTerms {
    fn new(scores: &[f64], lambda: f64) -> Self {
        let mut out = ConstraintTerms {
            exp_sum: 0.0,
            exp_score_sum: 0.0,
            exp_sq_sum: 0.0,
        };
        for s in scores {
            let e = (-lambda * s).exp();
            out.exp_sum += e;
            out.exp_score_sum += e * s;
            out.exp_sq_sum += e * s * s;
        }
        out
    }

    fn weighted_mean(&self) -> f64 {
        self.exp_score_sum / self.exp_sum
    }
}
