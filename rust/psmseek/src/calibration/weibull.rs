use super::WeibullParams;
use crate::config::TopScoresToFit;
use crate::errors::CalibrationError;
use crate::utils::correlation::least_squares;

/// Grid of location shifts tried by the three-parameter fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

pub const XCORR_SHIFTS: ShiftRange = ShiftRange {
    min: -5.0,
    max: 5.0,
    step: 0.05,
};

pub const SP_SHIFTS: ShiftRange = ShiftRange {
    min: -100.0,
    max: 300.0,
    step: 5.0,
};

impl ShiftRange {
    /// From `max` down to (excluding) `min`. Computed from the step count so
    /// the grid does not drift.
    fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..)
            .map(move |k| self.max - k as f64 * self.step)
            .take_while(move |x| *x > self.min)
    }
}

/// How many of `total` sampled scores enter the fit.
pub fn fit_count(total: usize, selection: TopScoresToFit) -> Result<usize, CalibrationError> {
    match selection {
        TopScoresToFit::Fraction(frac) if frac > 0.0 => {
            Ok((total as f64 * frac.min(1.0)).floor() as usize)
        }
        TopScoresToFit::Count(n) if n > 0 => {
            if n > total {
                Err(CalibrationError::TooFewSamples {
                    found: total,
                    required: n,
                })
            } else {
                Ok(n)
            }
        }
        _ => Ok(total),
    }
}

/// Fits a three-parameter Weibull by rank regression on Y.
///
/// `sorted_scores` must be sorted best first. The top `fit` of them are
/// regressed against the Benard median ranks computed over all `total`
/// scores, for every shift in `shifts`; the shift whose regression has the
/// highest correlation wins.
pub fn fit_three_parameter_weibull(
    sorted_scores: &[f32],
    fit: usize,
    shifts: ShiftRange,
) -> Result<WeibullParams, CalibrationError> {
    let total = sorted_scores.len();
    let fit = fit.min(total);
    if fit < 2 {
        return Err(CalibrationError::TooFewSamples {
            found: fit,
            required: 2,
        });
    }

    let y: Vec<f64> = (0..fit)
        .map(|i| {
            let median_rank = (total - i) as f64 - 0.3;
            let cdf = median_rank / (total as f64 + 0.4);
            (-(1.0 - cdf).ln()).ln()
        })
        .collect();

    let lowest_fitted = sorted_scores[fit - 1] as f64;
    let mut best: Option<WeibullParams> = None;
    let mut x = vec![0.0f64; fit];
    for shift in shifts.iter() {
        if lowest_fitted + shift <= 0.0 {
            continue;
        }
        for (xi, s) in x.iter_mut().zip(sorted_scores.iter()) {
            *xi = (*s as f64 + shift).ln();
        }
        let line = match least_squares(&x, &y) {
            Ok(line) => line,
            Err(_) => continue,
        };
        let beta = line.slope;
        let eta = (-line.intercept / beta).exp();
        if !(beta.is_finite() && eta.is_finite()) {
            continue;
        }
        let improves = best
            .as_ref()
            .is_none_or(|b| line.correlation > b.correlation as f64);
        if improves {
            best = Some(WeibullParams {
                eta: eta as f32,
                beta: beta as f32,
                shift: shift as f32,
                correlation: line.correlation as f32,
            });
        }
    }

    best.ok_or(CalibrationError::DegenerateFit {
        context: "no shift leaves every fitted score positive",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Exact quantiles of a shifted Weibull, best first.
    fn weibull_quantiles(n: usize, eta: f64, beta: f64, shift: f64) -> Vec<f32> {
        (0..n)
            .map(|i| {
                let cdf = ((n - i) as f64 - 0.3) / (n as f64 + 0.4);
                (eta * (-(1.0 - cdf).ln()).powf(1.0 / beta) - shift) as f32
            })
            .collect()
    }

    #[test]
    fn test_recovers_parameters() {
        let scores = weibull_quantiles(500, 1.2, 2.5, 0.0);
        let fit = fit_count(scores.len(), TopScoresToFit::Fraction(0.55)).unwrap();
        assert_eq!(fit, 275);
        let params = fit_three_parameter_weibull(&scores, fit, XCORR_SHIFTS).unwrap();
        assert!((params.beta - 2.5).abs() < 0.05, "{:?}", params);
        assert!((params.eta - 1.2).abs() < 0.05, "{:?}", params);
        assert!(params.shift.abs() < 0.06, "{:?}", params);
        assert!(params.correlation > 0.999);
    }

    #[test]
    fn test_recovers_shift() {
        let scores = weibull_quantiles(400, 1.0, 2.0, -1.0);
        let params = fit_three_parameter_weibull(&scores, 400, XCORR_SHIFTS).unwrap();
        assert!((params.shift + 1.0).abs() < 0.06, "{:?}", params);
        assert!((params.beta - 2.0).abs() < 0.1, "{:?}", params);
    }

    #[test]
    fn test_fit_count() {
        assert_eq!(fit_count(100, TopScoresToFit::All).unwrap(), 100);
        assert_eq!(fit_count(100, TopScoresToFit::Count(40)).unwrap(), 40);
        assert!(matches!(
            fit_count(10, TopScoresToFit::Count(40)),
            Err(CalibrationError::TooFewSamples {
                found: 10,
                required: 40
            })
        ));
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(fit_three_parameter_weibull(&[1.0], 1, XCORR_SHIFTS).is_err());
        // Scores too negative for any shift.
        let scores = [-10.0f32, -11.0, -12.0];
        assert!(matches!(
            fit_three_parameter_weibull(&scores, 3, XCORR_SHIFTS),
            Err(CalibrationError::DegenerateFit { .. })
        ));
    }

    #[test]
    fn test_shift_grid() {
        let shifts: Vec<f64> = SP_SHIFTS.iter().collect();
        assert_eq!(shifts.len(), 80);
        assert_eq!(shifts[0], 300.0);
        assert_eq!(*shifts.last().unwrap(), -95.0);
    }
}
