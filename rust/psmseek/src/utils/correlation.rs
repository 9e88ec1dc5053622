use crate::errors::CalibrationError;

/// Ordinary least squares fit of `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation between x and y.
    pub correlation: f64,
}

/// Calculates the Pearson correlation between two slices of the same size.
///
/// # Example
///
/// ```
/// use psmseek::utils::correlation::pearson_correlation;
///
/// let a = vec![1.0, 2.0, 3.0];
/// let b = vec![2.0, 4.0, 6.0];
/// let result = pearson_correlation(&a, &b).unwrap();
/// assert!((result - 1.0).abs() < 1e-12);
/// ```
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Result<f64, CalibrationError> {
    Ok(least_squares(x, y)?.correlation)
}

pub fn least_squares(x: &[f64], y: &[f64]) -> Result<LinearFit, CalibrationError> {
    if x.len() != y.len() {
        return Err(CalibrationError::DegenerateFit {
            context: "regression inputs differ in length",
        });
    }
    if x.len() < 2 {
        return Err(CalibrationError::DegenerateFit {
            context: "fewer than two points to regress",
        });
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return Err(CalibrationError::DegenerateFit {
            context: "zero variance in regression input",
        });
    }

    let slope = sxy / sxx;
    Ok(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
        correlation: sxy / (sxx.sqrt() * syy.sqrt()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_least_squares() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let fit = least_squares(&x, &y).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.correlation - 1.0).abs() < 1e-12);

        let anti = pearson_correlation(&x, &[3.0, 2.0, 1.0, 0.0]).unwrap();
        assert!((anti + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(least_squares(&[1.0], &[1.0]).is_err());
        assert!(least_squares(&[1.0, 2.0], &[1.0]).is_err());
        assert!(least_squares(&[1.0, 1.0], &[1.0, 2.0]).is_err());
    }
}
