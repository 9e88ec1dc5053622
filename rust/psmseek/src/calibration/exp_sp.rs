use super::ExpSpParams;
use crate::errors::CalibrationError;

/// Scales Sp so that the `top_fit_sp`-th best score sits at zero.
///
/// `sorted_sp` must be sorted best first.
pub fn estimate_exp_sp(sorted_sp: &[f32], top_fit_sp: usize) -> Result<ExpSpParams, CalibrationError> {
    let top = top_fit_sp.min(sorted_sp.len());
    if top == 0 {
        return Err(CalibrationError::TooFewSamples {
            found: sorted_sp.len(),
            required: 1,
        });
    }
    let base = sorted_sp[top - 1];
    let sum: f32 = sorted_sp[..top].iter().sum();
    Ok(ExpSpParams {
        sp_scores_mean: sum / top as f32 - base,
        base_score_sp: base,
        top_fit_sp: top,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exp_sp() {
        let sp = [10.0, 8.0, 6.0, 4.0];
        let params = estimate_exp_sp(&sp, 3).unwrap();
        assert_eq!(params.base_score_sp, 6.0);
        assert_eq!(params.top_fit_sp, 3);
        assert!((params.sp_scores_mean - 2.0).abs() < 1e-6);

        // Clamped to what is available.
        let params = estimate_exp_sp(&sp, 1000).unwrap();
        assert_eq!(params.top_fit_sp, 4);
        assert_eq!(params.base_score_sp, 4.0);

        assert!(estimate_exp_sp(&[], 10).is_err());
    }
}
