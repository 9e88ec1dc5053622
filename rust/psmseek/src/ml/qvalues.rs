use super::{
    LabelledScore,
    TargetDecoy,
    assign_qval,
};
use crate::collection::MatchCollection;
use crate::errors::MatchCollectionError;
use crate::score_type::ScoreType;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::info;

/// Two p-values closer than this are considered the same.
const P_VALUE_EPSILON: f64 = 1e-14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QValueMethod {
    /// Benjamini-Hochberg on calibrated p-values of the target set.
    BenjaminiHochberg,
    /// Target/decoy competition on a raw or calibrated score.
    TargetDecoy,
}

/// Benjamini-Hochberg q-values from the LOGP_BONF_WEIBULL_XCORR p-values of
/// `collection`, stored as `-ln(q)` in LOGP_QVALUE_WEIBULL_XCORR.
///
/// Matches without a p-value get NaN. Returns the number of p-values used.
pub fn compute_bh_qvalues(
    collection: &mut MatchCollection,
    pi0: f64,
) -> Result<usize, MatchCollectionError> {
    let source = ScoreType::LogpBonfWeibullXcorr;
    let target = ScoreType::LogpQvalueWeibullXcorr;
    collection.require_scored(source)?;

    let mut log_p: Vec<f64> = collection
        .matches()
        .iter()
        .filter_map(|m| m.score(source))
        .filter(|x| x.is_finite())
        .map(|x| x as f64)
        .collect();
    log_p.sort_by(|a, b| b.total_cmp(a));
    let log_q = benjamini_hochberg(&log_p, pi0);

    let mut values = Vec::with_capacity(collection.len());
    for m in collection.matches() {
        let value = match m.score(source) {
            Some(x) if x.is_finite() => {
                let x = x as f64;
                // First sorted value within epsilon. Sorted descending, so
                // that is the first one not above x + eps.
                let idx = log_p.partition_point(|v| *v > x + P_VALUE_EPSILON);
                match log_p.get(idx) {
                    Some(v) if *v >= x - P_VALUE_EPSILON => log_q[idx] as f32,
                    _ => {
                        return Err(MatchCollectionError::UnmappedScore {
                            score_type: source,
                            value: x,
                        });
                    }
                }
            }
            _ => f32::NAN,
        };
        values.push(value);
    }
    collection.fill_results(&values, target, true)?;
    info!(
        "Computed q-values from {} p-values over {} matches",
        log_p.len(),
        collection.len()
    );
    Ok(log_p.len())
}

/// `-ln(q)` for each `-ln(p)` in `log_p`, which must be sorted descending
/// (best first).
pub fn benjamini_hochberg(log_p: &[f64], pi0: f64) -> Vec<f64> {
    let n = log_p.len();
    if n == 0 {
        return Vec::new();
    }
    let log_n = (n as f64).ln();
    let log_pi0 = pi0.ln();
    let mut log_q: Vec<f64> = log_p
        .iter()
        .enumerate()
        .map(|(idx, lp)| lp - log_n + ((idx + 1) as f64).ln() - log_pi0)
        .collect();

    // Walking from the worst p-value up, a better p never gets a worse q.
    let mut max_log_q = f64::NEG_INFINITY;
    for x in log_q.iter_mut().rev() {
        if *x > max_log_q {
            max_log_q = *x;
        } else {
            *x = max_log_q;
        }
    }
    log_q
}

struct PooledScore {
    score: f64,
    label: TargetDecoy,
    qval: f32,
    target_idx: Option<usize>,
}

impl LabelledScore for PooledScore {
    fn get_score(&self) -> f64 {
        self.score
    }

    fn get_label(&self) -> TargetDecoy {
        self.label
    }

    fn assign_qval(&mut self, q: f32) {
        self.qval = q;
    }

    fn get_qval(&self) -> f32 {
        self.qval
    }
}

/// Target/decoy competition q-values by `score_type`.
///
/// Target and decoy matches with a finite score are pooled and ranked; the
/// resulting q-values are written to Q_VALUE of the target matches and the
/// score itself to PERCOLATOR_SCORE. Targets without a usable score get a
/// q-value of 1.
pub fn compute_target_decoy_qvalues(
    target: &mut MatchCollection,
    decoys: &[MatchCollection],
    score_type: ScoreType,
) -> Result<(), MatchCollectionError> {
    target.require_scored(score_type)?;

    let mut pooled = Vec::new();
    for (idx, m) in target.matches().iter().enumerate() {
        if let Some(x) = m.score(score_type).filter(|x| x.is_finite()) {
            pooled.push(PooledScore {
                score: x as f64,
                label: TargetDecoy::Target,
                qval: 1.0,
                target_idx: Some(idx),
            });
        }
    }
    let num_targets = pooled.len();
    for decoy_set in decoys {
        for m in decoy_set.matches() {
            if let Some(x) = m.score(score_type).filter(|x| x.is_finite()) {
                pooled.push(PooledScore {
                    score: x as f64,
                    label: TargetDecoy::Decoy,
                    qval: 1.0,
                    target_idx: None,
                });
            }
        }
    }
    pooled.sort_by(|a, b| b.score.total_cmp(&a.score));
    assign_qval(&mut pooled);

    let mut qvalues = vec![1.0f32; target.len()];
    for x in pooled.iter() {
        if let Some(idx) = x.target_idx {
            qvalues[idx] = x.qval;
        }
    }
    let scores: Vec<f32> = target
        .matches()
        .iter()
        .map(|m| m.score(score_type).unwrap_or(f32::NAN))
        .collect();

    target.fill_results(&scores, ScoreType::PercolatorScore, true)?;
    target.fill_results(&qvalues, ScoreType::QValue, true)?;
    info!(
        "Target/decoy q-values by {}: {} targets, {} decoys, {} at 1% FDR",
        score_type,
        num_targets,
        pooled.len() - num_targets,
        qvalues.iter().filter(|q| **q <= 0.01).count()
    );
    Ok(())
}
