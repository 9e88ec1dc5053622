//! False discovery estimation and features for external re-rankers.

pub mod features;
pub mod qvalues;

pub use features::{
    FEATURE_NAMES,
    FeatureRow,
    NUM_FEATURES,
    extract_features,
};
pub use qvalues::{
    QValueMethod,
    compute_bh_qvalues,
    compute_target_decoy_qvalues,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetDecoy {
    Target,
    Decoy,
}

pub trait LabelledScore {
    fn get_score(&self) -> f64;
    fn get_label(&self) -> TargetDecoy;
    fn assign_qval(&mut self, q: f32);
    fn get_qval(&self) -> f32;
}

/// Assign q_values in place.
///
/// # Invariants
/// * `scores` must be sorted in descending order (e.g. best PSM is first)
///
/// Implementation derived from the Sage implementation of qval github.com/lazear/sage
pub fn assign_qval<T: LabelledScore>(scores: &mut [T]) {
    let (Some(first), Some(last)) = (scores.first(), scores.last()) else {
        return;
    };
    debug_assert!(first.get_score() >= last.get_score());

    let mut decoy = 1;
    let mut target = 0;

    for score in scores.iter_mut() {
        match score.get_label() {
            TargetDecoy::Decoy => decoy += 1,
            TargetDecoy::Target => target += 1,
        }
        score.assign_qval(decoy as f32 / target as f32);
    }

    // Reverse slice, and calculate the cumulative minimum
    let mut q_min = 1.0f32;
    for score in scores.iter_mut().rev() {
        q_min = q_min.min(score.get_qval());
        score.assign_qval(q_min);
    }
}
