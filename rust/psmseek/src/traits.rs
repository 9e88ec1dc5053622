//! Interfaces of the collaborators the scoring engine consumes.
//!
//! The engine never generates candidates or predicts fragments itself; it
//! asks for them through these traits. [`crate::PeptideIndex`] and
//! [`crate::SequestIonPredictor`] are the in-crate implementations.

use crate::models::{
    IonConstraint,
    IonSeries,
    Peptide,
};
use std::sync::Arc;

/// Something that can list every peptide within a mass window.
pub trait CandidateSource {
    /// Peptides whose neutral mass falls in `neutral_mass ± window`.
    fn candidates(&self, neutral_mass: f64, window: f64) -> Vec<Arc<Peptide>>;
}

/// Fills an [`IonSeries`] with the fragments of a peptide at a precursor
/// charge. Implementations must reset the series before filling it.
pub trait IonPredictor {
    fn predict(
        &self,
        peptide: &Peptide,
        charge: u8,
        constraint: IonConstraint,
        series: &mut IonSeries,
    );
}
