use super::decoy::{
    DecoyMarking,
    DecoyStrategy,
};
use super::mass::peptide_mass;
use crate::errors::InputReadingError;
use crate::traits::CandidateSource;
use std::sync::Arc;

/// A candidate peptide with the proteins it was digested from.
#[derive(Debug, Clone, PartialEq)]
pub struct Peptide {
    sequence: Arc<str>,
    mass: f64,
    proteins: Vec<u32>,
    decoy: DecoyMarking,
}

impl Peptide {
    pub fn new(sequence: &str, proteins: Vec<u32>) -> Result<Self, InputReadingError> {
        let mass = peptide_mass(sequence).ok_or_else(|| InputReadingError::InvalidSequence {
            sequence: sequence.to_string(),
        })?;
        Ok(Self {
            sequence: sequence.into(),
            mass,
            proteins,
            decoy: DecoyMarking::Target,
        })
    }

    /// Rebuilds a peptide from serialized parts without recomputing the mass.
    pub(crate) fn from_parts(
        sequence: &str,
        mass: f64,
        proteins: Vec<u32>,
        decoy: DecoyMarking,
    ) -> Self {
        Self {
            sequence: sequence.into(),
            mass,
            proteins,
            decoy,
        }
    }

    /// Same composition (and thus mass), permuted sequence.
    pub fn as_decoy(&self, strategy: DecoyStrategy) -> Peptide {
        Peptide {
            sequence: strategy.apply(&self.sequence).into(),
            mass: self.mass,
            proteins: self.proteins.clone(),
            decoy: strategy.marking(),
        }
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn proteins(&self) -> &[u32] {
        &self.proteins
    }

    pub fn decoy(&self) -> DecoyMarking {
        self.decoy
    }

    pub fn is_decoy(&self) -> bool {
        self.decoy.is_decoy()
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Key used to detect whether a peptide was already seen in a merged
    /// result set.
    pub fn hash_key(&self) -> &str {
        &self.sequence
    }
}

/// Peptides sorted by neutral mass, queried by precursor window.
#[derive(Debug, Clone, Default)]
pub struct PeptideIndex {
    peptides: Vec<Arc<Peptide>>,
}

impl PeptideIndex {
    pub fn new(mut peptides: Vec<Peptide>) -> Self {
        peptides.sort_by(|a, b| a.mass.total_cmp(&b.mass));
        Self {
            peptides: peptides.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn as_decoys(&self, strategy: DecoyStrategy) -> Self {
        Self {
            peptides: self
                .peptides
                .iter()
                .map(|p| Arc::new(p.as_decoy(strategy)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.peptides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peptides.is_empty()
    }
}

impl CandidateSource for PeptideIndex {
    fn candidates(&self, neutral_mass: f64, window: f64) -> Vec<Arc<Peptide>> {
        let lo = neutral_mass - window;
        let hi = neutral_mass + window;
        let start = self.peptides.partition_point(|p| p.mass < lo);
        self.peptides[start..]
            .iter()
            .take_while(|p| p.mass <= hi)
            .cloned()
            .collect()
    }
}
