use crate::models::Peptide;
use nohash_hasher::IntMap;
use std::collections::HashSet;

/// Protein and peptide bookkeeping of a collection merged from result files.
#[derive(Debug, Clone, Default)]
pub struct PostProcessState {
    protein_counter: IntMap<u32, u32>,
    protein_peptide_counter: IntMap<u32, u32>,
    seen_peptides: HashSet<String>,
    pub(crate) scored_types_reconciled: bool,
}

impl PostProcessState {
    /// Every protein of the peptide gains a PSM; it gains a peptide only the
    /// first time this sequence is seen.
    pub(crate) fn record_peptide(&mut self, peptide: &Peptide) {
        let unique = !self.seen_peptides.contains(peptide.hash_key());
        for protein in peptide.proteins() {
            *self.protein_counter.entry(*protein).or_insert(0) += 1;
            if unique {
                *self.protein_peptide_counter.entry(*protein).or_insert(0) += 1;
            }
        }
        if unique {
            self.seen_peptides.insert(peptide.hash_key().to_string());
        }
    }

    pub fn protein_count(&self, protein_idx: u32) -> u32 {
        self.protein_counter.get(&protein_idx).copied().unwrap_or(0)
    }

    pub fn protein_peptide_count(&self, protein_idx: u32) -> u32 {
        self.protein_peptide_counter
            .get(&protein_idx)
            .copied()
            .unwrap_or(0)
    }

    pub fn has_seen(&self, sequence: &str) -> bool {
        self.seen_peptides.contains(sequence)
    }

    pub fn num_proteins(&self) -> usize {
        self.protein_counter.len()
    }

    pub fn num_peptides(&self) -> usize {
        self.seen_peptides.len()
    }
}
