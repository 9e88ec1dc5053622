//! The bounded, mutable set of matches for one spectrum (or, once read back
//! from disk, for a whole result set) plus the parameters fitted on it.

mod iterator;
pub mod pipeline;
mod post_process;
mod sample;

pub use iterator::MatchIterator;
pub use pipeline::{
    SearchContext,
    build_from_spectrum,
};
pub use post_process::PostProcessState;
pub use sample::Sample;

use crate::calibration::{
    EvdParams,
    ExpSpParams,
    WeibullParams,
};
use crate::errors::MatchCollectionError;
use crate::models::{
    Match,
    MatchHandle,
};
use crate::score_type::{
    ScoreType,
    ScoredTypes,
    SortFamily,
};
use std::cell::Cell;
use std::rc::Rc;
use tracing::debug;

pub const DEFAULT_MAX_MATCHES: usize = 10_000_000;

/// Stored as delta_cn when there is no second-best match.
pub const MIN_DELTA_CN: f32 = 0.000_001;

type CollectionResult<T> = std::result::Result<T, MatchCollectionError>;

#[derive(Debug)]
pub struct MatchCollection {
    matches: Vec<MatchHandle>,
    max_matches: usize,
    scored: ScoredTypes,
    last_sorted: Option<ScoreType>,
    iterator_lock: Rc<Cell<bool>>,
    charge: u8,
    is_decoy: bool,
    experiment_size: usize,
    pub(crate) evd: EvdParams,
    pub(crate) weibull: WeibullParams,
    pub(crate) exp_sp: ExpSpParams,
    delta_cn: f32,
    post_process: Option<PostProcessState>,
}

impl MatchCollection {
    /// An empty collection for one spectrum at one charge.
    pub fn new(charge: u8, is_decoy: bool, max_matches: usize) -> Self {
        Self {
            matches: Vec::new(),
            max_matches,
            scored: ScoredTypes::empty(),
            last_sorted: None,
            iterator_lock: Rc::new(Cell::new(false)),
            charge,
            is_decoy,
            experiment_size: 0,
            evd: EvdParams::default(),
            weibull: WeibullParams::default(),
            exp_sp: ExpSpParams::default(),
            delta_cn: 0.0,
            post_process: None,
        }
    }

    /// An empty collection meant to be filled from serialized results.
    pub fn new_post_process(is_decoy: bool, max_matches: usize) -> Self {
        Self {
            post_process: Some(PostProcessState::default()),
            ..Self::new(0, is_decoy, max_matches)
        }
    }

    fn check_unlocked(&self, operation: &'static str) -> CollectionResult<()> {
        if self.iterator_lock.get() {
            Err(MatchCollectionError::Locked { operation })
        } else {
            Ok(())
        }
    }

    pub fn add_match(&mut self, m: Match) -> CollectionResult<MatchHandle> {
        self.check_unlocked("add a match")?;
        if self.matches.len() >= self.max_matches {
            return Err(MatchCollectionError::CapacityExceeded {
                capacity: self.max_matches,
            });
        }
        if let Some(state) = self.post_process.as_mut() {
            state.record_peptide(m.peptide());
        }
        let handle = Rc::new(m);
        self.matches.push(handle.clone());
        self.last_sorted = None;
        if self.post_process.is_some() && self.matches.len() % 10_000 == 0 {
            debug!("Parsed PSMs: {}", self.matches.len());
        }
        Ok(handle)
    }

    /// Adds an existing handle, used when drawing samples.
    pub(crate) fn push_handle(&mut self, handle: MatchHandle) -> CollectionResult<()> {
        if self.matches.len() >= self.max_matches {
            return Err(MatchCollectionError::CapacityExceeded {
                capacity: self.max_matches,
            });
        }
        self.matches.push(handle);
        self.last_sorted = None;
        Ok(())
    }

    /// Forgets the cached order after scores were written in place.
    pub(crate) fn invalidate_sort(&mut self) {
        self.last_sorted = None;
    }

    /// Whether the current order already matches the tie class of
    /// `score_type`.
    fn is_sorted_for(&self, score_type: ScoreType) -> bool {
        match (self.last_sorted, score_type.sort_family()) {
            (Some(last), Some(family)) => last == family_key(family),
            _ => false,
        }
    }

    /// Sorts best first by the family key of `score_type`. Stable.
    pub fn sort(&mut self, score_type: ScoreType) -> CollectionResult<()> {
        self.check_unlocked("sort")?;
        let family = score_type
            .sort_family()
            .ok_or(MatchCollectionError::UnsortableScoreType(score_type))?;
        let key = family_key(family);
        self.matches
            .sort_by(|a, b| b.sort_key(key).total_cmp(&a.sort_key(key)));
        self.last_sorted = Some(key);
        Ok(())
    }

    /// Groups matches by spectrum (scan, then charge) and sorts each group
    /// by `score_type`. Q-values sort ascending, everything else descending.
    /// The result is not a global order, so the sort state is cleared.
    pub fn sort_by_spectrum(&mut self, score_type: ScoreType) -> CollectionResult<()> {
        self.check_unlocked("sort")?;
        let family = score_type
            .sort_family()
            .ok_or(MatchCollectionError::UnsortableScoreType(score_type))?;
        let key = match score_type {
            ScoreType::QValue | ScoreType::PercolatorScore => score_type,
            _ => family_key(family),
        };
        let ascending = key == ScoreType::QValue;

        self.matches.sort_by(|a, b| {
            let by_spectrum = a
                .spectrum()
                .scan
                .cmp(&b.spectrum().scan)
                .then(a.charge().cmp(&b.charge()));
            by_spectrum.then_with(|| {
                if ascending {
                    ascending_key(a, key).total_cmp(&ascending_key(b, key))
                } else {
                    b.sort_key(key).total_cmp(&a.sort_key(key))
                }
            })
        });
        self.last_sorted = None;
        Ok(())
    }

    /// Keeps the best `max_rank` matches by `score_type`.
    pub fn truncate(&mut self, max_rank: usize, score_type: ScoreType) -> CollectionResult<()> {
        self.check_unlocked("truncate")?;
        if self.matches.is_empty() {
            debug!("No matches in collection, so not truncating");
            return Ok(());
        }
        if !self.is_sorted_for(score_type) {
            self.sort(score_type)?;
        }
        self.matches.truncate(max_rank);
        Ok(())
    }

    /// Rank 1 is the best score.
    pub fn populate_ranks(&mut self, score_type: ScoreType) -> CollectionResult<()> {
        self.check_unlocked("populate ranks")?;
        if !self.is_sorted_for(score_type) {
            self.sort(score_type)?;
        }
        for (idx, m) in self.matches.iter().enumerate() {
            m.set_rank(score_type, idx as u32 + 1);
        }
        Ok(())
    }

    /// Flags `score_type` as computed. Fails unless every match carries it.
    pub(crate) fn mark_scored(&mut self, score_type: ScoreType) -> CollectionResult<()> {
        if self.matches.iter().any(|m| !m.has_score(score_type)) {
            return Err(MatchCollectionError::IncompleteScores(score_type));
        }
        self.scored.insert(score_type);
        Ok(())
    }

    pub(crate) fn require_scored(&self, score_type: ScoreType) -> CollectionResult<()> {
        if self.scored.contains(score_type) {
            Ok(())
        } else {
            Err(MatchCollectionError::NotScored(score_type))
        }
    }

    /// Writes externally computed scores (one per match, in the current
    /// order) and ranks them. With `preserve_order` the previous order and
    /// sort state are restored afterwards.
    pub fn fill_results(
        &mut self,
        results: &[f32],
        score_type: ScoreType,
        preserve_order: bool,
    ) -> CollectionResult<()> {
        self.check_unlocked("fill results")?;
        if results.len() != self.matches.len() {
            return Err(MatchCollectionError::ResultsLengthMismatch {
                expected: self.matches.len(),
                got: results.len(),
            });
        }
        for (m, value) in self.matches.iter().zip(results.iter()) {
            m.set_score(score_type, *value);
        }

        // A previous order by this family no longer reflects the new values.
        if self.is_sorted_for(score_type) {
            self.last_sorted = None;
        }
        let saved = preserve_order.then(|| (self.matches.clone(), self.last_sorted));
        self.populate_ranks(score_type)?;
        if let Some((order, last_sorted)) = saved {
            self.matches = order;
            self.last_sorted = last_sorted;
        }

        self.mark_scored(score_type)
    }

    /// Opens a read-only traversal. Sorts first when `sort` is set and the
    /// current order is not already equivalent to `score_type`'s.
    pub fn iter(&mut self, score_type: ScoreType, sort: bool) -> CollectionResult<MatchIterator> {
        self.check_unlocked("open a match iterator")?;
        self.require_scored(score_type)?;
        if sort && !self.is_sorted_for(score_type) {
            self.sort(score_type)?;
        }
        Ok(MatchIterator::new(
            self.matches.clone(),
            self.iterator_lock.clone(),
            score_type,
        ))
    }

    /// Like [`Self::iter`] but grouped by spectrum.
    pub fn iter_by_spectrum(&mut self, score_type: ScoreType) -> CollectionResult<MatchIterator> {
        self.check_unlocked("open a match iterator")?;
        self.sort_by_spectrum(score_type)?;
        Ok(MatchIterator::new(
            self.matches.clone(),
            self.iterator_lock.clone(),
            score_type,
        ))
    }

    pub fn matches(&self) -> &[MatchHandle] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn scored_types(&self) -> ScoredTypes {
        self.scored
    }

    pub fn is_scored(&self, score_type: ScoreType) -> bool {
        self.scored.contains(score_type)
    }

    pub fn last_sorted(&self) -> Option<ScoreType> {
        self.last_sorted
    }

    pub fn is_locked(&self) -> bool {
        self.iterator_lock.get()
    }

    pub fn charge(&self) -> u8 {
        self.charge
    }

    pub(crate) fn set_charge(&mut self, charge: u8) {
        self.charge = charge;
    }

    pub fn is_decoy(&self) -> bool {
        self.is_decoy
    }

    pub fn max_matches(&self) -> usize {
        self.max_matches
    }

    pub fn experiment_size(&self) -> usize {
        self.experiment_size
    }

    pub(crate) fn set_experiment_size(&mut self, size: usize) {
        self.experiment_size = size;
    }

    pub fn delta_cn(&self) -> f32 {
        self.delta_cn
    }

    pub(crate) fn set_delta_cn(&mut self, delta_cn: f32) {
        self.delta_cn = delta_cn;
    }

    pub fn evd_params(&self) -> EvdParams {
        self.evd
    }

    pub fn weibull_params(&self) -> WeibullParams {
        self.weibull
    }

    pub fn sp_scores_mean(&self) -> f32 {
        self.exp_sp.sp_scores_mean
    }

    pub fn base_score_sp(&self) -> f32 {
        self.exp_sp.base_score_sp
    }

    pub fn top_fit_sp(&self) -> usize {
        self.exp_sp.top_fit_sp
    }

    pub fn is_post_process(&self) -> bool {
        self.post_process.is_some()
    }

    pub(crate) fn post_process_state(&self, operation: &'static str) -> CollectionResult<&PostProcessState> {
        self.post_process
            .as_ref()
            .ok_or(MatchCollectionError::NotPostProcess { operation })
    }

    pub(crate) fn post_process_state_mut(
        &mut self,
        operation: &'static str,
    ) -> CollectionResult<&mut PostProcessState> {
        self.post_process
            .as_mut()
            .ok_or(MatchCollectionError::NotPostProcess { operation })
    }

    /// Number of PSMs whose peptide maps to `protein_idx`.
    pub fn protein_counter(&self, protein_idx: u32) -> CollectionResult<u32> {
        Ok(self.post_process_state("read protein counters")?.protein_count(protein_idx))
    }

    /// Number of distinct peptides mapping to `protein_idx`.
    pub fn protein_peptide_counter(&self, protein_idx: u32) -> CollectionResult<u32> {
        Ok(self
            .post_process_state("read protein counters")?
            .protein_peptide_count(protein_idx))
    }

    pub fn has_seen_peptide(&self, sequence: &str) -> CollectionResult<bool> {
        Ok(self.post_process_state("look up peptides")?.has_seen(sequence))
    }

    pub fn num_proteins(&self) -> CollectionResult<usize> {
        Ok(self.post_process_state("count proteins")?.num_proteins())
    }

    /// Whether the scored-type flags were adopted from a serialized file.
    pub fn scored_types_reconciled(&self) -> bool {
        self.post_process
            .as_ref()
            .is_some_and(|x| x.scored_types_reconciled)
    }

    /// Adopts the flags of the first serialized spectrum; later mismatches
    /// are reported to the caller.
    pub(crate) fn reconcile_scored_types(&mut self, flags: ScoredTypes) -> CollectionResult<bool> {
        let reconciled = self
            .post_process_state("reconcile scored types")?
            .scored_types_reconciled;
        if !reconciled {
            self.scored = flags;
            self.post_process_state_mut("reconcile scored types")?
                .scored_types_reconciled = true;
            return Ok(true);
        }
        Ok(self.scored == flags)
    }
}

fn family_key(family: SortFamily) -> ScoreType {
    match family {
        SortFamily::Xcorr => ScoreType::Xcorr,
        SortFamily::Sp => ScoreType::Sp,
        SortFamily::Percolator => ScoreType::PercolatorScore,
    }
}

/// Missing and NA sort last in ascending order too.
fn ascending_key(m: &Match, score_type: ScoreType) -> f32 {
    match m.score(score_type) {
        Some(x) if !x.is_nan() => x,
        _ => f32::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Peptide,
        SpectrumRef,
    };
    use std::sync::Arc;

    fn collection_with_sp(sps: &[f32]) -> MatchCollection {
        let mut coll = MatchCollection::new(2, false, 100);
        for (i, sp) in sps.iter().enumerate() {
            let pep = Arc::new(Peptide::new("PEPTIDEK", vec![i as u32]).unwrap());
            let m = Match::new(
                pep,
                SpectrumRef {
                    scan: 1,
                    precursor_mz: 500.0,
                },
                2,
            );
            m.set_score(ScoreType::Sp, *sp);
            coll.add_match(m).unwrap();
        }
        coll.mark_scored(ScoreType::Sp).unwrap();
        coll
    }

    fn sp_scores(coll: &MatchCollection) -> Vec<f32> {
        coll.matches()
            .iter()
            .map(|m| m.score(ScoreType::Sp).unwrap())
            .collect()
    }

    #[test]
    fn test_capacity_is_checked() {
        let mut coll = MatchCollection::new(2, false, 1);
        let pep = Arc::new(Peptide::new("GK", vec![]).unwrap());
        let spec = SpectrumRef {
            scan: 1,
            precursor_mz: 100.0,
        };
        coll.add_match(Match::new(pep.clone(), spec, 2)).unwrap();
        assert!(matches!(
            coll.add_match(Match::new(pep, spec, 2)),
            Err(MatchCollectionError::CapacityExceeded { capacity: 1 })
        ));
    }

    #[test]
    fn test_sort_uses_family_key() {
        let mut coll = collection_with_sp(&[3.0, 9.0, 1.0, 5.0]);
        coll.sort(ScoreType::LogpBonfWeibullSp).unwrap();
        assert_eq!(coll.last_sorted(), Some(ScoreType::Sp));
        assert_eq!(sp_scores(&coll), vec![9.0, 5.0, 3.0, 1.0]);

        assert!(matches!(
            coll.sort(ScoreType::Dotp),
            Err(MatchCollectionError::UnsortableScoreType(ScoreType::Dotp))
        ));
    }

    #[test]
    fn test_ranks_follow_scores() {
        let mut coll = collection_with_sp(&[3.0, 9.0, 1.0, 5.0, 5.0]);
        coll.populate_ranks(ScoreType::Sp).unwrap();
        let ms = coll.matches();
        for pair in ms.windows(2) {
            assert!(pair[0].rank(ScoreType::Sp) < pair[1].rank(ScoreType::Sp));
            assert!(pair[0].score(ScoreType::Sp) >= pair[1].score(ScoreType::Sp));
        }
        assert_eq!(ms[0].rank(ScoreType::Sp), 1);
    }

    #[test]
    fn test_truncate_is_idempotent() {
        let mut coll = collection_with_sp(&[3.0, 9.0, 1.0, 5.0, 5.0]);
        coll.truncate(3, ScoreType::Sp).unwrap();
        let first = sp_scores(&coll);
        assert_eq!(first, vec![9.0, 5.0, 5.0]);
        coll.truncate(3, ScoreType::Sp).unwrap();
        assert_eq!(sp_scores(&coll), first);

        coll.truncate(10, ScoreType::Sp).unwrap();
        assert_eq!(coll.len(), 3);

        let mut empty = MatchCollection::new(2, false, 10);
        empty.truncate(2, ScoreType::Sp).unwrap();
        assert_eq!(empty.last_sorted(), None);
    }

    #[test]
    fn test_mark_scored_requires_every_match() {
        let mut coll = collection_with_sp(&[3.0, 9.0]);
        coll.matches()[0].set_score(ScoreType::Xcorr, 1.0);
        assert!(matches!(
            coll.mark_scored(ScoreType::Xcorr),
            Err(MatchCollectionError::IncompleteScores(ScoreType::Xcorr))
        ));
        coll.matches()[1].set_score(ScoreType::Xcorr, 2.0);
        coll.mark_scored(ScoreType::Xcorr).unwrap();
        assert!(coll.is_scored(ScoreType::Xcorr));
    }

    #[test]
    fn test_fill_results() {
        let mut coll = collection_with_sp(&[3.0, 9.0, 1.0]);
        assert!(matches!(
            coll.fill_results(&[1.0], ScoreType::PercolatorScore, true),
            Err(MatchCollectionError::ResultsLengthMismatch {
                expected: 3,
                got: 1
            })
        ));

        coll.fill_results(&[0.2, 0.9, 0.5], ScoreType::PercolatorScore, true)
            .unwrap();
        // Order untouched, ranks assigned.
        assert_eq!(sp_scores(&coll), vec![3.0, 9.0, 1.0]);
        let ranks: Vec<u32> = coll
            .matches()
            .iter()
            .map(|m| m.rank(ScoreType::PercolatorScore))
            .collect();
        assert_eq!(ranks, vec![3, 1, 2]);
        assert_eq!(coll.last_sorted(), None);
        assert!(coll.is_scored(ScoreType::PercolatorScore));

        coll.fill_results(&[0.1, 0.2, 0.3], ScoreType::Sp, false).unwrap();
        assert_eq!(coll.last_sorted(), Some(ScoreType::Sp));
        assert_eq!(sp_scores(&coll), vec![0.3, 0.2, 0.1]);
    }

    fn sp_ranks(coll: &MatchCollection) -> Vec<(f32, u32)> {
        coll.matches()
            .iter()
            .map(|m| (m.score(ScoreType::Sp).unwrap(), m.rank(ScoreType::Sp)))
            .collect()
    }

    #[test]
    fn test_refilled_scores_are_reranked() {
        let mut coll = collection_with_sp(&[0.0, 0.0, 0.0]);
        coll.fill_results(&[1.0, 2.0, 3.0], ScoreType::Sp, false)
            .unwrap();
        assert_eq!(sp_ranks(&coll), vec![(3.0, 1), (2.0, 2), (1.0, 3)]);

        // Same positions, reversed values: the cached order is stale.
        coll.fill_results(&[10.0, 20.0, 30.0], ScoreType::Sp, false)
            .unwrap();
        let ranked = sp_ranks(&coll);
        assert_eq!(ranked, vec![(30.0, 1), (20.0, 2), (10.0, 3)]);
        for pair in ranked.windows(2) {
            assert!(pair[0].0 >= pair[1].0);
            assert!(pair[0].1 < pair[1].1);
        }

        coll.fill_results(&[5.0, 50.0, 0.5], ScoreType::Sp, true)
            .unwrap();
        assert_eq!(sp_ranks(&coll), vec![(5.0, 2), (50.0, 1), (0.5, 3)]);
        assert_eq!(coll.last_sorted(), None);
    }

    #[test]
    fn test_added_match_clears_sort_state() {
        let mut coll = collection_with_sp(&[3.0, 1.0]);
        coll.populate_ranks(ScoreType::Sp).unwrap();
        assert_eq!(coll.last_sorted(), Some(ScoreType::Sp));

        let pep = Arc::new(Peptide::new("PEPTIDEK", vec![9]).unwrap());
        let m = Match::new(
            pep,
            SpectrumRef {
                scan: 1,
                precursor_mz: 500.0,
            },
            2,
        );
        m.set_score(ScoreType::Sp, 7.0);
        coll.add_match(m).unwrap();
        assert_eq!(coll.last_sorted(), None);

        coll.populate_ranks(ScoreType::Sp).unwrap();
        assert_eq!(sp_ranks(&coll), vec![(7.0, 1), (3.0, 2), (1.0, 3)]);
    }

    #[test]
    fn test_tie_class_counts_as_sorted() {
        let mut coll = collection_with_sp(&[3.0, 9.0, 1.0]);
        coll.sort(ScoreType::Sp).unwrap();
        // Swap the first two behind the cache's back. A member of the SP
        // tie class must not trigger another sort.
        coll.matches.swap(0, 1);
        coll.truncate(3, ScoreType::LogpQvalueWeibullXcorr).unwrap();
        coll.populate_ranks(ScoreType::LogpBonfWeibullSp).unwrap();
        assert_eq!(sp_scores(&coll), vec![3.0, 9.0, 1.0]);

        for (score_type, sorted) in [
            (ScoreType::LogpQvalueWeibullXcorr, true),
            (ScoreType::LogpExpSp, true),
            (ScoreType::LogpWeibullXcorr, false),
            (ScoreType::PercolatorScore, false),
        ] {
            assert_eq!(coll.is_sorted_for(score_type), sorted, "{}", score_type);
        }

        coll.sort(ScoreType::Xcorr).unwrap();
        assert!(coll.is_sorted_for(ScoreType::LogpWeibullXcorr));
        assert!(coll.is_sorted_for(ScoreType::LogpBonfWeibullXcorr));
        assert!(coll.is_sorted_for(ScoreType::LogpBonfEvdXcorr));
        assert!(!coll.is_sorted_for(ScoreType::Dotp));
    }

    #[test]
    fn test_spectrum_sort() {
        let mut coll = MatchCollection::new_post_process(false, 100);
        let rows = [(2u32, 3u8, 0.5f32), (1, 2, 0.3), (2, 2, 0.1), (1, 2, 0.01)];
        for (scan, charge, q) in rows {
            let pep = Arc::new(Peptide::new("PEPTIDEK", vec![0]).unwrap());
            let m = Match::new(
                pep,
                SpectrumRef {
                    scan,
                    precursor_mz: 500.0,
                },
                charge,
            );
            m.set_score(ScoreType::QValue, q);
            coll.add_match(m).unwrap();
        }
        coll.sort_by_spectrum(ScoreType::QValue).unwrap();
        assert_eq!(coll.last_sorted(), None);
        let order: Vec<(u32, u8, f32)> = coll
            .matches()
            .iter()
            .map(|m| {
                (
                    m.spectrum().scan,
                    m.charge(),
                    m.score(ScoreType::QValue).unwrap(),
                )
            })
            .collect();
        assert_eq!(
            order,
            vec![(1, 2, 0.01), (1, 2, 0.3), (2, 2, 0.1), (2, 3, 0.5)]
        );
    }

    #[test]
    fn test_post_process_only_operations() {
        let coll = collection_with_sp(&[1.0]);
        assert!(matches!(
            coll.protein_counter(0),
            Err(MatchCollectionError::NotPostProcess { .. })
        ));
    }
}
