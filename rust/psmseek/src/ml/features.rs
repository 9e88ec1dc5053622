use crate::collection::MatchCollection;
use crate::errors::MatchCollectionError;
use crate::models::Match;
use crate::score_type::ScoreType;
use serde::Serialize;

pub const NUM_FEATURES: usize = 13;

pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "xcorr",
    "delta_cn",
    "ln_delta_cn",
    "sp",
    "ln_sp_rank",
    "b_y_ions_fraction_matched",
    "ln_experiment_size",
    "peptide_length",
    "charge_1",
    "charge_2",
    "charge_3_plus",
    "ln_protein_psms",
    "ln_protein_peptides",
];

/// One match, labelled, with its feature vector.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureRow {
    pub scan: u32,
    pub charge: u8,
    pub is_decoy: bool,
    pub sequence: String,
    pub features: [f32; NUM_FEATURES],
}

/// Feature rows for every match of a post-process collection, in the
/// current order.
pub fn extract_features(
    collection: &MatchCollection,
) -> Result<Vec<FeatureRow>, MatchCollectionError> {
    collection
        .matches()
        .iter()
        .map(|m| {
            Ok(FeatureRow {
                scan: m.spectrum().scan,
                charge: m.charge(),
                is_decoy: m.is_decoy(),
                sequence: m.peptide().sequence().to_string(),
                features: match_features(m, collection)?,
            })
        })
        .collect()
}

pub fn match_features(
    m: &Match,
    collection: &MatchCollection,
) -> Result<[f32; NUM_FEATURES], MatchCollectionError> {
    let mut max_psms = 0u32;
    let mut max_peptides = 0u32;
    for protein in m.peptide().proteins() {
        max_psms = max_psms.max(collection.protein_counter(*protein)?);
        max_peptides = max_peptides.max(collection.protein_peptide_counter(*protein)?);
    }

    let sp_rank = m.rank(ScoreType::Sp);
    let charge = m.charge();
    let features = [
        m.score(ScoreType::Xcorr).unwrap_or(0.0),
        m.delta_cn(),
        m.ln_delta_cn(),
        m.score(ScoreType::Sp).unwrap_or(0.0),
        if sp_rank > 0 { (sp_rank as f32).ln() } else { 0.0 },
        m.b_y_ions_fraction_matched(),
        m.ln_experiment_size(),
        m.peptide().len() as f32,
        (charge == 1) as u8 as f32,
        (charge == 2) as u8 as f32,
        (charge >= 3) as u8 as f32,
        (1.0 + max_psms as f32).ln(),
        (1.0 + max_peptides as f32).ln(),
    ];
    // Non-finite values, e.g. ln of a zero delta_cn, are reported as 0.
    Ok(features.map(|x| if x.is_finite() { x } else { 0.0 }))
}
