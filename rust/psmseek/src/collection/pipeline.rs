//! Building and scoring the match collection of one spectrum at one charge.

use super::{
    MIN_DELTA_CN,
    MatchCollection,
    Sample,
};
use crate::calibration::pvalues::{
    logp_bonf_evd_xcorr,
    logp_bonf_exp_sp,
    logp_bonf_weibull,
    logp_evd_xcorr,
    logp_exp_sp,
    logp_weibull,
};
use crate::calibration::{
    EvdParams,
    ExpSpParams,
    SP_SHIFTS,
    WeibullParams,
    XCORR_SHIFTS,
    estimate_exp_sp,
    fit_count,
    fit_evd,
    fit_three_parameter_weibull,
};
use crate::config::SearchConfig;
use crate::errors::{
    ConfigError,
    MatchCollectionError,
    PsmSeekError,
    Result,
};
use crate::models::{
    IonSeries,
    Match,
    P_VALUE_NA,
    Peptide,
    Spectrum,
    SpectrumRef,
};
use crate::score_type::ScoreType;
use crate::scoring::Scorer;
use crate::traits::{
    CandidateSource,
    IonPredictor,
};
use rand::Rng;
use std::sync::Arc;
use tracing::{
    debug,
    warn,
};

/// Everything a search needs besides the spectrum itself.
pub struct SearchContext<'a> {
    pub candidates: &'a dyn CandidateSource,
    pub predictor: &'a dyn IonPredictor,
    pub config: &'a SearchConfig,
    pub prelim_type: ScoreType,
    pub main_type: ScoreType,
    /// Matches kept after preliminary scoring.
    pub max_rank: usize,
}

impl<'a> SearchContext<'a> {
    /// Score types and truncation depth are taken from the config.
    pub fn new(
        candidates: &'a dyn CandidateSource,
        predictor: &'a dyn IonPredictor,
        config: &'a SearchConfig,
    ) -> Self {
        Self {
            candidates,
            predictor,
            config,
            prelim_type: config.prelim_score_type,
            main_type: config.score_type,
            max_rank: config.max_rank_preliminary,
        }
    }
}

/// Scores every candidate of `spectrum` at `charge` and calibrates the
/// result.
///
/// Returns `Ok(None)` when the spectrum has to be skipped: no candidates in
/// the precursor window, or not enough of them to fit the null
/// distribution.
pub fn build_from_spectrum<R: Rng + ?Sized>(
    ctx: &SearchContext<'_>,
    spectrum: &Spectrum,
    charge: u8,
    mass_offset: f64,
    is_decoy: bool,
    rng: &mut R,
) -> Result<Option<MatchCollection>> {
    if ctx.prelim_type != ScoreType::Sp {
        return Err(ConfigError {
            msg: format!(
                "Preliminary score type {} is not supported, use sp",
                ctx.prelim_type
            ),
        }
        .into());
    }
    let config = ctx.config;
    let top_rank_for_p_value = config.top_rank_for_p_value();
    let mut collection = MatchCollection::new(charge, is_decoy, config.max_matches);

    let neutral_mass = spectrum.neutral_mass(charge) + mass_offset;
    let candidates = ctx.candidates.candidates(neutral_mass, config.mass_window);
    let mut series = IonSeries::new();
    let mut prelim = Scorer::new(ctx.prelim_type, config)?;
    score_preliminary(
        &mut collection,
        spectrum,
        ctx,
        candidates,
        &mut prelim,
        &mut series,
    )?;
    if collection.is_empty() {
        warn!(
            "No peptides found for scan {} at charge {}, skipping",
            spectrum.scan, charge
        );
        return Ok(None);
    }

    let mut main = Scorer::new(ScoreType::Xcorr, config)?;
    match estimate_parameters(&mut collection, spectrum, ctx, &mut main, &mut series, rng) {
        Ok(()) => {}
        Err(PsmSeekError::Calibration(e)) => {
            warn!(
                "Skipping scan {} at charge {}: {}",
                spectrum.scan, charge, e
            );
            return Ok(None);
        }
        Err(e) => return Err(e),
    }

    collection.truncate(ctx.max_rank, ctx.prelim_type)?;

    let main_type = ctx.main_type;
    if main_type == ScoreType::Xcorr || main_type.prerequisite() == Some(ScoreType::Xcorr) {
        score_xcorr(
            &mut collection,
            spectrum,
            ctx.predictor,
            &mut main,
            &mut series,
        )?;
        collection.update_delta_cn()?;
    }
    if main_type.is_p_value() {
        compute_p_values(&mut collection, main_type, top_rank_for_p_value)?;
    }
    if main_type == ScoreType::LogpBonfWeibullXcorr {
        collection.populate_ranks(main_type)?;
    }

    debug!(
        "Scan {} charge {}: {} candidates, {} kept, delta_cn {}",
        spectrum.scan,
        charge,
        collection.experiment_size(),
        collection.len(),
        collection.delta_cn()
    );
    Ok(Some(collection))
}

fn score_preliminary(
    collection: &mut MatchCollection,
    spectrum: &Spectrum,
    ctx: &SearchContext<'_>,
    candidates: Vec<Arc<Peptide>>,
    scorer: &mut Scorer,
    series: &mut IonSeries,
) -> Result<()> {
    let score_type = scorer.score_type();
    let charge = collection.charge();
    let spectrum_ref = SpectrumRef {
        scan: spectrum.scan,
        precursor_mz: spectrum.precursor_mz,
    };

    let mut score_sum = 0.0f64;
    for peptide in candidates {
        ctx.predictor
            .predict(&peptide, charge, scorer.ion_constraint(), series);
        let score = scorer.score(spectrum, series);
        let stats = scorer.ion_stats().unwrap_or_default();
        let m = Match::new(peptide, spectrum_ref, charge)
            .with_ion_stats(stats.matched, stats.possible);
        m.set_score(score_type, score);
        collection.add_match(m)?;
        score_sum += score as f64;
    }

    let total = collection.len();
    if total == 0 {
        return Ok(());
    }
    collection.exp_sp.sp_scores_mean = (score_sum / total as f64) as f32;
    collection.set_experiment_size(total);
    collection.populate_ranks(score_type)?;
    collection.mark_scored(score_type)?;
    Ok(())
}

/// Fits whatever null distribution `ctx.main_type` needs, before the
/// collection is truncated.
fn estimate_parameters<R: Rng + ?Sized>(
    collection: &mut MatchCollection,
    spectrum: &Spectrum,
    ctx: &SearchContext<'_>,
    xcorr: &mut Scorer,
    series: &mut IonSeries,
    rng: &mut R,
) -> Result<()> {
    let config = ctx.config;
    match ctx.main_type {
        ScoreType::LogpWeibullXcorr | ScoreType::LogpBonfWeibullXcorr => {
            let params = fit_weibull(
                collection,
                ScoreType::Xcorr,
                spectrum,
                ctx,
                xcorr,
                series,
                rng,
            )?;
            collection.weibull = params;
        }
        ScoreType::LogpWeibullSp | ScoreType::LogpBonfWeibullSp => {
            let params =
                fit_weibull(collection, ScoreType::Sp, spectrum, ctx, xcorr, series, rng)?;
            collection.weibull = params;
        }
        ScoreType::LogpEvdXcorr | ScoreType::LogpBonfEvdXcorr => {
            let params = estimate_evd(collection, spectrum, ctx, xcorr, series, rng)?;
            collection.evd = params;
        }
        ScoreType::LogpExpSp | ScoreType::LogpBonfExpSp => {
            collection.sort(ScoreType::Sp)?;
            let sp = raw_scores(collection, ScoreType::Sp);
            let params = estimate_exp_sp(&sp, config.top_fit_sp)?;
            collection.exp_sp = params;
        }
        _ => {}
    }
    Ok(())
}

fn draw_sample<'c, R: Rng + ?Sized>(
    collection: &'c mut MatchCollection,
    sample_count: usize,
    rng: &mut R,
) -> std::result::Result<Sample<'c>, MatchCollectionError> {
    if sample_count == 0 {
        Ok(Sample::Whole(collection))
    } else {
        collection.random_sample(sample_count, rng)
    }
}

fn fit_weibull<R: Rng + ?Sized>(
    collection: &mut MatchCollection,
    fit_type: ScoreType,
    spectrum: &Spectrum,
    ctx: &SearchContext<'_>,
    xcorr: &mut Scorer,
    series: &mut IonSeries,
    rng: &mut R,
) -> Result<WeibullParams> {
    let config = ctx.config;
    let mut sample = draw_sample(collection, config.sample_count, rng)?;
    let fit = fit_count(sample.len(), config.top_scores_to_fit)?;
    let shifts = if fit_type == ScoreType::Xcorr {
        score_unscored(&mut sample, spectrum, ctx.predictor, xcorr, series);
        XCORR_SHIFTS
    } else {
        SP_SHIFTS
    };
    sample.sort(fit_type)?;
    let scores = raw_scores(&sample, fit_type);
    let params = fit_three_parameter_weibull(&scores, fit, shifts)?;
    debug!(
        "Weibull fit on {} of {} {} scores: eta {} beta {} shift {} r {}",
        fit,
        scores.len(),
        fit_type,
        params.eta,
        params.beta,
        params.shift,
        params.correlation
    );
    Ok(params)
}

fn estimate_evd<R: Rng + ?Sized>(
    collection: &mut MatchCollection,
    spectrum: &Spectrum,
    ctx: &SearchContext<'_>,
    xcorr: &mut Scorer,
    series: &mut IonSeries,
    rng: &mut R,
) -> Result<EvdParams> {
    let mut sample = draw_sample(collection, ctx.config.sample_count, rng)?;
    score_unscored(&mut sample, spectrum, ctx.predictor, xcorr, series);
    let scores = raw_scores(&sample, ScoreType::Xcorr);
    Ok(fit_evd(&scores)?)
}

/// Scores in the current order. Only called for types flagged on the
/// collection, so every match carries one.
fn raw_scores(collection: &MatchCollection, score_type: ScoreType) -> Vec<f32> {
    collection
        .matches()
        .iter()
        .filter_map(|m| m.score(score_type))
        .collect()
}

/// Scores the matches that have no score of `scorer`'s type yet. Ranks are
/// left alone: a calibration sample shares its matches with the full
/// collection and must not leave sample ranks on them.
fn score_unscored(
    collection: &mut MatchCollection,
    spectrum: &Spectrum,
    predictor: &dyn IonPredictor,
    scorer: &mut Scorer,
    series: &mut IonSeries,
) {
    let score_type = scorer.score_type();
    let charge = collection.charge();
    let mut num_scored = 0;
    for m in collection.matches() {
        if m.has_score(score_type) {
            continue;
        }
        predictor.predict(m.peptide(), charge, scorer.ion_constraint(), series);
        m.set_score(score_type, scorer.score(spectrum, series));
        num_scored += 1;
    }
    if num_scored > 0 {
        collection.invalidate_sort();
    }
}

/// Scores every match without an XCORR score, then ranks the collection by
/// XCORR and flags it.
pub fn score_xcorr(
    collection: &mut MatchCollection,
    spectrum: &Spectrum,
    predictor: &dyn IonPredictor,
    scorer: &mut Scorer,
    series: &mut IonSeries,
) -> Result<()> {
    let score_type = scorer.score_type();
    score_unscored(collection, spectrum, predictor, scorer, series);
    collection.populate_ranks(score_type)?;
    collection.mark_scored(score_type)?;
    Ok(())
}

impl MatchCollection {
    /// Difference between the best and second best XCORR. Needs XCORR
    /// scores on every match.
    pub fn update_delta_cn(&mut self) -> std::result::Result<f32, MatchCollectionError> {
        self.require_scored(ScoreType::Xcorr)?;
        if self.last_sorted() != Some(ScoreType::Xcorr) {
            self.sort(ScoreType::Xcorr)?;
        }
        let delta_cn = match self.matches() {
            [first, second, ..] => first.sort_key(ScoreType::Xcorr) - second.sort_key(ScoreType::Xcorr),
            _ => MIN_DELTA_CN,
        };
        self.set_delta_cn(delta_cn);
        Ok(delta_cn)
    }
}

/// Converts the raw scores of the top `top_rank` matches into `-ln(p)`
/// values under the fitted null distribution. The remaining matches get
/// [`P_VALUE_NA`].
pub fn compute_p_values(
    collection: &mut MatchCollection,
    score_type: ScoreType,
    top_rank: usize,
) -> Result<()> {
    let base = match score_type.prerequisite() {
        Some(base) if score_type.is_p_value() => base,
        _ => {
            return Err(ConfigError {
                msg: format!("{} is not a p-value score type", score_type),
            }
            .into());
        }
    };
    if !collection.is_scored(base) {
        return Err(MatchCollectionError::MissingPrerequisite {
            requested: score_type,
            required: base,
        }
        .into());
    }
    collection.sort(base)?;

    let model = NullModel {
        evd: collection.evd,
        weibull: collection.weibull,
        exp_sp: collection.exp_sp,
        num_peptides: collection.experiment_size(),
    };
    for (idx, m) in collection.matches().iter().enumerate() {
        let value = if idx < top_rank {
            let raw = m.score(base).unwrap_or(f32::NAN) as f64;
            model.logp(score_type, raw) as f32
        } else {
            P_VALUE_NA
        };
        m.set_score(score_type, value);
    }
    collection.mark_scored(score_type)?;
    Ok(())
}

struct NullModel {
    evd: EvdParams,
    weibull: WeibullParams,
    exp_sp: ExpSpParams,
    num_peptides: usize,
}

impl NullModel {
    fn logp(&self, score_type: ScoreType, raw: f64) -> f64 {
        let w = &self.weibull;
        let n = self.num_peptides;
        let exp_mean = self.exp_sp.sp_scores_mean as f64;
        let exp_score = raw - self.exp_sp.base_score_sp as f64;
        match score_type {
            ScoreType::LogpExpSp => logp_exp_sp(exp_score, exp_mean),
            ScoreType::LogpBonfExpSp => logp_bonf_exp_sp(exp_score, exp_mean, n),
            ScoreType::LogpWeibullSp | ScoreType::LogpWeibullXcorr => {
                logp_weibull(raw, w.eta as f64, w.beta as f64)
            }
            ScoreType::LogpBonfWeibullSp | ScoreType::LogpBonfWeibullXcorr => {
                logp_bonf_weibull(raw, w.eta as f64, w.beta as f64, w.shift as f64, n)
            }
            ScoreType::LogpEvdXcorr => {
                logp_evd_xcorr(raw, self.evd.mu as f64, self.evd.lambda as f64)
            }
            ScoreType::LogpBonfEvdXcorr => {
                logp_bonf_evd_xcorr(raw, self.evd.mu as f64, self.evd.lambda as f64, n)
            }
            _ => f64::NAN,
        }
    }
}
