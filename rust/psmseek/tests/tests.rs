use psmseek::io::discovery::{
    decoy_file_name,
    target_file_name,
};
use psmseek::io::{
    CsmWriter,
    MatchCollectionIterator,
    ResultSetManifest,
};
use psmseek::ml::{
    compute_bh_qvalues,
    compute_target_decoy_qvalues,
};
use psmseek::models::mass::PROTON;
use psmseek::models::{
    DecoyStrategy,
    IonConstraint,
    IonSeries,
    SpectrumRef,
};
use psmseek::traits::{
    CandidateSource,
    IonPredictor,
};
use psmseek::{
    Match,
    MatchCollection,
    Peptide,
    PeptideIndex,
    ScoreType,
    Scorer,
    SearchConfig,
    SearchContext,
    SequestIonPredictor,
    Spectrum,
    build_from_spectrum,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

fn assert_close(a: f32, b: f32, tol: f32) {
    assert!((a - b).abs() <= tol, "{} != {} (tol {})", a, b, tol);
}

/// A spectrum holding the singly charged b/y ladder of `sequence` plus a
/// few unrelated peaks.
fn spectrum_for(sequence: &str, scan: u32, charge: u8) -> Spectrum {
    let pep = Peptide::new(sequence, vec![]).unwrap();
    let mut series = IonSeries::new();
    SequestIonPredictor.predict(&pep, charge, IonConstraint::Sp, &mut series);
    let mut peaks: Vec<(f64, f32)> = series.iter().map(|ion| (ion.mz, 100.0)).collect();
    peaks.extend([(151.3, 20.0), (388.8, 35.0), (702.1, 15.0)]);
    peaks.sort_by(|a, b| a.0.total_cmp(&b.0));
    Spectrum {
        scan,
        precursor_mz: pep.mass() / charge as f64 + PROTON,
        charges: vec![charge],
        mz: peaks.iter().map(|x| x.0).collect(),
        intensity: peaks.iter().map(|x| x.1).collect(),
    }
}

/// Peptides sharing the composition (and so the mass) of `sequence`.
fn isobaric_index(sequence: &str, n: u64) -> PeptideIndex {
    let mut peptides = vec![Peptide::new(sequence, vec![0]).unwrap()];
    for seed in 1..n {
        let shuffled = DecoyStrategy::Shuffle { seed }.apply(sequence);
        if shuffled != sequence {
            peptides.push(Peptide::new(&shuffled, vec![seed as u32]).unwrap());
        }
    }
    PeptideIndex::new(peptides)
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    if dir.exists() {
        std::fs::remove_dir_all(&dir).unwrap();
    }
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_collection_end_to_end() {
    let config = SearchConfig::default();
    let target = spectrum_for("PEPTIDEK", 1, 2);
    let index = PeptideIndex::new(vec![
        Peptide::new("PEPTIDEK", vec![0]).unwrap(),
        Peptide::new("PETPIDEK", vec![1]).unwrap(),
        Peptide::new("PEDITPEK", vec![2]).unwrap(),
    ]);
    let candidates = index.candidates(target.neutral_mass(2), config.mass_window);
    assert_eq!(candidates.len(), 3);

    let mut scorer = Scorer::new(ScoreType::Sp, &config).unwrap();
    let mut series = IonSeries::new();
    let mut coll = MatchCollection::new(2, false, config.max_matches);
    let mut sp_scores = Vec::new();
    for pep in candidates {
        SequestIonPredictor.predict(&pep, 2, scorer.ion_constraint(), &mut series);
        sp_scores.push(scorer.score(&target, &series));
        let stats = scorer.ion_stats().unwrap();
        let m = Match::new(
            pep,
            SpectrumRef {
                scan: target.scan,
                precursor_mz: target.precursor_mz,
            },
            2,
        )
        .with_ion_stats(stats.matched, stats.possible);
        coll.add_match(m).unwrap();
    }
    coll.fill_results(&sp_scores, ScoreType::Sp, false).unwrap();
    assert_eq!(coll.len(), 3);

    let mut sorted = sp_scores.clone();
    sorted.sort_by(|a, b| b.total_cmp(a));
    coll.truncate(2, ScoreType::Sp).unwrap();
    assert_eq!(coll.len(), 2);
    let kept: Vec<f32> = coll
        .matches()
        .iter()
        .map(|m| m.score(ScoreType::Sp).unwrap())
        .collect();
    assert_eq!(kept, sorted[..2].to_vec());
    assert_eq!(coll.matches()[0].peptide().sequence(), "PEPTIDEK");

    coll.fill_results(&[5.0, 3.0], ScoreType::Xcorr, false).unwrap();
    assert_close(coll.update_delta_cn().unwrap(), 2.0, 1e-6);
    assert_eq!(coll.matches()[0].rank(ScoreType::Xcorr), 1);
}

#[test]
fn test_search_keeps_top_preliminary_matches() {
    let index = isobaric_index("PEPTIDEKLMNR", 30);
    let config = SearchConfig {
        score_type: ScoreType::Xcorr,
        max_rank_preliminary: 5,
        ..Default::default()
    };
    let ctx = SearchContext::new(&index, &SequestIonPredictor, &config);
    let spectrum = spectrum_for("PEPTIDEKLMNR", 7, 2);
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let coll = build_from_spectrum(&ctx, &spectrum, 2, 0.0, false, &mut rng)
        .unwrap()
        .unwrap();

    assert_eq!(coll.experiment_size(), index.len());
    assert_eq!(coll.len(), 5);
    for m in coll.matches() {
        assert!(m.rank(ScoreType::Sp) <= 5);
        assert!(m.rank(ScoreType::Xcorr) >= 1);
    }
    assert_eq!(coll.matches()[0].peptide().sequence(), "PEPTIDEKLMNR");
}

#[test]
fn test_weibull_search_has_p_values_for_top_matches() {
    let index = isobaric_index("PEPTIDEKLMNR", 80);
    let config = SearchConfig {
        max_rank_preliminary: 20,
        top_match: 3,
        max_sqt_result: 3,
        ..Default::default()
    };
    let ctx = SearchContext::new(&index, &SequestIonPredictor, &config);
    let spectrum = spectrum_for("PEPTIDEKLMNR", 7, 2);
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut coll = build_from_spectrum(&ctx, &spectrum, 2, 0.0, false, &mut rng)
        .unwrap()
        .expect("enough candidates to fit");

    let main = ScoreType::LogpBonfWeibullXcorr;
    assert!(coll.is_scored(main));
    let params = coll.weibull_params();
    assert!(params.beta.is_finite() && params.eta > 0.0);

    let values: Vec<f32> = coll
        .iter(main, true)
        .unwrap()
        .map(|m| m.score(main).unwrap())
        .collect();
    assert!(values[..3].iter().all(|x| !x.is_nan()));
    assert!(values[3..].iter().all(|x| x.is_nan()));
    for pair in values[..3].windows(2) {
        assert!(pair[0] >= pair[1]);
    }
}

#[test]
fn test_result_directory_round_trip() {
    let dir = temp_dir("psmseek_test_round_trip");
    let index = isobaric_index("PEPTIDEKLMNR", 30);
    let decoy_index = index.as_decoys(DecoyStrategy::Reverse);
    let config = SearchConfig {
        score_type: ScoreType::Xcorr,
        max_rank_preliminary: 10,
        top_match: 2,
        ..Default::default()
    };
    let spectra = [
        spectrum_for("PEPTIDEKLMNR", 1, 2),
        spectrum_for("PEPTIDEKLMNR", 2, 3),
    ];

    let mut expected = Vec::new();
    for (path, peptides, is_decoy) in [
        (dir.join(target_file_name("run")), &index, false),
        (dir.join(decoy_file_name("run", 1)), &decoy_index, true),
    ] {
        let ctx = SearchContext::new(peptides, &SequestIonPredictor, &config);
        let file = BufWriter::new(File::create(&path).unwrap());
        let mut writer = CsmWriter::new(file, config.top_match).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for spectrum in spectra.iter() {
            let charge = spectrum.charges[0];
            let mut coll = build_from_spectrum(&ctx, spectrum, charge, 0.0, is_decoy, &mut rng)
                .unwrap()
                .unwrap();
            writer.write_collection(&mut coll, ScoreType::Xcorr).unwrap();
            expected.push((coll.charge(), coll.delta_cn(), coll.scored_types()));
        }
        writer.finish().unwrap();
    }

    let manifest = ResultSetManifest::discover(&dir).unwrap();
    assert_eq!(manifest.target.len(), 1);
    assert_eq!(manifest.num_sets(), 2);

    let mut sets = MatchCollectionIterator::from_manifest(manifest, config.max_matches);
    let mut target = sets.next().unwrap().unwrap();
    let decoy = sets.next().unwrap().unwrap();
    assert!(sets.next().is_none());

    assert!(!target.is_decoy());
    assert!(decoy.is_decoy());
    assert_eq!(target.len(), 4);
    // The collection keeps the header fields of the last spectrum read.
    let (charge, delta_cn, scored) = expected[1];
    assert_eq!(target.charge(), charge);
    assert_eq!(target.delta_cn(), delta_cn);
    assert_eq!(target.scored_types(), scored);
    assert!(decoy.matches().iter().all(|m| m.is_decoy()));

    let first = &target.matches()[0];
    assert_eq!(first.charge(), 2);
    assert_eq!(first.delta_cn(), expected[0].1);
    assert!(target.protein_counter(0).unwrap() >= 1);

    compute_target_decoy_qvalues(&mut target, &[decoy], ScoreType::Xcorr).unwrap();
    assert!(target.is_scored(ScoreType::QValue));
    let best = target
        .iter(ScoreType::QValue, true)
        .unwrap()
        .next()
        .unwrap();
    assert!(best.score(ScoreType::QValue).unwrap() <= 1.0);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_bh_qvalues_from_result_directory() {
    let dir = temp_dir("psmseek_test_bh_directory");
    let index = isobaric_index("PEPTIDEKLMNR", 80);
    let config = SearchConfig {
        max_rank_preliminary: 20,
        top_match: 3,
        max_sqt_result: 3,
        ..Default::default()
    };
    let main = ScoreType::LogpBonfWeibullXcorr;
    assert_eq!(config.score_type, main);
    let ctx = SearchContext::new(&index, &SequestIonPredictor, &config);

    // Two scans with identical peaks and rng seeds give identical p-values.
    let file = BufWriter::new(File::create(dir.join(target_file_name("run"))).unwrap());
    let mut writer = CsmWriter::new(file, config.top_match).unwrap();
    for scan in [1, 2] {
        let spectrum = spectrum_for("PEPTIDEKLMNR", scan, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut coll = build_from_spectrum(&ctx, &spectrum, 2, 0.0, false, &mut rng)
            .unwrap()
            .expect("enough candidates to fit");
        writer.write_collection(&mut coll, main).unwrap();
    }
    writer.finish().unwrap();

    let mut sets = MatchCollectionIterator::new(&dir, config.max_matches).unwrap();
    let mut target = sets.next().unwrap().unwrap();
    assert!(sets.next().is_none());
    assert!(target.is_scored(main));
    assert_eq!(target.len(), 6);

    let num_p_values = compute_bh_qvalues(&mut target, 1.0).unwrap();
    assert_eq!(num_p_values, 6);
    let q_type = ScoreType::LogpQvalueWeibullXcorr;
    assert!(target.is_scored(q_type));

    let pairs: Vec<(u32, f32, f32)> = target
        .matches()
        .iter()
        .map(|m| {
            (
                m.spectrum().scan,
                m.score(main).unwrap(),
                m.score(q_type).unwrap(),
            )
        })
        .collect();
    for (_, log_p, log_q) in pairs.iter() {
        assert!(log_q.is_finite());
        // q is never smaller than p.
        assert!(*log_q <= *log_p + 1e-4);
    }
    for a in pairs.iter() {
        for b in pairs.iter() {
            if a.1 == b.1 {
                assert_eq!(a.2, b.2);
            } else if a.1 > b.1 {
                assert!(a.2 >= b.2);
            }
        }
    }
    // Each scan's best match shares its p-value with the other scan.
    let best_log_p = pairs.iter().map(|x| x.1).fold(f32::MIN, f32::max);
    let best: Vec<&(u32, f32, f32)> = pairs.iter().filter(|x| x.1 == best_log_p).collect();
    assert!(best.len() >= 2);
    assert!(best.iter().any(|x| x.0 == 1) && best.iter().any(|x| x.0 == 2));
    // Ties take the q of the last tied position, here at least 2 of 6.
    assert!(best[0].2 >= best_log_p - 3f32.ln() - 1e-4);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_discovery_counts_decoy_sets() {
    let dir = temp_dir("psmseek_test_discovery");
    for name in [
        "a.csm",
        "b.csm",
        "a-decoy-1.csm",
        "a-decoy-3.csm",
        "notes.txt",
    ] {
        File::create(dir.join(name)).unwrap();
    }
    let manifest = ResultSetManifest::discover(&dir).unwrap();
    assert_eq!(manifest.target.len(), 2);
    assert_eq!(manifest.num_sets(), 4);
    assert!(manifest.decoys[1].is_empty());

    std::fs::remove_dir_all(&dir).unwrap();
    let dir = temp_dir("psmseek_test_discovery_no_target");
    File::create(dir.join("a-decoy-1.csm")).unwrap();
    assert!(ResultSetManifest::discover(&dir).is_err());
    std::fs::remove_dir_all(&dir).unwrap();

    assert!(ResultSetManifest::discover(&dir).is_err());
}
