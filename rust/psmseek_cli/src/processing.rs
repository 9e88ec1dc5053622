use crate::cli::{
    FeatureArgs,
    QValueArgs,
    SearchArgs,
};
use crate::errors::CliError;
use indicatif::{
    ParallelProgressIterator,
    ProgressStyle,
};
use psmseek::errors::PsmSeekError;
use psmseek::io::discovery::{
    decoy_file_name,
    target_file_name,
};
use psmseek::io::{
    CsmWriter,
    MatchCollectionIterator,
    SpectrumRecord,
    read_peptides,
    read_spectra,
};
use psmseek::ml::{
    FEATURE_NAMES,
    QValueMethod,
    compute_bh_qvalues,
    compute_target_decoy_qvalues,
    extract_features,
};
use psmseek::models::DecoyStrategy;
use psmseek::{
    MatchCollection,
    PeptideIndex,
    ScoreType,
    SearchConfig,
    SearchContext,
    SequestIonPredictor,
    Spectrum,
    build_from_spectrum,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{
    BufWriter,
    Write,
};
use std::path::{
    Path,
    PathBuf,
};
use std::time::Instant;
use tracing::{
    debug,
    info,
};

fn progress_style() -> Result<ProgressStyle, CliError> {
    ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
    )
    .map_err(|e| CliError::Processing {
        source: e.to_string(),
    })
}

fn tsv_writer(path: &Path) -> Result<csv::Writer<File>, CliError> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|e| CliError::io(e, path))
}

/// Searches the target peptides and every decoy set, writing one `.csm`
/// file per set.
pub fn run_search(args: &SearchArgs, config: &SearchConfig) -> Result<(), CliError> {
    let start = Instant::now();
    let spectra = read_spectra(&args.spectra_file)?;
    let peptides = read_peptides(&args.peptides_file)?;
    let index = PeptideIndex::new(peptides);
    info!(
        "Loaded {} spectra and {} peptides in {:?}",
        spectra.len(),
        index.len(),
        start.elapsed()
    );

    std::fs::create_dir_all(&args.output_dir).map_err(|e| CliError::io(e, &args.output_dir))?;

    let target_path = args.output_dir.join(target_file_name(&args.fileroot));
    search_set(&spectra, &index, 0, &target_path, config)?;
    for set_idx in 1..=config.number_decoy_sets {
        let strategy = DecoyStrategy::for_set(set_idx);
        debug!("Building decoy set {} with {:?}", set_idx, strategy);
        let decoys = index.as_decoys(strategy);
        let path = args
            .output_dir
            .join(decoy_file_name(&args.fileroot, set_idx));
        search_set(&spectra, &decoys, set_idx, &path, config)?;
    }

    info!(
        "Finished searching {} set(s) in {:?}",
        1 + config.number_decoy_sets,
        start.elapsed()
    );
    Ok(())
}

fn search_set(
    spectra: &[Spectrum],
    peptides: &PeptideIndex,
    set_idx: usize,
    path: &Path,
    config: &SearchConfig,
) -> Result<(), CliError> {
    let is_decoy = set_idx > 0;
    let start = Instant::now();
    info!(
        "Searching {} spectra against the {} set",
        spectra.len(),
        if is_decoy { "decoy" } else { "target" }
    );

    // Collections are not `Send`, so each task hands back owned records.
    let records: Vec<Vec<SpectrumRecord>> = spectra
        .par_iter()
        .progress_with_style(progress_style()?)
        .map(|spectrum| search_spectrum(spectrum, peptides, set_idx, config))
        .collect::<Result<_, PsmSeekError>>()?;

    let file = File::create(path).map_err(|e| CliError::io(e, path))?;
    let mut writer = CsmWriter::new(BufWriter::new(file), config.top_match)?;
    for record in records.iter().flatten() {
        writer.write_record(record)?;
    }
    let num_spectra = writer.num_spectra();
    writer
        .finish()?
        .flush()
        .map_err(|e| CliError::io(e, path))?;

    info!(
        "Wrote {} scored spectra (of {}) to {} in {:?}",
        num_spectra,
        spectra.len(),
        path.display(),
        start.elapsed()
    );
    Ok(())
}

fn search_spectrum(
    spectrum: &Spectrum,
    peptides: &PeptideIndex,
    set_idx: usize,
    config: &SearchConfig,
) -> Result<Vec<SpectrumRecord>, PsmSeekError> {
    let ctx = SearchContext::new(peptides, &SequestIonPredictor, config);
    let mut rng = match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(
            seed.wrapping_add(spectrum.scan as u64)
                .wrapping_add((set_idx as u64) << 32),
        ),
        None => ChaCha8Rng::from_entropy(),
    };

    let mut out = Vec::new();
    for charge in spectrum.charges_to_search() {
        let Some(mut collection) =
            build_from_spectrum(&ctx, spectrum, charge, 0.0, set_idx > 0, &mut rng)?
        else {
            continue;
        };
        out.push(SpectrumRecord::from_collection(
            &mut collection,
            ctx.main_type,
            config.top_match,
        )?);
    }
    Ok(out)
}

#[derive(Debug, Serialize)]
struct QValueRow<'a> {
    scan: u32,
    charge: u8,
    xcorr_rank: u32,
    sequence: &'a str,
    proteins: String,
    xcorr: f32,
    q_value: f32,
}

/// Reads the result directory and writes a q-value for every target match.
pub fn run_q_values(args: &QValueArgs, config: &SearchConfig) -> Result<(), CliError> {
    let mut sets = MatchCollectionIterator::new(&args.directory, config.max_matches)?;
    let mut target = match sets.next() {
        Some(target) => target?,
        None => {
            return Err(CliError::Processing {
                source: format!("No target results in {}", args.directory.display()),
            });
        }
    };

    let method = QValueMethod::from(args.method);
    let q_type = match method {
        QValueMethod::BenjaminiHochberg => {
            compute_bh_qvalues(&mut target, config.pi0)?;
            ScoreType::LogpQvalueWeibullXcorr
        }
        QValueMethod::TargetDecoy => {
            let decoys = sets.collect::<Result<Vec<MatchCollection>, PsmSeekError>>()?;
            if decoys.is_empty() {
                return Err(CliError::Processing {
                    source: format!(
                        "Target/decoy q-values need at least one decoy set in {}",
                        args.directory.display()
                    ),
                });
            }
            compute_target_decoy_qvalues(&mut target, &decoys, args.score_type)?;
            ScoreType::QValue
        }
    };

    let mut wtr = tsv_writer(&args.output)?;
    let mut num_written = 0;
    for m in target.iter_by_spectrum(ScoreType::Xcorr)? {
        // BH values are stored as -ln(q).
        let q_value = match (q_type, m.score(q_type)) {
            (ScoreType::LogpQvalueWeibullXcorr, Some(x)) => (-x).exp(),
            (_, Some(x)) => x,
            (_, None) => f32::NAN,
        };
        let proteins: Vec<String> = m.peptide().proteins().iter().map(|p| p.to_string()).collect();
        wtr.serialize(QValueRow {
            scan: m.spectrum().scan,
            charge: m.charge(),
            xcorr_rank: m.rank(ScoreType::Xcorr),
            sequence: m.peptide().sequence(),
            proteins: proteins.join(";"),
            xcorr: m.score(ScoreType::Xcorr).unwrap_or(f32::NAN),
            q_value,
        })?;
        num_written += 1;
    }
    wtr.flush().map_err(|e| CliError::io(e, &args.output))?;
    info!(
        "Wrote {} q-values ({:?}) to {}",
        num_written,
        method,
        args.output.display()
    );
    Ok(())
}

/// One row per match of every set, labelled 1 for targets and -1 for decoys.
pub fn run_extract_features(args: &FeatureArgs, config: &SearchConfig) -> Result<(), CliError> {
    let sets = MatchCollectionIterator::new(&args.directory, config.max_matches)?;
    let mut wtr = tsv_writer(&args.output)?;

    let mut header = vec!["scan", "charge", "label", "sequence"];
    header.extend(FEATURE_NAMES);
    wtr.write_record(&header)?;

    let mut num_rows = 0;
    for set in sets {
        let collection = set?;
        for row in extract_features(&collection)? {
            let mut record = vec![
                row.scan.to_string(),
                row.charge.to_string(),
                if row.is_decoy { "-1" } else { "1" }.to_string(),
                row.sequence,
            ];
            record.extend(row.features.iter().map(|x| x.to_string()));
            wtr.write_record(&record)?;
            num_rows += 1;
        }
    }
    wtr.flush().map_err(|e| CliError::io(e, &args.output))?;
    info!("Wrote {} feature rows to {}", num_rows, args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::MethodArg;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).unwrap();
        }
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
        let peptides = ["PEPTIDEKLMNR", "PEPTIDERLMNK", "PEPKIDETLMNR", "ELVISLIVESK"];
        let pep_path = dir.join("peptides.ndjson");
        let lines: Vec<String> = peptides
            .iter()
            .enumerate()
            .map(|(i, seq)| format!(r#"{{"sequence": "{}", "proteins": [{}]}}"#, seq, i))
            .collect();
        std::fs::write(&pep_path, lines.join("\n")).unwrap();

        let spec_path = dir.join("spectra.ndjson");
        let spectra = [
            r#"{"scan": 1, "precursor_mz": 721.869, "charges": [2], "mz": [98.06, 175.12, 227.1, 289.16, 324.16, 425.2, 533.29, 538.29, 653.31], "intensity": [10.0, 40.0, 50.0, 20.0, 30.0, 80.0, 10.0, 20.0, 60.0]}"#,
            r#"{"scan": 2, "precursor_mz": 721.869, "charges": [2], "mz": [175.12, 289.16, 420.2, 533.29, 661.38, 790.42], "intensity": [40.0, 20.0, 60.0, 10.0, 35.0, 15.0]}"#,
        ];
        std::fs::write(&spec_path, spectra.join("\n")).unwrap();
        (spec_path, pep_path)
    }

    #[test]
    fn test_search_then_q_values() {
        let dir = temp_dir("psmseek_cli_test_search");
        let (spectra_file, peptides_file) = write_inputs(&dir);
        let out = dir.join("results");
        let args = SearchArgs {
            config: None,
            spectra_file,
            peptides_file,
            output_dir: out.clone(),
            fileroot: "run".to_string(),
            score_type: Some(ScoreType::Xcorr),
            decoy_sets: Some(1),
            seed: Some(7),
        };
        let mut config = SearchConfig::default();
        crate::config::apply_search_overrides(&mut config, &args);
        run_search(&args, &config).unwrap();
        assert!(out.join("run.csm").exists());
        assert!(out.join("run-decoy-1.csm").exists());

        let q_path = dir.join("q.tsv");
        let q_args = QValueArgs {
            directory: out.clone(),
            output: q_path.clone(),
            method: MethodArg::TargetDecoy,
            score_type: ScoreType::Xcorr,
            config: None,
            pi0: None,
        };
        run_q_values(&q_args, &config).unwrap();
        let table = std::fs::read_to_string(&q_path).unwrap();
        let mut lines = table.lines();
        assert_eq!(
            lines.next().unwrap(),
            "scan\tcharge\txcorr_rank\tsequence\tproteins\txcorr\tq_value"
        );
        assert!(lines.count() > 0);

        let f_path = dir.join("features.tsv");
        let f_args = FeatureArgs {
            directory: out,
            output: f_path.clone(),
            config: None,
        };
        run_extract_features(&f_args, &config).unwrap();
        let table = std::fs::read_to_string(&f_path).unwrap();
        let header = table.lines().next().unwrap();
        assert_eq!(header.split('\t').count(), 4 + FEATURE_NAMES.len());
        assert!(table.lines().skip(1).any(|l| l.split('\t').nth(2) == Some("-1")));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_target_decoy_needs_decoys() {
        let dir = temp_dir("psmseek_cli_test_no_decoys");
        let (spectra_file, peptides_file) = write_inputs(&dir);
        let out = dir.join("results");
        let args = SearchArgs {
            config: None,
            spectra_file,
            peptides_file,
            output_dir: out.clone(),
            fileroot: "run".to_string(),
            score_type: Some(ScoreType::Xcorr),
            decoy_sets: Some(0),
            seed: Some(7),
        };
        let mut config = SearchConfig::default();
        crate::config::apply_search_overrides(&mut config, &args);
        run_search(&args, &config).unwrap();

        let q_args = QValueArgs {
            directory: out,
            output: dir.join("q.tsv"),
            method: MethodArg::TargetDecoy,
            score_type: ScoreType::Xcorr,
            config: None,
            pi0: None,
        };
        assert!(matches!(
            run_q_values(&q_args, &config),
            Err(CliError::Processing { .. })
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
