use clap::{
    Args,
    Parser,
    Subcommand,
    ValueEnum,
};
use psmseek::ScoreType;
use psmseek::ml::QValueMethod;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score spectra against a peptide list and write `.csm` result files
    Search(SearchArgs),
    /// Read a result directory and report q-values for the target matches
    ComputeQValues(QValueArgs),
    /// Read a result directory and write one feature row per match
    ExtractFeatures(FeatureArgs),
    /// Print (or write) the default configuration as JSON
    WriteTemplate {
        /// Where to write the template, stdout if not given
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Path to the JSON configuration file, defaults are used if not given
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the spectra file (.ndjson or .ndjson.zst)
    #[arg(short, long)]
    pub spectra_file: PathBuf,

    /// Path to the peptide file (.ndjson or .ndjson.zst)
    #[arg(short, long)]
    pub peptides_file: PathBuf,

    /// Path to the output directory
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Root of the result file names
    #[arg(short, long, default_value = "psmseek")]
    pub fileroot: String,

    /// Main score type (will over-write the config file)
    #[arg(long, value_parser = parse_score_type)]
    pub score_type: Option<ScoreType>,

    /// Number of decoy sets to search (will over-write the config file)
    #[arg(long)]
    pub decoy_sets: Option<usize>,

    /// Seed for the calibration sampler (will over-write the config file)
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct QValueArgs {
    /// Directory holding the `.csm` files of a search
    pub directory: PathBuf,

    /// Path to the output table (tab separated)
    #[arg(short, long)]
    pub output: PathBuf,

    #[arg(short, long, value_enum, default_value_t = MethodArg::TargetDecoy)]
    pub method: MethodArg,

    /// Score the target/decoy competition ranks by
    #[arg(long, value_parser = parse_score_type, default_value = "xcorr")]
    pub score_type: ScoreType,

    /// Path to the JSON configuration file, read for pi0 and max_matches
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Estimated fraction of true nulls (will over-write the config file)
    #[arg(long)]
    pub pi0: Option<f64>,
}

#[derive(Args, Debug)]
pub struct FeatureArgs {
    /// Directory holding the `.csm` files of a search
    pub directory: PathBuf,

    /// Path to the output table (tab separated)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Path to the JSON configuration file, read for max_matches
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodArg {
    /// Benjamini-Hochberg on the calibrated xcorr p-values
    Bh,
    TargetDecoy,
}

impl From<MethodArg> for QValueMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::Bh => QValueMethod::BenjaminiHochberg,
            MethodArg::TargetDecoy => QValueMethod::TargetDecoy,
        }
    }
}

fn parse_score_type(s: &str) -> Result<ScoreType, String> {
    ScoreType::ALL
        .iter()
        .copied()
        .find(|st| st.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| {
            let names: Vec<&str> = ScoreType::ALL.iter().map(|st| st.as_str()).collect();
            format!("unknown score type '{}', expected one of: {}", s, names.join(", "))
        })
}
