pub mod calibration;
pub mod collection;
pub mod config;
pub mod errors;
pub mod io;
pub mod ml;
pub mod models;
pub mod score_type;
pub mod scoring;
pub mod traits;
pub mod utils;

pub use collection::{
    MatchCollection,
    MatchIterator,
    SearchContext,
    build_from_spectrum,
};
pub use config::{
    SearchConfig,
    TopScoresToFit,
};
pub use errors::{
    PsmSeekError,
    Result,
};
pub use models::{
    Match,
    MatchHandle,
    Peptide,
    PeptideIndex,
    SequestIonPredictor,
    Spectrum,
};
pub use score_type::{
    ScoreType,
    ScoredTypes,
};
pub use scoring::Scorer;
