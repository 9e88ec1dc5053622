pub mod binning;
pub mod scorer;
mod sp;
mod xcorr;

pub use scorer::Scorer;
pub use sp::{
    IonMatchStats,
    SpScorer,
    top_bins,
};
pub use xcorr::XcorrScorer;
