mod decoy;
mod ions;
pub mod mass;
mod peptide;
mod psm;
mod spectrum;

pub use decoy::{
    DecoyMarking,
    DecoyStrategy,
};
pub use ions::{
    Ion,
    IonConstraint,
    IonSeries,
    IonType,
    SequestIonPredictor,
};
pub use peptide::{
    Peptide,
    PeptideIndex,
};
pub use psm::{
    Match,
    MatchHandle,
    MatchRecord,
    P_VALUE_NA,
    SpectrumRef,
    is_p_value_na,
};
pub use spectrum::Spectrum;
