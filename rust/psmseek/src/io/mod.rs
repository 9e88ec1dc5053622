//! Reading inputs and reading/writing binary result files.

pub mod csm;
pub mod discovery;
mod ndjson;
pub mod peptides;
pub mod spectra;

pub use csm::{
    CsmWriter,
    SpectrumRecord,
};
pub use discovery::{
    MatchCollectionIterator,
    ResultSetManifest,
};
pub use ndjson::InputFormat;
pub use peptides::read_peptides;
pub use spectra::read_spectra;
