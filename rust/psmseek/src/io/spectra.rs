use super::ndjson::read_ndjson_file;
use crate::errors::InputReadingError;
use crate::models::Spectrum;
use std::path::Path;
use tracing::info;

/// Reads one spectrum per line from a (possibly zstd-compressed) NDJSON
/// file.
pub fn read_spectra(path: &Path) -> Result<Vec<Spectrum>, InputReadingError> {
    let spectra: Vec<Spectrum> = read_ndjson_file(path)?;
    info!("Read {} spectra from {}", spectra.len(), path.display());
    Ok(spectra)
}
