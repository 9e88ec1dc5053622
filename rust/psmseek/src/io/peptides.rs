use super::ndjson::read_ndjson_file;
use crate::errors::InputReadingError;
use crate::models::Peptide;
use serde::{
    Deserialize,
    Serialize,
};
use std::path::Path;
use tracing::info;

/// One line of a peptide list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeptideEntry {
    pub sequence: String,
    #[serde(default)]
    pub proteins: Vec<u32>,
}

impl TryFrom<PeptideEntry> for Peptide {
    type Error = InputReadingError;

    fn try_from(x: PeptideEntry) -> Result<Self, Self::Error> {
        Peptide::new(&x.sequence, x.proteins)
    }
}

/// Reads target peptides from a (possibly zstd-compressed) NDJSON file.
pub fn read_peptides(path: &Path) -> Result<Vec<Peptide>, InputReadingError> {
    let entries: Vec<PeptideEntry> = read_ndjson_file(path)?;
    let peptides = entries
        .into_iter()
        .map(Peptide::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    info!("Read {} peptides from {}", peptides.len(), path.display());
    Ok(peptides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_conversion() {
        let entry: PeptideEntry =
            serde_json::from_str(r#"{"sequence": "ELVISK", "proteins": [2, 5]}"#).unwrap();
        let pep = Peptide::try_from(entry).unwrap();
        assert_eq!(pep.proteins(), &[2, 5]);
        assert!(!pep.is_decoy());

        let entry: PeptideEntry = serde_json::from_str(r#"{"sequence": "ELVIS*K"}"#).unwrap();
        assert!(Peptide::try_from(entry).is_err());
    }
}
