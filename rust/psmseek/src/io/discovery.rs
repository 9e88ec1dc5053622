use crate::collection::MatchCollection;
use crate::errors::{
    PsmSeekError,
    ResultDirectoryError,
};
use std::fs::File;
use std::io::BufReader;
use std::path::{
    Path,
    PathBuf,
};
use tracing::{
    info,
    warn,
};

pub const RESULT_EXTENSION: &str = ".csm";
pub const MAX_DECOY_SETS: usize = 3;

/// `<root>.csm` for the target set, `<root>-decoy-<k>.csm` for decoy set k.
pub fn target_file_name(root: &str) -> String {
    format!("{}{}", root, RESULT_EXTENSION)
}

pub fn decoy_file_name(root: &str, set_idx: usize) -> String {
    format!("{}-decoy-{}{}", root, set_idx, RESULT_EXTENSION)
}

/// The result files of one search, grouped by set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSetManifest {
    pub directory: PathBuf,
    pub target: Vec<PathBuf>,
    /// `decoys[k - 1]` holds the files of decoy set k. Sets between 1 and
    /// the highest one present may be empty.
    pub decoys: Vec<Vec<PathBuf>>,
}

impl ResultSetManifest {
    /// Lists the directory once and sorts its `.csm` files into sets.
    pub fn discover(directory: &Path) -> Result<Self, ResultDirectoryError> {
        let entries = std::fs::read_dir(directory).map_err(|e| ResultDirectoryError::Unreadable {
            source: e,
            path: directory.to_path_buf(),
        })?;

        let mut target = Vec::new();
        let mut decoys: Vec<Vec<PathBuf>> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ResultDirectoryError::Unreadable {
                source: e,
                path: directory.to_path_buf(),
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(RESULT_EXTENSION) {
                continue;
            }
            if let Some(set_idx) = decoy_set_of(&name) {
                if decoys.len() < set_idx {
                    decoys.resize(set_idx, Vec::new());
                }
                decoys[set_idx - 1].push(entry.path());
            } else if !name.contains("decoy") {
                target.push(entry.path());
            }
        }

        if target.is_empty() {
            return Err(ResultDirectoryError::MissingTarget {
                path: directory.to_path_buf(),
            });
        }
        target.sort();
        for files in decoys.iter_mut() {
            files.sort();
        }
        info!(
            "Found {} target file(s) and {} decoy set(s) in {}",
            target.len(),
            decoys.len(),
            directory.display()
        );
        Ok(Self {
            directory: directory.to_path_buf(),
            target,
            decoys,
        })
    }

    /// Target set plus decoy sets.
    pub fn num_sets(&self) -> usize {
        1 + self.decoys.len()
    }

    pub fn num_decoy_sets(&self) -> usize {
        self.decoys.len()
    }
}

fn decoy_set_of(name: &str) -> Option<usize> {
    let stem = name.strip_suffix(RESULT_EXTENSION)?;
    let (_, idx) = stem.rsplit_once("-decoy-")?;
    let idx: usize = idx.parse().ok()?;
    (1..=MAX_DECOY_SETS).contains(&idx).then_some(idx)
}

/// Yields the merged target collection, then one collection per decoy set.
/// Each set is read when it is requested.
pub struct MatchCollectionIterator {
    manifest: ResultSetManifest,
    next_set: usize,
    max_matches: usize,
}

impl MatchCollectionIterator {
    pub fn new(directory: &Path, max_matches: usize) -> Result<Self, ResultDirectoryError> {
        Ok(Self::from_manifest(
            ResultSetManifest::discover(directory)?,
            max_matches,
        ))
    }

    pub fn from_manifest(manifest: ResultSetManifest, max_matches: usize) -> Self {
        Self {
            manifest,
            next_set: 0,
            max_matches,
        }
    }

    pub fn manifest(&self) -> &ResultSetManifest {
        &self.manifest
    }

    pub fn num_decoy_sets(&self) -> usize {
        self.manifest.num_decoy_sets()
    }

    fn read_set(&self, files: &[PathBuf], is_decoy: bool) -> Result<MatchCollection, PsmSeekError> {
        let mut collection = MatchCollection::new_post_process(is_decoy, self.max_matches);
        if files.is_empty() {
            warn!("No result files for a decoy set, returning an empty collection");
        }
        for path in files {
            let file = File::open(path).map_err(|e| ResultDirectoryError::UnreadableFile {
                source: e,
                path: path.clone(),
            })?;
            let num_spectra = collection.extend(BufReader::new(file))?;
            info!("Read {} spectra from {}", num_spectra, path.display());
        }
        Ok(collection)
    }
}

impl Iterator for MatchCollectionIterator {
    type Item = Result<MatchCollection, PsmSeekError>;

    fn next(&mut self) -> Option<Self::Item> {
        let set_idx = self.next_set;
        if set_idx >= self.manifest.num_sets() {
            return None;
        }
        self.next_set += 1;
        let out = if set_idx == 0 {
            self.read_set(&self.manifest.target, false)
        } else {
            self.read_set(&self.manifest.decoys[set_idx - 1], true)
        };
        Some(out)
    }
}
