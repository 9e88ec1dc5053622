use crate::score_type::ScoreType;
use std::path::PathBuf;

/// Contract violations on a [`crate::MatchCollection`]. These are programmer
/// errors and abort the run.
#[derive(Debug)]
pub enum MatchCollectionError {
    /// A mutating operation (or a second iterator) was requested while a
    /// match iterator is open.
    Locked {
        operation: &'static str,
    },
    CapacityExceeded {
        capacity: usize,
    },
    UnsortableScoreType(ScoreType),
    MissingPrerequisite {
        requested: ScoreType,
        required: ScoreType,
    },
    NotScored(ScoreType),
    /// Tried to flag a score type that some match does not carry.
    IncompleteScores(ScoreType),
    NotPostProcess {
        operation: &'static str,
    },
    ResultsLengthMismatch {
        expected: usize,
        got: usize,
    },
    /// A stored score could not be found among the values derived from it.
    UnmappedScore {
        score_type: ScoreType,
        value: f64,
    },
}

/// Recoverable, per spectrum. The caller skips the spectrum and moves on.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    TooFewSamples { found: usize, required: usize },
    NoConvergence { iterations: usize },
    DegenerateFit { context: &'static str },
}

#[derive(Debug)]
pub enum SerializationError {
    Io {
        source: std::io::Error,
        context: &'static str,
    },
    Truncated {
        context: &'static str,
    },
    InvalidRecord {
        context: String,
    },
}

#[derive(Debug)]
pub enum ResultDirectoryError {
    Unreadable {
        source: std::io::Error,
        path: PathBuf,
    },
    MissingTarget {
        path: PathBuf,
    },
    UnreadableFile {
        source: std::io::Error,
        path: PathBuf,
    },
}

#[derive(Debug)]
pub enum InputReadingError {
    FileReading {
        source: std::io::Error,
        context: &'static str,
        path: PathBuf,
    },
    Parsing {
        source: serde_json::Error,
        context: &'static str,
        line: usize,
    },
    InvalidSequence {
        sequence: String,
    },
}

#[derive(Debug)]
pub struct ConfigError {
    pub msg: String,
}

#[derive(Debug)]
pub enum PsmSeekError {
    MatchCollection(MatchCollectionError),
    Calibration(CalibrationError),
    Serialization(SerializationError),
    ResultDirectory(ResultDirectoryError),
    InputReading(InputReadingError),
    Config(ConfigError),
}

pub type Result<T> = std::result::Result<T, PsmSeekError>;

impl std::fmt::Display for MatchCollectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchCollectionError::Locked { operation } => write!(
                f,
                "Cannot {} while a match iterator is open on the collection",
                operation
            ),
            MatchCollectionError::CapacityExceeded { capacity } => {
                write!(f, "Match count exceeds max match limit: {}", capacity)
            }
            MatchCollectionError::UnsortableScoreType(st) => {
                write!(f, "Score type {} has no defined sort order", st)
            }
            MatchCollectionError::MissingPrerequisite {
                requested,
                required,
            } => write!(
                f,
                "The collection must be scored by {} before {}",
                required, requested
            ),
            MatchCollectionError::NotScored(st) => {
                write!(f, "The collection has not been scored for {}", st)
            }
            MatchCollectionError::IncompleteScores(st) => {
                write!(f, "Not every match carries a {} score", st)
            }
            MatchCollectionError::NotPostProcess { operation } => {
                write!(f, "{} requires a post-process collection", operation)
            }
            MatchCollectionError::ResultsLengthMismatch { expected, got } => write!(
                f,
                "Expected {} results (one per match), got {}",
                expected, got
            ),
            MatchCollectionError::UnmappedScore { score_type, value } => write!(
                f,
                "Could not map {} value {} back to a sorted position",
                score_type, value
            ),
        }
    }
}

impl std::fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibrationError::TooFewSamples { found, required } => write!(
                f,
                "Not enough peptides to estimate distribution parameters (found {}, minimum {})",
                found, required
            ),
            CalibrationError::NoConvergence { iterations } => {
                write!(f, "Root finding failed to converge after {} iterations", iterations)
            }
            CalibrationError::DegenerateFit { context } => write!(f, "Degenerate fit: {}", context),
        }
    }
}

impl std::fmt::Display for SerializationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerializationError::Io { source, context } => write!(f, "{}: {}", context, source),
            SerializationError::Truncated { context } => {
                write!(f, "Serialized file corrupted, {}", context)
            }
            SerializationError::InvalidRecord { context } => {
                write!(f, "Invalid serialized record: {}", context)
            }
        }
    }
}

impl std::fmt::Display for ResultDirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultDirectoryError::Unreadable { source, path } => write!(
                f,
                "Failed to open PSM file directory {}: {}",
                path.display(),
                source
            ),
            ResultDirectoryError::MissingTarget { path } => {
                write!(f, "No target .csm file found in {}", path.display())
            }
            ResultDirectoryError::UnreadableFile { source, path } => {
                write!(f, "Cannot read from psm file {}: {}", path.display(), source)
            }
        }
    }
}

impl std::fmt::Display for InputReadingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputReadingError::FileReading {
                source,
                context,
                path,
            } => write!(f, "{} ({}): {}", context, path.display(), source),
            InputReadingError::Parsing {
                source,
                context,
                line,
            } => write!(f, "{} at line {}: {}", context, line, source),
            InputReadingError::InvalidSequence { sequence } => {
                write!(f, "Unsupported residue in sequence {}", sequence)
            }
        }
    }
}

impl std::fmt::Display for PsmSeekError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PsmSeekError::MatchCollection(e) => write!(f, "{}", e),
            PsmSeekError::Calibration(e) => write!(f, "{}", e),
            PsmSeekError::Serialization(e) => write!(f, "{}", e),
            PsmSeekError::ResultDirectory(e) => write!(f, "{}", e),
            PsmSeekError::InputReading(e) => write!(f, "{}", e),
            PsmSeekError::Config(e) => write!(f, "Invalid configuration: {}", e.msg),
        }
    }
}

impl std::error::Error for PsmSeekError {}

impl From<MatchCollectionError> for PsmSeekError {
    fn from(x: MatchCollectionError) -> Self {
        Self::MatchCollection(x)
    }
}

impl From<CalibrationError> for PsmSeekError {
    fn from(x: CalibrationError) -> Self {
        Self::Calibration(x)
    }
}

impl From<SerializationError> for PsmSeekError {
    fn from(x: SerializationError) -> Self {
        Self::Serialization(x)
    }
}

impl From<ResultDirectoryError> for PsmSeekError {
    fn from(x: ResultDirectoryError) -> Self {
        Self::ResultDirectory(x)
    }
}

impl From<InputReadingError> for PsmSeekError {
    fn from(x: InputReadingError) -> Self {
        Self::InputReading(x)
    }
}

impl From<ConfigError> for PsmSeekError {
    fn from(x: ConfigError) -> Self {
        Self::Config(x)
    }
}
