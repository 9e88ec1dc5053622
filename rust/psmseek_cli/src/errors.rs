use psmseek::errors::{
    ConfigError,
    InputReadingError,
    MatchCollectionError,
    PsmSeekError,
    ResultDirectoryError,
    SerializationError,
};

#[derive(Debug)]
pub enum CliError {
    Config {
        source: String,
    },
    ParseError {
        msg: String,
    },
    Io {
        source: String,
        path: Option<String>,
    },
    Processing {
        source: String,
    },
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config { source } => write!(f, "Error interpreting the config: {}", source),
            CliError::ParseError { msg } => write!(f, "Error parsing config: {}", msg),
            CliError::Io { source, path } => {
                if let Some(path) = path {
                    write!(f, "Error accessing file {}: {}", path, source)
                } else {
                    write!(f, "Error accessing file: {}", source)
                }
            }
            CliError::Processing { source } => write!(f, "Error processing data: {}", source),
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    pub fn io(source: impl std::fmt::Display, path: &std::path::Path) -> Self {
        CliError::Io {
            source: source.to_string(),
            path: Some(path.to_string_lossy().to_string()),
        }
    }
}

impl From<PsmSeekError> for CliError {
    fn from(e: PsmSeekError) -> Self {
        match e {
            PsmSeekError::Config(e) => e.into(),
            e => CliError::Processing {
                source: e.to_string(),
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config { source: e.msg }
    }
}

impl From<InputReadingError> for CliError {
    fn from(e: InputReadingError) -> Self {
        PsmSeekError::from(e).into()
    }
}

impl From<MatchCollectionError> for CliError {
    fn from(e: MatchCollectionError) -> Self {
        PsmSeekError::from(e).into()
    }
}

impl From<ResultDirectoryError> for CliError {
    fn from(e: ResultDirectoryError) -> Self {
        PsmSeekError::from(e).into()
    }
}

impl From<SerializationError> for CliError {
    fn from(e: SerializationError) -> Self {
        PsmSeekError::from(e).into()
    }
}

impl From<csv::Error> for CliError {
    fn from(e: csv::Error) -> Self {
        CliError::Io {
            source: e.to_string(),
            path: None,
        }
    }
}
