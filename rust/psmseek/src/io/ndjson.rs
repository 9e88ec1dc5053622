use crate::errors::InputReadingError;
use serde::de::DeserializeOwned;
use std::io::{
    BufRead,
    BufReader,
    Read,
};
use std::marker::PhantomData;
use std::path::{
    Path,
    PathBuf,
};

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    NdJson,
    NdJsonZstd,
}

impl InputFormat {
    pub fn detect_from_path(path: &Path) -> Result<Self, InputReadingError> {
        let path_str = path.to_string_lossy().to_lowercase();
        if path_str.ends_with(".ndjson.zst") || path_str.ends_with(".jsonl.zst") {
            Ok(InputFormat::NdJsonZstd)
        } else if path_str.ends_with(".ndjson") || path_str.ends_with(".jsonl") {
            Ok(InputFormat::NdJson)
        } else {
            Self::detect_from_content(path)
        }
    }

    fn detect_from_content(path: &Path) -> Result<Self, InputReadingError> {
        let file = std::fs::File::open(path).map_err(|e| InputReadingError::FileReading {
            source: e,
            context: "Error opening file for format detection",
            path: PathBuf::from(path),
        })?;
        let mut reader = BufReader::new(file);
        let mut buffer = [0u8; 4];
        match reader.read_exact(&mut buffer) {
            Ok(()) if buffer == ZSTD_MAGIC => Ok(InputFormat::NdJsonZstd),
            _ => Ok(InputFormat::NdJson),
        }
    }
}

/// Yields one deserialized value per non-empty line.
pub(crate) struct NdJsonReader<R: BufRead, T> {
    reader: R,
    line_number: usize,
    _marker: PhantomData<T>,
}

impl<R: BufRead, T> NdJsonReader<R, T> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            _marker: PhantomData,
        }
    }
}

impl<R: BufRead, T: DeserializeOwned> Iterator for NdJsonReader<R, T> {
    type Item = Result<T, InputReadingError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        loop {
            line.clear();
            self.line_number += 1;
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) if line.trim().is_empty() => continue,
                Ok(_) => {
                    return Some(serde_json::from_str(&line).map_err(|e| {
                        InputReadingError::Parsing {
                            source: e,
                            context: "Error parsing NDJSON line",
                            line: self.line_number,
                        }
                    }));
                }
                Err(e) => {
                    return Some(Err(InputReadingError::FileReading {
                        source: e,
                        context: "Error reading line",
                        path: PathBuf::new(),
                    }));
                }
            }
        }
    }
}

/// Reads every record of a plain or zstd-compressed NDJSON file.
pub(crate) fn read_ndjson_file<T: DeserializeOwned>(
    path: &Path,
) -> Result<Vec<T>, InputReadingError> {
    let format = InputFormat::detect_from_path(path)?;
    let file = std::fs::File::open(path).map_err(|e| InputReadingError::FileReading {
        source: e,
        context: "Error opening input file",
        path: PathBuf::from(path),
    })?;
    read_ndjson(file, format)
}

pub(crate) fn read_ndjson<T: DeserializeOwned, R: Read>(
    reader: R,
    format: InputFormat,
) -> Result<Vec<T>, InputReadingError> {
    match format {
        InputFormat::NdJson => NdJsonReader::new(BufReader::new(reader)).collect(),
        InputFormat::NdJsonZstd => {
            let decoder =
                zstd::Decoder::new(reader).map_err(|e| InputReadingError::FileReading {
                    source: e,
                    context: "Error creating ZSTD decoder",
                    path: PathBuf::new(),
                })?;
            NdJsonReader::new(BufReader::new(decoder)).collect()
        }
    }
}
