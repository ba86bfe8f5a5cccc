use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort ingestion of a single dataset.
///
/// Row-level problems never show up here: they are counted by the reader
/// (anomalies) and the normalizer (failures) instead.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("no encoding/delimiter combination could decode {path}: {reason}")]
    UnreadableFile { path: PathBuf, reason: String },

    #[error("malformed header in {path}: {reason}")]
    MalformedHeader { path: PathBuf, reason: String },

    #[error("{path} has no header row")]
    EmptyFile { path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IngestError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
