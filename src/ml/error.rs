use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to access model file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model file {path} is not a valid model artifact")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode model")]
    Encode(#[source] serde_json::Error),
    #[error("unsupported model format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("model is inconsistent: {0}")]
    Incompatible(String),
    #[error("cannot fit a model on an empty training set")]
    EmptyTrainingSet,
    #[error("training rows ({rows}) and labels ({labels}) differ in length")]
    LabelMismatch { rows: usize, labels: usize },
}
