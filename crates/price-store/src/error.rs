use panel_core::PipelineError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: no 'close' column in header")]
    MissingClose { path: PathBuf },

    #[error("{path} line {line}: {reason}")]
    BadRecord {
        path: PathBuf,
        line: u64,
        reason: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        PipelineError::DataSource(e.to_string())
    }
}
