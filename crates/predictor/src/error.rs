use panel_core::PipelineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("No valid feature windows in {rows} rows (window length {window_length})")]
    NoValidWindows { rows: usize, window_length: usize },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Model file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type PredictResult<T> = Result<T, PredictError>;
