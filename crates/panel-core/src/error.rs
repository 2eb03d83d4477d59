use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid panel: {0}")]
    InvalidPanel(String),

    #[error("Data source error: {0}")]
    DataSource(String),
}

impl PipelineError {
    pub fn shape(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        PipelineError::ShapeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
