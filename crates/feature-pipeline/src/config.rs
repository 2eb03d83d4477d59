use panel_core::{PipelineError, PipelineResult};
use serde::Serialize;

/// Window length used when ranking the watch list
pub const DEFAULT_INFERENCE_WINDOW: usize = 60;
/// Window length used when building training sets
pub const DEFAULT_TRAINING_WINDOW: usize = 120;
/// Forward-return horizon for training labels (trading days)
pub const DEFAULT_HORIZON_DAYS: usize = 30;

/// Shape contract shared by the trainer and the predictor.
///
/// Immutable once built: fields are private and only validated constructors
/// exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FeatureConfig {
    window_length: usize,
    ticker_count: usize,
    step: usize,
    horizon_days: usize,
}

impl FeatureConfig {
    pub fn new(
        window_length: usize,
        ticker_count: usize,
        step: usize,
        horizon_days: usize,
    ) -> PipelineResult<Self> {
        if window_length == 0 {
            return Err(PipelineError::InvalidConfig("window_length must be positive".into()));
        }
        if ticker_count == 0 {
            return Err(PipelineError::InvalidConfig("ticker_count must be positive".into()));
        }
        if step == 0 {
            return Err(PipelineError::InvalidConfig("step must be positive".into()));
        }

        Ok(Self {
            window_length,
            ticker_count,
            step,
            horizon_days,
        })
    }

    /// Feature-only config: step 1, no label horizon
    pub fn inference(window_length: usize, ticker_count: usize) -> PipelineResult<Self> {
        Self::new(window_length, ticker_count, 1, 0)
    }

    /// Step 1 with the default 30-day label horizon
    pub fn training(window_length: usize, ticker_count: usize) -> PipelineResult<Self> {
        Self::new(window_length, ticker_count, 1, DEFAULT_HORIZON_DAYS)
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn ticker_count(&self) -> usize {
        self.ticker_count
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn horizon_days(&self) -> usize {
        self.horizon_days
    }
}
