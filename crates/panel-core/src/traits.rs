use async_trait::async_trait;
use ndarray::Array2;

use crate::{DateRange, PipelineError, PricePanel, WindowedFeatureTensor};

/// Supplies close prices for a set of tickers.
///
/// Implementations should return forward-fillable data: NaN only where a
/// ticker truly has no observation.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn get_panel(&self, tickers: &[String], range: DateRange) -> Result<PricePanel, PipelineError>;
}

/// Scores windows of relative changes.
///
/// Returns one row per window with one score per ticker column.
#[async_trait]
pub trait ScoreModel: Send + Sync {
    fn name(&self) -> &str;

    async fn score(&self, features: &WindowedFeatureTensor) -> Result<Array2<f64>, PipelineError>;
}

#[async_trait]
impl<T: ScoreModel + ?Sized> ScoreModel for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn score(&self, features: &WindowedFeatureTensor) -> Result<Array2<f64>, PipelineError> {
        (**self).score(features).await
    }
}
