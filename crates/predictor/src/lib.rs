//! End-to-end ranking: price panel -> normalized indices -> feature windows
//! -> model scores -> ranked tickers.

pub mod config;
pub mod error;
pub mod models;

pub use config::{parse_watch_list, PredictorConfig};
pub use error::{PredictError, PredictResult};
pub use models::{LinearWindowModel, MomentumModel};

use chrono::{Datelike, NaiveDate};
use feature_pipeline::{FeatureConfig, PriceNormalizer, WindowExtractor};
use panel_core::{
    DataSource, DateRange, NormalizedPanel, PipelineError, PricePanel, ScoreModel,
    WindowedFeatureTensor,
};
use prediction_ranker::{RankedPrediction, RankingAssembler};

/// Ranks the configured watch list with a score model.
///
/// Holds no state between calls; every prediction pulls a fresh panel.
pub struct Predictor<D, M> {
    source: D,
    model: M,
    config: PredictorConfig,
    normalizer: PriceNormalizer,
    assembler: RankingAssembler,
}

impl<D: DataSource, M: ScoreModel> Predictor<D, M> {
    pub fn new(source: D, model: M, config: PredictorConfig) -> PredictResult<Self> {
        config.validate()?;
        let normalizer = PriceNormalizer::with_threshold(config.clip_threshold)?;

        tracing::info!(
            "Predictor ready: model={}, {} tickers, window={}, lookback={}y",
            model.name(),
            config.watch_list.len(),
            config.window_length,
            config.lookback_years
        );

        Ok(Self {
            source,
            model,
            config,
            normalizer,
            assembler: RankingAssembler::new(),
        })
    }

    /// Jan 1 of `lookback_years` before `as_of`'s year, through `as_of`
    pub fn lookback_range(&self, as_of: NaiveDate) -> PredictResult<DateRange> {
        let year = as_of.year() - self.config.lookback_years;
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| PredictError::Config(format!("no January 1st in year {}", year)))?;
        Ok(DateRange::new(start, as_of)?)
    }

    /// Forward-filled, normalized watch-list panel as of a date
    pub async fn normalized_panel(&self, as_of: NaiveDate) -> PredictResult<NormalizedPanel> {
        let panel = self.fetch(as_of).await?;
        Ok(self.normalizer.normalize(&panel.forward_fill())?)
    }

    /// Forward-fill, normalize, and window a raw panel
    pub fn preprocess(&self, panel: &PricePanel) -> PredictResult<WindowedFeatureTensor> {
        let normalized = self.normalizer.normalize(&panel.forward_fill())?;
        let feature_config = FeatureConfig::inference(self.config.window_length, panel.ticker_count())?;
        Ok(WindowExtractor::new(feature_config).extract_features(&normalized)?)
    }

    /// Rank the watch list by the model's scores for the most recent window
    pub async fn predict(&self, as_of: NaiveDate) -> PredictResult<RankedPrediction> {
        let panel = self.fetch(as_of).await?;
        let features = self.preprocess(&panel)?;
        tracing::info!("Feature tensor: {} windows", features.len());

        if features.is_empty() {
            return Err(PredictError::NoValidWindows {
                rows: panel.n_dates(),
                window_length: self.config.window_length,
            });
        }

        let scores = self.model.score(&features).await?;
        if scores.nrows() != features.len() {
            return Err(PipelineError::shape("model output rows", features.len(), scores.nrows()).into());
        }
        if scores.ncols() != panel.ticker_count() {
            return Err(
                PipelineError::shape("model output columns", panel.ticker_count(), scores.ncols()).into(),
            );
        }

        let latest = scores.row(scores.nrows() - 1).to_vec();
        let ranked = self.assembler.assemble(panel.tickers(), &latest)?;

        if let Some(best) = ranked.top(1).first() {
            tracing::info!("Top pick as of {}: {} ({:.4})", as_of, best.ticker, best.score);
        }
        Ok(ranked)
    }

    async fn fetch(&self, as_of: NaiveDate) -> PredictResult<PricePanel> {
        let range = self.lookback_range(as_of)?;
        let panel = self.source.get_panel(&self.config.watch_list, range).await?;
        tracing::info!(
            "Loaded panel {} -> {}: {} rows x {} tickers",
            range.start,
            range.end,
            panel.n_dates(),
            panel.ticker_count()
        );
        Ok(panel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ndarray::Array2;

    /// Serves slices of a fixed panel
    struct InMemorySource {
        panel: PricePanel,
    }

    #[async_trait]
    impl DataSource for InMemorySource {
        async fn get_panel(&self, tickers: &[String], range: DateRange) -> Result<PricePanel, PipelineError> {
            self.panel.between(range.start, range.end).select(tickers)
        }
    }

    /// Returns a fixed-shape matrix regardless of input
    struct FixedShapeModel(usize, usize);

    #[async_trait]
    impl ScoreModel for FixedShapeModel {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn score(&self, _features: &WindowedFeatureTensor) -> Result<Array2<f64>, PipelineError> {
            Ok(Array2::zeros((self.0, self.1)))
        }
    }

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    // UP gains 0.5%/day, DOWN loses 0.5%/day, FLAT never moves
    fn trend_panel(days: usize) -> PricePanel {
        let values = Array2::from_shape_fn((days, 3), |(t, k)| match k {
            0 => 100.0 * 1.005_f64.powi(t as i32),
            1 => 50.0,
            _ => 80.0 * 0.995_f64.powi(t as i32),
        });
        PricePanel::new(
            (0..days as i64).map(day).collect(),
            vec!["UP".into(), "FLAT".into(), "DOWN".into()],
            values,
        )
        .unwrap()
    }

    fn config(watch_list: &[&str]) -> PredictorConfig {
        PredictorConfig {
            watch_list: watch_list.iter().map(|s| s.to_string()).collect(),
            ..PredictorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_predict_ranks_by_momentum() {
        let source = InMemorySource { panel: trend_panel(120) };
        let predictor = Predictor::new(source, MomentumModel::new(), config(&["DOWN", "FLAT", "UP"])).unwrap();

        let ranked = predictor.predict(day(119)).await.unwrap();
        let order: Vec<&str> = ranked.iter().map(|e| e.ticker.as_str()).collect();
        assert_eq!(order, vec!["UP", "FLAT", "DOWN"]);
        assert!(ranked.get("UP").unwrap().score > 0.0);
        assert_eq!(ranked.get("FLAT").unwrap().score, 0.0);
    }

    #[tokio::test]
    async fn test_predict_uses_only_history_up_to_as_of() {
        // DOWN turns into the strongest riser after day 80
        let (dates, tickers, mut values) = trend_panel(160).into_parts();
        for t in 80..160 {
            values[[t, 2]] = values[[79, 2]] * 1.02_f64.powi((t - 79) as i32);
        }
        let panel = PricePanel::new(dates, tickers, values).unwrap();

        let predictor = Predictor::new(
            InMemorySource { panel },
            MomentumModel::new(),
            config(&["UP", "FLAT", "DOWN"]),
        )
        .unwrap();

        let before = predictor.predict(day(79)).await.unwrap();
        assert_eq!(before.entries()[0].ticker, "UP");

        let after = predictor.predict(day(159)).await.unwrap();
        assert_eq!(after.entries()[0].ticker, "DOWN");
    }

    #[tokio::test]
    async fn test_short_history_has_no_windows() {
        let predictor = Predictor::new(
            InMemorySource { panel: trend_panel(40) },
            MomentumModel::new(),
            config(&["UP", "FLAT"]),
        )
        .unwrap();

        let err = predictor.predict(day(39)).await.unwrap_err();
        assert!(matches!(err, PredictError::NoValidWindows { rows: 40, window_length: 60 }));
    }

    #[tokio::test]
    async fn test_model_shape_is_checked() {
        let predictor = Predictor::new(
            InMemorySource { panel: trend_panel(100) },
            Box::new(FixedShapeModel(40, 2)) as Box<dyn ScoreModel>,
            config(&["UP", "FLAT", "DOWN"]),
        )
        .unwrap();

        let err = predictor.predict(day(99)).await.unwrap_err();
        assert!(matches!(
            err,
            PredictError::Pipeline(PipelineError::ShapeMismatch { expected: 3, actual: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_ticker_surfaces_source_error() {
        let predictor = Predictor::new(
            InMemorySource { panel: trend_panel(100) },
            MomentumModel::new(),
            config(&["UP", "MISSING"]),
        )
        .unwrap();

        let err = predictor.predict(day(99)).await.unwrap_err();
        assert!(matches!(err, PredictError::Pipeline(PipelineError::InvalidPanel(_))));
    }

    #[tokio::test]
    async fn test_normalized_panel_starts_at_one() {
        let predictor = Predictor::new(
            InMemorySource { panel: trend_panel(30) },
            MomentumModel::new(),
            config(&["FLAT", "UP"]),
        )
        .unwrap();

        let normalized = predictor.normalized_panel(day(29)).await.unwrap();
        assert_eq!(normalized.tickers(), &["FLAT".to_string(), "UP".to_string()]);
        assert_eq!(normalized.values()[[0, 1]], 1.0);
        assert!(normalized.column("FLAT").unwrap().iter().all(|v| *v == 1.0));
        assert!(normalized.column("UP").unwrap()[29] > 1.1);
    }

    #[test]
    fn test_lookback_range() {
        let mut cfg = config(&["UP"]);
        cfg.lookback_years = 2;
        let predictor = Predictor::new(InMemorySource { panel: trend_panel(5) }, MomentumModel::new(), cfg).unwrap();

        let range = predictor.lookback_range(day(200)).unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(range.end, day(200));
    }

    #[test]
    fn test_preprocess_fills_gaps_before_windowing() {
        let mut values = trend_panel(70).into_parts().2;
        values[[30, 0]] = f64::NAN;
        values[[0, 1]] = f64::NAN;
        let panel = PricePanel::new(
            (0..70).map(day).collect(),
            vec!["UP".into(), "FLAT".into(), "DOWN".into()],
            values,
        )
        .unwrap();

        let predictor = Predictor::new(
            InMemorySource { panel: panel.clone() },
            MomentumModel::new(),
            config(&["UP"]),
        )
        .unwrap();

        let features = predictor.preprocess(&panel).unwrap();
        assert_eq!(features.len(), 70 - 60);
        assert!(features.values().iter().all(|v| v.is_finite()));
    }
}
