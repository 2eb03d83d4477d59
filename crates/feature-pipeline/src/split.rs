//! Chronological train / validation / test partitioning.
//!
//! Each part is windowed on its own, so no window or label ever reads prices
//! from a neighbouring part.

use chrono::NaiveDate;
use panel_core::{LabeledWindows, PipelineError, PipelineResult, PricePanel};
use serde::Serialize;

use crate::config::FeatureConfig;
use crate::windows::WindowExtractor;

/// Train is `date <= train_end`, valid is `train_end < date < test_start`,
/// test is `date >= test_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetSplit {
    train_end: NaiveDate,
    test_start: NaiveDate,
}

impl DatasetSplit {
    pub fn new(train_end: NaiveDate, test_start: NaiveDate) -> PipelineResult<Self> {
        if train_end >= test_start {
            return Err(PipelineError::InvalidConfig(format!(
                "train_end {} must precede test_start {}",
                train_end, test_start
            )));
        }
        Ok(Self {
            train_end,
            test_start,
        })
    }

    pub fn train_end(&self) -> NaiveDate {
        self.train_end
    }

    pub fn test_start(&self) -> NaiveDate {
        self.test_start
    }

    /// `(train, valid, test)` row subsets of the panel
    pub fn split_panel(&self, panel: &PricePanel) -> (PricePanel, PricePanel, PricePanel) {
        let train = panel.between(NaiveDate::MIN, self.train_end);
        let valid = match (self.train_end.succ_opt(), self.test_start.pred_opt()) {
            (Some(first), Some(last)) => panel.between(first, last),
            _ => panel.between(self.test_start, self.train_end),
        };
        let test = panel.between(self.test_start, NaiveDate::MAX);
        (train, valid, test)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitDatasets {
    pub train: LabeledWindows,
    pub valid: LabeledWindows,
    pub test: LabeledWindows,
}

/// Window and label each part of the panel independently
pub fn build_datasets(
    panel: &PricePanel,
    split: &DatasetSplit,
    config: FeatureConfig,
) -> PipelineResult<SplitDatasets> {
    let extractor = WindowExtractor::new(config);
    let (train, valid, test) = split.split_panel(panel);

    let datasets = SplitDatasets {
        train: extractor.extract_features_and_labels(&train)?,
        valid: extractor.extract_features_and_labels(&valid)?,
        test: extractor.extract_features_and_labels(&test)?,
    };

    tracing::info!(
        train = datasets.train.len(),
        valid = datasets.valid.len(),
        test = datasets.test.len(),
        "built datasets"
    );

    Ok(datasets)
}
