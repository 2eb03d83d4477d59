use ndarray::{Array2, ArrayView1, Axis};
use panel_core::{NormalizedPanel, PipelineError, PipelineResult, PricePanel};
use rayon::prelude::*;

/// Largest daily move accepted as a real trade (combined exchange price-limit band)
pub const DEFAULT_CLIP_THRESHOLD: f64 = 0.1;

/// Converts close prices into outlier-capped cumulative-return indices.
///
/// Daily relative changes larger than the threshold are read as splits or
/// dividend adjustments, not trading, and contribute zero change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceNormalizer {
    threshold: f64,
}

impl Default for PriceNormalizer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CLIP_THRESHOLD,
        }
    }
}

impl PriceNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(threshold: f64) -> PipelineResult<Self> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "clip threshold must be finite and positive, got {}",
                threshold
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Clip-then-cumulate every ticker column. The first row is always 1.0.
    ///
    /// The panel is expected to be forward-filled already; an undefined change
    /// (first row, NaN neighbour, zero previous price) counts as no change.
    pub fn normalize(&self, panel: &PricePanel) -> PipelineResult<NormalizedPanel> {
        let values = panel.values();
        let (n_rows, n_cols) = values.dim();

        let columns: Vec<Vec<f64>> = (0..n_cols)
            .into_par_iter()
            .map(|col| self.cumulate(values.index_axis(Axis(1), col)))
            .collect();

        let index = Array2::from_shape_fn((n_rows, n_cols), |(row, col)| columns[col][row]);

        tracing::debug!(rows = n_rows, tickers = n_cols, threshold = self.threshold, "normalized panel");

        Ok(NormalizedPanel::from_index_panel(panel.with_values(index)?))
    }

    /// Day-over-day change after the clip policy; index 0 is always 0.0
    pub fn adjusted_changes(&self, prices: ArrayView1<'_, f64>) -> Vec<f64> {
        let mut out = Vec::with_capacity(prices.len());
        let mut prev = f64::NAN;
        for &price in prices.iter() {
            let delta = (price - prev) / prev;
            out.push(if delta.abs() <= self.threshold { delta } else { 0.0 });
            prev = price;
        }
        out
    }

    fn cumulate(&self, prices: ArrayView1<'_, f64>) -> Vec<f64> {
        let mut level = 1.0;
        self.adjusted_changes(prices)
            .into_iter()
            .map(|delta| {
                level *= 1.0 + delta;
                level
            })
            .collect()
    }
}
