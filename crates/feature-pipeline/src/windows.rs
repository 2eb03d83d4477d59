use ndarray::{s, Array2, Array3, ArrayView2, Axis};
use panel_core::{
    LabelVector, LabeledWindows, PipelineError, PipelineResult, PricePanel, WindowedFeatureTensor,
};

use crate::config::FeatureConfig;

/// Day-over-day relative change of every ticker, `(p[t] - p[t-1]) / p[t-1]`.
///
/// Row 0 is NaN. Keeps a running count of NaN-bearing rows so any row range
/// can be tested for NaN in constant time.
#[derive(Debug, Clone, PartialEq)]
pub struct RelativeChanges {
    values: Array2<f64>,
    nan_rows_before: Vec<usize>,
}

impl RelativeChanges {
    pub fn from_panel(panel: &PricePanel) -> Self {
        let prices = panel.values();
        let (n_rows, n_cols) = prices.dim();

        let mut values = Array2::from_elem((n_rows, n_cols), f64::NAN);
        if n_rows > 1 {
            let prev = prices.slice(s![..-1, ..]);
            let curr = prices.slice(s![1.., ..]);
            values
                .slice_mut(s![1.., ..])
                .assign(&((&curr - &prev) / &prev));
        }

        Self::from_values(values)
    }

    /// Wrap an already-differenced matrix (rows are dates, columns tickers)
    pub fn from_values(values: Array2<f64>) -> Self {
        let mut nan_rows_before = Vec::with_capacity(values.nrows() + 1);
        nan_rows_before.push(0);
        let mut count = 0;
        for row in values.outer_iter() {
            if row.iter().any(|v| v.is_nan()) {
                count += 1;
            }
            nan_rows_before.push(count);
        }

        Self {
            values,
            nan_rows_before,
        }
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ticker_count(&self) -> usize {
        self.values.ncols()
    }

    /// True if any cell in rows `start..end` is NaN
    pub fn has_nan_in(&self, start: usize, end: usize) -> bool {
        self.nan_rows_before[end] > self.nan_rows_before[start]
    }
}

/// A view into `RelativeChanges` rows `start..start + window_length`
#[derive(Debug, Clone)]
pub struct Window<'a> {
    pub start: usize,
    pub values: ArrayView2<'a, f64>,
}

/// Lazy sliding windows over relative changes.
///
/// Skips the window starting at row 0 (no prior price) and every window with
/// a NaN. Cloning restarts from the clone point; nothing is copied per window.
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    changes: &'a RelativeChanges,
    window_length: usize,
    step: usize,
    next_start: usize,
}

impl<'a> Iterator for Windows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Window<'a>> {
        loop {
            let start = self.next_start;
            let end = start + self.window_length;
            if end > self.changes.n_rows() {
                return None;
            }
            self.next_start += self.step;

            if self.changes.has_nan_in(start, end) {
                continue;
            }
            return Some(Window {
                start,
                values: self.changes.values.slice(s![start..end, ..]),
            });
        }
    }
}

/// Builds model input windows (and training labels) from a price panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowExtractor {
    config: FeatureConfig,
}

impl WindowExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn relative_changes(&self, panel: &PricePanel) -> PipelineResult<RelativeChanges> {
        self.check_tickers(panel)?;
        Ok(RelativeChanges::from_panel(panel))
    }

    pub fn windows<'a>(&self, changes: &'a RelativeChanges) -> Windows<'a> {
        Windows {
            changes,
            window_length: self.config.window_length(),
            step: self.config.step(),
            next_start: self.config.step(),
        }
    }

    /// NaN-free feature windows in chronological order.
    ///
    /// Too little history or all-NaN data gives an empty tensor, not an error.
    pub fn extract_features(&self, panel: &PricePanel) -> PipelineResult<WindowedFeatureTensor> {
        let changes = self.relative_changes(panel)?;
        let windows: Vec<Window<'_>> = self.windows(&changes).collect();

        tracing::debug!(
            rows = changes.n_rows(),
            windows = windows.len(),
            window_length = self.config.window_length(),
            "extracted feature windows"
        );

        self.stack(&windows)
    }

    /// Feature windows paired with forward returns over `horizon_days`.
    ///
    /// The label of a window ending at row `e` is `(p[e + h] - p[e]) / p[e]`.
    /// Windows without `h` rows of future data are dropped, then any pair with
    /// a NaN in either the window or the label row.
    pub fn extract_features_and_labels(&self, panel: &PricePanel) -> PipelineResult<LabeledWindows> {
        let horizon = self.config.horizon_days();
        if horizon == 0 {
            return Err(PipelineError::InvalidConfig(
                "horizon_days must be positive to build labels".into(),
            ));
        }

        let changes = self.relative_changes(panel)?;
        let targets = forward_returns(panel, horizon);
        let n_rows = changes.n_rows();
        let window_length = self.config.window_length();

        let mut windows = Vec::new();
        let mut label_rows = Vec::new();
        for window in self.windows(&changes) {
            let end = window.start + window_length - 1;
            if end + horizon >= n_rows {
                break;
            }
            let label = targets.row(end);
            if label.iter().any(|v| v.is_nan()) {
                continue;
            }
            windows.push(window);
            label_rows.push(end);
        }

        tracing::debug!(
            rows = n_rows,
            pairs = windows.len(),
            horizon,
            "extracted labelled windows"
        );

        let features = self.stack(&windows)?;
        let labels = LabelVector::new(targets.select(Axis(0), &label_rows));
        LabeledWindows::new(features, labels)
    }

    fn check_tickers(&self, panel: &PricePanel) -> PipelineResult<()> {
        if panel.ticker_count() != self.config.ticker_count() {
            return Err(PipelineError::shape(
                "panel ticker count",
                self.config.ticker_count(),
                panel.ticker_count(),
            ));
        }
        Ok(())
    }

    fn stack(&self, windows: &[Window<'_>]) -> PipelineResult<WindowedFeatureTensor> {
        let mut values = Array3::zeros((
            windows.len(),
            self.config.window_length(),
            self.config.ticker_count(),
        ));
        for (mut slot, window) in values.outer_iter_mut().zip(windows) {
            slot.assign(&window.values);
        }
        WindowedFeatureTensor::new(values, windows.iter().map(|w| w.start).collect())
    }
}

/// `(p[t + h] - p[t]) / p[t]` per ticker; the last `h` rows are NaN
pub fn forward_returns(panel: &PricePanel, horizon: usize) -> Array2<f64> {
    let prices = panel.values();
    let (n_rows, n_cols) = prices.dim();
    let mut out = Array2::from_elem((n_rows, n_cols), f64::NAN);

    if horizon < n_rows {
        let now = prices.slice(s![..n_rows - horizon, ..]);
        let later = prices.slice(s![horizon.., ..]);
        out.slice_mut(s![..n_rows - horizon, ..])
            .assign(&((&later - &now) / &now));
    }
    out
}
