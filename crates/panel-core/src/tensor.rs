use ndarray::{Array2, Array3, ArrayView1, ArrayView2, Axis};

use crate::{PipelineError, PipelineResult};

/// Stack of `(window_length x ticker_count)` windows of relative changes.
///
/// Windows are kept in chronological order of their start row in the source
/// panel. None of them contains a NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedFeatureTensor {
    values: Array3<f64>,
    starts: Vec<usize>,
}

impl WindowedFeatureTensor {
    pub fn new(values: Array3<f64>, starts: Vec<usize>) -> PipelineResult<Self> {
        if values.len_of(Axis(0)) != starts.len() {
            return Err(PipelineError::shape(
                "window start index",
                values.len_of(Axis(0)),
                starts.len(),
            ));
        }
        Ok(Self { values, starts })
    }

    pub fn empty(window_length: usize, ticker_count: usize) -> Self {
        Self {
            values: Array3::zeros((0, window_length, ticker_count)),
            starts: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn window_length(&self) -> usize {
        self.values.len_of(Axis(1))
    }

    pub fn ticker_count(&self) -> usize {
        self.values.len_of(Axis(2))
    }

    /// `(n_windows, window_length, ticker_count)`
    pub fn values(&self) -> &Array3<f64> {
        &self.values
    }

    /// Start row of each window in the source panel
    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    pub fn window(&self, idx: usize) -> Option<ArrayView2<'_, f64>> {
        (idx < self.len()).then(|| self.values.index_axis(Axis(0), idx))
    }

    pub fn last(&self) -> Option<ArrayView2<'_, f64>> {
        self.len().checked_sub(1).and_then(|idx| self.window(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = ArrayView2<'_, f64>> {
        self.values.outer_iter()
    }
}

/// Forward returns per ticker, one row per feature window
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVector {
    values: Array2<f64>,
}

impl LabelVector {
    pub fn new(values: Array2<f64>) -> Self {
        Self { values }
    }

    pub fn empty(ticker_count: usize) -> Self {
        Self {
            values: Array2::zeros((0, ticker_count)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn row(&self, idx: usize) -> Option<ArrayView1<'_, f64>> {
        (idx < self.len()).then(|| self.values.index_axis(Axis(0), idx))
    }
}

/// Feature windows paired index-for-index with their labels
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledWindows {
    pub features: WindowedFeatureTensor,
    pub labels: LabelVector,
}

impl LabeledWindows {
    pub fn new(features: WindowedFeatureTensor, labels: LabelVector) -> PipelineResult<Self> {
        if features.len() != labels.len() {
            return Err(PipelineError::shape("label rows", features.len(), labels.len()));
        }
        if labels.values().ncols() != features.ticker_count() {
            return Err(PipelineError::shape(
                "label columns",
                features.ticker_count(),
                labels.values().ncols(),
            ));
        }
        Ok(Self { features, labels })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
