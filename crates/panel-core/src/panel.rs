use chrono::{Datelike, NaiveDate};
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::{Deref, RangeInclusive};

use crate::{PipelineError, PipelineResult};

/// Inclusive date range requested from a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> PipelineResult<Self> {
        if start > end {
            return Err(PipelineError::InvalidConfig(format!(
                "date range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Calendar years touched by the range
    pub fn years(&self) -> RangeInclusive<i32> {
        self.start.year()..=self.end.year()
    }
}

/// Date x ticker table of close prices.
///
/// Rows are dates in strictly increasing order, columns are unique ticker
/// symbols. Missing observations are `f64::NAN`.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePanel {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    values: Array2<f64>,
}

impl PricePanel {
    pub fn new(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        values: Array2<f64>,
    ) -> PipelineResult<Self> {
        if values.nrows() != dates.len() || values.ncols() != tickers.len() {
            return Err(PipelineError::InvalidPanel(format!(
                "values are {}x{} but index is {} dates x {} tickers",
                values.nrows(),
                values.ncols(),
                dates.len(),
                tickers.len()
            )));
        }

        let mut seen = HashSet::with_capacity(tickers.len());
        for ticker in &tickers {
            if !seen.insert(ticker.as_str()) {
                return Err(PipelineError::InvalidPanel(format!(
                    "duplicate ticker column {}",
                    ticker
                )));
            }
        }

        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(PipelineError::InvalidPanel(format!(
                "dates must be strictly increasing ({} followed by {})",
                w[0], w[1]
            )));
        }

        Ok(Self {
            dates,
            tickers,
            values,
        })
    }

    /// Panel with the given columns and no rows
    pub fn empty(tickers: Vec<String>) -> PipelineResult<Self> {
        let n = tickers.len();
        Self::new(Vec::new(), tickers, Array2::zeros((0, n)))
    }

    /// Outer-join per-ticker `(date, close)` series on the union of their dates.
    ///
    /// Dates a ticker did not report are NaN. Series need not be sorted; when a
    /// series repeats a date the last observation wins.
    pub fn from_series(series: Vec<(String, Vec<(NaiveDate, f64)>)>) -> PipelineResult<Self> {
        let dates: Vec<NaiveDate> = series
            .iter()
            .flat_map(|(_, points)| points.iter().map(|(d, _)| *d))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let row_of: HashMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let mut values = Array2::from_elem((dates.len(), series.len()), f64::NAN);
        let mut tickers = Vec::with_capacity(series.len());

        for (col, (ticker, points)) in series.into_iter().enumerate() {
            for (date, close) in points {
                values[[row_of[&date], col]] = close;
            }
            tickers.push(ticker);
        }

        Self::new(dates, tickers, values)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_dates(&self) -> usize {
        self.dates.len()
    }

    pub fn ticker_count(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn ticker_index(&self, ticker: &str) -> Option<usize> {
        self.tickers.iter().position(|t| t == ticker)
    }

    pub fn column(&self, ticker: &str) -> Option<ArrayView1<'_, f64>> {
        self.ticker_index(ticker)
            .map(|idx| self.values.index_axis(Axis(1), idx))
    }

    pub fn row(&self, date: NaiveDate) -> Option<ArrayView1<'_, f64>> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|idx| self.values.index_axis(Axis(0), idx))
    }

    /// Carry the last observed price forward in every column.
    ///
    /// Non-trading days keep the previous close. Leading NaNs (before a
    /// ticker's first observation) stay NaN.
    pub fn forward_fill(&self) -> PricePanel {
        let mut values = self.values.clone();
        for mut column in values.columns_mut() {
            let mut last = f64::NAN;
            for v in column.iter_mut() {
                if v.is_nan() {
                    *v = last;
                } else {
                    last = *v;
                }
            }
        }

        PricePanel {
            dates: self.dates.clone(),
            tickers: self.tickers.clone(),
            values,
        }
    }

    /// Column subset in the requested order
    pub fn select(&self, tickers: &[String]) -> PipelineResult<PricePanel> {
        let indices = tickers
            .iter()
            .map(|t| {
                self.ticker_index(t).ok_or_else(|| {
                    PipelineError::InvalidPanel(format!("ticker {} not in panel", t))
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        PricePanel::new(
            self.dates.clone(),
            tickers.to_vec(),
            self.values.select(Axis(1), &indices),
        )
    }

    /// Rows with `start <= date <= end`
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> PricePanel {
        let lo = self.dates.partition_point(|d| *d < start);
        let hi = self.dates.partition_point(|d| *d <= end).max(lo);

        PricePanel {
            dates: self.dates[lo..hi].to_vec(),
            tickers: self.tickers.clone(),
            values: self.values.slice(ndarray::s![lo..hi, ..]).to_owned(),
        }
    }

    /// Same date and ticker index with new values of identical shape
    pub fn with_values(&self, values: Array2<f64>) -> PipelineResult<PricePanel> {
        if values.dim() != self.values.dim() {
            return Err(PipelineError::InvalidPanel(format!(
                "replacement values are {}x{} but panel is {}x{}",
                values.nrows(),
                values.ncols(),
                self.n_dates(),
                self.ticker_count()
            )));
        }
        Ok(PricePanel {
            dates: self.dates.clone(),
            tickers: self.tickers.clone(),
            values,
        })
    }

    pub fn into_parts(self) -> (Vec<NaiveDate>, Vec<String>, Array2<f64>) {
        (self.dates, self.tickers, self.values)
    }
}

/// Cumulative-return indices anchored at 1.0, one column per ticker.
///
/// Produced by the price normalizer; day-over-day changes are bounded by its
/// clip threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPanel(PricePanel);

impl NormalizedPanel {
    /// Wrap an already-normalized index panel. The caller guarantees the
    /// bounded-change invariant.
    pub fn from_index_panel(panel: PricePanel) -> Self {
        Self(panel)
    }
}

impl Deref for NormalizedPanel {
    type Target = PricePanel;

    fn deref(&self) -> &PricePanel {
        &self.0
    }
}
