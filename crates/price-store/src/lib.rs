//! Close prices from a folder tree of downloaded CSV files.
//!
//! Layout: `<root>/<TICKER>/<YEAR>/<download>.csv`. Download files are named
//! by timestamp, so the lexicographically last file in a year folder is the
//! newest one.

pub mod error;

pub use error::{StoreError, StoreResult};

use async_trait::async_trait;
use chrono::NaiveDate;
use panel_core::{DataSource, DateRange, PipelineError, PricePanel};
use std::fs;
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct CsvPriceStore {
    root: PathBuf,
}

impl CsvPriceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ticker folders under the root, sorted. A missing root has no tickers.
    pub fn available_tickers(&self) -> StoreResult<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        subdirectories(&self.root)
    }

    /// First and last date on disk.
    ///
    /// Only the first ticker is scanned; every ticker is downloaded over the
    /// same years.
    pub fn date_range(&self) -> StoreResult<Option<DateRange>> {
        let Some(ticker) = self.available_tickers()?.into_iter().next() else {
            return Ok(None);
        };

        let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
        for year in subdirectories(&self.root.join(&ticker))? {
            let Some(path) = newest_csv(&self.root.join(&ticker).join(&year))? else {
                continue;
            };
            for (date, _) in read_close_series(&path)? {
                bounds = Some(match bounds {
                    None => (date, date),
                    Some((lo, hi)) => (lo.min(date), hi.max(date)),
                });
            }
        }

        tracing::debug!("Scanned {} for date range: {:?}", ticker, bounds);
        Ok(bounds.map(|(start, end)| DateRange { start, end }))
    }

    /// `(date, close)` rows of one ticker inside `range`, across year folders.
    ///
    /// A ticker without a folder gives an empty series.
    pub fn load_ticker(&self, ticker: &str, range: DateRange) -> StoreResult<Vec<(NaiveDate, f64)>> {
        let ticker_dir = self.root.join(ticker);
        if !ticker_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut series = Vec::new();
        for year in range.years() {
            let Some(path) = newest_csv(&ticker_dir.join(year.to_string()))? else {
                continue;
            };
            series.extend(
                read_close_series(&path)?
                    .into_iter()
                    .filter(|(date, _)| range.contains(*date)),
            );
        }
        Ok(series)
    }

    /// Blocking panel load; `get_panel` runs this on the blocking pool.
    pub fn load_panel(&self, tickers: &[String], range: DateRange) -> Result<PricePanel, PipelineError> {
        let mut series = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            let points = self.load_ticker(ticker, range)?;
            if points.is_empty() {
                tracing::warn!("No prices for {} between {} and {}", ticker, range.start, range.end);
            }
            series.push((ticker.clone(), points));
        }

        let panel = PricePanel::from_series(series)?;
        tracing::info!(
            "Loaded {} rows x {} tickers from {}",
            panel.n_dates(),
            panel.ticker_count(),
            self.root.display()
        );
        Ok(panel)
    }
}

#[async_trait]
impl DataSource for CsvPriceStore {
    async fn get_panel(&self, tickers: &[String], range: DateRange) -> Result<PricePanel, PipelineError> {
        let store = self.clone();
        let tickers = tickers.to_vec();

        tokio::task::spawn_blocking(move || store.load_panel(&tickers, range))
            .await
            .map_err(|e| PipelineError::DataSource(format!("price loader task failed: {}", e)))?
    }
}

fn subdirectories(dir: &Path) -> StoreResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

fn newest_csv(year_dir: &Path) -> StoreResult<Option<PathBuf>> {
    if !year_dir.is_dir() {
        return Ok(None);
    }

    let mut newest: Option<PathBuf> = None;
    for entry in fs::read_dir(year_dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && newest.as_ref().map_or(true, |best| path.file_name() > best.file_name()) {
            newest = Some(path);
        }
    }
    Ok(newest)
}

/// Date from the first column, close from the `close` column.
///
/// Empty close cells read as NaN.
fn read_close_series(path: &Path) -> StoreResult<Vec<(NaiveDate, f64)>> {
    let csv_err = |source| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let close_col = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("close"))
        .ok_or_else(|| StoreError::MissingClose {
            path: path.to_path_buf(),
        })?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let line = record.position().map_or(0, |p| p.line());
        let bad = |reason: String| StoreError::BadRecord {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let raw_date = record.get(0).unwrap_or("").trim();
        let date = raw_date
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok())
            .ok_or_else(|| bad(format!("bad date {:?}", raw_date)))?;

        let raw_close = record.get(close_col).unwrap_or("").trim();
        let close = if raw_close.is_empty() {
            f64::NAN
        } else {
            raw_close
                .parse::<f64>()
                .map_err(|e| bad(format!("bad close {:?}: {}", raw_close, e)))?
        };

        rows.push((date, close));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn write_csv(root: &Path, ticker: &str, year: i32, file: &str, body: &str) {
        let dir = root.join(ticker).join(year.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(file), body).unwrap();
    }

    fn store() -> (TempDir, CsvPriceStore) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();

        write_csv(
            root,
            "VCB",
            2023,
            "20231231.csv",
            "time,open,high,low,close,volume\n\
             2023-12-28,90,91,89,90.5,1000\n\
             2023-12-29,90.5,92,90,91.0,1200\n",
        );
        // stale download, must be ignored
        write_csv(root, "VCB", 2024, "20240101.csv", "time,close\n2024-01-02,1.0\n");
        write_csv(
            root,
            "VCB",
            2024,
            "20240105.csv",
            "time,Close\n2024-01-02 00:00:00,92.0\n2024-01-03,\n2024-01-04,93.5\n",
        );
        write_csv(
            root,
            "FPT",
            2024,
            "20240105.csv",
            "time,close\n2024-01-02,100\n2024-01-04,101\n",
        );
        let store = CsvPriceStore::new(root);
        (tmp, store)
    }

    #[test]
    fn test_available_tickers_sorted() {
        let (_tmp, store) = store();
        assert_eq!(store.available_tickers().unwrap(), vec!["FPT", "VCB"]);
        assert!(CsvPriceStore::new("/definitely/not/here")
            .available_tickers()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_date_range_scans_first_ticker() {
        let (_tmp, store) = store();
        let range = store.date_range().unwrap().unwrap();
        assert_eq!(range.start, d(2024, 1, 2));
        assert_eq!(range.end, d(2024, 1, 4));
    }

    #[test]
    fn test_load_ticker_reads_newest_file_across_years() {
        let (_tmp, store) = store();
        let range = DateRange::new(d(2023, 12, 29), d(2024, 1, 31)).unwrap();
        let series = store.load_ticker("VCB", range).unwrap();

        let dates: Vec<NaiveDate> = series.iter().map(|(date, _)| *date).collect();
        assert_eq!(dates, vec![d(2023, 12, 29), d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4)]);
        assert_eq!(series[1].1, 92.0);
        assert!(series[2].1.is_nan());
    }

    #[test]
    fn test_load_panel_outer_joins_and_keeps_missing_ticker() {
        let (_tmp, store) = store();
        let range = DateRange::new(d(2024, 1, 1), d(2024, 12, 31)).unwrap();
        let tickers = vec!["FPT".to_string(), "VCB".to_string(), "HPG".to_string()];

        let panel = store.load_panel(&tickers, range).unwrap();
        assert_eq!(panel.tickers(), tickers.as_slice());
        assert_eq!(panel.n_dates(), 3);

        let fpt = panel.column("FPT").unwrap();
        assert_eq!(fpt[0], 100.0);
        assert!(fpt[1].is_nan());
        assert!(panel.column("HPG").unwrap().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_bad_close_is_data_source_error() {
        let tmp = TempDir::new().unwrap();
        write_csv(tmp.path(), "BAD", 2024, "a.csv", "time,close\n2024-01-02,abc\n");
        let store = CsvPriceStore::new(tmp.path());
        let range = DateRange::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();

        let err = store.load_panel(&["BAD".to_string()], range).unwrap_err();
        assert!(matches!(err, PipelineError::DataSource(msg) if msg.contains("bad close")));
    }

    #[test]
    fn test_missing_close_header() {
        let tmp = TempDir::new().unwrap();
        write_csv(tmp.path(), "X", 2024, "a.csv", "time,open\n2024-01-02,1\n");
        let store = CsvPriceStore::new(tmp.path());
        let range = DateRange::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();

        assert!(matches!(
            store.load_ticker("X", range),
            Err(StoreError::MissingClose { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_panel_runs_on_blocking_pool() {
        let (_tmp, store) = store();
        let range = DateRange::new(d(2024, 1, 3), d(2024, 1, 4)).unwrap();

        let panel = store.get_panel(&["VCB".to_string()], range).await.unwrap();
        assert_eq!(panel.dates(), &[d(2024, 1, 3), d(2024, 1, 4)]);
        assert_eq!(panel.column("VCB").unwrap()[1], 93.5);
    }
}
