use feature_pipeline::{DEFAULT_CLIP_THRESHOLD, DEFAULT_INFERENCE_WINDOW};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{PredictError, PredictResult};

/// Runtime settings for a prediction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Tickers to rank, in column order
    pub watch_list: Vec<String>,
    pub window_length: usize,
    pub clip_threshold: f64,
    /// Full calendar years of history before the current one
    pub lookback_years: i32,
    /// Root of the `<TICKER>/<YEAR>/*.csv` price store
    pub data_dir: PathBuf,
    /// JSON weights for the linear window model; momentum baseline when unset
    pub model_path: Option<PathBuf>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            watch_list: Vec::new(),
            window_length: DEFAULT_INFERENCE_WINDOW,
            clip_threshold: DEFAULT_CLIP_THRESHOLD,
            lookback_years: 1,
            data_dir: PathBuf::from("./data"),
            model_path: None,
        }
    }
}

impl PredictorConfig {
    /// Read `SMART_INVEST_DATA_DIR`, `WATCH_LIST` (comma separated),
    /// `WINDOW_LENGTH`, `CLIP_THRESHOLD`, `LOOKBACK_YEARS` and `MODEL_PATH`.
    pub fn from_env() -> PredictResult<Self> {
        let defaults = Self::default();

        Ok(Self {
            watch_list: env::var("WATCH_LIST")
                .map(|v| parse_watch_list(&v))
                .unwrap_or_default(),
            window_length: parse_var("WINDOW_LENGTH", defaults.window_length)?,
            clip_threshold: parse_var("CLIP_THRESHOLD", defaults.clip_threshold)?,
            lookback_years: parse_var("LOOKBACK_YEARS", defaults.lookback_years)?,
            data_dir: env::var("SMART_INVEST_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            model_path: env::var("MODEL_PATH").ok().map(PathBuf::from),
        })
    }

    pub fn validate(&self) -> PredictResult<()> {
        if self.watch_list.is_empty() {
            return Err(PredictError::Config("watch list is empty".into()));
        }
        if self.window_length == 0 {
            return Err(PredictError::Config("window_length must be positive".into()));
        }
        if self.lookback_years < 0 {
            return Err(PredictError::Config("lookback_years must not be negative".into()));
        }
        Ok(())
    }
}

/// Split `"VCB, fpt,,HPG"` into upper-case symbols
pub fn parse_watch_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_var<T: FromStr>(key: &str, default: T) -> PredictResult<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| PredictError::Config(format!("{}={:?}: {}", key, raw, e))),
        Err(_) => Ok(default),
    }
}
