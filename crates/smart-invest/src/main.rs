//! smart-invest: rank a watch list from local price CSVs, or cut labelled
//! training windows out of them.
//!
//! Usage:
//!   smart-invest predict --tickers VCB FPT HPG --top 5
//!   smart-invest predict --data ./data --as-of 2024-06-28 --model weights.json
//!   smart-invest dataset --tickers VCB FPT --from 2019-01-01 --to 2024-12-31 \
//!       --train-end 2022-12-31 --test-start 2024-01-01

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use feature_pipeline::{
    build_datasets, DatasetSplit, FeatureConfig, DEFAULT_HORIZON_DAYS, DEFAULT_TRAINING_WINDOW,
};
use panel_core::{DataSource, DateRange, ScoreModel};
use predictor::{parse_watch_list, LinearWindowModel, MomentumModel, Predictor, PredictorConfig};
use price_store::CsvPriceStore;
use serde_json::json;
use std::path::PathBuf;
use std::str::FromStr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smart_invest=info,predictor=info,price_store=warn".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let output = match args.get(1).map(String::as_str) {
        Some("predict") => run_predict(&args[2..]).await?,
        Some("dataset") => run_dataset(&args[2..]).await?,
        _ => {
            print_usage();
            std::process::exit(1);
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  smart-invest predict [--data DIR] [--as-of YYYY-MM-DD] [--model FILE] [--tickers T1 T2 ...] [--top N]");
    eprintln!("  smart-invest dataset [--data DIR] --tickers T1 T2 ... --from YYYY-MM-DD --to YYYY-MM-DD");
    eprintln!("                       --train-end YYYY-MM-DD --test-start YYYY-MM-DD [--window N] [--horizon N]");
    eprintln!();
    eprintln!("Environment (flags win):");
    eprintln!("  SMART_INVEST_DATA_DIR  price folder (default ./data)");
    eprintln!("  WATCH_LIST             comma separated tickers (default: every ticker folder)");
    eprintln!("  WINDOW_LENGTH, CLIP_THRESHOLD, LOOKBACK_YEARS, MODEL_PATH");
}

async fn run_predict(args: &[String]) -> anyhow::Result<serde_json::Value> {
    let mut config = PredictorConfig::from_env().context("invalid predictor environment")?;
    if let Some(dir) = flag_value(args, "--data") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(path) = flag_value(args, "--model") {
        config.model_path = Some(PathBuf::from(path));
    }
    let tickers = flag_list(args, "--tickers");
    if !tickers.is_empty() {
        config.watch_list = tickers;
    }

    let as_of = flag_parse::<NaiveDate>(args, "--as-of")?.unwrap_or_else(|| Utc::now().date_naive());
    let top = flag_parse::<usize>(args, "--top")?;

    predict_rankings(config, as_of, top).await
}

async fn predict_rankings(
    mut config: PredictorConfig,
    as_of: NaiveDate,
    top: Option<usize>,
) -> anyhow::Result<serde_json::Value> {
    let store = CsvPriceStore::new(&config.data_dir);
    if config.watch_list.is_empty() {
        config.watch_list = store
            .available_tickers()
            .with_context(|| format!("cannot list tickers in {}", config.data_dir.display()))?;
        tracing::info!(
            "No watch list set, using {} tickers found in {}",
            config.watch_list.len(),
            config.data_dir.display()
        );
    }

    let model: Box<dyn ScoreModel> = match &config.model_path {
        Some(path) => Box::new(
            LinearWindowModel::load(path)
                .with_context(|| format!("cannot load model weights from {}", path.display()))?,
        ),
        None => Box::new(MomentumModel::new()),
    };
    let model_name = model.name().to_string();

    let predictor = Predictor::new(store, model, config)?;
    let ranked = predictor
        .predict(as_of)
        .await
        .with_context(|| format!("prediction as of {} failed", as_of))?;

    let rankings = match top {
        Some(n) => ranked.top(n).to_vec(),
        None => ranked.into_entries(),
    };

    Ok(json!({
        "as_of": as_of,
        "model": model_name,
        "rankings": rankings,
    }))
}

async fn run_dataset(args: &[String]) -> anyhow::Result<serde_json::Value> {
    let config = PredictorConfig::from_env().context("invalid predictor environment")?;
    let data_dir = flag_value(args, "--data")
        .map(PathBuf::from)
        .unwrap_or(config.data_dir);

    let tickers = flag_list(args, "--tickers");
    if tickers.is_empty() {
        bail!("dataset needs --tickers");
    }
    let range = DateRange::new(required_date(args, "--from")?, required_date(args, "--to")?)?;
    let split = DatasetSplit::new(
        required_date(args, "--train-end")?,
        required_date(args, "--test-start")?,
    )?;
    let window = flag_parse(args, "--window")?.unwrap_or(DEFAULT_TRAINING_WINDOW);
    let horizon = flag_parse(args, "--horizon")?.unwrap_or(DEFAULT_HORIZON_DAYS);

    let store = CsvPriceStore::new(data_dir);
    dataset_summary(&store, &tickers, range, split, window, horizon).await
}

async fn dataset_summary(
    store: &CsvPriceStore,
    tickers: &[String],
    range: DateRange,
    split: DatasetSplit,
    window: usize,
    horizon: usize,
) -> anyhow::Result<serde_json::Value> {
    let panel = store
        .get_panel(tickers, range)
        .await
        .with_context(|| format!("cannot load prices from {}", store.root().display()))?;

    // Raw closes: a window or label touching a missing price is dropped
    let feature_config = FeatureConfig::new(window, panel.ticker_count(), 1, horizon)?;
    let datasets = build_datasets(&panel, &split, feature_config)?;

    tracing::info!(
        "Dataset {} -> {}: train={} valid={} test={}",
        range.start,
        range.end,
        datasets.train.len(),
        datasets.valid.len(),
        datasets.test.len()
    );

    Ok(json!({
        "tickers": tickers,
        "rows": panel.n_dates(),
        "window_length": window,
        "horizon_days": horizon,
        "split": split,
        "train": datasets.train.len(),
        "valid": datasets.valid.len(),
        "test": datasets.test.len(),
    }))
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

/// Values after `flag` up to the next `--option`, upper-cased
fn flag_list(args: &[String], flag: &str) -> Vec<String> {
    args.iter()
        .position(|a| a == flag)
        .map(|idx| {
            let raw: Vec<&str> = args[idx + 1..]
                .iter()
                .take_while(|a| !a.starts_with("--"))
                .map(|s| s.as_str())
                .collect();
            parse_watch_list(&raw.join(","))
        })
        .unwrap_or_default()
}

fn flag_parse<T>(args: &[String], flag: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    flag_value(args, flag)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("invalid {} value {:?}", flag, raw))
        })
        .transpose()
}

fn required_date(args: &[String], flag: &str) -> anyhow::Result<NaiveDate> {
    flag_parse(args, flag)?.with_context(|| format!("missing {} YYYY-MM-DD", flag))
}
