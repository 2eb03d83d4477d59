//! Prediction Ranking Module
//!
//! Turns per-ticker model scores into an ordered buy/sell table.

pub mod ranker;

pub use ranker::{RankedEntry, RankedPrediction, RankingAssembler};
