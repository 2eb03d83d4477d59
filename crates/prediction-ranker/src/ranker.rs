//! Ranking of model scores.
//!
//! Orders tickers by predicted return, highest first.

use panel_core::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One ticker and its model score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub ticker: String,
    pub score: f64,
}

/// Tickers sorted by score, descending.
///
/// Equal scores keep their input order. NaN scores sit below every real score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedPrediction {
    entries: Vec<RankedEntry>,
}

impl RankedPrediction {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RankedEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<RankedEntry> {
        self.entries
    }

    pub fn get(&self, ticker: &str) -> Option<&RankedEntry> {
        self.entries.iter().find(|e| e.ticker == ticker)
    }

    /// Highest `n` scores (strongest buys)
    pub fn top(&self, n: usize) -> &[RankedEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Lowest `n` scores (strongest sells), still in descending order
    pub fn bottom(&self, n: usize) -> &[RankedEntry] {
        let len = self.entries.len();
        &self.entries[len - n.min(len)..]
    }

    /// Top `n` followed by bottom `n`, without repeating an entry when the
    /// table is shorter than `2 * n`
    pub fn extremes(&self, n: usize) -> Vec<RankedEntry> {
        let len = self.entries.len();
        let head = n.min(len);
        let tail_start = len.saturating_sub(n).max(head);

        self.entries[..head]
            .iter()
            .chain(self.entries[tail_start..].iter())
            .cloned()
            .collect()
    }
}

/// Pairs scores with ticker symbols and sorts them
#[derive(Debug, Clone, Copy, Default)]
pub struct RankingAssembler;

impl RankingAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(&self, tickers: &[String], scores: &[f64]) -> PipelineResult<RankedPrediction> {
        if tickers.len() != scores.len() {
            return Err(PipelineError::shape("ranking scores", tickers.len(), scores.len()));
        }

        let mut entries: Vec<RankedEntry> = tickers
            .iter()
            .zip(scores)
            .map(|(ticker, &score)| RankedEntry {
                ticker: ticker.clone(),
                score,
            })
            .collect();

        // sort_by is stable, so ties keep input order
        entries.sort_by(|a, b| descending(a.score, b.score));

        if let Some(best) = entries.first() {
            tracing::debug!(tickers = entries.len(), top = %best.ticker, score = best.score, "ranked predictions");
        }

        Ok(RankedPrediction { entries })
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    fn order(ranked: &RankedPrediction) -> Vec<&str> {
        ranked.iter().map(|e| e.ticker.as_str()).collect()
    }

    #[test]
    fn test_ranking_stable_ties() {
        let ranked = RankingAssembler::new()
            .assemble(&names(&["A", "B", "C"]), &[0.2, 0.9, 0.2])
            .unwrap();

        assert_eq!(
            ranked.entries(),
            &[
                RankedEntry { ticker: "B".into(), score: 0.9 },
                RankedEntry { ticker: "A".into(), score: 0.2 },
                RankedEntry { ticker: "C".into(), score: 0.2 },
            ]
        );
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let err = RankingAssembler::new()
            .assemble(&names(&["A", "B"]), &[0.1])
            .unwrap_err();
        assert_eq!(err, PipelineError::shape("ranking scores", 2, 1));
    }

    #[test]
    fn test_nan_scores_rank_last() {
        let ranked = RankingAssembler::new()
            .assemble(&names(&["A", "B", "C", "D"]), &[f64::NAN, -0.3, f64::NAN, 0.1])
            .unwrap();
        assert_eq!(order(&ranked), vec!["D", "B", "A", "C"]);
    }

    #[test]
    fn test_empty_input() {
        let ranked = RankingAssembler::new().assemble(&[], &[]).unwrap();
        assert!(ranked.is_empty());
        assert!(ranked.extremes(10).is_empty());
    }

    #[test]
    fn test_top_bottom_and_extremes() {
        let tickers = names(&["A", "B", "C", "D", "E"]);
        let ranked = RankingAssembler::new()
            .assemble(&tickers, &[0.5, 0.1, -0.2, 0.3, 0.0])
            .unwrap();

        assert_eq!(order(&ranked), vec!["A", "D", "B", "E", "C"]);
        let top: Vec<&str> = ranked.top(2).iter().map(|e| e.ticker.as_str()).collect();
        assert_eq!(top, vec!["A", "D"]);
        let bottom: Vec<&str> = ranked.bottom(2).iter().map(|e| e.ticker.as_str()).collect();
        assert_eq!(bottom, vec!["E", "C"]);

        let ext: Vec<String> = ranked.extremes(2).into_iter().map(|e| e.ticker).collect();
        assert_eq!(ext, vec!["A", "D", "E", "C"]);

        // overlapping halves do not repeat entries
        assert_eq!(ranked.extremes(10).len(), 5);
        assert_eq!(ranked.top(10).len(), 5);
        assert_eq!(ranked.get("B").map(|e| e.score), Some(0.1));
    }

    #[test]
    fn test_serializes_as_entry_list() {
        let ranked = RankingAssembler::new()
            .assemble(&names(&["FPT", "VCB"]), &[0.01, 0.02])
            .unwrap();
        let json = serde_json::to_value(&ranked).unwrap();
        assert_eq!(json["entries"][0]["ticker"], "VCB");
        assert_eq!(json["entries"][1]["score"], 0.01);
    }
}
