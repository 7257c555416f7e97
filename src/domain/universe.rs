//! Asset universe: the tradable tickers plus the designated cash and
//! benchmark tickers.
//!
//! Ticker lists come from configuration as comma-separated strings. Before a
//! run the universe is checked against the loaded market data so that a
//! misconfigured universe fails loudly instead of degrading into cash.

use crate::domain::error::OverlayError;
use crate::domain::market_data::MarketData;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    /// Every ticker in the universe, cash and benchmark included.
    pub tickers: Vec<String>,
    pub cash: String,
    pub benchmark: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),

    #[error("{role} ticker {ticker} is not in the universe")]
    NotInUniverse { ticker: String, role: String },

    #[error("universe is empty")]
    Empty,
}

/// Split a comma-separated list into upper-cased tickers.
pub fn parse_tickers(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let ticker = trimmed.to_uppercase();
        if !seen.insert(ticker.clone()) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

impl Universe {
    pub fn new(tickers: Vec<String>, cash: &str, benchmark: &str) -> Result<Self, UniverseError> {
        if tickers.is_empty() {
            return Err(UniverseError::Empty);
        }
        let cash = cash.trim().to_uppercase();
        let benchmark = benchmark.trim().to_uppercase();
        for (ticker, role) in [(&cash, "cash"), (&benchmark, "benchmark")] {
            if !tickers.contains(ticker) {
                return Err(UniverseError::NotInUniverse {
                    ticker: ticker.clone(),
                    role: role.to_string(),
                });
            }
        }
        Ok(Self {
            tickers,
            cash,
            benchmark,
        })
    }

    /// Build from the raw configuration strings.
    pub fn parse(tickers: &str, cash: &str, benchmark: &str) -> Result<Self, UniverseError> {
        Self::new(parse_tickers(tickers)?, cash, benchmark)
    }

    pub fn count(&self) -> usize {
        self.tickers.len()
    }

    /// Every ticker except cash, in configuration order.
    pub fn risk_tickers(&self) -> Vec<&str> {
        self.tickers
            .iter()
            .filter(|t| **t != self.cash)
            .map(String::as_str)
            .collect()
    }

    /// Structural checks on the loaded data: every ticker needs a daily
    /// price column and every risk ticker a dollar-volume column.
    pub fn validate_inputs(&self, market: &MarketData) -> Result<(), OverlayError> {
        if !market.daily_prices.has_column(&self.cash) {
            return Err(OverlayError::missing_ticker(&self.cash, "cash"));
        }
        if !market.daily_prices.has_column(&self.benchmark) {
            return Err(OverlayError::missing_ticker(&self.benchmark, "benchmark"));
        }
        if let Some(t) = self.tickers.iter().find(|t| !market.daily_prices.has_column(t)) {
            return Err(OverlayError::missing_ticker(t, "universe"));
        }
        if let Some(t) = self
            .risk_tickers()
            .into_iter()
            .find(|t| !market.dollar_volume.has_column(t))
        {
            return Err(OverlayError::missing_column("dollar volume", t));
        }
        Ok(())
    }
}
