#![allow(dead_code)]

use chrono::{Datelike, Months, NaiveDate, Weekday};
use overlaytrader::domain::error::OverlayError;
pub use overlaytrader::domain::market_data::{DailyBar, MarketData};
use overlaytrader::domain::universe::Universe;
use overlaytrader::ports::data_port::MarketDataPort;
use std::collections::HashMap;

pub struct MockMarketDataPort {
    pub data: HashMap<String, Vec<DailyBar>>,
    pub errors: HashMap<String, String>,
}

impl MockMarketDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<DailyBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockMarketDataPort {
    fn fetch_daily(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<DailyBar>, OverlayError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(OverlayError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && end_date.is_none_or(|e| b.date <= e))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_tickers(&self) -> Result<Vec<String>, OverlayError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }

    fn get_data_range(&self, ticker: &str) -> Result<Option<(NaiveDate, NaiveDate, usize)>, OverlayError> {
        match self.data.get(ticker) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub const START: &str = "2010-01-01";

/// Weekdays from `START` through the end of month `months - 1`.
pub fn trading_days(months: u32) -> Vec<NaiveDate> {
    let start = date(START);
    let end = start.checked_add_months(Months::new(months)).unwrap();
    start
        .iter_days()
        .take_while(|d| *d < end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

/// Months elapsed between `START` and `d`.
pub fn month_index(d: NaiveDate) -> u32 {
    let start = date(START);
    ((d.year() - start.year()) * 12) as u32 + d.month() - start.month()
}

pub fn make_bar(ticker: &str, date: NaiveDate, close: f64, volume: f64) -> DailyBar {
    DailyBar {
        ticker: ticker.to_string(),
        date,
        close,
        adj_close: None,
        volume,
    }
}

/// Bars whose close is `price(month_index)` for every day in that month.
pub fn monthly_step_bars(ticker: &str, months: u32, price: impl Fn(u32) -> f64) -> Vec<DailyBar> {
    trading_days(months)
        .into_iter()
        .map(|d| make_bar(ticker, d, price(month_index(d)), 1_000_000.0))
        .collect()
}

/// Accelerating uptrend: 12-month minus 6-month return rises every month.
pub fn accelerating(m: u32) -> f64 {
    100.0 * (0.001 * (m as f64).powi(2)).exp()
}

pub fn flat(_m: u32) -> f64 {
    100.0
}

pub const TICKERS: &str = "AAA,BBB,CCC,CASH";

/// Three risk assets (AAA trending up, BBB and CCC flat) plus cash, with
/// AAA doubling as the benchmark.
pub fn trend_universe() -> Universe {
    Universe::parse(TICKERS, "CASH", "AAA").unwrap()
}

pub fn trend_port(months: u32) -> MockMarketDataPort {
    MockMarketDataPort::new()
        .with_bars("AAA", monthly_step_bars("AAA", months, accelerating))
        .with_bars("BBB", monthly_step_bars("BBB", months, flat))
        .with_bars("CCC", monthly_step_bars("CCC", months, flat))
        .with_bars("CASH", monthly_step_bars("CASH", months, flat))
}

pub fn trend_market(months: u32) -> MarketData {
    let port = trend_port(months);
    let bars: Vec<(String, Vec<DailyBar>)> = ["AAA", "BBB", "CCC", "CASH"]
        .iter()
        .map(|t| (t.to_string(), port.data[*t].clone()))
        .collect();
    MarketData::from_bars(&bars)
}

pub const WEIGHT_TOLERANCE: f64 = 1e-9;

pub fn assert_row_is_valid(row: &[f64]) {
    assert!(row.iter().all(|w| *w >= 0.0), "negative weight in {row:?}");
    let sum: f64 = row.iter().sum();
    assert!(
        (sum - 1.0).abs() < WEIGHT_TOLERANCE || row.iter().all(|w| *w == 0.0),
        "row sums to {sum}: {row:?}"
    );
}
