//! Daily market data: raw bars and the two daily input frames built from
//! them (prices and dollar volume).

use crate::domain::error::OverlayError;
use crate::domain::frame::Frame;
use crate::domain::universe::Universe;
use crate::ports::data_port::MarketDataPort;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
    /// Split/dividend adjusted close, when the source provides one.
    pub adj_close: Option<f64>,
    pub volume: f64,
}

impl DailyBar {
    /// Price used for returns: adjusted close, else raw close.
    pub fn price(&self) -> f64 {
        self.adj_close.unwrap_or(self.close)
    }

    /// close * volume, on the raw (unadjusted) close.
    pub fn dollar_volume(&self) -> f64 {
        self.close * self.volume
    }
}

/// Daily prices and dollar volume on one shared date index.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketData {
    pub daily_prices: Frame,
    pub dollar_volume: Frame,
}

impl MarketData {
    /// Assemble both frames from per-ticker bar lists.
    ///
    /// The index is the union of every ticker's dates. Dollar volume that is
    /// zero, negative or non-finite is stored as missing.
    pub fn from_bars(bars: &[(String, Vec<DailyBar>)]) -> Self {
        let timeline: BTreeSet<NaiveDate> = bars
            .iter()
            .flat_map(|(_, list)| list.iter().map(|b| b.date))
            .collect();
        let dates: Vec<NaiveDate> = timeline.into_iter().collect();

        let mut prices = Vec::with_capacity(bars.len());
        let mut volume = Vec::with_capacity(bars.len());
        for (ticker, list) in bars {
            let by_date: BTreeMap<NaiveDate, &DailyBar> = list.iter().map(|b| (b.date, b)).collect();
            let price_col = dates
                .iter()
                .map(|d| by_date.get(d).map(|b| b.price()).filter(|p| p.is_finite()))
                .collect();
            let volume_col = dates
                .iter()
                .map(|d| {
                    by_date
                        .get(d)
                        .map(|b| b.dollar_volume())
                        .filter(|v| v.is_finite() && *v > 0.0)
                })
                .collect();
            prices.push((ticker.clone(), price_col));
            volume.push((ticker.clone(), volume_col));
        }

        Self {
            daily_prices: Frame::from_columns(dates.clone(), prices),
            dollar_volume: Frame::from_columns(dates, volume),
        }
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.daily_prices.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.daily_prices.dates.last().copied()
    }
}

/// Fetch every universe ticker through `port` and assemble the daily frames.
///
/// `end` of `None` reads through the last available row. A ticker that
/// yields no rows in the window is an error.
pub fn load_market_data(
    port: &dyn MarketDataPort,
    universe: &Universe,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Result<MarketData, OverlayError> {
    let mut bars = Vec::with_capacity(universe.count());
    for ticker in &universe.tickers {
        let list = port.fetch_daily(ticker, start, end)?;
        if list.is_empty() {
            return Err(OverlayError::NoData {
                ticker: ticker.clone(),
            });
        }
        tracing::debug!(ticker = %ticker, rows = list.len(), "loaded daily bars");
        bars.push((ticker.clone(), list));
    }

    let market = MarketData::from_bars(&bars);
    tracing::info!(
        tickers = universe.count(),
        days = market.daily_prices.len(),
        first = ?market.first_date(),
        last = ?market.last_date(),
        "market data loaded"
    );
    Ok(market)
}
