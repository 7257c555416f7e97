//! Return evaluation: holds monthly weights through the following days and
//! books each day's return against the weights in force the day before.

use crate::domain::allocation::WeightMatrix;
use crate::domain::error::OverlayError;
use crate::domain::frame::{Frame, Series};
use crate::domain::metrics::{
    PerformanceStats, TRADING_DAYS_PER_YEAR, cumulative_curve, drawdown_series,
};

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationParams {
    pub periods_per_year: f64,
}

impl Default for EvaluationParams {
    fn default() -> Self {
        Self {
            periods_per_year: TRADING_DAYS_PER_YEAR,
        }
    }
}

/// A return stream with its derived curves and summary statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedSeries {
    pub returns: Series,
    pub cumulative: Series,
    pub drawdown: Series,
    pub stats: PerformanceStats,
}

impl EvaluatedSeries {
    pub fn from_returns(returns: Series, periods_per_year: f64) -> Self {
        let cumulative = cumulative_curve(&returns);
        let drawdown = drawdown_series(&cumulative);
        let stats = PerformanceStats::compute(&returns, periods_per_year);
        Self {
            returns,
            cumulative,
            drawdown,
            stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Monthly weights expanded onto the daily return index (unlagged).
    pub daily_weights: WeightMatrix,
    pub strategy: EvaluatedSeries,
    pub benchmark: EvaluatedSeries,
}

/// Simple daily returns, keeping only days on which every ticker has one.
pub fn daily_returns(prices_d: &Frame) -> Frame {
    prices_d.pct_change(1).drop_incomplete_rows()
}

/// Portfolio return on day `t`: weights in force on day `t - 1` times the
/// asset returns realised on day `t`. The first day has no prior weights
/// and returns zero.
pub fn portfolio_returns(weights: &WeightMatrix, returns: &Frame) -> Result<Series, OverlayError> {
    let columns = weights
        .tickers
        .iter()
        .map(|t| {
            returns
                .column_index(t)
                .ok_or_else(|| OverlayError::missing_column("daily returns", t))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let held = weights.forward_fill_onto(&returns.dates);
    let values = (0..returns.len())
        .map(|t| {
            if t == 0 {
                return Some(0.0);
            }
            let prior = &held.rows[t - 1];
            let r = &returns.rows[t];
            Some(
                columns
                    .iter()
                    .enumerate()
                    .map(|(j, &c)| prior[j] * r[c].unwrap_or(0.0))
                    .sum(),
            )
        })
        .collect();
    Ok(Series::new(returns.dates.clone(), values))
}

/// Buy-and-hold daily returns of a single ticker, undefined days removed.
pub fn benchmark_returns(prices_d: &Frame, ticker: &str) -> Result<Series, OverlayError> {
    let series = prices_d
        .pct_change(1)
        .series(ticker)
        .ok_or_else(|| OverlayError::missing_ticker(ticker, "benchmark"))?;
    let (dates, values) = series
        .defined()
        .into_iter()
        .map(|(d, r)| (d, Some(r)))
        .unzip();
    Ok(Series::new(dates, values))
}

/// Restrict both series to the dates they share.
pub fn align_common(a: &Series, b: &Series) -> (Series, Series) {
    let common: Vec<_> = a
        .dates
        .iter()
        .filter(|d| b.dates.binary_search(d).is_ok())
        .copied()
        .collect();
    (a.reindex(&common), b.reindex(&common))
}

/// Strategy and benchmark evaluation over the shared daily index.
pub fn evaluate(
    weights: &WeightMatrix,
    prices_d: &Frame,
    benchmark: &str,
    params: &EvaluationParams,
) -> Result<Evaluation, OverlayError> {
    let returns = daily_returns(prices_d);
    let strategy = portfolio_returns(weights, &returns)?;
    let bench = benchmark_returns(prices_d, benchmark)?;
    let (strategy, bench) = align_common(&strategy, &bench);

    Ok(Evaluation {
        daily_weights: weights.forward_fill_onto(&returns.dates),
        strategy: EvaluatedSeries::from_returns(strategy, params.periods_per_year),
        benchmark: EvaluatedSeries::from_returns(bench, params.periods_per_year),
    })
}
