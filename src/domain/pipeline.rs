//! End-to-end run: structural checks, monthly resample, signals, weight
//! composition, evaluation and diagnostics.

use crate::domain::allocation::{AllocationParams, WeightMatrix, compose_from_signals};
use crate::domain::error::OverlayError;
use crate::domain::evaluation::{EvaluatedSeries, EvaluationParams, evaluate};
use crate::domain::frame::Series;
use crate::domain::market_data::MarketData;
use crate::domain::metrics::PerformanceStats;
use crate::domain::overlay::OverlayParams;
use crate::domain::rolling::mean;
use crate::domain::signals::{SignalParams, compute_signals};
use crate::domain::universe::Universe;

/// Row sums above this count as an invested day.
const EXPOSURE_EPSILON: f64 = 1e-6;
/// Cash weights above this count as a cash-holding day.
const CASH_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    pub signals: SignalParams,
    pub overlay: OverlayParams,
    pub allocation: AllocationParams,
    pub evaluation: EvaluationParams,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MultiplierStats {
    pub min: Option<f64>,
    pub mean: Option<f64>,
    pub max: Option<f64>,
}

impl MultiplierStats {
    pub fn from_series(series: &Series) -> Self {
        let values: Vec<f64> = series.defined().into_iter().map(|(_, v)| v).collect();
        Self {
            min: values.iter().copied().reduce(f64::min),
            mean: mean(&values),
            max: values.iter().copied().reduce(f64::max),
        }
    }
}

/// How much of the run was driven by fallbacks rather than signals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineDiagnostics {
    pub momentum_missing_ratio: f64,
    pub vol_missing_ratio: f64,
    pub crowding_missing_ratio: f64,
    pub liquidity_missing_ratio: f64,
    pub vol_multiplier: MultiplierStats,
    pub crowding_multiplier: MultiplierStats,
    pub liquidity_multiplier: MultiplierStats,
    pub combined_multiplier: MultiplierStats,
    pub fallback_periods: usize,
    pub total_periods: usize,
    /// Mean daily sum of held weights, cash included.
    pub mean_gross_exposure: f64,
    pub invested_day_ratio: f64,
    pub cash_day_ratio: f64,
}

impl PipelineDiagnostics {
    pub fn fallback_ratio(&self) -> f64 {
        ratio(self.fallback_periods, self.total_periods)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub weights: WeightMatrix,
    pub strategy: EvaluatedSeries,
    pub benchmark: EvaluatedSeries,
    pub diagnostics: PipelineDiagnostics,
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { count as f64 / total as f64 }
}

fn daily_weight_checks(daily: &WeightMatrix) -> (f64, f64, f64) {
    let days = daily.len();
    let sums: Vec<f64> = (0..days).map(|i| daily.row_sum(i)).collect();
    let gross = mean(&sums).unwrap_or(0.0);
    let invested = sums.iter().filter(|s| **s > EXPOSURE_EPSILON).count();
    let cash = (0..days).filter(|i| daily.cash_weight(*i) > CASH_EPSILON).count();
    (gross, ratio(invested, days), ratio(cash, days))
}

/// Run the whole pipeline on already-loaded market data.
///
/// Fails only on structural problems: a universe ticker without prices, a
/// risk ticker without dollar volume, or a missing cash or benchmark column.
pub fn run_pipeline(
    market: &MarketData,
    universe: &Universe,
    config: &PipelineConfig,
) -> Result<PipelineResult, OverlayError> {
    universe.validate_inputs(market)?;

    let tickers: Vec<&str> = universe.tickers.iter().map(String::as_str).collect();
    let prices_d = market.daily_prices.select(&tickers);
    let dollar_vol_d = market.dollar_volume.select(&universe.risk_tickers());
    let prices_m = prices_d.resample_month_end();
    tracing::info!(
        days = prices_d.len(),
        months = prices_m.len(),
        assets = universe.risk_tickers().len(),
        "resampled to month end"
    );

    let signals = compute_signals(&prices_m, &prices_d, &dollar_vol_d, &universe.cash, &config.signals);
    let composition = compose_from_signals(&signals, &universe.cash, &config.overlay, &config.allocation)?;
    let evaluation = evaluate(&composition.weights, &prices_d, &universe.benchmark, &config.evaluation)?;

    let (mean_gross_exposure, invested_day_ratio, cash_day_ratio) =
        daily_weight_checks(&evaluation.daily_weights);
    let diagnostics = PipelineDiagnostics {
        momentum_missing_ratio: signals.momentum.missing_ratio(),
        vol_missing_ratio: signals.volatility.missing_ratio(),
        crowding_missing_ratio: signals.crowding_z.missing_ratio(),
        liquidity_missing_ratio: signals.liquidity_z.missing_ratio(),
        vol_multiplier: MultiplierStats::from_series(&composition.overlays.vol),
        crowding_multiplier: MultiplierStats::from_series(&composition.overlays.crowding),
        liquidity_multiplier: MultiplierStats::from_series(&composition.overlays.liquidity),
        combined_multiplier: MultiplierStats::from_series(&composition.combined_multiplier),
        fallback_periods: composition.fallback_periods,
        total_periods: composition.weights.len(),
        mean_gross_exposure,
        invested_day_ratio,
        cash_day_ratio,
    };
    log_diagnostics(&diagnostics);
    log_stats("strategy", &evaluation.strategy.stats);
    log_stats("benchmark", &evaluation.benchmark.stats);

    Ok(PipelineResult {
        weights: composition.weights,
        strategy: evaluation.strategy,
        benchmark: evaluation.benchmark,
        diagnostics,
    })
}

fn log_diagnostics(d: &PipelineDiagnostics) {
    tracing::info!(
        momentum = d.momentum_missing_ratio,
        vol = d.vol_missing_ratio,
        crowding = d.crowding_missing_ratio,
        liquidity = d.liquidity_missing_ratio,
        "signal missing ratios"
    );
    for (name, stats) in [
        ("vol", &d.vol_multiplier),
        ("crowding", &d.crowding_multiplier),
        ("liquidity", &d.liquidity_multiplier),
        ("combined", &d.combined_multiplier),
    ] {
        tracing::info!(
            overlay = name,
            min = ?stats.min,
            mean = ?stats.mean,
            max = ?stats.max,
            "overlay multiplier"
        );
    }
    if d.fallback_periods > 0 {
        tracing::warn!(
            count = d.fallback_periods,
            total = d.total_periods,
            ratio = d.fallback_ratio(),
            "periods forced to cash: volatility undefined"
        );
    }
    tracing::info!(
        mean_gross_exposure = d.mean_gross_exposure,
        invested_day_ratio = d.invested_day_ratio,
        cash_day_ratio = d.cash_day_ratio,
        "daily weight check"
    );
}

fn log_stats(series: &str, stats: &PerformanceStats) {
    tracing::info!(
        series,
        cagr = ?stats.cagr,
        vol = ?stats.volatility,
        sharpe = ?stats.sharpe,
        max_drawdown = ?stats.max_drawdown,
        "performance summary"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    #[test]
    fn multiplier_stats_ignore_undefined() {
        let d = |m| NaiveDate::from_ymd_opt(2024, m, 1).unwrap();
        let s = Series::new(vec![d(1), d(2), d(3)], vec![Some(0.5), None, Some(1.5)]);
        let stats = MultiplierStats::from_series(&s);
        assert_eq!(stats.min, Some(0.5));
        assert_eq!(stats.max, Some(1.5));
        assert_relative_eq!(stats.mean.unwrap(), 1.0);

        let empty = MultiplierStats::from_series(&Series::new(vec![d(1)], vec![None]));
        assert_eq!(empty, MultiplierStats::default());
    }

    #[test]
    fn daily_weight_checks_count_days() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let w = WeightMatrix {
            dates: vec![d(1), d(2), d(3), d(4)],
            tickers: vec!["SPY".into(), "BIL".into()],
            rows: vec![vec![0.0, 0.0], vec![0.6, 0.4], vec![1.0, 0.0], vec![0.0, 1.0]],
        };
        let (gross, invested, cash) = daily_weight_checks(&w);
        assert_relative_eq!(gross, 0.75);
        assert_relative_eq!(invested, 0.75);
        assert_relative_eq!(cash, 0.5);
    }

    #[test]
    fn fallback_ratio_handles_empty_run() {
        assert_eq!(PipelineDiagnostics::default().fallback_ratio(), 0.0);
        let d = PipelineDiagnostics {
            fallback_periods: 3,
            total_periods: 12,
            ..Default::default()
        };
        assert_relative_eq!(d.fallback_ratio(), 0.25);
    }
}
