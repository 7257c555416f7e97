//! Weight composition: long-only base weights, overlay scaling and the
//! constrained allocation that turns them into a fully invested monthly
//! weight matrix with a cash bucket.
//!
//! Per period, in order:
//! 1. multiply base weights by the combined overlay multiplier
//! 2. clip risk weights at zero
//! 3. scale risk weights down proportionally if they sum above one
//! 4. cash = residual, clipped to `[0, 1]`
//! 5. optional cash cap: push the excess back into risk assets pro rata,
//!    then repeat steps 3 and 4 once
//! 6. a period whose volatility row is entirely undefined goes fully to cash
//! 7. divide the row by its sum (rows summing to ~0 are left as they are)

use chrono::NaiveDate;

use crate::domain::error::OverlayError;
use crate::domain::frame::{Frame, Series};
use crate::domain::overlay::{OverlayParams, OverlaySet};
use crate::domain::signals::SignalSet;

/// Row sums at or below this are treated as degenerate.
pub const WEIGHT_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationParams {
    /// Upper bound on the cash weight; `None` disables the cap.
    pub cash_cap: Option<f64>,
}

impl Default for AllocationParams {
    fn default() -> Self {
        Self {
            cash_cap: Some(0.40),
        }
    }
}

/// Dense weights, one row per date. The cash ticker is always the last
/// column.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl WeightMatrix {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn cash_ticker(&self) -> &str {
        self.tickers.last().map(String::as_str).unwrap_or_default()
    }

    pub fn risk_tickers(&self) -> &[String] {
        &self.tickers[..self.tickers.len().saturating_sub(1)]
    }

    pub fn weight(&self, i: usize, ticker: &str) -> Option<f64> {
        let j = self.tickers.iter().position(|t| t == ticker)?;
        self.rows.get(i).map(|row| row[j])
    }

    pub fn weight_on(&self, date: NaiveDate, ticker: &str) -> Option<f64> {
        let i = self.dates.binary_search(&date).ok()?;
        self.weight(i, ticker)
    }

    pub fn cash_weight(&self, i: usize) -> f64 {
        self.rows[i].last().copied().unwrap_or(0.0)
    }

    pub fn risk_sum(&self, i: usize) -> f64 {
        let row = &self.rows[i];
        row[..row.len().saturating_sub(1)].iter().sum()
    }

    pub fn row_sum(&self, i: usize) -> f64 {
        self.rows[i].iter().sum()
    }

    /// Weights in force on each of `dates`: the latest row dated on or
    /// before it. Dates before the first row get zero weight everywhere.
    pub fn forward_fill_onto(&self, dates: &[NaiveDate]) -> WeightMatrix {
        let width = self.tickers.len();
        let rows = dates
            .iter()
            .map(|d| {
                let k = self.dates.partition_point(|m| m <= d);
                if k == 0 {
                    vec![0.0; width]
                } else {
                    self.rows[k - 1].clone()
                }
            })
            .collect();
        WeightMatrix {
            dates: dates.to_vec(),
            tickers: self.tickers.clone(),
            rows,
        }
    }
}

/// Output of the composer plus what it observed along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub weights: WeightMatrix,
    pub overlays: OverlaySet,
    pub combined_multiplier: Series,
    pub fallback_periods: usize,
}

/// Long-only base weights from a signal matrix.
///
/// Non-positive and undefined signals get zero weight. With `vol`, each
/// surviving signal is divided by the asset's volatility (undefined or zero
/// volatility gives zero weight). Each row is then normalised to sum to
/// one; rows with nothing left stay at zero.
pub fn base_weights(signal: &Frame, vol: Option<&Frame>) -> Result<Frame, OverlayError> {
    let vol = vol.map(|v| v.reindex(&signal.dates));
    let vol_columns: Option<Vec<usize>> = match &vol {
        None => None,
        Some(v) => Some(
            signal
                .columns
                .iter()
                .map(|c| {
                    v.column_index(c)
                        .ok_or_else(|| OverlayError::missing_column("volatility", c))
                })
                .collect::<Result<_, _>>()?,
        ),
    };

    let rows = signal
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut w: Vec<f64> = row
                .iter()
                .map(|s| s.filter(|x| *x > 0.0).unwrap_or(0.0))
                .collect();

            if let (Some(v), Some(cols)) = (&vol, &vol_columns) {
                for (j, weight) in w.iter_mut().enumerate() {
                    let inverse = v.rows[i][cols[j]]
                        .filter(|x| *x != 0.0)
                        .map(|x| 1.0 / x)
                        .filter(|x| x.is_finite())
                        .unwrap_or(0.0);
                    *weight *= inverse;
                }
            }

            let total: f64 = w.iter().sum();
            if total > WEIGHT_EPSILON {
                w.iter().map(|x| Some(x / total)).collect()
            } else {
                vec![Some(0.0); w.len()]
            }
        })
        .collect();

    Ok(Frame::new(signal.dates.clone(), signal.columns.clone(), rows))
}

/// Run the constrained allocation over the full base-weight matrix.
///
/// `vol` is the per-asset realized volatility used for the invalid-period
/// fallback; it must cover every base-weight column.
pub fn compose_weights(
    base: &Frame,
    vol: &Frame,
    overlays: &OverlaySet,
    cash: &str,
    params: &AllocationParams,
) -> Result<Composition, OverlayError> {
    if cash.trim().is_empty() {
        return Err(OverlayError::missing_ticker(cash, "cash"));
    }
    let risk = base.without_column(cash);
    if let Some(column) = risk.columns.iter().find(|c| !vol.has_column(c)) {
        return Err(OverlayError::missing_column("volatility", column));
    }

    let combined = overlays.combined(&risk.dates);
    let vol = vol.reindex(&risk.dates);
    let mut fallback_periods = 0;

    let rows = risk
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let multiplier = combined.values[i].unwrap_or(1.0);
            let mut weights: Vec<f64> = row
                .iter()
                .map(|w| (w.unwrap_or(0.0) * multiplier).max(0.0))
                .collect();

            scale_down(&mut weights);
            let mut cash_weight = residual_cash(&weights);

            if let Some(cap) = params.cash_cap {
                cash_weight = apply_cash_cap(&mut weights, cash_weight, cap);
            }

            if vol.row_all_missing(i) {
                fallback_periods += 1;
                weights.iter_mut().for_each(|w| *w = 0.0);
                cash_weight = 1.0;
            }

            weights.push(cash_weight);
            normalise(&mut weights);
            weights
        })
        .collect();

    let mut tickers = risk.columns.clone();
    tickers.push(cash.to_string());

    tracing::debug!(
        periods = risk.len(),
        fallback_periods,
        cash_cap = ?params.cash_cap,
        "composed weight matrix"
    );

    Ok(Composition {
        weights: WeightMatrix {
            dates: risk.dates.clone(),
            tickers,
            rows,
        },
        overlays: overlays.clone(),
        combined_multiplier: combined,
        fallback_periods,
    })
}

/// Base weights, overlays and allocation straight from the signal stage.
///
/// Momentum is used long/flat: undefined or negative scores carry no weight.
pub fn compose_from_signals(
    signals: &SignalSet,
    cash: &str,
    overlay: &OverlayParams,
    allocation: &AllocationParams,
) -> Result<Composition, OverlayError> {
    let base = base_weights(&signals.momentum, Some(&signals.volatility))?;
    let overlays = OverlaySet::from_signals(
        &signals.volatility,
        &signals.crowding_z,
        &signals.liquidity_z,
        overlay,
    );
    compose_weights(&base, &signals.volatility, &overlays, cash, allocation)
}

fn scale_down(weights: &mut [f64]) {
    let total: f64 = weights.iter().sum();
    if total > 1.0 {
        weights.iter_mut().for_each(|w| *w /= total);
    }
}

fn residual_cash(weights: &[f64]) -> f64 {
    (1.0 - weights.iter().sum::<f64>()).clamp(0.0, 1.0)
}

/// Two fixed passes: redistribute the excess over `cap`, then re-apply the
/// scale-down and recompute the residual.
fn apply_cash_cap(weights: &mut [f64], cash: f64, cap: f64) -> f64 {
    if cash <= cap {
        return cash;
    }
    let excess = cash - cap;
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        let bump = 1.0 + excess / total;
        weights.iter_mut().for_each(|w| *w *= bump);
    }
    scale_down(weights);
    residual_cash(weights)
}

fn normalise(row: &mut [f64]) {
    let total: f64 = row.iter().sum();
    let divisor = if total > WEIGHT_EPSILON { total } else { 1.0 };
    row.iter_mut().for_each(|w| *w /= divisor);
}
