//! Signal engine: per-asset momentum and realized volatility, plus the two
//! portfolio-level stress gauges (crowding and illiquidity).
//!
//! All transforms are pure and causal. The cash ticker is always excluded
//! from the asset universe. Undefined inputs propagate as `None`.

use crate::domain::frame::{Frame, Series, month_end, month_ends_between};
use crate::domain::rolling::{mean, pearson, rolling_std, rolling_zscore};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct SignalParams {
    pub momentum_long: usize,
    pub momentum_short: usize,
    pub z_window: usize,
    pub vol_window: usize,
    pub crowding_window: usize,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            momentum_long: 12,
            momentum_short: 6,
            z_window: 36,
            vol_window: 6,
            crowding_window: 6,
        }
    }
}

/// Everything the weight composer needs from the signal stage.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSet {
    pub momentum: Frame,
    pub volatility: Frame,
    pub crowding_z: Series,
    pub liquidity_z: Series,
}

/// Long-window return minus short-window return, z-scored over `z_window`.
pub fn momentum_signal(
    prices_m: &Frame,
    cash: &str,
    long: usize,
    short: usize,
    z_window: usize,
) -> Frame {
    let risk = prices_m.without_column(cash);
    let long_ret = risk.pct_change(long);
    let short_ret = risk.pct_change(short);

    let raw_rows = long_ret
        .rows
        .iter()
        .zip(short_ret.rows.iter())
        .map(|(l, s)| {
            l.iter()
                .zip(s.iter())
                .map(|(a, b)| match (a, b) {
                    (Some(a), Some(b)) => Some(a - b),
                    _ => None,
                })
                .collect()
        })
        .collect();
    let raw = Frame::new(risk.dates.clone(), risk.columns.clone(), raw_rows);
    raw.map_columns(|values| rolling_zscore(values, z_window))
}

/// Trailing sample standard deviation of periodic returns.
pub fn realized_vol(prices_m: &Frame, cash: &str, window: usize) -> Frame {
    prices_m
        .without_column(cash)
        .pct_change(1)
        .map_columns(|values| rolling_std(values, window))
}

/// Mean pairwise correlation of risk-asset returns over a trailing window,
/// z-scored over `z_window`.
///
/// For period `i` the window holds returns `i + 1 - window ..= i`; rows with
/// any undefined return are dropped. At least two complete rows and two
/// assets are required, otherwise the level is undefined. Pairs whose
/// correlation is undefined (zero variance) are left out of the mean.
pub fn crowding_score_corr(prices_m: &Frame, cash: &str, window: usize, z_window: usize) -> Series {
    let returns = prices_m.without_column(cash).pct_change(1);
    let n_assets = returns.columns.len();
    let mut level = vec![None; returns.len()];

    if window > 0 && n_assets >= 2 {
        for i in window..returns.len() {
            let complete: Vec<&Vec<Option<f64>>> = returns.rows[i + 1 - window..=i]
                .iter()
                .filter(|row| row.iter().all(Option::is_some))
                .collect();
            if complete.len() < 2 {
                continue;
            }

            let by_asset: Vec<Vec<f64>> = (0..n_assets)
                .map(|j| complete.iter().filter_map(|row| row[j]).collect())
                .collect();

            let mut pairs = Vec::with_capacity(n_assets * (n_assets - 1) / 2);
            for a in 0..n_assets {
                for b in (a + 1)..n_assets {
                    if let Some(c) = pearson(&by_asset[a], &by_asset[b]) {
                        pairs.push(c);
                    }
                }
            }
            level[i] = mean(&pairs);
        }
    }

    Series::new(returns.dates.clone(), rolling_zscore(&level, z_window))
}

/// Amihud-style illiquidity: `|daily return| / dollar volume`, averaged per
/// asset per calendar month, then across assets, then z-scored.
///
/// Dollar volume that is zero, negative or non-finite is treated as missing.
/// Assets without a dollar-volume column contribute nothing.
pub fn liquidity_score_amihud(
    prices_d: &Frame,
    dollar_vol_d: &Frame,
    cash: &str,
    z_window: usize,
) -> Series {
    let returns = prices_d.without_column(cash).pct_change(1);
    let volume = dollar_vol_d.reindex(&returns.dates);

    let labels = month_ends_between(returns.dates.first(), returns.dates.last());
    let label_index: BTreeMap<_, _> = labels.iter().enumerate().map(|(k, d)| (*d, k)).collect();

    let mut per_asset_month: Vec<Vec<Vec<f64>>> =
        vec![vec![Vec::new(); labels.len()]; returns.columns.len()];

    for (j, ticker) in returns.columns.iter().enumerate() {
        let Some(vj) = volume.column_index(ticker) else {
            continue;
        };
        for (i, date) in returns.dates.iter().enumerate() {
            let (Some(r), Some(dv)) = (returns.rows[i][j], volume.rows[i][vj]) else {
                continue;
            };
            if dv <= 0.0 || !dv.is_finite() {
                continue;
            }
            let illiq = r.abs() / dv;
            if !illiq.is_finite() {
                continue;
            }
            if let Some(&k) = label_index.get(&month_end(*date)) {
                per_asset_month[j][k].push(illiq);
            }
        }
    }

    let level: Vec<Option<f64>> = (0..labels.len())
        .map(|k| {
            let monthly: Vec<f64> = per_asset_month
                .iter()
                .filter_map(|months| mean(&months[k]))
                .collect();
            mean(&monthly)
        })
        .collect();

    Series::new(labels, rolling_zscore(&level, z_window))
}

/// Run the full signal stage with one parameter set.
pub fn compute_signals(
    prices_m: &Frame,
    prices_d: &Frame,
    dollar_vol_d: &Frame,
    cash: &str,
    params: &SignalParams,
) -> SignalSet {
    SignalSet {
        momentum: momentum_signal(
            prices_m,
            cash,
            params.momentum_long,
            params.momentum_short,
            params.z_window,
        ),
        volatility: realized_vol(prices_m, cash, params.vol_window),
        crowding_z: crowding_score_corr(prices_m, cash, params.crowding_window, params.z_window),
        liquidity_z: liquidity_score_amihud(prices_d, dollar_vol_d, cash, params.z_window),
    }
}
