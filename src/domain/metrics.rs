//! Return-stream statistics: cumulative growth, drawdown and summary stats.

use crate::domain::frame::Series;
use crate::domain::rolling::{mean, sample_std};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Fewer defined returns than this leaves every statistic undefined.
pub const MIN_OBSERVATIONS: usize = 5;

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerformanceStats {
    pub cagr: Option<f64>,
    pub volatility: Option<f64>,
    pub sharpe: Option<f64>,
    pub max_drawdown: Option<f64>,
}

impl PerformanceStats {
    /// Summary statistics of a periodic return series.
    ///
    /// Years elapsed are measured on the calendar (first to last defined
    /// date / 365.25); volatility and Sharpe are annualised with
    /// `periods_per_year`.
    pub fn compute(returns: &Series, periods_per_year: f64) -> Self {
        let defined = returns.defined();
        if defined.len() < MIN_OBSERVATIONS {
            return Self::default();
        }

        let values: Vec<f64> = defined.iter().map(|(_, r)| *r).collect();
        let growth: f64 = values.iter().map(|r| 1.0 + r).product();

        let first = defined[0].0;
        let last = defined[defined.len() - 1].0;
        let years = (last - first).num_days() as f64 / DAYS_PER_YEAR;
        let cagr = if years > 0.0 {
            finite(growth.powf(1.0 / years) - 1.0)
        } else {
            None
        };

        let volatility = sample_std(&values).and_then(|s| finite(s * periods_per_year.sqrt()));
        let sharpe = match (mean(&values), volatility) {
            (Some(m), Some(v)) if v > 0.0 => finite(m * periods_per_year / v),
            _ => None,
        };

        let max_drawdown = drawdown_series(&cumulative_curve(returns))
            .values
            .iter()
            .flatten()
            .copied()
            .reduce(f64::min);

        PerformanceStats {
            cagr,
            volatility,
            sharpe,
            max_drawdown,
        }
    }
}

fn finite(x: f64) -> Option<f64> {
    x.is_finite().then_some(x)
}

/// Running product of `1 + r`. Undefined returns stay undefined and do not
/// break the product.
pub fn cumulative_curve(returns: &Series) -> Series {
    let mut growth = 1.0;
    returns.map(|r| {
        r.map(|r| {
            growth *= 1.0 + r;
            growth
        })
    })
}

/// `curve / running_max(curve) - 1`; zero at every new high, never positive.
pub fn drawdown_series(curve: &Series) -> Series {
    let mut peak = f64::NEG_INFINITY;
    curve.map(|c| {
        c.map(|c| {
            if c > peak {
                peak = c;
            }
            if peak > 0.0 {
                (c / peak - 1.0).min(0.0)
            } else {
                0.0
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn daily(values: &[f64]) -> Series {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Series::new(
            (0..values.len())
                .map(|i| start + chrono::Duration::days(i as i64))
                .collect(),
            values.iter().map(|v| Some(*v)).collect(),
        )
    }

    #[test]
    fn stats_undefined_below_five_observations() {
        let stats = PerformanceStats::compute(&daily(&[0.01, 0.02, -0.01, 0.0]), 252.0);
        assert_eq!(stats, PerformanceStats::default());
    }

    #[test]
    fn undefined_returns_do_not_count_as_observations() {
        let mut s = daily(&[0.01, 0.02, -0.01, 0.0, 0.01, 0.01]);
        s.values[1] = None;
        s.values[2] = None;
        let stats = PerformanceStats::compute(&s, 252.0);
        assert_eq!(stats.cagr, None);
        assert_eq!(stats.sharpe, None);
    }

    #[test]
    fn cumulative_curve_compounds() {
        let curve = cumulative_curve(&daily(&[0.1, -0.1, 0.1]));
        assert_relative_eq!(curve.values[0].unwrap(), 1.1, epsilon = 1e-12);
        assert_relative_eq!(curve.values[1].unwrap(), 0.99, epsilon = 1e-12);
        assert_relative_eq!(curve.values[2].unwrap(), 1.089, epsilon = 1e-12);
    }

    #[test]
    fn drawdown_zero_at_highs_and_negative_below() {
        let curve = daily(&[1.0, 1.1, 0.99, 1.2]);
        let dd = drawdown_series(&curve);
        assert_eq!(dd.values[0], Some(0.0));
        assert_eq!(dd.values[1], Some(0.0));
        assert_relative_eq!(dd.values[2].unwrap(), 0.99 / 1.1 - 1.0, epsilon = 1e-12);
        assert_eq!(dd.values[3], Some(0.0));
    }

    #[test]
    fn max_drawdown_of_known_path() {
        // equity 1.0 -> 1.1 -> 0.88 -> 0.968 -> 1.1616 -> 1.27776
        let stats = PerformanceStats::compute(&daily(&[0.0, 0.1, -0.2, 0.1, 0.2, 0.1]), 252.0);
        assert_relative_eq!(stats.max_drawdown.unwrap(), -0.2, epsilon = 1e-12);
    }

    #[test]
    fn cagr_over_one_calendar_year() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..5)
            .map(|k| start + chrono::Duration::days((k as f64 * 365.25 / 4.0).round() as i64))
            .collect();
        let years = (dates[4] - dates[0]).num_days() as f64 / 365.25;
        let returns = Series::new(dates, vec![Some(0.0), Some(0.05), Some(0.05), Some(0.0), Some(0.0)]);
        let stats = PerformanceStats::compute(&returns, 252.0);
        let expected = (1.05f64 * 1.05).powf(1.0 / years) - 1.0;
        assert_relative_eq!(stats.cagr.unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn sharpe_and_vol_annualised() {
        let r = [0.01, -0.005, 0.02, 0.0, 0.004, -0.01];
        let stats = PerformanceStats::compute(&daily(&r), 252.0);
        let m = r.iter().sum::<f64>() / r.len() as f64;
        let sd = (r.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (r.len() - 1) as f64).sqrt();
        assert_relative_eq!(stats.volatility.unwrap(), sd * 252f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(stats.sharpe.unwrap(), m * 252.0 / (sd * 252f64.sqrt()), epsilon = 1e-12);
    }

    #[test]
    fn flat_returns_have_no_sharpe() {
        let stats = PerformanceStats::compute(&daily(&[0.0; 10]), 252.0);
        assert_eq!(stats.volatility, Some(0.0));
        assert_eq!(stats.sharpe, None);
        assert_eq!(stats.max_drawdown, Some(0.0));
    }
}
