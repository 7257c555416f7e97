//! Overlay multipliers scaling total risk exposure per period.
//!
//! Vol targeting can lever up to `leverage_cap`; crowding and liquidity
//! stress only ever shrink exposure, via `exp(-k * clip(z, 0, cap))`.

use crate::domain::frame::{Frame, Series};
use crate::domain::rolling::mean;

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayParams {
    pub target_vol: f64,
    pub vol_floor: f64,
    pub leverage_cap: f64,
    pub crowding_beta: f64,
    pub crowding_cap: f64,
    pub liquidity_alpha: f64,
    pub liquidity_cap: f64,
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self {
            target_vol: 0.10,
            vol_floor: 1e-4,
            leverage_cap: 1.5,
            crowding_beta: 0.7,
            crowding_cap: 3.0,
            liquidity_alpha: 0.6,
            liquidity_cap: 3.0,
        }
    }
}

/// The three overlay series, each on its own date index.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySet {
    pub vol: Series,
    pub crowding: Series,
    pub liquidity: Series,
}

impl OverlaySet {
    pub fn from_signals(vol: &Frame, crowd_z: &Series, liq_z: &Series, params: &OverlayParams) -> Self {
        Self {
            vol: vol_multiplier(vol, params.target_vol, params.vol_floor, params.leverage_cap),
            crowding: crowding_multiplier(crowd_z, params.crowding_beta, params.crowding_cap),
            liquidity: liquidity_multiplier(liq_z, params.liquidity_alpha, params.liquidity_cap),
        }
    }

    /// Product of the three multipliers on `dates`; a missing value counts
    /// as 1.0. The product is not clipped.
    pub fn combined(&self, dates: &[chrono::NaiveDate]) -> Series {
        let values = dates
            .iter()
            .map(|d| {
                let v = self.vol.get(*d).unwrap_or(1.0);
                let c = self.crowding.get(*d).unwrap_or(1.0);
                let l = self.liquidity.get(*d).unwrap_or(1.0);
                Some(v * c * l)
            })
            .collect();
        Series::new(dates.to_vec(), values)
    }
}

/// `target / max(mean asset vol, floor)`, clipped to `[0, leverage_cap]`.
///
/// Undefined or non-finite asset vols are left out of the mean; a period
/// with no usable vol has an undefined multiplier.
pub fn vol_multiplier(vol: &Frame, target: f64, floor: f64, leverage_cap: f64) -> Series {
    let values = vol
        .rows
        .iter()
        .map(|row| {
            let usable: Vec<f64> = row.iter().flatten().copied().filter(|v| v.is_finite()).collect();
            let level = mean(&usable)?.max(floor);
            Some((target / level).clamp(0.0, leverage_cap))
        })
        .collect();
    Series::new(vol.dates.clone(), values)
}

pub fn crowding_multiplier(crowd_z: &Series, beta: f64, cap: f64) -> Series {
    decay_multiplier(crowd_z, beta, cap)
}

pub fn liquidity_multiplier(liq_z: &Series, alpha: f64, cap: f64) -> Series {
    decay_multiplier(liq_z, alpha, cap)
}

fn decay_multiplier(z: &Series, coefficient: f64, cap: f64) -> Series {
    z.map(|value| {
        let z = value.filter(|v| v.is_finite()).unwrap_or(0.0);
        Some((-coefficient * z.clamp(0.0, cap)).exp())
    })
}
