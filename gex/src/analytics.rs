//! Derived views over a [`GammaSurface`] used by the dashboard.

use crate::model::{GammaSurface, StrikeLevel};
use serde::{Deserialize, Serialize};

/// Distance, in percent of spot, within which price is considered "at" a wall.
const WALL_PROXIMITY_PCT: f64 = 1.0;

/// Running net gamma at each strike, in strike order.
#[derive(Clone, Copy, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CumulativeLevel {
    pub strike: f64,
    pub net_gamma: i64,
    pub cumulative_gamma: i64,
}

pub fn cumulative_profile(strikes: &[StrikeLevel]) -> Vec<CumulativeLevel> {
    strikes
        .iter()
        .scan(0i64, |cumulative, level| {
            *cumulative += level.net_gamma;
            Some(CumulativeLevel {
                strike: level.strike,
                net_gamma: level.net_gamma,
                cumulative_gamma: *cumulative,
            })
        })
        .collect()
}

/// Dollar gamma notional: `total_gamma * spot * 100`, rounded.
pub fn gamma_notional(total_gamma: u64, spot: f64) -> f64 {
    (total_gamma as f64 * spot * 100.0).round()
}

/// Half of net gamma, with halves rounded up towards positive infinity.
pub fn delta_adjusted_gamma(net_gamma: i64) -> i64 {
    net_gamma.div_euclid(2) + net_gamma.rem_euclid(2)
}

/// Position of spot relative to the gamma flip.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GammaRegime {
    /// Spot above the flip: dealers long gamma, range-bound.
    Positive,
    /// Spot below the flip: dealers short gamma, volatile.
    Negative,
    AtFlip,
}

impl GammaRegime {
    pub fn of(surface: &GammaSurface) -> Self {
        if surface.spot_price > surface.gamma_flip {
            GammaRegime::Positive
        } else if surface.spot_price < surface.gamma_flip {
            GammaRegime::Negative
        } else {
            GammaRegime::AtFlip
        }
    }
}

/// Heuristic trading signal shown next to the surface.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradingSignal {
    /// Price near put wall support.
    Buy,
    /// Price near call wall resistance.
    Sell,
    /// Negative gamma zone, high volatility.
    Caution,
    /// Positive gamma, range-bound.
    Hold,
    Neutral,
}

impl TradingSignal {
    /// Rules are evaluated in order; the first match wins.
    pub fn of(surface: &GammaSurface) -> Self {
        let spot = surface.spot_price;
        let dist_to_put = (spot - surface.put_wall) / spot * 100.0;
        let dist_to_call = (surface.call_wall - spot) / spot * 100.0;

        if dist_to_put < WALL_PROXIMITY_PCT {
            TradingSignal::Buy
        } else if dist_to_call < WALL_PROXIMITY_PCT {
            TradingSignal::Sell
        } else if spot < surface.gamma_flip && surface.net_gamma < 0 {
            TradingSignal::Caution
        } else if spot > surface.gamma_flip && surface.net_gamma > 0 {
            TradingSignal::Hold
        } else {
            TradingSignal::Neutral
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            TradingSignal::Buy => "Price near Put Wall support",
            TradingSignal::Sell => "Price near Call Wall resistance",
            TradingSignal::Caution => "Negative gamma zone - high volatility",
            TradingSignal::Hold => "Positive gamma - range-bound",
            TradingSignal::Neutral => "Mixed signals",
        }
    }
}
