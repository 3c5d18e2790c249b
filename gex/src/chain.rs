//! Gamma surface built from a live options chain.

use crate::model::{
    GammaSurface, StrikeLevel, Ticker, aggregate_gamma, max_open_interest_strikes,
};
use fnv::FnvHashMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Decay rate of the gamma proxy with relative distance from spot. Sharper than the
/// synthetic model since real chains list far more strikes.
const DECAY_RATE: f64 = 20.0;

/// Strikes further than this fraction from spot are dropped.
const STRIKE_WINDOW: f64 = 0.20;

const CONTRACT_MULTIPLIER: f64 = 100.0;

/// Single listed option contract.
#[derive(Clone, Copy, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionContract {
    pub strike: f64,
    #[serde(default)]
    pub open_interest: Option<u64>,
}

/// Calls and puts listed for one expiration.
#[derive(Clone, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct OptionChain {
    #[serde(default)]
    pub calls: Vec<OptionContract>,
    #[serde(default)]
    pub puts: Vec<OptionContract>,
}

impl OptionChain {
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }
}

#[derive(Default)]
struct StrikeOpenInterest {
    strike: f64,
    call: u64,
    put: u64,
}

/// Build a [`GammaSurface`] from a live chain.
///
/// Returns `None` when no listed strike falls inside the window around spot, leaving the
/// caller to fall back to the synthetic model.
pub fn surface_from_chain(
    ticker: &Ticker,
    spot: f64,
    expiration: &str,
    chain: &OptionChain,
) -> Option<GammaSurface> {
    let mut by_strike = FnvHashMap::<u64, StrikeOpenInterest>::default();

    for call in chain.calls.iter().filter(|contract| contract.strike.is_finite()) {
        let entry = by_strike.entry(call.strike.to_bits()).or_default();
        entry.strike = call.strike;
        entry.call = call.open_interest.unwrap_or_default();
    }
    for put in chain.puts.iter().filter(|contract| contract.strike.is_finite()) {
        let entry = by_strike.entry(put.strike.to_bits()).or_default();
        entry.strike = put.strike;
        entry.put = put.open_interest.unwrap_or_default();
    }

    let strikes = by_strike
        .into_values()
        .filter(|oi| (oi.strike - spot).abs() / spot < STRIKE_WINDOW)
        .map(|oi| {
            let decay = (-((oi.strike - spot).abs() / spot) * DECAY_RATE).exp();
            StrikeLevel::new(
                oi.strike,
                oi.call,
                oi.put,
                gamma_proxy(oi.call, decay),
                gamma_proxy(oi.put, decay),
            )
        })
        .sorted_by(|a, b| a.strike.total_cmp(&b.strike))
        .collect::<Vec<_>>();

    let (put_wall, call_wall) = max_open_interest_strikes(&strikes)?;
    let (total_gamma, net_gamma) = aggregate_gamma(&strikes);
    let gamma_flip = sign_change_nearest(&strikes, spot).unwrap_or(spot);

    Some(GammaSurface {
        ticker: ticker.clone(),
        expiration: expiration.to_string(),
        spot_price: spot,
        strikes,
        gamma_flip,
        put_wall,
        call_wall,
        total_gamma,
        net_gamma,
    })
}

#[inline]
fn gamma_proxy(open_interest: u64, decay: f64) -> u64 {
    (open_interest as f64 * CONTRACT_MULTIPLIER * decay).round() as u64
}

/// Upper strike of the adjacent pair whose net gamma strictly changes sign closest to
/// spot. Zero net gamma is not a sign.
pub fn sign_change_nearest(strikes: &[StrikeLevel], spot: f64) -> Option<f64> {
    strikes
        .iter()
        .tuple_windows()
        .filter(|(prev, next)| {
            (prev.net_gamma < 0 && next.net_gamma > 0) || (prev.net_gamma > 0 && next.net_gamma < 0)
        })
        .map(|(_, next)| next.strike)
        .fold(None, |nearest: Option<f64>, strike| match nearest {
            Some(best) if (best - spot).abs() <= (strike - spot).abs() => Some(best),
            _ => Some(strike),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(strike: f64, open_interest: Option<u64>) -> OptionContract {
        OptionContract { strike, open_interest }
    }

    fn level(strike: f64, net: i64) -> StrikeLevel {
        StrikeLevel {
            strike,
            call_open_interest: 0,
            put_open_interest: 0,
            call_gamma: net.max(0),
            put_gamma: net.min(0),
            net_gamma: net,
        }
    }

    #[test]
    fn test_surface_from_chain_merges_and_filters() {
        let ticker = Ticker::new("SPY").unwrap();
        let chain = OptionChain {
            calls: vec![
                contract(600.0, Some(1_000)),
                contract(610.0, Some(3_000)),
                contract(800.0, Some(99_999)),
            ],
            puts: vec![
                contract(590.0, Some(4_000)),
                contract(600.0, None),
                contract(300.0, Some(99_999)),
            ],
        };

        let surface = surface_from_chain(&ticker, 600.0, "2026-03-20", &chain).unwrap();

        let strikes = surface.strikes.iter().map(|s| s.strike).collect::<Vec<_>>();
        assert_eq!(strikes, vec![590.0, 600.0, 610.0]);

        let atm = surface.strikes[1];
        assert_eq!(atm.call_open_interest, 1_000);
        assert_eq!(atm.put_open_interest, 0);
        assert_eq!(atm.call_gamma, 100_000);
        assert_eq!(atm.put_gamma, 0);

        let below = surface.strikes[0];
        let decay = (-(10.0_f64 / 600.0) * DECAY_RATE).exp();
        assert_eq!(below.put_gamma, -((4_000.0 * 100.0 * decay).round() as i64));
        assert_eq!(below.call_open_interest, 0);

        assert_eq!(surface.put_wall, 590.0);
        assert_eq!(surface.call_wall, 610.0);

        let total = surface.strikes.iter().map(|s| s.net_gamma.unsigned_abs()).sum::<u64>();
        let net = surface.strikes.iter().map(|s| s.net_gamma).sum::<i64>();
        assert_eq!(surface.total_gamma, total);
        assert_eq!(surface.net_gamma, net);

        // 590 is net negative, 600 net positive
        assert_eq!(surface.gamma_flip, 600.0);
    }

    #[test]
    fn test_surface_from_chain_outside_window_is_none() {
        let ticker = Ticker::new("SPY").unwrap();
        let chain = OptionChain {
            calls: vec![contract(900.0, Some(10))],
            puts: vec![contract(100.0, Some(10))],
        };
        assert!(surface_from_chain(&ticker, 600.0, "2026-03-20", &chain).is_none());
        assert!(surface_from_chain(&ticker, 600.0, "2026-03-20", &OptionChain::default()).is_none());
    }

    #[test]
    fn test_sign_change_nearest() {
        struct TestCase {
            input: Vec<StrikeLevel>,
            spot: f64,
            expected: Option<f64>,
        }

        let tests = vec![
            TestCase {
                // TC0: no sign change
                input: vec![level(1.0, 5), level(2.0, 3), level(3.0, 1)],
                spot: 2.0,
                expected: None,
            },
            TestCase {
                // TC1: single negative to positive crossing
                input: vec![level(1.0, -5), level(2.0, -3), level(3.0, 1)],
                spot: 2.0,
                expected: Some(3.0),
            },
            TestCase {
                // TC2: nearest of two crossings wins
                input: vec![level(1.0, -5), level(2.0, 3), level(3.0, 1), level(4.0, -1)],
                spot: 3.9,
                expected: Some(4.0),
            },
            TestCase {
                // TC3: zero does not count as a sign
                input: vec![level(1.0, -5), level(2.0, 0), level(3.0, 1)],
                spot: 2.0,
                expected: None,
            },
            TestCase {
                // TC4: equidistant crossings keep the first found
                input: vec![level(1.0, -1), level(2.0, 1), level(3.0, 1), level(4.0, -1)],
                spot: 3.0,
                expected: Some(2.0),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = sign_change_nearest(&test.input, test.spot);
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_option_chain_de_defaults() {
        let chain: OptionChain =
            serde_json::from_str(r#"{"calls":[{"strike":600.0,"openInterest":12}]}"#).unwrap();
        assert_eq!(chain.calls, vec![contract(600.0, Some(12))]);
        assert!(chain.puts.is_empty());
        assert!(!chain.is_empty());
    }
}
