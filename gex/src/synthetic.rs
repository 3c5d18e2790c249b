//! Deterministic synthetic gamma surface.
//!
//! Used when no live options chain can be obtained. Open interest at each strike is
//! drawn from [`seeded_random`] keyed on `(ticker, strike, expiration)`, so the surface
//! looks live yet is a pure function of its inputs.
//!
//! Gamma is a fixed linear proxy (`OI * 100 * decay * 0.015`), not a Black-Scholes Greek.

use crate::{
    model::{GammaSurface, StrikeLevel, Ticker, aggregate_gamma, max_open_interest_strikes, round2},
    seed::{SeedMode, seeded_random},
};
use tracing::trace;

/// Strikes generated either side of spot. The grid holds `2 * STRIKES_PER_SIDE + 1`.
pub const STRIKES_PER_SIDE: i32 = 15;

/// Number of strikes in every synthetic surface.
pub const STRIKE_COUNT: usize = (2 * STRIKES_PER_SIDE + 1) as usize;

/// Strike spacing as a fraction of spot.
const STRIKE_SPACING: f64 = 0.01;

/// Exponential decay rate of open interest with relative distance from spot.
const DECAY_RATE: f64 = 10.0;

const CALL_OI_SCALE: f64 = 40_000.0;
const PUT_OI_SCALE: f64 = 45_000.0;
const OI_FLOOR: u64 = 500;

/// Options contract multiplier.
const CONTRACT_MULTIPLIER: f64 = 100.0;

/// Average per-contract gamma proxy.
const GAMMA_PER_CONTRACT: f64 = 0.015;

/// Half-width of the gamma flip band as a fraction of spot.
const FLIP_BAND: f64 = 0.02;

const PUT_WALL_FALLBACK: f64 = 0.95;
const CALL_WALL_FALLBACK: f64 = 1.05;

/// Open interest skew multipliers at a strike.
#[derive(Copy, Clone, PartialEq, Debug)]
struct Skew {
    call: f64,
    put: f64,
}

impl Skew {
    /// OTM puts carry more open interest than OTM calls. The ATM strike gets neither boost.
    fn at(strike: f64, spot: f64) -> Self {
        Self {
            call: if strike > spot { 1.5 } else { 0.5 },
            put: if strike < spot { 1.8 } else { 0.5 },
        }
    }
}

/// Strike grid spaced at 1% of spot.
///
/// Prices are rounded to cents unless the rounded step would collapse to zero
/// (spot below 0.5), in which case the grid is left unrounded.
#[derive(Copy, Clone, PartialEq, Debug)]
struct PriceGrid {
    spot: f64,
    step: f64,
    cents: bool,
}

impl PriceGrid {
    fn new(spot: f64) -> Self {
        let raw_step = spot * STRIKE_SPACING;
        let rounded_step = round2(raw_step);
        if rounded_step >= 0.01 {
            Self { spot, step: rounded_step, cents: true }
        } else {
            Self { spot, step: raw_step, cents: false }
        }
    }

    fn quantise(&self, price: f64) -> f64 {
        if self.cents { round2(price) } else { price }
    }

    fn strikes(&self) -> impl Iterator<Item = f64> + '_ {
        (-STRIKES_PER_SIDE..=STRIKES_PER_SIDE)
            .map(move |offset| self.quantise(self.spot + f64::from(offset) * self.step))
    }
}

/// Generate the synthetic [`GammaSurface`] for `(ticker, spot, expiration)`.
///
/// `spot` must be finite and positive; the caller validates it. The expiration only feeds
/// the seeds and is not checked against a trading calendar.
pub fn generate_gamma_surface(
    ticker: &Ticker,
    spot: f64,
    expiration: &str,
    mode: SeedMode,
) -> GammaSurface {
    debug_assert!(spot.is_finite() && spot > 0.0, "spot must be finite and positive");

    let grid = PriceGrid::new(spot);

    let mut strikes = grid
        .strikes()
        .map(|strike| strike_level(ticker, strike, spot, expiration, mode))
        .collect::<Vec<_>>();
    strikes.sort_by(|a, b| a.strike.total_cmp(&b.strike));

    let (put_wall, call_wall) = max_open_interest_strikes(&strikes)
        .map(|(put, call)| clamp_walls(put, call, spot))
        .unwrap_or((spot * PUT_WALL_FALLBACK, spot * CALL_WALL_FALLBACK));

    let gamma_flip = synthetic_flip(ticker, spot, expiration, mode, &grid);
    let (total_gamma, net_gamma) = aggregate_gamma(&strikes);

    trace!(
        %ticker,
        expiration,
        spot,
        put_wall,
        call_wall,
        gamma_flip,
        net_gamma,
        "generated synthetic gamma surface"
    );

    GammaSurface {
        ticker: ticker.clone(),
        expiration: expiration.to_string(),
        spot_price: spot,
        strikes,
        gamma_flip,
        put_wall,
        call_wall,
        total_gamma,
        net_gamma,
    }
}

impl GammaSurface {
    /// See [`generate_gamma_surface`].
    pub fn synthetic(ticker: &Ticker, spot: f64, expiration: &str, mode: SeedMode) -> Self {
        generate_gamma_surface(ticker, spot, expiration, mode)
    }
}

fn strike_level(
    ticker: &Ticker,
    strike: f64,
    spot: f64,
    expiration: &str,
    mode: SeedMode,
) -> StrikeLevel {
    let distance = (strike - spot).abs() / spot;
    let decay = (-distance * DECAY_RATE).exp();
    let skew = Skew::at(strike, spot);

    let seed_base = format!("{ticker}-{strike}-{expiration}");
    let call_draw = seeded_random(&format!("{seed_base}-callOI"), mode);
    let put_draw = seeded_random(&format!("{seed_base}-putOI"), mode);

    let call_oi = (call_draw * CALL_OI_SCALE * decay * skew.call).floor() as u64 + OI_FLOOR;
    let put_oi = (put_draw * PUT_OI_SCALE * decay * skew.put).floor() as u64 + OI_FLOOR;

    StrikeLevel::new(
        strike,
        call_oi,
        put_oi,
        gamma_proxy(call_oi, decay),
        gamma_proxy(put_oi, decay),
    )
}

#[inline]
fn gamma_proxy(open_interest: u64, decay: f64) -> u64 {
    (open_interest as f64 * CONTRACT_MULTIPLIER * decay * GAMMA_PER_CONTRACT).round() as u64
}

/// Replace a put wall found above spot with `spot * 0.95`, and a call wall found below
/// spot with `spot * 1.05`. Walls on the expected side, or exactly at spot, pass through.
pub fn clamp_walls(put_wall: f64, call_wall: f64, spot: f64) -> (f64, f64) {
    let put_wall = if put_wall > spot { spot * PUT_WALL_FALLBACK } else { put_wall };
    let call_wall = if call_wall < spot { spot * CALL_WALL_FALLBACK } else { call_wall };
    (put_wall, call_wall)
}

/// Seeded flip inside `[spot * 0.98, spot * 1.02]`.
fn synthetic_flip(
    ticker: &Ticker,
    spot: f64,
    expiration: &str,
    mode: SeedMode,
    grid: &PriceGrid,
) -> f64 {
    let draw = seeded_random(&format!("{ticker}-flip-{expiration}"), mode);
    let lower = spot * (1.0 - FLIP_BAND);
    let upper = spot * (1.0 + FLIP_BAND);

    // Rounding to cents may step just outside the band
    grid.quantise(spot * (1.0 - FLIP_BAND + draw * 2.0 * FLIP_BAND))
        .max(lower)
        .min(upper)
}
