use crate::error::GexError;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Upper-cased, trimmed, non-empty ticker symbol (eg/ "SPY").
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(SmolStr);

impl Ticker {
    /// Normalise a raw ticker, rejecting empty or whitespace-only input.
    pub fn new(raw: &str) -> Result<Self, GexError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(GexError::TickerRequired);
        }
        Ok(Self(SmolStr::new(trimmed.to_uppercase())))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for Ticker {
    type Error = GexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Ticker> for String {
    fn from(value: Ticker) -> Self {
        value.0.to_string()
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Open interest and gamma contribution at a single strike.
///
/// `net_gamma == call_gamma + put_gamma`, with `put_gamma <= 0 <= call_gamma`.
#[derive(Clone, Copy, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrikeLevel {
    pub strike: f64,
    #[serde(rename = "callOI")]
    pub call_open_interest: u64,
    #[serde(rename = "putOI")]
    pub put_open_interest: u64,
    pub call_gamma: i64,
    pub put_gamma: i64,
    pub net_gamma: i64,
}

impl StrikeLevel {
    /// Construct a [`StrikeLevel`] from unsigned gamma magnitudes. The put side is negated.
    pub fn new(
        strike: f64,
        call_open_interest: u64,
        put_open_interest: u64,
        call_gamma_abs: u64,
        put_gamma_abs: u64,
    ) -> Self {
        let call_gamma = call_gamma_abs as i64;
        let put_gamma = -(put_gamma_abs as i64);
        Self {
            strike,
            call_open_interest,
            put_open_interest,
            call_gamma,
            put_gamma,
            net_gamma: call_gamma + put_gamma,
        }
    }
}

/// Gamma exposure surface for a `(ticker, expiration)` pair. Immutable once built.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaSurface {
    pub ticker: Ticker,
    pub expiration: String,
    pub spot_price: f64,
    /// Sorted ascending by strike.
    pub strikes: Vec<StrikeLevel>,
    pub gamma_flip: f64,
    pub put_wall: f64,
    pub call_wall: f64,
    pub total_gamma: u64,
    pub net_gamma: i64,
}

/// `(sum |net_gamma|, sum net_gamma)` over `strikes`.
pub fn aggregate_gamma(strikes: &[StrikeLevel]) -> (u64, i64) {
    strikes.iter().fold((0u64, 0i64), |(total, net), level| {
        (total + level.net_gamma.unsigned_abs(), net + level.net_gamma)
    })
}

/// First strike (lowest, given ascending input) holding the maximum put and call open
/// interest respectively. `None` for an empty slice.
pub fn max_open_interest_strikes(strikes: &[StrikeLevel]) -> Option<(f64, f64)> {
    let first = strikes.first()?;
    let (put, call) = strikes.iter().skip(1).fold((first, first), |(put, call), level| {
        (
            if level.put_open_interest > put.put_open_interest { level } else { put },
            if level.call_open_interest > call.call_open_interest { level } else { call },
        )
    });
    Some((put.strike, call.strike))
}

/// Round to 2 decimal places. Values too large to scale by 100 are already whole and
/// returned as is.
#[inline]
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    if scaled.is_finite() { scaled.round() / 100.0 } else { value }
}
