//! Deterministic pseudo-randomness derived from seed strings.
//!
//! A seed string is folded into a 32-bit signed rolling hash, which is then scrambled
//! into a value in `[0, 1)`. The same seed always yields the same value, across calls
//! and process restarts.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Scrambler constant applied to `sin(hash)` in [`SeedMode::Sine`].
const SINE_SCALE: f64 = 43758.5453;

/// Strategy used to map a seed hash into `[0, 1)`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedMode {
    /// `|sin(hash) * 43758.5453 mod 1|`. Matches the numeric scale the dashboard was
    /// calibrated against.
    #[default]
    Sine,
    /// splitmix64 over the hash. Integer-only, so bit-exact on every platform.
    SplitMix,
}

impl SeedMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeedMode::Sine => "sine",
            SeedMode::SplitMix => "splitmix",
        }
    }
}

impl std::fmt::Display for SeedMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SeedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sine" | "sin" => Ok(SeedMode::Sine),
            "splitmix" | "splitmix64" => Ok(SeedMode::SplitMix),
            other => Err(format!("unknown seed mode: {other}")),
        }
    }
}

/// `h = h * 31 + c` over UTF-16 code units, wrapping at 32-bit signed.
pub fn rolling_hash(seed: &str) -> i32 {
    seed.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

/// Map `seed` to a reproducible value in `[0, 1)`.
pub fn seeded_random(seed: &str, mode: SeedMode) -> f64 {
    let hash = rolling_hash(seed);
    match mode {
        SeedMode::Sine => ((f64::from(hash).sin() * SINE_SCALE) % 1.0).abs(),
        SeedMode::SplitMix => {
            let mixed = splitmix64(u64::from(hash as u32));
            (mixed >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
        }
    }
}

#[inline]
fn splitmix64(state: u64) -> u64 {
    let mut z = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
