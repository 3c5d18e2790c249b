use crate::{
    analytics::{GammaRegime, TradingSignal, delta_adjusted_gamma, gamma_notional},
    model::GammaSurface,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a surface came from.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
pub enum DataSource {
    #[serde(rename = "yahoo_finance_realtime")]
    Live,
    #[serde(rename = "simulation (fallback)")]
    Simulation,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Live => "yahoo_finance_realtime",
            DataSource::Simulation => "simulation (fallback)",
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the spot price came from.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotSource {
    Live,
    Fallback,
}

/// Gamma exposure payload returned to the dashboard.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaReport {
    #[serde(flatten)]
    pub surface: GammaSurface,
    pub gamma_notional: f64,
    pub delta_adjusted_gamma: i64,
    pub regime: GammaRegime,
    pub signal: TradingSignal,
    pub signal_reason: String,
    pub spot_source: SpotSource,
    pub last_update: DateTime<Utc>,
    pub source: DataSource,
}

impl GammaReport {
    pub fn new(
        surface: GammaSurface,
        source: DataSource,
        spot_source: SpotSource,
        last_update: DateTime<Utc>,
    ) -> Self {
        let signal = TradingSignal::of(&surface);
        Self {
            gamma_notional: gamma_notional(surface.total_gamma, surface.spot_price),
            delta_adjusted_gamma: delta_adjusted_gamma(surface.net_gamma),
            regime: GammaRegime::of(&surface),
            signal,
            signal_reason: signal.reason().to_string(),
            surface,
            spot_source,
            last_update,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::Ticker, seed::SeedMode};

    #[test]
    fn test_report_wire_format() {
        let ticker = Ticker::new("spy").unwrap();
        let surface = GammaSurface::synthetic(&ticker, 600.0, "2026-03-20", SeedMode::Sine);
        let report = GammaReport::new(surface, DataSource::Simulation, SpotSource::Fallback, Utc::now());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["ticker"], "SPY");
        assert_eq!(json["expiration"], "2026-03-20");
        assert_eq!(json["spotPrice"], 600.0);
        assert_eq!(json["source"], "simulation (fallback)");
        assert_eq!(json["strikes"].as_array().unwrap().len(), 31);
        assert_eq!(json["signal"], serde_json::to_value(report.signal).unwrap());
        assert_eq!(json["signalReason"], report.signal.reason());
        for key in [
            "gammaFlip",
            "putWall",
            "callWall",
            "totalGamma",
            "netGamma",
            "gammaNotional",
            "deltaAdjustedGamma",
            "regime",
            "signalReason",
            "lastUpdate",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }


        let decoded: GammaReport = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, report);
    }
}
