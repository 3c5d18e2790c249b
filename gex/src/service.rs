//! Request flow for a gamma exposure report.
//!
//! Cache read, then spot quote (falling back to the static price table), then options
//! chain (falling back to the synthetic surface), then cache write. Upstream failures are
//! logged and substituted; only request validation errors reach the caller.

use crate::{
    cache::{CacheKey, SurfaceCache},
    chain::surface_from_chain,
    config::Config,
    error::GexError,
    expiry::{format_expiration, next_friday},
    fallback::FallbackPrices,
    model::{GammaSurface, Ticker},
    report::{DataSource, GammaReport, SpotSource},
    seed::SeedMode,
    source::{Offline, OptionsChainSource, QuoteSource, yahoo::YahooClient},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Most expirations compared side by side in one batch.
pub const MAX_BATCH_EXPIRATIONS: usize = 4;

/// Incoming request body, as posted by the dashboard.
#[derive(Clone, PartialEq, Eq, Debug, Default, Deserialize, Serialize)]
pub struct GammaRequest {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub expiration: Option<String>,
}

impl GammaRequest {
    pub fn new(ticker: impl Into<String>, expiration: Option<&str>) -> Self {
        Self {
            ticker: Some(ticker.into()),
            expiration: expiration.map(str::to_string),
        }
    }
}

pub struct GammaService {
    quotes: Arc<dyn QuoteSource>,
    chains: Arc<dyn OptionsChainSource>,
    fallback: FallbackPrices,
    cache: SurfaceCache<GammaReport>,
    seed_mode: SeedMode,
}

impl std::fmt::Debug for GammaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GammaService")
            .field("fallback", &self.fallback.len())
            .field("cache", &self.cache.len())
            .field("seed_mode", &self.seed_mode)
            .finish_non_exhaustive()
    }
}

impl GammaService {
    pub fn new(
        quotes: Arc<dyn QuoteSource>,
        chains: Arc<dyn OptionsChainSource>,
        fallback: FallbackPrices,
        cache: SurfaceCache<GammaReport>,
        seed_mode: SeedMode,
    ) -> Self {
        Self {
            quotes,
            chains,
            fallback: fallback.with_seed_mode(seed_mode),
            cache,
            seed_mode,
        }
    }

    /// Wire the service from [`Config`]: Yahoo Finance when live data is enabled, otherwise
    /// fallback prices and synthetic surfaces only.
    pub fn from_config(config: &Config) -> Result<Self, GexError> {
        let (quotes, chains): (Arc<dyn QuoteSource>, Arc<dyn OptionsChainSource>) =
            if config.live_data {
                let yahoo = Arc::new(YahooClient::new(config.yahoo.clone())?);
                (yahoo.clone(), yahoo)
            } else {
                (Arc::new(Offline), Arc::new(Offline))
            };

        Ok(Self::new(
            quotes,
            chains,
            FallbackPrices::default(),
            SurfaceCache::new(config.cache_ttl),
            config.seed_mode,
        ))
    }

    pub fn cache(&self) -> &SurfaceCache<GammaReport> {
        &self.cache
    }

    pub async fn report(&self, request: &GammaRequest) -> Result<GammaReport, GexError> {
        let ticker = Ticker::new(request.ticker.as_deref().unwrap_or_default())?;
        let expiration = request
            .expiration
            .as_deref()
            .map(str::trim)
            .filter(|expiration| !expiration.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format_expiration(next_friday(Utc::now().date_naive())));

        let key = CacheKey::new(ticker.clone(), expiration.clone());
        if let Some(report) = self.cache.get(&key) {
            debug!(%ticker, %expiration, "serving cached gamma report");
            return Ok(report);
        }

        let (spot, spot_source) = self.spot_price(&ticker).await;
        let (surface, source) = self.surface(&ticker, spot, &expiration).await;

        info!(
            %ticker,
            %expiration,
            spot,
            ?spot_source,
            %source,
            strikes = surface.strikes.len(),
            "computed gamma report"
        );

        let report = GammaReport::new(surface, source, spot_source, Utc::now());
        self.cache.insert(key, report.clone());
        Ok(report)
    }

    /// Reports for up to [`MAX_BATCH_EXPIRATIONS`] expirations of one ticker, computed
    /// concurrently and returned in request order. No expirations means the next Friday.
    pub async fn reports(
        &self,
        ticker: &str,
        expirations: &[String],
    ) -> Result<Vec<GammaReport>, GexError> {
        let ticker = Ticker::new(ticker)?;

        let requests = if expirations.is_empty() {
            vec![GammaRequest::new(ticker.as_str(), None)]
        } else {
            if expirations.len() > MAX_BATCH_EXPIRATIONS {
                debug!(%ticker, requested = expirations.len(), "truncating expiration batch");
            }
            expirations
                .iter()
                .take(MAX_BATCH_EXPIRATIONS)
                .map(|expiration| GammaRequest::new(ticker.as_str(), Some(expiration)))
                .collect()
        };

        futures::future::try_join_all(requests.iter().map(|request| self.report(request))).await
    }

    async fn spot_price(&self, ticker: &Ticker) -> (f64, SpotSource) {
        match self.quotes.quote(ticker).await {
            Ok(Some(price)) if price.is_finite() && price > 0.0 => {
                debug!(%ticker, price, "live spot price");
                return (price, SpotSource::Live);
            }
            Ok(_) => debug!(%ticker, "no live spot price"),
            Err(error) => warn!(%ticker, %error, "spot price fetch failed"),
        }

        let price = self.fallback.price(ticker);
        info!(%ticker, price, "using fallback spot price");
        (price, SpotSource::Fallback)
    }

    async fn surface(&self, ticker: &Ticker, spot: f64, expiration: &str) -> (GammaSurface, DataSource) {
        match self.chains.chain(ticker, expiration).await {
            Ok(Some(chain)) => match surface_from_chain(ticker, spot, expiration, &chain) {
                Some(surface) => return (surface, DataSource::Live),
                None => debug!(%ticker, expiration, "options chain has no strikes near spot"),
            },
            Ok(None) => debug!(%ticker, expiration, "no live options chain"),
            Err(error) => warn!(%ticker, expiration, %error, "options chain fetch failed"),
        }

        info!(%ticker, expiration, "falling back to synthetic gamma surface");
        (
            GammaSurface::synthetic(ticker, spot, expiration, self.seed_mode),
            DataSource::Simulation,
        )
    }
}
