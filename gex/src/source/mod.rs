use crate::{chain::OptionChain, error::GexError, model::Ticker};
use async_trait::async_trait;

/// Yahoo Finance [`QuoteSource`] and [`OptionsChainSource`] with cookie/crumb sessions.
pub mod yahoo;

/// Current spot price for a ticker.
///
/// `Ok(None)` means the upstream answered but had no usable price.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quote(&self, ticker: &Ticker) -> Result<Option<f64>, GexError>;
}

/// Listed options chain for a ticker and expiration.
///
/// `Ok(None)` means the upstream answered but listed no chain.
#[async_trait]
pub trait OptionsChainSource: Send + Sync {
    async fn chain(&self, ticker: &Ticker, expiration: &str) -> Result<Option<OptionChain>, GexError>;
}

/// Source that never has live data, forcing the fallback paths.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Offline;

#[async_trait]
impl QuoteSource for Offline {
    async fn quote(&self, _: &Ticker) -> Result<Option<f64>, GexError> {
        Ok(None)
    }
}

#[async_trait]
impl OptionsChainSource for Offline {
    async fn chain(&self, _: &Ticker, _: &str) -> Result<Option<OptionChain>, GexError> {
        Ok(None)
    }
}
