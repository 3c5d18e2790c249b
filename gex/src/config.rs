//! Environment-driven configuration.
//!
//! Every setting has a default; invalid values are logged and replaced by the default.

use crate::{
    cache::DEFAULT_CACHE_TTL,
    seed::SeedMode,
    source::yahoo::YahooConfig,
};
use std::{net::SocketAddr, str::FromStr, time::Duration};
use tracing::warn;
use url::Url;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, PartialEq, Debug)]
pub struct Config {
    /// HTTP listen address (`GEX_ADDR`).
    pub addr: SocketAddr,
    /// Surface cache freshness window (`GEX_CACHE_TTL_SECS`).
    pub cache_ttl: Duration,
    /// Seed scrambler for synthetic surfaces and fallback prices (`GEX_SEED_MODE`).
    pub seed_mode: SeedMode,
    /// Query upstream sources at all (`GEX_LIVE_DATA`).
    pub live_data: bool,
    pub yahoo: YahooConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cache_ttl: DEFAULT_CACHE_TTL,
            seed_mode: SeedMode::default(),
            live_data: true,
            yahoo: YahooConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Used by [`Config::from_env`] and tests.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            addr: parse_or("GEX_ADDR", &lookup, defaults.addr),
            cache_ttl: Duration::from_secs(parse_or(
                "GEX_CACHE_TTL_SECS",
                &lookup,
                defaults.cache_ttl.as_secs(),
            )),
            seed_mode: parse_or("GEX_SEED_MODE", &lookup, defaults.seed_mode),
            live_data: parse_bool_or("GEX_LIVE_DATA", &lookup, defaults.live_data),
            yahoo: YahooConfig {
                query1: url_or("YAHOO_QUERY1_URL", &lookup, defaults.yahoo.query1),
                query2: url_or("YAHOO_QUERY2_URL", &lookup, defaults.yahoo.query2),
                cookie: url_or("YAHOO_COOKIE_URL", &lookup, defaults.yahoo.cookie),
                timeout: Duration::from_secs(parse_or(
                    "GEX_HTTP_TIMEOUT_SECS",
                    &lookup,
                    DEFAULT_HTTP_TIMEOUT.as_secs(),
                )),
            },
        }
    }
}

fn parse_or<F, T>(key: &str, lookup: &F, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Debug,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|error| {
            warn!(key, value = %raw, %error, ?default, "invalid config value, using default");
            default
        }),
    }
}

fn parse_bool_or<F>(key: &str, lookup: &F, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|raw| raw.trim().to_ascii_lowercase()) {
        None => default,
        Some(raw) => match raw.as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                warn!(key, value = %raw, default, "invalid boolean config value, using default");
                default
            }
        },
    }
}

/// Base URLs are joined with relative paths, so they must end with a slash.
fn url_or<F>(key: &str, lookup: &F, default: Url) -> Url
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    let raw = raw.trim();
    let normalised = if raw.ends_with('/') { raw.to_string() } else { format!("{raw}/") };

    Url::parse(&normalised).unwrap_or_else(|error| {
        warn!(key, value = %raw, %error, %default, "invalid URL config value, using default");
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config, Config::default());
        assert_eq!(config.addr.to_string(), DEFAULT_ADDR);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.yahoo.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("GEX_ADDR", "127.0.0.1:9100"),
            ("GEX_CACHE_TTL_SECS", "60"),
            ("GEX_SEED_MODE", "splitmix"),
            ("GEX_LIVE_DATA", "false"),
            ("GEX_HTTP_TIMEOUT_SECS", "3"),
            ("YAHOO_QUERY1_URL", "http://127.0.0.1:9999"),
        ]));

        assert_eq!(config.addr, "127.0.0.1:9100".parse::<SocketAddr>().unwrap());
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.seed_mode, SeedMode::SplitMix);
        assert!(!config.live_data);
        assert_eq!(config.yahoo.timeout, Duration::from_secs(3));
        assert_eq!(config.yahoo.query1.as_str(), "http://127.0.0.1:9999/");
        assert_eq!(config.yahoo.query2.as_str(), "https://query2.finance.yahoo.com/");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("GEX_ADDR", "not-an-addr"),
            ("GEX_CACHE_TTL_SECS", "-5"),
            ("GEX_SEED_MODE", "xorshift"),
            ("GEX_LIVE_DATA", "maybe"),
            ("YAHOO_COOKIE_URL", "::nope"),
        ]));
        assert_eq!(config, Config::default());
    }
}
