use super::{OptionsChainSource, QuoteSource};
use crate::{chain::OptionChain, error::GexError, expiry::expiration_timestamp, model::Ticker};
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{COOKIE, SET_COOKIE, USER_AGENT},
    redirect::Policy,
};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_QUERY1_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_QUERY2_URL: &str = "https://query2.finance.yahoo.com";
pub const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Endpoints and transport settings for [`YahooClient`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct YahooConfig {
    /// Quote and crumb host.
    pub query1: Url,
    /// Options host.
    pub query2: Url,
    /// Host that hands out the session cookie via a redirect.
    pub cookie: Url,
    pub timeout: Duration,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            query1: Url::parse(DEFAULT_QUERY1_URL).expect("valid default URL"),
            query2: Url::parse(DEFAULT_QUERY2_URL).expect("valid default URL"),
            cookie: Url::parse(DEFAULT_COOKIE_URL).expect("valid default URL"),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Cookie and crumb Yahoo requires on query endpoints.
#[derive(Clone, PartialEq, Eq, Debug)]
struct YahooSession {
    cookie: String,
    crumb: String,
}

/// Wait this long after a failed session attempt before trying again.
const SESSION_RETRY_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct SessionState {
    session: Option<YahooSession>,
    failed_at: Option<Instant>,
}

/// Yahoo Finance client.
///
/// The session is established lazily on first use and reused until a request fails with
/// an auth status, at which point it is dropped and re-established on the next call.
/// Requests still go out without a session if one cannot be obtained, while another task
/// is establishing it, or within [`SESSION_RETRY_BACKOFF`] of a failed attempt.
#[derive(Debug)]
pub struct YahooClient {
    http: Client,
    config: YahooConfig,
    state: parking_lot::Mutex<SessionState>,
    init: Mutex<()>,
}

impl YahooClient {
    pub fn new(config: YahooConfig) -> Result<Self, GexError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            http,
            config,
            state: parking_lot::Mutex::new(SessionState::default()),
            init: Mutex::new(()),
        })
    }

    /// `Some` when no session attempt is due: the cached session, or `None` while backing off.
    fn settled_session(&self) -> Option<Option<YahooSession>> {
        let state = self.state.lock();
        let backing_off = state
            .failed_at
            .is_some_and(|failed_at| failed_at.elapsed() < SESSION_RETRY_BACKOFF);

        (state.session.is_some() || backing_off).then(|| state.session.clone())
    }

    async fn session(&self) -> Option<YahooSession> {
        if let Some(session) = self.settled_session() {
            return session;
        }

        let Ok(_init) = self.init.try_lock() else {
            debug!("Yahoo session being established by another request, continuing without crumb");
            return None;
        };

        // Another request may have finished an attempt before we took the lock
        if let Some(session) = self.settled_session() {
            return session;
        }

        let result = self.init_session().await;

        let mut state = self.state.lock();
        match result {
            Ok(session) => {
                info!("Yahoo session established");
                state.session = Some(session.clone());
                state.failed_at = None;
                Some(session)
            }
            Err(error) => {
                warn!(%error, "Yahoo session unavailable, continuing without crumb");
                state.failed_at = Some(Instant::now());
                None
            }
        }
    }

    async fn init_session(&self) -> Result<YahooSession, GexError> {
        let response = self
            .http
            .get(self.config.cookie.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await?;

        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(first_cookie_pair)
            .ok_or_else(|| GexError::Session("no cookie in response".to_string()))?;
        debug!("Yahoo cookie acquired");

        let crumb_url = self.config.query1.join("v1/test/getcrumb")?;
        let response = self
            .http
            .get(crumb_url.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(COOKIE, &cookie)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GexError::Status {
                url: crumb_url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let crumb = response.text().await?.trim().to_string();
        if crumb.is_empty() {
            return Err(GexError::Session("empty crumb".to_string()));
        }

        Ok(YahooSession { cookie, crumb })
    }

    /// GET `url` with the session cookie and crumb attached, returning the body text.
    async fn get_text(&self, mut url: Url) -> Result<String, GexError> {
        let session = self.session().await;

        if let Some(session) = &session {
            url.query_pairs_mut().append_pair("crumb", &session.crumb);
        }

        let mut request = self.http.get(url.clone()).header(USER_AGENT, BROWSER_USER_AGENT);
        if let Some(session) = &session {
            request = request.header(COOKIE, &session.cookie);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            if status.as_u16() == 401 || status.as_u16() == 403 {
                debug!(%status, "dropping Yahoo session after auth failure");
                self.state.lock().session = None;
            }
            return Err(GexError::Status {
                url: redact_crumb(&url),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    fn quote_url(&self, ticker: &Ticker) -> Result<Url, GexError> {
        let mut url = ticker_url(&self.config.query1, "v8/finance/chart/", ticker)?;
        url.query_pairs_mut()
            .append_pair("interval", "1d")
            .append_pair("range", "1d");
        Ok(url)
    }

    fn chain_url(&self, ticker: &Ticker, expiration: &str) -> Result<Url, GexError> {
        let mut url = ticker_url(&self.config.query2, "v7/finance/options/", ticker)?;
        if let Some(timestamp) = expiration_timestamp(expiration) {
            url.query_pairs_mut()
                .append_pair("date", &timestamp.to_string());
        }
        Ok(url)
    }
}

/// `base` joined with `path`, then the ticker as a single escaped path segment.
fn ticker_url(base: &Url, path: &str, ticker: &Ticker) -> Result<Url, GexError> {
    let mut url = base.join(path)?;
    url.path_segments_mut()
        .map_err(|_| GexError::Config(format!("not a base URL: {base}")))?
        .pop_if_empty()
        .push(ticker.as_str());
    Ok(url)
}

#[async_trait]
impl QuoteSource for YahooClient {
    async fn quote(&self, ticker: &Ticker) -> Result<Option<f64>, GexError> {
        let body = self.get_text(self.quote_url(ticker)?).await?;
        parse_quote(&body)
    }
}

#[async_trait]
impl OptionsChainSource for YahooClient {
    async fn chain(&self, ticker: &Ticker, expiration: &str) -> Result<Option<OptionChain>, GexError> {
        let body = self.get_text(self.chain_url(ticker, expiration)?).await?;
        parse_chain(&body)
    }
}

fn first_cookie_pair(set_cookie: &str) -> Option<String> {
    set_cookie
        .split(';')
        .next()
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(str::to_string)
}

fn redact_crumb(url: &Url) -> String {
    let mut redacted = url.clone();
    redacted.set_query(None);
    redacted.to_string()
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    regular_market_price: Option<f64>,
}

/// `chart.result[0].meta.regularMarketPrice`, if positive.
fn parse_quote(body: &str) -> Result<Option<f64>, GexError> {
    let response = serde_json::from_str::<ChartResponse>(body)?;
    Ok(response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .and_then(|result| result.meta.regular_market_price)
        .filter(|price| price.is_finite() && *price > 0.0))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsResponse {
    option_chain: OptionsResult,
}

#[derive(Debug, Deserialize)]
struct OptionsResult {
    #[serde(default)]
    result: Option<Vec<OptionsQuote>>,
}

#[derive(Debug, Deserialize)]
struct OptionsQuote {
    #[serde(default)]
    options: Vec<OptionChain>,
}

/// `optionChain.result[0].options[0]`, if it lists any contracts.
fn parse_chain(body: &str) -> Result<Option<OptionChain>, GexError> {
    let response = serde_json::from_str::<OptionsResponse>(body)?;
    Ok(response
        .option_chain
        .result
        .and_then(|results| results.into_iter().next())
        .and_then(|quote| quote.options.into_iter().next())
        .filter(|chain| !chain.is_empty()))
}
