use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use gex::{
    config::Config,
    error::GexError,
    expiry::{format_expiration, upcoming_expirations},
    report::GammaReport,
    service::{GammaRequest, GammaService},
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info};

/// Weekly expirations listed when the caller does not ask for a count.
const DEFAULT_EXPIRATION_COUNT: usize = 8;
const MAX_EXPIRATION_COUNT: usize = 52;

const CORS_ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

struct AppState {
    service: GammaService,
    live_data: bool,
    started: DateTime<Utc>,
}

/// Success envelope expected by the dashboard.
#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    data: T,
    success: bool,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self { data, success: true })
    }
}

#[derive(Debug)]
struct ApiError(GexError);

impl From<GexError> for ApiError {
    fn from(error: GexError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = if self.0.is_request_error() {
            debug!(error = %self.0, "rejected gamma request");
            (StatusCode::BAD_REQUEST, self.0.to_string())
        } else {
            error!(error = %self.0, "gamma request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            )
        };

        (
            status,
            Json(serde_json::json!({ "error": message, "success": false })),
        )
            .into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct BatchRequest {
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    expirations: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExpirationsQuery {
    count: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_logging();

    let config = Config::from_env();
    info!(
        addr = %config.addr,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        seed_mode = %config.seed_mode,
        live_data = config.live_data,
        "Starting gex-server"
    );

    let state = Arc::new(AppState {
        service: GammaService::from_config(&config)?,
        live_data: config.live_data,
        started: Utc::now(),
    });

    tokio::spawn(purge_expired_reports(state.clone(), config.cache_ttl));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("Gamma endpoint listening on http://{}/gamma", config.addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("gex-server stopped");
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/gamma", post(gamma).options(preflight))
        .route("/gamma/batch", post(gamma_batch).options(preflight))
        .route("/expirations", get(expirations).options(preflight))
        .route("/health", get(health))
        .layer(middleware::map_response(cors))
        .with_state(state)
}

/// Body is parsed by hand so malformed JSON maps onto the 500 envelope rather than axum's
/// own rejection.
async fn gamma(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ApiResponse<GammaReport>>, ApiError> {
    let request = serde_json::from_slice::<GammaRequest>(&body).map_err(GexError::from)?;
    let report = state.service.report(&request).await?;
    Ok(ApiResponse::ok(report))
}

async fn gamma_batch(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ApiResponse<Vec<GammaReport>>>, ApiError> {
    let request = serde_json::from_slice::<BatchRequest>(&body).map_err(GexError::from)?;
    let reports = state
        .service
        .reports(request.ticker.as_deref().unwrap_or_default(), &request.expirations)
        .await?;
    Ok(ApiResponse::ok(reports))
}

async fn expirations(Query(query): Query<ExpirationsQuery>) -> Json<serde_json::Value> {
    let count = query
        .count
        .unwrap_or(DEFAULT_EXPIRATION_COUNT)
        .min(MAX_EXPIRATION_COUNT);

    let expirations = upcoming_expirations(Utc::now().date_naive(), count)
        .into_iter()
        .map(format_expiration)
        .collect::<Vec<_>>();

    Json(serde_json::json!({ "expirations": expirations }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "component": "gex-server",
        "timestamp": Utc::now().to_rfc3339(),
        "started": state.started.to_rfc3339(),
        "liveData": state.live_data,
        "cachedReports": state.service.cache().len(),
    }))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
    response
}

async fn purge_expired_reports(state: Arc<AppState>, period: Duration) {
    let mut ticker = tokio::time::interval(period.max(Duration::from_secs(1)));
    loop {
        ticker.tick().await;
        let purged = state.service.cache().purge_expired();
        if purged > 0 {
            debug!(purged, "purged expired gamma reports");
        }
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("GEX_LOG_JSON")
        .is_ok_and(|value| matches!(value.trim(), "1" | "true"));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Arc<AppState> {
        let config = Config {
            live_data: false,
            ..Config::default()
        };
        Arc::new(AppState {
            service: GammaService::from_config(&config).unwrap(),
            live_data: false,
            started: Utc::now(),
        })
    }

    async fn into_parts(response: Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_gamma_success_envelope() {
        let response = gamma(
            State(state()),
            Bytes::from_static(br#"{"ticker":"spy","expiration":"2026-03-20"}"#),
        )
        .await
        .into_response();

        let (status, body) = into_parts(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["ticker"], "SPY");
        assert_eq!(body["data"]["expiration"], "2026-03-20");
        assert_eq!(body["data"]["spotPrice"], 604.5);
        assert_eq!(body["data"]["source"], "simulation (fallback)");
        assert_eq!(body["data"]["strikes"].as_array().unwrap().len(), 31);
    }

    #[tokio::test]
    async fn test_gamma_error_envelopes() {
        struct TestCase {
            body: &'static [u8],
            expected: (StatusCode, &'static str),
        }

        let tests = vec![
            TestCase {
                // TC0: no ticker
                body: b"{}",
                expected: (StatusCode::BAD_REQUEST, "Ticker is required"),
            },
            TestCase {
                // TC1: blank ticker
                body: br#"{"ticker":"   "}"#,
                expected: (StatusCode::BAD_REQUEST, "Ticker is required"),
            },
            TestCase {
                // TC2: malformed JSON
                body: b"{ticker",
                expected: (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            },
            TestCase {
                // TC3: empty body
                body: b"",
                expected: (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let response = gamma(State(state()), Bytes::from_static(test.body))
                .await
                .into_response();

            let (status, body) = into_parts(response).await;
            assert_eq!(status, test.expected.0, "TC{} failed", index);
            assert_eq!(body["error"], test.expected.1, "TC{} failed", index);
            assert_eq!(body["success"], false, "TC{} failed", index);
        }
    }

    #[tokio::test]
    async fn test_gamma_batch() {
        let response = gamma_batch(
            State(state()),
            Bytes::from_static(br#"{"ticker":"qqq","expirations":["2026-03-20","2026-03-27"]}"#),
        )
        .await
        .into_response();

        let (status, body) = into_parts(response).await;
        assert_eq!(status, StatusCode::OK);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["expiration"], "2026-03-20");
        assert_eq!(data[1]["expiration"], "2026-03-27");
        assert_eq!(data[1]["ticker"], "QQQ");
    }

    #[tokio::test]
    async fn test_expirations_count() {
        let Json(body) = expirations(Query(ExpirationsQuery { count: Some(3) })).await;
        assert_eq!(body["expirations"].as_array().unwrap().len(), 3);

        let Json(body) = expirations(Query(ExpirationsQuery::default())).await;
        assert_eq!(
            body["expirations"].as_array().unwrap().len(),
            DEFAULT_EXPIRATION_COUNT
        );

        let Json(body) = expirations(Query(ExpirationsQuery { count: Some(1_000) })).await;
        assert_eq!(
            body["expirations"].as_array().unwrap().len(),
            MAX_EXPIRATION_COUNT
        );
    }

    #[tokio::test]
    async fn test_health_reports_cache_size() {
        let state = state();
        gamma(State(state.clone()), Bytes::from_static(br#"{"ticker":"dia"}"#))
            .await
            .unwrap();

        let Json(body) = health(State(state)).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["liveData"], false);
        assert_eq!(body["cachedReports"], 1);
    }

    #[tokio::test]
    async fn test_cors_headers_added() {
        let response = cors(StatusCode::INTERNAL_SERVER_ERROR.into_response()).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS],
            CORS_ALLOW_HEADERS
        );
    }
}
