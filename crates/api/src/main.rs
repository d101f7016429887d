mod config;
mod metrics;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use extract::{
    ExtractError, Extractor, GeminiClient, HttpTransport, INSTRUCTION_CONTRACT,
    RetryPolicy, TokioSleeper, Transport,
};
use render::RenderError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info, info_span, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use config::AppConfig;
use metrics::{Metrics, MetricsSnapshot, TimedOperation};

type ChartExtractor = Extractor<Arc<dyn Transport>, TokioSleeper>;

struct AppState {
    extractor: ChartExtractor,
    metrics: Arc<Metrics>,
}

impl AppState {
    fn new(transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
        Self {
            extractor: Extractor::new(GeminiClient::with_parts(transport, TokioSleeper, retry)),
            metrics: Metrics::new(),
        }
    }

    fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(&config.gemini)?;
        Ok(Self::new(
            Arc::new(transport),
            RetryPolicy::from_config(&config.gemini.retry),
        ))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    contract_version: u32,
}

#[derive(Deserialize)]
struct ChartBody {
    /// Free-form article text
    text: String,
}

#[derive(Serialize)]
struct ChartResponse {
    request_id: Uuid,
    title: String,
    kind: extract::ChartKind,
    x_column: String,
    y_column: String,
    svg: String,
    /// Extracted table as the model wrote it, for display next to the chart
    csv: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    request_id: Uuid,
    error: String,
    kind: &'static str,
}

#[derive(Error, Debug)]
enum ApiError {
    #[error("Article text must not be empty")]
    EmptyInput,

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::EmptyInput => "empty_input",
            ApiError::Extract(e) => e.kind().as_str(),
            ApiError::Render(e) => e.kind(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::EmptyInput => StatusCode::BAD_REQUEST,
            ApiError::Extract(e) if e.is_upstream() => StatusCode::BAD_GATEWAY,
            ApiError::Extract(_) | ApiError::Render(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    if config.gemini.api_key.is_empty() {
        warn!("GEMINI_API_KEY is not set; the AI service will reject requests");
    }

    let state = Arc::new(AppState::from_config(&config)?);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;

    info!(
        contract_version = INSTRUCTION_CONTRACT.version,
        max_attempts = config.gemini.retry.max_attempts,
        "Server listening on http://{}",
        config.server.bind_addr
    );

    axum::serve(listener, app(state)).await.context("Server error")?;
    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/chart", post(create_chart))
        .route("/stats", get(get_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        contract_version: INSTRUCTION_CONTRACT.version,
    })
}

async fn create_chart(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChartBody>,
) -> Result<Json<ChartResponse>, (StatusCode, Json<ErrorResponse>)> {
    let request_id = Uuid::new_v4();
    let timer = TimedOperation::start();

    let result = build_chart(&state.extractor, request_id, &body.text)
        .instrument(info_span!("create_chart", %request_id))
        .await;

    state
        .metrics
        .record_request(result.as_ref().err().map(ApiError::kind), timer.elapsed());

    result.map(Json).map_err(|e| {
        warn!(%request_id, kind = e.kind(), error = %e, "Chart request failed");
        (
            e.status(),
            Json(ErrorResponse {
                request_id,
                error: e.to_string(),
                kind: e.kind(),
            }),
        )
    })
}

async fn build_chart(
    extractor: &ChartExtractor,
    request_id: Uuid,
    text: &str,
) -> Result<ChartResponse, ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::EmptyInput);
    }

    let request = extractor.extract_chart(text).await?;
    let chart = render::render(&request)?;

    info!(
        kind = chart.kind.as_str(),
        rows = request.tabular.records().len(),
        "Chart created"
    );

    Ok(ChartResponse {
        request_id,
        title: chart.title,
        kind: chart.kind,
        x_column: request.directive.x_column.clone(),
        y_column: request.directive.y_column.clone(),
        svg: chart.svg,
        csv: request.tabular.text().to_string(),
    })
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
