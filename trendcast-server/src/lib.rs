//! HTTP forecast service.
//!
//! Routes:
//! - `POST /prever` and its alias `POST /api/v1/forecast`: one-step forecast
//!   from a price history
//! - `GET /health`: liveness plus the serving provenance and window size
//!
//! All state is built once by [`initialize`] before the listener binds and is
//! shared read-only across handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use trendcast_core::artifacts::{load_serving_artifacts, open_store, ArtifactError};
use trendcast_core::config::AppConfig;
use trendcast_core::domain::{read_provenance, Provenance, ProvenanceError};
use trendcast_core::inference::{
    ForecastError, ForecastResponse, ForecastService, InferenceConfig,
};

// ── State ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    service: Arc<ForecastService>,
    default_ticker: Arc<str>,
}

impl AppState {
    pub fn new(service: ForecastService, default_ticker: &str) -> Self {
        Self {
            service: Arc::new(service),
            default_ticker: Arc::from(default_ticker),
        }
    }

    pub fn service(&self) -> &ForecastService {
        &self.service
    }
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("cannot determine serving provenance: {0}")]
    Provenance(#[from] ProvenanceError),

    #[error("cannot open artifact store: {0}")]
    Store(#[from] ArtifactError),

    #[error("cannot build forecast service: {0}")]
    Service(#[from] ForecastError),
}

/// Read provenance, load the matching artifacts, build the service.
///
/// Blocking: performs filesystem and possibly HTTP I/O.
pub fn initialize(config: &AppConfig) -> Result<AppState, InitError> {
    let provenance = read_provenance(&config.data.provenance_file)?;
    if provenance == Provenance::Synthetic {
        warn!("serving artifacts fitted on synthetic placeholder data");
    }
    let store = open_store(&config.store)?;
    let artifacts = load_serving_artifacts(store.as_ref(), provenance)?;
    let service = ForecastService::from_artifacts(artifacts, InferenceConfig::from(config))?;
    info!(
        %provenance,
        window_size = config.model.window_size,
        range_policy = ?config.inference.range_policy,
        "forecast service ready"
    );
    Ok(AppState::new(service, &config.ticker))
}

// ── Errors ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<ForecastError> for ApiError {
    fn from(e: ForecastError) -> Self {
        if e.is_client_error() {
            ApiError::BadRequest(e.to_string())
        } else {
            ApiError::Internal(e.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::Internal(detail) => {
                error!(%detail, "forecast failed");
                (StatusCode::INTERNAL_SERVER_ERROR, detail)
            }
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub historico: Vec<f64>,
    #[serde(default)]
    pub ticker: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub provenance: Provenance,
    pub window_size: usize,
}

async fn forecast(
    State(state): State<AppState>,
    payload: Result<Json<ForecastRequest>, JsonRejection>,
) -> Result<Json<ForecastResponse>, ApiError> {
    let Json(request) = payload?;
    let ticker = request
        .ticker
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| state.default_ticker.to_string());

    // Exclusive predictors hold a std mutex; keep that off the async workers.
    let service = Arc::clone(&state.service);
    let history = request.historico;
    let result = tokio::task::spawn_blocking(move || service.predict(&history))
        .await
        .map_err(|e| ApiError::Internal(format!("forecast task failed: {e}")))?;

    let forecast = result?;
    Ok(Json(forecast.to_response(&ticker)))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        provenance: state.service.provenance(),
        window_size: state.service.config().window_size,
    })
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/prever", post(forecast))
        .route("/api/v1/forecast", post(forecast))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
