//! Route handlers

use crate::error::ApiError;
use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use smell_config::logging::request_span;
use smell_config::{DefaultsSource, LoadedDefaults};
use smell_foundation::{AnalysisRequest, AnalysisResponse, ErrorBody, SmellKind};
use std::sync::Arc;
use tracing::{debug, Instrument};
use uuid::Uuid;

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Application version
    pub version: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
}

/// One registry kind and its current default
#[derive(Debug, Serialize)]
pub struct SmellEntry {
    pub name: SmellKind,
    pub enabled: bool,
}

/// Current registry defaults, in registry order
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmellsResponse {
    pub smells: Vec<SmellEntry>,
    /// `builtin`, or the path of the defaults file in effect
    pub source: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored_keys: Vec<String>,
}

impl From<&LoadedDefaults> for SmellsResponse {
    fn from(loaded: &LoadedDefaults) -> Self {
        Self {
            smells: SmellKind::ALL
                .iter()
                .map(|kind| SmellEntry {
                    name: *kind,
                    enabled: loaded.config.is_enabled(*kind),
                })
                .collect(),
            source: match &loaded.source {
                DefaultsSource::Builtin => "builtin".to_string(),
                DefaultsSource::File(path) => path.display().to_string(),
            },
            ignored_keys: loaded.ignored_keys.clone(),
        }
    }
}

/// `POST /api/analyze`
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let Json(request) = payload.map_err(reject_body)?;
    let request_id = Uuid::new_v4().to_string();
    let span = request_span(&request_id);

    async {
        debug!(files = request.files.len(), "Analysis request received");
        let response = state.pipeline.run_with_id(&request_id, request).await?;
        Ok::<_, ApiError>(Json(response))
    }
    .instrument(span)
    .await
}

/// `GET /api/smells`
pub async fn list_smells(State(state): State<Arc<AppState>>) -> Json<SmellsResponse> {
    let snapshot = state.pipeline.registry().snapshot();
    Json(SmellsResponse::from(snapshot.as_ref()))
}

/// `POST /admin/reload-defaults`
pub async fn reload_defaults(State(state): State<Arc<AppState>>) -> Json<SmellsResponse> {
    let registry = state.pipeline.registry().clone();
    // File I/O off the async workers
    let loaded = match tokio::task::spawn_blocking(move || registry.reload()).await {
        Ok(loaded) => loaded,
        Err(_) => state.pipeline.registry().snapshot(),
    };
    Json(SmellsResponse::from(loaded.as_ref()))
}

/// `GET /health`
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

fn reject_body(rejection: JsonRejection) -> ApiError {
    let status = rejection.status();
    let error = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "Request body too large"
    } else {
        "Invalid request body"
    };
    ApiError::Rejected {
        status: if status.is_client_error() {
            status
        } else {
            StatusCode::BAD_REQUEST
        },
        body: ErrorBody::with_details(error, rejection.body_text()),
    }
}
