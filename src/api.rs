use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::digest::DigestAggregate;
use crate::validate::{Issue, ValidationSummary, Validator, ValidatorSettings};

#[derive(Clone)]
pub struct AppState {
    pub validator: Arc<Validator>,
    /// Rendered on `/metrics` when a recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(validator: Validator) -> Self {
        Self {
            validator: Arc::new(validator),
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/validate", post(validate))
        .route("/validate/issues", post(validate_issues))
        .route("/settings", get(settings))
        .route("/metrics", get(prometheus))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn parse_body(body: Value) -> Result<DigestAggregate, Response> {
    DigestAggregate::from_value(body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response()
    })
}

async fn validate(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ValidationSummary>, Response> {
    let digest = parse_body(body)?;
    let summary = state.validator.get_validation_summary(&digest);
    tracing::debug!(
        is_valid = summary.is_valid,
        error_count = summary.error_count,
        "validated digest over http"
    );
    Ok(Json(summary))
}

/// Same checks, structured `(kind, section, message)` records.
async fn validate_issues(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Vec<Issue>>, Response> {
    let digest = parse_body(body)?;
    Ok(Json(state.validator.issues(&digest)))
}

async fn settings(State(state): State<AppState>) -> Json<ValidatorSettings> {
    Json(state.validator.settings().clone())
}

async fn prometheus(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(h) => h.render().into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed",
        )
            .into_response(),
    }
}
