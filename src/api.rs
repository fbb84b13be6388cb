//! HTTP boundary of the detection service.
//!
//! `POST /detect` validates the payload at the schema layer, flattens it into
//! a feature vector and answers with an unscored verdict. No scoring model
//! exists behind it.

use crate::feature_extractor::FeatureExtractor;
use crate::types::detection::{DetectionRequest, DetectionVerdict};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Malformed request: {0}")]
    MalformedJson(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::MalformedJson(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::MalformedJson(_) => "MALFORMED_JSON",
            ApiError::UnsupportedMediaType(_) => "UNSUPPORTED_MEDIA_TYPE",
            ApiError::NotFound(_) => "NOT_FOUND",
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::Validation(msg)
            | ApiError::MalformedJson(msg)
            | ApiError::UnsupportedMediaType(msg)
            | ApiError::NotFound(msg) => msg,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError::Validation(e.body_text()),
            JsonRejection::JsonSyntaxError(e) => ApiError::MalformedJson(e.body_text()),
            JsonRejection::MissingJsonContentType(e) => {
                ApiError::UnsupportedMediaType(e.body_text())
            }
            other => ApiError::MalformedJson(other.body_text()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(code = self.code(), message = %self.message(), "Request rejected");

        let body = ApiErrorResponse {
            success: false,
            error: ApiErrorBody {
                code: self.code().to_string(),
                message: self.message().to_string(),
                details: None,
            },
        };

        (self.status_code(), Json(body)).into_response()
    }
}

/// Shared handler state
#[derive(Clone, Default)]
pub struct AppState {
    extractor: Arc<FeatureExtractor>,
    /// Requests that made it past validation into feature extraction
    extractions: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(extractor: FeatureExtractor) -> Self {
        Self {
            extractor: Arc::new(extractor),
            extractions: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn extractions(&self) -> u64 {
        self.extractions.load(Ordering::Relaxed)
    }
}

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(read_root))
        .route("/items/:item_id", get(read_item))
        .route("/detect", post(detect))
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Liveness
async fn read_root() -> Json<Value> {
    Json(json!({ "Hello": "World" }))
}

#[derive(Debug, Deserialize)]
struct ItemQuery {
    q: Option<String>,
}

async fn read_item(
    item_id: Result<Path<i64>, PathRejection>,
    Query(query): Query<ItemQuery>,
) -> Result<Json<Value>, ApiError> {
    let Path(item_id) = item_id?;
    Ok(Json(json!({ "item_id": item_id, "q": query.q })))
}

async fn detect(
    State(state): State<AppState>,
    payload: Result<Json<DetectionRequest>, JsonRejection>,
) -> Result<Json<DetectionVerdict>, ApiError> {
    let Json(request) = payload?;

    let features = state.extractor.extract(&request);
    state.extractions.fetch_add(1, Ordering::Relaxed);

    debug!(
        transaction_id = %request.transaction.transaction_id,
        features = ?features.to_model_input(),
        "Features extracted"
    );
    info!(
        transaction_id = %request.transaction.transaction_id,
        account_id = %request.transaction.account_id,
        "Detection request accepted; scoring not implemented"
    );

    Ok(Json(DetectionVerdict::unscored(&request, features)))
}

async fn not_found(uri: axum::http::Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {uri}"))
}
