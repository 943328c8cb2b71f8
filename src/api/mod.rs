//! REST API endpoints.
//!
//! Axum-based HTTP API over tournament points, standings views and
//! weekly ranking snapshots. Mutating routes require the admin token.

pub mod routes;
pub mod state;

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::calculate::{ErrorKind, RankingError};
use crate::snapshot::{AdminCapability, SnapshotError, SnapshotService};
use state::AppState;

/// Header carrying the admin token.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Admin token required")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Unprocessable(_) => (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<RankingError> for ApiError {
    fn from(e: RankingError) -> Self {
        match e {
            RankingError::TournamentNotFound(_) | RankingError::SeasonNotFound(_) => {
                ApiError::NotFound(e.to_string())
            }
            other => by_kind(other.kind(), other.to_string()),
        }
    }
}

impl From<SnapshotError> for ApiError {
    fn from(e: SnapshotError) -> Self {
        match e {
            SnapshotError::Ranking(inner) => inner.into(),
            other => by_kind(other.kind(), other.to_string()),
        }
    }
}

fn by_kind(kind: ErrorKind, message: String) -> ApiError {
    match kind {
        ErrorKind::Staleness => ApiError::Conflict(message),
        ErrorKind::Validation => ApiError::Unprocessable(message),
        ErrorKind::Configuration | ErrorKind::Storage => {
            tracing::error!("{}", message);
            ApiError::Internal(message)
        }
    }
}

/// Run a snapshot service call on the blocking pool.
///
/// Service calls take std locks and do synchronous file I/O.
pub async fn run_blocking<T, E, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
    F: FnOnce(&SnapshotService) -> Result<T, E> + Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| {
            tracing::error!("Blocking task failed: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(Into::into)
}

/// Mint an admin capability from the request headers.
pub fn require_admin(headers: &HeaderMap, state: &AppState) -> Result<AdminCapability, ApiError> {
    let presented = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    AdminCapability::from_token(presented, state.server.admin_token.as_deref())
        .ok_or(ApiError::Unauthorized)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
            layer
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.server.cors_origin);

    Router::new()
        .route("/api/health", get(routes::health::health))
        .route(
            "/api/tournaments/:id/points",
            get(routes::points::tournament_points),
        )
        .route(
            "/api/tournaments/:id/seeding-baseline",
            post(routes::points::seeding_baseline),
        )
        .route(
            "/api/standings/season/:season_id",
            get(routes::standings::season),
        )
        .route("/api/standings/rolling", get(routes::standings::rolling))
        .route("/api/standings/rtf/:season_id", get(routes::standings::rtf))
        .route(
            "/api/snapshots/retention",
            post(routes::snapshots::retention),
        )
        .route(
            "/api/snapshots/:type/:monday",
            get(routes::snapshots::official),
        )
        .route(
            "/api/snapshots/:type/:monday/preview",
            get(routes::snapshots::preview),
        )
        .route(
            "/api/snapshots/:type/:monday/confirm",
            post(routes::snapshots::confirm),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
