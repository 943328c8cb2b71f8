use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::{require_admin, run_blocking, ApiError};
use crate::models::{RankingSnapshot, RankingType};
use crate::snapshot::{ConfirmOutcome, OfficialSnapshot, Preview, RetentionReport};

fn parse_type(raw: &str) -> Result<RankingType, ApiError> {
    raw.parse::<RankingType>().map_err(ApiError::BadRequest)
}

pub async fn preview(
    State(state): State<AppState>,
    Path((ranking_type, monday)): Path<(String, NaiveDate)>,
) -> Result<Json<Preview>, ApiError> {
    let ranking_type = parse_type(&ranking_type)?;
    let preview = run_blocking(&state, move |svc| svc.build_preview(ranking_type, monday)).await?;
    Ok(Json(preview))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub expected_hash: String,
    pub created_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub status: &'static str,
    pub snapshot: RankingSnapshot,
}

pub async fn confirm(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((ranking_type, monday)): Path<(String, NaiveDate)>,
    Json(body): Json<ConfirmRequest>,
) -> Result<(StatusCode, Json<ConfirmResponse>), ApiError> {
    let admin = require_admin(&headers, &state)?;
    let ranking_type = parse_type(&ranking_type)?;
    let created_by = body.created_by.unwrap_or_else(|| "api".to_string());

    let outcome = run_blocking(&state, move |svc| {
        svc.confirm_snapshot(&admin, ranking_type, monday, &body.expected_hash, &created_by)
    })
    .await?;

    let status = match outcome {
        ConfirmOutcome::Existing(_) => StatusCode::OK,
        _ => StatusCode::CREATED,
    };
    Ok((
        status,
        Json(ConfirmResponse {
            status: outcome.status(),
            snapshot: outcome.snapshot().clone(),
        }),
    ))
}

pub async fn official(
    State(state): State<AppState>,
    Path((ranking_type, monday)): Path<(String, NaiveDate)>,
) -> Result<Json<OfficialSnapshot>, ApiError> {
    let ranking_type = parse_type(&ranking_type)?;
    run_blocking(&state, move |svc| svc.get_official_snapshot(ranking_type, monday))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("{} snapshot for {}", ranking_type, monday)))
}

#[derive(Debug, Default, Deserialize)]
pub struct RetentionRequest {
    pub full_weeks_to_keep: Option<u32>,
}

pub async fn retention(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RetentionRequest>,
) -> Result<Json<RetentionReport>, ApiError> {
    let admin = require_admin(&headers, &state)?;
    let keep = body
        .full_weeks_to_keep
        .unwrap_or(state.service.settings().retention_full_weeks);
    if keep == 0 {
        return Err(ApiError::BadRequest(
            "full_weeks_to_keep must be at least 1".to_string(),
        ));
    }

    let report = run_blocking(&state, move |svc| svc.retention_gc(&admin, keep)).await?;
    Ok(Json(report))
}
