use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::{require_admin, run_blocking, ApiError};
use crate::models::{EntityId, PlayerId, TournamentId};

#[derive(Debug, Deserialize)]
pub struct PointsParams {
    pub only_completed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct PlayerPoints {
    pub player_id: PlayerId,
    pub qual_wins: i64,
    pub md_points: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct PointsResponse {
    pub tournament_id: TournamentId,
    pub only_completed_rounds: bool,
    pub players: Vec<PlayerPoints>,
}

pub async fn tournament_points(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PointsParams>,
) -> Result<Json<PointsResponse>, ApiError> {
    let tournament_id = EntityId::from(id);
    let only_completed = params
        .only_completed
        .unwrap_or(state.service.settings().only_completed_rounds);

    let points = {
        let tournament_id = tournament_id.clone();
        run_blocking(&state, move |svc| {
            svc.calculator()
                .points_for_tournament(&tournament_id, only_completed)
        })
        .await?
    };

    let mut players: Vec<PlayerPoints> = points
        .into_iter()
        .map(|(player_id, b)| PlayerPoints {
            player_id,
            qual_wins: b.qual_wins,
            md_points: b.md_points,
            total: b.total,
        })
        .collect();
    players.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.player_id.cmp(&b.player_id)));

    Ok(Json(PointsResponse {
        tournament_id,
        only_completed_rounds: only_completed,
        players,
    }))
}

#[derive(Debug, Serialize)]
pub struct SeedingBaselineResponse {
    pub tournament_id: TournamentId,
    pub seeding_monday: NaiveDate,
}

pub async fn seeding_baseline(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<SeedingBaselineResponse>, ApiError> {
    let admin = require_admin(&headers, &state)?;
    let tournament_id = EntityId::from(id);
    let seeding_monday = {
        let tournament_id = tournament_id.clone();
        run_blocking(&state, move |svc| {
            svc.ensure_seeding_baseline(&admin, &tournament_id)
        })
        .await?
    };

    Ok(Json(SeedingBaselineResponse {
        tournament_id,
        seeding_monday,
    }))
}
