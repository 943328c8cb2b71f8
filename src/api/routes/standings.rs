use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::{run_blocking, ApiError};
use crate::models::{EntityId, RankingType, SeasonId, StandingsRow};
use crate::snapshot::weeks::monday_of;

#[derive(Debug, Serialize)]
pub struct RankedRow {
    pub rank: u32,
    #[serde(flatten)]
    pub row: StandingsRow,
}

#[derive(Debug, Serialize)]
pub struct StandingsResponse {
    pub view: RankingType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_id: Option<SeasonId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monday: Option<NaiveDate>,
    pub rows: Vec<RankedRow>,
}

fn ranked(rows: Vec<StandingsRow>) -> Vec<RankedRow> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| RankedRow {
            rank: i as u32 + 1,
            row,
        })
        .collect()
}

pub async fn season(
    State(state): State<AppState>,
    Path(season_id): Path<String>,
) -> Result<Json<StandingsResponse>, ApiError> {
    let season_id = EntityId::from(season_id);
    let rows = {
        let season_id = season_id.clone();
        run_blocking(&state, move |svc| svc.calculator().season_standings(&season_id)).await?
    };

    Ok(Json(StandingsResponse {
        view: RankingType::Season,
        season_id: Some(season_id),
        monday: None,
        rows: ranked(rows),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RollingParams {
    pub monday: Option<NaiveDate>,
}

pub async fn rolling(
    State(state): State<AppState>,
    Query(params): Query<RollingParams>,
) -> Result<Json<StandingsResponse>, ApiError> {
    let monday = params
        .monday
        .map(monday_of)
        .unwrap_or_else(|| state.service.current_monday(Utc::now()));
    let rows = run_blocking(&state, move |svc| svc.calculator().rolling_standings(monday)).await?;

    Ok(Json(StandingsResponse {
        view: RankingType::Rolling,
        season_id: None,
        monday: Some(monday),
        rows: ranked(rows),
    }))
}

pub async fn rtf(
    State(state): State<AppState>,
    Path(season_id): Path<String>,
) -> Result<Json<StandingsResponse>, ApiError> {
    let season_id = EntityId::from(season_id);
    let rows = {
        let season_id = season_id.clone();
        run_blocking(&state, move |svc| {
            svc.calculator()
                .rtf_standings(&season_id, &svc.settings().auto_top_categories)
        })
        .await?
    };

    Ok(Json(StandingsResponse {
        view: RankingType::Rtf,
        season_id: Some(season_id),
        monday: None,
        rows: ranked(rows),
    }))
}
