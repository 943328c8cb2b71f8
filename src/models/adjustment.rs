//! Manual ranking corrections.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{AdjustmentId, PlayerId};
use crate::snapshot::weeks::monday_of;

/// Which ranking views an adjustment applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentScope {
    Season,
    RollingOnly,
    Both,
}

impl AdjustmentScope {
    /// Applies to season and RtF standings.
    pub fn covers_season(&self) -> bool {
        matches!(self, AdjustmentScope::Season | AdjustmentScope::Both)
    }

    /// Applies to rolling standings.
    pub fn covers_rolling(&self) -> bool {
        matches!(self, AdjustmentScope::RollingOnly | AdjustmentScope::Both)
    }
}

/// A manually entered correction to a player's ranking.
///
/// Active for `duration_weeks` whole weeks starting at `start_monday`.
/// A `start_monday` that is not a Monday is floored to its week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingAdjustment {
    pub id: AdjustmentId,

    pub player_id: PlayerId,

    pub scope: AdjustmentScope,

    pub start_monday: NaiveDate,

    pub duration_weeks: u32,

    /// Signed points added to the total
    #[serde(default)]
    pub points_delta: i64,

    /// Signed change to the number of counted results
    #[serde(default)]
    pub best_n_penalty: i32,

    #[serde(default)]
    pub reason: Option<String>,
}

impl RankingAdjustment {
    pub fn new(
        id: AdjustmentId,
        player_id: PlayerId,
        scope: AdjustmentScope,
        start_monday: NaiveDate,
        duration_weeks: u32,
    ) -> Self {
        Self {
            id,
            player_id,
            scope,
            start_monday,
            duration_weeks,
            points_delta: 0,
            best_n_penalty: 0,
            reason: None,
        }
    }

    /// Builder method to set the points delta.
    pub fn with_points_delta(mut self, delta: i64) -> Self {
        self.points_delta = delta;
        self
    }

    /// Builder method to set the best-N penalty.
    pub fn with_best_n_penalty(mut self, penalty: i32) -> Self {
        self.best_n_penalty = penalty;
        self
    }

    /// Builder method to record why the adjustment was made.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// First Monday of the active window.
    pub fn first_monday(&self) -> NaiveDate {
        monday_of(self.start_monday)
    }

    /// First Monday after the active window (exclusive bound).
    pub fn end_monday(&self) -> NaiveDate {
        self.first_monday() + Duration::weeks(i64::from(self.duration_weeks))
    }

    /// Whether the window covers the week of `date`.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        let monday = monday_of(date);
        self.first_monday() <= monday && monday < self.end_monday()
    }
}
