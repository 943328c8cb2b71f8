//! Computed points and standings rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::PlayerId;

/// Points one player earned at one tournament.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsBreakdown {
    pub qual_wins: i64,
    pub md_points: i64,
    pub total: i64,
}

impl PointsBreakdown {
    pub fn new(qual_wins: i64, md_points: i64) -> Self {
        Self {
            qual_wins,
            md_points,
            total: qual_wins + md_points,
        }
    }
}

/// Per-player points for a single tournament, ordered by player id.
pub type TournamentPoints = BTreeMap<PlayerId, PointsBreakdown>;

/// A player's aggregated record in one ranking view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub player_id: PlayerId,

    /// Counted points plus adjustment deltas
    pub points: i64,

    /// Mean of the counted results
    pub average: f64,

    /// Sum of the counted results
    pub best_n_points: i64,

    /// Number of results in the window
    pub events_in_window: u32,

    /// Highest single result
    pub best_single: i64,

    /// Counted results, descending
    pub counted: Vec<i64>,

    /// Results beyond the counted set, descending
    pub dropped: Vec<i64>,

    /// Sum of adjustment point deltas
    pub adjustment_points: i64,

    /// Placed at the top by an RtF category win
    #[serde(default)]
    pub pinned: bool,
}

impl StandingsRow {
    /// A row with no results, used for players pinned without season points.
    pub fn empty(player_id: PlayerId) -> Self {
        Self {
            player_id,
            points: 0,
            average: 0.0,
            best_n_points: 0,
            events_in_window: 0,
            best_single: 0,
            counted: Vec::new(),
            dropped: Vec::new(),
            adjustment_points: 0,
            pinned: false,
        }
    }
}
