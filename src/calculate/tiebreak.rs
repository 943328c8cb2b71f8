//! Deterministic ordering of standings rows and their snapshot shape.

use std::cmp::Ordering;

use crate::models::{PlayerId, RankingType, SnapshotItem, StandingsRow};

/// Sort key for a standings row. Smaller keys rank higher.
///
/// Chain: points, average (season views only), best-N points, events in
/// window, best single result, all descending; then player id ascending.
#[derive(Debug, Clone)]
pub struct TiebreakKey {
    points: i64,
    average: Option<f64>,
    best_n_points: i64,
    events_in_window: u32,
    best_single: i64,
    player_id: PlayerId,
}

impl Ord for TiebreakKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .points
            .cmp(&self.points)
            .then_with(|| match (self.average, other.average) {
                (Some(a), Some(b)) => b.total_cmp(&a),
                _ => Ordering::Equal,
            })
            .then_with(|| other.best_n_points.cmp(&self.best_n_points))
            .then_with(|| other.events_in_window.cmp(&self.events_in_window))
            .then_with(|| other.best_single.cmp(&self.best_single))
            .then_with(|| self.player_id.cmp(&other.player_id))
    }
}

impl PartialOrd for TiebreakKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TiebreakKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TiebreakKey {}

/// Build the sort key for a row under the given view's chain.
pub fn tiebreak_key(mode: RankingType, row: &StandingsRow) -> TiebreakKey {
    TiebreakKey {
        points: row.points,
        average: mode.uses_average().then_some(row.average),
        best_n_points: row.best_n_points,
        events_in_window: row.events_in_window,
        best_single: row.best_single,
        player_id: row.player_id.clone(),
    }
}

/// Sort rows in place by the view's tie-break chain.
pub fn sort_rows(mode: RankingType, rows: &mut [StandingsRow]) {
    rows.sort_by_cached_key(|row| tiebreak_key(mode, row));
}

/// Canonical snapshot item for a row.
pub fn to_snapshot_item(row: &StandingsRow) -> SnapshotItem {
    SnapshotItem {
        player_id: row.player_id.clone(),
        points: row.points,
        average: row.average,
        best_n_points: row.best_n_points,
        events_in_window: row.events_in_window,
        best_single: row.best_single,
    }
}
