//! Persisted weekly ranking snapshots.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, PlayerId, SnapshotId};

/// The three ranking views. Also selects the tie-break chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RankingType {
    Rolling,
    Season,
    Rtf,
}

impl RankingType {
    pub const ALL: [RankingType; 3] = [RankingType::Rolling, RankingType::Season, RankingType::Rtf];

    pub fn as_str(&self) -> &'static str {
        match self {
            RankingType::Rolling => "ROLLING",
            RankingType::Season => "SEASON",
            RankingType::Rtf => "RTF",
        }
    }

    /// Season-based views rank by average before best-N points.
    pub fn uses_average(&self) -> bool {
        matches!(self, RankingType::Season | RankingType::Rtf)
    }
}

impl fmt::Display for RankingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ROLLING" => Ok(RankingType::Rolling),
            "SEASON" => Ok(RankingType::Season),
            "RTF" => Ok(RankingType::Rtf),
            other => Err(format!("unknown ranking type: {}", other)),
        }
    }
}

/// One row of a snapshot payload.
///
/// Field order is the canonical key order used for hashing and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub player_id: PlayerId,
    pub points: i64,
    pub average: f64,
    pub best_n_points: i64,
    pub events_in_window: u32,
    pub best_single: i64,
}

/// A confirmed ranking for one `(type, monday)`.
///
/// `payload` is `None` exactly when `is_alias` is set; the payload then lives
/// on the snapshot named by `alias_of`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingSnapshot {
    pub id: SnapshotId,

    #[serde(rename = "type")]
    pub ranking_type: RankingType,

    pub monday: NaiveDate,

    /// Hex SHA256 of the canonical payload
    pub hash: String,

    pub payload: Option<Vec<SnapshotItem>>,

    pub created_by: String,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub is_alias: bool,

    #[serde(default)]
    pub alias_of: Option<SnapshotId>,
}

impl RankingSnapshot {
    /// Deterministic id for a snapshot key.
    pub fn key_id(ranking_type: RankingType, monday: NaiveDate) -> SnapshotId {
        EntityId::generate(&[ranking_type.as_str(), &monday.to_string()])
    }

    /// A snapshot holding its own payload.
    pub fn full(
        ranking_type: RankingType,
        monday: NaiveDate,
        hash: String,
        payload: Vec<SnapshotItem>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Self::key_id(ranking_type, monday),
            ranking_type,
            monday,
            hash,
            payload: Some(payload),
            created_by: created_by.into(),
            created_at: Utc::now(),
            is_alias: false,
            alias_of: None,
        }
    }

    /// A snapshot pointing at `target` for its payload.
    pub fn alias(
        ranking_type: RankingType,
        monday: NaiveDate,
        target: &RankingSnapshot,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Self::key_id(ranking_type, monday),
            ranking_type,
            monday,
            hash: target.hash.clone(),
            payload: None,
            created_by: created_by.into(),
            created_at: Utc::now(),
            is_alias: true,
            alias_of: Some(target.id.clone()),
        }
    }

    /// Drop the payload and point at another snapshot instead.
    pub fn collapse_into(&mut self, target: &SnapshotId) {
        self.payload = None;
        self.is_alias = true;
        self.alias_of = Some(target.clone());
    }

    /// Take over a payload, turning an alias into a payload holder.
    pub fn promote(&mut self, payload: Vec<SnapshotItem>) {
        self.payload = Some(payload);
        self.is_alias = false;
        self.alias_of = None;
    }

    /// `payload` is null iff `is_alias`.
    pub fn is_consistent(&self) -> bool {
        self.is_alias == self.payload.is_none() && self.is_alias == self.alias_of.is_some()
    }
}
