//! Seasons.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::SeasonId;

/// A ranking season.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,

    pub name: String,

    pub start_date: NaiveDate,

    pub end_date: NaiveDate,

    /// Number of results counted toward a player's total
    pub best_n: u32,
}

impl Season {
    pub fn new(
        id: SeasonId,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        best_n: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            start_date,
            end_date,
            best_n,
        }
    }

    /// Check if a date falls within the season (inclusive on both ends).
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}
