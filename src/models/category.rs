//! Per-category, per-season draw and scoring configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{CategorySeasonId, SeasonId};

/// Sparse points table keyed by round label. Missing keys are worth zero.
pub type ScoringTable = BTreeMap<String, i64>;

/// Configuration of one category within one season.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySeason {
    pub id: CategorySeasonId,

    /// Category name, e.g. "Platinum"
    pub category: String,

    pub season_id: SeasonId,

    /// Configured main draw size (not necessarily a power of two)
    pub draw_size: u32,

    #[serde(default)]
    pub qualifier_count: u32,

    /// Main draw result label -> points
    #[serde(default)]
    pub scoring_md: ScoringTable,

    /// Qualification round label -> points per win
    #[serde(default)]
    pub scoring_qual_win: ScoringTable,
}

impl CategorySeason {
    pub fn new(
        id: CategorySeasonId,
        category: impl Into<String>,
        season_id: SeasonId,
        draw_size: u32,
    ) -> Self {
        Self {
            id,
            category: category.into(),
            season_id,
            draw_size,
            qualifier_count: 0,
            scoring_md: ScoringTable::new(),
            scoring_qual_win: ScoringTable::new(),
        }
    }

    /// Builder method to set the main draw table.
    pub fn with_scoring_md(mut self, entries: &[(&str, i64)]) -> Self {
        self.scoring_md = entries.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        self
    }

    /// Builder method to set the qualification table.
    pub fn with_scoring_qual_win(mut self, entries: &[(&str, i64)]) -> Self {
        self.scoring_qual_win = entries.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        self
    }

    /// Main draw points for a result label.
    pub fn main_draw_points(&self, label: &str) -> i64 {
        self.scoring_md.get(label).copied().unwrap_or(0)
    }

    /// Points for one qualification win in the given round.
    pub fn qualification_win_points(&self, label: &str) -> i64 {
        self.scoring_qual_win.get(label).copied().unwrap_or(0)
    }
}
