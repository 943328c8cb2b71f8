//! Tournament model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{CategorySeasonId, SeasonId, TournamentId};

/// A tournament within a season and category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,

    pub name: String,

    pub season_id: SeasonId,

    pub category_season_id: CategorySeasonId,

    pub start_date: NaiveDate,

    pub end_date: NaiveDate,

    /// Whether a third-place match is played
    #[serde(default)]
    pub third_place_match: bool,

    /// Monday whose rolling ranking seeds this tournament, stamped on first use
    #[serde(default)]
    pub seeding_monday: Option<NaiveDate>,

    /// Bracket template size chosen by the draw generator, if fixed
    #[serde(default)]
    pub draw_template_size: Option<u32>,
}

impl Tournament {
    pub fn new(
        id: TournamentId,
        name: impl Into<String>,
        season_id: SeasonId,
        category_season_id: CategorySeasonId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            season_id,
            category_season_id,
            start_date,
            end_date,
            third_place_match: false,
            seeding_monday: None,
            draw_template_size: None,
        }
    }

    /// Builder method to enable the third-place match.
    pub fn with_third_place_match(mut self) -> Self {
        self.third_place_match = true;
        self
    }

    /// Builder method to pin the bracket template size.
    pub fn with_draw_template_size(mut self, size: u32) -> Self {
        self.draw_template_size = Some(size);
        self
    }
}
