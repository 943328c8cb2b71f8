//! Store-backed fixtures for computation and snapshot tests.

use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use crate::models::{
    CategorySeason, EntityId, Match, MatchPhase, PlayerId, RankingAdjustment, Season, Tournament,
};
use crate::storage::{JsonlStore, StorageConfig};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn pid(s: &str) -> PlayerId {
    EntityId::from(s)
}

/// Builds input records in memory and writes them to a temporary JSONL store.
///
/// Categories have a two-player draw, so every tournament is a single final
/// worth the category's `W` / `F` values.
pub struct Fixture {
    _temp_dir: TempDir,
    pub store: Arc<JsonlStore>,
    seasons: Vec<Season>,
    categories: Vec<CategorySeason>,
    tournaments: Vec<Tournament>,
    matches: Vec<Match>,
    adjustments: Vec<RankingAdjustment>,
}

impl Fixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(JsonlStore::new(StorageConfig::new(
            temp_dir.path().to_path_buf(),
        )));
        Self {
            _temp_dir: temp_dir,
            store,
            seasons: Vec::new(),
            categories: Vec::new(),
            tournaments: Vec::new(),
            matches: Vec::new(),
            adjustments: Vec::new(),
        }
    }

    pub fn season(&mut self, id: &str, start: NaiveDate, end: NaiveDate, best_n: u32) -> &mut Self {
        self.seasons
            .push(Season::new(EntityId::from(id), id, start, end, best_n));
        self
    }

    pub fn category(&mut self, id: &str, name: &str, season: &str, won: i64, lost: i64) -> &mut Self {
        self.categories.push(
            CategorySeason::new(EntityId::from(id), name, EntityId::from(season), 2)
                .with_scoring_md(&[("W", won), ("F", lost)]),
        );
        self
    }

    /// A tournament whose only match is a final between `a` and `b`.
    pub fn final_match(
        &mut self,
        id: &str,
        category: &str,
        end: NaiveDate,
        a: &str,
        b: &str,
        winner: Option<&str>,
    ) -> &mut Self {
        let season = self
            .categories
            .iter()
            .find(|c| c.id.as_str() == category)
            .map(|c| c.season_id.clone())
            .unwrap_or_else(|| EntityId::from("unknown"));
        self.tournaments.push(Tournament::new(
            EntityId::from(id),
            id,
            season,
            EntityId::from(category),
            end - chrono::Duration::days(1),
            end,
        ));

        let mut m = Match::new(
            EntityId::from(format!("{}-f", id)),
            EntityId::from(id),
            MatchPhase::MainDraw,
            "F",
        )
        .with_players(pid(a), pid(b));
        if let Some(w) = winner {
            m = m.with_winner(pid(w));
        }
        self.matches.push(m);
        self
    }

    /// Decide a previously open final.
    pub fn decide(&mut self, tournament: &str, winner: &str) -> &mut Self {
        if let Some(m) = self
            .matches
            .iter_mut()
            .find(|m| m.tournament_id.as_str() == tournament)
        {
            *m = m.clone().with_winner(pid(winner));
        }
        self
    }

    pub fn adjustment(&mut self, adjustment: RankingAdjustment) -> &mut Self {
        self.adjustments.push(adjustment);
        self
    }

    /// Write every record to the store, replacing what was there.
    pub fn save(&mut self) -> &mut Self {
        self.store.put_seasons(&self.seasons).unwrap();
        self.store.put_category_seasons(&self.categories).unwrap();
        self.store.put_tournaments(&self.tournaments).unwrap();
        self.store.put_matches(&self.matches).unwrap();
        self.store.put_adjustments(&self.adjustments).unwrap();
        self
    }
}
