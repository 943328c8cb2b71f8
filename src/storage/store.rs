//! Query interface over persisted ranking inputs and snapshots.

use std::sync::Mutex;

use chrono::NaiveDate;
use tracing::debug;

use super::{EntityType, JsonlReader, JsonlWriter, StorageConfig, StorageError};
use crate::models::{
    CategorySeason, CategorySeasonId, Match, PlayerId, RankingAdjustment, RankingSnapshot,
    RankingType, Season, SeasonId, Tournament, TournamentId,
};

/// Filtered, ordered access to the records the ranking engine reads, plus
/// the few writes the snapshot service owns.
pub trait RankingStore: Send + Sync {
    /// All seasons, ordered by start date.
    fn seasons(&self) -> Result<Vec<Season>, StorageError>;

    fn season(&self, id: &SeasonId) -> Result<Option<Season>, StorageError>;

    /// Tournaments ordered by `(start_date, id)`, optionally limited to one season.
    fn tournaments(&self, season: Option<&SeasonId>) -> Result<Vec<Tournament>, StorageError>;

    fn tournament(&self, id: &TournamentId) -> Result<Option<Tournament>, StorageError>;

    fn category_season(
        &self,
        id: &CategorySeasonId,
    ) -> Result<Option<CategorySeason>, StorageError>;

    /// Matches of one tournament, ordered by id.
    fn matches(&self, tournament: &TournamentId) -> Result<Vec<Match>, StorageError>;

    /// Adjustments, optionally for one player, ordered by id.
    fn adjustments(&self, player: Option<&PlayerId>)
        -> Result<Vec<RankingAdjustment>, StorageError>;

    /// Snapshots of one type, ordered by Monday.
    fn snapshots(&self, ranking_type: RankingType) -> Result<Vec<RankingSnapshot>, StorageError>;

    fn insert_snapshot(&self, snapshot: &RankingSnapshot) -> Result<(), StorageError>;

    /// Replace every snapshot of one type in a single write.
    fn replace_snapshots(
        &self,
        ranking_type: RankingType,
        snapshots: &[RankingSnapshot],
    ) -> Result<(), StorageError>;

    /// Set a tournament's seeding Monday unless one is already stored, and
    /// return the stored value.
    fn stamp_seeding_monday(
        &self,
        tournament: &TournamentId,
        monday: NaiveDate,
    ) -> Result<NaiveDate, StorageError>;
}

/// [`RankingStore`] over the JSONL files of a data directory.
pub struct JsonlStore {
    config: StorageConfig,
    write_lock: Mutex<()>,
}

impl JsonlStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    fn reader<T: serde::de::DeserializeOwned>(&self, entity: EntityType) -> JsonlReader<T> {
        JsonlReader::for_entity(&self.config, entity)
    }

    fn writer<T: serde::Serialize>(&self, entity: EntityType) -> JsonlWriter<T> {
        JsonlWriter::for_entity(&self.config, entity)
    }

    fn lock_writes(&self) -> std::sync::MutexGuard<'_, ()> {
        // A poisoned lock only means another writer panicked; the files are
        // still whole because replacement goes through a rename.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed input records. Used by imports and tests.
    pub fn put_seasons(&self, seasons: &[Season]) -> Result<usize, StorageError> {
        let _guard = self.lock_writes();
        self.writer(EntityType::Season).write_all(seasons)
    }

    pub fn put_category_seasons(&self, items: &[CategorySeason]) -> Result<usize, StorageError> {
        let _guard = self.lock_writes();
        self.writer(EntityType::CategorySeason).write_all(items)
    }

    pub fn put_tournaments(&self, items: &[Tournament]) -> Result<usize, StorageError> {
        let _guard = self.lock_writes();
        self.writer(EntityType::Tournament).write_all(items)
    }

    pub fn put_matches(&self, items: &[Match]) -> Result<usize, StorageError> {
        let _guard = self.lock_writes();
        self.writer(EntityType::Match).write_all(items)
    }

    pub fn put_adjustments(&self, items: &[RankingAdjustment]) -> Result<usize, StorageError> {
        let _guard = self.lock_writes();
        self.writer(EntityType::Adjustment).write_all(items)
    }
}

impl RankingStore for JsonlStore {
    fn seasons(&self) -> Result<Vec<Season>, StorageError> {
        let mut seasons: Vec<Season> = self.reader(EntityType::Season).read_all()?;
        seasons.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.id.cmp(&b.id)));
        Ok(seasons)
    }

    fn season(&self, id: &SeasonId) -> Result<Option<Season>, StorageError> {
        let found: Vec<Season> = self.reader(EntityType::Season).read_where(|s: &Season| &s.id == id)?;
        Ok(found.into_iter().next())
    }

    fn tournaments(&self, season: Option<&SeasonId>) -> Result<Vec<Tournament>, StorageError> {
        let mut tournaments: Vec<Tournament> = self
            .reader(EntityType::Tournament)
            .read_where(|t: &Tournament| season.map_or(true, |s| &t.season_id == s))?;
        tournaments.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.id.cmp(&b.id)));
        Ok(tournaments)
    }

    fn tournament(&self, id: &TournamentId) -> Result<Option<Tournament>, StorageError> {
        let found: Vec<Tournament> = self
            .reader(EntityType::Tournament)
            .read_where(|t: &Tournament| &t.id == id)?;
        Ok(found.into_iter().next())
    }

    fn category_season(
        &self,
        id: &CategorySeasonId,
    ) -> Result<Option<CategorySeason>, StorageError> {
        let found: Vec<CategorySeason> = self
            .reader(EntityType::CategorySeason)
            .read_where(|c: &CategorySeason| &c.id == id)?;
        Ok(found.into_iter().next())
    }

    fn matches(&self, tournament: &TournamentId) -> Result<Vec<Match>, StorageError> {
        let mut matches: Vec<Match> = self
            .reader(EntityType::Match)
            .read_where(|m: &Match| &m.tournament_id == tournament)?;
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }

    fn adjustments(
        &self,
        player: Option<&PlayerId>,
    ) -> Result<Vec<RankingAdjustment>, StorageError> {
        let mut adjustments: Vec<RankingAdjustment> = self
            .reader(EntityType::Adjustment)
            .read_where(|a: &RankingAdjustment| player.map_or(true, |p| &a.player_id == p))?;
        adjustments.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(adjustments)
    }

    fn snapshots(&self, ranking_type: RankingType) -> Result<Vec<RankingSnapshot>, StorageError> {
        let mut snapshots: Vec<RankingSnapshot> = self
            .reader(EntityType::Snapshot)
            .read_where(|s: &RankingSnapshot| s.ranking_type == ranking_type)?;
        snapshots.sort_by_key(|s| s.monday);
        Ok(snapshots)
    }

    fn insert_snapshot(&self, snapshot: &RankingSnapshot) -> Result<(), StorageError> {
        let _guard = self.lock_writes();
        self.writer(EntityType::Snapshot).append(snapshot)?;
        debug!(
            "Stored {} snapshot for {} (alias: {})",
            snapshot.ranking_type, snapshot.monday, snapshot.is_alias
        );
        Ok(())
    }

    fn replace_snapshots(
        &self,
        ranking_type: RankingType,
        snapshots: &[RankingSnapshot],
    ) -> Result<(), StorageError> {
        let _guard = self.lock_writes();
        let mut all: Vec<RankingSnapshot> = self
            .reader(EntityType::Snapshot)
            .read_where(|s: &RankingSnapshot| s.ranking_type != ranking_type)?;
        all.extend(snapshots.iter().cloned());
        all.sort_by(|a, b| {
            a.ranking_type
                .cmp(&b.ranking_type)
                .then_with(|| a.monday.cmp(&b.monday))
        });
        self.writer(EntityType::Snapshot).write_all(&all)?;
        Ok(())
    }

    fn stamp_seeding_monday(
        &self,
        tournament: &TournamentId,
        monday: NaiveDate,
    ) -> Result<NaiveDate, StorageError> {
        let _guard = self.lock_writes();
        let mut all: Vec<Tournament> = self.reader(EntityType::Tournament).read_all()?;
        let slot = all
            .iter_mut()
            .find(|t| &t.id == tournament)
            .ok_or_else(|| StorageError::NotFound(format!("tournament {}", tournament)))?;
        if let Some(stamped) = slot.seeding_monday {
            return Ok(stamped);
        }
        slot.seeding_monday = Some(monday);
        self.writer(EntityType::Tournament).write_all(&all)?;
        Ok(monday)
    }
}
