//! Snapshot build, confirm, lookup and retention.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::retention::{compact_snapshots, RetentionReport};
use super::weeks::{monday_of, official_monday};
use super::{payload_hash, AdminCapability, SnapshotError};
use crate::calculate::{to_snapshot_item, DrawEmbedding, RankingError, StandingsCalculator};
use crate::config::{ConfigError, RankingConfig};
use crate::models::{RankingSnapshot, RankingType, SnapshotId, SnapshotItem, TournamentId};
use crate::storage::RankingStore;

/// What confirming a Monday would store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    #[serde(rename = "type")]
    pub ranking_type: RankingType,
    pub monday: NaiveDate,
    pub hash: String,
    pub items: Vec<SnapshotItem>,
}

/// Result of a confirm call.
#[derive(Debug, Clone)]
pub enum ConfirmOutcome {
    /// A new snapshot holding its own payload
    Created(RankingSnapshot),
    /// A new alias of an earlier snapshot with the same hash
    Aliased(RankingSnapshot),
    /// The Monday was already confirmed with this hash
    Existing(RankingSnapshot),
}

impl ConfirmOutcome {
    pub fn snapshot(&self) -> &RankingSnapshot {
        match self {
            ConfirmOutcome::Created(s) | ConfirmOutcome::Aliased(s) | ConfirmOutcome::Existing(s) => s,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            ConfirmOutcome::Created(_) => "created",
            ConfirmOutcome::Aliased(_) => "aliased",
            ConfirmOutcome::Existing(_) => "existing",
        }
    }
}

/// A confirmed snapshot with its payload resolved through any alias.
#[derive(Debug, Clone, Serialize)]
pub struct OfficialSnapshot {
    pub snapshot: RankingSnapshot,
    pub items: Vec<SnapshotItem>,
    /// Snapshot the payload was read from, when different
    pub resolved_from: Option<SnapshotId>,
}

/// Owns snapshot creation and retention.
///
/// Confirms of the same `(type, monday)` serialize on a per-key mutex and
/// share the service lock; a retention pass holds the service lock
/// exclusively.
pub struct SnapshotService {
    store: Arc<dyn RankingStore>,
    embedding: Arc<dyn DrawEmbedding>,
    settings: RankingConfig,
    tz: Tz,
    pass_lock: RwLock<()>,
    key_locks: Mutex<HashMap<(RankingType, NaiveDate), Arc<Mutex<()>>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SnapshotService {
    pub fn new(
        store: Arc<dyn RankingStore>,
        embedding: Arc<dyn DrawEmbedding>,
        settings: RankingConfig,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        let tz = settings.tz()?;
        Ok(Self {
            store,
            embedding,
            settings,
            tz,
            pass_lock: RwLock::new(()),
            key_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn settings(&self) -> &RankingConfig {
        &self.settings
    }

    pub fn store(&self) -> &dyn RankingStore {
        self.store.as_ref()
    }

    /// Standings calculator using the configured flags.
    pub fn calculator(&self) -> StandingsCalculator<'_> {
        StandingsCalculator::new(self.store.as_ref(), self.embedding.as_ref())
            .with_only_completed_rounds(self.settings.only_completed_rounds)
            .with_rolling_window_weeks(self.settings.rolling_window_weeks)
    }

    /// Official Monday for an instant in the configured timezone.
    pub fn current_monday(&self, now: DateTime<Utc>) -> NaiveDate {
        official_monday(&now, self.tz)
    }

    fn shared_pass(&self) -> RwLockReadGuard<'_, ()> {
        self.pass_lock
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn exclusive_pass(&self) -> RwLockWriteGuard<'_, ()> {
        self.pass_lock
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn key_lock(&self, ranking_type: RankingType, monday: NaiveDate) -> Arc<Mutex<()>> {
        lock(&self.key_locks)
            .entry((ranking_type, monday))
            .or_default()
            .clone()
    }

    /// Drop the table entry for a key once no other confirm holds it.
    fn release_key_lock(&self, ranking_type: RankingType, monday: NaiveDate, key: Arc<Mutex<()>>) {
        let mut locks = lock(&self.key_locks);
        // Handles are only cloned under the table lock: the table and `key`
        // are the last two owners.
        if Arc::strong_count(&key) == 2 {
            locks.remove(&(ranking_type, monday));
        }
    }

    /// Compute the standings a confirm for `monday` would store, and their hash.
    pub fn build_preview(
        &self,
        ranking_type: RankingType,
        monday: NaiveDate,
    ) -> Result<Preview, SnapshotError> {
        let monday = monday_of(monday);
        let calc = self.calculator();

        let rows = match ranking_type {
            RankingType::Rolling => calc.rolling_standings(monday)?,
            RankingType::Season | RankingType::Rtf => {
                let season = self
                    .store
                    .seasons()?
                    .into_iter()
                    .find(|s| s.contains_date(monday))
                    .ok_or(RankingError::NoSeasonFor(monday))?;
                if ranking_type == RankingType::Season {
                    calc.season_standings(&season.id)?
                } else {
                    calc.rtf_standings(&season.id, &self.settings.auto_top_categories)?
                }
            }
        };

        let items: Vec<SnapshotItem> = rows.iter().map(to_snapshot_item).collect();
        let hash = payload_hash(&items)?;
        debug!(
            "Built {} preview for {}: {} rows, hash {}",
            ranking_type,
            monday,
            items.len(),
            hash
        );

        Ok(Preview {
            ranking_type,
            monday,
            hash,
            items,
        })
    }

    /// Persist the ranking for `monday`, provided it still hashes to
    /// `expected_hash`.
    pub fn confirm_snapshot(
        &self,
        admin: &AdminCapability,
        ranking_type: RankingType,
        monday: NaiveDate,
        expected_hash: &str,
        created_by: &str,
    ) -> Result<ConfirmOutcome, SnapshotError> {
        let monday = monday_of(monday);
        let _pass = self.shared_pass();
        let key = self.key_lock(ranking_type, monday);
        let outcome = {
            let _key = lock(&*key);
            self.confirm_locked(admin, ranking_type, monday, expected_hash, created_by)
        };
        self.release_key_lock(ranking_type, monday, key);
        outcome
    }

    fn confirm_locked(
        &self,
        admin: &AdminCapability,
        ranking_type: RankingType,
        monday: NaiveDate,
        expected_hash: &str,
        created_by: &str,
    ) -> Result<ConfirmOutcome, SnapshotError> {
        let preview = self.build_preview(ranking_type, monday)?;
        if preview.hash != expected_hash {
            warn!(
                "Rejected stale {} confirm for {} by {}: expected {}, current {}",
                ranking_type,
                monday,
                admin.operator(),
                expected_hash,
                preview.hash
            );
            return Err(SnapshotError::StalePreview {
                ranking_type,
                monday,
                expected: expected_hash.to_string(),
                actual: preview.hash,
            });
        }

        let existing = self.store.snapshots(ranking_type)?;
        if let Some(current) = existing.iter().find(|s| s.monday == monday) {
            if current.hash == preview.hash {
                debug!("{} snapshot for {} already confirmed", ranking_type, monday);
                return Ok(ConfirmOutcome::Existing(current.clone()));
            }
            return Err(SnapshotError::AlreadyConfirmed {
                ranking_type,
                monday,
                existing: current.hash.clone(),
            });
        }

        let dedup_target = if self.settings.dedup_snapshots {
            existing
                .iter()
                .find(|s| s.monday < monday && s.hash == preview.hash)
                .and_then(|earlier| payload_holder(&existing, earlier))
        } else {
            None
        };

        let outcome = match dedup_target {
            Some(target) => ConfirmOutcome::Aliased(RankingSnapshot::alias(
                ranking_type,
                monday,
                target,
                created_by,
            )),
            None => ConfirmOutcome::Created(RankingSnapshot::full(
                ranking_type,
                monday,
                preview.hash,
                preview.items,
                created_by,
            )),
        };
        self.store.insert_snapshot(outcome.snapshot())?;

        info!(
            "Confirmed {} snapshot for {} ({}) by {}",
            ranking_type,
            monday,
            outcome.status(),
            admin.operator()
        );
        Ok(outcome)
    }

    /// The confirmed snapshot for `monday`, with its payload resolved.
    pub fn get_official_snapshot(
        &self,
        ranking_type: RankingType,
        monday: NaiveDate,
    ) -> Result<Option<OfficialSnapshot>, SnapshotError> {
        let monday = monday_of(monday);
        let snapshots = self.store.snapshots(ranking_type)?;
        let Some(snapshot) = snapshots.iter().find(|s| s.monday == monday) else {
            return Ok(None);
        };

        if let Some(items) = &snapshot.payload {
            return Ok(Some(OfficialSnapshot {
                snapshot: snapshot.clone(),
                items: items.clone(),
                resolved_from: None,
            }));
        }

        let target_id = snapshot.alias_of.clone().unwrap_or_else(|| snapshot.id.clone());
        let items = snapshots
            .iter()
            .find(|s| s.id == target_id)
            .and_then(|s| s.payload.clone())
            .ok_or_else(|| SnapshotError::DanglingAlias {
                id: snapshot.id.clone(),
                target: target_id.clone(),
            })?;

        Ok(Some(OfficialSnapshot {
            snapshot: snapshot.clone(),
            items,
            resolved_from: Some(target_id),
        }))
    }

    /// Collapse payloads older than the `full_weeks_to_keep` most recent
    /// snapshots of each type into forward aliases.
    pub fn retention_gc(
        &self,
        admin: &AdminCapability,
        full_weeks_to_keep: u32,
    ) -> Result<RetentionReport, SnapshotError> {
        let _pass = self.exclusive_pass();
        let mut total = RetentionReport::default();

        for ranking_type in RankingType::ALL {
            let mut snapshots = self.store.snapshots(ranking_type)?;
            let report = compact_snapshots(&mut snapshots, full_weeks_to_keep as usize);
            if report.changed() {
                self.store.replace_snapshots(ranking_type, &snapshots)?;
            }
            debug!("Retention for {}: {:?}", ranking_type, report);
            total.merge(report);
        }

        info!(
            "Retention pass by {} keeping {} weeks: {} collapsed, {} promoted, {} repointed",
            admin.operator(),
            full_weeks_to_keep,
            total.collapsed,
            total.promoted,
            total.repointed
        );
        Ok(total)
    }

    /// Stamp a tournament's seeding Monday on first use and return it.
    ///
    /// In strict mode, a Monday on or after the first official Monday must
    /// already have a ROLLING snapshot.
    pub fn ensure_seeding_baseline(
        &self,
        admin: &AdminCapability,
        tournament_id: &TournamentId,
    ) -> Result<NaiveDate, SnapshotError> {
        let tournament = self
            .store
            .tournament(tournament_id)?
            .ok_or_else(|| RankingError::TournamentNotFound(tournament_id.clone()))?;

        if let Some(monday) = tournament.seeding_monday {
            return Ok(monday);
        }

        let monday = monday_of(tournament.start_date);
        let after_cutover = self
            .settings
            .first_official_monday
            .map_or(false, |first| monday >= first);
        if self.settings.strict_seeding_baseline && after_cutover {
            let has_baseline = self
                .store
                .snapshots(RankingType::Rolling)?
                .iter()
                .any(|s| s.monday == monday);
            if !has_baseline {
                warn!(
                    "No ROLLING baseline for {} seeding on {}",
                    tournament.id, monday
                );
                return Err(SnapshotError::MissingBaseline(monday));
            }
        }

        let stamped = self.store.stamp_seeding_monday(&tournament.id, monday)?;
        info!(
            "Stamped seeding Monday {} on {} by {}",
            stamped,
            tournament.id,
            admin.operator()
        );
        Ok(stamped)
    }
}

/// The snapshot holding the payload for `snapshot`: itself, or its alias target.
fn payload_holder<'a>(
    snapshots: &'a [RankingSnapshot],
    snapshot: &'a RankingSnapshot,
) -> Option<&'a RankingSnapshot> {
    match &snapshot.alias_of {
        None => Some(snapshot),
        Some(target) => snapshots.iter().find(|s| &s.id == target && !s.is_alias),
    }
}
