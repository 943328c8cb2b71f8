//! Retention compaction for confirmed snapshots.
//!
//! Only the most recent snapshots of a type keep their payloads. An older
//! payload holder becomes an alias of the nearest newer snapshot with the same
//! hash, so every Monday still resolves to the same ranking. A payload is
//! never dropped without a forward target to carry it.

use serde::Serialize;

use crate::models::RankingSnapshot;

/// What a retention pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetentionReport {
    /// Payload holders turned into aliases
    pub collapsed: usize,

    /// Aliases in the kept window that took over a payload
    pub promoted: usize,

    /// Aliases repointed to a new payload holder
    pub repointed: usize,

    /// Snapshots inside the kept window
    pub kept: usize,
}

impl RetentionReport {
    pub fn merge(&mut self, other: RetentionReport) {
        self.collapsed += other.collapsed;
        self.promoted += other.promoted;
        self.repointed += other.repointed;
        self.kept += other.kept;
    }

    pub fn changed(&self) -> bool {
        self.collapsed > 0
    }
}

/// Compact one type's snapshots in place. `snapshots` must be ordered by Monday.
///
/// Old payload holders are visited newest first. Each collapses into the
/// nearest newer payload holder with the same hash; failing that, the nearest
/// same-hash snapshot inside the kept window is promoted to hold the payload.
/// Aliases of a collapsed snapshot follow it to the new holder, keeping every
/// alias one hop from its payload.
pub fn compact_snapshots(
    snapshots: &mut [RankingSnapshot],
    full_weeks_to_keep: usize,
) -> RetentionReport {
    let boundary = snapshots.len().saturating_sub(full_weeks_to_keep);
    let mut report = RetentionReport {
        kept: snapshots.len() - boundary,
        ..RetentionReport::default()
    };

    for i in (0..boundary).rev() {
        if snapshots[i].is_alias {
            continue;
        }
        let hash = snapshots[i].hash.clone();

        let holder = (i + 1..snapshots.len())
            .find(|&j| !snapshots[j].is_alias && snapshots[j].hash == hash);
        let target = match holder {
            Some(j) => j,
            None => {
                let Some(j) = (boundary..snapshots.len()).find(|&j| snapshots[j].hash == hash)
                else {
                    continue;
                };
                let payload = snapshots[i].payload.take().unwrap_or_default();
                snapshots[j].promote(payload);
                report.promoted += 1;
                j
            }
        };

        let source_id = snapshots[i].id.clone();
        let target_id = snapshots[target].id.clone();
        snapshots[i].collapse_into(&target_id);
        report.collapsed += 1;

        for s in snapshots.iter_mut() {
            if s.alias_of.as_ref() == Some(&source_id) {
                s.alias_of = Some(target_id.clone());
                report.repointed += 1;
            }
        }
    }

    report
}
