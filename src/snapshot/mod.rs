//! Weekly ranking snapshots.
//!
//! Wraps a standings view into a hashed, dated record:
//! - Monday arithmetic in the configured timezone
//! - Canonical payload serialization and content hashing
//! - Preview / confirm with an optimistic hash check and alias dedup
//! - Retention that collapses old payloads into forward aliases

mod retention;
mod service;
pub mod weeks;

pub use retention::*;
pub use service::*;

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::calculate::{ErrorKind, RankingError};
use crate::models::{RankingType, SnapshotId, SnapshotItem};
use crate::storage::StorageError;

/// Errors raised by snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Stale preview for {ranking_type} {monday}: expected hash {expected}, current hash {actual}")]
    StalePreview {
        ranking_type: RankingType,
        monday: NaiveDate,
        expected: String,
        actual: String,
    },

    #[error("{ranking_type} snapshot for {monday} already confirmed with hash {existing}")]
    AlreadyConfirmed {
        ranking_type: RankingType,
        monday: NaiveDate,
        existing: String,
    },

    #[error("No ROLLING snapshot exists for seeding baseline {0}")]
    MissingBaseline(NaiveDate),

    #[error("Snapshot {id} is an alias of missing payload {target}")]
    DanglingAlias { id: SnapshotId, target: SnapshotId },

    #[error(transparent)]
    Ranking(#[from] RankingError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl SnapshotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SnapshotError::StalePreview { .. } | SnapshotError::AlreadyConfirmed { .. } => {
                ErrorKind::Staleness
            }
            SnapshotError::MissingBaseline(_) => ErrorKind::Validation,
            SnapshotError::Ranking(e) => e.kind(),
            SnapshotError::DanglingAlias { .. }
            | SnapshotError::Storage(_)
            | SnapshotError::Serialize(_) => ErrorKind::Storage,
        }
    }
}

/// Proof that the caller may mutate snapshots or tournaments.
///
/// Mutating operations take one by reference; the API only mints it for a
/// request carrying the configured admin token.
#[derive(Debug, Clone)]
pub struct AdminCapability {
    operator: String,
}

impl AdminCapability {
    /// Capability for a local operator, e.g. the CLI user.
    pub fn local(operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
        }
    }

    /// Capability for a presented token, if it matches the configured one.
    pub fn from_token(presented: Option<&str>, configured: Option<&str>) -> Option<Self> {
        match (presented, configured) {
            (Some(p), Some(c)) if !c.is_empty() && p == c => Some(Self::local("api")),
            _ => None,
        }
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }
}

/// Canonical serialization of a payload: fixed key order, no whitespace.
pub fn canonical_payload(items: &[SnapshotItem]) -> Result<String, serde_json::Error> {
    serde_json::to_string(items)
}

/// Hex SHA256 of the canonical payload.
pub fn payload_hash(items: &[SnapshotItem]) -> Result<String, serde_json::Error> {
    let canonical = canonical_payload(items)?;
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}
