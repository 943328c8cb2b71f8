//! Entity identifiers.
//!
//! Records imported from the administration side carry their own ids;
//! snapshots derive theirs deterministically from `(type, monday)`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// An opaque entity identifier.
///
/// Ordering is lexicographic and is used as the final deterministic
/// tie-break between players.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create a new EntityId from a string.
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Generate an EntityId from input fields.
    /// Uses SHA256 and takes the first 16 characters for brevity.
    pub fn generate(fields: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                hasher.update(b"|");
            }
            hasher.update(field.as_bytes());
        }
        let hash = hex::encode(hasher.finalize());
        Self(hash[..16].to_string())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

pub type PlayerId = EntityId;

pub type TournamentId = EntityId;

pub type SeasonId = EntityId;

pub type CategorySeasonId = EntityId;

pub type MatchId = EntityId;

pub type AdjustmentId = EntityId;

/// Snapshot ids are derived from the snapshot key, see `RankingSnapshot::key_id`.
pub type SnapshotId = EntityId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_generation_deterministic() {
        let id1 = EntityId::generate(&["ROLLING", "2025-06-16"]);
        let id2 = EntityId::generate(&["ROLLING", "2025-06-16"]);
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_entity_id_different_inputs() {
        let id1 = EntityId::generate(&["ROLLING", "2025-06-16"]);
        let id2 = EntityId::generate(&["SEASON", "2025-06-16"]);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_entity_id_length_and_hex() {
        let id = EntityId::generate(&["RTF", "2025-01-06"]);
        assert_eq!(id.as_str().len(), 16);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_entity_id_serializes_as_plain_string() {
        let id = EntityId::from("p-17");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"p-17\"");
        let back: EntityId = serde_json::from_str("\"p-17\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_entity_id_ordering() {
        let mut ids = vec![
            EntityId::from("p-b"),
            EntityId::from("p-a"),
            EntityId::from("p-c"),
        ];
        ids.sort();
        assert_eq!(ids[0].as_str(), "p-a");
        assert_eq!(ids[2].as_str(), "p-c");
    }

    #[test]
    fn test_entity_id_debug() {
        let id = EntityId::new("debug-test".to_string());
        assert_eq!(format!("{:?}", id), "EntityId(debug-test)");
    }
}
