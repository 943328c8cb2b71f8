//! Ranking computation engine.
//!
//! Turns stored match results into rankings:
//! - Per-tournament points (qualification wins and BYE-aware main draw points)
//! - Season, rolling and Road-to-Finals standings with best-N selection
//! - The shared tie-break chain and canonical snapshot rows

mod rounds;
mod scoring;
mod standings;
mod tiebreak;

#[cfg(test)]
pub(crate) mod fixtures;

pub use rounds::*;
pub use scoring::*;
pub use standings::*;
pub use tiebreak::*;

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{CategorySeasonId, SeasonId, TournamentId};
use crate::storage::StorageError;

/// Errors raised while computing points or standings.
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("Tournament {tournament} references missing category season {category_season}")]
    MissingCategorySeason {
        tournament: TournamentId,
        category_season: CategorySeasonId,
    },

    #[error("Malformed round label: {0:?}")]
    MalformedRoundLabel(String),

    #[error("Tournament {tournament} has invalid draw template size {size}")]
    InvalidTemplateSize { tournament: TournamentId, size: u32 },

    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("Season not found: {0}")]
    SeasonNotFound(SeasonId),

    #[error("No season configured to rank {0}")]
    NoSeasonFor(NaiveDate),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Coarse error classes shared by the computation and snapshot layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad setup data. Not retried.
    Configuration,
    /// The underlying data changed since it was read. Re-read and retry.
    Staleness,
    /// The request cannot be satisfied as asked.
    Validation,
    Storage,
}

impl RankingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RankingError::MissingCategorySeason { .. }
            | RankingError::MalformedRoundLabel(_)
            | RankingError::InvalidTemplateSize { .. } => ErrorKind::Configuration,
            RankingError::TournamentNotFound(_)
            | RankingError::SeasonNotFound(_)
            | RankingError::NoSeasonFor(_) => ErrorKind::Validation,
            RankingError::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// Maps a configured draw size onto the bracket it is played in.
pub trait DrawEmbedding: Send + Sync {
    /// Power-of-two bracket size used for a draw of `draw_size` players.
    fn effective_template_size(&self, draw_size: u32) -> u32;
}

/// Smallest power of two holding the whole draw.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerOfTwoEmbedding;

impl DrawEmbedding for PowerOfTwoEmbedding {
    fn effective_template_size(&self, draw_size: u32) -> u32 {
        draw_size.max(2).next_power_of_two()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityId;

    #[test]
    fn test_power_of_two_embedding() {
        let e = PowerOfTwoEmbedding;
        assert_eq!(e.effective_template_size(24), 32);
        assert_eq!(e.effective_template_size(32), 32);
        assert_eq!(e.effective_template_size(33), 64);
        assert_eq!(e.effective_template_size(0), 2);
        assert_eq!(e.effective_template_size(1), 2);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            RankingError::MalformedRoundLabel("X".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            RankingError::SeasonNotFound(EntityId::from("s")).kind(),
            ErrorKind::Validation
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(
            RankingError::from(StorageError::from(io)).kind(),
            ErrorKind::Storage
        );
    }
}
