//! Match results.

use serde::{Deserialize, Serialize};

use super::{MatchId, PlayerId, TournamentId};

/// Draw phase a match belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchPhase {
    Qualification,
    MainDraw,
}

/// Progress of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchState {
    #[default]
    Pending,
    Scheduled,
    InProgress,
    Completed,
}

/// A single match of a tournament.
///
/// Only the winner, state and player slots change after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,

    pub tournament_id: TournamentId,

    pub phase: MatchPhase,

    /// Round label, e.g. "R32", "QF", "3P" or a qualification label like "Q1"
    pub round_label: String,

    pub player1: Option<PlayerId>,

    pub player2: Option<PlayerId>,

    #[serde(default)]
    pub winner: Option<PlayerId>,

    #[serde(default)]
    pub state: MatchState,
}

impl Match {
    /// Create an unplayed match.
    pub fn new(
        id: MatchId,
        tournament_id: TournamentId,
        phase: MatchPhase,
        round_label: impl Into<String>,
    ) -> Self {
        Self {
            id,
            tournament_id,
            phase,
            round_label: round_label.into(),
            player1: None,
            player2: None,
            winner: None,
            state: MatchState::Pending,
        }
    }

    /// Builder method to seat both players.
    pub fn with_players(mut self, player1: PlayerId, player2: PlayerId) -> Self {
        self.player1 = Some(player1);
        self.player2 = Some(player2);
        self
    }

    /// Builder method to record the winner and complete the match.
    pub fn with_winner(mut self, winner: PlayerId) -> Self {
        self.winner = Some(winner);
        self.state = MatchState::Completed;
        self
    }

    /// Both slots are filled. A match with an empty slot is a BYE placeholder.
    pub fn is_played(&self) -> bool {
        self.player1.is_some() && self.player2.is_some()
    }

    /// The match has a winner.
    pub fn is_decided(&self) -> bool {
        self.winner.is_some()
    }

    /// Whether the player occupies one of the slots.
    pub fn involves(&self, player: &PlayerId) -> bool {
        self.player1.as_ref() == Some(player) || self.player2.as_ref() == Some(player)
    }

    /// Players in the occupied slots.
    pub fn players(&self) -> impl Iterator<Item = &PlayerId> {
        self.player1.iter().chain(self.player2.iter())
    }

    /// The other player of a decided match.
    pub fn loser(&self) -> Option<&PlayerId> {
        let winner = self.winner.as_ref()?;
        self.players().find(|p| *p != winner)
    }
}
