//! Round labels and result keys.

use super::RankingError;

/// Label of the optional third-place match.
pub const THIRD_PLACE_LABEL: &str = "3P";

/// Result key for the tournament winner.
pub const WINNER_KEY: &str = "W";

/// Result key for the third-place match winner.
pub const THIRD_KEY: &str = "3RD";

/// Result key for the third-place match loser.
pub const FOURTH_KEY: &str = "4TH";

/// A parsed main draw round label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Round {
    /// A bracket round entered by `n` players.
    Size(u32),
    ThirdPlace,
}

/// Parse a main draw round label.
///
/// Accepts `R{n}` with a numeric `n >= 2`, `QF`, `SF`, `F` and `3P`.
/// Anything else is rejected rather than guessed at.
pub fn parse_round(label: &str) -> Result<Round, RankingError> {
    let malformed = || RankingError::MalformedRoundLabel(label.to_string());

    match label.trim() {
        THIRD_PLACE_LABEL => Ok(Round::ThirdPlace),
        "F" => Ok(Round::Size(2)),
        "SF" => Ok(Round::Size(4)),
        "QF" => Ok(Round::Size(8)),
        other => {
            let digits = other.strip_prefix('R').ok_or_else(malformed)?;
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return Err(malformed());
            }
            let size: u32 = digits.parse().map_err(|_| malformed())?;
            if size < 2 {
                return Err(malformed());
            }
            Ok(Round::Size(size))
        }
    }
}

/// Result key for a player who lost in the round entered by `size` players.
pub fn size_label(size: u32) -> String {
    match size {
        2 => "F".to_string(),
        4 => "SF".to_string(),
        8 => "QF".to_string(),
        n => format!("R{}", n),
    }
}
