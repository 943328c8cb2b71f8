//! Per-tournament points.
//!
//! Qualification wins add up round by round. Main draw points go to the
//! round a player lost in, with two refinements:
//! - a BYE recipient who loses their first played match is credited with
//!   the round they skipped;
//! - when only completed rounds count, results in rounds closer to the final
//!   than the last fully decided round earn nothing yet.

use std::collections::BTreeMap;

use super::rounds::{parse_round, size_label, Round, FOURTH_KEY, THIRD_KEY, WINNER_KEY};
use super::{DrawEmbedding, RankingError};
use crate::models::{
    CategorySeason, Match, MatchPhase, PlayerId, PointsBreakdown, Tournament, TournamentPoints,
};
use crate::storage::RankingStore;

/// Played main draw matches indexed by round size, slot order preserved.
#[derive(Debug, Default)]
struct Bracket<'a> {
    rounds: BTreeMap<u32, Vec<&'a Match>>,
    third_place: Option<&'a Match>,
}

impl<'a> Bracket<'a> {
    fn build(matches: &'a [Match]) -> Result<Self, RankingError> {
        let mut bracket = Bracket::default();
        for m in matches.iter().filter(|m| m.phase == MatchPhase::MainDraw) {
            let round = parse_round(&m.round_label)?;
            if !m.is_played() {
                continue;
            }
            match round {
                Round::Size(size) => bracket.rounds.entry(size).or_default().push(m),
                Round::ThirdPlace => bracket.third_place = Some(m),
            }
        }
        Ok(bracket)
    }

    fn round(&self, size: u32) -> &[&'a Match] {
        self.rounds.get(&size).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rounds from the largest down to the final.
    fn rounds_desc(&self) -> impl Iterator<Item = (u32, &Vec<&'a Match>)> {
        self.rounds.iter().rev().map(|(size, ms)| (*size, ms))
    }

    /// Players who skipped the template round.
    ///
    /// Empty when the template round is fully populated.
    fn bye_recipients(&self, template: u32) -> Vec<&'a PlayerId> {
        if self.round(template).len() as u32 >= template / 2 {
            return Vec::new();
        }

        let mut first_round: BTreeMap<&PlayerId, u32> = BTreeMap::new();
        for (size, ms) in self.rounds_desc() {
            for m in ms {
                for p in m.players() {
                    first_round.entry(p).or_insert(size);
                }
            }
        }

        first_round
            .into_iter()
            .filter(|(_, size)| *size == template / 2)
            .map(|(p, _)| p)
            .collect()
    }

    /// Size of the last round, scanning down from the template, in which
    /// every match is decided. Empty rounds are skipped.
    fn last_completed_round(&self, template: u32) -> Option<u32> {
        let mut last = None;
        let mut size = template;
        while size >= 2 {
            let ms = self.round(size);
            if !ms.is_empty() {
                if ms.iter().all(|m| m.is_decided()) {
                    last = Some(size);
                } else {
                    break;
                }
            }
            size /= 2;
        }
        last
    }

    fn players(&self) -> impl Iterator<Item = &'a PlayerId> + '_ {
        self.rounds
            .values()
            .flatten()
            .chain(self.third_place.iter())
            .flat_map(|m| m.players())
    }

    /// Largest round the player appears in.
    fn first_round_of(&self, player: &PlayerId) -> Option<u32> {
        self.rounds_desc()
            .find(|(_, ms)| ms.iter().any(|m| m.involves(player)))
            .map(|(size, _)| size)
    }

    /// Round the player was knocked out in.
    fn losing_round_of(&self, player: &PlayerId) -> Option<u32> {
        self.rounds_desc()
            .find(|(_, ms)| ms.iter().any(|m| m.is_decided() && m.loser() == Some(player)))
            .map(|(size, _)| size)
    }
}

/// What a player's main draw run is worth, and which round must be decided
/// before it counts.
struct Attribution {
    key: String,
    gate_size: u32,
}

fn attribute(
    bracket: &Bracket<'_>,
    player: &PlayerId,
    bye_recipients: &[&PlayerId],
) -> Option<Attribution> {
    if let Some(fin) = bracket
        .round(2)
        .iter()
        .find(|m| m.is_decided() && m.involves(player))
    {
        let key = if fin.winner.as_ref() == Some(player) {
            WINNER_KEY.to_string()
        } else {
            size_label(2)
        };
        return Some(Attribution { key, gate_size: 2 });
    }

    if let Some(third) = bracket
        .third_place
        .filter(|m| m.is_decided() && m.involves(player))
    {
        let key = if third.winner.as_ref() == Some(player) {
            THIRD_KEY
        } else {
            FOURTH_KEY
        };
        return Some(Attribution {
            key: key.to_string(),
            gate_size: 4,
        });
    }

    let losing = bracket.losing_round_of(player)?;
    let skipped_round = bye_recipients.contains(&player) && bracket.first_round_of(player) == Some(losing);
    let credited = if skipped_round { losing * 2 } else { losing };

    Some(Attribution {
        key: size_label(credited),
        gate_size: losing,
    })
}

/// Qualification points: every decided qualification win adds the value of
/// its round to the winner.
pub fn qualification_win_points(
    category: &CategorySeason,
    matches: &[Match],
) -> BTreeMap<PlayerId, i64> {
    let mut totals: BTreeMap<PlayerId, i64> = BTreeMap::new();
    for m in matches
        .iter()
        .filter(|m| m.phase == MatchPhase::Qualification)
    {
        if let Some(winner) = &m.winner {
            *totals.entry(winner.clone()).or_default() +=
                category.qualification_win_points(&m.round_label);
        }
    }
    totals
}

/// Main draw points for every player with at least one played match.
pub fn main_draw_points(
    category: &CategorySeason,
    matches: &[Match],
    template: u32,
    only_completed_rounds: bool,
) -> Result<BTreeMap<PlayerId, i64>, RankingError> {
    let bracket = Bracket::build(matches)?;
    let byes = bracket.bye_recipients(template);
    let last_completed = bracket.last_completed_round(template);

    let mut points: BTreeMap<PlayerId, i64> = BTreeMap::new();
    for player in bracket.players() {
        if points.contains_key(player) {
            continue;
        }

        let earned = match attribute(&bracket, player, &byes) {
            Some(a) if only_completed_rounds => match last_completed {
                Some(last) if a.gate_size >= last => category.main_draw_points(&a.key),
                _ => 0,
            },
            Some(a) => category.main_draw_points(&a.key),
            None => 0,
        };
        points.insert(player.clone(), earned);
    }

    Ok(points)
}

/// Combine qualification and main draw points for one tournament.
pub fn tournament_points(
    category: &CategorySeason,
    matches: &[Match],
    template: u32,
    only_completed_rounds: bool,
) -> Result<TournamentPoints, RankingError> {
    let qual = qualification_win_points(category, matches);
    let md = main_draw_points(category, matches, template, only_completed_rounds)?;

    let mut result = TournamentPoints::new();
    for player in qual.keys().chain(md.keys()) {
        if result.contains_key(player) {
            continue;
        }
        let q = qual.get(player).copied().unwrap_or(0);
        let d = md.get(player).copied().unwrap_or(0);
        result.insert(player.clone(), PointsBreakdown::new(q, d));
    }
    Ok(result)
}

/// Winner of the decided main draw final, if any.
pub fn champion(matches: &[Match]) -> Result<Option<PlayerId>, RankingError> {
    let bracket = Bracket::build(matches)?;
    Ok(bracket
        .round(2)
        .iter()
        .find(|m| m.is_decided())
        .and_then(|m| m.winner.clone()))
}

/// Template size for a tournament: the pinned size if any, else the
/// embedding's answer for the configured draw size.
pub fn template_size(
    tournament: &Tournament,
    category: &CategorySeason,
    embedding: &dyn DrawEmbedding,
) -> Result<u32, RankingError> {
    let size = tournament
        .draw_template_size
        .unwrap_or_else(|| embedding.effective_template_size(category.draw_size));
    if size < 2 || !size.is_power_of_two() || size < category.draw_size {
        return Err(RankingError::InvalidTemplateSize {
            tournament: tournament.id.clone(),
            size,
        });
    }
    Ok(size)
}

/// Load a tournament's configuration and matches and compute its points.
pub fn compute_tournament_points(
    store: &dyn RankingStore,
    embedding: &dyn DrawEmbedding,
    tournament: &Tournament,
    only_completed_rounds: bool,
) -> Result<TournamentPoints, RankingError> {
    let category = store
        .category_season(&tournament.category_season_id)?
        .ok_or_else(|| RankingError::MissingCategorySeason {
            tournament: tournament.id.clone(),
            category_season: tournament.category_season_id.clone(),
        })?;
    let template = template_size(tournament, &category, embedding)?;
    let matches = store.matches(&tournament.id)?;

    tournament_points(&category, &matches, template, only_completed_rounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculate::PowerOfTwoEmbedding;
    use crate::models::EntityId;
    use crate::storage::{JsonlStore, StorageConfig};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn pid(s: &str) -> PlayerId {
        EntityId::from(s)
    }

    struct Draw {
        matches: Vec<Match>,
    }

    impl Draw {
        fn new() -> Self {
            Self {
                matches: Vec::new(),
            }
        }

        fn push(&mut self, phase: MatchPhase, label: &str, a: &str, b: &str, winner: Option<&str>) {
            let id = EntityId::from(format!("m{:03}", self.matches.len()));
            let mut m = Match::new(id, EntityId::from("t"), phase, label).with_players(pid(a), pid(b));
            if let Some(w) = winner {
                m = m.with_winner(pid(w));
            }
            self.matches.push(m);
        }

        fn md(&mut self, label: &str, a: &str, b: &str, winner: &str) -> &mut Self {
            self.push(MatchPhase::MainDraw, label, a, b, Some(winner));
            self
        }

        fn md_open(&mut self, label: &str, a: &str, b: &str) -> &mut Self {
            self.push(MatchPhase::MainDraw, label, a, b, None);
            self
        }

        fn qual(&mut self, label: &str, a: &str, b: &str, winner: &str) -> &mut Self {
            self.push(MatchPhase::Qualification, label, a, b, Some(winner));
            self
        }
    }

    fn category() -> CategorySeason {
        CategorySeason::new(EntityId::from("cs"), "Gold", EntityId::from("s"), 24)
            .with_scoring_md(&[
                ("W", 500),
                ("F", 300),
                ("3RD", 220),
                ("4TH", 200),
                ("SF", 180),
                ("QF", 135),
                ("R16", 90),
                ("R32", 45),
            ])
            .with_scoring_qual_win(&[("Q1", 5), ("Q2", 10)])
    }

    /// 24 players in a 32 template: seeds s1..s8 skip R32, u1..u16 play it.
    fn draw_24() -> Draw {
        let mut d = Draw::new();
        for i in 0..8 {
            let a = format!("u{}", 2 * i + 1);
            let b = format!("u{}", 2 * i + 2);
            d.md("R32", &a, &b, &a);
        }
        // R16: each seed meets an R32 winner. s1 loses straight away.
        d.md("R16", "s1", "u1", "u1");
        for i in 1..8 {
            let seed = format!("s{}", i + 1);
            let opp = format!("u{}", 2 * i + 1);
            d.md("R16", &seed, &opp, &seed);
        }
        d
    }

    #[test]
    fn test_bye_recipient_losing_first_match_gets_skipped_round() {
        let d = draw_24();
        let points = main_draw_points(&category(), &d.matches, 32, false).unwrap();

        assert_eq!(points[&pid("s1")], 45);
        // u1 won R32 then is still alive: nothing decided yet
        assert_eq!(points[&pid("u1")], 0);
        // u3 won R32 and lost R16: no bye, plain R16 value
        assert_eq!(points[&pid("u3")], 90);
        assert_eq!(points[&pid("u2")], 45);
    }

    #[test]
    fn test_full_template_round_has_no_byes() {
        let mut d = Draw::new();
        d.md("R4", "a", "b", "a").md("R4", "c", "d", "c").md("F", "a", "c", "c");
        let points = main_draw_points(&category(), &d.matches, 4, true).unwrap();

        assert_eq!(points[&pid("c")], 500);
        assert_eq!(points[&pid("a")], 300);
        assert_eq!(points[&pid("b")], 180);
        assert_eq!(points[&pid("d")], 180);
    }

    #[test]
    fn test_completed_rounds_gate_unfinished_round() {
        let mut d = draw_24();
        // One QF decided, the rest still open
        d.md("QF", "u1", "s2", "s2");
        d.md_open("QF", "s3", "s4");

        let live = main_draw_points(&category(), &d.matches, 32, false).unwrap();
        assert_eq!(live[&pid("u1")], 135);

        let gated = main_draw_points(&category(), &d.matches, 32, true).unwrap();
        assert_eq!(gated[&pid("u1")], 0);
        // R16 is fully decided, so its losers already count
        assert_eq!(gated[&pid("u3")], 90);
        assert_eq!(gated[&pid("s1")], 45);
    }

    #[test]
    fn test_no_completed_round_awards_nothing_when_gated() {
        let mut d = Draw::new();
        d.md("R4", "a", "b", "a").md_open("R4", "c", "d");
        let gated = main_draw_points(&category(), &d.matches, 4, true).unwrap();
        assert_eq!(gated[&pid("b")], 0);

        let live = main_draw_points(&category(), &d.matches, 4, false).unwrap();
        assert_eq!(live[&pid("b")], 180);
    }

    #[test]
    fn test_empty_rounds_do_not_break_completion_scan() {
        let mut d = Draw::new();
        // Template 8 with no QF matches stored at all
        d.md("SF", "a", "b", "a").md("SF", "c", "d", "d").md_open("F", "a", "d");
        let bracket = Bracket::build(&d.matches).unwrap();
        assert_eq!(bracket.last_completed_round(8), Some(4));

        d.matches.pop();
        d.md("F", "a", "d", "a");
        let bracket = Bracket::build(&d.matches).unwrap();
        assert_eq!(bracket.last_completed_round(8), Some(2));
    }

    #[test]
    fn test_empty_template_round_marks_half_size_entrants_as_byes() {
        let mut d = Draw::new();
        d.md("SF", "a", "b", "a").md("SF", "c", "d", "d");
        let bracket = Bracket::build(&d.matches).unwrap();
        assert_eq!(bracket.bye_recipients(8).len(), 4);
        assert!(bracket.bye_recipients(4).is_empty());
    }

    #[test]
    fn test_third_place_match() {
        let mut d = Draw::new();
        d.md("SF", "a", "b", "a")
            .md("SF", "c", "d", "c")
            .md("F", "a", "c", "a")
            .md("3P", "b", "d", "d");
        let points = main_draw_points(&category(), &d.matches, 4, true).unwrap();

        assert_eq!(points[&pid("a")], 500);
        assert_eq!(points[&pid("c")], 300);
        assert_eq!(points[&pid("d")], 220);
        assert_eq!(points[&pid("b")], 200);
    }

    #[test]
    fn test_undecided_third_place_falls_back_to_semifinal() {
        let mut d = Draw::new();
        d.md("SF", "a", "b", "a").md("SF", "c", "d", "c");
        d.md_open("3P", "b", "d");
        let points = main_draw_points(&category(), &d.matches, 4, true).unwrap();
        assert_eq!(points[&pid("b")], 180);
    }

    #[test]
    fn test_missing_table_entry_is_zero() {
        let mut d = Draw::new();
        d.md("R64", "a", "b", "a");
        let points = main_draw_points(&category(), &d.matches, 64, true).unwrap();
        assert_eq!(points[&pid("b")], 0);
    }

    #[test]
    fn test_malformed_round_label_is_an_error() {
        let mut d = Draw::new();
        d.md("Round of 16", "a", "b", "a");
        let err = main_draw_points(&category(), &d.matches, 16, true).unwrap_err();
        assert!(matches!(err, RankingError::MalformedRoundLabel(label) if label == "Round of 16"));
    }

    #[test]
    fn test_qualification_wins_accumulate() {
        let mut d = Draw::new();
        d.qual("Q1", "q1", "q2", "q1")
            .qual("Q2", "q1", "q3", "q1")
            .qual("Q1", "q4", "q5", "q5")
            .qual("Q3", "q5", "q6", "q5");
        let points = qualification_win_points(&category(), &d.matches);

        assert_eq!(points[&pid("q1")], 15);
        assert_eq!(points[&pid("q5")], 5);
        assert!(!points.contains_key(&pid("q2")));
    }

    #[test]
    fn test_tournament_points_union() {
        let mut d = Draw::new();
        d.qual("Q1", "q", "x", "q");
        d.md("SF", "q", "b", "b").md("SF", "c", "d", "c").md("F", "b", "c", "b");
        let points = tournament_points(&category(), &d.matches, 4, true).unwrap();

        assert_eq!(points[&pid("q")], PointsBreakdown::new(5, 180));
        assert_eq!(points[&pid("b")].total, 500);
        assert!(!points.contains_key(&pid("x")));
        assert_eq!(points.len(), 4);
    }

    #[test]
    fn test_champion_needs_decided_final() {
        let mut d = Draw::new();
        d.md("SF", "a", "b", "a").md("SF", "c", "d", "c").md_open("F", "a", "c");
        assert_eq!(champion(&d.matches).unwrap(), None);

        d.matches.pop();
        d.md("F", "a", "c", "c");
        assert_eq!(champion(&d.matches).unwrap(), Some(pid("c")));
    }

    #[test]
    fn test_template_size_validation() {
        let t = Tournament::new(
            EntityId::from("t"),
            "T",
            EntityId::from("s"),
            EntityId::from("cs"),
            NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 3).unwrap(),
        );
        assert_eq!(template_size(&t, &category(), &PowerOfTwoEmbedding).unwrap(), 32);

        let pinned = t.clone().with_draw_template_size(12);
        assert!(matches!(
            template_size(&pinned, &category(), &PowerOfTwoEmbedding),
            Err(RankingError::InvalidTemplateSize { size: 12, .. })
        ));
    }

    #[test]
    fn test_missing_category_season_is_surfaced() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlStore::new(StorageConfig::new(temp_dir.path().to_path_buf()));
        let t = Tournament::new(
            EntityId::from("t"),
            "T",
            EntityId::from("s"),
            EntityId::from("cs-missing"),
            NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 3).unwrap(),
        );

        let err = compute_tournament_points(&store, &PowerOfTwoEmbedding, &t, true).unwrap_err();
        assert!(matches!(err, RankingError::MissingCategorySeason { .. }));
    }
}
