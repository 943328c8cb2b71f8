//! Standings aggregation across tournaments.
//!
//! All three views share one skeleton: collect each player's per-tournament
//! totals over the eligible tournaments, keep the best N (after penalties),
//! add adjustment deltas and sort by the view's tie-break chain. The views
//! differ in which tournaments are eligible, which adjustments apply and
//! where `best_n` comes from.

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate};
use tracing::debug;

use super::scoring::{champion, compute_tournament_points};
use super::tiebreak::sort_rows;
use super::{DrawEmbedding, RankingError};
use crate::models::{
    CategorySeason, CategorySeasonId, PlayerId, RankingAdjustment, RankingType, Season, SeasonId,
    StandingsRow, Tournament, TournamentId, TournamentPoints,
};
use crate::snapshot::weeks::{monday_of, next_monday_after};
use crate::storage::RankingStore;

/// Default length of the rolling window in weeks.
pub const DEFAULT_ROLLING_WINDOW_WEEKS: u32 = 61;

/// Build unsorted rows from per-player results.
///
/// Only players with at least one result get a row. Adjustments must already
/// be filtered to the view and are matched to players by id.
pub fn aggregate(
    results: BTreeMap<PlayerId, Vec<i64>>,
    best_n: u32,
    adjustments: &[RankingAdjustment],
) -> Vec<StandingsRow> {
    let mut rows = Vec::with_capacity(results.len());

    for (player_id, mut values) in results {
        values.sort_unstable_by(|a, b| b.cmp(a));

        let (penalty, delta) = adjustments
            .iter()
            .filter(|a| a.player_id == player_id)
            .fold((0i64, 0i64), |(p, d), a| {
                (p + i64::from(a.best_n_penalty), d + a.points_delta)
            });

        let len = values.len() as i64;
        let n_eff = (i64::from(best_n) + penalty).min(len).max(1).min(len) as usize;
        let dropped = values.split_off(n_eff);
        let counted = values;

        let best_n_points: i64 = counted.iter().sum();
        let average = if counted.is_empty() {
            0.0
        } else {
            best_n_points as f64 / counted.len() as f64
        };
        let best_single = counted.first().copied().unwrap_or(0);

        rows.push(StandingsRow {
            player_id,
            points: best_n_points + delta,
            average,
            best_n_points,
            events_in_window: (counted.len() + dropped.len()) as u32,
            best_single,
            counted,
            dropped,
            adjustment_points: delta,
            pinned: false,
        });
    }

    rows
}

/// Computes standings views from a [`RankingStore`].
pub struct StandingsCalculator<'a> {
    store: &'a dyn RankingStore,
    embedding: &'a dyn DrawEmbedding,
    only_completed_rounds: bool,
    rolling_window_weeks: u32,
}

impl<'a> StandingsCalculator<'a> {
    pub fn new(store: &'a dyn RankingStore, embedding: &'a dyn DrawEmbedding) -> Self {
        Self {
            store,
            embedding,
            only_completed_rounds: true,
            rolling_window_weeks: DEFAULT_ROLLING_WINDOW_WEEKS,
        }
    }

    /// Builder method to count results from unfinished rounds.
    pub fn with_only_completed_rounds(mut self, only_completed: bool) -> Self {
        self.only_completed_rounds = only_completed;
        self
    }

    /// Builder method to change the rolling window length.
    pub fn with_rolling_window_weeks(mut self, weeks: u32) -> Self {
        self.rolling_window_weeks = weeks;
        self
    }

    /// Points per player for one tournament.
    pub fn points_for_tournament(
        &self,
        tournament_id: &TournamentId,
        only_completed_rounds: bool,
    ) -> Result<TournamentPoints, RankingError> {
        let tournament = self
            .store
            .tournament(tournament_id)?
            .ok_or_else(|| RankingError::TournamentNotFound(tournament_id.clone()))?;
        compute_tournament_points(self.store, self.embedding, &tournament, only_completed_rounds)
    }

    fn season(&self, season_id: &SeasonId) -> Result<Season, RankingError> {
        self.store
            .season(season_id)?
            .ok_or_else(|| RankingError::SeasonNotFound(season_id.clone()))
    }

    /// Season whose `best_n` applies to a rolling ranking on `monday`.
    ///
    /// Falls back to the season that ended last when none contains the date.
    pub fn season_for_monday(&self, monday: NaiveDate) -> Result<Season, RankingError> {
        let seasons = self.store.seasons()?;
        if let Some(season) = seasons.iter().find(|s| s.contains_date(monday)) {
            return Ok(season.clone());
        }
        seasons
            .into_iter()
            .max_by(|a, b| a.end_date.cmp(&b.end_date).then_with(|| b.id.cmp(&a.id)))
            .ok_or(RankingError::NoSeasonFor(monday))
    }

    /// Per-player totals over the given tournaments, in tournament order.
    fn collect_results(
        &self,
        tournaments: &[Tournament],
    ) -> Result<BTreeMap<PlayerId, Vec<i64>>, RankingError> {
        let mut results: BTreeMap<PlayerId, Vec<i64>> = BTreeMap::new();
        for tournament in tournaments {
            let points = compute_tournament_points(
                self.store,
                self.embedding,
                tournament,
                self.only_completed_rounds,
            )?;
            for (player, breakdown) in points {
                results.entry(player).or_default().push(breakdown.total);
            }
        }
        Ok(results)
    }

    /// Tournaments ending within the season's dates.
    fn season_tournaments(&self, season: &Season) -> Result<Vec<Tournament>, RankingError> {
        Ok(self
            .store
            .tournaments(None)?
            .into_iter()
            .filter(|t| season.contains_date(t.end_date))
            .collect())
    }

    pub fn season_standings(&self, season_id: &SeasonId) -> Result<Vec<StandingsRow>, RankingError> {
        let season = self.season(season_id)?;
        self.season_rows(&season)
    }

    fn season_rows(&self, season: &Season) -> Result<Vec<StandingsRow>, RankingError> {
        let tournaments = self.season_tournaments(season)?;
        let results = self.collect_results(&tournaments)?;

        // Adjustments count when their weekly window overlaps the season's weeks.
        let first_week = monday_of(season.start_date);
        let end_week = monday_of(season.end_date) + Duration::weeks(1);
        let adjustments: Vec<RankingAdjustment> = self
            .store
            .adjustments(None)?
            .into_iter()
            .filter(|a| {
                a.scope.covers_season()
                    && a.duration_weeks > 0
                    && a.first_monday() < end_week
                    && first_week < a.end_monday()
            })
            .collect();

        let mut rows = aggregate(results, season.best_n, &adjustments);
        sort_rows(RankingType::Season, &mut rows);
        debug!(
            "Season standings for {}: {} tournaments, {} players",
            season.id,
            tournaments.len(),
            rows.len()
        );
        Ok(rows)
    }

    /// Rolling standings as of `monday` (floored to its Monday).
    ///
    /// A tournament counts from the Monday strictly after its end date for
    /// `rolling_window_weeks` weeks.
    pub fn rolling_standings(&self, monday: NaiveDate) -> Result<Vec<StandingsRow>, RankingError> {
        let monday = monday_of(monday);
        let season = self.season_for_monday(monday)?;
        let window = Duration::weeks(i64::from(self.rolling_window_weeks));

        let tournaments: Vec<Tournament> = self
            .store
            .tournaments(None)?
            .into_iter()
            .filter(|t| {
                let activation = next_monday_after(t.end_date);
                activation <= monday && monday < activation + window
            })
            .collect();
        let results = self.collect_results(&tournaments)?;

        let adjustments: Vec<RankingAdjustment> = self
            .store
            .adjustments(None)?
            .into_iter()
            .filter(|a| a.scope.covers_rolling() && a.is_active_on(monday))
            .collect();

        let mut rows = aggregate(results, season.best_n, &adjustments);
        sort_rows(RankingType::Rolling, &mut rows);
        debug!(
            "Rolling standings for {}: {} tournaments, {} players, best_n {} from {}",
            monday,
            tournaments.len(),
            rows.len(),
            season.best_n,
            season.id
        );
        Ok(rows)
    }

    /// Road-to-Finals standings: season standings with category winners
    /// pinned to the top in `categories` order.
    ///
    /// For each category, the winner of its first tournament in the season
    /// with a decided final is pinned. A player is pinned at most once.
    pub fn rtf_standings(
        &self,
        season_id: &SeasonId,
        categories: &[String],
    ) -> Result<Vec<StandingsRow>, RankingError> {
        let season = self.season(season_id)?;
        let rows = self.season_rows(&season)?;
        if categories.is_empty() {
            return Ok(rows);
        }

        let tournaments = self.season_tournaments(&season)?;
        let mut category_cache: HashMap<CategorySeasonId, Option<CategorySeason>> = HashMap::new();
        let mut pinned: Vec<PlayerId> = Vec::new();

        for name in categories {
            for tournament in &tournaments {
                let category = match category_cache.get(&tournament.category_season_id) {
                    Some(c) => c.clone(),
                    None => {
                        let c = self.store.category_season(&tournament.category_season_id)?;
                        category_cache.insert(tournament.category_season_id.clone(), c.clone());
                        c
                    }
                };
                let category = category.ok_or_else(|| RankingError::MissingCategorySeason {
                    tournament: tournament.id.clone(),
                    category_season: tournament.category_season_id.clone(),
                })?;
                if &category.category != name {
                    continue;
                }

                let matches = self.store.matches(&tournament.id)?;
                if let Some(winner) = champion(&matches)? {
                    if !pinned.contains(&winner) {
                        debug!("RtF pin for {}: {} ({})", name, winner, tournament.id);
                        pinned.push(winner);
                    }
                    break;
                }
            }
        }

        let mut by_player: HashMap<PlayerId, StandingsRow> = HashMap::new();
        let mut order: Vec<PlayerId> = Vec::with_capacity(rows.len());
        for row in rows {
            order.push(row.player_id.clone());
            by_player.insert(row.player_id.clone(), row);
        }

        let mut ranked = Vec::with_capacity(order.len() + pinned.len());
        for player in &pinned {
            let mut row = by_player
                .remove(player)
                .unwrap_or_else(|| StandingsRow::empty(player.clone()));
            row.pinned = true;
            ranked.push(row);
        }
        ranked.extend(order.iter().filter_map(|p| by_player.remove(p)));

        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculate::fixtures::{date, pid, Fixture};
    use crate::calculate::PowerOfTwoEmbedding;
    use crate::models::{AdjustmentScope, EntityId};
    use pretty_assertions::assert_eq;

    fn ids(rows: &[StandingsRow]) -> Vec<&str> {
        rows.iter().map(|r| r.player_id.as_str()).collect()
    }

    fn adjustment(id: &str, player: &str, scope: AdjustmentScope, start: NaiveDate, weeks: u32) -> RankingAdjustment {
        RankingAdjustment::new(EntityId::from(id), pid(player), scope, start, weeks)
    }

    #[test]
    fn test_best_n_with_penalty_floor() {
        let mut results = BTreeMap::new();
        results.insert(pid("p"), vec![18, 100]);
        let adj = adjustment("a1", "p", AdjustmentScope::Season, date(2025, 1, 6), 52)
            .with_points_delta(50)
            .with_best_n_penalty(-1);

        let rows = aggregate(results, 1, &[adj]);
        let row = &rows[0];
        assert_eq!(row.counted, vec![100]);
        assert_eq!(row.dropped, vec![18]);
        assert_eq!(row.points, 150);
        assert_eq!(row.best_n_points, 100);
        assert_eq!(row.adjustment_points, 50);
        assert_eq!(row.average, 100.0);
        assert_eq!(row.events_in_window, 2);
        assert_eq!(row.best_single, 100);
    }

    #[test]
    fn test_positive_penalty_grows_counted_set_up_to_list_length() {
        let mut results = BTreeMap::new();
        results.insert(pid("p"), vec![10, 30, 20]);
        let adj = adjustment("a1", "p", AdjustmentScope::Both, date(2025, 1, 6), 4)
            .with_best_n_penalty(5);

        let rows = aggregate(results, 1, &[adj]);
        assert_eq!(rows[0].counted, vec![30, 20, 10]);
        assert!(rows[0].dropped.is_empty());
        assert_eq!(rows[0].average, 20.0);
    }

    #[test]
    fn test_adjustments_accumulate_per_player() {
        let mut results = BTreeMap::new();
        results.insert(pid("p"), vec![40, 30, 20]);
        results.insert(pid("q"), vec![5]);
        let adjs = vec![
            adjustment("a1", "p", AdjustmentScope::Both, date(2025, 1, 6), 4)
                .with_best_n_penalty(-1)
                .with_points_delta(-5),
            adjustment("a2", "p", AdjustmentScope::Both, date(2025, 1, 6), 4)
                .with_best_n_penalty(-1)
                .with_points_delta(-5),
        ];

        let rows = aggregate(results, 3, &adjs);
        let p = rows.iter().find(|r| r.player_id == pid("p")).unwrap();
        assert_eq!(p.counted, vec![40]);
        assert_eq!(p.points, 30);
        let q = rows.iter().find(|r| r.player_id == pid("q")).unwrap();
        assert_eq!(q.points, 5);
    }

    #[test]
    fn test_season_standings_use_end_date_and_best_n() {
        let mut f = Fixture::new();
        f.season("s25", date(2025, 1, 1), date(2025, 12, 31), 2)
            .category("gold", "Gold", "s25", 100, 60)
            .final_match("t1", "gold", date(2025, 2, 2), "a", "b", Some("a"))
            .final_match("t2", "gold", date(2025, 3, 2), "a", "c", Some("c"))
            .final_match("t3", "gold", date(2025, 4, 6), "a", "b", Some("a"))
            // Ends after the season
            .final_match("t4", "gold", date(2026, 1, 4), "c", "b", Some("c"))
            .save();

        let calc = StandingsCalculator::new(f.store.as_ref(), &PowerOfTwoEmbedding);
        let rows = calc.season_standings(&EntityId::from("s25")).unwrap();

        assert_eq!(ids(&rows), vec!["a", "b", "c"]);
        assert_eq!(rows[0].counted, vec![100, 100]);
        assert_eq!(rows[0].dropped, vec![60]);
        assert_eq!(rows[1].points, 120);
        assert_eq!(rows[2].points, 100);
    }

    #[test]
    fn test_season_average_breaks_points_tie() {
        let mut f = Fixture::new();
        f.season("s25", date(2025, 1, 1), date(2025, 12, 31), 3)
            .category("gold", "Gold", "s25", 100, 50)
            // a: 100 from one event. b: 50 + 50 from two.
            .final_match("t1", "gold", date(2025, 2, 2), "a", "b", Some("a"))
            .final_match("t2", "gold", date(2025, 3, 2), "b", "c", Some("c"))
            .save();

        let calc = StandingsCalculator::new(f.store.as_ref(), &PowerOfTwoEmbedding);
        let rows = calc.season_standings(&EntityId::from("s25")).unwrap();
        assert_eq!(ids(&rows), vec!["a", "c", "b"]);

        let rolling = calc.rolling_standings(date(2025, 3, 10)).unwrap();
        // Without the average, more events wins the tie
        assert_eq!(ids(&rolling), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_season_adjustments_must_overlap_season_weeks() {
        let mut f = Fixture::new();
        f.season("s25", date(2025, 1, 1), date(2025, 12, 31), 3)
            .category("gold", "Gold", "s25", 100, 50)
            .final_match("t1", "gold", date(2025, 2, 2), "a", "b", Some("a"))
            // 2024-12-30 is the Monday of the season's first week
            .adjustment(
                adjustment("in", "a", AdjustmentScope::Season, date(2024, 12, 30), 1)
                    .with_points_delta(7),
            )
            .adjustment(
                adjustment("before", "a", AdjustmentScope::Season, date(2024, 12, 23), 1)
                    .with_points_delta(1000),
            )
            // Tuesday start: its week ends on the season's first Monday
            .adjustment(
                adjustment("mid-week", "a", AdjustmentScope::Season, date(2024, 12, 24), 1)
                    .with_points_delta(1000),
            )
            .adjustment(
                adjustment("rolling", "a", AdjustmentScope::RollingOnly, date(2025, 2, 3), 10)
                    .with_points_delta(1000),
            )
            .save();

        let calc = StandingsCalculator::new(f.store.as_ref(), &PowerOfTwoEmbedding);
        let rows = calc.season_standings(&EntityId::from("s25")).unwrap();
        assert_eq!(rows[0].points, 107);
    }

    #[test]
    fn test_rolling_window_edges() {
        let mut f = Fixture::new();
        // 2025-01-06 is a Monday: activation is the following Monday
        f.season("s25", date(2025, 1, 1), date(2025, 12, 31), 4)
            .category("gold", "Gold", "s25", 100, 50)
            .final_match("t1", "gold", date(2025, 1, 6), "a", "b", Some("a"))
            .save();

        let calc = StandingsCalculator::new(f.store.as_ref(), &PowerOfTwoEmbedding);
        let activation = date(2025, 1, 13);

        assert!(calc.rolling_standings(date(2025, 1, 6)).unwrap().is_empty());
        assert_eq!(calc.rolling_standings(activation).unwrap().len(), 2);
        let last = activation + Duration::weeks(60);
        assert_eq!(calc.rolling_standings(last).unwrap()[0].points, 100);
        assert!(calc
            .rolling_standings(activation + Duration::weeks(61))
            .unwrap()
            .is_empty());

        let short = StandingsCalculator::new(f.store.as_ref(), &PowerOfTwoEmbedding)
            .with_rolling_window_weeks(2);
        assert!(short
            .rolling_standings(activation + Duration::weeks(2))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_rolling_best_n_falls_back_to_latest_season() {
        let mut f = Fixture::new();
        f.season("s24", date(2024, 1, 1), date(2024, 12, 31), 3)
            .season("s25", date(2025, 1, 1), date(2025, 6, 30), 1)
            .category("gold", "Gold", "s25", 100, 50)
            .final_match("t1", "gold", date(2025, 3, 2), "a", "b", Some("a"))
            .final_match("t2", "gold", date(2025, 4, 6), "a", "b", Some("b"))
            .save();

        let calc = StandingsCalculator::new(f.store.as_ref(), &PowerOfTwoEmbedding);
        assert_eq!(calc.season_for_monday(date(2025, 9, 1)).unwrap().id.as_str(), "s25");

        let rows = calc.rolling_standings(date(2025, 9, 1)).unwrap();
        assert_eq!(rows[0].counted.len(), 1);
        assert_eq!(rows[0].dropped.len(), 1);
    }

    #[test]
    fn test_rolling_without_seasons_is_an_error() {
        let f = Fixture::new();
        let calc = StandingsCalculator::new(f.store.as_ref(), &PowerOfTwoEmbedding);
        assert!(matches!(
            calc.rolling_standings(date(2025, 9, 1)),
            Err(RankingError::NoSeasonFor(_))
        ));
    }

    #[test]
    fn test_rolling_adjustments_use_active_window() {
        let mut f = Fixture::new();
        f.season("s25", date(2025, 1, 1), date(2025, 12, 31), 4)
            .category("gold", "Gold", "s25", 100, 50)
            .final_match("t1", "gold", date(2025, 1, 5), "a", "b", Some("a"))
            .adjustment(
                adjustment("a1", "b", AdjustmentScope::RollingOnly, date(2025, 1, 13), 2)
                    .with_points_delta(60),
            )
            .adjustment(
                adjustment("a2", "b", AdjustmentScope::Season, date(2025, 1, 13), 2)
                    .with_points_delta(1000),
            )
            // Sunday start: only the week of 2025-01-20 is covered
            .adjustment(
                adjustment("a3", "b", AdjustmentScope::RollingOnly, date(2025, 1, 26), 1)
                    .with_points_delta(60),
            )
            .save();

        let calc = StandingsCalculator::new(f.store.as_ref(), &PowerOfTwoEmbedding);
        assert_eq!(ids(&calc.rolling_standings(date(2025, 1, 6)).unwrap()), vec!["a", "b"]);
        assert_eq!(ids(&calc.rolling_standings(date(2025, 1, 20)).unwrap()), vec!["b", "a"]);
        assert_eq!(ids(&calc.rolling_standings(date(2025, 1, 27)).unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn test_rtf_pins_category_winners_in_order() {
        let mut f = Fixture::new();
        f.season("s25", date(2025, 1, 1), date(2025, 12, 31), 5)
            .category("plat", "Platinum", "s25", 20, 10)
            .category("silver", "Silver", "s25", 15, 5)
            .category("gold", "Gold", "s25", 500, 300)
            .final_match("g1", "gold", date(2025, 2, 2), "x", "y", Some("x"))
            .final_match("s1", "silver", date(2025, 3, 2), "s", "y", Some("s"))
            // The first Platinum event has no decided final yet
            .final_match("p0", "plat", date(2025, 3, 30), "q", "x", None)
            .final_match("p1", "plat", date(2025, 4, 6), "p", "x", Some("p"))
            .save();

        let calc = StandingsCalculator::new(f.store.as_ref(), &PowerOfTwoEmbedding);
        let categories = vec!["Platinum".to_string(), "Silver".to_string()];
        let rows = calc.rtf_standings(&EntityId::from("s25"), &categories).unwrap();

        assert_eq!(ids(&rows), vec!["p", "s", "x", "y", "q"]);
        assert!(rows[0].pinned && rows[1].pinned);
        assert!(!rows[2].pinned);
    }

    #[test]
    fn test_rtf_skips_player_already_pinned() {
        let mut f = Fixture::new();
        f.season("s25", date(2025, 1, 1), date(2025, 12, 31), 5)
            .category("plat", "Platinum", "s25", 20, 10)
            .category("silver", "Silver", "s25", 15, 5)
            .final_match("p1", "plat", date(2025, 2, 2), "a", "b", Some("a"))
            .final_match("s1", "silver", date(2025, 3, 2), "a", "c", Some("a"))
            .save();

        let calc = StandingsCalculator::new(f.store.as_ref(), &PowerOfTwoEmbedding);
        let categories = vec!["Platinum".to_string(), "Silver".to_string()];
        let rows = calc.rtf_standings(&EntityId::from("s25"), &categories).unwrap();
        assert_eq!(ids(&rows), vec!["a", "b", "c"]);
        assert_eq!(rows.iter().filter(|r| r.pinned).count(), 1);
    }

    #[test]
    fn test_rtf_without_categories_equals_season() {
        let mut f = Fixture::new();
        f.season("s25", date(2025, 1, 1), date(2025, 12, 31), 5)
            .category("gold", "Gold", "s25", 100, 50)
            .final_match("t1", "gold", date(2025, 2, 2), "a", "b", Some("b"))
            .final_match("t2", "gold", date(2025, 3, 2), "c", "b", Some("c"))
            .save();

        let calc = StandingsCalculator::new(f.store.as_ref(), &PowerOfTwoEmbedding);
        let season = EntityId::from("s25");
        assert_eq!(
            calc.rtf_standings(&season, &[]).unwrap(),
            calc.season_standings(&season).unwrap()
        );
    }

    #[test]
    fn test_unknown_ids() {
        let f = Fixture::new();
        let calc = StandingsCalculator::new(f.store.as_ref(), &PowerOfTwoEmbedding);
        assert!(matches!(
            calc.season_standings(&EntityId::from("nope")),
            Err(RankingError::SeasonNotFound(_))
        ));
        assert!(matches!(
            calc.points_for_tournament(&EntityId::from("nope"), true),
            Err(RankingError::TournamentNotFound(_))
        ));
    }

    #[test]
    fn test_points_for_tournament() {
        let mut f = Fixture::new();
        f.season("s25", date(2025, 1, 1), date(2025, 12, 31), 5)
            .category("gold", "Gold", "s25", 100, 50)
            .final_match("t1", "gold", date(2025, 2, 2), "a", "b", Some("b"))
            .save();

        let calc = StandingsCalculator::new(f.store.as_ref(), &PowerOfTwoEmbedding);
        let points = calc.points_for_tournament(&EntityId::from("t1"), true).unwrap();
        assert_eq!(points[&pid("b")].total, 100);
        assert_eq!(points[&pid("a")].md_points, 50);
    }
}
