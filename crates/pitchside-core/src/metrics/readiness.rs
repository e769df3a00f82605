// Readiness: a blend of the recovery survey and inverse training load,
// computed on the joined (player, day) rows of GPS and recovery data.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use super::season::{seasons_desc, Season};
use super::{mean, sort_desc_by};
use crate::coerce::round_to;
use crate::config::Thresholds;
use crate::records::{PlayerId, RecoveryRecord, Roster, SessionMetric};

/// `round((0.5 * recovery/100 + 0.5 * (1 - distance/scale)) * 100, 1)`.
/// Undefined unless both inputs are present.
pub fn readiness_score(recovery: Option<f64>, distance: Option<f64>, scale: f64) -> Option<f64> {
    let (r, d) = (recovery?, distance?);
    let score = (0.5 * (r / 100.0) + 0.5 * (1.0 - d / scale)) * 100.0;
    score.is_finite().then(|| round_to(score, 1))
}

/// Readiness band. The same boundaries classify rows for counting and for
/// chart zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Bucket {
    Low,
    Moderate,
    High,
}

impl Bucket {
    pub fn classify(score: f64, thresholds: &Thresholds) -> Self {
        if score < thresholds.readiness_low {
            Bucket::Low
        } else if score < thresholds.readiness_high {
            Bucket::Moderate
        } else {
            Bucket::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Bucket::Low => "Low",
            Bucket::Moderate => "Moderate",
            Bucket::High => "High",
        }
    }

    /// Score range `[lo, hi)` drawn for this band. The outer edges are the
    /// nominal 0 and 100; a score beyond them (recovery above 100, distance
    /// above the scale) still classifies as Low or High.
    pub fn zone(&self, thresholds: &Thresholds) -> (f64, f64) {
        match self {
            Bucket::Low => (0.0, thresholds.readiness_low),
            Bucket::Moderate => (thresholds.readiness_low, thresholds.readiness_high),
            Bucket::High => (thresholds.readiness_high, 100.0),
        }
    }
}

/// One joined (player, day) row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadinessRow {
    pub player_id: PlayerId,
    pub date: NaiveDate,
    pub distance: Option<f64>,
    pub recovery_score: Option<f64>,
    pub readiness_score: Option<f64>,
}

/// Latest row per (player, day): the last one in source order wins. Rows
/// without a player or date cannot be keyed and are skipped.
pub(crate) fn latest_per_day<'a, T>(
    rows: &'a [T],
    key: impl Fn(&T) -> (Option<PlayerId>, Option<NaiveDate>),
) -> BTreeMap<(PlayerId, NaiveDate), &'a T> {
    let mut latest = BTreeMap::new();
    for row in rows {
        if let (Some(p), Some(d)) = key(row) {
            latest.insert((p, d), row);
        }
    }
    latest
}

/// Inner join of latest-per-day GPS and recovery rows, ordered by date then
/// player.
pub fn join_readiness(
    sessions: &[SessionMetric],
    recoveries: &[RecoveryRecord],
    thresholds: &Thresholds,
) -> Vec<ReadinessRow> {
    let gps = latest_per_day(sessions, |s| (s.player_id, s.date));
    let rec = latest_per_day(recoveries, |r| (r.player_id, r.date));
    let mut rows: Vec<ReadinessRow> = gps
        .iter()
        .filter_map(|(key, s)| {
            let r = rec.get(key)?;
            Some(ReadinessRow {
                player_id: key.0,
                date: key.1,
                distance: s.distance,
                recovery_score: r.recovery_score,
                readiness_score: readiness_score(
                    r.recovery_score,
                    s.distance,
                    thresholds.readiness_distance_scale,
                ),
            })
        })
        .collect();
    rows.sort_by_key(|r| (r.date, r.player_id));
    rows
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BucketCounts {
    pub low: usize,
    pub moderate: usize,
    pub high: usize,
}

impl BucketCounts {
    pub fn tally<I: IntoIterator<Item = f64>>(scores: I, thresholds: &Thresholds) -> Self {
        let mut counts = Self::default();
        for s in scores {
            match Bucket::classify(s, thresholds) {
                Bucket::Low => counts.low += 1,
                Bucket::Moderate => counts.moderate += 1,
                Bucket::High => counts.high += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.low + self.moderate + self.high
    }

    /// Share of each band in percent, `None` when nothing was counted.
    pub fn percentages(&self) -> Option<[f64; 3]> {
        let total = self.total();
        (total > 0).then(|| {
            let pct = |n: usize| round_to(n as f64 * 100.0 / total as f64, 1);
            [pct(self.low), pct(self.moderate), pct(self.high)]
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReadiness {
    pub date: NaiveDate,
    pub mean: f64,
    pub bucket: Bucket,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerReadiness {
    pub player_id: PlayerId,
    pub name: String,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadinessSummary {
    pub daily: Vec<DailyReadiness>,
    pub buckets: BucketCounts,
    pub bucket_percentages: [f64; 3],
    pub leaderboard: Vec<PlayerReadiness>,
    /// Days whose team mean fell below the low band.
    pub critical_days: usize,
    pub last_critical_day: Option<NaiveDate>,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadinessReport {
    /// Seasons with joined data, most recent first.
    pub seasons: Vec<Season>,
    pub season: Option<Season>,
    /// `None` when the filter leaves no scored rows.
    pub summary: Option<ReadinessSummary>,
}

#[derive(Debug, Clone, Default)]
pub struct ReadinessFilter {
    /// Defaults to the most recent season with data.
    pub season: Option<Season>,
    pub player: Option<PlayerId>,
}

/// Readiness overview for one season (and optionally one player). Buckets
/// are counted over scored rows only, so they always sum to the number of
/// rows that have a readiness score.
pub fn readiness_report(
    rows: &[ReadinessRow],
    filter: &ReadinessFilter,
    thresholds: &Thresholds,
    roster: &Roster,
) -> ReadinessReport {
    let seasons = seasons_desc(rows.iter().map(|r| r.date));
    let season = filter.season.or_else(|| seasons.first().copied());

    let scored: Vec<(&ReadinessRow, f64)> = rows
        .iter()
        .filter(|r| season.map_or(true, |s| s.contains(r.date)))
        .filter(|r| filter.player.map_or(true, |p| p == r.player_id))
        .filter_map(|r| r.readiness_score.map(|s| (r, s)))
        .collect();

    let summary = summarize(&scored, thresholds, roster);
    ReadinessReport {
        seasons,
        season,
        summary,
    }
}

fn summarize(
    scored: &[(&ReadinessRow, f64)],
    thresholds: &Thresholds,
    roster: &Roster,
) -> Option<ReadinessSummary> {
    let average = mean(scored.iter().map(|(_, s)| *s))?;

    let mut by_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    let mut by_player: BTreeMap<PlayerId, Vec<f64>> = BTreeMap::new();
    for (row, score) in scored {
        by_day.entry(row.date).or_default().push(*score);
        by_player.entry(row.player_id).or_default().push(*score);
    }

    let daily: Vec<DailyReadiness> = by_day
        .into_iter()
        .filter_map(|(date, scores)| {
            let m = mean(scores)?;
            Some(DailyReadiness {
                date,
                mean: m,
                bucket: Bucket::classify(m, thresholds),
            })
        })
        .collect();
    let critical: Vec<&DailyReadiness> = daily.iter().filter(|d| d.bucket == Bucket::Low).collect();

    let mut leaderboard: Vec<PlayerReadiness> = by_player
        .into_iter()
        .filter_map(|(player_id, scores)| {
            Some(PlayerReadiness {
                player_id,
                name: roster.display_name(player_id),
                mean: round_to(mean(scores)?, 1),
            })
        })
        .collect();
    sort_desc_by(&mut leaderboard, |p| p.mean);

    let buckets = BucketCounts::tally(scored.iter().map(|(_, s)| *s), thresholds);
    let bucket_percentages = buckets.percentages()?;

    Some(ReadinessSummary {
        critical_days: critical.len(),
        last_critical_day: critical.last().map(|d| d.date),
        daily,
        buckets,
        bucket_percentages,
        leaderboard,
        average: round_to(average, 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RosterConfig;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn session(player: PlayerId, date: NaiveDate, distance: f64) -> SessionMetric {
        SessionMetric {
            player_id: Some(player),
            date: Some(date),
            distance: Some(distance),
            peak_speed: None,
            accel: BTreeMap::new(),
            x: None,
            y: None,
            opposition: None,
        }
    }

    fn recovery(player: PlayerId, date: NaiveDate, score: Option<f64>) -> RecoveryRecord {
        RecoveryRecord {
            player_id: Some(player),
            date: Some(date),
            recovery_score: score,
            injury_status: "None".into(),
            note: None,
        }
    }

    #[test]
    fn score_matches_formula() {
        assert_eq!(readiness_score(Some(80.0), Some(5000.0), 10_000.0), Some(65.0));
        assert_eq!(readiness_score(Some(60.0), Some(5000.0), 10_000.0), Some(55.0));
        assert_eq!(readiness_score(None, Some(5000.0), 10_000.0), None);
        assert_eq!(readiness_score(Some(80.0), None, 10_000.0), None);
    }

    #[test]
    fn bucket_boundaries() {
        let t = Thresholds::default();
        assert_eq!(Bucket::classify(59.9, &t), Bucket::Low);
        assert_eq!(Bucket::classify(60.0, &t), Bucket::Moderate);
        assert_eq!(Bucket::classify(74.9, &t), Bucket::Moderate);
        assert_eq!(Bucket::classify(75.0, &t), Bucket::High);
        assert_eq!(Bucket::Moderate.zone(&t), (60.0, 75.0));
    }

    #[test]
    fn scores_outside_nominal_range_fall_in_outer_bands() {
        let t = Thresholds::default();
        let over = readiness_score(Some(120.0), Some(0.0), t.readiness_distance_scale).unwrap();
        let under = readiness_score(Some(0.0), Some(30000.0), t.readiness_distance_scale).unwrap();
        assert!(over > 100.0 && under < 0.0);
        assert_eq!(Bucket::classify(over, &t), Bucket::High);
        assert_eq!(Bucket::classify(under, &t), Bucket::Low);
        assert_eq!(Bucket::High.zone(&t), (75.0, 100.0));
        assert_eq!(BucketCounts::tally([over, under], &t).total(), 2);
    }

    #[test]
    fn duplicate_day_keeps_last_row() {
        let day = d(2024, 9, 1);
        let sessions = vec![session(29, day, 5000.0), session(29, day, 5000.0)];
        let recs = vec![recovery(29, day, Some(80.0)), recovery(29, day, Some(60.0))];
        let rows = join_readiness(&sessions, &recs, &Thresholds::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].recovery_score, Some(60.0));
        assert_eq!(rows[0].readiness_score, Some(55.0));
    }

    #[test]
    fn join_is_inner() {
        let sessions = vec![session(29, d(2024, 9, 1), 5000.0), session(17, d(2024, 9, 1), 4000.0)];
        let recs = vec![recovery(29, d(2024, 9, 1), Some(70.0)), recovery(29, d(2024, 9, 2), Some(70.0))];
        let rows = join_readiness(&sessions, &recs, &Thresholds::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].player_id, 29);
    }

    #[test]
    fn report_buckets_sum_to_scored_rows() {
        let t = Thresholds::default();
        let roster = Roster::from_config(&RosterConfig::default());
        let sessions = vec![
            session(29, d(2024, 9, 1), 9000.0),
            session(17, d(2024, 9, 1), 2000.0),
            session(10, d(2024, 9, 2), 5000.0),
            session(14, d(2024, 9, 2), 5000.0),
        ];
        let recs = vec![
            recovery(29, d(2024, 9, 1), Some(50.0)),
            recovery(17, d(2024, 9, 1), Some(90.0)),
            recovery(10, d(2024, 9, 2), Some(70.0)),
            recovery(14, d(2024, 9, 2), None),
        ];
        let rows = join_readiness(&sessions, &recs, &t);
        let report = readiness_report(&rows, &ReadinessFilter::default(), &t, &roster);
        let summary = report.summary.unwrap();
        assert_eq!(summary.buckets.total(), 3);
        // 29: 30.0 low, 17: 85.0 high, 10: 60.0 moderate
        assert_eq!(summary.buckets, BucketCounts { low: 1, moderate: 1, high: 1 });
        assert_eq!(summary.leaderboard[0].name, "Vitinha");
        assert_eq!(summary.daily.len(), 2);
        // 2024-09-01 averages (30.0 + 85.0) / 2 = 57.5
        assert_eq!(summary.critical_days, 1);
        assert_eq!(summary.last_critical_day, Some(d(2024, 9, 1)));
        assert_eq!(report.seasons.len(), 1);
    }

    #[test]
    fn empty_season_has_no_summary() {
        let t = Thresholds::default();
        let roster = Roster::from_config(&RosterConfig::default());
        let rows = join_readiness(
            &[session(29, d(2024, 9, 1), 5000.0)],
            &[recovery(29, d(2024, 9, 1), Some(80.0))],
            &t,
        );
        let filter = ReadinessFilter {
            season: Season::parse("2019/2020"),
            player: None,
        };
        let report = readiness_report(&rows, &filter, &t, &roster);
        assert!(report.summary.is_none());
    }

    #[test]
    fn critical_days_track_low_daily_means() {
        let t = Thresholds::default();
        let roster = Roster::from_config(&RosterConfig::default());
        let rows = join_readiness(
            &[session(29, d(2024, 9, 1), 9000.0), session(29, d(2024, 9, 3), 9500.0)],
            &[recovery(29, d(2024, 9, 1), Some(50.0)), recovery(29, d(2024, 9, 3), Some(40.0))],
            &t,
        );
        let summary = readiness_report(&rows, &ReadinessFilter::default(), &t, &roster)
            .summary
            .unwrap();
        assert_eq!(summary.critical_days, 2);
        assert_eq!(summary.last_critical_day, Some(d(2024, 9, 3)));
    }
}
