// Recovery survey aggregates and the injury overview.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::readiness::Bucket;
use super::season::{seasons_desc, Season};
use super::{mean, sort_desc_by};
use crate::coerce::round_to;
use crate::config::Thresholds;
use crate::records::{PlayerId, RecoveryRecord, Roster};

/// Seasons with recovery entries (of one player when given), most recent
/// first.
pub fn recovery_seasons(records: &[RecoveryRecord], player: Option<PlayerId>) -> Vec<Season> {
    seasons_desc(
        records
            .iter()
            .filter(|r| player.map_or(true, |p| r.player_id == Some(p)))
            .filter_map(|r| r.date),
    )
}

/// Entries of one season, narrowed to one player when given. Undated entries
/// belong to no season.
pub fn scope_recovery(
    records: &[RecoveryRecord],
    season: Season,
    player: Option<PlayerId>,
) -> Vec<RecoveryRecord> {
    records
        .iter()
        .filter(|r| r.date.is_some_and(|d| season.contains(d)))
        .filter(|r| player.map_or(true, |p| r.player_id == Some(p)))
        .cloned()
        .collect()
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyRecovery {
    pub week: NaiveDate,
    pub mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAlert {
    VeryLow,
    Moderate,
    Good,
}

impl RecoveryAlert {
    pub fn classify(score: f64, thresholds: &Thresholds) -> Self {
        if score < thresholds.recovery_alert_low {
            RecoveryAlert::VeryLow
        } else if score < thresholds.recovery_alert_moderate {
            RecoveryAlert::Moderate
        } else {
            RecoveryAlert::Good
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyTrend {
    pub weeks: Vec<WeeklyRecovery>,
    pub latest: f64,
    pub alert: RecoveryAlert,
}

/// Team mean per Monday-start week, with an alert for the latest week.
pub fn weekly_trend(records: &[RecoveryRecord], thresholds: &Thresholds) -> Option<WeeklyTrend> {
    let mut by_week: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for r in records {
        if let (Some(date), Some(score)) = (r.date, r.recovery_score) {
            by_week.entry(week_start(date)).or_default().push(score);
        }
    }
    let weeks: Vec<WeeklyRecovery> = by_week
        .into_iter()
        .filter_map(|(week, scores)| Some(WeeklyRecovery { week, mean: mean(scores)? }))
        .collect();
    let latest = weeks.last()?.mean;
    Some(WeeklyTrend {
        alert: RecoveryAlert::classify(latest, thresholds),
        latest,
        weeks,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPlayerRecovery {
    pub date: NaiveDate,
    pub player_id: PlayerId,
    pub name: String,
    pub mean: f64,
}

/// Mean recovery per (day, player), optionally restricted to some players.
pub fn daily_by_player(
    records: &[RecoveryRecord],
    players: Option<&[PlayerId]>,
    roster: &Roster,
) -> Vec<DailyPlayerRecovery> {
    let mut groups: BTreeMap<(NaiveDate, PlayerId), Vec<f64>> = BTreeMap::new();
    for r in records {
        let (Some(date), Some(player), Some(score)) = (r.date, r.player_id, r.recovery_score) else {
            continue;
        };
        if players.is_some_and(|ps| !ps.contains(&player)) {
            continue;
        }
        groups.entry((date, player)).or_default().push(score);
    }
    groups
        .into_iter()
        .filter_map(|((date, player_id), scores)| {
            Some(DailyPlayerRecovery {
                date,
                player_id,
                name: roster.display_name(player_id),
                mean: mean(scores)?,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryCard {
    pub player_id: PlayerId,
    pub name: String,
    pub mean: f64,
    pub band: Bucket,
}

/// Mean recovery per player over the last `low_recovery_window_days` days
/// before the latest recorded date (inclusive), banded like readiness.
pub fn low_recovery_cards(
    records: &[RecoveryRecord],
    thresholds: &Thresholds,
    roster: &Roster,
) -> Vec<RecoveryCard> {
    let Some(latest) = records.iter().filter_map(|r| r.date).max() else {
        return Vec::new();
    };
    let cutoff = latest - Duration::days(thresholds.low_recovery_window_days);
    let mut by_player: BTreeMap<PlayerId, Vec<f64>> = BTreeMap::new();
    for r in records {
        if let (Some(date), Some(player), Some(score)) = (r.date, r.player_id, r.recovery_score) {
            if date >= cutoff {
                by_player.entry(player).or_default().push(score);
            }
        }
    }
    by_player
        .into_iter()
        .filter_map(|(player_id, scores)| {
            let m = round_to(mean(scores)?, 1);
            Some(RecoveryCard {
                player_id,
                name: roster.display_name(player_id),
                mean: m,
                band: Bucket::classify(m, thresholds),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InjuryCount {
    pub injury: String,
    pub count: usize,
}

/// Occurrences per injury type, most frequent first. "None" rows are not
/// injuries and are excluded.
pub fn injury_counts(records: &[RecoveryRecord]) -> Vec<InjuryCount> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for r in records.iter().filter(|r| r.is_injured()) {
        let key = r.injury_status.trim().to_string();
        let n = counts.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            0
        });
        *n += 1;
    }
    let mut out: Vec<InjuryCount> = order
        .into_iter()
        .map(|injury| InjuryCount {
            count: counts[&injury],
            injury,
        })
        .collect();
    sort_desc_by(&mut out, |c| c.count as f64);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RosterConfig;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn rec(player: PlayerId, date: NaiveDate, score: Option<f64>, injury: &str) -> RecoveryRecord {
        RecoveryRecord {
            player_id: Some(player),
            date: Some(date),
            recovery_score: score,
            injury_status: injury.into(),
            note: None,
        }
    }

    #[test]
    fn scope_by_season_and_player() {
        let mut undated = rec(29, d(2024, 9, 1), Some(70.0), "None");
        undated.date = None;
        let records = vec![
            rec(29, d(2024, 6, 30), Some(50.0), "None"),
            rec(29, d(2024, 7, 1), Some(60.0), "None"),
            rec(17, d(2024, 9, 1), Some(80.0), "None"),
            undated,
        ];
        let seasons = recovery_seasons(&records, None);
        assert_eq!(seasons.len(), 2);
        let latest = seasons[0];
        assert_eq!(scope_recovery(&records, latest, None).len(), 2);
        let barcola = scope_recovery(&records, latest, Some(29));
        assert_eq!(barcola.len(), 1);
        assert_eq!(barcola[0].recovery_score, Some(60.0));
        assert_eq!(recovery_seasons(&records, Some(17)), vec![latest]);
    }

    #[test]
    fn weeks_start_on_monday() {
        // 2024-09-04 is a Wednesday
        assert_eq!(week_start(d(2024, 9, 4)), d(2024, 9, 2));
        assert_eq!(week_start(d(2024, 9, 2)), d(2024, 9, 2));
        assert_eq!(week_start(d(2024, 9, 8)), d(2024, 9, 2));
    }

    #[test]
    fn weekly_trend_alert_uses_latest_week() {
        let t = Thresholds::default();
        let records = vec![
            rec(29, d(2024, 9, 2), Some(80.0), "None"),
            rec(29, d(2024, 9, 9), Some(40.0), "None"),
            rec(17, d(2024, 9, 10), Some(50.0), "None"),
            rec(17, d(2024, 9, 11), None, "None"),
        ];
        let trend = weekly_trend(&records, &t).unwrap();
        assert_eq!(trend.weeks.len(), 2);
        assert_eq!(trend.latest, 45.0);
        assert_eq!(trend.alert, RecoveryAlert::VeryLow);
        assert!(weekly_trend(&[], &t).is_none());
    }

    #[test]
    fn low_recovery_window_is_relative_to_latest_date() {
        let t = Thresholds::default();
        let roster = Roster::from_config(&RosterConfig::default());
        let records = vec![
            rec(29, d(2024, 9, 1), Some(20.0), "None"),
            rec(29, d(2024, 9, 7), Some(58.0), "None"),
            rec(29, d(2024, 9, 10), Some(62.0), "None"),
            rec(17, d(2024, 9, 9), Some(90.0), "None"),
        ];
        let cards = low_recovery_cards(&records, &t, &roster);
        assert_eq!(cards.len(), 2);
        let barcola = cards.iter().find(|c| c.player_id == 29).unwrap();
        assert_eq!(barcola.mean, 60.0);
        assert_eq!(barcola.band, Bucket::Moderate);
        let vitinha = cards.iter().find(|c| c.player_id == 17).unwrap();
        assert_eq!(vitinha.band, Bucket::High);
    }

    #[test]
    fn daily_means_filter_players() {
        let roster = Roster::from_config(&RosterConfig::default());
        let records = vec![
            rec(29, d(2024, 9, 1), Some(70.0), "None"),
            rec(29, d(2024, 9, 1), Some(80.0), "None"),
            rec(17, d(2024, 9, 1), Some(60.0), "None"),
        ];
        let all = daily_by_player(&records, None, &roster);
        assert_eq!(all.len(), 2);
        let only = daily_by_player(&records, Some(&[29]), &roster);
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].mean, 75.0);
        assert_eq!(only[0].name, "Bradley Barcola");
    }

    #[test]
    fn injury_counts_skip_none() {
        let records = vec![
            rec(29, d(2024, 9, 1), None, "Knee"),
            rec(29, d(2024, 9, 2), None, "none"),
            rec(17, d(2024, 9, 1), None, "Hamstring"),
            rec(17, d(2024, 9, 3), None, " Hamstring "),
            rec(10, d(2024, 9, 3), None, "None"),
        ];
        let counts = injury_counts(&records);
        assert_eq!(
            counts,
            vec![
                InjuryCount { injury: "Hamstring".into(), count: 2 },
                InjuryCount { injury: "Knee".into(), count: 1 },
            ]
        );
    }
}
