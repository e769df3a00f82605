// Recovery-vs-load trend: per-player least-squares slope of recovery score
// on session distance.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::config::Thresholds;
use crate::records::{PlayerId, RecoveryRecord, Roster, SessionMetric};

/// Least-squares slope of y on x. Needs at least two points and some spread
/// in x.
pub fn linear_slope(points: &[(f64, f64)]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let my = points.iter().map(|p| p.1).sum::<f64>() / n;
    let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
        (sxy + (x - mx) * (y - my), sxx + (x - mx) * (x - mx))
    });
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    slope.is_finite().then_some(slope)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    DropsSignificantly,
    GoodDespiteLoad,
    NoSignificantCorrelation,
}

impl Trend {
    pub fn classify(slope: f64, thresholds: &Thresholds) -> Self {
        if slope < thresholds.trend_drop_slope {
            Trend::DropsSignificantly
        } else if slope > thresholds.trend_gain_slope {
            Trend::GoodDespiteLoad
        } else {
            Trend::NoSignificantCorrelation
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Trend::DropsSignificantly => "recovery drops significantly with load",
            Trend::GoodDespiteLoad => "good recovery despite load",
            Trend::NoSignificantCorrelation => "no significant correlation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerTrend {
    pub player_id: PlayerId,
    pub name: String,
    pub points: usize,
    /// `None` with fewer than two points or constant distance.
    pub slope: Option<f64>,
    pub trend: Option<Trend>,
}

/// One session paired with a recovery entry of the same player and day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadRecoveryPoint {
    pub player_id: PlayerId,
    pub date: NaiveDate,
    pub distance: f64,
    pub recovery_score: f64,
}

/// Inner join of sessions and recovery entries on (player, day). Unlike the
/// readiness join, every pairing is kept: two sessions on one day give two
/// points. Pairs missing a distance or a score are dropped. Ordered by date,
/// then player, then source order.
pub fn load_recovery_points(
    sessions: &[SessionMetric],
    recoveries: &[RecoveryRecord],
) -> Vec<LoadRecoveryPoint> {
    let mut scores: HashMap<(PlayerId, NaiveDate), Vec<f64>> = HashMap::new();
    for r in recoveries {
        if let (Some(p), Some(d), Some(score)) = (r.player_id, r.date, r.recovery_score) {
            scores.entry((p, d)).or_default().push(score);
        }
    }
    let mut points = Vec::new();
    for s in sessions {
        let (Some(player_id), Some(date), Some(distance)) = (s.player_id, s.date, s.distance) else {
            continue;
        };
        let Some(matched) = scores.get(&(player_id, date)) else {
            continue;
        };
        points.extend(matched.iter().map(|&recovery_score| LoadRecoveryPoint {
            player_id,
            date,
            distance,
            recovery_score,
        }));
    }
    points.sort_by_key(|p| (p.date, p.player_id));
    points
}

/// Trend per player over the load/recovery pairs.
pub fn player_trends(
    points: &[LoadRecoveryPoint],
    thresholds: &Thresholds,
    roster: &Roster,
) -> Vec<PlayerTrend> {
    let mut by_player: BTreeMap<PlayerId, Vec<(f64, f64)>> = BTreeMap::new();
    for p in points {
        by_player
            .entry(p.player_id)
            .or_default()
            .push((p.distance, p.recovery_score));
    }
    by_player
        .into_iter()
        .map(|(player_id, points)| {
            let slope = linear_slope(&points);
            PlayerTrend {
                player_id,
                name: roster.display_name(player_id),
                points: points.len(),
                slope,
                trend: slope.map(|s| Trend::classify(s, thresholds)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RosterConfig;
    use chrono::NaiveDate;

    #[test]
    fn slope_of_a_line() {
        let s = linear_slope(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)]).unwrap();
        assert!((s - 2.0).abs() < 1e-12);
    }

    #[test]
    fn slope_needs_two_points_and_spread() {
        assert_eq!(linear_slope(&[]), None);
        assert_eq!(linear_slope(&[(1.0, 2.0)]), None);
        assert_eq!(linear_slope(&[(1.0, 2.0), (1.0, 5.0)]), None);
    }

    #[test]
    fn classification_cutoffs() {
        let t = Thresholds::default();
        assert_eq!(Trend::classify(-0.01, &t), Trend::DropsSignificantly);
        assert_eq!(Trend::classify(0.01, &t), Trend::GoodDespiteLoad);
        assert_eq!(Trend::classify(0.0, &t), Trend::NoSignificantCorrelation);
        assert_eq!(Trend::classify(-0.005, &t), Trend::NoSignificantCorrelation);
    }

    fn session(player: PlayerId, day: u32, distance: f64) -> SessionMetric {
        SessionMetric {
            player_id: Some(player),
            date: NaiveDate::from_ymd_opt(2024, 9, day),
            distance: Some(distance),
            peak_speed: None,
            accel: BTreeMap::new(),
            x: None,
            y: None,
            opposition: None,
        }
    }

    fn recovery(player: PlayerId, day: u32, score: f64) -> RecoveryRecord {
        RecoveryRecord {
            player_id: Some(player),
            date: NaiveDate::from_ymd_opt(2024, 9, day),
            recovery_score: Some(score),
            injury_status: "None".into(),
            note: None,
        }
    }

    #[test]
    fn per_player_trends() {
        let t = Thresholds::default();
        let roster = Roster::from_config(&RosterConfig::default());
        let sessions = vec![session(29, 1, 4000.0), session(29, 2, 8000.0), session(17, 1, 5000.0)];
        let recs = vec![recovery(29, 1, 90.0), recovery(29, 2, 60.0), recovery(17, 1, 80.0)];
        let points = load_recovery_points(&sessions, &recs);
        let trends = player_trends(&points, &t, &roster);
        assert_eq!(trends.len(), 2);
        let vitinha = &trends[0];
        assert_eq!(vitinha.player_id, 17);
        assert_eq!(vitinha.trend, None);
        let barcola = &trends[1];
        assert_eq!(barcola.trend, Some(Trend::DropsSignificantly));
    }

    #[test]
    fn same_day_sessions_each_pair_with_recovery() {
        let t = Thresholds::default();
        let roster = Roster::from_config(&RosterConfig::default());
        let sessions = vec![
            session(29, 1, 3000.0),
            session(29, 1, 9000.0),
            session(29, 2, 4000.0),
            session(29, 2, 8000.0),
        ];
        let recs = vec![recovery(29, 1, 80.0), recovery(29, 2, 60.0)];
        let points = load_recovery_points(&sessions, &recs);
        assert_eq!(points.len(), 4);
        let trends = player_trends(&points, &t, &roster);
        assert_eq!(trends[0].points, 4);
        assert!(trends[0].slope.unwrap().abs() < 1e-12);
        assert_eq!(trends[0].trend, Some(Trend::NoSignificantCorrelation));
    }

    #[test]
    fn unmatched_and_incomplete_rows_are_dropped() {
        let mut missing_distance = session(29, 3, 0.0);
        missing_distance.distance = None;
        let sessions = vec![session(29, 1, 5000.0), session(17, 2, 5000.0), missing_distance];
        let mut no_score = recovery(17, 2, 0.0);
        no_score.recovery_score = None;
        let recs = vec![recovery(29, 1, 70.0), no_score, recovery(29, 3, 70.0)];
        let points = load_recovery_points(&sessions, &recs);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].player_id, 29);
    }
}
