// Physical capability benchmarks.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::mean;
use super::season::{seasons_desc, Season};
use crate::config::Thresholds;
use crate::records::{CapabilityRecord, PlayerId, Roster};

/// Seasons that have capability tests, most recent first.
pub fn capability_seasons(records: &[CapabilityRecord]) -> Vec<Season> {
    seasons_desc(records.iter().filter_map(|r| r.testdate))
}

/// Records tested in `season`. Rows without a test date cannot be placed
/// in a season and are dropped by the filter.
pub fn in_season(records: &[CapabilityRecord], season: Season) -> Vec<CapabilityRecord> {
    records
        .iter()
        .filter(|r| r.testdate.is_some_and(|d| season.contains(d)))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementBenchmark {
    pub movement: String,
    pub mean: f64,
    pub tests: usize,
}

fn by_movement<'a, I>(records: I) -> BTreeMap<String, Vec<f64>>
where
    I: IntoIterator<Item = &'a CapabilityRecord>,
{
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in records {
        if let (Some(m), Some(b)) = (r.movement.as_ref(), r.benchmarkpct) {
            groups.entry(m.clone()).or_default().push(b);
        }
    }
    groups
}

/// Mean benchmark percentage per movement.
pub fn benchmark_by_movement(records: &[CapabilityRecord]) -> Vec<MovementBenchmark> {
    by_movement(records)
        .into_iter()
        .filter_map(|(movement, values)| {
            Some(MovementBenchmark {
                movement,
                tests: values.len(),
                mean: mean(values)?,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityMatrix {
    pub movements: Vec<String>,
    /// One row per player; cells follow `movements`, `None` when untested.
    pub rows: Vec<MatrixRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixRow {
    pub player_id: PlayerId,
    pub name: String,
    pub cells: Vec<Option<f64>>,
}

/// Player × movement mean benchmark.
pub fn player_movement_matrix(records: &[CapabilityRecord], roster: &Roster) -> CapabilityMatrix {
    let mut groups: BTreeMap<(PlayerId, &str), Vec<f64>> = BTreeMap::new();
    let mut movements: BTreeSet<&str> = BTreeSet::new();
    let mut players: BTreeSet<PlayerId> = BTreeSet::new();
    for r in records {
        if let (Some(p), Some(m), Some(b)) = (r.player_id, r.movement.as_deref(), r.benchmarkpct) {
            groups.entry((p, m)).or_default().push(b);
            movements.insert(m);
            players.insert(p);
        }
    }
    let rows = players
        .into_iter()
        .map(|player_id| MatrixRow {
            player_id,
            name: roster.display_name(player_id),
            cells: movements
                .iter()
                .map(|m| groups.get(&(player_id, *m)).and_then(|v| mean(v.iter().copied())))
                .collect(),
        })
        .collect();
    CapabilityMatrix {
        movements: movements.into_iter().map(String::from).collect(),
        rows,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementDistribution {
    pub movement: String,
    pub values: Vec<f64>,
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

/// Benchmark values per movement for distribution plots. Values at or below
/// `capability_min_benchmark` are noise and removed first.
pub fn benchmark_distribution(
    records: &[CapabilityRecord],
    thresholds: &Thresholds,
) -> Vec<MovementDistribution> {
    let valid = records
        .iter()
        .filter(|r| r.benchmarkpct.is_some_and(|b| b > thresholds.capability_min_benchmark));
    by_movement(valid)
        .into_iter()
        .filter_map(|(movement, mut values)| {
            values.sort_by(f64::total_cmp);
            let n = values.len();
            let median = if n % 2 == 1 {
                *values.get(n / 2)?
            } else {
                (values.get(n / 2 - 1)? + values.get(n / 2)?) / 2.0
            };
            Some(MovementDistribution {
                movement,
                min: *values.first()?,
                max: *values.last()?,
                median,
                values,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressPoint {
    pub testdate: NaiveDate,
    pub movement: Option<String>,
    pub benchmarkpct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progression {
    pub points: Vec<ProgressPoint>,
    pub mean: f64,
}

/// Benchmark over time, only rows with both a test date and a value.
pub fn progression(records: &[CapabilityRecord], player: Option<PlayerId>) -> Option<Progression> {
    let mut points: Vec<ProgressPoint> = records
        .iter()
        .filter(|r| player.map_or(true, |p| r.player_id == Some(p)))
        .filter_map(|r| {
            Some(ProgressPoint {
                testdate: r.testdate?,
                movement: r.movement.clone(),
                benchmarkpct: r.benchmarkpct?,
            })
        })
        .collect();
    points.sort_by_key(|p| p.testdate);
    let mean = mean(points.iter().map(|p| p.benchmarkpct))?;
    Some(Progression { points, mean })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DevelopmentFlag {
    /// Below the development floor: room to improve.
    Develop,
    /// Above the ceiling: a strength to maintain.
    Maintain,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementFlag {
    pub movement: String,
    pub mean: f64,
    pub flag: DevelopmentFlag,
}

/// Movements whose mean benchmark sits outside the development band.
pub fn development_flags(records: &[CapabilityRecord], thresholds: &Thresholds) -> Vec<MovementFlag> {
    benchmark_by_movement(records)
        .into_iter()
        .filter_map(|b| {
            let flag = if b.mean < thresholds.development_floor {
                DevelopmentFlag::Develop
            } else if b.mean > thresholds.development_ceiling {
                DevelopmentFlag::Maintain
            } else {
                return None;
            };
            Some(MovementFlag {
                movement: b.movement,
                mean: b.mean,
                flag,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RosterConfig;

    fn cap(player: PlayerId, movement: &str, pct: Option<f64>, date: Option<(i32, u32, u32)>) -> CapabilityRecord {
        CapabilityRecord {
            player_id: Some(player),
            movement: Some(movement.into()),
            benchmarkpct: pct,
            testdate: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        }
    }

    fn sample() -> Vec<CapabilityRecord> {
        vec![
            cap(29, "Sprint", Some(110.0), Some((2024, 9, 1))),
            cap(29, "Jump", Some(70.0), Some((2024, 9, 1))),
            cap(17, "Sprint", Some(100.0), Some((2024, 10, 1))),
            cap(17, "Jump", Some(0.5), Some((2024, 10, 1))),
            cap(17, "Agility", Some(90.0), None),
            cap(10, "Sprint", Some(95.0), Some((2024, 3, 1))),
        ]
    }

    #[test]
    fn season_filter_uses_testdate() {
        let records = sample();
        let seasons = capability_seasons(&records);
        assert_eq!(seasons.len(), 2);
        assert_eq!(seasons[0].to_string(), "2024/2025");
        assert_eq!(in_season(&records, seasons[0]).len(), 4);
    }

    #[test]
    fn distribution_drops_noise() {
        let t = Thresholds::default();
        let dist = benchmark_distribution(&sample(), &t);
        let jump = dist.iter().find(|d| d.movement == "Jump").unwrap();
        assert_eq!(jump.values, vec![70.0]);
        let sprint = dist.iter().find(|d| d.movement == "Sprint").unwrap();
        assert_eq!(sprint.median, 100.0);
        assert_eq!(sprint.min, 95.0);
    }

    #[test]
    fn matrix_has_gaps_for_untested_movements() {
        let roster = Roster::from_config(&RosterConfig::default());
        let m = player_movement_matrix(&sample(), &roster);
        assert_eq!(m.movements, vec!["Agility", "Jump", "Sprint"]);
        let dembele = m.rows.iter().find(|r| r.player_id == 10).unwrap();
        assert_eq!(dembele.cells, vec![None, None, Some(95.0)]);
    }

    #[test]
    fn progression_needs_date_and_value() {
        let p = progression(&sample(), Some(17)).unwrap();
        assert_eq!(p.points.len(), 2);
        assert_eq!(p.mean, 50.25);
        assert!(progression(&sample(), Some(14)).is_none());
    }

    #[test]
    fn flags_outside_band() {
        let t = Thresholds::default();
        let records = vec![
            cap(29, "Sprint", Some(110.0), None),
            cap(29, "Jump", Some(70.0), None),
            cap(29, "Agility", Some(90.0), None),
        ];
        let flags = development_flags(&records, &t);
        assert_eq!(flags.len(), 2);
        assert_eq!(flags[0].movement, "Jump");
        assert_eq!(flags[0].flag, DevelopmentFlag::Develop);
        assert_eq!(flags[1].flag, DevelopmentFlag::Maintain);
    }
}
