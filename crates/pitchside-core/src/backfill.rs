// Synthetic backfill of wholly-absent columns.
//
// A column is only fabricated when it is missing or every cell in it is
// null. Partially populated columns are never touched: their nulls stay
// null and drop out of aggregates. Each field draws from its own seeded
// generator so the output is reproducible run to run.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::coerce;
use crate::config::{BackfillConfig, Distribution, FieldPolicy};
use crate::records::{PlayerId, Roster, NO_INJURY};
use crate::schema::SourceKind;
use crate::table::{Cell, Table};

/// Injury types used for synthetic injury events.
pub const INJURY_TYPES: &[&str] = &["Hamstring", "Knee", "Ankle", "Fatigue", "Other"];

/// Record of one column that was fabricated. Values in such a column are
/// placeholders, not measurements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Synthesized {
    pub source: SourceKind,
    pub column: String,
    pub rows: usize,
    pub seed: u64,
}

impl Synthesized {
    pub fn describe(&self) -> String {
        format!(
            "'{}' was absent; {} synthetic value(s) generated (seed {})",
            self.column, self.rows, self.seed
        )
    }
}

fn number_cell(value: f64) -> Cell {
    Some(value.to_string())
}

/// Fill `column` with uniform draws if it is vacant. Returns what was done.
fn fill_uniform(
    source: SourceKind,
    table: &mut Table,
    column: &str,
    policy: &FieldPolicy,
) -> Option<Synthesized> {
    if !policy.enabled || table.is_empty() || !table.column_is_vacant(column) {
        return None;
    }
    let Distribution::Uniform {
        low,
        high,
        decimals,
    } = policy.distribution
    else {
        warn!(%source, column, "backfill policy is not uniform; skipping");
        return None;
    };
    let mut rng = StdRng::seed_from_u64(policy.seed);
    let values = (0..table.len())
        .map(|_| {
            let v = rng.gen_range(low..high);
            number_cell(match decimals {
                Some(d) => coerce::round_to(v, d),
                None => v,
            })
        })
        .collect();
    table.set_column(column, values);
    Some(Synthesized {
        source,
        column: column.to_string(),
        rows: table.len(),
        seed: policy.seed,
    })
}

/// Fill a vacant `player_id` column with choices from the backfill roster.
fn fill_player_ids(
    source: SourceKind,
    table: &mut Table,
    policy: &FieldPolicy,
    roster: &Roster,
) -> Option<Synthesized> {
    if !policy.enabled || table.is_empty() || !table.column_is_vacant("player_id") {
        return None;
    }
    if policy.distribution != Distribution::Choice || roster.backfill_ids().is_empty() {
        warn!(%source, "player_id backfill needs a choice policy and a non-empty roster");
        return None;
    }
    let mut rng = StdRng::seed_from_u64(policy.seed);
    let values = (0..table.len())
        .map(|_| {
            roster
                .backfill_ids()
                .choose(&mut rng)
                .map(|id| id.to_string())
        })
        .collect();
    table.set_column("player_id", values);
    Some(Synthesized {
        source,
        column: "player_id".into(),
        rows: table.len(),
        seed: policy.seed,
    })
}

/// Draw dated injury events for each backfill roster player, ending at
/// `anchor`.
pub fn injury_events(
    policy: &FieldPolicy,
    roster: &Roster,
    anchor: NaiveDate,
) -> HashMap<(PlayerId, NaiveDate), &'static str> {
    let mut events = HashMap::new();
    let Distribution::InjuryEvents {
        min_per_player,
        max_per_player,
        window_days,
    } = policy.distribution
    else {
        return events;
    };
    let mut rng = StdRng::seed_from_u64(policy.seed);
    let window = window_days.max(1) as usize;
    for &player in roster.backfill_ids() {
        let count = rng.gen_range(min_per_player..=max_per_player) as usize;
        let offsets = rand::seq::index::sample(&mut rng, window, count.min(window));
        for offset in offsets.iter() {
            let kind = INJURY_TYPES.choose(&mut rng).copied().unwrap_or("Other");
            events.insert((player, anchor - Duration::days(offset as i64)), kind);
        }
    }
    events
}

/// Fill a vacant `injury_status` column: rows matching a synthetic event by
/// (player_id, date) get its injury type, every other row gets "None".
fn fill_injury_status(
    table: &mut Table,
    policy: &FieldPolicy,
    roster: &Roster,
) -> Option<Synthesized> {
    let source = SourceKind::Recovery;
    if !policy.enabled || table.is_empty() || !table.column_is_vacant("injury_status") {
        return None;
    }
    let keys: Vec<(Option<PlayerId>, Option<NaiveDate>)> = table
        .rows()
        .map(|row| {
            (
                row.get("player_id").and_then(|raw| roster.resolve(raw)),
                row.date("date"),
            )
        })
        .collect();
    let events = match keys.iter().filter_map(|(_, d)| *d).max() {
        Some(anchor) => injury_events(policy, roster, anchor),
        None => HashMap::new(),
    };
    let values = keys
        .iter()
        .map(|key| {
            let kind = match key {
                (Some(p), Some(d)) => events.get(&(*p, *d)).copied(),
                _ => None,
            };
            Some(kind.unwrap_or(NO_INJURY).to_string())
        })
        .collect();
    table.set_column("injury_status", values);
    Some(Synthesized {
        source,
        column: "injury_status".into(),
        rows: table.len(),
        seed: policy.seed,
    })
}

fn report(done: &[Synthesized]) {
    for s in done {
        info!(source = %s.source, column = %s.column, rows = s.rows, seed = s.seed, "backfilled column");
    }
}

/// Backfill GPS pitch coordinates.
pub fn backfill_gps(table: &mut Table, cfg: &BackfillConfig) -> Vec<Synthesized> {
    let source = SourceKind::Gps;
    let done: Vec<Synthesized> = [
        fill_uniform(source, table, "x", &cfg.gps_x),
        fill_uniform(source, table, "y", &cfg.gps_y),
    ]
    .into_iter()
    .flatten()
    .collect();
    report(&done);
    done
}

/// Backfill recovery data. Player ids come first so that synthetic injury
/// events can be merged onto them.
pub fn backfill_recovery(
    table: &mut Table,
    cfg: &BackfillConfig,
    roster: &Roster,
) -> Vec<Synthesized> {
    let source = SourceKind::Recovery;
    let mut done = Vec::new();
    done.extend(fill_player_ids(source, table, &cfg.player_id, roster));
    done.extend(fill_uniform(source, table, "recovery_score", &cfg.recovery_score));
    done.extend(fill_injury_status(table, &cfg.injury_status, roster));
    report(&done);
    done
}

/// Backfill physical capability player ids.
pub fn backfill_capability(
    table: &mut Table,
    cfg: &BackfillConfig,
    roster: &Roster,
) -> Vec<Synthesized> {
    let done: Vec<Synthesized> =
        fill_player_ids(SourceKind::Capability, table, &cfg.player_id, roster)
            .into_iter()
            .collect();
    report(&done);
    done
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RosterConfig;
    use crate::ingest::load_from_reader;

    fn roster() -> Roster {
        Roster::from_config(&RosterConfig::default())
    }

    fn table(source: SourceKind, csv_data: &str) -> Table {
        load_from_reader(source, csv_data.as_bytes(), "inline")
            .unwrap()
            .table
    }

    const GPS_NO_XY: &str = "\
date,player_id,distance
2024-08-10,29,6200
2024-08-11,17,5800
2024-08-12,10,7100";

    #[test]
    fn gps_xy_filled_within_pitch() {
        let mut t = table(SourceKind::Gps, GPS_NO_XY);
        let done = backfill_gps(&mut t, &BackfillConfig::default());
        assert_eq!(done.len(), 2);
        for row in t.rows() {
            let x = row.f64("x").unwrap();
            let y = row.f64("y").unwrap();
            assert!((0.0..=105.0).contains(&x));
            assert!((0.0..=68.0).contains(&y));
        }
    }

    #[test]
    fn same_seed_same_values() {
        let mut a = table(SourceKind::Gps, GPS_NO_XY);
        let mut b = table(SourceKind::Gps, GPS_NO_XY);
        backfill_gps(&mut a, &BackfillConfig::default());
        backfill_gps(&mut b, &BackfillConfig::default());
        assert_eq!(a, b);
    }

    #[test]
    fn partial_column_is_never_filled() {
        let mut t = table(
            SourceKind::Recovery,
            "\
date,player_id,recovery_score,injury_status
2024-08-10,29,81,None
2024-08-11,29,,None",
        );
        let done = backfill_recovery(&mut t, &BackfillConfig::default(), &roster());
        assert!(done.is_empty());
        assert_eq!(t.get(1, "recovery_score"), None);
    }

    #[test]
    fn null_recovery_scores_filled_and_rounded() {
        let mut t = table(
            SourceKind::Recovery,
            "\
date,player_id,recovery_score
2024-08-10,29,
2024-08-11,29,NaN
2024-08-12,17,",
        );
        let done = backfill_recovery(&mut t, &BackfillConfig::default(), &roster());
        assert!(done.iter().any(|s| s.column == "recovery_score"));
        for row in t.rows() {
            let v = row.f64("recovery_score").unwrap();
            assert!((50.0..=95.0).contains(&v));
            assert_eq!(coerce::round_to(v, 1), v);
        }
    }

    #[test]
    fn disabled_policy_leaves_column_absent() {
        let mut t = table(SourceKind::Gps, GPS_NO_XY);
        let done = backfill_gps(&mut t, &BackfillConfig::disabled());
        assert!(done.is_empty());
        assert!(!t.has_column("x"));
    }

    #[test]
    fn injury_status_defaults_to_none_and_uses_vocabulary() {
        let mut t = table(
            SourceKind::Recovery,
            "\
date,player_id,recovery_score
2024-08-10,7,81
2024-08-11,10,77
2024-08-12,99,70",
        );
        backfill_recovery(&mut t, &BackfillConfig::default(), &roster());
        for row in t.rows() {
            let status = row.get("injury_status").unwrap();
            assert!(status == NO_INJURY || INJURY_TYPES.contains(&status));
        }
        // 99 is not in the backfill roster, so it can never be injured
        assert_eq!(t.get(2, "injury_status"), Some(NO_INJURY));
    }

    #[test]
    fn injury_events_per_player_within_window() {
        let anchor = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
        let policy = BackfillConfig::default().injury_status;
        let events = injury_events(&policy, &roster(), anchor);
        for id in roster().backfill_ids() {
            let n = events.keys().filter(|(p, _)| p == id).count();
            assert!((2..=3).contains(&n), "player {id} has {n} events");
        }
        for (_, date) in events.keys() {
            assert!(*date <= anchor);
            assert!(*date > anchor - Duration::days(365));
        }
        assert_eq!(events, injury_events(&policy, &roster(), anchor));
    }

    #[test]
    fn capability_player_ids_drawn_from_backfill_roster() {
        let mut t = table(
            SourceKind::Capability,
            "\
movement,benchmarkpct,testdate
Sprint,95,2024-09-01
Jump,102,2024-09-01",
        );
        let done = backfill_capability(&mut t, &BackfillConfig::default(), &roster());
        assert_eq!(done.len(), 1);
        for row in t.rows() {
            let id = roster().resolve(row.get("player_id").unwrap()).unwrap();
            assert!([7, 10, 22].contains(&id));
        }
    }
}
