// Training load: session distance series and high-intensity effort counts.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::season::{seasons_desc, Season};
use super::{mean, sort_desc_by};
use crate::records::{PlayerId, Roster, SessionMetric, ACCEL_PREFIX};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionPoint {
    pub date: NaiveDate,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyDistance {
    /// `YYYY-MM`
    pub month: String,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpponentDistance {
    pub opponent: String,
    pub sessions: usize,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadDemand {
    pub player_id: PlayerId,
    pub name: String,
    pub sessions: Vec<SessionPoint>,
    pub monthly: Vec<MonthlyDistance>,
    pub overall_mean: f64,
    /// Empty when the source has no opposition column.
    pub by_opponent: Vec<OpponentDistance>,
}

/// Distance profile for one player. Sessions with a missing or zero
/// distance are not training load and are left out. `None` when nothing
/// remains.
pub fn load_demand(
    sessions: &[SessionMetric],
    player: PlayerId,
    season: Option<Season>,
    roster: &Roster,
) -> Option<LoadDemand> {
    let mut rows: Vec<(&SessionMetric, NaiveDate, f64)> = sessions
        .iter()
        .filter(|s| s.player_id == Some(player))
        .filter_map(|s| Some((s, s.date?, s.distance.filter(|d| *d != 0.0)?)))
        .filter(|(_, date, _)| season.map_or(true, |se| se.contains(*date)))
        .collect();
    rows.sort_by_key(|(_, date, _)| *date);

    let overall_mean = mean(rows.iter().map(|r| r.2))?;

    let mut by_month: BTreeMap<(i32, u32), Vec<f64>> = BTreeMap::new();
    let mut by_opp: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (s, date, distance) in &rows {
        by_month
            .entry((date.year(), date.month()))
            .or_default()
            .push(*distance);
        if let Some(opp) = s.opposition.as_deref() {
            by_opp.entry(opp).or_default().push(*distance);
        }
    }

    Some(LoadDemand {
        player_id: player,
        name: roster.display_name(player),
        sessions: rows
            .iter()
            .map(|(_, date, distance)| SessionPoint {
                date: *date,
                distance: *distance,
            })
            .collect(),
        monthly: by_month
            .into_iter()
            .filter_map(|((y, m), v)| {
                Some(MonthlyDistance {
                    month: format!("{y:04}-{m:02}"),
                    mean: mean(v)?,
                })
            })
            .collect(),
        overall_mean,
        by_opponent: by_opp
            .into_iter()
            .filter_map(|(opp, v)| {
                Some(OpponentDistance {
                    opponent: opp.to_string(),
                    sessions: v.len(),
                    mean: mean(v)?,
                })
            })
            .collect(),
    })
}

/// Seasons with sessions (of one player when given), most recent first.
pub fn session_seasons(sessions: &[SessionMetric], player: Option<PlayerId>) -> Vec<Season> {
    seasons_desc(
        sessions
            .iter()
            .filter(|s| player.map_or(true, |p| s.player_id == Some(p)))
            .filter_map(|s| s.date),
    )
}

// ---------------------------------------------------------------------------
// High-intensity efforts
// ---------------------------------------------------------------------------

/// Every acceleration/deceleration column seen in the sessions, sorted.
pub fn accel_columns(sessions: &[SessionMetric]) -> Vec<String> {
    sessions
        .iter()
        .flat_map(|s| s.accel.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// `accel_decel_over_2_5` → `> 2.5 m/s²`. Other names pass through.
pub fn accel_label(column: &str) -> String {
    column
        .split_once(ACCEL_PREFIX)
        .and_then(|(_, rest)| rest.split_once('_'))
        .filter(|(a, b)| {
            !a.is_empty()
                && a.chars().all(|c| c.is_ascii_digit())
                && !b.is_empty()
                && b.chars().all(|c| c.is_ascii_digit())
        })
        .map(|(a, b)| format!("> {a}.{b} m/s²"))
        .unwrap_or_else(|| column.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintMode {
    #[default]
    Total,
    /// Sum per (player, day), then the mean over days.
    AveragePerSession,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SprintTotal {
    pub player_id: PlayerId,
    pub name: String,
    pub value: f64,
}

/// Effort counts for one threshold column per player, highest first.
/// Missing cells count as zero efforts. Per-session averages only count
/// dated sessions.
pub fn sprint_summary(
    sessions: &[SessionMetric],
    column: &str,
    mode: SprintMode,
    season: Option<Season>,
    roster: &Roster,
) -> Vec<SprintTotal> {
    let mut per_day: BTreeMap<PlayerId, BTreeMap<Option<NaiveDate>, f64>> = BTreeMap::new();
    for s in sessions {
        let Some(player) = s.player_id else { continue };
        if let Some(se) = season {
            if !s.date.is_some_and(|d| se.contains(d)) {
                continue;
            }
        }
        if mode == SprintMode::AveragePerSession && s.date.is_none() {
            continue;
        }
        let value = s.accel.get(column).copied().flatten().unwrap_or(0.0);
        *per_day.entry(player).or_default().entry(s.date).or_default() += value;
    }

    let mut totals: Vec<SprintTotal> = per_day
        .into_iter()
        .filter_map(|(player_id, days)| {
            let value = match mode {
                SprintMode::Total => days.values().sum(),
                SprintMode::AveragePerSession => mean(days.into_values())?,
            };
            Some(SprintTotal {
                player_id,
                name: roster.display_name(player_id),
                value,
            })
        })
        .collect();
    sort_desc_by(&mut totals, |t| t.value);
    totals
}
