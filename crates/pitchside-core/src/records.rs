// Typed records extracted from reconciled tables.
//
// Every field is optional: a cell that is missing or fails coercion is
// `None`, and aggregates skip it. Nothing here fabricates values; that is
// the backfill module's job and happens before extraction.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::coerce;
use crate::config::RosterConfig;
use crate::table::{RowRef, Table};

pub type PlayerId = i64;

/// Prefix shared by every acceleration/deceleration count column.
pub const ACCEL_PREFIX: &str = "accel_decel_over_";

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Static player_id ↔ display name mapping.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    names: BTreeMap<PlayerId, String>,
    by_name: HashMap<String, PlayerId>,
    backfill_ids: Vec<PlayerId>,
}

impl Roster {
    pub fn from_config(cfg: &RosterConfig) -> Self {
        let names: BTreeMap<PlayerId, String> = cfg
            .players
            .iter()
            .map(|p| (p.id, p.name.clone()))
            .collect();
        let by_name = names
            .iter()
            .map(|(id, name)| (name.to_lowercase(), *id))
            .collect();
        Self {
            names,
            by_name,
            backfill_ids: cfg.backfill_ids.clone(),
        }
    }

    /// Display name, or the raw id when the player is not in the mapping.
    pub fn display_name(&self, id: PlayerId) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Resolve a cell to a player id: integers parse directly, anything
    /// else is looked up by (case-insensitive) display name.
    pub fn resolve(&self, raw: &str) -> Option<PlayerId> {
        coerce::parse_i64(raw).or_else(|| self.by_name.get(&raw.trim().to_lowercase()).copied())
    }

    pub fn backfill_ids(&self) -> &[PlayerId] {
        &self.backfill_ids
    }

    pub fn players(&self) -> impl Iterator<Item = (PlayerId, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }
}

fn text(row: &RowRef<'_>, column: &str) -> Option<String> {
    row.get(column).map(str::to_string)
}

fn player(row: &RowRef<'_>, roster: &Roster) -> Option<PlayerId> {
    row.get("player_id").and_then(|raw| roster.resolve(raw))
}

// ---------------------------------------------------------------------------
// GPS sessions
// ---------------------------------------------------------------------------

/// One GPS row. `x`/`y` may be synthetic (see backfill) and are then only
/// approximate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionMetric {
    pub player_id: Option<PlayerId>,
    pub date: Option<NaiveDate>,
    pub distance: Option<f64>,
    pub peak_speed: Option<f64>,
    /// Every `accel_decel_over_*` column, keyed by its canonical name.
    pub accel: BTreeMap<String, Option<f64>>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub opposition: Option<String>,
}

impl SessionMetric {
    pub fn from_table(table: &Table, roster: &Roster) -> Vec<Self> {
        let accel_cols: Vec<&String> = table
            .headers()
            .iter()
            .filter(|h| h.contains(ACCEL_PREFIX))
            .collect();
        table
            .rows()
            .map(|row| SessionMetric {
                player_id: player(&row, roster),
                date: row.date("date"),
                distance: row.f64("distance"),
                peak_speed: row.f64("peak_speed"),
                accel: accel_cols
                    .iter()
                    .map(|c| ((*c).clone(), row.f64(c)))
                    .collect(),
                x: row.f64("x"),
                y: row.f64("y"),
                opposition: text(&row, "opposition_full"),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

/// Literal used for "no injury".
pub const NO_INJURY: &str = "None";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryRecord {
    pub player_id: Option<PlayerId>,
    pub date: Option<NaiveDate>,
    /// Subjective recovery score in [0, 100].
    pub recovery_score: Option<f64>,
    pub injury_status: String,
    pub note: Option<String>,
}

impl RecoveryRecord {
    pub fn from_table(table: &Table, roster: &Roster) -> Vec<Self> {
        table
            .rows()
            .map(|row| RecoveryRecord {
                player_id: player(&row, roster),
                date: row.date("date"),
                recovery_score: row.f64("recovery_score"),
                injury_status: text(&row, "injury_status").unwrap_or_else(|| NO_INJURY.into()),
                note: text(&row, "note"),
            })
            .collect()
    }

    pub fn is_injured(&self) -> bool {
        !self.injury_status.trim().eq_ignore_ascii_case(NO_INJURY)
    }
}

// ---------------------------------------------------------------------------
// Physical capability
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityRecord {
    pub player_id: Option<PlayerId>,
    pub movement: Option<String>,
    /// Percentage of benchmark reached; may exceed 100.
    pub benchmarkpct: Option<f64>,
    pub testdate: Option<NaiveDate>,
}

impl CapabilityRecord {
    pub fn from_table(table: &Table, roster: &Roster) -> Vec<Self> {
        let date_col = if table.has_column("testdate") {
            "testdate"
        } else {
            "date"
        };
        table
            .rows()
            .map(|row| CapabilityRecord {
                player_id: player(&row, roster),
                movement: text(&row, "movement"),
                benchmarkpct: row.f64("benchmarkpct"),
                testdate: row.date(date_col),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Match events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchEvent {
    pub timestamp: Option<NaiveDateTime>,
    pub player_id: Option<PlayerId>,
    pub event_type: Option<String>,
    pub opponent: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub success: Option<bool>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

impl MatchEvent {
    pub fn from_table(table: &Table, roster: &Roster) -> Vec<Self> {
        table
            .rows()
            .map(|row| MatchEvent {
                timestamp: row.get("timestamp").and_then(coerce::parse_datetime),
                player_id: player(&row, roster),
                event_type: text(&row, "event_type"),
                opponent: text(&row, "opponent"),
                x: row.f64("x"),
                y: row.f64("y"),
                success: row.get("success").and_then(coerce::parse_bool),
                tags: row
                    .get("tags")
                    .map(|t| {
                        t.split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
                notes: text(&row, "notes"),
            })
            .collect()
    }

    /// One match per opponent string within a dataset.
    pub fn match_id(&self) -> Option<&str> {
        self.opponent.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Development plan and external notes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DevPlanEntry {
    pub player_id: Option<PlayerId>,
    pub long_term_goal: Option<String>,
    pub dimensions: Option<String>,
    pub status: Option<String>,
    pub last_update: Option<NaiveDateTime>,
    pub coach_notes: Option<String>,
}

impl DevPlanEntry {
    pub fn from_table(table: &Table, roster: &Roster) -> Vec<Self> {
        table
            .rows()
            .map(|row| DevPlanEntry {
                player_id: player(&row, roster),
                long_term_goal: text(&row, "long_term_goal"),
                dimensions: text(&row, "dimensions"),
                status: text(&row, "status"),
                last_update: row.get("last_update").and_then(coerce::parse_datetime),
                coach_notes: text(&row, "coach_notes"),
            })
            .collect()
    }
}

/// Who an external note concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteSubject {
    WholeTeam,
    Player(PlayerId),
    Unknown(String),
}

pub const WHOLE_TEAM: &str = "Whole Team";

impl NoteSubject {
    pub fn parse(raw: Option<&str>, roster: &Roster) -> Self {
        match raw {
            None => NoteSubject::WholeTeam,
            Some(r) if r.trim().eq_ignore_ascii_case(WHOLE_TEAM) => NoteSubject::WholeTeam,
            Some(r) => roster
                .resolve(r)
                .map(NoteSubject::Player)
                .unwrap_or_else(|| NoteSubject::Unknown(r.to_string())),
        }
    }

    pub fn label(&self, roster: &Roster) -> String {
        match self {
            NoteSubject::WholeTeam => WHOLE_TEAM.to_string(),
            NoteSubject::Player(id) => roster.display_name(*id),
            NoteSubject::Unknown(raw) => raw.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalNote {
    pub date: Option<NaiveDate>,
    pub subject: NoteSubject,
    pub factor_type: Option<String>,
    pub note: Option<String>,
}

impl ExternalNote {
    pub fn from_table(table: &Table, roster: &Roster) -> Vec<Self> {
        table
            .rows()
            .map(|row| ExternalNote {
                date: row.date("date"),
                subject: NoteSubject::parse(row.get("player"), roster),
                factor_type: text(&row, "type"),
                note: text(&row, "note"),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::load_from_reader;
    use crate::schema::SourceKind;

    fn roster() -> Roster {
        Roster::from_config(&RosterConfig::default())
    }

    fn table(source: SourceKind, csv_data: &str) -> Table {
        load_from_reader(source, csv_data.as_bytes(), "inline")
            .unwrap()
            .table
    }

    #[test]
    fn display_name_falls_back_to_raw_id() {
        let r = roster();
        assert_eq!(r.display_name(17), "Vitinha");
        assert_eq!(r.display_name(99), "99");
    }

    #[test]
    fn resolve_accepts_ids_and_names() {
        let r = roster();
        assert_eq!(r.resolve("29"), Some(29));
        assert_eq!(r.resolve("10.0"), Some(10));
        assert_eq!(r.resolve("vitinha"), Some(17));
        assert_eq!(r.resolve("Désiré Doué"), Some(14));
        assert_eq!(r.resolve("Unknown Player"), None);
    }

    #[test]
    fn sessions_collect_accel_columns() {
        let t = table(
            SourceKind::Gps,
            "\
date,player_id,distance,peak_speed,accel_decel_over_2_5,accel_decel_over_3_5
2024-08-10,29,6200,32.1,14,4
2024-08-11,29,,30.0,,2",
        );
        let sessions = SessionMetric::from_table(&t, &roster());
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].accel.len(), 2);
        assert_eq!(sessions[0].accel["accel_decel_over_2_5"], Some(14.0));
        assert_eq!(sessions[1].distance, None);
        assert_eq!(sessions[1].accel["accel_decel_over_2_5"], None);
        assert_eq!(sessions[1].x, None);
    }

    #[test]
    fn recovery_defaults_injury_to_none() {
        let t = table(
            SourceKind::Recovery,
            "\
date,player_id,recovery_score,injury_status
2024-08-10,29,81,
2024-08-11,29,77,Knee",
        );
        let recs = RecoveryRecord::from_table(&t, &roster());
        assert_eq!(recs[0].injury_status, "None");
        assert!(!recs[0].is_injured());
        assert!(recs[1].is_injured());
    }

    #[test]
    fn capability_player_names_resolve() {
        let t = table(
            SourceKind::Capability,
            "\
Player Name,Movement,benchmarkPct,testDate
Vitinha,Sprint,104.5,2024-09-02
Someone Else,Jump,88,2024-09-02",
        );
        let recs = CapabilityRecord::from_table(&t, &roster());
        assert_eq!(recs[0].player_id, Some(17));
        assert_eq!(recs[0].benchmarkpct, Some(104.5));
        assert_eq!(recs[0].testdate, NaiveDate::from_ymd_opt(2024, 9, 2));
        assert_eq!(recs[1].player_id, None);
    }

    #[test]
    fn match_events_parse_success_and_tags() {
        let t = table(
            SourceKind::MatchEvents,
            "\
timestamp,player_id,event_type,opponent,x,y,success,tags,notes
2024-09-18 21:05:00,10,Shot,Girona,95.0,34.0,True,\"dangerous, counter-attack\",
2024-09-18 21:07:00,29,Pass,Girona,60.0,20.0,False,,wide",
        );
        let events = MatchEvent::from_table(&t, &roster());
        assert_eq!(events[0].success, Some(true));
        assert_eq!(events[0].tags, vec!["dangerous", "counter-attack"]);
        assert_eq!(events[0].match_id(), Some("Girona"));
        assert_eq!(events[1].success, Some(false));
        assert!(events[1].tags.is_empty());
        assert_eq!(events[1].notes.as_deref(), Some("wide"));
    }

    #[test]
    fn note_subject_labels() {
        let r = roster();
        assert_eq!(NoteSubject::parse(Some("Whole Team"), &r), NoteSubject::WholeTeam);
        assert_eq!(NoteSubject::parse(Some("29"), &r).label(&r), "Bradley Barcola");
        assert_eq!(
            NoteSubject::parse(Some("staff"), &r),
            NoteSubject::Unknown("staff".into())
        );
    }
}
