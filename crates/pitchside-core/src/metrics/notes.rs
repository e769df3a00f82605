// Development plans and external-factor notes.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

use super::sort_desc_by;
use crate::records::{DevPlanEntry, ExternalNote, PlayerId, Roster};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DevPlanView {
    pub player_id: PlayerId,
    pub name: String,
    /// Most recent first; entries without a timestamp last.
    pub history: Vec<DevPlanEntry>,
    pub status_counts: Vec<(String, usize)>,
}

fn newest_first(a: &Option<NaiveDateTime>, b: &Option<NaiveDateTime>) -> std::cmp::Ordering {
    b.cmp(a)
}

/// One player's plan history and how its entries split by status.
pub fn dev_plan_view(entries: &[DevPlanEntry], player: PlayerId, roster: &Roster) -> DevPlanView {
    let mut history: Vec<DevPlanEntry> = entries
        .iter()
        .filter(|e| e.player_id == Some(player))
        .cloned()
        .collect();
    history.sort_by(|a, b| newest_first(&a.last_update, &b.last_update));

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for e in &history {
        if let Some(s) = &e.status {
            *counts.entry(s.clone()).or_default() += 1;
        }
    }
    let mut status_counts: Vec<(String, usize)> = counts.into_iter().collect();
    sort_desc_by(&mut status_counts, |(_, n)| *n as f64);

    DevPlanView {
        player_id: player,
        name: roster.display_name(player),
        history,
        status_counts,
    }
}

/// The latest plan entry of every player, ordered by player id.
pub fn latest_objectives(entries: &[DevPlanEntry]) -> Vec<DevPlanEntry> {
    let mut latest: BTreeMap<PlayerId, &DevPlanEntry> = BTreeMap::new();
    for e in entries {
        let Some(p) = e.player_id else { continue };
        match latest.get(&p) {
            Some(cur) if cur.last_update >= e.last_update => {}
            _ => {
                latest.insert(p, e);
            }
        }
    }
    latest.into_values().cloned().collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteView {
    pub date: Option<NaiveDate>,
    pub player: String,
    pub factor_type: Option<String>,
    pub note: Option<String>,
}

/// External notes, newest first, with the subject rendered for display.
pub fn external_notes(notes: &[ExternalNote], roster: &Roster) -> Vec<NoteView> {
    let mut sorted: Vec<&ExternalNote> = notes.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
        .into_iter()
        .map(|n| NoteView {
            date: n.date,
            player: n.subject.label(roster),
            factor_type: n.factor_type.clone(),
            note: n.note.clone(),
        })
        .collect()
}
