// Match event filters and the per-player match summary.

use chrono::Timelike;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::mean;
use crate::config::Thresholds;
use crate::records::{MatchEvent, PlayerId};

/// Distinct matches (one per opponent), sorted.
pub fn match_list(events: &[MatchEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| e.match_id())
        .map(String::from)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub match_id: Option<String>,
    pub player: Option<PlayerId>,
    /// Empty means every event type.
    pub event_types: Vec<String>,
}

impl EventFilter {
    pub fn matches(&self, e: &MatchEvent) -> bool {
        self.match_id.as_deref().map_or(true, |m| e.match_id() == Some(m))
            && self.player.map_or(true, |p| e.player_id == Some(p))
            && (self.event_types.is_empty()
                || e.event_type
                    .as_ref()
                    .is_some_and(|t| self.event_types.contains(t)))
    }

    pub fn apply<'a>(&self, events: &'a [MatchEvent]) -> Vec<&'a MatchEvent> {
        events.iter().filter(|e| self.matches(e)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PitchSide {
    #[serde(rename = "Left side")]
    Left,
    #[serde(rename = "Right side")]
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub total: usize,
    /// Count per event type, most frequent first.
    pub by_type: Vec<(String, usize)>,
    pub successes: usize,
    pub failures: usize,
    /// From the mean x of events with a position.
    pub most_active_side: Option<PitchSide>,
    /// Most common minute of the hour, smallest on ties.
    pub peak_minute: Option<u32>,
}

pub fn summarize_events(events: &[&MatchEvent], thresholds: &Thresholds) -> Option<EventSummary> {
    if events.is_empty() {
        return None;
    }
    let mut types: BTreeMap<&str, usize> = BTreeMap::new();
    let mut minutes: BTreeMap<u32, usize> = BTreeMap::new();
    for e in events {
        if let Some(t) = e.event_type.as_deref() {
            *types.entry(t).or_default() += 1;
        }
        if let Some(ts) = e.timestamp {
            *minutes.entry(ts.minute()).or_default() += 1;
        }
    }
    let mut by_type: Vec<(String, usize)> = types.into_iter().map(|(t, n)| (t.to_string(), n)).collect();
    by_type.sort_by(|a, b| b.1.cmp(&a.1));

    // BTreeMap iterates ascending, so on equal counts the first minute stays.
    let peak_minute = minutes
        .into_iter()
        .fold(None, |best: Option<(u32, usize)>, (m, n)| match best {
            Some((_, bn)) if bn >= n => best,
            _ => Some((m, n)),
        })
        .map(|(m, _)| m);

    let most_active_side = mean(events.iter().filter_map(|e| e.x)).map(|x| {
        if x < thresholds.pitch_midline_x {
            PitchSide::Left
        } else {
            PitchSide::Right
        }
    });

    Some(EventSummary {
        total: events.len(),
        by_type,
        successes: events.iter().filter(|e| e.success == Some(true)).count(),
        failures: events.iter().filter(|e| e.success == Some(false)).count(),
        most_active_side,
        peak_minute,
    })
}
