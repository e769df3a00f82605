// Declarative schema mapping: header normalisation, the alias table, and
// the required columns per source.
//
// One table keyed by (source, canonical field) serves every ingestion path,
// so near-duplicate sources cannot drift apart.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte-order-mark artifacts seen at the start of exported headers: the
/// real code point, and its UTF-8 bytes misread as ISO-8859-1.
const BOM_ARTIFACTS: &[&str] = &["\u{feff}", "ï»¿"];

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Every CSV source the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Gps,
    Recovery,
    Priority,
    Capability,
    MatchEvents,
    DevPlan,
    ExternalFactors,
    Fbref,
    Ucl,
}

/// How headers are normalised before alias lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStyle {
    /// Trim, strip BOM artifacts, lowercase.
    Canonical,
    /// Trim and strip BOM artifacts only. Stat-sheet abbreviations ("Gls",
    /// "xAG") are case-significant.
    Preserve,
}

impl SourceKind {
    pub const ALL: [SourceKind; 9] = [
        SourceKind::Gps,
        SourceKind::Recovery,
        SourceKind::Priority,
        SourceKind::Capability,
        SourceKind::MatchEvents,
        SourceKind::DevPlan,
        SourceKind::ExternalFactors,
        SourceKind::Fbref,
        SourceKind::Ucl,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Gps => "gps",
            SourceKind::Recovery => "recovery",
            SourceKind::Priority => "priority",
            SourceKind::Capability => "capability",
            SourceKind::MatchEvents => "match_events",
            SourceKind::DevPlan => "dev_plan",
            SourceKind::ExternalFactors => "external_factors",
            SourceKind::Fbref => "fbref",
            SourceKind::Ucl => "ucl",
        }
    }

    pub fn header_style(&self) -> HeaderStyle {
        match self {
            SourceKind::Fbref | SourceKind::Ucl => HeaderStyle::Preserve,
            _ => HeaderStyle::Canonical,
        }
    }

    /// Columns downstream logic cannot work without. Absence after
    /// reconciliation is reported but never aborts the load.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            SourceKind::Gps => &["player_id", "date", "distance"],
            SourceKind::Recovery => &["player_id", "date", "recovery_score"],
            SourceKind::Priority => &["player_id"],
            SourceKind::Capability => &["player_id", "movement", "benchmarkpct"],
            SourceKind::MatchEvents => &["timestamp", "player_id", "event_type", "opponent", "x", "y"],
            SourceKind::DevPlan => &["player_id", "status", "last_update"],
            SourceKind::ExternalFactors => &["date", "player", "type", "note"],
            SourceKind::Fbref | SourceKind::Ucl => &["Player"],
        }
    }

    /// Columns holding calendar dates or timestamps.
    pub fn date_columns(&self) -> &'static [&'static str] {
        match self {
            SourceKind::Gps | SourceKind::Recovery | SourceKind::ExternalFactors => &["date"],
            SourceKind::Capability => &["testdate", "date"],
            SourceKind::MatchEvents => &["timestamp"],
            SourceKind::DevPlan => &["last_update"],
            SourceKind::Priority | SourceKind::Fbref | SourceKind::Ucl => &[],
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Alias table
// ---------------------------------------------------------------------------

/// One row of the schema mapping. `source: None` applies to every source
/// using `HeaderStyle::Canonical`.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub source: Option<SourceKind>,
    pub canonical: &'static str,
    /// Normalised spellings that resolve to `canonical`.
    pub aliases: &'static [&'static str],
}

/// Ordered alias table. Lookup is first-match-wins, so source-specific rows
/// come before the shared ones they refine.
pub const SCHEMA: &[FieldMapping] = &[
    FieldMapping {
        source: Some(SourceKind::Capability),
        canonical: "testdate",
        aliases: &["test_date", "test date"],
    },
    FieldMapping {
        source: Some(SourceKind::Capability),
        canonical: "benchmarkpct",
        aliases: &["benchmark_pct", "benchmark pct", "benchmark %", "benchmark_percent"],
    },
    FieldMapping {
        source: Some(SourceKind::Capability),
        canonical: "movement",
        aliases: &["movement_type", "movement type"],
    },
    FieldMapping {
        source: Some(SourceKind::Gps),
        canonical: "opposition_full",
        aliases: &["opposition", "opponent"],
    },
    FieldMapping {
        source: Some(SourceKind::MatchEvents),
        canonical: "event_type",
        aliases: &["event", "event type", "action"],
    },
    FieldMapping {
        source: Some(SourceKind::MatchEvents),
        canonical: "opponent",
        aliases: &["opposition", "opponent_name"],
    },
    FieldMapping {
        source: Some(SourceKind::MatchEvents),
        canonical: "timestamp",
        aliases: &["time", "datetime", "event_time"],
    },
    FieldMapping {
        source: None,
        canonical: "date",
        aliases: &["sessiondate", "session_date", "session date"],
    },
    FieldMapping {
        source: None,
        canonical: "recovery_score",
        aliases: &["subjective_composite", "recovery score", "recovery"],
    },
    FieldMapping {
        source: None,
        canonical: "player_id",
        aliases: &["player id", "player_name", "player name", "playerid"],
    },
    FieldMapping {
        source: None,
        canonical: "distance",
        aliases: &["total_distance", "total distance", "distance_m"],
    },
    FieldMapping {
        source: None,
        canonical: "peak_speed",
        aliases: &["max_speed", "top_speed", "peak speed"],
    },
    FieldMapping {
        source: None,
        canonical: "injury_status",
        aliases: &["injury", "injury_type", "injury type"],
    },
];

/// Normalise one raw header for the given style.
pub fn normalize_header(raw: &str, style: HeaderStyle) -> String {
    let mut h = raw.trim().to_string();
    for artifact in BOM_ARTIFACTS {
        h = h.replace(artifact, "");
    }
    let h = h.trim();
    match style {
        HeaderStyle::Canonical => h.to_lowercase(),
        HeaderStyle::Preserve => h.to_string(),
    }
}

/// Resolve a normalised header to its canonical name, if it is a known
/// alias for this source.
pub fn resolve_alias(source: SourceKind, header: &str) -> Option<&'static str> {
    if source.header_style() == HeaderStyle::Preserve {
        return None;
    }
    SCHEMA
        .iter()
        .filter(|m| m.source.map_or(true, |s| s == source))
        .find(|m| m.aliases.contains(&header))
        .map(|m| m.canonical)
}

/// Outcome of reconciling a header row.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub headers: Vec<String>,
    /// (original, canonical) pairs that were renamed.
    pub renamed: Vec<(String, String)>,
    /// Required columns still absent after alias resolution.
    pub missing_required: Vec<&'static str>,
}

/// Normalise and alias-resolve a header row. An alias whose canonical name
/// is already taken (by the source itself or an earlier alias) is left as
/// its normalised spelling, so no column is silently dropped.
pub fn reconcile_headers(source: SourceKind, raw: &[String]) -> Reconciled {
    let style = source.header_style();
    let normalized: Vec<String> = raw.iter().map(|h| normalize_header(h, style)).collect();

    let mut headers: Vec<String> = Vec::with_capacity(normalized.len());
    let mut renamed = Vec::new();
    for (idx, h) in normalized.iter().enumerate() {
        let target = resolve_alias(source, h).filter(|canonical| {
            !normalized.iter().any(|other| other == canonical)
                && !headers.iter().any(|taken| taken == canonical)
        });
        match target {
            Some(canonical) => {
                renamed.push((raw[idx].clone(), canonical.to_string()));
                headers.push(canonical.to_string());
            }
            None => headers.push(h.clone()),
        }
    }

    let missing_required = source
        .required_columns()
        .iter()
        .copied()
        .filter(|c| !headers.iter().any(|h| h == c))
        .collect();

    Reconciled {
        headers,
        renamed,
        missing_required,
    }
}
