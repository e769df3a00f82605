// FBref season statistics: one CSV per stat category, joined on player
// name, with per-90 rates for the configured metrics.

use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::coerce::{self, round_to};
use crate::config::FbrefConfig;
use crate::ingest::{load_table, IngestError, Warning};
use crate::metrics::per_90;
use crate::schema::SourceKind;
use crate::table::{Cell, RowRef, Table};

/// Joined season table plus the categories that contributed to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FbrefSeason {
    pub table: Table,
    pub categories: Vec<String>,
    pub warnings: Vec<Warning>,
}

impl FbrefSeason {
    /// Row of the named player (exact match after trimming).
    pub fn player<'a>(&'a self, cfg: &FbrefConfig, name: &str) -> Option<RowRef<'a>> {
        self.table
            .rows()
            .find(|r| r.get(&cfg.player_column) == Some(name.trim()))
    }
}

/// Name of the per-90 column for `metric`.
pub fn per90_column(metric: &str) -> String {
    format!("{metric}/90")
}

/// Drop the repeated header rows FBref inserts every few dozen players.
fn strip_repeated_headers(table: &Table, player_column: &str) -> Table {
    let mut out = Table::with_headers(table.headers().to_vec());
    for (idx, row) in table.raw_rows().iter().enumerate() {
        if table.get(idx, player_column) == Some(player_column) {
            continue;
        }
        out.push_row(row.clone());
    }
    out
}

/// Left-join category tables onto the first one by player name. A column
/// that already exists in the joined table is renamed `<column>_<category>`.
/// A player listed twice in a category keeps the first row.
pub fn join_categories(parts: &[(String, Table)], player_column: &str) -> Table {
    let Some((_, base)) = parts.first() else {
        return Table::empty();
    };
    let mut joined = base.clone();
    let players: Vec<Option<String>> = joined
        .rows()
        .map(|r| r.get(player_column).map(str::to_string))
        .collect();

    for (category, part) in &parts[1..] {
        let mut index: HashMap<&str, usize> = HashMap::new();
        for (idx, row) in part.rows().enumerate() {
            if let Some(name) = row.get(player_column) {
                index.entry(name).or_insert(idx);
            }
        }
        for column in part.headers().iter().filter(|h| *h != player_column) {
            let target = if joined.has_column(column) {
                format!("{column}_{category}")
            } else {
                column.clone()
            };
            if joined.has_column(&target) {
                debug!(category = %category, column = %target, "duplicate column skipped");
                continue;
            }
            let values: Vec<Cell> = players
                .iter()
                .map(|p| {
                    let idx = *index.get(p.as_deref()?)?;
                    part.get(idx, column).map(str::to_string)
                })
                .collect();
            joined.set_column(&target, values);
        }
    }
    joined
}

/// Add `<metric>/90` columns. Rates are undefined (null) for players with
/// zero or missing minutes.
pub fn add_per90(table: &mut Table, cfg: &FbrefConfig) {
    if !table.has_column(&cfg.minutes_column) {
        warn!(column = %cfg.minutes_column, "minutes column missing; per-90 rates skipped");
        return;
    }
    let minutes: Vec<Option<f64>> = table.rows().map(|r| r.f64(&cfg.minutes_column)).collect();
    let metrics: Vec<&String> = cfg
        .per90_metrics
        .iter()
        .filter(|m| table.has_column(m))
        .collect();
    for metric in metrics {
        let values: Vec<Cell> = table
            .rows()
            .zip(&minutes)
            .map(|(row, mins)| per_90(row.f64(metric), *mins).map(|v| round_to(v, 2).to_string()))
            .collect();
        table.set_column(&per90_column(metric), values);
    }
}

/// Load every configured category under `dir`. Missing category files are
/// skipped with a warning.
pub fn load_fbref(cfg: &FbrefConfig, dir: &Path) -> Result<FbrefSeason, IngestError> {
    let mut parts = Vec::new();
    let mut warnings = Vec::new();
    for category in &cfg.categories {
        let loaded = load_table(SourceKind::Fbref, &dir.join(&category.file))?;
        warnings.extend(loaded.warnings);
        if !loaded.found {
            continue;
        }
        if !loaded.table.has_column(&cfg.player_column) {
            let message = format!(
                "category '{}' has no '{}' column; skipped",
                category.name, cfg.player_column
            );
            warn!("{message}");
            warnings.push(Warning::new(SourceKind::Fbref, message));
            continue;
        }
        let table = strip_repeated_headers(&loaded.table, &cfg.player_column);
        parts.push((category.name.clone(), table));
    }

    let mut table = join_categories(&parts, &cfg.player_column);
    add_per90(&mut table, cfg);
    debug!(
        categories = parts.len(),
        players = table.len(),
        "fbref season loaded"
    );
    Ok(FbrefSeason {
        table,
        categories: parts.into_iter().map(|(name, _)| name).collect(),
        warnings,
    })
}

/// Minutes parsed the way FBref prints them ("1,234").
pub fn minutes_played(row: &RowRef<'_>, cfg: &FbrefConfig) -> Option<f64> {
    row.get(&cfg.minutes_column).and_then(coerce::parse_f64)
}
