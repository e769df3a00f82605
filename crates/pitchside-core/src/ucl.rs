// UCL per-match files, identified through the configured lookup table.

use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::{UclConfig, UclMatchSpec};
use crate::ingest::{load_table, IngestError, Warning};
use crate::schema::SourceKind;
use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UclMatch {
    pub file: String,
    pub phase: String,
    pub order: u32,
    pub score: String,
    #[serde(skip)]
    pub table: Table,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UclSeason {
    /// Loaded matches in competition order.
    pub matches: Vec<UclMatch>,
    /// Files on disk that the lookup table does not list.
    pub unlisted: Vec<String>,
    pub warnings: Vec<Warning>,
}

impl UclSeason {
    pub fn phases(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.matches
            .iter()
            .map(|m| m.phase.as_str())
            .filter(|p| seen.insert(*p))
            .collect()
    }
}

fn csv_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    files.sort();
    files
}

fn load_match(spec: &UclMatchSpec, dir: &Path) -> Result<Option<(UclMatch, Vec<Warning>)>, IngestError> {
    let loaded = load_table(SourceKind::Ucl, &dir.join(&spec.file))?;
    if !loaded.found {
        return Ok(None);
    }
    Ok(Some((
        UclMatch {
            file: spec.file.clone(),
            phase: spec.phase.clone(),
            order: spec.order,
            score: spec.score.clone(),
            table: loaded.table,
        },
        loaded.warnings,
    )))
}

/// Load every listed match whose file exists under `dir`.
pub fn load_ucl(cfg: &UclConfig, dir: &Path) -> Result<UclSeason, IngestError> {
    let mut season = UclSeason::default();
    for spec in &cfg.matches {
        match load_match(spec, dir)? {
            Some((m, warnings)) => {
                season.warnings.extend(warnings);
                season.matches.push(m);
            }
            None => {
                let message = format!("{} listed but not found; skipped", spec.file);
                warn!("{message}");
                season.warnings.push(Warning::new(SourceKind::Ucl, message));
            }
        }
    }
    season.matches.sort_by_key(|m| m.order);

    let listed: HashSet<&str> = cfg.matches.iter().map(|m| m.file.as_str()).collect();
    season.unlisted = csv_files(dir)
        .into_iter()
        .filter(|f| !listed.contains(f.as_str()))
        .collect();
    for file in &season.unlisted {
        debug!(file = %file, "not in ucl lookup table; skipped");
    }
    Ok(season)
}
