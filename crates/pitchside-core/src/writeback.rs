// Append-only write-back of user-entered rows.
//
// The whole file is read, one row appended, and the result written to a
// temporary file that is renamed over the original. There is no locking:
// the last writer wins. The cache entry for the file is dropped afterwards
// so the next read sees the new row.

use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cache::TableCache;
use crate::config::Config;
use crate::ingest::{decode, IngestError};
use crate::records::{PlayerId, WHOLE_TEAM};
use crate::schema::{reconcile_headers, SourceKind};
use crate::table::{Cell, Table};

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error writing {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("rejected: {0}")]
    Invalid(String),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> WriteError + '_ {
    move |source| WriteError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn csv_err(path: &Path) -> impl FnOnce(csv::Error) -> WriteError + '_ {
    move |source| WriteError::Csv {
        path: path.display().to_string(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingLoadEntry {
    pub date: NaiveDate,
    pub player_id: PlayerId,
    pub distance: f64,
    pub opposition: Option<String>,
    /// Efforts above 2.5 m/s².
    pub accel_decel_over_2_5: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryEntry {
    pub date: NaiveDate,
    pub player_id: PlayerId,
    pub recovery_score: f64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InjuryEntry {
    pub date: NaiveDate,
    pub player_id: PlayerId,
    pub injury: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalNoteEntry {
    pub date: NaiveDate,
    /// `None` for a note about the whole team.
    pub player_id: Option<PlayerId>,
    pub factor_type: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DevPlanUpdate {
    pub player_id: PlayerId,
    pub long_term_goal: String,
    pub dimensions: String,
    pub status: String,
    pub coach_notes: Option<String>,
    pub last_update: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchEventEntry {
    pub timestamp: NaiveDateTime,
    pub player_id: PlayerId,
    pub event_type: String,
    pub opponent: String,
    pub x: f64,
    pub y: f64,
    pub success: Option<bool>,
    pub tags: Option<String>,
    pub notes: Option<String>,
}

/// A row a user wants appended to one of the source files.
#[derive(Debug, Clone, PartialEq)]
pub enum NewEntry {
    TrainingLoad(TrainingLoadEntry),
    Recovery(RecoveryEntry),
    Injury(InjuryEntry),
    ExternalNote(ExternalNoteEntry),
    DevPlan(DevPlanUpdate),
    MatchEvent(MatchEventEntry),
}

fn text(value: impl ToString) -> Cell {
    Some(value.to_string())
}

fn opt_text(value: Option<&String>) -> Cell {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn iso(date: NaiveDate) -> Cell {
    text(date.format("%Y-%m-%d"))
}

fn non_empty(field: &str, value: &str) -> Result<(), WriteError> {
    if value.trim().is_empty() {
        Err(WriteError::Invalid(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

fn in_range(field: &str, value: f64, low: f64, high: f64) -> Result<(), WriteError> {
    if value.is_finite() && (low..=high).contains(&value) {
        Ok(())
    } else {
        Err(WriteError::Invalid(format!(
            "{field} must be within [{low}, {high}], got {value}"
        )))
    }
}

impl NewEntry {
    pub fn source(&self) -> SourceKind {
        match self {
            NewEntry::TrainingLoad(_) => SourceKind::Gps,
            NewEntry::Recovery(_) | NewEntry::Injury(_) => SourceKind::Recovery,
            NewEntry::ExternalNote(_) => SourceKind::ExternalFactors,
            NewEntry::DevPlan(_) => SourceKind::DevPlan,
            NewEntry::MatchEvent(_) => SourceKind::MatchEvents,
        }
    }

    pub fn validate(&self) -> Result<(), WriteError> {
        match self {
            NewEntry::TrainingLoad(e) => in_range("distance", e.distance, 0.0, f64::MAX),
            NewEntry::Recovery(e) => in_range("recovery_score", e.recovery_score, 0.0, 100.0),
            NewEntry::Injury(e) => non_empty("injury", &e.injury),
            NewEntry::ExternalNote(e) => {
                non_empty("type", &e.factor_type)?;
                non_empty("note", &e.note)
            }
            NewEntry::DevPlan(e) => {
                non_empty("long_term_goal", &e.long_term_goal)?;
                non_empty("status", &e.status)
            }
            NewEntry::MatchEvent(e) => {
                non_empty("event_type", &e.event_type)?;
                non_empty("opponent", &e.opponent)?;
                in_range("x", e.x, 0.0, 105.0)?;
                in_range("y", e.y, 0.0, 68.0)
            }
        }
    }

    /// The row to append, as (canonical column, value) pairs.
    pub fn to_record(&self) -> Vec<(String, Cell)> {
        let pairs: Vec<(&str, Cell)> = match self {
            NewEntry::TrainingLoad(e) => vec![
                ("date", iso(e.date)),
                ("player_id", text(e.player_id)),
                ("distance", text(e.distance)),
                ("opposition_full", opt_text(e.opposition.as_ref())),
                ("accel_decel_over_2_5", e.accel_decel_over_2_5.map(|n| n.to_string())),
            ],
            NewEntry::Recovery(e) => vec![
                ("date", iso(e.date)),
                ("player_id", text(e.player_id)),
                ("recovery_score", text(e.recovery_score)),
                ("note", opt_text(e.note.as_ref())),
            ],
            NewEntry::Injury(e) => vec![
                ("date", iso(e.date)),
                ("player_id", text(e.player_id)),
                ("injury_status", text(e.injury.trim())),
            ],
            NewEntry::ExternalNote(e) => {
                let player = e
                    .player_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| WHOLE_TEAM.to_string());
                vec![
                    ("date", iso(e.date)),
                    ("player", text(player)),
                    ("type", text(e.factor_type.trim())),
                    ("note", text(e.note.trim())),
                ]
            }
            NewEntry::DevPlan(e) => vec![
                ("player_id", text(e.player_id)),
                ("long_term_goal", text(e.long_term_goal.trim())),
                ("dimensions", text(e.dimensions.trim())),
                ("status", text(e.status.trim())),
                ("coach_notes", opt_text(e.coach_notes.as_ref())),
                ("last_update", text(e.last_update.format("%Y-%m-%d %H:%M"))),
            ],
            NewEntry::MatchEvent(e) => vec![
                ("timestamp", text(e.timestamp.format("%Y-%m-%d %H:%M:%S"))),
                ("player_id", text(e.player_id)),
                ("event_type", text(e.event_type.trim())),
                ("opponent", text(e.opponent.trim())),
                ("x", text(crate::coerce::round_to(e.x, 2))),
                ("y", text(crate::coerce::round_to(e.y, 2))),
                ("success", e.success.map(|s| if s { "True" } else { "False" }.to_string())),
                ("tags", opt_text(e.tags.as_ref())),
                ("notes", opt_text(e.notes.as_ref())),
            ],
        };
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

/// Read a CSV keeping its headers and cell text exactly as written. A
/// missing file reads as an empty table.
pub fn read_raw(path: &Path) -> Result<Table, WriteError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Table::empty()),
        Err(e) => return Err(io_err(path)(e)),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Table::empty());
    }
    let text = decode(&bytes).map_err(|reason| IngestError::Corrupt {
        path: path.display().to_string(),
        reason,
    })?;
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err(path))?
        .iter()
        .map(String::from)
        .collect();
    let width = headers.len();
    let mut table = Table::with_headers(headers);
    for record in rdr.records() {
        let record = record.map_err(csv_err(path))?;
        if record.len() > width {
            let line = record.position().map_or(0, |p| p.line());
            return Err(WriteError::Invalid(format!(
                "{}: line {line} has {} fields but the header has {width}; fix the file before appending",
                path.display(),
                record.len(),
            )));
        }
        table.push_row(
            record
                .iter()
                .map(|f| (!f.is_empty()).then(|| f.to_string()))
                .collect(),
        );
    }
    Ok(table)
}

/// Write `table` to `path` through a temporary file in the same directory.
pub fn write_table(path: &Path, table: &Table) -> Result<(), WriteError> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir).map_err(io_err(dir))?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table.csv".into());
    let tmp = dir
        .map(Path::to_path_buf)
        .unwrap_or_default()
        .join(format!(".{file_name}.tmp"));

    {
        let mut wtr = csv::Writer::from_path(&tmp).map_err(csv_err(&tmp))?;
        wtr.write_record(table.headers()).map_err(csv_err(&tmp))?;
        for row in table.raw_rows() {
            wtr.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))
                .map_err(csv_err(&tmp))?;
        }
        wtr.flush().map_err(io_err(&tmp))?;
    }
    fs::rename(&tmp, path).map_err(io_err(path))
}

/// Map canonical field names onto the file's own header spellings, so an
/// appended row lands in existing columns even when the export uses an
/// alias ("sessionDate" for date).
fn align_to_headers(
    source: SourceKind,
    headers: &[String],
    record: Vec<(String, Cell)>,
) -> Vec<(String, Cell)> {
    let canonical = reconcile_headers(source, headers).headers;
    record
        .into_iter()
        .map(|(field, value)| {
            let column = canonical
                .iter()
                .position(|c| *c == field)
                .map(|idx| headers[idx].clone())
                .unwrap_or(field);
            (column, value)
        })
        .collect()
}

/// Append one record to the CSV at `path`.
pub fn append_record(
    source: SourceKind,
    path: &Path,
    record: Vec<(String, Cell)>,
) -> Result<usize, WriteError> {
    let mut table = read_raw(path)?;
    let record = align_to_headers(source, table.headers(), record);
    table.append_record(&record);
    write_table(path, &table)?;
    Ok(table.len())
}

/// Validate `entry`, append it to its source file and drop the cached
/// load of that file. Returns the path written.
pub fn append_entry(
    config: &Config,
    cache: &mut TableCache,
    entry: &NewEntry,
) -> Result<PathBuf, WriteError> {
    entry.validate()?;
    let source = entry.source();
    let path = config.path_for(source);
    let rows = append_record(source, &path, entry.to_record())?;
    cache.invalidate(&path);
    info!(%source, path = %path.display(), rows, "appended entry");
    Ok(path)
}
