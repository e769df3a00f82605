// CSV ingestion and column reconciliation.
//
// Loads one source file into a `Table` with canonical headers. A missing
// file loads as an empty table; schema drift is reported as warnings and
// never aborts the load. Only bytes that cannot be a CSV export at all are
// an error.

use crate::coerce;
use crate::schema::{self, SourceKind};
use crate::table::Table;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Error and warning types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("unreadable file {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

/// A non-fatal problem found while loading, surfaced to the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub source: SourceKind,
    pub message: String,
}

impl Warning {
    pub fn new(source: SourceKind, message: impl Into<String>) -> Self {
        Self {
            source,
            message: message.into(),
        }
    }
}

/// A reconciled table plus the warnings raised while producing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedTable {
    pub table: Table,
    pub warnings: Vec<Warning>,
    /// False when the file did not exist.
    pub found: bool,
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode file bytes as UTF-8 when valid, otherwise as ISO-8859-1 (the
/// encoding of legacy exports, where every byte is one code point).
///
/// NUL bytes never appear in a text export; their presence means the file
/// is binary or corrupt.
pub fn decode(bytes: &[u8]) -> Result<String, String> {
    if bytes.contains(&0) {
        return Err("file contains NUL bytes; not a text CSV export".into());
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_string()),
        Err(_) => Ok(bytes.iter().map(|&b| b as char).collect()),
    }
}

// ---------------------------------------------------------------------------
// Reader-based loading (enables testing without temp files)
// ---------------------------------------------------------------------------

fn parse_table(source: SourceKind, text: &str) -> Result<(Table, Vec<Warning>), csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let raw_headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut warnings = Vec::new();

    if raw_headers.iter().all(|h| h.trim().is_empty()) {
        return Ok((Table::empty(), warnings));
    }

    let reconciled = schema::reconcile_headers(source, &raw_headers);
    for (from, to) in &reconciled.renamed {
        debug!(%source, from = %from, to = %to, "renamed column");
    }
    for missing in &reconciled.missing_required {
        let message = format!("required column '{missing}' is missing");
        warn!(%source, "{message}");
        warnings.push(Warning::new(source, message));
    }

    let width = reconciled.headers.len();
    let mut table = Table::with_headers(reconciled.headers);
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != width {
            debug!(%source, line = line + 2, fields = record.len(), width, "ragged row");
        }
        table.push_row(record.iter().map(coerce::to_cell).collect());
    }

    coerce_date_columns(source, &mut table, &mut warnings);
    Ok((table, warnings))
}

/// Rewrite recognised date columns into ISO form. Cells that do not parse
/// become null; the rest of the row is kept.
fn coerce_date_columns(source: SourceKind, table: &mut Table, warnings: &mut Vec<Warning>) {
    for &column in source.date_columns() {
        let Some(col) = table.column_index(column) else {
            continue;
        };
        let keep_time = column == "timestamp" || column == "last_update";
        let mut dropped = 0usize;
        let values: Vec<Option<String>> = table
            .raw_rows()
            .iter()
            .map(|row| {
                let raw = row[col].as_deref()?;
                let parsed = if keep_time {
                    coerce::parse_datetime(raw).map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                } else {
                    coerce::parse_date(raw).map(|d| d.format("%Y-%m-%d").to_string())
                };
                if parsed.is_none() {
                    dropped += 1;
                }
                parsed
            })
            .collect();
        if dropped > 0 {
            let message = format!("{dropped} unparseable value(s) in '{column}' set to null");
            warn!(%source, "{message}");
            warnings.push(Warning::new(source, message));
        }
        table.set_column(column, values);
    }
}

/// Load and reconcile a table from any reader.
pub fn load_from_reader<R: Read>(
    source: SourceKind,
    mut rdr: R,
    origin: &str,
) -> Result<LoadedTable, IngestError> {
    let mut bytes = Vec::new();
    rdr.read_to_end(&mut bytes).map_err(|e| IngestError::Io {
        path: origin.to_string(),
        source: e,
    })?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(LoadedTable {
            found: true,
            ..LoadedTable::default()
        });
    }
    let text = decode(&bytes).map_err(|reason| IngestError::Corrupt {
        path: origin.to_string(),
        reason,
    })?;
    let (table, warnings) = parse_table(source, &text).map_err(|e| IngestError::Csv {
        path: origin.to_string(),
        source: e,
    })?;
    Ok(LoadedTable {
        table,
        warnings,
        found: true,
    })
}

// ---------------------------------------------------------------------------
// Public path-based loader
// ---------------------------------------------------------------------------

/// Load a source CSV. A file that does not exist yields an empty table and a
/// warning, never an error.
pub fn load_table(source: SourceKind, path: &Path) -> Result<LoadedTable, IngestError> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let message = format!("{} not found; treating as empty", path.display());
            debug!(%source, "{message}");
            return Ok(LoadedTable {
                table: Table::empty(),
                warnings: vec![Warning::new(source, message)],
                found: false,
            });
        }
        Err(e) => {
            return Err(IngestError::Io {
                path: path.display().to_string(),
                source: e,
            })
        }
    };
    let loaded = load_from_reader(source, file, &path.display().to_string())?;
    debug!(%source, path = %path.display(), rows = loaded.table.len(), "loaded table");
    Ok(loaded)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconciles_headers_and_keeps_rows() {
        let csv_data = "\
sessionDate,Player Name,distance,peak_speed
2024-08-01,7,5400,31.2
2024-08-02,10,6100,29.8";

        let loaded = load_from_reader(SourceKind::Gps, csv_data.as_bytes(), "inline").unwrap();
        let t = &loaded.table;
        assert_eq!(t.headers(), &["date", "player_id", "distance", "peak_speed"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(1, "distance"), Some("6100"));
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn missing_required_column_warns_but_loads() {
        let csv_data = "\
date,player_id
2024-08-01,7";

        let loaded = load_from_reader(SourceKind::Gps, csv_data.as_bytes(), "inline").unwrap();
        assert_eq!(loaded.table.len(), 1);
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].message.contains("distance"));
    }

    #[test]
    fn bad_dates_become_null_without_dropping_rows() {
        let csv_data = "\
date,player_id,recovery_score
2024-08-01,7,80
not a date,10,70
03/08/2024,22,65";

        let loaded =
            load_from_reader(SourceKind::Recovery, csv_data.as_bytes(), "inline").unwrap();
        let t = &loaded.table;
        assert_eq!(t.len(), 3);
        assert_eq!(t.get(0, "date"), Some("2024-08-01"));
        assert_eq!(t.get(1, "date"), None);
        assert_eq!(t.get(1, "recovery_score"), Some("70"));
        assert_eq!(t.get(2, "date"), Some("2024-03-08"));
        assert!(loaded.warnings.iter().any(|w| w.message.contains("unparseable")));
    }

    #[test]
    fn latin1_bytes_are_decoded() {
        let mut bytes = b"player_id,movement,benchmarkpct\n10,D".to_vec();
        bytes.push(0xE9); // é in ISO-8859-1
        bytes.extend_from_slice(b"tente,95\n");

        let loaded = load_from_reader(SourceKind::Capability, bytes.as_slice(), "inline").unwrap();
        assert_eq!(loaded.table.get(0, "movement"), Some("Détente"));
    }

    #[test]
    fn utf8_bom_header_is_stripped() {
        let csv_data = "\u{feff}Player ID,Movement,benchmarkPct\n29,Sprint,102";
        let loaded =
            load_from_reader(SourceKind::Capability, csv_data.as_bytes(), "inline").unwrap();
        assert_eq!(loaded.table.headers(), &["player_id", "movement", "benchmarkpct"]);
    }

    #[test]
    fn nul_bytes_are_fatal() {
        let bytes: &[u8] = b"date,player_id\n\x00\x01\x02";
        let err = load_from_reader(SourceKind::Gps, bytes, "inline").unwrap_err();
        assert!(matches!(err, IngestError::Corrupt { .. }));
    }

    #[test]
    fn empty_input_is_empty_table() {
        let loaded = load_from_reader(SourceKind::Gps, "".as_bytes(), "inline").unwrap();
        assert!(loaded.table.is_empty());
        assert!(loaded.table.headers().is_empty());
    }

    #[test]
    fn missing_file_is_empty_not_error() {
        let path = Path::new("definitely/not/here/gps.csv");
        let loaded = load_table(SourceKind::Gps, path).unwrap();
        assert!(!loaded.found);
        assert!(loaded.table.is_empty());
        assert_eq!(loaded.warnings.len(), 1);
    }

    #[test]
    fn event_timestamps_keep_time() {
        let csv_data = "\
timestamp,player_id,event_type,opponent,x,y
2024-09-18 21:14:05,10,Shot,Girona,92.1,30.4";
        let loaded =
            load_from_reader(SourceKind::MatchEvents, csv_data.as_bytes(), "inline").unwrap();
        assert_eq!(loaded.table.get(0, "timestamp"), Some("2024-09-18 21:14:05"));
    }
}
