// In-memory table: ordered headers plus rows of optional text cells.
//
// Every source lands here first. Cells stay as text until a typed record
// builder coerces them, so unknown columns pass through untouched and a
// write-back can reproduce the file with its original columns.

use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::collections::HashMap;

/// A single cell. `None` is a missing value (empty field or null marker).
pub type Cell = Option<String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// A table with no columns and no rows (what a missing file loads as).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_headers(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Push a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        (0..self.rows.len()).map(move |idx| RowRef { table: self, idx })
    }

    pub fn row(&self, idx: usize) -> Option<RowRef<'_>> {
        (idx < self.rows.len()).then_some(RowRef { table: self, idx })
    }

    /// Cell text at (`row`, `column`), `None` when the column is absent or
    /// the cell is null.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// True when the column is absent or every cell in it is null.
    pub fn column_is_vacant(&self, name: &str) -> bool {
        match self.column_index(name) {
            None => true,
            Some(col) => self.rows.iter().all(|r| r[col].is_none()),
        }
    }

    /// Rename a column. Returns false if `from` does not exist. When `to`
    /// already exists the rename is skipped so no column is shadowed.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        if from == to || self.has_column(to) {
            return false;
        }
        match self.column_index(from) {
            Some(idx) => {
                self.headers[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Replace (or append) a column with the given values. `values` must
    /// have one entry per row.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) {
        debug_assert_eq!(values.len(), self.rows.len());
        let col = match self.column_index(name) {
            Some(col) => col,
            None => {
                self.headers.push(name.to_string());
                for row in &mut self.rows {
                    row.push(None);
                }
                self.headers.len() - 1
            }
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[col] = value;
        }
    }

    /// Append one record given as (column, value) pairs. Columns the table
    /// does not have yet are added and back-filled with nulls for earlier
    /// rows, the same way a concat of two frames unions their columns.
    pub fn append_record(&mut self, record: &[(String, Cell)]) {
        for (name, _) in record {
            if !self.has_column(name) {
                self.headers.push(name.clone());
                for row in &mut self.rows {
                    row.push(None);
                }
            }
        }
        let mut row: Vec<Cell> = vec![None; self.headers.len()];
        for (name, value) in record {
            if let Some(col) = self.column_index(name) {
                row[col] = value.clone();
            }
        }
        self.rows.push(row);
    }

    pub(crate) fn raw_rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }
}

/// Serialized as a list of row objects with keys in header order. Null
/// cells are omitted.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in self.rows() {
            seq.serialize_element(&SerializeRow(row))?;
        }
        seq.end()
    }
}

struct SerializeRow<'a>(RowRef<'a>);

impl Serialize for SerializeRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let RowRef { table, idx } = self.0;
        serializer.collect_map(
            table
                .headers
                .iter()
                .zip(&table.rows[idx])
                .filter_map(|(h, c)| c.as_deref().map(|v| (h, v))),
        )
    }
}

/// Borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    table: &'a Table,
    idx: usize,
}

impl<'a> RowRef<'a> {
    pub fn index(&self) -> usize {
        self.idx
    }

    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.table.get(self.idx, column)
    }

    /// Numeric value of a cell, `None` when absent or unparseable.
    pub fn f64(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(crate::coerce::parse_f64)
    }

    pub fn date(&self, column: &str) -> Option<chrono::NaiveDate> {
        self.get(column).and_then(crate::coerce::parse_date)
    }

    /// All non-null cells of this row keyed by column name.
    pub fn to_map(&self) -> HashMap<&'a str, &'a str> {
        self.table
            .headers
            .iter()
            .zip(&self.table.rows[self.idx])
            .filter_map(|(h, c)| c.as_deref().map(|v| (h.as_str(), v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::with_headers(vec!["player_id".into(), "distance".into()]);
        t.push_row(vec![Some("7".into()), Some("5400".into())]);
        t.push_row(vec![Some("10".into()), None]);
        t
    }

    #[test]
    fn get_returns_none_for_null_and_missing_column() {
        let t = sample();
        assert_eq!(t.get(0, "distance"), Some("5400"));
        assert_eq!(t.get(1, "distance"), None);
        assert_eq!(t.get(0, "peak_speed"), None);
    }

    #[test]
    fn vacant_column_detection() {
        let mut t = sample();
        assert!(t.column_is_vacant("x"));
        assert!(!t.column_is_vacant("distance"));
        t.set_column("x", vec![None, None]);
        assert!(t.column_is_vacant("x"));
    }

    #[test]
    fn rename_does_not_shadow_existing_column() {
        let mut t = sample();
        assert!(!t.rename_column("distance", "player_id"));
        assert!(t.rename_column("distance", "total_distance"));
        assert_eq!(t.headers(), &["player_id", "total_distance"]);
    }

    #[test]
    fn append_record_unions_columns() {
        let mut t = sample();
        t.append_record(&[
            ("player_id".into(), Some("22".into())),
            ("note".into(), Some("sore calf".into())),
        ]);
        assert_eq!(t.headers(), &["player_id", "distance", "note"]);
        assert_eq!(t.len(), 3);
        assert_eq!(t.get(0, "note"), None);
        assert_eq!(t.get(2, "note"), Some("sore calf"));
        assert_eq!(t.get(2, "distance"), None);
    }

    #[test]
    fn serializes_rows_as_objects_in_header_order() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(json, r#"[{"player_id":"7","distance":"5400"},{"player_id":"10"}]"#);
    }

    #[test]
    fn push_row_pads_short_rows() {
        let mut t = sample();
        t.push_row(vec![Some("14".into())]);
        assert_eq!(t.get(2, "player_id"), Some("14"));
        assert_eq!(t.get(2, "distance"), None);
    }
}
