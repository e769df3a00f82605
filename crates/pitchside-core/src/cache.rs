// Memoized table loads, keyed by path.
//
// The cache is an ordinary value owned by whoever drives the pipeline.
// Write-back calls `invalidate` for the file it rewrote, so the next read
// sees the new row.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::ingest::{load_table, IngestError, LoadedTable};
use crate::schema::SourceKind;

#[derive(Debug, Default)]
pub struct TableCache {
    entries: HashMap<PathBuf, LoadedTable>,
    hits: u64,
    misses: u64,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached load of `path`, reading it on first use.
    pub fn get_or_load(
        &mut self,
        source: SourceKind,
        path: &Path,
    ) -> Result<&LoadedTable, IngestError> {
        if self.entries.contains_key(path) {
            self.hits += 1;
            debug!(%source, path = %path.display(), "cache hit");
        } else {
            self.misses += 1;
            debug!(%source, path = %path.display(), "cache miss");
            let loaded = load_table(source, path)?;
            self.entries.insert(path.to_path_buf(), loaded);
        }
        Ok(&self.entries[path])
    }

    /// Drop the entry for `path`. Returns true if one was cached.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        let removed = self.entries.remove(path).is_some();
        if removed {
            debug!(path = %path.display(), "cache invalidated");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
